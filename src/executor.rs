/*
 * Copyright (C) 2025-2026 Weir Contributors
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use log::error;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;

pub type Task = Box<dyn FnOnce() + Send>;

pub trait Executor: Send + Sync {
    fn execute(&self, task: Task);
}

// fixed-size pool of OS threads draining a shared queue. tasks may block;
// independent tasks proceed in parallel as long as a thread is free.
// dropping the pool closes the queue and joins the workers
pub struct ThreadPoolExecutor {
    sender: Mutex<Option<mpsc::Sender<Task>>>,
    threads: Vec<thread::JoinHandle<()>>,
}

impl ThreadPoolExecutor {
    pub fn new(workers: usize) -> Self {
        assert!(workers > 0);

        let (s, r) = mpsc::channel::<Task>();

        let r = Arc::new(Mutex::new(r));

        let mut threads = Vec::with_capacity(workers);

        for _ in 0..workers {
            let r = Arc::clone(&r);

            threads.push(thread::spawn(move || loop {
                // receive outside of task execution so other workers can
                // pick up tasks while this one runs
                let task = match r.lock().unwrap().recv() {
                    Ok(task) => task,
                    Err(_) => break,
                };

                task();
            }));
        }

        Self {
            sender: Mutex::new(Some(s)),
            threads,
        }
    }
}

impl Executor for ThreadPoolExecutor {
    fn execute(&self, task: Task) {
        let sender = &*self.sender.lock().unwrap();

        let ret = match sender {
            Some(s) => s.send(task),
            None => {
                error!("execute on stopped thread pool");
                return;
            }
        };

        if ret.is_err() {
            error!("execute on stopped thread pool");
        }
    }
}

impl Drop for ThreadPoolExecutor {
    fn drop(&mut self) {
        self.sender.lock().unwrap().take();

        for thread in self.threads.drain(..) {
            let _ = thread.join();
        }
    }
}

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

use crate::buffer::{SharedInputBuffer, SharedOutputBuffer};
use crate::context::HttpContext;
use crate::error::Error;
use crate::http::{HttpRequest, HttpResponse, RequestHead, ResponseHead};
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

// transport codec seams. the wire parser/encoder lives behind these: the
// reactor hands one to the handler per readiness event
pub trait ContentDecoder {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, io::Error>;

    fn is_completed(&self) -> bool;
}

pub trait ContentEncoder {
    fn write(&mut self, buf: &[u8]) -> Result<usize, io::Error>;

    fn complete(&mut self) -> Result<(), io::Error>;

    fn is_completed(&self) -> bool;
}

pub trait IoControl: Send + Sync {
    fn request_input(&self);

    fn suspend_input(&self);

    fn request_output(&self);

    fn suspend_output(&self);
}

pub trait ClientConnection: IoControl {
    fn context(&self) -> &HttpContext;

    fn take_response(&self) -> Option<HttpResponse>;

    fn submit_request(&self, head: &RequestHead) -> Result<(), Error>;

    fn reset_input(&self);

    fn reset_output(&self);

    fn set_socket_timeout(&self, timeout: u32);

    fn socket_timeout(&self) -> u32;

    fn is_open(&self) -> bool;

    fn close(&self) -> Result<(), io::Error>;

    fn shutdown(&self);

    fn remote_addr(&self) -> Option<SocketAddr>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputPhase {
    // no request in flight
    Ready,

    // request head submitted to the connection
    RequestSent,

    // request asked for 100-continue; body held back, short socket timeout
    ExpectContinue,

    // request body partially handed to the encoder
    BodyStream,

    // encoder completed
    BodyDone,

    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputPhase {
    // no response in flight
    Ready,

    // final response head received
    ResponseReceived,

    // response body partially decoded
    BodyStream,

    // decoder completed, or the response could not have a body. terminal
    // for the exchange until reset
    ResponseDone,

    Shutdown,
}

pub struct StateInner {
    pub input_phase: InputPhase,
    pub output_phase: OutputPhase,
    pub request: Option<HttpRequest>,
    pub response: Option<ResponseHead>,
    pub saved_timeout: Option<u32>,
}

pub struct ConnState {
    inbuffer: Arc<SharedInputBuffer>,
    outbuffer: Arc<SharedOutputBuffer>,
    inner: Mutex<StateInner>,
    cond: Condvar,
}

impl ConnState {
    pub fn new(bufsize: usize, control: &Arc<dyn IoControl>) -> Self {
        Self {
            inbuffer: Arc::new(SharedInputBuffer::new(bufsize, control)),
            outbuffer: Arc::new(SharedOutputBuffer::new(bufsize, control)),
            inner: Mutex::new(StateInner {
                input_phase: InputPhase::Ready,
                output_phase: OutputPhase::Ready,
                request: None,
                response: None,
                saved_timeout: None,
            }),
            cond: Condvar::new(),
        }
    }

    pub fn inbuffer(&self) -> &Arc<SharedInputBuffer> {
        &self.inbuffer
    }

    pub fn outbuffer(&self) -> &Arc<SharedOutputBuffer> {
        &self.outbuffer
    }

    pub fn lock(&self) -> MutexGuard<'_, StateInner> {
        self.inner.lock().unwrap()
    }

    pub fn wait<'a>(&self, guard: MutexGuard<'a, StateInner>) -> MutexGuard<'a, StateInner> {
        self.cond.wait(guard).unwrap()
    }

    pub fn notify_all(&self) {
        self.cond.notify_all();
    }

    // callable from either thread. unblocks any producer/consumer stuck on
    // the buffers and any waiter on the monitor
    pub fn shutdown(&self) {
        self.inbuffer.shutdown();
        self.outbuffer.shutdown();

        let s = &mut *self.inner.lock().unwrap();
        s.input_phase = InputPhase::Shutdown;
        s.output_phase = OutputPhase::Shutdown;

        self.cond.notify_all();
    }

    pub fn reset_input(&self, s: &mut StateInner) {
        self.inbuffer.reset();
        s.response = None;
        s.input_phase = InputPhase::Ready;
    }

    pub fn reset_output(&self, s: &mut StateInner) {
        self.outbuffer.reset();
        s.request = None;
        s.output_phase = OutputPhase::Ready;
    }
}

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

use crate::connection::{ContentDecoder, ContentEncoder, IoControl};
use crate::error::interrupted;
use std::cmp;
use std::io;
use std::io::{Read, Write};
use std::sync::{Arc, Condvar, Mutex};

pub struct RingBuffer {
    buf: Vec<u8>,
    start: usize,
    end: usize,
}

impl RingBuffer {
    pub fn new(size: usize) -> RingBuffer {
        let buf = vec![0; size];

        RingBuffer {
            buf,
            start: 0,
            end: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn clear(&mut self) {
        self.start = 0;
        self.end = 0;
    }

    pub fn read_avail(&self) -> usize {
        self.end - self.start
    }

    pub fn read_buf(&self) -> &[u8] {
        let end = cmp::min(self.end, self.buf.len());

        &self.buf[self.start..end]
    }

    pub fn read_commit(&mut self, amount: usize) {
        assert!(self.start + amount <= self.end);

        self.start += amount;

        if self.start == self.end {
            self.start = 0;
            self.end = 0;
        } else if self.start >= self.buf.len() {
            self.start -= self.buf.len();
            self.end -= self.buf.len();
        }
    }

    pub fn write_avail(&self) -> usize {
        self.buf.len() - (self.end - self.start)
    }

    pub fn write_buf(&mut self) -> &mut [u8] {
        let (start, end) = if self.end < self.buf.len() {
            (self.end, self.buf.len())
        } else {
            (self.end - self.buf.len(), self.start)
        };

        &mut self.buf[start..end]
    }

    pub fn write_commit(&mut self, amount: usize) {
        assert!((self.end - self.start) + amount <= self.buf.len());

        self.end += amount;
    }

    pub fn read_into(&mut self, dest: &mut [u8]) -> usize {
        let mut pos = 0;

        while pos < dest.len() && self.read_avail() > 0 {
            let src = self.read_buf();
            let size = cmp::min(src.len(), dest.len() - pos);

            dest[pos..(pos + size)].copy_from_slice(&src[..size]);

            self.read_commit(size);

            pos += size;
        }

        pos
    }

    pub fn write_from_slice(&mut self, src: &[u8]) -> usize {
        let mut pos = 0;

        while pos < src.len() && self.write_avail() > 0 {
            let dest = self.write_buf();
            let size = cmp::min(dest.len(), src.len() - pos);

            dest[..size].copy_from_slice(&src[pos..(pos + size)]);

            self.write_commit(size);

            pos += size;
        }

        pos
    }
}

struct SharedInner {
    ring: RingBuffer,
    eos: bool,
    shutdown: bool,
}

// bounded buffer between the I/O thread (producer, via a decoder) and a
// worker (consumer, via blocking reads). flow control goes through the
// IoControl port: suspend input when full, request it again once drained
pub struct SharedInputBuffer {
    inner: Mutex<SharedInner>,
    readable: Condvar,
    control: Arc<dyn IoControl>,
}

impl SharedInputBuffer {
    pub fn new(size: usize, control: &Arc<dyn IoControl>) -> Self {
        Self {
            inner: Mutex::new(SharedInner {
                ring: RingBuffer::new(size),
                eos: false,
                shutdown: false,
            }),
            readable: Condvar::new(),
            control: Arc::clone(control),
        }
    }

    pub fn data_avail(&self) -> usize {
        self.inner.lock().unwrap().ring.read_avail()
    }

    // I/O thread. reads whatever the decoder has into the ring, never
    // blocking. must not be called from a worker
    pub fn consume_content(&self, decoder: &mut dyn ContentDecoder) -> Result<usize, io::Error> {
        let inner = &mut *self.inner.lock().unwrap();

        if inner.shutdown {
            return Err(interrupted("buffer shut down"));
        }

        let mut total = 0;

        loop {
            if inner.ring.write_avail() == 0 {
                break;
            }

            let size = decoder.read(inner.ring.write_buf())?;
            if size == 0 {
                break;
            }

            inner.ring.write_commit(size);
            total += size;

            if decoder.is_completed() {
                break;
            }
        }

        if decoder.is_completed() {
            inner.eos = true;
        } else if inner.ring.write_avail() == 0 {
            self.control.suspend_input();
        }

        if total > 0 || inner.eos {
            self.readable.notify_all();
        }

        Ok(total)
    }

    // worker thread. blocks while the ring is empty and the stream is not
    // finished. returns 0 at end of stream
    pub fn read(&self, buf: &mut [u8]) -> Result<usize, io::Error> {
        if buf.is_empty() {
            return Ok(0);
        }

        let mut inner = self.inner.lock().unwrap();

        loop {
            if inner.shutdown {
                return Err(interrupted("buffer shut down"));
            }

            if inner.ring.read_avail() > 0 {
                break;
            }

            if inner.eos {
                return Ok(0);
            }

            inner = self.readable.wait(inner).unwrap();
        }

        let size = inner.ring.read_into(buf);

        if !inner.eos {
            self.control.request_input();
        }

        Ok(size)
    }

    // discard residual bytes between exchanges on a kept-alive connection
    pub fn reset(&self) {
        let inner = &mut *self.inner.lock().unwrap();

        if inner.shutdown {
            return;
        }

        inner.ring.clear();
        inner.eos = false;
    }

    pub fn shutdown(&self) {
        let inner = &mut *self.inner.lock().unwrap();

        inner.shutdown = true;

        self.readable.notify_all();
    }
}

// mirror image: worker produces via blocking writes, I/O thread drains into
// an encoder. closing marks end of stream; the encoder is finalized on the
// next output event
pub struct SharedOutputBuffer {
    inner: Mutex<SharedInner>,
    writable: Condvar,
    control: Arc<dyn IoControl>,
}

impl SharedOutputBuffer {
    pub fn new(size: usize, control: &Arc<dyn IoControl>) -> Self {
        Self {
            inner: Mutex::new(SharedInner {
                ring: RingBuffer::new(size),
                eos: false,
                shutdown: false,
            }),
            writable: Condvar::new(),
            control: Arc::clone(control),
        }
    }

    pub fn data_avail(&self) -> usize {
        self.inner.lock().unwrap().ring.read_avail()
    }

    // worker thread. blocks while the ring is full. partial writes are
    // possible; callers needing all bytes written use write_all on the sink
    pub fn write(&self, src: &[u8]) -> Result<usize, io::Error> {
        if src.is_empty() {
            return Ok(0);
        }

        let mut inner = self.inner.lock().unwrap();

        loop {
            if inner.shutdown {
                return Err(interrupted("buffer shut down"));
            }

            if inner.eos {
                return Err(io::Error::from(io::ErrorKind::BrokenPipe));
            }

            if inner.ring.write_avail() > 0 {
                break;
            }

            inner = self.writable.wait(inner).unwrap();
        }

        let size = inner.ring.write_from_slice(src);

        self.control.request_output();

        Ok(size)
    }

    pub fn flush(&self) -> Result<(), io::Error> {
        let inner = &*self.inner.lock().unwrap();

        if inner.shutdown {
            return Err(interrupted("buffer shut down"));
        }

        if inner.ring.read_avail() > 0 {
            self.control.request_output();
        }

        Ok(())
    }

    // worker thread. marks end of stream; idempotent
    pub fn close(&self) -> Result<(), io::Error> {
        let inner = &mut *self.inner.lock().unwrap();

        if inner.shutdown {
            return Err(interrupted("buffer shut down"));
        }

        if !inner.eos {
            inner.eos = true;

            self.control.request_output();
        }

        Ok(())
    }

    // I/O thread. drains the ring into the encoder, finalizing it once the
    // ring is empty and the stream has ended
    pub fn produce_content(&self, encoder: &mut dyn ContentEncoder) -> Result<usize, io::Error> {
        let inner = &mut *self.inner.lock().unwrap();

        if inner.shutdown {
            return Err(interrupted("buffer shut down"));
        }

        let mut total = 0;

        loop {
            if inner.ring.read_avail() == 0 {
                break;
            }

            let size = encoder.write(inner.ring.read_buf())?;
            if size == 0 {
                break;
            }

            inner.ring.read_commit(size);
            total += size;
        }

        if inner.ring.read_avail() > 0 {
            // encoder saturated, make sure we get called again
            self.control.request_output();
        } else if inner.eos {
            if !encoder.is_completed() {
                encoder.complete()?;
            }
        } else {
            self.control.suspend_output();
        }

        if total > 0 {
            self.writable.notify_all();
        }

        Ok(total)
    }

    pub fn reset(&self) {
        let inner = &mut *self.inner.lock().unwrap();

        if inner.shutdown {
            return;
        }

        inner.ring.clear();
        inner.eos = false;
    }

    pub fn shutdown(&self) {
        let inner = &mut *self.inner.lock().unwrap();

        inner.shutdown = true;

        self.writable.notify_all();
    }
}

pub struct ContentSource {
    buf: Arc<SharedInputBuffer>,
}

impl ContentSource {
    pub fn new(buf: &Arc<SharedInputBuffer>) -> Self {
        Self {
            buf: Arc::clone(buf),
        }
    }
}

impl Read for ContentSource {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, io::Error> {
        self.buf.read(buf)
    }
}

pub struct ContentSink {
    buf: Arc<SharedOutputBuffer>,
}

impl ContentSink {
    pub fn new(buf: &Arc<SharedOutputBuffer>) -> Self {
        Self {
            buf: Arc::clone(buf),
        }
    }

    pub fn close(&mut self) -> Result<(), io::Error> {
        self.buf.close()
    }
}

impl Write for ContentSink {
    fn write(&mut self, buf: &[u8]) -> Result<usize, io::Error> {
        self.buf.write(buf)
    }

    fn flush(&mut self) -> Result<(), io::Error> {
        self.buf.flush()
    }
}

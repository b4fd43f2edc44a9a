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

use crate::buffer::{ContentSink, ContentSource};
use crate::config::{self, Params};
use crate::connection::{
    ClientConnection, ConnState, ContentDecoder, ContentEncoder, InputPhase, IoControl,
    OutputPhase, StateInner,
};
use crate::context::{self, HttpContext};
use crate::error::{interrupted, ConfigError, Error};
use crate::executor::Executor;
use crate::http::{
    can_response_have_body, HttpHost, HttpRequest, HttpResponse, RequestEntity, RequestHead,
    ResponseHead,
};
use log::debug;
use std::any::Any;
use std::io;
use std::io::Write;
use std::sync::{Arc, Weak};

pub trait HttpProcessor: Send + Sync {
    fn process_request(&self, request: &mut RequestHead, context: &HttpContext)
        -> Result<(), Error>;

    fn process_response(
        &self,
        response: &mut ResponseHead,
        context: &HttpContext,
    ) -> Result<(), Error>;
}

pub trait RequestExecutionHandler: Send + Sync {
    fn initialize_context(&self, context: &HttpContext, attachment: Option<Box<dyn Any + Send>>);

    fn submit_request(&self, context: &HttpContext) -> Option<HttpRequest>;

    fn handle_response(
        &self,
        response: HttpResponse,
        context: &HttpContext,
    ) -> Result<(), io::Error>;
}

pub trait ConnectionReuseStrategy: Send + Sync {
    fn keep_alive(&self, response: &ResponseHead, context: &HttpContext) -> bool;
}

pub trait EventListener: Send + Sync {
    fn connection_open(&self, conn: &dyn ClientConnection);

    fn connection_closed(&self, conn: &dyn ClientConnection);

    fn connection_timeout(&self, conn: &dyn ClientConnection);

    fn fatal_io_error(&self, e: &io::Error, conn: &dyn ClientConnection);

    fn fatal_protocol_error(&self, e: &Error, conn: &dyn ClientConnection);
}

// capability handle held by the shared buffers. weak so the state (stored
// in the connection's context) doesn't keep the connection alive
struct ConnControl {
    conn: Weak<dyn ClientConnection>,
}

impl ConnControl {
    fn new(conn: &Arc<dyn ClientConnection>) -> Self {
        Self {
            conn: Arc::downgrade(conn),
        }
    }
}

impl IoControl for ConnControl {
    fn request_input(&self) {
        if let Some(conn) = self.conn.upgrade() {
            conn.request_input();
        }
    }

    fn suspend_input(&self) {
        if let Some(conn) = self.conn.upgrade() {
            conn.suspend_input();
        }
    }

    fn request_output(&self) {
        if let Some(conn) = self.conn.upgrade() {
            conn.request_output();
        }
    }

    fn suspend_output(&self) {
        if let Some(conn) = self.conn.upgrade() {
            conn.suspend_output();
        }
    }
}

fn write_entity(entity: &mut dyn RequestEntity, sink: &mut ContentSink) -> Result<(), io::Error> {
    entity.write_to(sink)?;
    sink.flush()?;

    sink.close()
}

fn close_connection(conn: &dyn ClientConnection) {
    if conn.close().is_err() {
        conn.shutdown();
    }
}

// hard close: socket first, then the state, so blocked workers unblock
// with interrupted-i/o
fn shutdown_connection(conn: &dyn ClientConnection, state: &ConnState) {
    conn.shutdown();
    state.shutdown();
}

pub struct ClientHandler {
    processor: Arc<dyn HttpProcessor>,
    exec_handler: Arc<dyn RequestExecutionHandler>,
    reuse_strategy: Arc<dyn ConnectionReuseStrategy>,
    executor: Arc<dyn Executor>,
    listener: Option<Arc<dyn EventListener>>,
    bufsize: usize,
    wait_for_continue: u32,
}

impl ClientHandler {
    pub fn new(
        processor: Arc<dyn HttpProcessor>,
        exec_handler: Arc<dyn RequestExecutionHandler>,
        reuse_strategy: Arc<dyn ConnectionReuseStrategy>,
        executor: Arc<dyn Executor>,
        params: &Params,
    ) -> Result<Self, ConfigError> {
        let bufsize = params.content_buffer_size();
        if bufsize <= 0 {
            return Err(ConfigError::InvalidParam {
                name: config::CONTENT_BUFFER_SIZE,
                value: bufsize,
            });
        }

        let wait_for_continue = params.wait_for_continue();
        if wait_for_continue <= 0 || wait_for_continue > (u32::MAX as i64) {
            return Err(ConfigError::InvalidParam {
                name: config::WAIT_FOR_CONTINUE,
                value: wait_for_continue,
            });
        }

        Ok(Self {
            processor,
            exec_handler,
            reuse_strategy,
            executor,
            listener: None,
            bufsize: bufsize as usize,
            wait_for_continue: wait_for_continue as u32,
        })
    }

    pub fn set_event_listener(&mut self, listener: Arc<dyn EventListener>) {
        self.listener = Some(listener);
    }

    fn conn_state(conn: &Arc<dyn ClientConnection>) -> Option<Arc<ConnState>> {
        conn.context().get_attribute(context::CONN_STATE)
    }

    pub fn connected(
        &self,
        conn: &Arc<dyn ClientConnection>,
        attachment: Option<Box<dyn Any + Send>>,
    ) {
        debug!("connection opened: {:?}", conn.remote_addr());

        let context = conn.context();

        // default target host from the peer address; the execution handler
        // may overwrite it with a configured name
        if let Some(addr) = conn.remote_addr() {
            let host = HttpHost {
                hostname: addr.ip().to_string(),
                port: addr.port(),
            };

            context.set_attribute(context::HTTP_TARGET_HOST, host);
        }

        context.set_attribute(context::HTTP_CONNECTION, Arc::clone(conn));

        self.exec_handler.initialize_context(context, attachment);

        let control: Arc<dyn IoControl> = Arc::new(ConnControl::new(conn));
        let state = Arc::new(ConnState::new(self.bufsize, &control));

        context.set_attribute(context::CONN_STATE, state);

        if let Some(l) = &self.listener {
            l.connection_open(&**conn);
        }

        self.request_ready(conn);
    }

    pub fn closed(&self, conn: &Arc<dyn ClientConnection>) {
        debug!("connection closed: {:?}", conn.remote_addr());

        if let Some(l) = &self.listener {
            l.connection_closed(&**conn);
        }
    }

    pub fn request_ready(&self, conn: &Arc<dyn ClientConnection>) {
        let state = match Self::conn_state(conn) {
            Some(state) => state,
            None => return,
        };

        if let Err(e) = self.submit_next_request(conn, &state) {
            self.handle_failure(conn, &state, e);
        }
    }

    fn submit_next_request(
        &self,
        conn: &Arc<dyn ClientConnection>,
        state: &Arc<ConnState>,
    ) -> Result<(), Error> {
        let context = conn.context();

        let mut s = state.lock();

        if s.output_phase != OutputPhase::Ready {
            return Ok(());
        }

        // none available yet: the execution handler will call
        // request_output on the connection when it has one
        let mut request = match self.exec_handler.submit_request(context) {
            Some(request) => request,
            None => return Ok(()),
        };

        self.processor.process_request(&mut request.head, context)?;

        context.set_attribute(context::HTTP_REQUEST, request.head.clone());

        conn.submit_request(&request.head)?;
        s.output_phase = OutputPhase::RequestSent;

        conn.request_input();

        let has_entity = request.entity.is_some();
        let expect_continue = request.head.expect_continue();

        s.request = Some(request);

        if has_entity {
            if expect_continue {
                s.saved_timeout = Some(conn.socket_timeout());
                conn.set_socket_timeout(self.wait_for_continue);
                s.output_phase = OutputPhase::ExpectContinue;
            } else {
                self.send_request_body(conn, state, &mut s);
            }
        }

        state.notify_all();

        Ok(())
    }

    pub fn output_ready(&self, conn: &Arc<dyn ClientConnection>, encoder: &mut dyn ContentEncoder) {
        let state = match Self::conn_state(conn) {
            Some(state) => state,
            None => return,
        };

        let ret = {
            let mut s = state.lock();

            // holding the body back until 100 or timeout
            if s.output_phase == OutputPhase::ExpectContinue {
                conn.suspend_output();
                return;
            }

            match state.outbuffer().produce_content(encoder) {
                Ok(_) => {
                    if encoder.is_completed() {
                        s.output_phase = OutputPhase::BodyDone;
                    } else {
                        s.output_phase = OutputPhase::BodyStream;
                    }

                    state.notify_all();

                    Ok(())
                }
                Err(e) => Err(e),
            }
        };

        if let Err(e) = ret {
            self.handle_failure(conn, &state, Error::Io(e));
        }
    }

    pub fn response_received(&self, conn: &Arc<dyn ClientConnection>) {
        let state = match Self::conn_state(conn) {
            Some(state) => state,
            None => return,
        };

        if let Err(e) = self.process_response(conn, &state) {
            self.handle_failure(conn, &state, e);
        }
    }

    fn process_response(
        &self,
        conn: &Arc<dyn ClientConnection>,
        state: &Arc<ConnState>,
    ) -> Result<(), Error> {
        let context = conn.context();

        let mut s = state.lock();

        let mut response = match conn.take_response() {
            Some(response) => response,
            None => return Ok(()),
        };

        let code = response.head.code;

        if code < 200 {
            // interim response. only 100 while waiting for it matters
            if code == 100 && s.output_phase == OutputPhase::ExpectContinue {
                s.output_phase = OutputPhase::RequestSent;
                self.continue_request(conn, state, &mut s);

                state.notify_all();
            }

            return Ok(());
        }

        s.response = Some(response.head.clone());
        s.input_phase = InputPhase::ResponseReceived;

        if s.output_phase == OutputPhase::ExpectContinue {
            // final response before 100: the body will not be sent
            if let Some(timeout) = s.saved_timeout.take() {
                conn.set_socket_timeout(timeout);
            }

            conn.reset_output();
        }

        let can_have_body = match &s.request {
            Some(request) => can_response_have_body(&request.head, &response.head),
            None => false,
        };

        if !can_have_body {
            conn.reset_input();
            response.entity = None;
            s.input_phase = InputPhase::ResponseDone;

            if !self.reuse_strategy.keep_alive(&response.head, context) {
                close_connection(&**conn);
            }
        }

        if let Some(entity) = &mut response.entity {
            entity.set_content(Box::new(ContentSource::new(state.inbuffer())));
        }

        context.set_attribute(context::HTTP_RESPONSE, response.head.clone());

        self.processor.process_response(&mut response.head, context)?;

        self.dispatch_response_handler(conn, state, response);

        state.notify_all();

        Ok(())
    }

    pub fn input_ready(&self, conn: &Arc<dyn ClientConnection>, decoder: &mut dyn ContentDecoder) {
        let state = match Self::conn_state(conn) {
            Some(state) => state,
            None => return,
        };

        let ret = {
            let context = conn.context();

            let mut s = state.lock();

            match state.inbuffer().consume_content(decoder) {
                Ok(_) => {
                    if decoder.is_completed() {
                        s.input_phase = InputPhase::ResponseDone;

                        let keep_alive = match &s.response {
                            Some(response) => self.reuse_strategy.keep_alive(response, context),
                            None => false,
                        };

                        if !keep_alive {
                            close_connection(&**conn);
                        }
                    } else {
                        s.input_phase = InputPhase::BodyStream;
                    }

                    state.notify_all();

                    Ok(())
                }
                Err(e) => Err(e),
            }
        };

        if let Err(e) = ret {
            self.handle_failure(conn, &state, Error::Io(e));
        }
    }

    pub fn timeout(&self, conn: &Arc<dyn ClientConnection>) {
        debug!("connection timed out: {:?}", conn.remote_addr());

        if let Some(state) = Self::conn_state(conn) {
            let mut s = state.lock();

            // no 100 within the wait: proceed with the body anyway
            if s.output_phase == OutputPhase::ExpectContinue {
                s.output_phase = OutputPhase::RequestSent;
                self.continue_request(conn, &state, &mut s);

                state.notify_all();
            }
        }

        close_connection(&**conn);

        if let Some(l) = &self.listener {
            l.connection_timeout(&**conn);
        }
    }

    fn continue_request(
        &self,
        conn: &Arc<dyn ClientConnection>,
        state: &Arc<ConnState>,
        s: &mut StateInner,
    ) {
        if let Some(timeout) = s.saved_timeout.take() {
            conn.set_socket_timeout(timeout);
        }

        self.send_request_body(conn, state, s);
    }

    // taking the entity out of the stored request is what guarantees a
    // single body task per exchange
    fn send_request_body(
        &self,
        conn: &Arc<dyn ClientConnection>,
        state: &Arc<ConnState>,
        s: &mut StateInner,
    ) {
        let entity = match s.request.as_mut().and_then(|r| r.entity.take()) {
            Some(entity) => entity,
            None => return,
        };

        let conn = Arc::clone(conn);
        let state = Arc::clone(state);
        let listener = self.listener.clone();

        self.executor.execute(Box::new(move || {
            let mut entity = entity;
            let mut sink = ContentSink::new(state.outbuffer());

            if let Err(e) = write_entity(&mut *entity, &mut sink) {
                debug!("request body task failed: {}", e);

                shutdown_connection(&*conn, &state);

                if let Some(l) = &listener {
                    l.fatal_io_error(&e, &*conn);
                }
            }
        }));
    }

    fn dispatch_response_handler(
        &self,
        conn: &Arc<dyn ClientConnection>,
        state: &Arc<ConnState>,
        response: HttpResponse,
    ) {
        let conn = Arc::clone(conn);
        let state = Arc::clone(state);
        let exec_handler = Arc::clone(&self.exec_handler);
        let listener = self.listener.clone();

        self.executor.execute(Box::new(move || {
            let ret = exec_handler
                .handle_response(response, conn.context())
                .and_then(|_| {
                    let mut s = state.lock();

                    // the handler has returned; wait for the i/o thread to
                    // finish decoding the exchange
                    loop {
                        match s.input_phase {
                            InputPhase::ResponseDone => break,
                            InputPhase::Shutdown => {
                                return Err(interrupted("connection shut down"))
                            }
                            _ => s = state.wait(s),
                        }
                    }

                    state.reset_input(&mut s);
                    state.reset_output(&mut s);

                    state.notify_all();

                    if conn.is_open() {
                        conn.request_output();
                    }

                    Ok(())
                });

            if let Err(e) = ret {
                debug!("response handler task failed: {}", e);

                shutdown_connection(&*conn, &state);

                if let Some(l) = &listener {
                    l.fatal_io_error(&e, &*conn);
                }
            }
        }));
    }

    fn handle_failure(&self, conn: &Arc<dyn ClientConnection>, state: &Arc<ConnState>, e: Error) {
        match e {
            Error::Io(e) => {
                debug!("i/o failure on connection: {}", e);

                shutdown_connection(&**conn, state);

                if let Some(l) = &self.listener {
                    l.fatal_io_error(&e, &**conn);
                }
            }
            Error::Protocol(_) => {
                debug!("protocol failure on connection: {}", e);

                close_connection(&**conn);

                if let Some(l) = &self.listener {
                    l.fatal_protocol_error(&e, &**conn);
                }
            }
        }
    }
}

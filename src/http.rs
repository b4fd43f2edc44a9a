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

use arrayvec::ArrayVec;
use std::fmt;
use std::io;
use std::io::{Read, Write};

pub const HEADERS_MAX: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: String::from(name),
            value: String::from(value),
        }
    }
}

pub type Headers = ArrayVec<Header, HEADERS_MAX>;

fn get_header<'a>(headers: &'a Headers, name: &str) -> Option<&'a str> {
    for h in headers {
        if h.name.eq_ignore_ascii_case(name) {
            return Some(h.value.as_str());
        }
    }

    None
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpHost {
    pub hostname: String,
    pub port: u16,
}

impl fmt::Display for HttpHost {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.hostname, self.port)
    }
}

#[derive(Debug, Clone)]
pub struct RequestHead {
    pub method: String,
    pub uri: String,
    pub headers: Headers,
}

impl RequestHead {
    pub fn new(method: &str, uri: &str) -> Self {
        Self {
            method: String::from(method),
            uri: String::from(uri),
            headers: Headers::new(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        get_header(&self.headers, name)
    }

    pub fn expect_continue(&self) -> bool {
        match self.header("Expect") {
            Some(v) => v.eq_ignore_ascii_case("100-continue"),
            None => false,
        }
    }
}

pub trait RequestEntity: Send {
    fn content_length(&self) -> Option<u64>;

    fn write_to(&mut self, sink: &mut dyn Write) -> Result<(), io::Error>;
}

pub struct HttpRequest {
    pub head: RequestHead,
    pub entity: Option<Box<dyn RequestEntity>>,
}

impl HttpRequest {
    pub fn new(head: RequestHead) -> Self {
        Self { head, entity: None }
    }

    pub fn with_entity(head: RequestHead, entity: Box<dyn RequestEntity>) -> Self {
        Self {
            head,
            entity: Some(entity),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResponseHead {
    pub code: u16,
    pub reason: String,
    pub headers: Headers,
}

impl ResponseHead {
    pub fn new(code: u16, reason: &str) -> Self {
        Self {
            code,
            reason: String::from(reason),
            headers: Headers::new(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        get_header(&self.headers, name)
    }
}

pub struct ResponseEntity {
    content_length: Option<u64>,
    content: Option<Box<dyn Read + Send>>,
}

impl ResponseEntity {
    pub fn new(content_length: Option<u64>) -> Self {
        Self {
            content_length,
            content: None,
        }
    }

    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    pub(crate) fn set_content(&mut self, content: Box<dyn Read + Send>) {
        self.content = Some(content);
    }
}

impl Read for ResponseEntity {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, io::Error> {
        match &mut self.content {
            Some(r) => r.read(buf),
            None => Ok(0),
        }
    }
}

pub struct HttpResponse {
    pub head: ResponseHead,
    pub entity: Option<ResponseEntity>,
}

impl HttpResponse {
    pub fn new(head: ResponseHead) -> Self {
        Self { head, entity: None }
    }
}

// a response has no body if the paired request was HEAD, or the status is
// informational, 204 or 304
pub fn can_response_have_body(request: &RequestHead, response: &ResponseHead) -> bool {
    if request.method.eq_ignore_ascii_case("HEAD") {
        return false;
    }

    let code = response.code;

    code >= 200 && code != 204 && code != 304
}

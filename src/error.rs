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

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("protocol error: {0}")]
    Protocol(String),
}

impl Error {
    pub fn protocol(msg: &str) -> Self {
        Self::Protocol(msg.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for parameter {name}: {value}")]
    InvalidParam { name: &'static str, value: i64 },
}

pub(crate) fn interrupted(msg: &'static str) -> io::Error {
    io::Error::new(io::ErrorKind::Interrupted, msg)
}

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

use std::collections::HashMap;

pub const CONTENT_BUFFER_SIZE: &str = "content-buffer-size";
pub const WAIT_FOR_CONTINUE: &str = "wait-for-continue";

pub const CONTENT_BUFFER_SIZE_DEFAULT: i64 = 20_480;
pub const WAIT_FOR_CONTINUE_DEFAULT: i64 = 3_000;

#[derive(Clone, Default)]
pub struct Params {
    values: HashMap<String, i64>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_int(&mut self, name: &str, value: i64) -> &mut Self {
        self.values.insert(String::from(name), value);

        self
    }

    pub fn int_param(&self, name: &str, default: i64) -> i64 {
        match self.values.get(name) {
            Some(v) => *v,
            None => default,
        }
    }

    pub fn content_buffer_size(&self) -> i64 {
        self.int_param(CONTENT_BUFFER_SIZE, CONTENT_BUFFER_SIZE_DEFAULT)
    }

    pub fn wait_for_continue(&self) -> i64 {
        self.int_param(WAIT_FOR_CONTINUE, WAIT_FOR_CONTINUE_DEFAULT)
    }
}

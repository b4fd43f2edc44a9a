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

use std::any::Any;
use std::collections::HashMap;
use std::sync::Mutex;

pub const HTTP_CONNECTION: &str = "http.connection";
pub const HTTP_TARGET_HOST: &str = "http.target_host";
pub const HTTP_REQUEST: &str = "http.request";
pub const HTTP_RESPONSE: &str = "http.response";

pub(crate) const CONN_STATE: &str = "conn.state";

#[derive(Default)]
pub struct HttpContext {
    attrs: Mutex<HashMap<String, Box<dyn Any + Send + Sync>>>,
}

impl HttpContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_attribute<T: Any + Send + Sync>(&self, name: &str, value: T) {
        let attrs = &mut *self.attrs.lock().unwrap();

        attrs.insert(String::from(name), Box::new(value));
    }

    // values are cloned out so the map's lock is never held by callers
    pub fn get_attribute<T: Any + Send + Sync + Clone>(&self, name: &str) -> Option<T> {
        let attrs = &*self.attrs.lock().unwrap();

        attrs.get(name).and_then(|v| v.downcast_ref::<T>()).cloned()
    }

    pub fn remove_attribute(&self, name: &str) -> bool {
        let attrs = &mut *self.attrs.lock().unwrap();

        attrs.remove(name).is_some()
    }
}

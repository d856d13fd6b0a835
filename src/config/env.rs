// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Environment variable-based configuration provider implementation.
//!
//! `RENDERGATE_RENDER__ROOT_URL` maps to the key `render.root_url`: the
//! prefix is stripped, the rest is lower-cased and every double underscore
//! becomes a dot.  Single underscores survive so snake_case keys stay
//! addressable.

use serde_json::{Value, json};
use std::collections::HashMap;
use std::env;

use super::ConfigError;
use super::ConfigProvider;

/// Configuration provider that retrieves values from environment variables.
#[derive(Debug)]
pub struct EnvConfigProvider {
    prefix: String,
    cache: HashMap<String, String>,
}

impl EnvConfigProvider {
    /// Create a new environment variable configuration provider with the specified prefix.
    pub fn new(prefix: &str) -> Self {
        let mut provider = Self {
            prefix: prefix.to_string(),
            cache: HashMap::new(),
        };
        provider.refresh_cache();
        provider
    }

    /// Re-read the process environment.
    pub fn refresh_cache(&mut self) {
        self.cache = env::vars()
            .filter_map(|(key, value)| {
                key.strip_prefix(&self.prefix)
                    .map(|rest| (Self::key_for(rest), value))
            })
            .collect();
    }

    fn key_for(var: &str) -> String {
        var.to_lowercase().replace("__", ".")
    }

    /// Values are tried as JSON first so arrays and objects can be passed
    /// verbatim; anything else is a string, boolean or number.
    fn parse_value_to_json(&self, value: &str) -> Value {
        if let Ok(json_value) = serde_json::from_str(value) {
            return json_value;
        }

        if value.eq_ignore_ascii_case("true") {
            json!(true)
        } else if value.eq_ignore_ascii_case("false") {
            json!(false)
        } else {
            json!(value)
        }
    }
}

impl Default for EnvConfigProvider {
    fn default() -> Self {
        Self::new("RENDERGATE_")
    }
}

impl ConfigProvider for EnvConfigProvider {
    fn has(&self, key: &str) -> bool {
        self.cache.contains_key(key)
    }

    fn provider_name(&self) -> &str {
        "env"
    }

    fn get_raw(&self, key: &str) -> Result<Option<Value>, ConfigError> {
        Ok(self.cache.get(key).map(|value| self.parse_value_to_json(value)))
    }
}

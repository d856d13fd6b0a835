// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Configuration subsystem
//!
//! A running gate is created from an ordered list of [`ConfigProvider`]s;
//! later providers override earlier ones.  Typical stacking order:
//!
//! 1. `FileConfigProvider` – `rendergate.{toml,json,yaml}`
//! 2. `EnvConfigProvider`  – `RENDERGATE_RENDER__ROOT_URL=https://…`
//! 3. *your* provider implementing [`ConfigProvider`]
//!
//! First-class keys of the `render` section:
//!
//! | key | type | default | description |
//! |-----|------|---------|-------------|
//! | `render.root_url`        | string  | env `ROOT_URL` | Public origin of the application |
//! | `render.service_url`     | string  | env `RENDERGATE_SERVICE_URL` / `PRERENDER_SERVICE_URL` | Rendering service endpoint |
//! | `render.auth`            | string  | env `RENDERGATE_SERVICE_AUTH` / `PRERENDER_SERVICE_AUTH` | `user:pass` for Basic auth |
//! | `render.bots_ua`         | array   | built-in list | Bot User-Agent signatures (regex fragments) |
//! | `render.ignored_headers` | array   | built-in list | Upstream headers never forwarded |
//! | `render.only`            | array   | –      | Allow-list: strings or `{ "pattern": "…" }` |
//! | `render.only_re`         | string  | –      | Allow-pattern |
//! | `render.ignore`          | array   | –      | Deny-list (regex fragments) |
//! | `render.static_ext`      | string  | built-in pattern | Static-file exclusion pattern |
//! | `render.timeout`         | integer | `180000` | Upstream timeout in milliseconds |
//! | `render.sanitize_urls`   | bool    | `false` | Collapse repeated slashes |
//! | `render.request_options` | object  | `{}`   | Outbound request overrides |
//! | `render.debug`           | bool    | env `DEBUG` | Verbose per-request logging |

mod env;
pub mod error;
mod file;
mod options;

#[cfg(test)]
mod tests;

pub use env::EnvConfigProvider;
pub use error::ConfigError;
pub use file::{FileConfigProvider, FileFormat};
pub use options::{DEFAULT_TIMEOUT_MS, PathRule, RenderOptions};
pub(crate) use options::normalize_required_url;

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt::Debug;
use std::sync::Arc;

/// Core configuration provider trait that all configuration sources must implement.
/// This trait is object-safe since it doesn't contain generic methods.
pub trait ConfigProvider: Debug + Send + Sync {
    /// Check if the configuration provider has a value for the given key.
    fn has(&self, key: &str) -> bool;

    /// Get the name of the configuration provider for debugging purposes.
    fn provider_name(&self) -> &str;

    /// Get a raw configuration value by key.
    fn get_raw(&self, key: &str) -> Result<Option<Value>, ConfigError>;
}

/// Builder for the configuration system.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    providers: Vec<Arc<dyn ConfigProvider>>,
}

impl ConfigBuilder {
    /// Create a new configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a configuration provider.
    pub fn with_provider<P: ConfigProvider + 'static>(mut self, provider: P) -> Self {
        self.providers.push(Arc::new(provider));
        self
    }

    /// Add a provider that is already shared.
    pub fn with_shared_provider(mut self, provider: Arc<dyn ConfigProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> Config {
        Config {
            providers: self.providers,
        }
    }
}

/// Layered view over every registered provider.
#[derive(Debug, Clone)]
pub struct Config {
    providers: Vec<Arc<dyn ConfigProvider>>,
}

impl Config {
    /// Create a new configuration builder.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Get a raw configuration value; the most recently added provider wins.
    pub fn get_raw(&self, key: &str) -> Result<Option<Value>, ConfigError> {
        for provider in self.providers.iter().rev() {
            if provider.has(key) {
                return provider.get_raw(key);
            }
        }
        Ok(None)
    }

    /// Get a configuration value by key and deserialize it.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        match self.get_raw(key)? {
            Some(value) => serde_json::from_value(value).map(Some).map_err(|e| {
                ConfigError::ParseError(format!("failed to deserialize '{key}': {e}"))
            }),
            None => Ok(None),
        }
    }

    /// Get a configuration value by key with a default fallback value.
    pub fn get_or_default<T: DeserializeOwned>(
        &self,
        key: &str,
        default: T,
    ) -> Result<T, ConfigError> {
        match self.get(key)? {
            Some(value) => Ok(value),
            None => Ok(default),
        }
    }

    /// Names of the registered providers, lowest priority first.
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.provider_name()).collect()
    }
}

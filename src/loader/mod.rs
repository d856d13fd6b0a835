// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! High-level entry point.
//!
//! The [`RenderProxyLoader`] consumes configuration, installs logging,
//! builds the [`RenderGate`] and the fallback, and returns a
//! [`RenderProxy`] whose server is ready to start.

#[cfg(test)]
mod tests;

use std::sync::Arc;
use thiserror::Error;

use crate::config::{Config, ConfigError, ConfigProvider, EnvConfigProvider, FileConfigProvider, RenderOptions};
use crate::core::{ProxyError, RenderGate, RenderTransport};
use crate::logging::{self, config::LoggingConfig, log_error};
use crate::server::{Fallback, OriginFallback, RenderServer, ServerConfig};
use crate::{info_fmt, warn_fmt};

/// Errors that can occur while assembling a render proxy.
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("configuration error: {0}")]
    ConfigError(#[from] ConfigError),

    #[error("proxy error: {0}")]
    ProxyError(#[from] ProxyError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Builder for a [`RenderProxy`].
///
/// Providers are layered in this order, later ones winning: the explicit
/// [`Config`] or configuration file, then any custom providers, then the
/// environment.
#[derive(Debug, Default)]
pub struct RenderProxyLoader {
    config: Option<Config>,
    config_file_path: Option<String>,
    providers: Vec<Arc<dyn ConfigProvider>>,
    use_env_vars: bool,
    env_prefix: Option<String>,
    fallback: Option<Arc<dyn Fallback>>,
    transport: Option<Arc<dyn RenderTransport>>,
}

impl RenderProxyLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a prebuilt configuration; file and provider settings are ignored.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_config_file(mut self, file_path: &str) -> Self {
        self.config_file_path = Some(file_path.to_string());
        self
    }

    /// Read `RENDERGATE_*` environment variables.
    pub fn with_env_vars(mut self) -> Self {
        self.use_env_vars = true;
        self
    }

    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_string());
        self.use_env_vars = true;
        self
    }

    pub fn with_provider<P: ConfigProvider + 'static>(mut self, provider: P) -> Self {
        self.providers.push(Arc::new(provider));
        self
    }

    /// Serve non-rendered requests with `fallback` instead of `server.origin`.
    pub fn with_fallback<F: Fallback + 'static>(mut self, fallback: F) -> Self {
        self.fallback = Some(Arc::new(fallback));
        self
    }

    /// Talk to the rendering service through `transport`.
    pub fn with_transport<T: RenderTransport + 'static>(mut self, transport: T) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    fn assemble_config(
        config: Option<Config>,
        config_file_path: Option<String>,
        providers: Vec<Arc<dyn ConfigProvider>>,
        use_env_vars: bool,
        env_prefix: Option<String>,
    ) -> Result<Config, LoaderError> {
        if let Some(config) = config {
            return Ok(config);
        }

        let mut builder = Config::builder();
        if let Some(path) = config_file_path {
            builder = builder.with_provider(FileConfigProvider::new(&path)?);
        }
        for provider in providers {
            builder = builder.with_shared_provider(provider);
        }
        if use_env_vars {
            builder = match env_prefix {
                Some(prefix) => builder.with_provider(EnvConfigProvider::new(&prefix)),
                None => builder.with_provider(EnvConfigProvider::default()),
            };
        }
        Ok(builder.build())
    }

    pub async fn build(self) -> Result<RenderProxy, LoaderError> {
        let config = Self::assemble_config(
            self.config,
            self.config_file_path,
            self.providers,
            self.use_env_vars,
            self.env_prefix,
        )?;

        let level = logging::level_from_env();
        match config.get::<LoggingConfig>("logging") {
            Ok(Some(logging_config)) => logging::init_with_config(level, &logging_config),
            Ok(None) => logging::init(level),
            Err(e) => {
                logging::init(level);
                log_error("Loader", format!("Failed to read logging configuration: {}", e));
            }
        }

        info_fmt!("Loader", "rendergate starting up");

        let options = RenderOptions::from_config(&config);
        let gate = match self.transport {
            Some(transport) => RenderGate::with_transport(options, transport)?,
            None => RenderGate::new(options)?,
        };

        let defaults = ServerConfig::default();
        let server_config = ServerConfig {
            host: config.get_or_default("server.host", defaults.host)?,
            port: config.get_or_default("server.port", defaults.port)?,
            origin: config.get("server.origin")?,
        };

        let fallback = match (self.fallback, server_config.origin.as_deref()) {
            (Some(fallback), origin) => {
                if origin.is_some() {
                    warn_fmt!("Loader", "custom fallback supplied, `server.origin` is ignored");
                }
                fallback
            }
            (None, Some(origin)) => Arc::new(OriginFallback::new(origin)?) as Arc<dyn Fallback>,
            (None, None) => {
                return Err(LoaderError::Other(
                    "`server.origin` is required when no fallback is supplied".to_string(),
                ));
            }
        };

        info_fmt!(
            "Loader",
            "rendering {} through {}",
            gate.root_url(),
            gate.service_url()
        );

        let server = RenderServer::new(server_config, Arc::new(gate), fallback);
        Ok(RenderProxy {
            config: Arc::new(config),
            server,
        })
    }
}

/// A configured gate plus its HTTP server.
#[derive(Debug, Clone)]
pub struct RenderProxy {
    config: Arc<Config>,
    server: RenderServer,
}

impl RenderProxy {
    pub fn loader() -> RenderProxyLoader {
        RenderProxyLoader::new()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn gate(&self) -> &Arc<RenderGate> {
        self.server.gate()
    }

    pub fn server(&self) -> &RenderServer {
        &self.server
    }

    /// Run the server until Ctrl-C or SIGTERM.
    pub async fn start(&self) -> Result<(), LoaderError> {
        self.server.start().await.map_err(LoaderError::ProxyError)
    }
}

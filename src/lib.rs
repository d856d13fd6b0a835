// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! rendergate - serve pre-rendered HTML to crawlers.
//!
//! A [`RenderGate`] sits in front of a JavaScript application.  Requests
//! from search-engine and social-preview crawlers (or carrying the
//! `_escaped_fragment_` parameter) are proxied to an external rendering
//! service, and its response is streamed back verbatim.  Everything else,
//! along with any request the rendering service cannot serve before the
//! response has started, goes to the host's continuation untouched.
//!
//! # Embedding
//!
//! The gate is host agnostic: implement [`ResponseSink`] for your response
//! type and call [`RenderGate::middleware`] with a continuation.
//!
//! ```rust,no_run
//! use rendergate::{InboundRequest, RenderGate, RenderOptions, ResponseSink};
//!
//! async fn serve<S: ResponseSink>(gate: &RenderGate, request: InboundRequest, sink: S) {
//!     let rendered = gate
//!         .middleware(request, sink, |_request, _sink| async move {
//!             // hand the request to the application
//!         })
//!         .await;
//!     log::debug!("rendered: {rendered}");
//! }
//!
//! # fn main() -> Result<(), rendergate::ConfigError> {
//! let gate = RenderGate::new(
//!     RenderOptions::new("https://shop.example", "https://render.example")
//!         .with_ignore(vec!["/cart".to_string()]),
//! )?;
//! # let _ = gate;
//! # Ok(())
//! # }
//! ```
//!
//! # Stand-alone
//!
//! [`RenderProxy::loader`] reads layered configuration (files and
//! `RENDERGATE_*` environment variables), and runs a hyper server that
//! forwards non-rendered traffic to `server.origin`.

pub mod classify;
pub mod config;
pub mod core;
pub mod loader;
pub mod logging;
pub mod patterns;
pub mod server;

pub use classify::{ClassificationResult, Classifier};
pub use config::{Config, ConfigError, ConfigProvider, PathRule, RenderOptions};
pub use core::{
    InboundRequest, ProxyError, ProxyOutcome, RenderGate, RenderTransport, ResponseSink, SinkError,
};
pub use loader::{LoaderError, RenderProxy, RenderProxyLoader};
pub use server::{ChannelSink, Fallback, OriginFallback, RenderServer, ServerConfig};

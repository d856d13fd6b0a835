// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Core primitives: the gate, the request it inspects and the response
//! sink it writes to.
//!
//! No socket IO lives here; `server` adapts hyper connections onto
//! [`ResponseSink`], and `executor` talks to the rendering service through
//! a [`RenderTransport`].

mod executor;
pub mod lifecycle;


pub use executor::{BodyStream, OutboundRequest, RenderTransport, ReqwestTransport, UpstreamResponse};
pub use lifecycle::{Action, ClientState, Event, Lifecycle, ProxyOutcome};

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::future::BoxFuture;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use reqwest::{Method, StatusCode};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::classify::{ClassificationResult, Classifier};
use crate::config::{ConfigError, RenderOptions, normalize_required_url};
use crate::{info_fmt, patterns, warn_fmt};

use self::executor::OutboundTemplate;

/// Errors raised while talking to the rendering service.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// HTTP client error
    #[error("HTTP client error: {0}")]
    ClientError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("configuration error: {0}")]
    ConfigError(String),

    /// A `request_options` entry could not be applied
    #[error("invalid request option: {0}")]
    RequestOption(String),

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("{0}")]
    Other(String),
}

impl From<ConfigError> for ProxyError {
    fn from(err: ConfigError) -> Self {
        ProxyError::ConfigError(err.to_string())
    }
}

/// Errors from writing to a [`ResponseSink`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkError {
    #[error("response headers already sent")]
    HeadersSent,
    #[error("response already finished")]
    Finished,
    #[error("client connection closed")]
    Closed,
}

/// The parts of an inbound request the gate looks at.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub method: Method,
    path_and_query: String,
    pub headers: HeaderMap,
}

impl InboundRequest {
    pub fn new(method: Method, path_and_query: impl Into<String>) -> Self {
        Self {
            method,
            path_and_query: path_and_query.into(),
            headers: HeaderMap::new(),
        }
    }

    pub fn from_parts(parts: &hyper::http::request::Parts) -> Self {
        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());
        Self {
            method: parts.method.clone(),
            path_and_query,
            headers: parts.headers.clone(),
        }
    }

    /// Add a header; invalid names or values are dropped with a warning.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        match (HeaderName::try_from(name), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                self.headers.append(name, value);
            }
            _ => warn_fmt!("Request", "dropping invalid header {}", name),
        }
        self
    }

    pub fn path_and_query(&self) -> &str {
        &self.path_and_query
    }

    pub fn path(&self) -> &str {
        self.path_and_query
            .split_once('?')
            .map_or(self.path_and_query.as_str(), |(path, _)| path)
    }

    pub fn query(&self) -> Option<&str> {
        self.path_and_query.split_once('?').map(|(_, query)| query)
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.headers.get(USER_AGENT).and_then(|v| v.to_str().ok())
    }
}

/// Where the gate writes a rendered response.
///
/// Implementations must report `is_closed` once the client connection is
/// gone and resolve every future returned by `disconnected` at that point.
#[async_trait]
pub trait ResponseSink: Send {
    fn headers_sent(&self) -> bool;

    fn is_finished(&self) -> bool;

    fn is_closed(&self) -> bool;

    /// Replace all values of `name`.  Fails once headers are sent.
    fn set_header(&mut self, name: HeaderName, values: Vec<HeaderValue>) -> Result<(), SinkError>;

    /// Send the status line and the headers set so far.
    fn write_head(&mut self, status: StatusCode) -> Result<(), SinkError>;

    async fn write(&mut self, chunk: Bytes) -> Result<(), SinkError>;

    fn end(&mut self) -> Result<(), SinkError>;

    /// Resolves when the client disconnects.
    fn disconnected(&self) -> BoxFuture<'static, ()>;
}

/// Crawler-detecting middleware that proxies eligible requests to a
/// rendering service.
#[derive(Debug, Clone)]
pub struct RenderGate {
    classifier: Classifier,
    ignored_headers: Regex,
    outbound: OutboundTemplate,
    timeout: Duration,
    debug: bool,
    transport: Arc<dyn RenderTransport>,
}

impl RenderGate {
    /// Build a gate with the default HTTP transport.
    ///
    /// Unset URLs, auth and debug are read from the environment.  Missing
    /// or malformed URLs fail construction; every other bad option is
    /// reported and replaced by its default.
    pub fn new(options: RenderOptions) -> Result<Self, ConfigError> {
        let options = options.with_env_fallbacks();
        let transport = ReqwestTransport::new(options.timeout())
            .map_err(|e| ConfigError::Other(format!("failed to build HTTP client: {e}")))?;
        Self::build(options, Arc::new(transport))
    }

    /// Build a gate that talks to the rendering service through `transport`.
    pub fn with_transport(
        options: RenderOptions,
        transport: Arc<dyn RenderTransport>,
    ) -> Result<Self, ConfigError> {
        Self::build(options.with_env_fallbacks(), transport)
    }

    fn build(options: RenderOptions, transport: Arc<dyn RenderTransport>) -> Result<Self, ConfigError> {
        let root_url = normalize_required_url("root_url", "ROOT_URL", options.root_url.as_deref())?;
        let service_url = normalize_required_url(
            "service_url",
            "RENDERGATE_SERVICE_URL",
            options.service_url.as_deref(),
        )?;

        let classifier = Classifier::from_options(&options, root_url, service_url)?;
        let debug = options.debug.unwrap_or(false);

        if debug {
            info_fmt!(
                "RenderGate",
                "[DEBUG] rendering {} through {}",
                classifier.urls().root_url(),
                classifier.urls().service_url()
            );
        }

        Ok(Self {
            classifier,
            ignored_headers: patterns::ignored_headers(options.ignored_headers.as_deref()),
            outbound: OutboundTemplate::from_options(&options),
            timeout: options.timeout(),
            debug,
            transport,
        })
    }

    pub fn root_url(&self) -> &str {
        self.classifier.urls().root_url()
    }

    pub fn service_url(&self) -> &str {
        self.classifier.urls().service_url()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    pub fn classify(&self, request: &InboundRequest) -> ClassificationResult {
        self.classifier.classify(request)
    }

    pub fn resolve_request_url(&self, path_and_query: &str) -> Option<Url> {
        self.classifier.urls().resolve_request_url(path_and_query)
    }

    pub fn build_service_url(&self, resolved: &Url, user_agent: Option<&str>) -> String {
        self.classifier.urls().build_service_url(resolved, user_agent)
    }

    /// Whether a rendering-service response header is withheld from the client.
    pub fn is_ignored_header(&self, name: &str) -> bool {
        self.ignored_headers.is_match(name)
    }

    /// Per-request detail, logged at info level while `debug` is set.
    pub(crate) fn verbose(&self, args: fmt::Arguments<'_>) {
        if self.debug {
            info_fmt!("RenderGate", "[DEBUG] {}", args);
        }
    }

    /// Serve `request` from the rendering service when it is eligible,
    /// otherwise hand it to `next` untouched.
    ///
    /// Returns `true` when the gate owned the response, `false` when `next`
    /// was invoked.  `next` is called at most once and never after the
    /// client disconnected.
    pub async fn middleware<S, N, F>(&self, request: InboundRequest, mut sink: S, next: N) -> bool
    where
        S: ResponseSink,
        N: FnOnce(InboundRequest, S) -> F + Send,
        F: Future<Output = ()> + Send,
    {
        let classification = self.classify(&request);
        let target = classification.url.as_ref().filter(|_| classification.eligible);

        let Some(target) = target else {
            self.verbose(format_args!(
                "{} {} not eligible for rendering",
                request.method,
                request.path_and_query()
            ));
            next(request, sink).await;
            return false;
        };

        let service_url = self.build_service_url(target, request.user_agent());
        self.verbose(format_args!("rendering {} via {}", target, service_url));

        let outbound = match self.outbound.build(&request.method, service_url) {
            Ok(outbound) => outbound,
            Err(e) => {
                warn_fmt!("RenderGate", "Exception while preparing rendering request: {}", e);
                next(request, sink).await;
                return false;
            }
        };

        let dispatch = self.execute(&request.method, outbound, &mut sink).await;
        self.verbose(format_args!(
            "{} finished as {:?}",
            request.path_and_query(),
            dispatch.outcome
        ));

        if dispatch.deferred {
            next(request, sink).await;
            return false;
        }
        true
    }

    /// Alias of [`middleware`](Self::middleware).
    pub async fn handle<S, N, F>(&self, request: InboundRequest, sink: S, next: N) -> bool
    where
        S: ResponseSink,
        N: FnOnce(InboundRequest, S) -> F + Send,
        F: Future<Output = ()> + Send,
    {
        self.middleware(request, sink, next).await
    }

    /// Alias of [`middleware`](Self::middleware).
    pub async fn handler<S, N, F>(&self, request: InboundRequest, sink: S, next: N) -> bool
    where
        S: ResponseSink,
        N: FnOnce(InboundRequest, S) -> F + Send,
        F: Future<Output = ()> + Send,
    {
        self.middleware(request, sink, next).await
    }
}

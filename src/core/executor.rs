// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Proxy execution: building the outbound request, racing the rendering
//! service against the client and the timers, and streaming the result.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use futures_util::stream::{BoxStream, StreamExt, TryStreamExt};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde_json::{Map, Value, json};
use std::fmt;
use std::time::Duration;

use super::lifecycle::{Action, ClientState, Event, Lifecycle, ProxyOutcome};
use super::{ProxyError, RenderGate, ResponseSink, SinkError};
use crate::config::RenderOptions;
use crate::{debug_fmt, warn_fmt};

/// Idle connections to the rendering service are kept this long.
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(190);

pub type BodyStream = BoxStream<'static, Result<Bytes, ProxyError>>;

/// A fully resolved request to the rendering service.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    /// Overrides the gate timeout when set through `request_options`.
    pub timeout: Option<Duration>,
}

/// Response head and streaming body from the rendering service.
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: BodyStream,
}

impl fmt::Debug for UpstreamResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Sends requests to the rendering service.
///
/// Dropping the returned future or body stream must abort the request.
#[async_trait]
pub trait RenderTransport: fmt::Debug + Send + Sync {
    async fn send(&self, request: OutboundRequest) -> Result<UpstreamResponse, ProxyError>;
}

/// Default transport over a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(connect_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .pool_idle_timeout(POOL_IDLE_TIMEOUT)
            .tcp_nodelay(true)
            .connect_timeout(connect_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RenderTransport for ReqwestTransport {
    async fn send(&self, request: OutboundRequest) -> Result<UpstreamResponse, ProxyError> {
        let response = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers)
            .send()
            .await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes_stream().map_err(ProxyError::from).boxed();

        Ok(UpstreamResponse { status, headers, body })
    }
}

/// Per-gate request defaults merged with `request_options`.
#[derive(Debug, Clone)]
pub(crate) struct OutboundTemplate {
    user_agent: String,
    authorization: Option<String>,
    overrides: Map<String, Value>,
}

impl OutboundTemplate {
    pub(crate) fn from_options(options: &RenderOptions) -> Self {
        Self {
            user_agent: format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            authorization: options
                .auth
                .as_deref()
                .filter(|auth| !auth.is_empty())
                .map(|auth| format!("Basic {}", STANDARD.encode(auth))),
            overrides: options.request_options.clone(),
        }
    }

    fn defaults(&self, method: &Method) -> Map<String, Value> {
        let mut headers = Map::new();
        headers.insert("user-agent".into(), json!(self.user_agent));
        headers.insert("accept".into(), json!("*/*"));
        if let Some(auth) = &self.authorization {
            headers.insert("authorization".into(), json!(auth));
        }

        let mut base = Map::new();
        base.insert("method".into(), json!(method.as_str()));
        base.insert("headers".into(), Value::Object(headers));
        base
    }

    pub(crate) fn build(&self, method: &Method, url: String) -> Result<OutboundRequest, ProxyError> {
        let mut merged = self.defaults(method);
        deep_merge(&mut merged, &normalize_header_keys(&self.overrides));

        let mut request = OutboundRequest {
            method: method.clone(),
            url,
            headers: HeaderMap::new(),
            timeout: None,
        };

        for (key, value) in &merged {
            match key.as_str() {
                "method" => {
                    let name = value
                        .as_str()
                        .ok_or_else(|| ProxyError::RequestOption(format!("method {value} is not a string")))?;
                    request.method = Method::from_bytes(name.to_uppercase().as_bytes())
                        .map_err(|e| ProxyError::RequestOption(format!("method {name}: {e}")))?;
                }
                "headers" => request.headers = header_map(value)?,
                "timeout" => {
                    let ms = value
                        .as_u64()
                        .ok_or_else(|| ProxyError::RequestOption(format!("timeout {value} is not a number of ms")))?;
                    request.timeout = Some(Duration::from_millis(ms)).filter(|d| !d.is_zero());
                }
                other => debug_fmt!("RenderGate", "request option `{}` is not supported, ignored", other),
            }
        }

        Ok(request)
    }
}

/// Recursively merge `overrides` into `base`.  Objects merge key by key;
/// any other value replaces what was there.
pub(crate) fn deep_merge(base: &mut Map<String, Value>, overrides: &Map<String, Value>) {
    for (key, value) in overrides {
        match (base.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => deep_merge(existing, incoming),
            _ => {
                base.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Header names are case-insensitive; lowercase override keys so they
/// replace the defaults instead of duplicating them.
fn normalize_header_keys(overrides: &Map<String, Value>) -> Map<String, Value> {
    let mut normalized = overrides.clone();
    if let Some(Value::Object(headers)) = normalized.get_mut("headers") {
        *headers = headers
            .iter()
            .map(|(k, v)| (k.to_lowercase(), v.clone()))
            .collect();
    }
    normalized
}

fn header_map(value: &Value) -> Result<HeaderMap, ProxyError> {
    let Value::Object(entries) = value else {
        return Err(ProxyError::RequestOption("headers must be an object".to_string()));
    };

    let mut headers = HeaderMap::new();
    for (name, value) in entries {
        let text = match value {
            Value::Null => continue,
            Value::String(s) => s.clone(),
            Value::Number(_) | Value::Bool(_) => value.to_string(),
            _ => {
                return Err(ProxyError::RequestOption(format!("header {name} must be a scalar")));
            }
        };
        let name = HeaderName::try_from(name.as_str())
            .map_err(|e| ProxyError::RequestOption(format!("header {name}: {e}")))?;
        let value = HeaderValue::from_str(&text)
            .map_err(|e| ProxyError::RequestOption(format!("header {name}: {e}")))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

/// How a proxied request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Dispatch {
    pub outcome: ProxyOutcome,
    pub deferred: bool,
}

/// A write into a closed client is a disconnect, not a write error.
fn write_failure<S: ResponseSink>(sink: &S, error: SinkError) -> Event {
    if error == SinkError::Closed || sink.is_closed() {
        Event::ClientDisconnect
    } else {
        Event::ClientWriteError(error)
    }
}

enum Step {
    Chunk(Bytes),
    Settle(Event),
}

impl RenderGate {
    /// Proxy `outbound` into `sink` until exactly one event settles it.
    pub(crate) async fn execute<S: ResponseSink>(
        &self,
        method: &Method,
        outbound: OutboundRequest,
        sink: &mut S,
    ) -> Dispatch {
        let lifecycle = Lifecycle::new();
        let deadline = outbound.timeout.unwrap_or(self.timeout);
        let mut disconnected = sink.disconnected();

        let mut pending = self.transport.send(outbound);
        let send_timer = tokio::time::sleep(deadline);
        tokio::pin!(send_timer);

        let response = tokio::select! {
            biased;
            _ = &mut disconnected => Err(Event::ClientDisconnect),
            result = &mut pending => result.map_err(Event::UpstreamError),
            _ = &mut send_timer => Err(Event::SendTimeout(deadline)),
        };

        let response = match response {
            Ok(response) => response,
            Err(event) => return self.settle(&lifecycle, event, sink, pending),
        };
        drop(pending);

        let status = response.status;
        let mut body = response.body;

        if !sink.headers_sent() {
            for name in response.headers.keys() {
                if self.is_ignored_header(name.as_str()) {
                    continue;
                }
                let values = response.headers.get_all(name).iter().cloned().collect();
                if let Err(e) = sink.set_header(name.clone(), values) {
                    debug_fmt!("RenderGate", "could not copy header {}: {}", name, e);
                }
            }
        }

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            warn_fmt!(
                "RenderGate",
                "rendering service rejected credentials ({}), check the configured auth",
                status
            );
        }

        if sink.is_closed() {
            return self.settle(&lifecycle, Event::ClientDisconnect, sink, body);
        }
        if !sink.headers_sent() {
            if let Err(e) = sink.write_head(status) {
                return self.settle(&lifecycle, write_failure(sink, e), sink, body);
            }
        }

        if method == Method::HEAD {
            return self.settle(&lifecycle, Event::UpstreamComplete, sink, body);
        }

        loop {
            let step = tokio::select! {
                biased;
                _ = &mut disconnected => Step::Settle(Event::ClientDisconnect),
                chunk = body.next() => match chunk {
                    Some(Ok(bytes)) => Step::Chunk(bytes),
                    Some(Err(e)) => Step::Settle(Event::UpstreamError(e)),
                    None => Step::Settle(Event::UpstreamComplete),
                },
                _ = tokio::time::sleep(deadline) => Step::Settle(Event::ReceiveTimeout(deadline)),
            };

            match step {
                Step::Chunk(bytes) => {
                    if sink.is_closed() {
                        return self.settle(&lifecycle, Event::ClientDisconnect, sink, body);
                    }
                    if sink.is_finished() || bytes.is_empty() {
                        continue;
                    }
                    // A client that stops reading must not outlive the idle deadline.
                    let written = tokio::select! {
                        biased;
                        _ = &mut disconnected => Err(Event::ClientDisconnect),
                        result = sink.write(bytes) => Ok(result),
                        _ = tokio::time::sleep(deadline) => Err(Event::ReceiveTimeout(deadline)),
                    };
                    match written {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => return self.settle(&lifecycle, write_failure(sink, e), sink, body),
                        Err(event) => return self.settle(&lifecycle, event, sink, body),
                    }
                }
                Step::Settle(event) => return self.settle(&lifecycle, event, sink, body),
            }
        }
    }

    /// Apply the first settling event.  `outbound` is whatever still holds
    /// the upstream connection; it is released here.
    fn settle<S: ResponseSink, R>(
        &self,
        lifecycle: &Lifecycle,
        event: Event,
        sink: &mut S,
        outbound: R,
    ) -> Dispatch {
        let client = ClientState::of(sink);
        let action = lifecycle.settle(&event, client);

        if lifecycle.release_outbound() {
            drop(outbound);
        }

        let Some(action) = action else {
            return Dispatch {
                outcome: lifecycle.outcome().unwrap_or(ProxyOutcome::Errored),
                deferred: false,
            };
        };

        match action {
            Action::Finish => {
                if !sink.is_finished() && !sink.is_closed() {
                    let _ = sink.end();
                }
            }
            Action::FinishEmpty => {
                debug_fmt!("RenderGate", "{} after response started, closing client", event);
                if !sink.headers_sent() && !sink.is_closed() {
                    let _ = sink.write_head(StatusCode::OK);
                }
                if !sink.is_finished() && !sink.is_closed() {
                    let _ = sink.end();
                }
            }
            Action::Defer => match &event {
                Event::ClientWriteError(e) => {
                    warn_fmt!("RenderGate", "[RES] unexpected error: {}", e);
                }
                _ => warn_fmt!("RenderGate", "Error while connecting to rendering service: {}", event),
            },
            Action::Teardown => {
                self.verbose(format_args!("client disconnected, aborting rendering request"));
                if !sink.is_finished() {
                    let _ = sink.end();
                }
            }
        }

        Dispatch {
            outcome: event.outcome(),
            deferred: action == Action::Defer,
        }
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTP server for rendergate.
//!
//! A thin wrapper around **hyper-util**: it owns the listening socket,
//! runs every request through the [`RenderGate`] and hands whatever the
//! gate does not render to a [`Fallback`], by default the origin
//! application.
//!
//! Uses `hyper_util::server::conn::auto::Builder`, so one connection
//! handles both HTTP/1.1 and HTTP/2.

mod fallback;
mod sink;


pub use fallback::{Fallback, OriginFallback};
pub use sink::{BodyReceiver, ChannelSink, ResponseHead};

use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as AutoBuilder;
use reqwest::{Body, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::{RwLock, oneshot};
use tokio::task::{Id, JoinSet};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

use crate::core::{InboundRequest, ProxyError, RenderGate};
use crate::logging::structured::RequestInfo;
use crate::{debug_fmt, error_fmt, info_fmt, warn_fmt};

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// The `server` configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Origin application that serves everything not rendered.
    #[serde(default)]
    pub origin: Option<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            origin: None,
        }
    }
}

/// HTTP front end of a render gate.
#[derive(Debug, Clone)]
pub struct RenderServer {
    config: ServerConfig,
    gate: Arc<RenderGate>,
    fallback: Arc<dyn Fallback>,
    shutdown_senders: Arc<RwLock<HashMap<Id, oneshot::Sender<()>>>>,
}

impl RenderServer {
    pub fn new(config: ServerConfig, gate: Arc<RenderGate>, fallback: Arc<dyn Fallback>) -> Self {
        Self {
            config,
            gate,
            fallback,
            shutdown_senders: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn gate(&self) -> &Arc<RenderGate> {
        &self.gate
    }

    /// Bind the configured address and serve until Ctrl-C or SIGTERM.
    pub async fn start(&self) -> Result<(), ProxyError> {
        let addr = format!("{}:{}", self.config.host, self.config.port)
            .parse::<SocketAddr>()
            .map_err(|e| ProxyError::Other(format!("Invalid server address: {}", e)))?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ProxyError::Other(format!("Failed to bind: {}", e)))?;

        #[cfg(unix)]
        let mut term_stream = signal(SignalKind::terminate())
            .map_err(|e| ProxyError::Other(format!("Cannot install SIGTERM handler: {}", e)))?;

        let shutdown = async move {
            #[cfg(unix)]
            let sigterm = term_stream.recv();
            #[cfg(not(unix))]
            let sigterm = std::future::pending::<Option<()>>();

            tokio::select! {
                _ = signal::ctrl_c() => info_fmt!("Server", "Received Ctrl-C; initiating graceful shutdown"),
                _ = sigterm => info_fmt!("Server", "Received SIGTERM; initiating graceful shutdown"),
            }
        };

        self.serve(listener, shutdown).await
    }

    /// Serve connections from `listener` until `shutdown` resolves, then
    /// drain open connections.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<(), ProxyError>
    where
        F: Future<Output = ()> + Send,
    {
        let addr = listener.local_addr()?;
        info_fmt!("Server", "rendergate listening on http://{}", addr);

        tokio::pin!(shutdown);
        let mut join_set = JoinSet::new();

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accept = listener.accept() => {
                    let (stream, remote_addr) = match accept {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            error_fmt!("Server", "Accept error: {}", e);
                            continue;
                        }
                    };

                    let gate = self.gate.clone();
                    let fallback = self.fallback.clone();
                    let client_ip = remote_addr.ip().to_string();
                    let (tx, rx) = oneshot::channel();
                    let shutdown_senders = self.shutdown_senders.clone();

                    let handle = join_set.spawn(async move {
                        let task_id = tokio::task::id();
                        let service = service_fn(move |req: Request<Incoming>| {
                            handle_request(req, gate.clone(), fallback.clone(), client_ip.clone())
                        });

                        let mut builder = AutoBuilder::new(TokioExecutor::new());
                        builder.http1();
                        builder.http2();

                        let connection = builder.serve_connection(TokioIo::new(stream), service);
                        let mut conn = std::pin::pin!(connection);

                        tokio::select! {
                            res = &mut conn => log_connection_end(res.map_err(|e| e.to_string())),
                            _ = rx => {
                                debug_fmt!("Server", "Connection received shutdown signal");
                                conn.as_mut().graceful_shutdown();
                                log_connection_end(conn.await.map_err(|e| e.to_string()));
                            }
                        }

                        shutdown_senders.write().await.remove(&task_id);
                    });

                    self.shutdown_senders.write().await.insert(handle.id(), tx);
                }
            }
        }

        {
            let mut senders = self.shutdown_senders.write().await;
            info_fmt!("Server", "Shutting down; signalling {} connection(s)", senders.len());
            for (_, sender) in senders.drain() {
                let _ = sender.send(());
            }
        }

        let drain = async {
            while let Some(res) = join_set.join_next().await {
                if let Err(e) = res {
                    if !e.is_cancelled() {
                        error_fmt!("Server", "Connection task failed: {}", e);
                    }
                }
            }
        };

        if tokio::time::timeout(SHUTDOWN_TIMEOUT, drain).await.is_err() {
            warn_fmt!(
                "Server",
                "Shutdown timed out after {} seconds, closing remaining connections",
                SHUTDOWN_TIMEOUT.as_secs()
            );
            join_set.shutdown().await;
        }

        info_fmt!("Server", "Shutdown complete");
        Ok(())
    }
}

fn log_connection_end(result: Result<(), String>) {
    match result {
        Ok(()) => debug_fmt!("Server", "Connection closed"),
        Err(e) if e.contains("connection closed") || e.contains("connection reset") => {
            debug_fmt!("Server", "Connection closed: {}", e)
        }
        Err(e) => error_fmt!("Server", "Connection error: {}", e),
    }
}

/// Run one request through the gate, falling back to `fallback`.
async fn handle_request(
    req: Request<Incoming>,
    gate: Arc<RenderGate>,
    fallback: Arc<dyn Fallback>,
    client_ip: String,
) -> Result<Response<Body>, Infallible> {
    let (parts, body) = req.into_parts();
    let inbound = InboundRequest::from_parts(&parts);
    let info = RequestInfo::new(
        parts.method.to_string(),
        inbound.path().to_string(),
        client_ip,
        inbound.user_agent().unwrap_or("-").to_string(),
    );
    debug_fmt!(
        "Server",
        "[{}] {} {} from {} ({})",
        info.trace_id,
        info.method,
        info.path,
        info.remote_addr,
        info.user_agent
    );

    let request_body = Body::wrap_stream(body.into_data_stream());
    let (sink, head, response_body) = ChannelSink::channel();
    let trace_id = info.trace_id.clone();

    tokio::spawn(async move {
        let rendered = gate
            .middleware(inbound, sink, move |request, sink| async move {
                fallback.serve(request, request_body, sink).await;
            })
            .await;
        debug_fmt!(
            "Server",
            "[{}] {} in {}ms",
            info.trace_id,
            if rendered { "rendered" } else { "passed on" },
            info.elapsed_ms()
        );
    });

    match head.await {
        Ok(ResponseHead { status, headers }) => {
            let mut response = Response::new(Body::wrap_stream(response_body));
            *response.status_mut() = status;
            *response.headers_mut() = headers;
            Ok(response)
        }
        Err(_) => {
            error_fmt!("Server", "[{}] request finished without a response", trace_id);
            let mut response = Response::new(Body::from("Internal Server Error"));
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            Ok(response)
        }
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! What the server does with requests the gate does not render.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderName};
use reqwest::{Body, StatusCode};
use std::fmt;

use super::sink::ChannelSink;
use crate::core::{InboundRequest, ProxyError, ResponseSink};
use crate::{debug_fmt, warn_fmt};

/// Headers that describe a single hop and are never forwarded.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "host",
];

/// Serves requests the gate handed on.
#[async_trait]
pub trait Fallback: fmt::Debug + Send + Sync {
    async fn serve(&self, request: InboundRequest, body: Body, sink: ChannelSink);
}

/// Forwards requests to the origin application.
#[derive(Debug, Clone)]
pub struct OriginFallback {
    origin: String,
    client: reqwest::Client,
}

impl OriginFallback {
    pub fn new(origin: &str) -> Result<Self, ProxyError> {
        let origin = crate::config::normalize_required_url("server.origin", "RENDERGATE_SERVER__ORIGIN", Some(origin))?;
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { origin, client })
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }
}

fn strip_hop_by_hop(headers: &HeaderMap) -> HeaderMap {
    let mut forwarded = headers.clone();
    for name in HOP_BY_HOP {
        forwarded.remove(*name);
    }
    forwarded
}

#[async_trait]
impl Fallback for OriginFallback {
    async fn serve(&self, request: InboundRequest, body: Body, mut sink: ChannelSink) {
        let url = format!("{}{}", self.origin, request.path_and_query());
        debug_fmt!("Origin", "{} {}", request.method, url);

        let result = self
            .client
            .request(request.method.clone(), &url)
            .headers(strip_hop_by_hop(&request.headers))
            .body(body)
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                warn_fmt!("Origin", "{} failed: {}", url, e);
                let _ = sink.set_header(
                    HeaderName::from_static("content-type"),
                    vec![reqwest::header::HeaderValue::from_static("text/plain")],
                );
                let _ = sink.write_head(StatusCode::BAD_GATEWAY);
                let _ = sink.write(Bytes::from_static(b"Bad Gateway")).await;
                let _ = sink.end();
                return;
            }
        };

        let mut headers = strip_hop_by_hop(response.headers());
        headers.remove(reqwest::header::CONTENT_LENGTH);
        for name in headers.keys() {
            let values = headers.get_all(name).iter().cloned().collect();
            let _ = sink.set_header(name.clone(), values);
        }
        if sink.write_head(response.status()).is_err() {
            return;
        }

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(bytes) => {
                    if sink.write(bytes).await.is_err() {
                        debug_fmt!("Origin", "client went away while streaming {}", url);
                        return;
                    }
                }
                Err(e) => {
                    warn_fmt!("Origin", "error streaming {}: {}", url, e);
                    break;
                }
            }
        }
        let _ = sink.end();
    }
}

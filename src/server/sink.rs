// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! [`ResponseSink`] over channels feeding a hyper response.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::Stream;
use futures_util::future::BoxFuture;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::{mpsc, oneshot, watch};

use crate::core::{ResponseSink, SinkError};

const BODY_BUFFER: usize = 16;

/// Status and headers, delivered once.
#[derive(Debug)]
pub struct ResponseHead {
    pub status: StatusCode,
    pub headers: HeaderMap,
}

/// Writes a response into channels read by the connection task.
///
/// The client counts as disconnected once the paired [`BodyReceiver`] is
/// dropped, which hyper does when the connection goes away.
#[derive(Debug)]
pub struct ChannelSink {
    headers: HeaderMap,
    head: Option<oneshot::Sender<ResponseHead>>,
    body: Option<mpsc::Sender<Result<Bytes, io::Error>>>,
    closed: watch::Receiver<bool>,
    finished: bool,
}

/// Body half of a [`ChannelSink`].
#[derive(Debug)]
pub struct BodyReceiver {
    chunks: mpsc::Receiver<Result<Bytes, io::Error>>,
    closed: watch::Sender<bool>,
}

impl ChannelSink {
    pub fn channel() -> (Self, oneshot::Receiver<ResponseHead>, BodyReceiver) {
        let (head_tx, head_rx) = oneshot::channel();
        let (body_tx, body_rx) = mpsc::channel(BODY_BUFFER);
        let (closed_tx, closed_rx) = watch::channel(false);

        let sink = Self {
            headers: HeaderMap::new(),
            head: Some(head_tx),
            body: Some(body_tx),
            closed: closed_rx,
            finished: false,
        };
        let receiver = BodyReceiver {
            chunks: body_rx,
            closed: closed_tx,
        };
        (sink, head_rx, receiver)
    }

    fn ensure_head(&mut self) -> Result<(), SinkError> {
        if self.head.is_some() {
            self.write_head(StatusCode::OK)?;
        }
        Ok(())
    }
}

#[async_trait]
impl ResponseSink for ChannelSink {
    fn headers_sent(&self) -> bool {
        self.head.is_none()
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn is_closed(&self) -> bool {
        *self.closed.borrow() || self.body.as_ref().is_some_and(|tx| tx.is_closed())
    }

    fn set_header(&mut self, name: HeaderName, values: Vec<HeaderValue>) -> Result<(), SinkError> {
        if self.headers_sent() {
            return Err(SinkError::HeadersSent);
        }
        self.headers.remove(&name);
        for value in values {
            self.headers.append(name.clone(), value);
        }
        Ok(())
    }

    fn write_head(&mut self, status: StatusCode) -> Result<(), SinkError> {
        let head = self.head.take().ok_or(SinkError::HeadersSent)?;
        let headers = std::mem::take(&mut self.headers);
        head.send(ResponseHead { status, headers })
            .map_err(|_| SinkError::Closed)
    }

    async fn write(&mut self, chunk: Bytes) -> Result<(), SinkError> {
        if self.finished {
            return Err(SinkError::Finished);
        }
        self.ensure_head()?;
        let body = self.body.as_ref().ok_or(SinkError::Finished)?;
        body.send(Ok(chunk)).await.map_err(|_| SinkError::Closed)
    }

    fn end(&mut self) -> Result<(), SinkError> {
        if self.finished {
            return Err(SinkError::Finished);
        }
        self.finished = true;
        let head = self.ensure_head();
        self.body = None;
        head
    }

    fn disconnected(&self) -> BoxFuture<'static, ()> {
        let mut closed = self.closed.clone();
        Box::pin(async move {
            let _ = closed.wait_for(|closed| *closed).await;
        })
    }
}

impl Stream for BodyReceiver {
    type Item = Result<Bytes, io::Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.chunks.poll_recv(cx)
    }
}

impl Drop for BodyReceiver {
    fn drop(&mut self) {
        self.closed.send_replace(true);
    }
}

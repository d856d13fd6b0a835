// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Proxy lifecycle: a one-shot latch over the events that can end a proxied
//! request, and the table mapping each event to what happens next.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::Duration;

use super::{ProxyError, ResponseSink, SinkError};

/// Terminal state of a proxied request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyOutcome {
    Completed,
    ClientAborted,
    Errored,
    TimedOut,
}

const PENDING: u8 = 0;

impl ProxyOutcome {
    fn encode(self) -> u8 {
        match self {
            ProxyOutcome::Completed => 1,
            ProxyOutcome::ClientAborted => 2,
            ProxyOutcome::Errored => 3,
            ProxyOutcome::TimedOut => 4,
        }
    }

    fn decode(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(ProxyOutcome::Completed),
            2 => Some(ProxyOutcome::ClientAborted),
            3 => Some(ProxyOutcome::Errored),
            4 => Some(ProxyOutcome::TimedOut),
            _ => None,
        }
    }
}

/// Anything that can settle a pending request.
#[derive(Debug)]
pub enum Event {
    /// The rendering service finished its response.
    UpstreamComplete,
    /// Connecting to or reading from the rendering service failed.
    UpstreamError(ProxyError),
    /// No response headers within the deadline.
    SendTimeout(Duration),
    /// No body chunk within the deadline.
    ReceiveTimeout(Duration),
    /// The client went away.
    ClientDisconnect,
    /// Writing to the client failed.
    ClientWriteError(SinkError),
}

impl Event {
    pub fn outcome(&self) -> ProxyOutcome {
        match self {
            Event::UpstreamComplete => ProxyOutcome::Completed,
            Event::ClientDisconnect => ProxyOutcome::ClientAborted,
            Event::SendTimeout(_) | Event::ReceiveTimeout(_) => ProxyOutcome::TimedOut,
            Event::UpstreamError(_) | Event::ClientWriteError(_) => ProxyOutcome::Errored,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::UpstreamComplete => write!(f, "upstream complete"),
            Event::UpstreamError(e) => write!(f, "{e}"),
            Event::SendTimeout(d) => write!(f, "no response headers within {}ms", d.as_millis()),
            Event::ReceiveTimeout(d) => write!(f, "response body stalled for {}ms", d.as_millis()),
            Event::ClientDisconnect => write!(f, "client disconnected"),
            Event::ClientWriteError(e) => write!(f, "{e}"),
        }
    }
}

/// Snapshot of the client response when an event fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClientState {
    pub headers_sent: bool,
    pub finished: bool,
    pub closed: bool,
}

impl ClientState {
    pub fn of<S: ResponseSink + ?Sized>(sink: &S) -> Self {
        Self {
            headers_sent: sink.headers_sent(),
            finished: sink.is_finished(),
            closed: sink.is_closed(),
        }
    }

    /// Nothing has been written and the connection is usable, so another
    /// handler can still produce the whole response.
    pub fn is_untouched(&self) -> bool {
        !self.headers_sent && !self.finished && !self.closed
    }
}

/// What the executor does once an event settles the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// End the client response normally.
    Finish,
    /// Send a bare 200 if nothing was sent yet, then end.
    FinishEmpty,
    /// Leave the client untouched and hand the request to the continuation.
    Defer,
    /// End the client response as far as possible; never continue.
    Teardown,
}

/// Map a settling event onto its action.
pub fn decide(event: &Event, client: ClientState) -> Action {
    match event {
        Event::UpstreamComplete => Action::Finish,
        Event::UpstreamError(_) | Event::SendTimeout(_) | Event::ReceiveTimeout(_) => {
            if client.is_untouched() {
                Action::Defer
            } else {
                Action::FinishEmpty
            }
        }
        Event::ClientDisconnect => Action::Teardown,
        Event::ClientWriteError(_) => Action::Defer,
    }
}

/// One-shot latch.  The first event to settle wins; the outbound resource
/// is released exactly once.
#[derive(Debug, Default)]
pub struct Lifecycle {
    state: AtomicU8,
    released: AtomicBool,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outcome(&self) -> Option<ProxyOutcome> {
        ProxyOutcome::decode(self.state.load(Ordering::Acquire))
    }

    pub fn is_settled(&self) -> bool {
        self.outcome().is_some()
    }

    /// Settle with `event`.  Returns the action to take, or `None` when an
    /// earlier event already settled the request.
    pub fn settle(&self, event: &Event, client: ClientState) -> Option<Action> {
        self.state
            .compare_exchange(
                PENDING,
                event.outcome().encode(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .ok()
            .map(|_| decide(event, client))
    }

    /// Mark the outbound request released.  `true` only for the first call.
    pub fn release_outbound(&self) -> bool {
        !self.released.swap(true, Ordering::AcqRel)
    }

    pub fn outbound_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }
}

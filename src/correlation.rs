use std::fmt;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use futures::channel::oneshot;
use futures::prelude::*;
use futures::task::{Context, Poll};
use uuid::Uuid;

use crate::error::Error;
use crate::message::{Message, Response};
use crate::transport::Handler;

/// CorrelationId ties one outgoing request to its response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    /// Generate a fresh random identifier
    pub fn new() -> Self {
        CorrelationId(Uuid::new_v4())
    }

    /// Check whether a delivered correlation id is exactly this one, in its wire form
    pub fn matches(&self, other: Option<&str>) -> bool {
        other == Some(self.to_string().as_str())
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0.to_hyphenated())
    }
}

impl FromStr for CorrelationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(CorrelationId)
    }
}

/// Create the wait handle and matching message handler for a single call.
///
/// The handler resolves the pending side at most once; deliveries with
/// another correlation id, or any delivery after the first match, are ignored.
pub fn pending(id: CorrelationId) -> (Pending, Handler) {
    let (pending, slot) = slot(id);
    let handler: Handler = Arc::new(move |message: Message| {
        slot.resolve(message);
    });

    (pending, handler)
}

fn slot(id: CorrelationId) -> (Pending, Arc<Slot>) {
    let (tx, rx) = oneshot::channel();
    let slot = Slot {
        wire_id: id.to_string(),
        tx: Mutex::new(Some(tx)),
    };

    (Pending { id, rx }, Arc::new(slot))
}

// Result slot shared between a call and its handler
struct Slot {
    wire_id: String,
    tx: Mutex<Option<oneshot::Sender<Response>>>,
}

impl Slot {
    // Returns true only when this message completed the waiting call
    fn resolve(&self, message: Message) -> bool {
        if message.correlation_id.as_deref() != Some(self.wire_id.as_str()) {
            return false;
        }

        let tx = match self.tx.lock() {
            Ok(mut tx) => tx.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        match tx {
            // The receiver is gone if the caller gave up waiting
            Some(tx) => tx.send(Response::from(message)).is_ok(),
            None => false,
        }
    }
}

/// Pending resolves to the response for one outstanding call
pub struct Pending {
    id: CorrelationId,
    rx: oneshot::Receiver<Response>,
}

impl Pending {
    pub fn id(&self) -> CorrelationId {
        self.id
    }
}

impl Future for Pending {
    type Output = Result<Response, Error>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context) -> Poll<Self::Output> {
        let id = self.id;
        self.rx
            .poll_unpin(cx)
            .map(|r| r.map_err(|_canceled| Error::Abandoned(id)))
    }
}

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_std::task;
use async_trait::async_trait;
use futures::channel::mpsc;
use futures::prelude::*;
use futures::task::{Context, Poll};
use uuid::Uuid;

use crate::error::TransportError;
use crate::message::{Message, Request};
use crate::transport::{Handler, ReplyDestination, Transport};

#[derive(Default)]
struct Broker {
    // Reply destinations and their subscribers
    replies: HashMap<String, Vec<Handler>>,
    // Named request queues
    queues: HashMap<String, mpsc::UnboundedSender<Request>>,
}

/// Wire is an in-memory broker to support integration testing of clients
/// against request handlers without a real message transport
#[derive(Clone, Default)]
pub struct Wire {
    broker: Arc<Mutex<Broker>>,
}

impl Wire {
    /// Create a new Wire interconnect
    pub fn new() -> Wire {
        Wire::default()
    }

    /// Create a new (disconnected) transport attached to this wire
    pub fn transport(&self) -> WireTransport {
        WireTransport {
            wire: self.clone(),
            connected: AtomicBool::new(false),
        }
    }

    /// Bind a named request queue, replacing any existing binding
    pub fn queue(&self, name: &str) -> WireQueue {
        let (tx, rx) = mpsc::unbounded();
        self.broker().queues.insert(name.to_string(), tx);

        WireQueue {
            name: name.to_string(),
            wire: self.clone(),
            rx,
        }
    }

    /// Number of reply destinations currently open
    pub fn reply_destinations(&self) -> usize {
        self.broker().replies.len()
    }

    fn broker(&self) -> MutexGuard<'_, Broker> {
        match self.broker.lock() {
            Ok(b) => b,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn route_request(&self, request: Request) -> Result<(), TransportError> {
        let key = request.routing_key.clone();

        let tx = match self.broker().queues.get(&key) {
            Some(tx) => tx.clone(),
            None => return Err(TransportError::Unroutable(key)),
        };

        tx.unbounded_send(request).map_err(|_e| TransportError::Unroutable(key))
    }

    fn route_reply(&self, destination: &str, message: Message) -> Result<(), TransportError> {
        let handlers = match self.broker().replies.get(destination) {
            Some(h) => h.clone(),
            None => return Err(TransportError::Unroutable(destination.to_string())),
        };

        // Deliver off the publishing task
        for h in handlers {
            let m = message.clone();
            task::spawn(async move { h(m) });
        }

        Ok(())
    }
}

/// WireTransport connects a client to a Wire
pub struct WireTransport {
    wire: Wire,
    connected: AtomicBool,
}

#[async_trait]
impl Transport for WireTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn open_reply_destination(&self) -> Result<ReplyDestination, TransportError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(TransportError::Disconnected);
        }

        let name = format!("amq.gen-{}", Uuid::new_v4().to_simple());
        self.wire.broker().replies.insert(name.clone(), Vec::new());

        Ok(ReplyDestination::new(name))
    }

    fn release_reply_destination(&self, destination: &ReplyDestination) {
        self.wire.broker().replies.remove(destination.name());
    }

    async fn subscribe(&self, destination: &ReplyDestination, handler: Handler) -> Result<(), TransportError> {
        match self.wire.broker().replies.get_mut(destination.name()) {
            Some(handlers) => {
                handlers.push(handler);
                Ok(())
            }
            None => Err(TransportError::Subscribe(format!("no destination '{}'", destination))),
        }
    }

    async fn publish(&self, request: Request) -> Result<(), TransportError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(TransportError::Disconnected);
        }

        self.wire.route_request(request)
    }
}

/// WireQueue receives requests published to a named queue and responds to them
pub struct WireQueue {
    name: String,
    wire: Wire,
    rx: mpsc::UnboundedReceiver<Request>,
}

impl WireQueue {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Send a response to the reply destination of a received request
    pub fn respond(
        &self, request: &Request, status: u16, headers: HashMap<String, String>, body: Vec<u8>,
    ) -> Result<(), TransportError> {
        self.wire.route_reply(&request.reply_to, request.reply(status, headers, body))
    }

    /// Send an arbitrary message to a reply destination
    pub fn send(&self, destination: &str, message: Message) -> Result<(), TransportError> {
        self.wire.route_reply(destination, message)
    }
}

impl Stream for WireQueue {
    type Item = Request;

    // Poll to receive pending requests
    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context) -> Poll<Option<Self::Item>> {
        self.rx.poll_next_unpin(cx)
    }
}

impl Drop for WireQueue {
    fn drop(&mut self) {
        self.rx.close();

        // Only unbind if the queue was not rebound in the meantime
        let mut broker = self.wire.broker();
        if broker.queues.get(&self.name).map(|tx| tx.is_closed()).unwrap_or(false) {
            broker.queues.remove(&self.name);
        }
    }
}

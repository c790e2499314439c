use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::TransportError;
use crate::message::{Message, Request};
use crate::transport::{Handler, ReplyDestination, Transport};

/// Responder builds the replies for a published request
pub type Responder = Arc<dyn Fn(&Request) -> Vec<Message> + Send + Sync + 'static>;

/// Delivery selects how scripted replies reach subscribers
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Delivery {
    /// Delivered synchronously, before publish returns
    Inline,
    /// Delivered from a separate thread after a delay
    Thread(Duration),
}

#[derive(Default)]
struct State {
    connected: bool,
    opened: Vec<ReplyDestination>,
    released: Vec<ReplyDestination>,
    subscriptions: HashMap<ReplyDestination, Vec<Handler>>,
    published: Vec<Request>,
}

/// MockTransport is a scripted transport implementation that records
/// everything a client does with it, to simplify writing tests against
/// code built on the Client.
#[derive(Clone)]
pub struct MockTransport {
    state: Arc<Mutex<State>>,
    responder: Option<Responder>,
    delivery: Delivery,
    fail_publish: bool,
    fail_subscribe: bool,
    fail_connect: bool,
}

impl MockTransport {
    /// Create a new mock transport that never replies
    pub fn new() -> MockTransport {
        MockTransport {
            state: Arc::new(Mutex::new(State::default())),
            responder: None,
            delivery: Delivery::Inline,
            fail_publish: false,
            fail_subscribe: false,
            fail_connect: false,
        }
    }

    /// Reply to every published request with the messages built by `f`
    pub fn reply_with<F>(mut self, f: F) -> Self
    where
        F: Fn(&Request) -> Vec<Message> + Send + Sync + 'static,
    {
        self.responder = Some(Arc::new(f));
        self
    }

    /// Deliver replies from another thread after the provided delay
    pub fn deliver_on_thread(mut self, delay: Duration) -> Self {
        self.delivery = Delivery::Thread(delay);
        self
    }

    /// Fail every publish
    pub fn fail_publish(mut self) -> Self {
        self.fail_publish = true;
        self
    }

    /// Fail every subscribe
    pub fn fail_subscribe(mut self) -> Self {
        self.fail_subscribe = true;
        self
    }

    /// Fail every connect
    pub fn fail_connect(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    /// Deliver a message to the handlers currently subscribed to a destination
    pub fn deliver(&self, destination: &str, message: Message) {
        let handlers = self.handlers(destination);
        for h in handlers {
            h(message.clone());
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state().connected
    }

    /// Requests published so far
    pub fn published(&self) -> Vec<Request> {
        self.state().published.clone()
    }

    /// Reply destinations opened so far
    pub fn opened(&self) -> Vec<ReplyDestination> {
        self.state().opened.clone()
    }

    /// Reply destinations released so far
    pub fn released(&self) -> Vec<ReplyDestination> {
        self.state().released.clone()
    }

    /// Finalise the mock, checking that every opened destination was released
    pub fn finalise(&self) {
        let state = self.state();
        for d in &state.opened {
            assert!(state.released.contains(d), "reply destination '{}' was not released", d);
        }
        assert!(state.subscriptions.is_empty(), "handlers remain subscribed");
    }

    fn state(&self) -> MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(s) => s,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn handlers(&self, destination: &str) -> Vec<Handler> {
        self.state()
            .subscriptions
            .get(&ReplyDestination::new(destination))
            .cloned()
            .unwrap_or_default()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        if self.fail_connect {
            return Err(TransportError::Connect("refused by mock".to_string()));
        }

        self.state().connected = true;
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.state().connected = false;
        Ok(())
    }

    async fn open_reply_destination(&self) -> Result<ReplyDestination, TransportError> {
        let d = ReplyDestination::new(format!("mock.reply-{}", Uuid::new_v4()));
        self.state().opened.push(d.clone());
        Ok(d)
    }

    fn release_reply_destination(&self, destination: &ReplyDestination) {
        let mut state = self.state();
        state.subscriptions.remove(destination);
        state.released.push(destination.clone());
    }

    async fn subscribe(&self, destination: &ReplyDestination, handler: Handler) -> Result<(), TransportError> {
        if self.fail_subscribe {
            return Err(TransportError::Subscribe(format!("rejected by mock for '{}'", destination)));
        }

        let mut state = self.state();
        if !state.opened.contains(destination) || state.released.contains(destination) {
            return Err(TransportError::Subscribe(format!("unknown destination '{}'", destination)));
        }

        state.subscriptions.entry(destination.clone()).or_default().push(handler);
        Ok(())
    }

    async fn publish(&self, request: Request) -> Result<(), TransportError> {
        {
            let mut state = self.state();
            if !state.connected {
                return Err(TransportError::Disconnected);
            }
            state.published.push(request.clone());
        }

        if self.fail_publish {
            return Err(TransportError::Publish(format!("rejected by mock for '{}'", request.routing_key)));
        }

        let replies = match &self.responder {
            Some(r) => r(&request),
            None => return Ok(()),
        };

        match self.delivery {
            Delivery::Inline => {
                for m in replies {
                    self.deliver(&request.reply_to, m);
                }
            }
            Delivery::Thread(delay) => {
                let mock = self.clone();
                thread::spawn(move || {
                    thread::sleep(delay);
                    for m in replies {
                        mock.deliver(&request.reply_to, m);
                    }
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;

    use super::*;
    use crate::correlation::CorrelationId;
    use crate::message::Method;

    fn request(reply_to: &str) -> Request {
        Request {
            method: Method::Get,
            path: "/".to_string(),
            body: vec![],
            headers: HashMap::new(),
            routing_key: "svc".to_string(),
            priority: None,
            content_type: "text/plain".to_string(),
            content_encoding: "utf-8".to_string(),
            timestamp: 0,
            correlation_id: CorrelationId::new(),
            reply_to: reply_to.to_string(),
        }
    }

    #[test]
    fn test_inline_replies() {
        let t = MockTransport::new().reply_with(|req| vec![req.reply(200, HashMap::new(), vec![])]);
        block_on(t.connect()).unwrap();

        let d = block_on(t.open_reply_destination()).unwrap();
        let received = Arc::new(Mutex::new(Vec::new()));
        let r = received.clone();
        block_on(t.subscribe(&d, Arc::new(move |m: Message| r.lock().unwrap().push(m)))).unwrap();

        let req = request(d.name());
        block_on(t.publish(req.clone())).unwrap();

        // Delivered before publish returned
        let received = received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert!(req.correlation_id.matches(received[0].correlation_id.as_deref()));
        assert_eq!(t.published(), vec![req]);
    }

    #[test]
    fn test_publish_requires_connection() {
        let t = MockTransport::new();

        match block_on(t.publish(request("nowhere"))) {
            Err(TransportError::Disconnected) => (),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_release_drops_subscriptions() {
        let t = MockTransport::new();
        let d = block_on(t.open_reply_destination()).unwrap();
        block_on(t.subscribe(&d, Arc::new(|_m: Message| panic!("delivered after release")))).unwrap();

        t.release_reply_destination(&d);
        t.deliver(d.name(), request(d.name()).reply(200, HashMap::new(), vec![]));

        assert!(block_on(t.subscribe(&d, Arc::new(|_m: Message| ()))).is_err());
        t.finalise();
    }

    #[test]
    #[should_panic(expected = "was not released")]
    fn test_finalise_detects_leak() {
        let t = MockTransport::new();
        block_on(t.open_reply_destination()).unwrap();
        t.finalise();
    }
}

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::message::{Message, Request};

/// Handler is invoked by the transport once per message delivered to a subscribed destination
pub type Handler = Arc<dyn Fn(Message) + Send + Sync + 'static>;

/// ReplyDestination names a transient destination that responses are sent to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReplyDestination {
    name: String,
}

impl ReplyDestination {
    pub fn new<S: Into<String>>(name: S) -> Self {
        ReplyDestination { name: name.into() }
    }

    /// Address to use as the reply-to of a request
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ReplyDestination {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Transport provides the message broker primitives a client is built on
#[async_trait]
pub trait Transport: Send + Sync {
    // Open the underlying session
    async fn connect(&self) -> Result<(), TransportError>;

    // Close the underlying session
    async fn disconnect(&self) -> Result<(), TransportError>;

    // Provision a transient, uniquely named destination for replies
    async fn open_reply_destination(&self) -> Result<ReplyDestination, TransportError>;

    // Release a reply destination and drop any handlers subscribed to it.
    // Called from drop, so this must not block.
    fn release_reply_destination(&self, destination: &ReplyDestination);

    // Register a handler for messages delivered to a destination.
    // Handlers must be invoked off the subscribing task.
    async fn subscribe(&self, destination: &ReplyDestination, handler: Handler) -> Result<(), TransportError>;

    // Publish a request to its routing key
    async fn publish(&self, request: Request) -> Result<(), TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn connect(&self) -> Result<(), TransportError> {
        (**self).connect().await
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        (**self).disconnect().await
    }

    async fn open_reply_destination(&self) -> Result<ReplyDestination, TransportError> {
        (**self).open_reply_destination().await
    }

    fn release_reply_destination(&self, destination: &ReplyDestination) {
        (**self).release_reply_destination(destination)
    }

    async fn subscribe(&self, destination: &ReplyDestination, handler: Handler) -> Result<(), TransportError> {
        (**self).subscribe(destination, handler).await
    }

    async fn publish(&self, request: Request) -> Result<(), TransportError> {
        (**self).publish(request).await
    }
}

/// ReplyScope holds a reply destination for the lifetime of one call,
/// releasing it when dropped on every exit path.
pub struct ReplyScope<'a, T: Transport + ?Sized> {
    transport: &'a T,
    destination: ReplyDestination,
}

impl<'a, T: Transport + ?Sized> ReplyScope<'a, T> {
    /// Open a new reply destination on the provided transport
    pub async fn open(transport: &'a T) -> Result<ReplyScope<'a, T>, TransportError> {
        let destination = transport.open_reply_destination().await?;
        trace!("Opened reply destination '{}'", destination);

        Ok(ReplyScope { transport, destination })
    }

    pub fn destination(&self) -> &ReplyDestination {
        &self.destination
    }
}

impl<'a, T: Transport + ?Sized> Drop for ReplyScope<'a, T> {
    fn drop(&mut self) {
        trace!("Releasing reply destination '{}'", self.destination);
        self.transport.release_reply_destination(&self.destination);
    }
}

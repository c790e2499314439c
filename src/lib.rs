//! Blocking request/response calls over a publish/subscribe message transport.
//!
//! A [`Client`] gives each call its own correlation id and transient reply
//! destination, publishes the request through a [`Transport`] and waits until
//! the matching response is delivered back.

#[macro_use]
extern crate log;

pub mod error;
pub use crate::error::{Error, TransportError};

pub mod message;
pub use crate::message::{header, Message, Method, Request, Response};

pub mod options;
pub use crate::options::{CallOptions, CallOptionsBuilder, Defaults, DefaultsBuilder};

pub mod correlation;
pub use crate::correlation::CorrelationId;

pub mod transport;
pub use crate::transport::{Handler, ReplyDestination, ReplyScope, Transport};

pub mod client;
pub use crate::client::Client;

pub mod mock;

pub mod wire;
pub use crate::wire::Wire;

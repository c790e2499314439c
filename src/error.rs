use std::time::Duration;

use thiserror::Error;

use crate::correlation::CorrelationId;

/// TransportError is returned by transport adapters
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("transport is not connected")]
    Disconnected,

    #[error("reply destination unavailable: {0}")]
    Destination(String),

    #[error("subscription failed: {0}")]
    Subscribe(String),

    #[error("publish failed: {0}")]
    Publish(String),

    #[error("no route to '{0}'")]
    Unroutable(String),

    #[error("{0}")]
    Other(Box<dyn std::error::Error + Send + Sync + 'static>),
}

/// Error is returned by client calls
#[derive(Debug, Error)]
pub enum Error {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Only returned when a call was made with a timeout option
    #[error("no response within {0:?}")]
    Timeout(Duration),

    /// The transport dropped the reply handler before a matching response arrived
    #[error("reply handler for {0} was dropped without a response")]
    Abandoned(CorrelationId),

    #[error("unknown request method '{0}'")]
    UnknownMethod(String),

    #[error("request target must not be empty")]
    InvalidTarget,
}

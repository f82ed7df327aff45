//! Broker-level error aggregation.
//!
//! Each component defines its own error enum; the facade folds them into
//! one type for the boundary the front-end consumes. No failure is retried
//! internally - retry and backoff policy belongs to the caller.

use thiserror::Error;

use crate::bridge::BridgeError;
use crate::channel::ChannelError;
use crate::security::AuthError;

#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Message queue error: {0}")]
    Bridge(#[from] BridgeError),
}

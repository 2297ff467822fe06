//! Error taxonomy shared by every relay crate.
//!
//! Only `Auth` and `Validation` are client-facing rejections. `Timeout` and
//! `Delivery(PayloadTooLarge)` are recovered inside the orchestrator and
//! never reach the end user as hard failures.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("invalid signature")]
    Auth,
    #[error("{0}")]
    Validation(String),
    #[error("a task is already running for this message")]
    AlreadyRunning,
    #[error("generation timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

/// Failure of a chat-platform call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The text or its structured blocks exceed the platform limit.
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),
    #[error("message not found")]
    NotFound,
    #[error("chat transport error: {0}")]
    Other(String),
}

/// Failure of the generation backend (not a timeout).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("{0} not configured")]
    NotConfigured(String),
    #[error("{0}")]
    Backend(String),
    #[error("generation returned no text")]
    Empty,
}

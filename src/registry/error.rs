//! Registry error types

use super::entry::Role;

/// A message the hub refuses to act on
///
/// The `Display` text is what the client receives in the `error` notification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolViolation {
    /// JSON control message with a missing or unknown `type`
    #[error("Unknown client type")]
    UnknownType,
    /// Non-control payload from a connection that is not the producer
    #[error("Invalid data format")]
    InvalidData,
    /// Registration from a connection that already holds a role
    #[error("Already registered as {0}")]
    AlreadyRegistered(Role),
}

/// Failure to queue a frame for one recipient
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// The recipient's outbound queue is full
    #[error("outbound queue full")]
    QueueFull,
    /// The recipient's writer has gone away
    #[error("connection closed")]
    Closed,
}

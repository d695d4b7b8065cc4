//! Connection identity and outbound frame types
//!
//! This module defines the key type for identifying connections and the
//! frames the hub queues for delivery to them.

use bytes::Bytes;

use crate::protocol::Notification;

/// Unique identifier for a connection, allocated by the listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A frame queued for delivery to one connection
///
/// Cheap to clone: data frames share the producer's allocation via `Bytes`
/// reference counting, so fan-out never copies the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    /// Opaque payload relayed from the producer (sent as a binary frame)
    Data(Bytes),
    /// Control notification (sent as a JSON text frame)
    Notice(Notification),
}

impl From<Notification> for OutboundFrame {
    fn from(notice: Notification) -> Self {
        OutboundFrame::Notice(notice)
    }
}

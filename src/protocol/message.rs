//! Control message schema
//!
//! Every control message is a JSON object with a `type` discriminator.

use serde::{Deserialize, Serialize};

/// Reason sent to a producer that is evicted by a newer one
pub const REPLACED_REASON: &str = "replaced";

/// Registration request sent by a client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ControlMessage {
    /// Register this connection as the producer
    Streamer,
    /// Register this connection as a consumer
    Viewer,
}

/// Notification sent by the hub to a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Notification {
    /// No producer is active right now
    NoStream,
    /// The producer went away
    EndStream,
    /// This connection is being closed by the hub
    Disconnect { reason: String },
    /// The last message could not be handled
    Error { message: String },
}

impl Notification {
    /// Notification for a producer displaced by a newer registration
    pub fn replaced() -> Self {
        Notification::Disconnect {
            reason: REPLACED_REASON.to_string(),
        }
    }

    /// Notification describing a protocol error
    pub fn error(message: impl Into<String>) -> Self {
        Notification::Error {
            message: message.into(),
        }
    }

    /// Encode as a JSON text payload
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

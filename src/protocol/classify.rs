//! Inbound message classification
//!
//! Text frames are tried as control messages first. Anything that is not
//! JSON, and every binary frame, is a data frame candidate; whether it is
//! relayed depends on the sender's role, which the hub decides.

use bytes::Bytes;

use super::message::ControlMessage;

/// A classified inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A recognized registration request
    Control(ControlMessage),
    /// Valid JSON without a recognized `type`
    Unrecognized,
    /// Opaque payload, relayed only when sent by the producer
    Data(Bytes),
}

impl Inbound {
    /// Classify a text frame
    pub fn from_text(text: String) -> Self {
        match serde_json::from_str::<serde_json::Value>(&text) {
            Ok(value) => match serde_json::from_value::<ControlMessage>(value) {
                Ok(control) => Inbound::Control(control),
                Err(_) => Inbound::Unrecognized,
            },
            Err(_) => Inbound::Data(Bytes::from(text.into_bytes())),
        }
    }

    /// Classify a binary frame
    pub fn from_binary(data: impl Into<Bytes>) -> Self {
        Inbound::Data(data.into())
    }
}

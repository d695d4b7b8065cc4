//! Wire protocol for the relay hub
//!
//! Two kinds of traffic share a single WebSocket connection:
//!
//! - **Control messages**: JSON objects carried in text frames, tagged by a
//!   `type` field (`streamer`, `viewer` from clients; `no-stream`,
//!   `end-stream`, `disconnect`, `error` from the hub).
//! - **Data frames**: opaque payloads from the producer, relayed unmodified to
//!   every consumer as binary frames.

pub mod classify;
pub mod message;

pub use classify::Inbound;
pub use message::{ControlMessage, Notification};

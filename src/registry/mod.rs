//! Connection registry and routing
//!
//! The registry tracks every open connection, assigns roles, and routes data
//! frames from the single producer to all consumers.
//!
//! # Architecture
//!
//! ```text
//!                          Arc<RelayHub>
//!                     ┌─────────────────────────┐
//!                     │ Mutex<HubState {        │
//!                     │   peers: HashMap<Id,    │
//!                     │     PeerEntry>,         │
//!                     │   producer: Option<Id>, │
//!                     │   consumers: Set<Id>,   │
//!                     │ }>                      │
//!                     └───────────┬─────────────┘
//!                                 │
//!         ┌───────────────────────┼───────────────────────┐
//!         │                       │                       │
//!         ▼                       ▼                       ▼
//!    [Producer]              [Consumer]              [Consumer]
//!    read loop               mailbox.recv()          mailbox.recv()
//!         │                       │                       │
//!         └──► hub.on_message() ──► try_send() ──► writer ──► WebSocket
//! ```
//!
//! # Failure isolation
//!
//! The hub never awaits a recipient. Each frame is queued with `try_send`
//! into the recipient's bounded mailbox; a full or closed mailbox drops that
//! one delivery and the broadcast moves on.

pub mod entry;
pub mod error;
pub mod frame;
pub mod store;

pub use entry::{mailbox, Mailbox, PeerEntry, PeerHandle, Role};
pub use error::{DeliveryError, ProtocolViolation};
pub use frame::{ConnectionId, OutboundFrame};
pub use store::RelayHub;

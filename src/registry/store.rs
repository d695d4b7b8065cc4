//! Relay hub implementation
//!
//! The central registry that tracks every open connection, enforces the
//! single-producer rule and routes data frames from the producer to all
//! consumers.

use std::collections::{HashMap, HashSet};

use tokio::sync::Mutex;

use crate::protocol::{ControlMessage, Inbound, Notification};
use crate::stats::{HubCounters, HubStats};

use super::entry::{PeerEntry, PeerHandle, Role};
use super::error::ProtocolViolation;
use super::frame::{ConnectionId, OutboundFrame};

/// Mutable registry state, only ever touched with the hub lock held
#[derive(Debug, Default)]
struct HubState {
    /// Every open connection
    peers: HashMap<ConnectionId, PeerEntry>,
    /// The active producer, never a member of `consumers`
    producer: Option<ConnectionId>,
    /// Registered consumers
    consumers: HashSet<ConnectionId>,
}

/// Central registry and router
///
/// Each entry point takes the lock for its whole duration, so registry
/// operations are serialized. Nothing awaits while the lock is held: frames
/// are queued with `try_send` into per-connection mailboxes.
pub struct RelayHub {
    state: Mutex<HubState>,
    counters: HubCounters,
}

impl RelayHub {
    /// Create an empty hub
    pub fn new() -> Self {
        Self {
            state: Mutex::new(HubState::default()),
            counters: HubCounters::new(),
        }
    }

    /// A connection was accepted
    pub async fn on_open(&self, id: ConnectionId, handle: PeerHandle) {
        let mut state = self.state.lock().await;

        if state.peers.insert(id, PeerEntry::new(handle)).is_some() {
            tracing::warn!(connection_id = %id, "Connection opened twice, previous entry replaced");
        }

        tracing::debug!(
            connection_id = %id,
            connections = state.peers.len(),
            "Connection registered"
        );
    }

    /// A message arrived on a connection
    pub async fn on_message(&self, id: ConnectionId, message: Inbound) {
        let mut state = self.state.lock().await;

        let role = match state.peers.get(&id) {
            Some(entry) => entry.role,
            None => {
                tracing::warn!(connection_id = %id, "Message from unknown connection ignored");
                return;
            }
        };

        // Evicted connections are being closed: no relay and no error reply
        if role == Role::Evicted {
            tracing::debug!(connection_id = %id, "Message from evicted producer ignored");
            return;
        }

        match message {
            Inbound::Control(_) if role != Role::Unassigned => {
                self.handle_protocol_error(&state, id, ProtocolViolation::AlreadyRegistered(role));
            }
            Inbound::Control(ControlMessage::Streamer) => self.register_producer(&mut state, id),
            Inbound::Control(ControlMessage::Viewer) => self.register_consumer(&mut state, id),
            Inbound::Unrecognized => {
                self.handle_protocol_error(&state, id, ProtocolViolation::UnknownType);
            }
            Inbound::Data(payload) if state.producer == Some(id) => {
                self.route_data_frame(&state, payload);
            }
            Inbound::Data(_) => {
                self.handle_protocol_error(&state, id, ProtocolViolation::InvalidData);
            }
        }
    }

    /// A connection closed or failed
    ///
    /// Safe to call more than once for the same connection.
    pub async fn on_close(&self, id: ConnectionId) {
        let mut state = self.state.lock().await;
        self.handle_disconnect(&mut state, id);
    }

    /// Role of a connection, if it is open
    pub async fn role_of(&self, id: ConnectionId) -> Option<Role> {
        self.state.lock().await.peers.get(&id).map(|entry| entry.role)
    }

    /// The active producer, if any
    pub async fn producer(&self) -> Option<ConnectionId> {
        self.state.lock().await.producer
    }

    /// Registered consumers, in no particular order
    pub async fn consumers(&self) -> Vec<ConnectionId> {
        self.state.lock().await.consumers.iter().copied().collect()
    }

    /// Snapshot of registry state and routing counters
    pub async fn stats(&self) -> HubStats {
        let state = self.state.lock().await;

        HubStats {
            producer_active: state.producer.is_some(),
            consumer_count: state.consumers.len(),
            connection_count: state.peers.len(),
            frames_relayed: self.counters.frames_relayed(),
            bytes_relayed: self.counters.bytes_relayed(),
            deliveries_dropped: self.counters.deliveries_dropped(),
            producers_replaced: self.counters.producers_replaced(),
        }
    }

    fn register_producer(&self, state: &mut HubState, id: ConnectionId) {
        if let Some(previous) = state.producer.take() {
            if let Some(entry) = state.peers.get_mut(&previous) {
                entry.role = Role::Evicted;
                if !entry.handle.evict(Notification::replaced()) {
                    tracing::debug!(connection_id = %previous, "Evicted producer already gone");
                }
            }
            self.counters.record_replacement();

            tracing::info!(
                previous = %previous,
                connection_id = %id,
                "Producer replaced"
            );
        }

        if let Some(entry) = state.peers.get_mut(&id) {
            entry.role = Role::Producer;
        }
        state.producer = Some(id);

        tracing::info!(
            connection_id = %id,
            consumers = state.consumers.len(),
            "Producer registered"
        );
    }

    fn register_consumer(&self, state: &mut HubState, id: ConnectionId) {
        if let Some(entry) = state.peers.get_mut(&id) {
            entry.role = Role::Consumer;
        }
        state.consumers.insert(id);

        tracing::info!(
            connection_id = %id,
            consumers = state.consumers.len(),
            producer_active = state.producer.is_some(),
            "Consumer registered"
        );

        if state.producer.is_none() {
            self.send_to(state, id, Notification::NoStream.into());
        }
    }

    fn route_data_frame(&self, state: &HubState, payload: bytes::Bytes) {
        let len = payload.len();
        let delivered = self.broadcast(state, OutboundFrame::Data(payload));
        self.counters.record_frame(len, delivered);
    }

    fn handle_disconnect(&self, state: &mut HubState, id: ConnectionId) {
        let Some(entry) = state.peers.remove(&id) else {
            return;
        };

        if state.producer == Some(id) {
            state.producer = None;
            let notified = self.broadcast(state, Notification::EndStream.into());

            tracing::info!(
                connection_id = %id,
                consumers_notified = notified,
                "Producer disconnected, stream ended"
            );
        } else if state.consumers.remove(&id) {
            tracing::info!(
                connection_id = %id,
                consumers = state.consumers.len(),
                "Consumer disconnected"
            );
        } else {
            tracing::debug!(connection_id = %id, role = %entry.role, "Connection unregistered");
        }
    }

    fn handle_protocol_error(&self, state: &HubState, id: ConnectionId, violation: ProtocolViolation) {
        tracing::warn!(connection_id = %id, reason = %violation, "Protocol error");
        self.send_to(state, id, Notification::error(violation.to_string()).into());
    }

    /// Queue a frame for every consumer, isolating each failure
    ///
    /// Returns the number of consumers the frame was queued for.
    fn broadcast(&self, state: &HubState, frame: OutboundFrame) -> usize {
        let mut delivered = 0;

        for consumer in &state.consumers {
            if self.send_to(state, *consumer, frame.clone()) {
                delivered += 1;
            }
        }

        delivered
    }

    fn send_to(&self, state: &HubState, id: ConnectionId, frame: OutboundFrame) -> bool {
        let Some(entry) = state.peers.get(&id) else {
            return false;
        };

        if !entry.handle.is_open() {
            self.counters.record_dropped();
            return false;
        }

        match entry.handle.deliver(frame) {
            Ok(()) => true,
            Err(e) => {
                self.counters.record_dropped();
                tracing::debug!(connection_id = %id, error = %e, "Delivery dropped");
                false
            }
        }
    }
}

impl Default for RelayHub {
    fn default() -> Self {
        Self::new()
    }
}

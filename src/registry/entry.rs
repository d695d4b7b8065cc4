//! Per-connection entry and role types
//!
//! Every open connection has one entry in the registry. The entry holds the
//! connection's role and the sending half of its outbound mailbox; the
//! receiving half belongs to the connection's writer task.

use tokio::sync::{mpsc, oneshot};

use crate::protocol::Notification;

use super::error::DeliveryError;
use super::frame::OutboundFrame;

/// Role of a connection
///
/// A connection leaves `Unassigned` at most once. `Evicted` is reached only
/// by a producer that was replaced; the hub closes it right away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Connected, no registration yet
    Unassigned,
    /// The single active producer
    Producer,
    /// Subscribed to data frames and stream notifications
    Consumer,
    /// Former producer, displaced by a newer one and being closed
    Evicted,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Unassigned => write!(f, "unassigned"),
            Role::Producer => write!(f, "producer"),
            Role::Consumer => write!(f, "consumer"),
            Role::Evicted => write!(f, "evicted producer"),
        }
    }
}

/// Create a connected handle/mailbox pair
///
/// `capacity` bounds the outbound queue; when it is full further frames for
/// that connection are dropped rather than buffered.
pub fn mailbox(capacity: usize) -> (PeerHandle, Mailbox) {
    let (outbound_tx, outbound_rx) = mpsc::channel(capacity.max(1));
    let (evict_tx, evict_rx) = oneshot::channel();

    (
        PeerHandle {
            outbound: outbound_tx,
            evict: Some(evict_tx),
        },
        Mailbox {
            outbound: outbound_rx,
            evicted: evict_rx,
        },
    )
}

/// Sending side of a connection's mailbox, owned by the registry
#[derive(Debug)]
pub struct PeerHandle {
    outbound: mpsc::Sender<OutboundFrame>,
    evict: Option<oneshot::Sender<Notification>>,
}

impl PeerHandle {
    /// Queue a frame without waiting
    pub fn deliver(&self, frame: OutboundFrame) -> Result<(), DeliveryError> {
        self.outbound.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }

    /// Signal the writer to send `notice` and close the connection
    ///
    /// The signal bypasses the outbound queue, so it is never lost to
    /// backpressure. Returns false if the connection was already evicted or
    /// its writer is gone.
    pub fn evict(&mut self, notice: Notification) -> bool {
        match self.evict.take() {
            Some(tx) => tx.send(notice).is_ok(),
            None => false,
        }
    }

    /// Whether the writer side is still alive
    pub fn is_open(&self) -> bool {
        !self.outbound.is_closed()
    }
}

/// Receiving side of a connection's mailbox, owned by its writer task
#[derive(Debug)]
pub struct Mailbox {
    /// Frames queued by the hub, in order
    pub outbound: mpsc::Receiver<OutboundFrame>,
    /// Fires once if the connection is evicted
    pub evicted: oneshot::Receiver<Notification>,
}

/// Registry entry for one open connection
#[derive(Debug)]
pub struct PeerEntry {
    /// Current role
    pub role: Role,
    /// Mailbox sender
    pub handle: PeerHandle,
}

impl PeerEntry {
    /// Create an entry for a freshly opened connection
    pub fn new(handle: PeerHandle) -> Self {
        Self {
            role: Role::Unassigned,
            handle,
        }
    }
}

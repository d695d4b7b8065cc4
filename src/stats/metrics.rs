//! Statistics for the relay hub

use std::sync::atomic::{AtomicU64, Ordering};

/// Routing counters, updated without taking the registry lock
#[derive(Debug, Default)]
pub struct HubCounters {
    frames_relayed: AtomicU64,
    bytes_relayed: AtomicU64,
    deliveries_dropped: AtomicU64,
    producers_replaced: AtomicU64,
}

impl HubCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one data frame handed to `recipients` consumers
    pub fn record_frame(&self, bytes: usize, recipients: usize) {
        self.frames_relayed.fetch_add(1, Ordering::Relaxed);
        self.bytes_relayed
            .fetch_add((bytes * recipients) as u64, Ordering::Relaxed);
    }

    /// Record a delivery that could not be queued
    pub fn record_dropped(&self) {
        self.deliveries_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a producer eviction
    pub fn record_replacement(&self) {
        self.producers_replaced.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frames_relayed(&self) -> u64 {
        self.frames_relayed.load(Ordering::Relaxed)
    }

    pub fn bytes_relayed(&self) -> u64 {
        self.bytes_relayed.load(Ordering::Relaxed)
    }

    pub fn deliveries_dropped(&self) -> u64 {
        self.deliveries_dropped.load(Ordering::Relaxed)
    }

    pub fn producers_replaced(&self) -> u64 {
        self.producers_replaced.load(Ordering::Relaxed)
    }
}

/// Point-in-time snapshot of hub state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HubStats {
    /// Whether a producer is registered
    pub producer_active: bool,
    /// Registered consumers
    pub consumer_count: usize,
    /// Open connections, registered or not
    pub connection_count: usize,
    /// Data frames accepted from producers
    pub frames_relayed: u64,
    /// Payload bytes queued to consumers (summed over recipients)
    pub bytes_relayed: u64,
    /// Per-recipient deliveries that failed (full queue or closed)
    pub deliveries_dropped: u64,
    /// Producers evicted by a newer registration
    pub producers_replaced: u64,
}

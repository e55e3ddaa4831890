// ============================================
// File: crates/tunnelscope-server/src/services/stats.rs
// ============================================
//! # Observer Statistics
//!
//! Lock-free counters updated by the capture thread and read by the
//! periodic stats logger.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::services::registry::Delivery;

/// Counters for the capture loop.
#[derive(Debug, Default)]
pub struct ObserverStats {
    frames_seen: AtomicU64,
    frames_decoded: AtomicU64,
    frames_dropped: AtomicU64,
    records_dispatched: AtomicU64,
    deliveries: AtomicU64,
    deliveries_dropped: AtomicU64,
}

/// Point-in-time copy of [`ObserverStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Frames read from the source.
    pub frames_seen: u64,
    /// Frames whose IPv4 header decoded.
    pub frames_decoded: u64,
    /// Frames the decoder rejected.
    pub frames_dropped: u64,
    /// Records built because at least one subscriber matched.
    pub records_dispatched: u64,
    /// Records queued to a subscriber.
    pub deliveries: u64,
    /// Records discarded because a subscriber's channel was full.
    pub deliveries_dropped: u64,
}

impl ObserverStats {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_frame(&self) {
        self.frames_seen.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_decoded(&self) {
        self.frames_decoded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_decode_failure(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dispatch(&self, delivery: &Delivery) {
        self.records_dispatched.fetch_add(1, Ordering::Relaxed);
        self.deliveries
            .fetch_add(delivery.delivered as u64, Ordering::Relaxed);
        self.deliveries_dropped
            .fetch_add(delivery.overflowed as u64, Ordering::Relaxed);
    }

    /// Returns a copy of all counters.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames_seen: self.frames_seen.load(Ordering::Relaxed),
            frames_decoded: self.frames_decoded.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            records_dispatched: self.records_dispatched.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            deliveries_dropped: self.deliveries_dropped.load(Ordering::Relaxed),
        }
    }
}

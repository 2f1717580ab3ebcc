/// Statistics tracking for the coordinator
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters updated by the coordinator and broadcaster.
#[derive(Debug, Default)]
pub struct CoordinatorStats {
    sessions_joined: AtomicU64,
    sessions_left: AtomicU64,
    joins_rejected: AtomicU64,
    objects_placed: AtomicU64,
    objects_removed: AtomicU64,
    events_delivered: AtomicU64,
    delivery_failures: AtomicU64,
}

/// Point-in-time copy of [`CoordinatorStats`] for reporting
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Successful joins since start
    pub sessions_joined: u64,
    /// Sessions cleaned up after a disconnect
    pub sessions_left: u64,
    /// Joins refused for a taken name, exhausted pool or bad input
    pub joins_rejected: u64,
    /// Objects accepted into the store
    pub objects_placed: u64,
    /// Removal requests applied to a live session
    pub objects_removed: u64,
    /// Events handed to the bus successfully
    pub events_delivered: u64,
    /// Events the bus refused
    pub delivery_failures: u64,
}

impl CoordinatorStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_join(&self) {
        self.sessions_joined.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_leave(&self) {
        self.sessions_left.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected_join(&self) {
        self.joins_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_placed(&self) {
        self.objects_placed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_removed(&self) {
        self.objects_removed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_delivery(&self, delivered: u64, failed: u64) {
        self.events_delivered.fetch_add(delivered, Ordering::Relaxed);
        self.delivery_failures.fetch_add(failed, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            sessions_joined: self.sessions_joined.load(Ordering::Relaxed),
            sessions_left: self.sessions_left.load(Ordering::Relaxed),
            joins_rejected: self.joins_rejected.load(Ordering::Relaxed),
            objects_placed: self.objects_placed.load(Ordering::Relaxed),
            objects_removed: self.objects_removed.load(Ordering::Relaxed),
            events_delivered: self.events_delivered.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
        }
    }
}

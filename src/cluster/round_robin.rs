//! Round-robin replica selection.

use std::sync::atomic::{AtomicU64, Ordering};

/// Replica cursor.
/// Stores an internal counter to rotate through replica slots `1..n`.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicU64,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the rotation at an arbitrary offset.
    pub fn starting_at(offset: u64) -> Self {
        Self {
            counter: AtomicU64::new(offset),
        }
    }

    /// Pick the handle index for a read among `n` handles (primary + replicas).
    ///
    /// With no replicas (`n <= 1`) reads go to the primary and the counter is
    /// left untouched. Otherwise the primary is never chosen.
    pub fn select(&self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        let ticket = self.counter.fetch_add(1, Ordering::Relaxed);
        1 + (ticket % (n as u64 - 1)) as usize
    }
}

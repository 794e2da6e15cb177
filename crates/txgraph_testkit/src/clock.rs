//! Deterministic time sources.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use txgraph_core::{TimeSource, Timestamp};

/// A hand-driven clock for deterministic starting timestamps.
///
/// Clones share the same underlying time, so a test can hold a handle
/// while the manager owns another.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    /// Creates a clock at the given time.
    #[must_use]
    pub fn new(now: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(now)),
        }
    }

    /// Sets the current time. Must not move backwards.
    pub fn set(&self, now: u64) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Advances the current time by `delta`.
    pub fn advance(&self, delta: u64) {
        self.now.fetch_add(delta, Ordering::SeqCst);
    }
}

impl TimeSource for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::new(self.now.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_time() {
        let clock = ManualClock::new(10);
        let handle = clock.clone();
        handle.advance(5);
        assert_eq!(clock.now(), Timestamp::new(15));
        clock.set(100);
        assert_eq!(handle.now(), Timestamp::new(100));
    }
}

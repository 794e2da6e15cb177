//! Time sources for transaction start timestamps.

use crate::types::Timestamp;
use std::time::{SystemTime, UNIX_EPOCH};

/// Supplies the starting timestamp for new transactions.
///
/// Implementations must be monotonically non-decreasing; the manager
/// queries the source exactly once per `begin()`. Later timestamps mark
/// younger transactions, which lose deadlock-victim selection.
pub trait TimeSource: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> Timestamp;
}

/// Wall-clock time source backed by [`SystemTime`], in milliseconds since
/// the Unix epoch.
#[derive(Debug, Default, Clone, Copy)]
pub struct WallClock;

impl TimeSource for WallClock {
    fn now(&self) -> Timestamp {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        Timestamp::new(millis as u64)
    }
}

//! Core type definitions for txgraph.

use std::fmt;

/// Unique identifier for a shared resource.
///
/// Resource ids are opaque, totally ordered, and stable for the lifetime
/// of the system. The core never creates or destroys resources; it only
/// arbitrates access to them by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceId(pub u64);

impl ResourceId {
    /// Creates a new resource ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "res:{}", self.0)
    }
}

/// Unique identifier for a transaction.
///
/// Transaction IDs are monotonically assigned at `begin()` and never
/// reused. Beyond identity, the total order over IDs is the deterministic
/// tie-break when two deadlock-cycle members share a starting timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TxnId(pub u64);

impl TxnId {
    /// Creates a new transaction ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TxnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "txn:{}", self.0)
    }
}

/// Starting timestamp of a transaction, as reported by the [`TimeSource`].
///
/// Later timestamps mark younger transactions; the youngest member of a
/// deadlock cycle is the one chosen as the victim.
///
/// [`TimeSource`]: crate::TimeSource
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Creates a new timestamp.
    #[must_use]
    pub const fn new(millis: u64) -> Self {
        Self(millis)
    }

    /// Returns the raw timestamp value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn txn_id_ordering() {
        let t1 = TxnId::new(1);
        let t2 = TxnId::new(2);
        assert!(t1 < t2);
    }

    #[test]
    fn timestamp_ordering() {
        assert!(Timestamp::new(5) < Timestamp::new(6));
        assert_eq!(Timestamp::new(5), Timestamp::new(5));
    }

    #[test]
    fn resource_id_display() {
        let r = ResourceId::new(42);
        assert_eq!(format!("{r}"), "res:42");
    }
}

//! Counter fixtures.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use txgraph_core::{Operation, OperationError, Resource, ResourceId};

/// A shared counter, the smallest useful resource.
///
/// The payload lives behind an [`CounterHandle`] so a test can keep
/// observing the value after the resource itself has moved into the
/// manager, the way an external collaborator would.
#[derive(Debug)]
pub struct CounterResource {
    id: ResourceId,
    value: Arc<AtomicI64>,
}

impl CounterResource {
    /// Creates a counter with value zero.
    #[must_use]
    pub fn new(id: ResourceId) -> Self {
        Self {
            id,
            value: Arc::new(AtomicI64::new(0)),
        }
    }

    /// Returns the current counter value.
    #[must_use]
    pub fn value(&self) -> i64 {
        self.value.load(Ordering::SeqCst)
    }

    /// Returns a handle that keeps reading this counter's value.
    #[must_use]
    pub fn watch(&self) -> CounterHandle {
        CounterHandle {
            value: Arc::clone(&self.value),
        }
    }
}

impl Resource for CounterResource {
    type Op = Inc;

    fn id(&self) -> ResourceId {
        self.id
    }
}

/// External observer of a [`CounterResource`]'s value.
#[derive(Debug, Clone)]
pub struct CounterHandle {
    value: Arc<AtomicI64>,
}

impl CounterHandle {
    /// Returns the current counter value.
    #[must_use]
    pub fn value(&self) -> i64 {
        self.value.load(Ordering::SeqCst)
    }
}

/// Adds an amount to a [`CounterResource`]; undo subtracts it.
///
/// With [`Inc::failing`], `execute` reports an [`OperationError`]
/// without touching the counter, for exercising the domain-failure path.
#[derive(Debug, Clone)]
pub struct Inc {
    amount: i64,
    fail: bool,
}

impl Inc {
    /// An increment by one.
    #[must_use]
    pub fn one() -> Self {
        Self::by(1)
    }

    /// An increment by `amount`.
    #[must_use]
    pub fn by(amount: i64) -> Self {
        Self {
            amount,
            fail: false,
        }
    }

    /// An operation that always fails without effect.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            amount: 0,
            fail: true,
        }
    }
}

impl Operation<CounterResource> for Inc {
    fn execute(&self, resource: &mut CounterResource) -> Result<(), OperationError> {
        if self.fail {
            return Err(OperationError::new("counter operation forced to fail"));
        }
        resource.value.fetch_add(self.amount, Ordering::SeqCst);
        Ok(())
    }

    fn undo(&self, resource: &mut CounterResource) {
        resource.value.fetch_sub(self.amount, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execute_and_undo_are_inverses() {
        let mut counter = CounterResource::new(ResourceId::new(1));
        let watch = counter.watch();
        let op = Inc::by(5);
        counter.apply(&op).unwrap();
        assert_eq!(watch.value(), 5);
        counter.unapply(&op);
        assert_eq!(watch.value(), 0);
    }

    #[test]
    fn failing_op_leaves_counter_untouched() {
        let mut counter = CounterResource::new(ResourceId::new(1));
        assert!(counter.apply(&Inc::failing()).is_err());
        assert_eq!(counter.value(), 0);
    }
}

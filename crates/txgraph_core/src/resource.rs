//! Resource and operation traits.
//!
//! Resources are the shared mutable units the manager arbitrates access
//! to. Their payloads and the meaning of individual operations are the
//! caller's domain; the core only requires that every operation carries
//! an exact inverse so a rollback can unwind the transaction's log.

use crate::types::ResourceId;
use std::fmt;
use thiserror::Error;

/// Failure raised by a domain operation's `execute`.
///
/// The core propagates this unchanged; it never interprets the message.
#[derive(Debug, Error)]
#[error("operation failed: {message}")]
pub struct OperationError {
    /// Description of the domain failure.
    pub message: String,
}

impl OperationError {
    /// Creates a new operation error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A reversible state change against a resource of type `R`.
///
/// `undo` must be the exact inverse of the most recently executed,
/// not-yet-undone `execute` on the same resource, and it cannot fail:
/// rollback is the universal recovery path and never raises.
pub trait Operation<R: ?Sized>: Send + Sync + fmt::Debug {
    /// Applies the operation to the resource.
    fn execute(&self, resource: &mut R) -> Result<(), OperationError>;

    /// Reverts the operation on the resource.
    fn undo(&self, resource: &mut R);
}

/// A uniquely identified unit of shared mutable state.
///
/// A resource is exclusively owned by at most one live transaction at a
/// time; all payload access goes through [`apply`](Resource::apply) /
/// [`unapply`](Resource::unapply) while held, so implementations need no
/// locking of their own.
pub trait Resource: Send + 'static {
    /// The operation type this resource accepts.
    type Op: Operation<Self> + Send + Sync + 'static;

    /// Returns this resource's stable identifier.
    fn id(&self) -> ResourceId;

    /// Applies an operation to the payload.
    fn apply(&mut self, op: &Self::Op) -> Result<(), OperationError>
    where
        Self: Sized,
    {
        op.execute(self)
    }

    /// Reverts the most recently applied, not-yet-reverted operation.
    fn unapply(&mut self, op: &Self::Op)
    where
        Self: Sized,
    {
        op.undo(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Cell {
        id: ResourceId,
        value: i64,
    }

    #[derive(Debug)]
    struct Add(i64);

    impl Operation<Cell> for Add {
        fn execute(&self, resource: &mut Cell) -> Result<(), OperationError> {
            resource.value += self.0;
            Ok(())
        }

        fn undo(&self, resource: &mut Cell) {
            resource.value -= self.0;
        }
    }

    impl Resource for Cell {
        type Op = Add;

        fn id(&self) -> ResourceId {
            self.id
        }
    }

    #[test]
    fn apply_then_unapply_restores_value() {
        let mut cell = Cell {
            id: ResourceId::new(1),
            value: 10,
        };
        let op = Add(5);
        cell.apply(&op).unwrap();
        assert_eq!(cell.value, 15);
        cell.unapply(&op);
        assert_eq!(cell.value, 10);
    }
}

//! Shared fixtures for in-crate unit tests.

use crate::resource::{Operation, OperationError, Resource};
use crate::types::ResourceId;

/// A signed counter cell, the smallest useful resource.
#[derive(Debug)]
pub(crate) struct Cell {
    id: ResourceId,
    pub(crate) value: i64,
}

impl Cell {
    pub(crate) fn new(id: u64) -> Self {
        Self {
            id: ResourceId::new(id),
            value: 0,
        }
    }
}

/// Adds a constant to a [`Cell`]; undo subtracts it.
#[derive(Debug)]
pub(crate) struct Add(pub(crate) i64);

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

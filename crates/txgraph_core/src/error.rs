//! Error types for txgraph core.

use crate::resource::OperationError;
use crate::types::{ResourceId, TxnId};
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in txgraph core operations.
///
/// All errors are reported synchronously to the calling thread. A deadlock
/// is never reported to the thread that detected it; it reaches the chosen
/// victim as [`CoreError::TransactionAborted`] on that victim's next call.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A transaction is already active on the calling thread.
    #[error("another transaction is already active on this thread")]
    TransactionActive,

    /// No transaction is active on the calling thread.
    #[error("no active transaction on this thread")]
    NoTransaction,

    /// The resource id is not known to the manager.
    #[error("unknown resource: {0}")]
    UnknownResource(ResourceId),

    /// The transaction was aborted by the deadlock resolver and must be
    /// rolled back before the calling thread can start a new one.
    #[error("transaction aborted: {0}")]
    TransactionAborted(TxnId),

    /// A domain-level operation failed. Propagated, not interpreted.
    #[error(transparent)]
    Operation(#[from] OperationError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_resource() {
        let err = CoreError::UnknownResource(ResourceId::new(7));
        assert_eq!(err.to_string(), "unknown resource: res:7");
    }

    #[test]
    fn operation_error_is_transparent() {
        let err = CoreError::from(OperationError::new("counter overflow"));
        assert_eq!(err.to_string(), "operation failed: counter overflow");
    }
}

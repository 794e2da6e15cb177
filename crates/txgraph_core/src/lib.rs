//! # txgraph core
//!
//! A concurrency-control core: many threads run multi-step transactions
//! over shared resources under serializable isolation, with deadlocks
//! detected and broken automatically instead of timed out.
//!
//! This crate provides:
//! - Exclusive per-resource ownership with FIFO hand-off
//! - A wait-for allocation graph with synchronous cycle detection
//! - Deterministic victim selection (latest start loses; id breaks ties)
//! - Per-transaction undo logs for rollback
//!
//! Resources and their operations are the caller's domain: implement
//! [`Resource`] and [`Operation`] and hand the resources to a
//! [`TransactionManager`].

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod resource;
#[cfg(test)]
mod testutil;
mod time;
mod transaction;
mod types;

pub use error::{CoreError, CoreResult};
pub use resource::{Operation, OperationError, Resource};
pub use time::{TimeSource, WallClock};
pub use transaction::{Transaction, TransactionManager};
pub use types::{ResourceId, Timestamp, TxnId};

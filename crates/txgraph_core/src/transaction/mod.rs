//! Transactions, the wait-for graph, and the manager that binds them.
//!
//! Serializable isolation comes from plain mutual exclusion: a resource
//! has at most one owner, contenders queue FIFO, and the allocation
//! graph breaks every deadlock the moment the closing wait edge is
//! inserted by aborting the cycle's youngest member.

mod graph;
mod manager;
mod state;

pub use manager::TransactionManager;
pub use state::Transaction;

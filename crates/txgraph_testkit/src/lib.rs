//! # txgraph testkit
//!
//! Test fixtures for txgraph:
//! - A counter resource with increment/decrement operations
//! - Deterministic clocks for victim-selection tests
//!
//! ## Usage
//!
//! ```rust
//! use txgraph_core::{ResourceId, TransactionManager};
//! use txgraph_testkit::{CounterResource, Inc, ManualClock};
//!
//! let clock = ManualClock::new(0);
//! let tm = TransactionManager::new([CounterResource::new(ResourceId::new(1))], clock);
//! tm.begin().unwrap();
//! tm.operate(ResourceId::new(1), Inc::one()).unwrap();
//! tm.commit().unwrap();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod clock;
mod fixtures;

pub use clock::ManualClock;
pub use fixtures::{CounterHandle, CounterResource, Inc};

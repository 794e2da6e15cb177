//! Transaction manager.

use crate::error::{CoreError, CoreResult};
use crate::resource::Resource;
use crate::time::TimeSource;
use crate::transaction::graph::AllocationGraph;
use crate::transaction::state::Transaction;
use crate::types::{ResourceId, TxnId};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use tracing::debug;

/// Coordinates exclusive resource access for many concurrent threads.
///
/// Each thread is bound to at most one active [`Transaction`] at a time.
/// Resource contention is resolved strictly FIFO per resource; deadlocks
/// are detected synchronously by the wait-for graph when a wait edge is
/// inserted and broken by aborting the cycle's youngest member.
///
/// ## Blocking
///
/// `operate` blocks the calling thread while the requested resource is
/// held by another transaction. The wait happens outside the graph's
/// critical section on the transaction's private wake signal; waking
/// means either "ownership granted" or "you are the deadlock victim",
/// and only the transaction's abort flag distinguishes the two.
pub struct TransactionManager<R: Resource> {
    /// The managed resources, frozen at construction. Each payload sits
    /// behind its own mutex to express exclusive access in the type
    /// system; graph-level ownership guarantees it is uncontended.
    resources: HashMap<ResourceId, Mutex<R>>,
    /// The shared wait-for graph.
    graph: AllocationGraph<R>,
    /// Current transaction per thread. Each thread touches only its own
    /// key.
    bindings: RwLock<HashMap<ThreadId, Arc<Transaction<R>>>>,
    /// Starting-timestamp source, queried once per `begin()`.
    clock: Box<dyn TimeSource>,
    /// Next transaction ID.
    next_txn_id: AtomicU64,
}

impl<R: Resource> TransactionManager<R> {
    /// Creates a manager over the given resources and time source.
    pub fn new(
        resources: impl IntoIterator<Item = R>,
        clock: impl TimeSource + 'static,
    ) -> Self {
        Self {
            resources: resources
                .into_iter()
                .map(|resource| (resource.id(), Mutex::new(resource)))
                .collect(),
            graph: AllocationGraph::new(),
            bindings: RwLock::new(HashMap::new()),
            clock: Box::new(clock),
            next_txn_id: AtomicU64::new(1),
        }
    }

    /// Starts a transaction bound to the calling thread.
    ///
    /// # Errors
    ///
    /// [`CoreError::TransactionActive`] if this thread already has one.
    pub fn begin(&self) -> CoreResult<()> {
        let thread = thread::current().id();
        let mut bindings = self.bindings.write();
        if bindings.contains_key(&thread) {
            return Err(CoreError::TransactionActive);
        }
        let id = TxnId::new(self.next_txn_id.fetch_add(1, Ordering::SeqCst));
        let txn = Arc::new(Transaction::new(id, self.clock.now()));
        debug!(txn = %id, started_at = %txn.started_at(), "transaction started");
        bindings.insert(thread, txn);
        Ok(())
    }

    /// Applies `op` to resource `rid` within the current transaction,
    /// acquiring exclusive access first if not already held.
    ///
    /// Blocks while the resource is owned by another transaction. On
    /// success the operation has been applied and logged for undo.
    ///
    /// # Errors
    ///
    /// [`CoreError::NoTransaction`] without an active transaction,
    /// [`CoreError::UnknownResource`] for an unmanaged id,
    /// [`CoreError::TransactionAborted`] once the deadlock resolver has
    /// chosen this transaction (rollback is the only way out), and
    /// [`CoreError::Operation`] when the domain apply fails (the
    /// operation is then not logged).
    pub fn operate(&self, rid: ResourceId, op: R::Op) -> CoreResult<()> {
        let txn = self.current()?;
        let resource = self
            .resources
            .get(&rid)
            .ok_or(CoreError::UnknownResource(rid))?;
        if txn.is_aborted() {
            return Err(CoreError::TransactionAborted(txn.id()));
        }

        if !txn.holds(rid) {
            if self.graph.request(&txn, rid) {
                // Park outside the graph's critical section; the owner
                // releasing this resource (or the resolver aborting us)
                // needs that section to run.
                txn.wake().wait();
            }
            // Waking (or an immediate grant) does not say which outcome
            // occurred; only the abort flag does.
            if txn.is_aborted() {
                return Err(CoreError::TransactionAborted(txn.id()));
            }
        }

        resource.lock().apply(&op)?;
        txn.record_op(rid, op);
        Ok(())
    }

    /// Commits the current transaction, releasing every held resource to
    /// its waiters and unbinding the thread.
    ///
    /// # Errors
    ///
    /// [`CoreError::NoTransaction`] without an active transaction,
    /// [`CoreError::TransactionAborted`] if the deadlock resolver got
    /// here first; an aborted transaction can only be rolled back.
    pub fn commit(&self) -> CoreResult<()> {
        let txn = self.current()?;
        if txn.is_aborted() {
            return Err(CoreError::TransactionAborted(txn.id()));
        }
        debug!(txn = %txn.id(), "committing");
        self.graph.release_all(&txn);
        self.unbind();
        Ok(())
    }

    /// Rolls back the current transaction: undoes every logged operation
    /// in strict reverse order, releases the graph node, and unbinds the
    /// thread.
    ///
    /// The universal recovery path: a no-op without a transaction, and
    /// safe to call redundantly.
    pub fn rollback(&self) {
        let Some(txn) = self.bindings.read().get(&thread::current().id()).cloned() else {
            return;
        };
        debug!(txn = %txn.id(), aborted = txn.is_aborted(), "rolling back");
        for (rid, op) in txn.take_log().into_iter().rev() {
            if let Some(resource) = self.resources.get(&rid) {
                resource.lock().unapply(&op);
            }
        }
        self.graph.release_all(&txn);
        self.unbind();
    }

    /// Whether the calling thread has an active transaction.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.bindings
            .read()
            .get(&thread::current().id())
            .is_some_and(|txn| txn.is_active())
    }

    /// Whether the calling thread's transaction has been aborted by the
    /// deadlock resolver.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.bindings
            .read()
            .get(&thread::current().id())
            .is_some_and(|txn| txn.is_aborted())
    }

    fn current(&self) -> CoreResult<Arc<Transaction<R>>> {
        self.bindings
            .read()
            .get(&thread::current().id())
            .cloned()
            .ok_or(CoreError::NoTransaction)
    }

    fn unbind(&self) {
        self.bindings.write().remove(&thread::current().id());
    }
}

impl<R: Resource> std::fmt::Debug for TransactionManager<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionManager")
            .field("resources", &self.resources.len())
            .field("bound_threads", &self.bindings.read().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{Add, Cell};
    use crate::time::WallClock;

    fn create_manager(resource_ids: &[u64]) -> TransactionManager<Cell> {
        TransactionManager::new(resource_ids.iter().map(|&id| Cell::new(id)), WallClock)
    }

    fn cell_value(tm: &TransactionManager<Cell>, id: u64) -> i64 {
        tm.resources[&ResourceId::new(id)].lock().value
    }

    #[test]
    fn begin_binds_one_transaction_per_thread() {
        let tm = create_manager(&[1]);
        assert!(!tm.is_active());
        tm.begin().unwrap();
        assert!(tm.is_active());
        assert!(matches!(tm.begin(), Err(CoreError::TransactionActive)));
    }

    #[test]
    fn operate_without_transaction_fails_and_binds_nothing() {
        let tm = create_manager(&[1]);
        let result = tm.operate(ResourceId::new(1), Add(1));
        assert!(matches!(result, Err(CoreError::NoTransaction)));
        assert!(!tm.is_active());
    }

    #[test]
    fn operate_on_unknown_resource_fails() {
        let tm = create_manager(&[1]);
        tm.begin().unwrap();
        let result = tm.operate(ResourceId::new(99), Add(1));
        assert!(matches!(result, Err(CoreError::UnknownResource(_))));
        tm.rollback();
    }

    #[test]
    fn commit_without_transaction_fails() {
        let tm = create_manager(&[1]);
        assert!(matches!(tm.commit(), Err(CoreError::NoTransaction)));
    }

    #[test]
    fn commit_keeps_applied_operations() {
        let tm = create_manager(&[1]);
        tm.begin().unwrap();
        for _ in 0..100 {
            tm.operate(ResourceId::new(1), Add(1)).unwrap();
        }
        tm.commit().unwrap();
        assert!(!tm.is_active());
        assert_eq!(cell_value(&tm, 1), 100);
    }

    #[test]
    fn rollback_undoes_in_reverse_order() {
        let tm = create_manager(&[1, 2]);
        tm.begin().unwrap();
        tm.operate(ResourceId::new(1), Add(5)).unwrap();
        tm.operate(ResourceId::new(2), Add(7)).unwrap();
        tm.operate(ResourceId::new(1), Add(11)).unwrap();
        tm.rollback();
        assert_eq!(cell_value(&tm, 1), 0);
        assert_eq!(cell_value(&tm, 2), 0);
        assert!(!tm.is_active());
    }

    #[test]
    fn rollback_is_idempotent_and_never_fails() {
        let tm = create_manager(&[1]);
        tm.rollback();
        tm.begin().unwrap();
        tm.operate(ResourceId::new(1), Add(3)).unwrap();
        tm.rollback();
        tm.rollback();
        assert_eq!(cell_value(&tm, 1), 0);
    }

    #[test]
    fn new_transaction_allowed_after_commit() {
        let tm = create_manager(&[1]);
        tm.begin().unwrap();
        tm.commit().unwrap();
        tm.begin().unwrap();
        tm.rollback();
    }

    #[test]
    fn commit_on_aborted_transaction_fails_until_rollback() {
        let tm = Arc::new(create_manager(&[1, 2]));
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<()>();

        tm.begin().unwrap();
        tm.operate(ResourceId::new(1), Add(1)).unwrap();

        let victim = {
            let tm = Arc::clone(&tm);
            thread::spawn(move || {
                tm.begin().unwrap();
                tm.operate(ResourceId::new(2), Add(1)).unwrap();
                ready_tx.send(()).unwrap();
                // Crossing over resources 1 and 2 deadlocks with the
                // main thread; this transaction began later and must be
                // the victim.
                let err = tm.operate(ResourceId::new(1), Add(1));
                assert!(matches!(err, Err(CoreError::TransactionAborted(_))));

                // Commit is refused while the abort is pending, and the
                // transaction stays bound until rollback unwinds it.
                assert!(matches!(tm.commit(), Err(CoreError::TransactionAborted(_))));
                assert!(tm.is_aborted());
                tm.rollback();
                assert!(!tm.is_aborted());
                assert!(!tm.is_active());
            })
        };

        ready_rx.recv().unwrap();
        tm.operate(ResourceId::new(2), Add(1)).unwrap();
        victim.join().unwrap();
        tm.commit().unwrap();
        assert_eq!(cell_value(&tm, 1), 1);
        assert_eq!(cell_value(&tm, 2), 1);
    }
}

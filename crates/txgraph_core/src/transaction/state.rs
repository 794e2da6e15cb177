//! Per-transaction state.

use crate::resource::Resource;
use crate::types::{ResourceId, Timestamp, TxnId};
use parking_lot::{Condvar, Mutex};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

/// Single-slot wakeup primitive for a blocked transaction.
///
/// At most one release is outstanding before a wait consumes it. The
/// protocol issues exactly one release per resource hand-off and one per
/// victim selection, so a waiter can neither miss a wakeup issued before
/// it parked nor be woken twice. The permit is consumed by the wait.
#[derive(Debug, Default)]
pub(crate) struct WakeSignal {
    permit: Mutex<bool>,
    cond: Condvar,
}

impl WakeSignal {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Stores the permit and wakes the waiter, if any.
    pub(crate) fn release(&self) {
        let mut permit = self.permit.lock();
        *permit = true;
        self.cond.notify_one();
    }

    /// Blocks until a permit is available, then consumes it.
    ///
    /// Must be called outside the allocation graph's critical section;
    /// the thread that would release this signal needs that section to
    /// make progress.
    pub(crate) fn wait(&self) {
        let mut permit = self.permit.lock();
        while !*permit {
            self.cond.wait(&mut permit);
        }
        *permit = false;
    }
}

/// One logical unit of work, bound to a single OS thread for its entire
/// lifetime.
///
/// The transaction is shared (via `Arc`) between its owning thread and
/// the allocation graph, so its mutable state sits behind atomics and
/// mutexes. The acquired set is only ever mutated inside the graph's
/// critical section; the operation log only by the owning thread.
pub struct Transaction<R: Resource> {
    id: TxnId,
    started_at: Timestamp,
    aborted: AtomicBool,
    active: AtomicBool,
    acquired: Mutex<HashSet<ResourceId>>,
    log: Mutex<Vec<(ResourceId, R::Op)>>,
    wake: WakeSignal,
}

impl<R: Resource> Transaction<R> {
    /// Creates a new active transaction.
    pub(crate) fn new(id: TxnId, started_at: Timestamp) -> Self {
        Self {
            id,
            started_at,
            aborted: AtomicBool::new(false),
            active: AtomicBool::new(true),
            acquired: Mutex::new(HashSet::new()),
            log: Mutex::new(Vec::new()),
            wake: WakeSignal::new(),
        }
    }

    /// Returns the transaction ID.
    #[must_use]
    pub fn id(&self) -> TxnId {
        self.id
    }

    /// Returns the starting timestamp.
    #[must_use]
    pub fn started_at(&self) -> Timestamp {
        self.started_at
    }

    /// Whether the deadlock resolver has aborted this transaction.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    /// Whether the transaction is still active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Marks the transaction aborted. Idempotent.
    ///
    /// An aborted transaction never acquires a resource it does not
    /// already hold; its owning thread unwinds via rollback.
    pub(crate) fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
        self.active.store(false, Ordering::SeqCst);
    }

    /// Whether this transaction currently holds `rid` exclusively.
    #[must_use]
    pub fn holds(&self, rid: ResourceId) -> bool {
        self.acquired.lock().contains(&rid)
    }

    /// Records exclusive ownership of `rid`.
    ///
    /// Called only inside the graph's critical section, on grant or on
    /// promotion from a wait queue.
    pub(crate) fn record_acquired(&self, rid: ResourceId) {
        self.acquired.lock().insert(rid);
    }

    /// Snapshot of the currently held resources.
    pub(crate) fn acquired_resources(&self) -> Vec<ResourceId> {
        self.acquired.lock().iter().copied().collect()
    }

    /// Appends an applied operation to the undo log.
    pub(crate) fn record_op(&self, rid: ResourceId, op: R::Op) {
        self.log.lock().push((rid, op));
    }

    /// Drains the undo log for rollback; newest operation last.
    pub(crate) fn take_log(&self) -> Vec<(ResourceId, R::Op)> {
        std::mem::take(&mut *self.log.lock())
    }

    pub(crate) fn wake(&self) -> &WakeSignal {
        &self.wake
    }
}

impl<R: Resource> std::fmt::Debug for Transaction<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("started_at", &self.started_at)
            .field("aborted", &self.is_aborted())
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

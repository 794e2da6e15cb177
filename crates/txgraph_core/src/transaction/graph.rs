//! Wait-for allocation graph with synchronous deadlock detection.
//!
//! Nodes are transactions; an edge points from a blocked transaction to
//! the transaction owning the resource it wants. A transaction waits for
//! at most one resource at a time, so the graph is functional (out-degree
//! ≤ 1) and any cycle reachable from a newly blocked transaction is
//! unique and simple. Detection is therefore a single path walk, run
//! inside the same critical section that inserted the edge.

use crate::resource::Resource;
use crate::transaction::state::Transaction;
use crate::types::{ResourceId, TxnId};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, trace};

/// The shared wait-for graph.
///
/// All mutation happens under one coarse mutex: inserting a wait edge,
/// detecting the cycle it may close, and aborting the chosen victim are
/// a single atomic step, as are resource release and waiter promotion.
/// The graph is never observable with an unchecked edge.
pub(crate) struct AllocationGraph<R: Resource> {
    inner: Mutex<GraphInner<R>>,
}

struct GraphInner<R: Resource> {
    /// Current exclusive holder per resource; absent means free.
    owners: HashMap<ResourceId, Arc<Transaction<R>>>,
    /// Waiters per resource, in arrival order.
    wait_queues: HashMap<ResourceId, VecDeque<Arc<Transaction<R>>>>,
    /// The resource each blocked transaction is waiting for. The
    /// blocked-by target is `owners[waiting_for[t]]`, so promotion
    /// redirects every remaining waiter's edge implicitly.
    waiting_for: HashMap<TxnId, ResourceId>,
}

impl<R: Resource> AllocationGraph<R> {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(GraphInner {
                owners: HashMap::new(),
                wait_queues: HashMap::new(),
                waiting_for: HashMap::new(),
            }),
        }
    }

    /// Requests exclusive access to `rid` for `txn`.
    ///
    /// Returns `false` if the resource was free and ownership was granted
    /// immediately, `true` if the caller must block on its wake signal.
    /// In the waiting case the new edge has already been checked for a
    /// cycle (and a victim aborted, possibly `txn` itself) before this
    /// returns.
    ///
    /// The caller must neither own nor already wait for `rid`.
    pub(crate) fn request(&self, txn: &Arc<Transaction<R>>, rid: ResourceId) -> bool {
        let mut graph = self.inner.lock();
        debug_assert!(!txn.holds(rid));
        debug_assert!(!graph.waiting_for.contains_key(&txn.id()));

        if graph.owners.contains_key(&rid) {
            trace!(txn = %txn.id(), resource = %rid, "resource held, enqueueing waiter");
            graph
                .wait_queues
                .entry(rid)
                .or_default()
                .push_back(Arc::clone(txn));
            graph.waiting_for.insert(txn.id(), rid);
            graph.detect_cycle(txn);
            true
        } else {
            trace!(txn = %txn.id(), resource = %rid, "resource free, granting");
            graph.owners.insert(rid, Arc::clone(txn));
            txn.record_acquired(rid);
            false
        }
    }

    /// Releases everything `txn` holds or waits for, on commit or
    /// rollback.
    ///
    /// Each released resource is handed to the first live waiter in FIFO
    /// order (its wake signal released exactly once) or becomes free.
    /// Afterwards no edge in the graph points at `txn`.
    pub(crate) fn release_all(&self, txn: &Transaction<R>) {
        let mut graph = self.inner.lock();

        // The transaction may itself be mid-wait when this runs during
        // an abort-triggered unwind.
        if let Some(rid) = graph.waiting_for.remove(&txn.id()) {
            if let Some(queue) = graph.wait_queues.get_mut(&rid) {
                queue.retain(|waiter| waiter.id() != txn.id());
            }
        }

        for rid in txn.acquired_resources() {
            match graph.next_live_waiter(rid) {
                Some(next) => {
                    trace!(resource = %rid, from = %txn.id(), to = %next.id(), "ownership promoted");
                    graph.owners.insert(rid, Arc::clone(&next));
                    next.record_acquired(rid);
                    next.wake().release();
                }
                None => {
                    trace!(resource = %rid, from = %txn.id(), "resource freed");
                    graph.owners.remove(&rid);
                }
            }
        }
    }

    /// Test-only view: whether the blocked-by graph restricted to live
    /// transactions contains a cycle.
    #[cfg(test)]
    pub(crate) fn has_live_cycle(&self) -> bool {
        let graph = self.inner.lock();
        for start in graph.waiting_for.keys() {
            let mut seen = HashSet::new();
            let mut current = *start;
            loop {
                if !seen.insert(current) {
                    return true;
                }
                let owner = graph
                    .waiting_for
                    .get(&current)
                    .and_then(|rid| graph.owners.get(rid));
                match owner {
                    Some(owner) if !owner.is_aborted() => current = owner.id(),
                    _ => break,
                }
            }
        }
        false
    }
}

impl<R: Resource> GraphInner<R> {
    /// Dequeues waiters for `rid` until a live one is found, dropping
    /// the edges of any aborted waiters discarded on the way. An aborted
    /// transaction must never be handed a resource it does not already
    /// hold; its own rollback finishes its cleanup.
    fn next_live_waiter(&mut self, rid: ResourceId) -> Option<Arc<Transaction<R>>> {
        let queue = self.wait_queues.get_mut(&rid)?;
        while let Some(candidate) = queue.pop_front() {
            self.waiting_for.remove(&candidate.id());
            if candidate.is_aborted() {
                trace!(txn = %candidate.id(), resource = %rid, "discarding aborted waiter");
                continue;
            }
            return Some(candidate);
        }
        None
    }

    /// Walks the single outgoing edge per node starting at the
    /// transaction that just blocked, tracking the walked path with an
    /// in-stack set and an explicit stack. An absent edge, or an edge
    /// into an already-aborted transaction (the stale edge of an
    /// unwinding victim), terminates the walk with no cycle; revisiting
    /// an in-stack node closes the unique cycle through it.
    fn detect_cycle(&self, start: &Arc<Transaction<R>>) {
        let mut in_stack: HashSet<TxnId> = HashSet::new();
        let mut path: Vec<Arc<Transaction<R>>> = Vec::new();
        let mut current = Arc::clone(start);

        loop {
            in_stack.insert(current.id());
            path.push(Arc::clone(&current));

            let next = self
                .waiting_for
                .get(&current.id())
                .and_then(|rid| self.owners.get(rid))
                .cloned();
            let Some(next) = next else {
                break;
            };
            if next.is_aborted() {
                // Stale edge: the victim's rollback will remove it.
                break;
            }
            if in_stack.contains(&next.id()) {
                Self::resolve_cycle(&mut path, &next);
                break;
            }
            current = next;
        }
    }

    /// Pops the path stack down to (and including) the node that closed
    /// the cycle; the popped nodes are exactly the cycle's members.
    /// Aborts the member with the latest start time, breaking exact ties
    /// toward the greater transaction id, and releases its wake signal
    /// so the victim's thread can observe the abort and unwind. The
    /// victim stays in the graph until its own rollback removes it.
    fn resolve_cycle(path: &mut Vec<Arc<Transaction<R>>>, closer: &Arc<Transaction<R>>) {
        let mut cycle: Vec<Arc<Transaction<R>>> = Vec::new();
        while let Some(member) = path.pop() {
            let closed = member.id() == closer.id();
            cycle.push(member);
            if closed {
                break;
            }
        }

        let Some((first, rest)) = cycle.split_first() else {
            return;
        };
        let mut victim = first;
        for member in rest {
            if (member.started_at(), member.id()) > (victim.started_at(), victim.id()) {
                victim = member;
            }
        }

        debug!(
            victim = %victim.id(),
            started_at = %victim.started_at(),
            cycle_len = cycle.len(),
            "deadlock detected, aborting youngest member"
        );
        victim.abort();
        victim.wake().release();
    }
}

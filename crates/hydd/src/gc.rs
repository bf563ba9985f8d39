//! Garbage collection: root protection, reference stacks, mark and sweep
//!
//! Nodes are reclaimed by mark-and-sweep only. The roots of a collection
//! are (i) the current edges of all live protected cells and (ii) every
//! entry on every thread's reference stack. Marking recurses through the
//! children of newly marked branch nodes on the worker pool; the sweep
//! re-hashes surviving records at their existing indices, so live edges
//! stay valid across a collection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use hydd_core::Edge;
use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::manager::Manager;

/// A shared, updatable slot holding one edge, registered as a collection
/// root via [`Manager::protect`]
///
/// The registry only keeps a weak reference: dropping the last `Arc` to a
/// cell implicitly unprotects it.
pub struct EdgeCell(AtomicU64);

impl EdgeCell {
    pub fn new(edge: Edge) -> Arc<Self> {
        Arc::new(EdgeCell(AtomicU64::new(edge.raw())))
    }

    pub fn get(&self) -> Edge {
        Edge::from_raw(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, edge: Edge) {
        self.0.store(edge.raw(), Ordering::Release)
    }
}

/// Registry of protected cells, keyed by cell address
pub(crate) struct ProtectRegistry {
    cells: Mutex<FxHashMap<usize, Weak<EdgeCell>>>,
}

impl ProtectRegistry {
    pub(crate) fn new() -> Self {
        let mut cells = FxHashMap::default();
        cells.reserve(4096);
        ProtectRegistry {
            cells: Mutex::new(cells),
        }
    }
}

impl Manager {
    // --- External references -------------------------------------------------

    /// Register `cell` as a collection root: whatever edge it holds at
    /// collection time is kept alive.
    pub fn protect(&self, cell: &Arc<EdgeCell>) {
        let key = Arc::as_ptr(cell) as usize;
        self.protected
            .cells
            .lock()
            .unwrap()
            .insert(key, Arc::downgrade(cell));
    }

    /// Remove `cell` from the collection roots
    pub fn unprotect(&self, cell: &Arc<EdgeCell>) {
        let key = Arc::as_ptr(cell) as usize;
        self.protected.cells.lock().unwrap().remove(&key);
    }

    /// Number of live protected cells
    pub fn protected_count(&self) -> usize {
        self.protected
            .cells
            .lock()
            .unwrap()
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    // --- Internal references -------------------------------------------------

    /// Push an intermediate edge onto the current thread's reference stack
    /// and return it unchanged
    ///
    /// Entries are collection roots until the matching [`Manager::refs_pop`].
    pub fn refs_push(&self, edge: Edge) -> Edge {
        self.refs
            .lock()
            .unwrap()
            .entry(std::thread::current().id())
            .or_default()
            .push(edge);
        edge
    }

    /// Pop `amount` entries from the current thread's reference stack
    pub fn refs_pop(&self, amount: usize) {
        if amount == 0 {
            return;
        }
        let mut refs = self.refs.lock().unwrap();
        let stack = refs
            .get_mut(&std::thread::current().id())
            .expect("refs_pop without a matching refs_push");
        debug_assert!(stack.len() >= amount);
        stack.truncate(stack.len() - amount);
    }

    // --- Collection ----------------------------------------------------------

    /// Force a garbage collection
    ///
    /// From a worker thread (an enumeration callback) the collection cannot
    /// run immediately — the enclosing operation holds the operation guard —
    /// so it is only requested and happens at the next operation boundary.
    pub fn gc(&self) {
        if self.pool.current_thread_index().is_some() {
            self.gc_requested.store(true, Ordering::Release);
            return;
        }
        let _guard = self.gate.write().unwrap();
        self.collect_locked();
    }

    /// Collect only if a request is still pending (another thread may have
    /// collected while we waited for the exclusive guard)
    pub(crate) fn collect_if_pending(&self) {
        let _guard = self.gate.write().unwrap();
        if self.gc_requested.load(Ordering::Acquire) {
            self.collect_locked();
        }
    }

    /// Mark and sweep; caller holds the exclusive operation guard
    pub(crate) fn collect_locked(&self) {
        let mut roots: Vec<Edge> = Vec::new();
        {
            let mut cells = self.protected.cells.lock().unwrap();
            cells.retain(|_, weak| match weak.upgrade() {
                Some(cell) => {
                    roots.push(cell.get());
                    true
                }
                None => false,
            });
        }
        {
            let refs = self.refs.lock().unwrap();
            for stack in refs.values() {
                roots.extend_from_slice(stack);
            }
        }

        self.pool
            .install(|| roots.par_iter().for_each(|&root| self.mark_rec(root)));

        let kept = self.table.count_marked();
        let capacity = self.table.capacity();
        self.table.rebuild();
        self.cache.clear();
        self.gc_requested.store(false, Ordering::Release);
        log::debug!("garbage collection kept {kept} of {capacity} node slots");
    }

    /// Recursively mark the nodes reachable from `edge`
    fn mark_rec(&self, edge: Edge) {
        if edge.index() <= 1 || edge.is_invalid() {
            return;
        }
        if self.table.mark(edge.index()) {
            let node = self.table.node(edge.index());
            if !node.is_leaf() {
                rayon::join(
                    || self.mark_rec(node.low()),
                    || self.mark_rec(node.high()),
                );
            }
        }
    }
}

//! The manager: shared node table, cache, workers, and primitives

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock};
use std::thread::ThreadId;

use hydd_core::{AllocResult, Edge, Error, Node, OutOfMemory, MAX_VAR, NO_VAR};
use hydd_cache::ApplyCache;
use hydd_table::UniqueTable;
use rustc_hash::FxHashMap;

use crate::gc::ProtectRegistry;

/// Owner of all shared engine state
///
/// A `Manager` bundles the unique node table, the memoization cache, a
/// dedicated fork-join worker pool, the root-protection registry, and the
/// per-thread reference stacks. Operations take `&self` and may run
/// concurrently from any number of threads; a garbage collection quiesces
/// them through the internal operation guard.
///
/// Edges are plain values and carry no ownership: any edge that must
/// survive a collection has to be reachable from a protected [`EdgeCell`]
/// or a reference stack entry at that point.
///
/// [`EdgeCell`]: crate::EdgeCell
pub struct Manager {
    pub(crate) table: UniqueTable,
    pub(crate) cache: ApplyCache,
    pub(crate) pool: rayon::ThreadPool,
    /// Operations hold this shared, a collection holds it exclusively
    pub(crate) gate: RwLock<()>,
    /// Set when an interning failed; polled by [`Manager::gc_test`]
    pub(crate) gc_requested: AtomicBool,
    pub(crate) protected: ProtectRegistry,
    /// Per-thread stacks of live intermediate edges, scanned during marking
    pub(crate) refs: Mutex<FxHashMap<ThreadId, Vec<Edge>>>,
}

impl Manager {
    /// Create a manager with the given unique-table and cache capacities
    /// (both rounded up to powers of two) and `workers` threads in the
    /// fork-join pool (0 = one per logical CPU).
    pub fn new(table_capacity: usize, cache_capacity: usize, workers: usize) -> Self {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("hydd-{i}"))
            .build()
            .expect("failed to spawn the worker pool");
        Manager {
            table: UniqueTable::new(table_capacity),
            cache: ApplyCache::new(cache_capacity),
            pool,
            gate: RwLock::new(()),
            gc_requested: AtomicBool::new(false),
            protected: ProtectRegistry::new(),
            refs: Mutex::new(FxHashMap::default()),
        }
    }

    // --- Operation wrapper ---------------------------------------------------

    /// Run `f` under the operation guard on the worker pool, collecting
    /// garbage and retrying once when the node table fills up.
    ///
    /// `roots` are the caller's operand edges; they are pushed onto the
    /// reference stack across the collection so the retry sees them alive.
    /// Invoked from a worker thread (an enumeration callback re-entering
    /// the engine), `f` runs directly: the enclosing operation already
    /// holds the guard, and a failure propagates to its retry loop via
    /// [`OutOfMemory`]'s `From<Error>` conversion.
    pub(crate) fn run_op<T: Send>(
        &self,
        roots: &[Edge],
        f: impl Fn(&Self) -> AllocResult<T> + Send + Sync,
    ) -> Result<T, Error> {
        if self.pool.current_thread_index().is_some() {
            return f(self).map_err(|OutOfMemory| self.full_error());
        }
        let mut retried = false;
        loop {
            let result = {
                let _guard = self.gate.read().unwrap();
                self.pool.install(|| f(self))
            };
            match result {
                Ok(v) => return Ok(v),
                Err(OutOfMemory) if !retried => {
                    retried = true;
                    for &root in roots {
                        self.refs_push(root);
                    }
                    self.collect_if_pending();
                    self.refs_pop(roots.len());
                }
                Err(OutOfMemory) => return Err(self.full_error()),
            }
        }
    }

    /// Run a read-only computation on the worker pool (so that nested
    /// `rayon::join` calls use our workers), without the operation guard.
    pub(crate) fn in_pool<T: Send>(&self, f: impl FnOnce() -> T + Send) -> T {
        if self.pool.current_thread_index().is_some() {
            f()
        } else {
            self.pool.install(f)
        }
    }

    pub(crate) fn full_error(&self) -> Error {
        Error::UniqueTableFull {
            filled: self.table.occupied(),
            capacity: self.table.capacity(),
        }
    }

    /// Cooperative collection poll, called by kernels before recursing:
    /// unwinds the operation when another thread is waiting to collect.
    #[inline]
    pub(crate) fn gc_test(&self) -> AllocResult<()> {
        if self.gc_requested.load(Ordering::Relaxed) {
            Err(OutOfMemory)
        } else {
            Ok(())
        }
    }

    /// Live and total slot counts of the unique node table
    pub fn table_usage(&self) -> (usize, usize) {
        (self.table.occupied(), self.table.capacity())
    }

    // --- Interning -----------------------------------------------------------

    fn intern(&self, node: Node) -> AllocResult<u64> {
        let (a, b) = node.words();
        match self.table.lookup_or_insert(a, b) {
            Some((index, _created)) => Ok(index),
            None => {
                self.gc_requested.store(true, Ordering::Release);
                Err(OutOfMemory)
            }
        }
    }

    /// Node constructor: the canonical edge for `if var then high else low`
    ///
    /// `next_var` is the domain's immediate successor of `var`, or
    /// [`NO_VAR`] at the end of the domain. Applies the BDD reduction
    /// (equal children), the ZDD-skip merge (False high child with a
    /// tag-compatible low child) and stride materialization (a `(k, k)`
    /// node when the skip would cross an incompatible variable).
    pub(crate) fn mk_node(
        &self,
        var: u32,
        low: Edge,
        high: Edge,
        next_var: u32,
    ) -> AllocResult<Edge> {
        debug_assert!(var <= MAX_VAR);
        if low == high {
            return Ok(low);
        }
        let node = if high == Edge::FALSE {
            // low != False here since low != high
            if next_var == NO_VAR || low.tag() == next_var {
                return Ok(low.with_tag(var));
            }
            Node::branch(next_var, low, low)
        } else {
            Node::branch(var, low, high)
        };
        let index = self.intern(node)?;
        Ok(Edge::new(index, var))
    }

    pub(crate) fn mk_leaf(&self, leaf_type: u32, value: u64) -> AllocResult<Edge> {
        let index = self.intern(Node::leaf(leaf_type, value))?;
        Ok(Edge::new(index, NO_VAR))
    }

    /// See [`Manager::mk_node`]
    pub fn make_node(&self, var: u32, low: Edge, high: Edge, next_var: u32) -> Result<Edge, Error> {
        self.run_op(&[low, high], |m| m.mk_node(var, low, high, next_var))
    }

    /// Terminal of opaque `leaf_type` and `value` (interpreted by the
    /// caller, not by the engine)
    pub fn make_leaf(&self, leaf_type: u32, value: u64) -> Result<Edge, Error> {
        self.run_op(&[], |m| m.mk_leaf(leaf_type, value))
    }

    /// Positive literal of `var`
    pub fn ithvar(&self, var: u32) -> Result<Edge, Error> {
        self.make_node(var, Edge::FALSE, Edge::TRUE, NO_VAR)
    }

    /// Negative literal of `var`
    pub fn nithvar(&self, var: u32) -> Result<Edge, Error> {
        self.make_node(var, Edge::TRUE, Edge::FALSE, NO_VAR)
    }

    // --- Primitives ----------------------------------------------------------

    /// Change the tag on an edge, re-applying the minimization rules (a
    /// `(k, k)` node collapses when the new tag reaches its variable)
    pub fn retag(&self, dd: Edge, tag: u32) -> Edge {
        if dd.index() > 1 {
            let node = self.table.node(dd.index());
            if !node.is_leaf() {
                let var = node.var();
                debug_assert!(tag <= var || tag == NO_VAR);
                if var == tag {
                    let low = node.low();
                    if low == node.high() {
                        return low;
                    }
                }
            }
        }
        dd.with_tag(tag)
    }

    /// Whether the edge points to a terminal (including the False/True
    /// sentinels)
    pub fn is_leaf(&self, dd: Edge) -> bool {
        dd.index() <= 1 || self.table.node(dd.index()).is_leaf()
    }

    /// Decision variable of a branch node
    pub fn var_of(&self, dd: Edge) -> u32 {
        self.table.node(dd.index()).var()
    }

    /// Low child edge of a branch node, including its tag
    pub fn low_of(&self, dd: Edge) -> Edge {
        self.table.node(dd.index()).low()
    }

    /// High child edge of a branch node, including its tag
    pub fn high_of(&self, dd: Edge) -> Edge {
        self.table.node(dd.index()).high()
    }

    /// Type code of a leaf
    pub fn leaf_type(&self, dd: Edge) -> u32 {
        self.table.node(dd.index()).leaf_type()
    }

    /// Value of a leaf
    pub fn leaf_value(&self, dd: Edge) -> u64 {
        self.table.node(dd.index()).leaf_value()
    }

    /// Cofactor of `dd` when `variable` takes `value`
    ///
    /// `variable` must be the first domain variable not yet fixed, and
    /// `next_var` its successor in the domain (or [`NO_VAR`]). Variables
    /// before the edge's tag are BDD-skipped and leave the edge unchanged.
    pub fn eval(&self, dd: Edge, variable: u32, value: bool, next_var: u32) -> Edge {
        let tag = dd.tag();
        if variable < tag {
            return dd;
        }
        debug_assert_eq!(variable, tag);
        if self.is_leaf(dd) {
            return if value {
                Edge::FALSE
            } else {
                self.retag(dd, next_var)
            };
        }
        let node = self.table.node(dd.index());
        let var = node.var();
        if variable < var {
            return if value {
                Edge::FALSE
            } else {
                self.retag(dd, next_var)
            };
        }
        debug_assert_eq!(variable, var);
        if value {
            node.high()
        } else {
            node.low()
        }
    }

    // --- Shared kernel helpers -----------------------------------------------

    /// Node behind an edge plus its variable; `(None, NO_VAR)` for the
    /// sentinels, [`NO_VAR`] as the variable of a leaf
    #[inline]
    pub(crate) fn top(&self, dd: Edge) -> (Option<Node>, u32) {
        if dd.index() <= 1 {
            return (None, NO_VAR);
        }
        let node = self.table.node(dd.index());
        let var = if node.is_leaf() { NO_VAR } else { node.var() };
        (Some(node), var)
    }

    /// The six-way cofactor dispatch shared by every kernel: both child
    /// edges of `dd` at the pivot variable, where `next_var` is the
    /// domain's successor of the pivot.
    #[inline]
    pub(crate) fn cofactors(
        &self,
        dd: Edge,
        node: Option<Node>,
        var: u32,
        pivot: u32,
        next_var: u32,
    ) -> (Edge, Edge) {
        if pivot == var {
            // the pivot is this node's variable
            let node = node.unwrap();
            (node.low(), node.high())
        } else if pivot >= dd.tag() {
            // the pivot lies in the ZDD-skip region
            (self.retag(dd, next_var), Edge::FALSE)
        } else {
            // the pivot lies in the BDD-skip region
            (dd, dd)
        }
    }

    /// Variable of a domain edge ([`NO_VAR`] for the empty domain)
    #[inline]
    pub(crate) fn domain_var(&self, dom: Edge) -> u32 {
        if dom == Edge::TRUE {
            NO_VAR
        } else {
            self.table.node(dom.index()).var()
        }
    }

    /// Walk `dom` forward (through high edges) until its variable equals
    /// `var`; returns the remaining domain, its successor and the successor
    /// variable. The pivot variable always lies in the domain.
    pub(crate) fn advance_domain(&self, mut dom: Edge, var: u32) -> (Edge, Edge, u32) {
        debug_assert!(dom != Edge::TRUE);
        let mut node = self.table.node(dom.index());
        while node.var() != var {
            debug_assert!(node.var() < var);
            dom = node.high();
            debug_assert!(dom != Edge::TRUE);
            node = self.table.node(dom.index());
        }
        let next = node.high();
        (dom, next, self.domain_var(next))
    }
}

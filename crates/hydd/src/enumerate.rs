//! Enumeration of satisfying assignments
//!
//! `enum_first`/`enum_next` drive an iterator-style traversal that fills a
//! caller-supplied value array in lexicographic (low-before-high) order.
//! `enum_par` and `enum_seq` invoke a callback per assignment, in parallel
//! (unordered) and sequentially (ordered) respectively; `collect` folds a
//! callback-produced edge over all assignments with OR.

use std::sync::Mutex;

use hydd_core::{AllocResult, Edge, Error};

use crate::manager::Manager;
use crate::op::{stat, Op};

/// Assignment prefix, kept as a linked list on the recursion stack
struct Trace<'a> {
    prev: Option<&'a Trace<'a>>,
    value: u8,
}

impl Trace<'_> {
    /// Materialize the prefix, oldest value first
    fn to_values(trace: Option<&Trace>) -> Vec<u8> {
        let mut len = 0;
        let mut walk = trace;
        while let Some(t) = walk {
            len += 1;
            walk = t.prev;
        }
        let mut values = vec![0; len];
        let mut walk = trace;
        for slot in values.iter_mut().rev() {
            let t = walk.unwrap();
            *slot = t.value;
            walk = t.prev;
        }
        values
    }
}

impl Manager {
    /// First satisfying assignment of `dd` over `dom`, written into
    /// `values` (length = domain size); returns the reached terminal, or
    /// [`Edge::FALSE`] if the set is empty
    pub fn enum_first(&self, dd: Edge, dom: Edge, values: &mut [u8]) -> Edge {
        if dd == Edge::FALSE {
            return Edge::FALSE;
        }
        if dom == Edge::TRUE {
            debug_assert_eq!(dd, Edge::TRUE);
            return dd;
        }
        let dom_node = self.table.node(dom.index());
        let dom_var = dom_node.var();
        let dom_next = dom_node.high();
        let dom_next_var = self.domain_var(dom_next);

        let (dd_node, dd_var) = self.top(dd);
        let (dd0, dd1) = self.cofactors(dd, dd_node, dd_var, dom_var, dom_next_var);

        let low = self.enum_first(dd0, dom_next, &mut values[1..]);
        if low != Edge::FALSE {
            values[0] = 0;
            return low;
        }
        let high = self.enum_first(dd1, dom_next, &mut values[1..]);
        if high != Edge::FALSE {
            values[0] = 1;
            return high;
        }
        Edge::FALSE
    }

    /// Advance `values` to the next satisfying assignment; returns
    /// [`Edge::FALSE`] when exhausted, [`Edge::INVALID`] when `values` does
    /// not hold a well-formed position
    pub fn enum_next(&self, dd: Edge, dom: Edge, values: &mut [u8]) -> Edge {
        if dd == Edge::FALSE {
            return Edge::FALSE;
        }
        if dom == Edge::TRUE {
            debug_assert_eq!(dd, Edge::TRUE);
            return Edge::FALSE;
        }
        let dom_node = self.table.node(dom.index());
        let dom_var = dom_node.var();
        let dom_next = dom_node.high();
        let dom_next_var = self.domain_var(dom_next);

        let (dd_node, dd_var) = self.top(dd);
        let (dd0, dd1) = self.cofactors(dd, dd_node, dd_var, dom_var, dom_next_var);

        match values[0] {
            0 => {
                let mut res = self.enum_next(dd0, dom_next, &mut values[1..]);
                if res == Edge::FALSE {
                    res = self.enum_first(dd1, dom_next, &mut values[1..]);
                    if res != Edge::FALSE {
                        values[0] = 1;
                    }
                }
                res
            }
            1 => self.enum_next(dd1, dom_next, &mut values[1..]),
            _ => Edge::INVALID,
        }
    }

    /// Invoke `cb` for every satisfying assignment, in parallel and in no
    /// particular order
    pub fn enum_par(&self, dd: Edge, dom: Edge, cb: impl Fn(&[u8]) + Send + Sync) -> Result<(), Error> {
        self.run_op(&[dd, dom], |m| {
            m.enum_par_rec(dd, dom, &cb, None);
            Ok(())
        })
    }

    /// Invoke `cb` for every satisfying assignment, sequentially, low
    /// cofactor before high at every level
    pub fn enum_seq(&self, dd: Edge, dom: Edge, cb: impl FnMut(&[u8]) + Send) -> Result<(), Error> {
        let cb = Mutex::new(cb);
        self.run_op(&[dd, dom], |m| {
            let mut cb = cb.lock().unwrap();
            m.enum_seq_rec(dd, dom, &mut *cb, None);
            Ok(())
        })
    }

    /// Fold `cb` over all satisfying assignments: the produced edges are
    /// combined with OR under `res_dom`. The callback may invoke engine
    /// operations; on memory pressure the whole fold is restarted after a
    /// collection, so callbacks must tolerate re-invocation.
    pub fn collect(
        &self,
        dd: Edge,
        dom: Edge,
        res_dom: Edge,
        cb: impl Fn(&[u8]) -> AllocResult<Edge> + Send + Sync,
    ) -> Result<Edge, Error> {
        self.run_op(&[dd, dom, res_dom], |m| {
            m.collect_rec(dd, dom, res_dom, &cb, None)
        })
    }

    fn enum_par_rec(
        &self,
        dd: Edge,
        dom: Edge,
        cb: &(impl Fn(&[u8]) + Send + Sync),
        trace: Option<&Trace>,
    ) {
        if dd == Edge::FALSE {
            return;
        }
        if dom == Edge::TRUE {
            cb(&Trace::to_values(trace));
            return;
        }
        let dom_node = self.table.node(dom.index());
        let dom_var = dom_node.var();
        let dom_next = dom_node.high();
        let dom_next_var = self.domain_var(dom_next);

        let (dd_node, dd_var) = self.top(dd);
        let (dd0, dd1) = self.cofactors(dd, dd_node, dd_var, dom_var, dom_next_var);

        let t0 = Trace { prev: trace, value: 0 };
        let t1 = Trace { prev: trace, value: 1 };
        rayon::join(
            || self.enum_par_rec(dd0, dom_next, cb, Some(&t0)),
            || self.enum_par_rec(dd1, dom_next, cb, Some(&t1)),
        );
    }

    fn enum_seq_rec(
        &self,
        dd: Edge,
        dom: Edge,
        cb: &mut impl FnMut(&[u8]),
        trace: Option<&Trace>,
    ) {
        if dd == Edge::FALSE {
            return;
        }
        if dom == Edge::TRUE {
            cb(&Trace::to_values(trace));
            return;
        }
        let dom_node = self.table.node(dom.index());
        let dom_var = dom_node.var();
        let dom_next = dom_node.high();
        let dom_next_var = self.domain_var(dom_next);

        let (dd_node, dd_var) = self.top(dd);
        let (dd0, dd1) = self.cofactors(dd, dd_node, dd_var, dom_var, dom_next_var);

        let t0 = Trace { prev: trace, value: 0 };
        self.enum_seq_rec(dd0, dom_next, cb, Some(&t0));
        let t1 = Trace { prev: trace, value: 1 };
        self.enum_seq_rec(dd1, dom_next, cb, Some(&t1));
    }

    fn collect_rec(
        &self,
        dd: Edge,
        dom: Edge,
        res_dom: Edge,
        cb: &(impl Fn(&[u8]) -> AllocResult<Edge> + Send + Sync),
        trace: Option<&Trace>,
    ) -> AllocResult<Edge> {
        if dd == Edge::FALSE {
            return Ok(Edge::FALSE);
        }
        if dom == Edge::TRUE {
            return cb(&Trace::to_values(trace));
        }

        self.gc_test()?;
        stat!(call Op::Collect);

        let dom_node = self.table.node(dom.index());
        let dom_var = dom_node.var();
        let dom_next = dom_node.high();
        let dom_next_var = self.domain_var(dom_next);

        let (dd_node, dd_var) = self.top(dd);
        let (dd0, dd1) = self.cofactors(dd, dd_node, dd_var, dom_var, dom_next_var);

        let t0 = Trace { prev: trace, value: 0 };
        let t1 = Trace { prev: trace, value: 1 };
        let (low, high) = rayon::join(
            || self.collect_rec(dd0, dom_next, res_dom, cb, Some(&t0)),
            || self.collect_rec(dd1, dom_next, res_dom, cb, Some(&t1)),
        );
        let (low, high) = (low?, high?);
        self.refs_push(low);
        self.refs_push(high);
        let result = self.or_rec(low, high, res_dom);
        self.refs_pop(2);
        result
    }
}

//! Conversion from and to multi-terminal decision diagrams
//!
//! The multi-terminal side is abstract (see [`MtbddSource`] and
//! [`MtbddBuilder`]); the engine only walks it in lockstep with the
//! domain. Going in, variables the source diagram jumps over stay
//! unconstrained; going out, ZDD-skipped variables are materialized as
//! explicit nodes with a False high edge and BDD-skipped variables as
//! nothing, which is the multi-terminal convention.
//!
//! Both directions run sequentially with a per-call memo table: node
//! construction on the builder side needs exclusive access, and external
//! node references are not valid keys for the shared cache.

use hydd_core::{AllocResult, Edge, Error, MtbddBuilder, MtbddSource, NO_VAR};
use rustc_hash::FxHashMap;

use crate::manager::Manager;
use crate::op::{stat, Op};

impl Manager {
    /// Convert the multi-terminal diagram `dd` over `dom` (a conjunction of
    /// the domain variables in `src`) into a tagged edge
    pub fn from_mtbdd<S>(&self, src: &S, dd: S::Node, dom: S::Node) -> Result<Edge, Error>
    where
        S: MtbddSource + Sync,
        S::Node: Send + Sync,
    {
        self.run_op(&[], |m| {
            let mut memo = FxHashMap::default();
            m.from_mtbdd_rec(src, dd, dom, &mut memo)
        })
    }

    /// Convert the tagged edge `dd` over `dom` into a multi-terminal
    /// diagram built in `dst`
    pub fn to_mtbdd<B: MtbddBuilder>(&self, dst: &mut B, dd: Edge, dom: Edge) -> B::Node {
        let mut memo = FxHashMap::default();
        self.to_mtbdd_rec(dst, dd, dom, &mut memo)
    }

    fn from_mtbdd_rec<S: MtbddSource>(
        &self,
        src: &S,
        dd: S::Node,
        mut dom: S::Node,
        memo: &mut FxHashMap<(S::Node, S::Node), Edge>,
    ) -> AllocResult<Edge> {
        if dd == src.false_node() {
            return Ok(Edge::FALSE);
        }
        if dd == src.true_node() {
            return Ok(Edge::TRUE);
        }

        self.gc_test()?;
        stat!(call Op::FromMtbdd);

        // Align the domain with the node (a leaf consumes no variables).
        if src.is_leaf(dd) {
            dom = src.true_node();
        } else {
            let var = src.var(dd);
            debug_assert!(dom != src.true_node() && dom != src.false_node());
            while src.var(dom) != var {
                debug_assert!(src.var(dom) < var);
                dom = src.high(dom);
                debug_assert!(dom != src.true_node());
            }
        }

        if let Some(&hit) = memo.get(&(dd, dom)) {
            return Ok(hit);
        }

        let result = if src.is_leaf(dd) {
            self.mk_leaf(src.leaf_type(dd), src.leaf_value(dd))?
        } else {
            let var = src.var(dd);
            let dom_next = src.high(dom);
            let low = self.from_mtbdd_rec(src, src.low(dd), dom_next, memo)?;
            let high = self.from_mtbdd_rec(src, src.high(dd), dom_next, memo)?;
            let dom_next_var = if dom_next == src.true_node() {
                NO_VAR
            } else {
                src.var(dom_next)
            };
            self.mk_node(var, low, high, dom_next_var)?
        };

        memo.insert((dd, dom), result);
        Ok(result)
    }

    fn to_mtbdd_rec<B: MtbddBuilder>(
        &self,
        dst: &mut B,
        dd: Edge,
        dom: Edge,
        memo: &mut FxHashMap<(u64, u64), B::Node>,
    ) -> B::Node {
        if dd == Edge::FALSE {
            return dst.false_node();
        }
        if dd == Edge::TRUE {
            return dst.true_node();
        }
        stat!(call Op::ToMtbdd);

        if let Some(&hit) = memo.get(&(dd.raw(), dom.raw())) {
            return hit;
        }

        let (dd_node, dd_var) = self.top(dd);
        let dd_tag = dd.tag();

        if dd_tag == NO_VAR {
            // no skip region at all: this is a leaf
            let node = dd_node.unwrap();
            debug_assert!(node.is_leaf());
            return dst.make_leaf(node.leaf_type(), node.leaf_value());
        }

        let dom_node = self.table.node(dom.index());
        let dom_var = dom_node.var();
        let dom_next = dom_node.high();
        let dom_next_var = self.domain_var(dom_next);
        debug_assert!(dom_var <= dd_tag);
        debug_assert!(dom_var <= dd_var);

        let (dd0, dd1) = self.cofactors(dd, dd_node, dd_var, dom_var, dom_next_var);
        let low = self.to_mtbdd_rec(dst, dd0, dom_next, memo);
        let high = self.to_mtbdd_rec(dst, dd1, dom_next, memo);
        let result = dst.make_node(dom_var, low, high);

        memo.insert((dd.raw(), dom.raw()), result);
        result
    }
}

//! Recursive parallel apply kernels: conjunction, if-then-else, negation
//!
//! All kernels follow one schema: short-circuit the trivial cases, pick the
//! pivot variable, advance the domain to the pivot, extract both cofactors
//! of every operand, recurse over the cofactors in parallel, and rebuild
//! the result through the node constructor — re-introducing the ZDD-skip
//! region when the smallest operand tag lies before the pivot.

use hydd_core::{AllocResult, Edge, Error, NO_VAR};

use crate::manager::Manager;
use crate::op::{cache_key, stat, Op};

impl Manager {
    /// Conjunction of `a` and `b` under the domain `dom`
    pub fn and(&self, a: Edge, b: Edge, dom: Edge) -> Result<Edge, Error> {
        self.run_op(&[a, b, dom], |m| m.and_rec(a, b, dom))
    }

    /// Disjunction of `a` and `b` under the domain `dom`
    pub fn or(&self, a: Edge, b: Edge, dom: Edge) -> Result<Edge, Error> {
        self.run_op(&[a, b, dom], |m| m.or_rec(a, b, dom))
    }

    /// `if a then b else c` under the domain `dom`
    pub fn ite(&self, a: Edge, b: Edge, c: Edge, dom: Edge) -> Result<Edge, Error> {
        self.run_op(&[a, b, c, dom], |m| m.ite_rec(a, b, c, dom))
    }

    /// Complement of `dd` with respect to the domain `dom`
    pub fn not(&self, dd: Edge, dom: Edge) -> Result<Edge, Error> {
        self.run_op(&[dd, dom], |m| m.not_rec(dd, dom))
    }

    pub(crate) fn and_rec(&self, a: Edge, b: Edge, dom: Edge) -> AllocResult<Edge> {
        if a == Edge::FALSE || b == Edge::FALSE {
            return Ok(Edge::FALSE);
        }
        // A ∧ A = A (this also covers True ∧ True); the result keeps the
        // more restrictive, i.e. smaller, tag.
        if a.without_tag() == b.without_tag() {
            return Ok(self.retag(a, a.tag().min(b.tag())));
        }
        debug_assert!(dom != Edge::TRUE);

        // normalize the operand order for the cache
        let (a, b) = if a.index() > b.index() { (b, a) } else { (a, b) };

        self.gc_test()?;
        stat!(call Op::And);

        let k0 = cache_key(Op::And, a);
        stat!(cache_query Op::And);
        if let Some(hit) = self.cache.get3(k0, b.raw(), dom.raw()) {
            stat!(cache_hit Op::And);
            return Ok(Edge::from_raw(hit));
        }

        let (a_node, a_var) = self.top(a);
        let (b_node, b_var) = self.top(b);
        let pivot = a_var.min(b_var);
        debug_assert!(pivot < NO_VAR);

        let (_, d_next, d_next_var) = self.advance_domain(dom, pivot);

        let a_tag = a.tag();
        let b_tag = b.tag();
        debug_assert!(a_tag <= a_var && b_tag <= b_var);

        let (a0, a1) = self.cofactors(a, a_node, a_var, pivot, d_next_var);
        let (b0, b1) = self.cofactors(b, b_node, b_var, pivot, d_next_var);
        debug_assert!(a0.tag() >= d_next_var && a1.tag() >= d_next_var);
        debug_assert!(b0.tag() >= d_next_var && b1.tag() >= d_next_var);

        let (low, high) = rayon::join(
            || self.and_rec(a0, b0, d_next),
            || self.and_rec(a1, b1, d_next),
        );
        let mut result = self.mk_node(pivot, low?, high?, d_next_var)?;

        // re-introduce the ZDD-skip region in front of the pivot
        let tag = a_tag.min(b_tag);
        if tag < pivot {
            result = self.mk_node(tag, result, Edge::FALSE, pivot)?;
        }

        self.cache.put3(k0, b.raw(), dom.raw(), result.raw());
        Ok(result)
    }

    #[inline]
    pub(crate) fn or_rec(&self, a: Edge, b: Edge, dom: Edge) -> AllocResult<Edge> {
        self.ite_rec(a, Edge::TRUE, b, dom)
    }

    pub(crate) fn ite_rec(&self, a: Edge, b: Edge, c: Edge, dom: Edge) -> AllocResult<Edge> {
        if a == Edge::TRUE {
            return Ok(b);
        }
        if a == Edge::FALSE {
            return Ok(c);
        }
        let b = if a == b { Edge::TRUE } else { b };
        let c = if a == c { Edge::FALSE } else { c };
        if c == Edge::FALSE {
            return self.and_rec(a, b, dom);
        }
        if b == c {
            return Ok(b);
        }
        // Not much more to short-circuit here: negation is not a constant-
        // time operation on tagged diagrams.
        debug_assert!(dom != Edge::TRUE);

        self.gc_test()?;
        stat!(call Op::Ite);

        // The operand triple plus the domain exceeds a three-word key, so
        // if-then-else uses the widened four-word cache entries.
        let k0 = cache_key(Op::Ite, a);
        stat!(cache_query Op::Ite);
        if let Some(hit) = self.cache.get4(k0, b.raw(), c.raw(), dom.raw()) {
            stat!(cache_hit Op::Ite);
            return Ok(Edge::from_raw(hit));
        }

        let (a_node, a_var) = self.top(a);
        let (b_node, b_var) = self.top(b);
        let (c_node, c_var) = self.top(c);

        let a_tag = a.tag();
        let b_tag = b.tag();
        let c_tag = c.tag();

        let min_var = a_var.min(b_var).min(c_var);
        let min_tag = a_tag.min(b_tag).min(c_tag);

        // Pivot: the lowest variable if all tags agree, otherwise the
        // lowest tag (the ZDD-skip regions have to be unwound first).
        let pivot = if a_tag == b_tag && b_tag == c_tag {
            min_var
        } else {
            min_tag
        };
        debug_assert!(pivot != NO_VAR);

        let (_, d_next, d_next_var) = self.advance_domain(dom, pivot);

        let (a0, a1) = self.cofactors(a, a_node, a_var, pivot, d_next_var);
        let (b0, b1) = self.cofactors(b, b_node, b_var, pivot, d_next_var);
        let (c0, c1) = self.cofactors(c, c_node, c_var, pivot, d_next_var);
        debug_assert!(a0.tag() >= d_next_var && a1.tag() >= d_next_var);
        debug_assert!(b0.tag() >= d_next_var && b1.tag() >= d_next_var);
        debug_assert!(c0.tag() >= d_next_var && c1.tag() >= d_next_var);

        let (low, high) = rayon::join(
            || self.ite_rec(a0, b0, c0, d_next),
            || self.ite_rec(a1, b1, c1, d_next),
        );
        let mut result = self.mk_node(pivot, low?, high?, d_next_var)?;
        if min_tag < pivot {
            result = self.mk_node(min_tag, result, Edge::FALSE, pivot)?;
        }

        self.cache.put4(k0, b.raw(), c.raw(), dom.raw(), result.raw());
        Ok(result)
    }

    /// Negation, optimized to descend a single operand instead of going
    /// through `ite(dd, False, True)`
    pub(crate) fn not_rec(&self, dd: Edge, dom: Edge) -> AllocResult<Edge> {
        if dd == Edge::TRUE {
            return Ok(Edge::FALSE);
        }
        if dd == Edge::FALSE {
            return Ok(Edge::TRUE);
        }
        debug_assert!(dom != Edge::TRUE);

        self.gc_test()?;
        stat!(call Op::Not);

        let k0 = cache_key(Op::Not, dd);
        stat!(cache_query Op::Not);
        if let Some(hit) = self.cache.get3(k0, dom.raw(), 0) {
            stat!(cache_hit Op::Not);
            return Ok(Edge::from_raw(hit));
        }

        let (dd_node, dd_var) = self.top(dd);
        let tag = dd.tag();

        // The complement flips assignments inside the ZDD-skip region too,
        // so the recursion pivots on the tag rather than the variable.
        let (_, d_next, d_next_var) = self.advance_domain(dom, tag);

        let (dd0, dd1) = self.cofactors(dd, dd_node, dd_var, tag, d_next_var);
        debug_assert!(dd0.tag() >= d_next_var && dd1.tag() >= d_next_var);

        let (low, high) = rayon::join(
            || self.not_rec(dd0, d_next),
            || self.not_rec(dd1, d_next),
        );
        let result = self.mk_node(tag, low?, high?, d_next_var)?;

        self.cache.put3(k0, dom.raw(), 0, result.raw());
        Ok(result)
    }
}

//! Relational image: one step of a transition relation
//!
//! Conventions: state variables are even, the paired next-state variable of
//! `s` is `s + 1`, `dom` contains only state variables, `vars` contains
//! both variables of every pair the relation is defined on, and the
//! relation assigns 0 to every variable outside `vars`.

use hydd_core::{AllocResult, Edge, Error, NO_VAR};

use crate::manager::Manager;
use crate::op::{cache_key, stat, Op};

impl Manager {
    /// Successor states of `set` under the transition relation `rel`
    ///
    /// `vars` is the variable set the relation ranges over (source and
    /// target variables interleaved), `dom` the state domain.
    pub fn relnext(&self, set: Edge, rel: Edge, vars: Edge, dom: Edge) -> Result<Edge, Error> {
        self.run_op(&[set, rel, vars, dom], |m| m.relnext_rec(set, rel, vars, dom))
    }

    fn relnext_rec(&self, set: Edge, rel: Edge, mut vars: Edge, mut dom: Edge) -> AllocResult<Edge> {
        if set == Edge::FALSE || rel == Edge::FALSE {
            return Ok(Edge::FALSE);
        }
        if vars == Edge::TRUE {
            return Ok(set);
        }
        debug_assert!(dom != Edge::TRUE);

        self.gc_test()?;
        stat!(call Op::RelNext);

        let k0 = cache_key(Op::RelNext, set);
        let (k1, k2, k3) = (rel.raw(), vars.raw(), dom.raw());
        stat!(cache_query Op::RelNext);
        if let Some(hit) = self.cache.get4(k0, k1, k2, k3) {
            stat!(cache_hit Op::RelNext);
            return Ok(Edge::from_raw(hit));
        }

        let (set_node, set_var) = self.top(set);
        let set_tag = set.tag();
        let (rel_node, rel_var) = self.top(rel);
        let rel_tag = rel.tag();

        let mut dom_node = self.table.node(dom.index());
        let mut dom_var = dom_node.var();
        let mut vars_node = self.table.node(vars.index());
        let mut vars_var = vars_node.var();

        debug_assert_eq!(dom_var & 1, 0);
        debug_assert_eq!(vars_var & 1, 0);
        debug_assert!(dom_var <= vars_var);
        debug_assert!(set_tag == NO_VAR || set_tag & 1 == 0);
        debug_assert!(set_var == NO_VAR || set_var & 1 == 0);

        // Skip relation variables inside the skip regions of both operands.
        while vars_var < set_tag && vars_var < (rel_tag & !1) {
            vars = vars_node.high();
            if vars == Edge::TRUE {
                return Ok(set);
            }
            vars_node = self.table.node(vars.index());
            vars_var = vars_node.var();
        }

        // Forward the domain to the first variable that still matters.
        while dom_var < set_tag && dom_var < vars_var {
            dom = dom_node.high();
            debug_assert!(dom != Edge::TRUE);
            dom_node = self.table.node(dom.index());
            dom_var = dom_node.var();
        }

        let pivot = dom_var;
        let dom_next = dom_node.high();
        let dom_next_var = self.domain_var(dom_next);

        if pivot < vars_var {
            // A state variable the relation does not constrain: cofactor
            // the set, keep the relation (it assigns 0 here).
            let (set0, set1) = self.cofactors(set, set_node, set_var, pivot, dom_next_var);
            debug_assert!(pivot < rel_tag);

            let (low, high) = rayon::join(
                || self.relnext_rec(set0, rel, vars, dom_next),
                || self.relnext_rec(set1, rel, vars, dom_next),
            );
            let result = self.mk_node(pivot, low?, high?, dom_next_var)?;

            self.cache.put4(k0, k1, k2, k3, result.raw());
            return Ok(result);
        }

        // The pivot is a relational source variable.
        let var_s = pivot;
        let var_t = var_s + 1;

        // Skip the source/target pair in `vars`.
        let mut vars_next = vars_node.high();
        debug_assert_eq!(self.domain_var(vars_next), var_t);
        vars_next = self.table.node(vars_next.index()).high();
        let vars_next_var = self.domain_var(vars_next);

        // Cofactor set and relation on the source variable, then each
        // relation branch on the paired target variable.
        let (set0, set1) = self.cofactors(set, set_node, set_var, var_s, dom_next_var);
        let (rel0, rel1) = self.cofactors(rel, rel_node, rel_var, var_s, var_t);

        let (rel0_node, rel0_var) = self.top(rel0);
        let (rel00, rel01) = self.cofactors(rel0, rel0_node, rel0_var, var_t, vars_next_var);
        let (rel1_node, rel1_var) = self.top(rel1);
        let (rel10, rel11) = self.cofactors(rel1, rel1_node, rel1_var, var_t, vars_next_var);

        // Image of each source branch through each target branch.
        let ((r00, r01), (r10, r11)) = rayon::join(
            || {
                rayon::join(
                    || self.relnext_rec(set0, rel00, vars_next, dom_next),
                    || self.relnext_rec(set0, rel01, vars_next, dom_next),
                )
            },
            || {
                rayon::join(
                    || self.relnext_rec(set1, rel10, vars_next, dom_next),
                    || self.relnext_rec(set1, rel11, vars_next, dom_next),
                )
            },
        );
        let (r00, r01, r10, r11) = (r00?, r01?, r10?, r11?);

        // Combine along the target axis.
        let (res0, res1) = rayon::join(
            || self.or_rec(r00, r10, dom_next),
            || self.or_rec(r01, r11, dom_next),
        );
        let result = self.mk_node(var_s, res0?, res1?, dom_next_var)?;

        self.cache.put4(k0, k1, k2, k3, result.raw());
        Ok(result)
    }
}

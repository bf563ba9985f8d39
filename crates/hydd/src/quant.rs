//! Existential quantification, domain-preserving and domain-shrinking

use hydd_core::{AllocResult, Edge, Error};

use crate::manager::Manager;
use crate::op::{cache_key, stat, Op};

impl Manager {
    /// Existentially quantify the variables in `vars` (a variable set),
    /// keeping the ambient domain `dom`
    pub fn exists(&self, dd: Edge, vars: Edge, dom: Edge) -> Result<Edge, Error> {
        self.run_op(&[dd, vars, dom], |m| m.exists_rec(dd, vars, dom))
    }

    /// Project `dd` onto the (smaller) domain `new_dom`: variables of the
    /// original domain absent from `new_dom` are existentially quantified,
    /// and the result's tags refer to `new_dom`.
    pub fn exists_dom(&self, dd: Edge, new_dom: Edge) -> Result<Edge, Error> {
        self.run_op(&[dd, new_dom], |m| m.exists_dom_rec(dd, new_dom))
    }

    fn exists_rec(&self, dd: Edge, mut vars: Edge, dom: Edge) -> AllocResult<Edge> {
        if dd == Edge::TRUE || dd == Edge::FALSE || vars == Edge::TRUE {
            return Ok(dd);
        }
        debug_assert!(dom != Edge::TRUE);

        self.gc_test()?;
        stat!(call Op::Exists);

        let k0 = cache_key(Op::Exists, dd);
        let (k1, k2) = (vars.raw(), dom.raw());
        stat!(cache_query Op::Exists);
        if let Some(hit) = self.cache.get3(k0, k1, k2) {
            stat!(cache_hit Op::Exists);
            return Ok(Edge::from_raw(hit));
        }

        let (dd_node, dd_var) = self.top(dd);
        let dd_tag = dd.tag();

        // Quantifying a variable inside the ZDD-skip region is a no-op
        // (it is forced to 0), so skip `vars` ahead to the tag.
        let mut vars_node = self.table.node(vars.index());
        let mut vars_var = vars_node.var();
        while vars_var < dd_tag {
            vars = vars_node.high();
            if vars == Edge::TRUE {
                return Ok(dd);
            }
            vars_node = self.table.node(vars.index());
            vars_var = vars_node.var();
        }

        let pivot = vars_var.min(dd_var);
        debug_assert!(dd_tag <= pivot);

        let (dom_at, d_next, d_next_var) = self.advance_domain(dom, pivot);

        let (dd0, dd1) = if pivot < dd_var {
            (self.retag(dd, d_next_var), Edge::FALSE)
        } else {
            let node = dd_node.unwrap();
            (node.low(), node.high())
        };

        let mut result = if pivot == vars_var {
            // quantify: combine both cofactors with OR
            let vars_next = vars_node.high();
            let (low, high) = rayon::join(
                || self.exists_rec(dd0, vars_next, d_next),
                || self.exists_rec(dd1, vars_next, d_next),
            );
            self.or_rec(low?, high?, dom_at)?
        } else {
            // keep the variable
            let (low, high) = rayon::join(
                || self.exists_rec(dd0, vars, d_next),
                || self.exists_rec(dd1, vars, d_next),
            );
            self.mk_node(pivot, low?, high?, d_next_var)?
        };
        if dd_tag != pivot {
            result = self.mk_node(dd_tag, result, Edge::FALSE, pivot)?;
        }

        self.cache.put3(k0, k1, k2, result.raw());
        Ok(result)
    }

    fn exists_dom_rec(&self, dd: Edge, mut dom: Edge) -> AllocResult<Edge> {
        if dd == Edge::TRUE || dd == Edge::FALSE {
            return Ok(dd);
        }
        if dom == Edge::TRUE {
            return Ok(Edge::TRUE);
        }

        self.gc_test()?;
        stat!(call Op::ExistsDom);

        let k0 = cache_key(Op::ExistsDom, dd);
        let k1 = dom.raw();
        stat!(cache_query Op::ExistsDom);
        if let Some(hit) = self.cache.get3(k0, k1, 0) {
            stat!(cache_hit Op::ExistsDom);
            return Ok(Edge::from_raw(hit));
        }

        let dd_tag = dd.tag();

        // Forward the new domain to the tag; whatever it skips was either
        // forced to 0 or absent, and is quantified away by dropping it.
        let mut dom_node = self.table.node(dom.index());
        let mut dom_var = dom_node.var();
        while dom_var < dd_tag {
            dom = dom_node.high();
            if dom == Edge::TRUE {
                return Ok(Edge::TRUE);
            }
            dom_node = self.table.node(dom.index());
            dom_var = dom_node.var();
        }

        // First retained domain variable: the tag of the result.
        let new_tag = dom_var;

        if dd.without_tag() == Edge::TRUE {
            return Ok(self.retag(Edge::TRUE, new_tag));
        }

        let dd_node = self.table.node(dd.index());
        let dd_var = dd_node.var();

        while dom_var < dd_var {
            dom = dom_node.high();
            if dom == Edge::TRUE {
                return Ok(self.retag(Edge::TRUE, new_tag));
            }
            dom_node = self.table.node(dom.index());
            dom_var = dom_node.var();
        }

        let dd0 = dd_node.low();
        let dd1 = dd_node.high();

        let mut result = if dom_var == dd_var {
            // the variable stays in the new domain
            let d_next = dom_node.high();
            let d_next_var = self.domain_var(d_next);
            let (low, high) = rayon::join(
                || self.exists_dom_rec(dd0, d_next),
                || self.exists_dom_rec(dd1, d_next),
            );
            self.mk_node(dom_var, low?, high?, d_next_var)?
        } else {
            // the variable is projected away
            let (low, high) = rayon::join(
                || self.exists_dom_rec(dd0, dom),
                || self.exists_dom_rec(dd1, dom),
            );
            self.or_rec(low?, high?, dom)?
        };
        if new_tag != dom_var {
            result = self.mk_node(new_tag, result, Edge::FALSE, dom_var)?;
        }

        self.cache.put3(k0, k1, 0, result.raw());
        Ok(result)
    }
}

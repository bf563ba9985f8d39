//! Variable sets, cubes and cube union
//!
//! A variable set (also used as a domain) is a chain of positive literals:
//! one node per variable, the next variable reached through the high edge.
//! A cube fixes each domain variable to 0, 1 or "either" (value 2).

use hydd_core::{AllocResult, Edge, Error, NO_VAR};

use crate::manager::Manager;
use crate::op::{cache_key, stat, Op};

impl Manager {
    /// Cube of positive literals over `vars` (ascending); represents a
    /// variable set or a domain
    pub fn var_set(&self, vars: &[u32]) -> Result<Edge, Error> {
        self.run_op(&[], |m| m.var_set_rec(vars))
    }

    /// Canonical edge for one assignment over `dom`: `values[i]` is 0, 1,
    /// or 2 for "either". Any other byte yields [`Edge::INVALID`].
    pub fn cube(&self, dom: Edge, values: &[u8]) -> Result<Edge, Error> {
        self.run_op(&[dom], |m| m.cube_rec(dom, values))
    }

    /// Union `cube(dom, values)` into `set` in one recursive pass, reusing
    /// shared structure
    pub fn union_cube(&self, set: Edge, dom: Edge, values: &[u8]) -> Result<Edge, Error> {
        self.run_op(&[set, dom], |m| m.union_cube_rec(set, dom, values))
    }

    /// Union of two variable sets
    pub fn merge_domains(&self, a: Edge, b: Edge) -> Result<Edge, Error> {
        self.run_op(&[a, b], |m| m.merge_domains_rec(a, b))
    }

    /// Reinterpret `dd` (a set over `dom`) over the superset domain
    /// `new_dom`; the added variables are unconstrained
    pub fn extend_domain(&self, dd: Edge, dom: Edge, new_dom: Edge) -> Result<Edge, Error> {
        self.run_op(&[dd, dom, new_dom], |m| m.extend_domain_rec(dd, dom, new_dom))
    }

    fn var_set_rec(&self, vars: &[u32]) -> AllocResult<Edge> {
        match vars {
            [] => Ok(Edge::TRUE),
            [var] => self.mk_node(*var, Edge::FALSE, Edge::TRUE, NO_VAR),
            [var, rest @ ..] => {
                let tail = self.var_set_rec(rest)?;
                self.mk_node(*var, Edge::FALSE, tail, rest[0])
            }
        }
    }

    fn cube_rec(&self, dom: Edge, values: &[u8]) -> AllocResult<Edge> {
        if dom == Edge::TRUE {
            return Ok(Edge::TRUE);
        }
        let dom_node = self.table.node(dom.index());
        let dom_var = dom_node.var();
        let dom_next = dom_node.high();
        let dom_next_var = self.domain_var(dom_next);

        let rest = self.cube_rec(dom_next, &values[1..])?;
        if rest == Edge::INVALID {
            return Ok(Edge::INVALID);
        }
        match values[0] {
            0 => self.mk_node(dom_var, rest, Edge::FALSE, dom_next_var),
            1 => self.mk_node(dom_var, Edge::FALSE, rest, dom_next_var),
            2 => self.mk_node(dom_var, rest, rest, dom_next_var),
            _ => Ok(Edge::INVALID),
        }
    }

    fn union_cube_rec(&self, set: Edge, dom: Edge, values: &[u8]) -> AllocResult<Edge> {
        if dom == Edge::TRUE || set == Edge::TRUE {
            return Ok(Edge::TRUE);
        }
        if set == Edge::FALSE {
            return self.cube_rec(dom, values);
        }

        self.gc_test()?;
        stat!(call Op::UnionCube);

        let (set_node, set_var) = self.top(set);
        let set_tag = set.tag();
        let dom_node = self.table.node(dom.index());
        let dom_var = dom_node.var();
        let dom_next = dom_node.high();
        let dom_next_var = self.domain_var(dom_next);

        debug_assert!(dom_var <= set_tag);
        debug_assert!(dom_var <= set_var);

        let (set0, set1) = self.cofactors(set, set_node, set_var, dom_var, dom_next_var);

        match values[0] {
            0 => {
                let low = self.union_cube_rec(set0, dom_next, &values[1..])?;
                if low == Edge::INVALID {
                    return Ok(Edge::INVALID);
                }
                self.mk_node(dom_var, low, set1, dom_next_var)
            }
            1 => {
                let high = self.union_cube_rec(set1, dom_next, &values[1..])?;
                if high == Edge::INVALID {
                    return Ok(Edge::INVALID);
                }
                self.mk_node(dom_var, set0, high, dom_next_var)
            }
            2 => {
                let (low, high) = rayon::join(
                    || self.union_cube_rec(set0, dom_next, &values[1..]),
                    || self.union_cube_rec(set1, dom_next, &values[1..]),
                );
                let (low, high) = (low?, high?);
                if low == Edge::INVALID || high == Edge::INVALID {
                    return Ok(Edge::INVALID);
                }
                self.mk_node(dom_var, low, high, dom_next_var)
            }
            _ => Ok(Edge::INVALID),
        }
    }

    fn merge_domains_rec(&self, a: Edge, b: Edge) -> AllocResult<Edge> {
        if a == Edge::TRUE {
            return Ok(b);
        }
        if b == Edge::TRUE {
            return Ok(a);
        }
        let a_node = self.table.node(a.index());
        let b_node = self.table.node(b.index());
        let a_var = a_node.var();
        let b_var = b_node.var();

        let (var, a_rest, b_rest) = if a_var == b_var {
            (a_var, a_node.high(), b_node.high())
        } else if a_var < b_var {
            (a_var, a_node.high(), b)
        } else {
            (b_var, a, b_node.high())
        };
        let rest = self.merge_domains_rec(a_rest, b_rest)?;
        self.mk_node(var, Edge::FALSE, rest, self.domain_var(rest))
    }

    fn extend_domain_rec(&self, dd: Edge, dom: Edge, new_dom: Edge) -> AllocResult<Edge> {
        if dd == Edge::FALSE || dd == Edge::TRUE {
            return Ok(dd);
        }
        if new_dom == Edge::TRUE {
            return Ok(dd);
        }

        self.gc_test()?;
        stat!(call Op::ExtendDomain);

        let k0 = cache_key(Op::ExtendDomain, dd);
        stat!(cache_query Op::ExtendDomain);
        if let Some(hit) = self.cache.get3(k0, dom.raw(), new_dom.raw()) {
            stat!(cache_hit Op::ExtendDomain);
            return Ok(Edge::from_raw(hit));
        }

        let nd_node = self.table.node(new_dom.index());
        let nd_var = nd_node.var();
        let nd_next = nd_node.high();
        let nd_next_var = self.domain_var(nd_next);

        let result = if dom != Edge::TRUE && self.table.node(dom.index()).var() == nd_var {
            // A variable of the original domain: cofactor `dd` under it and
            // rebuild the node with the new domain's successor, which
            // re-materializes skip regions relative to `new_dom`.
            let dom_node = self.table.node(dom.index());
            let d_next = dom_node.high();
            let d_next_var = self.domain_var(d_next);

            let (dd_node, dd_var) = self.top(dd);
            debug_assert!(dd_var == NO_VAR || dd_var >= nd_var);
            let (dd0, dd1) = self.cofactors(dd, dd_node, dd_var, nd_var, d_next_var);

            let (low, high) = rayon::join(
                || self.extend_domain_rec(dd0, d_next, nd_next),
                || self.extend_domain_rec(dd1, d_next, nd_next),
            );
            self.mk_node(nd_var, low?, high?, nd_next_var)?
        } else {
            // A newly introduced variable: unconstrained, no node. The node
            // constructor inserts the stride that keeps it out of any
            // ZDD-skip region of the surrounding result.
            debug_assert!(dom == Edge::TRUE || self.table.node(dom.index()).var() > nd_var);
            self.extend_domain_rec(dd, dom, nd_next)?
        };

        self.cache.put3(k0, dom.raw(), new_dom.raw(), result.raw());
        Ok(result)
    }
}

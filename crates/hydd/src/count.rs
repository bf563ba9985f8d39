//! Model counting and node counting

use bitvec::vec::BitVec;
use hydd_core::{Edge, NO_VAR};

use crate::manager::Manager;
use crate::op::{stat, Op};

impl Manager {
    /// Number of assignments in `sat(dd, dom)`, as a double
    ///
    /// Every domain variable in a BDD-skip region doubles the count, every
    /// variable in a ZDD-skip region is forced to 0 and contributes a
    /// factor of one. Counts beyond 2⁵³ lose precision.
    pub fn sat_count(&self, dd: Edge, dom: Edge) -> f64 {
        self.in_pool(|| self.sat_count_rec(dd, dom))
    }

    fn sat_count_rec(&self, dd: Edge, mut dom: Edge) -> f64 {
        if dd == Edge::FALSE {
            return 0.0;
        }
        stat!(call Op::SatCount);

        let tag = dd.tag();
        if tag == NO_VAR {
            // no ZDD region at all: every remaining domain variable is free
            return (self.set_len(dom) as f64).exp2();
        }

        debug_assert!(dom != Edge::TRUE);
        let mut dom_node = self.table.node(dom.index());
        let mut dom_var = dom_node.var();

        // domain variables in front of the tag are BDD-skipped: ×2 each
        let mut skipped = 0;
        while tag != dom_var {
            skipped += 1;
            dom = dom_node.high();
            dom_node = self.table.node(dom.index());
            dom_var = dom_node.var();
        }

        if dd.without_tag() == Edge::TRUE {
            return (skipped as f64).exp2();
        }

        let dd_node = self.table.node(dd.index());
        let dd_var = dd_node.var();

        // variables inside the ZDD region are forced to 0: ×1 each
        while dd_var != dom_var {
            dom = dom_node.high();
            dom_node = self.table.node(dom.index());
            dom_var = dom_node.var();
        }

        let dom_next = dom_node.high();
        let (low, high) = rayon::join(
            || self.sat_count_rec(dd_node.low(), dom_next),
            || self.sat_count_rec(dd_node.high(), dom_next),
        );
        (low + high) * (skipped as f64).exp2()
    }

    /// Number of variables in a variable set / domain
    pub(crate) fn set_len(&self, mut dom: Edge) -> usize {
        let mut len = 0;
        while dom != Edge::TRUE {
            len += 1;
            dom = self.table.node(dom.index()).high();
        }
        len
    }

    /// Number of distinct nodes (branches and leaves, excluding the
    /// False/True sentinels) reachable from `roots`
    pub fn node_count(&self, roots: &[Edge]) -> usize {
        let mut visited = BitVec::<usize>::repeat(false, self.table.high_water() as usize);
        roots
            .iter()
            .map(|&root| self.node_count_rec(&mut visited, root))
            .sum()
    }

    fn node_count_rec(&self, visited: &mut BitVec, dd: Edge) -> usize {
        if dd.index() <= 1 || dd.is_invalid() {
            return 0;
        }
        if visited[dd.index() as usize] {
            return 0;
        }
        visited.set(dd.index() as usize, true);
        let node = self.table.node(dd.index());
        if node.is_leaf() {
            return 1;
        }
        1 + self.node_count_rec(visited, node.low()) + self.node_count_rec(visited, node.high())
    }
}

//! A minimal hash-consed multi-terminal decision diagram, used as the
//! reference implementation in the integration tests: conversions are
//! checked against it and set operations are cross-validated through it.

// Each integration test binary compiles this module separately and uses a
// different subset of it.
#![allow(dead_code)]

use hydd::{MtbddBuilder, MtbddSource};
use rustc_hash::FxHashMap;

/// Node reference: 0 = False, 1 = True, everything else indexes `nodes`
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Ref(usize);

pub const FALSE: Ref = Ref(0);
pub const TRUE: Ref = Ref(1);

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
enum MtNode {
    Leaf(u32, u64),
    Branch(u32, Ref, Ref),
}

/// Hash-consed multi-terminal BDD (no ZDD rule, no tags)
pub struct Mtbdd {
    nodes: Vec<MtNode>,
    unique: FxHashMap<MtNode, Ref>,
    ite_memo: FxHashMap<(Ref, Ref, Ref), Ref>,
}

impl Mtbdd {
    pub fn new() -> Self {
        Mtbdd {
            nodes: Vec::new(),
            unique: FxHashMap::default(),
            ite_memo: FxHashMap::default(),
        }
    }

    fn intern(&mut self, node: MtNode) -> Ref {
        if let Some(&r) = self.unique.get(&node) {
            return r;
        }
        let r = Ref(self.nodes.len() + 2);
        self.nodes.push(node);
        self.unique.insert(node, r);
        r
    }

    fn node(&self, r: Ref) -> MtNode {
        self.nodes[r.0 - 2]
    }

    pub fn branch(&mut self, var: u32, low: Ref, high: Ref) -> Ref {
        if low == high {
            return low;
        }
        self.intern(MtNode::Branch(var, low, high))
    }

    pub fn leaf(&mut self, leaf_type: u32, value: u64) -> Ref {
        self.intern(MtNode::Leaf(leaf_type, value))
    }

    /// Positive cofactor if `value`, else negative, with respect to `var`
    fn cofactor(&self, f: Ref, var: u32, value: bool) -> Ref {
        match f {
            FALSE | TRUE => f,
            _ => match self.node(f) {
                MtNode::Branch(v, low, high) if v == var => {
                    if value {
                        high
                    } else {
                        low
                    }
                }
                _ => f,
            },
        }
    }

    fn top_var(&self, f: Ref) -> Option<u32> {
        match f {
            FALSE | TRUE => None,
            _ => match self.node(f) {
                MtNode::Branch(v, ..) => Some(v),
                MtNode::Leaf(..) => None,
            },
        }
    }

    pub fn ite(&mut self, f: Ref, g: Ref, h: Ref) -> Ref {
        if f == TRUE {
            return g;
        }
        if f == FALSE {
            return h;
        }
        if g == h {
            return g;
        }
        if let Some(&r) = self.ite_memo.get(&(f, g, h)) {
            return r;
        }
        let var = [f, g, h]
            .iter()
            .filter_map(|&x| self.top_var(x))
            .min()
            .unwrap();
        let (f0, f1) = (self.cofactor(f, var, false), self.cofactor(f, var, true));
        let (g0, g1) = (self.cofactor(g, var, false), self.cofactor(g, var, true));
        let (h0, h1) = (self.cofactor(h, var, false), self.cofactor(h, var, true));
        let low = self.ite(f0, g0, h0);
        let high = self.ite(f1, g1, h1);
        let r = self.branch(var, low, high);
        self.ite_memo.insert((f, g, h), r);
        r
    }

    pub fn and(&mut self, a: Ref, b: Ref) -> Ref {
        self.ite(a, b, FALSE)
    }

    pub fn or(&mut self, a: Ref, b: Ref) -> Ref {
        self.ite(a, TRUE, b)
    }

    pub fn not(&mut self, a: Ref) -> Ref {
        self.ite(a, FALSE, TRUE)
    }

    /// Conjunction of positive literals (a domain for conversions)
    pub fn var_set(&mut self, vars: &[u32]) -> Ref {
        let mut res = TRUE;
        for &var in vars.iter().rev() {
            res = self.branch(var, FALSE, res);
        }
        res
    }

    /// One assignment over `vars`: values 0, 1 or 2 ("either")
    pub fn cube(&mut self, vars: &[u32], values: &[u8]) -> Ref {
        let mut res = TRUE;
        for (&var, &value) in vars.iter().zip(values).rev() {
            res = match value {
                0 => self.branch(var, res, FALSE),
                1 => self.branch(var, FALSE, res),
                _ => res,
            };
        }
        res
    }

    pub fn union_cube(&mut self, set: Ref, vars: &[u32], values: &[u8]) -> Ref {
        let cube = self.cube(vars, values);
        self.or(set, cube)
    }

    /// Existentially quantify `var`
    pub fn exists(&mut self, f: Ref, var: u32) -> Ref {
        let low = self.quantified_cofactor(f, var, false);
        let high = self.quantified_cofactor(f, var, true);
        self.or(low, high)
    }

    fn quantified_cofactor(&mut self, f: Ref, var: u32, value: bool) -> Ref {
        match f {
            FALSE | TRUE => f,
            _ => match self.node(f) {
                MtNode::Branch(v, low, high) if v == var => {
                    if value {
                        high
                    } else {
                        low
                    }
                }
                MtNode::Branch(v, low, high) if v < var => {
                    let l = self.quantified_cofactor(low, var, value);
                    let h = self.quantified_cofactor(high, var, value);
                    self.branch(v, l, h)
                }
                _ => f,
            },
        }
    }

    /// Number of satisfying assignments over the domain `vars`
    pub fn sat_count(&self, f: Ref, vars: &[u32]) -> f64 {
        match f {
            FALSE => 0.0,
            TRUE => (vars.len() as f64).exp2(),
            _ => match self.node(f) {
                MtNode::Branch(v, low, high) => {
                    let pos = vars
                        .iter()
                        .position(|&x| x == v)
                        .expect("node variable outside the domain");
                    let rest = &vars[pos + 1..];
                    (pos as f64).exp2() * (self.sat_count(low, rest) + self.sat_count(high, rest))
                }
                MtNode::Leaf(..) => panic!("sat_count over a non-Boolean diagram"),
            },
        }
    }
}

impl MtbddSource for Mtbdd {
    type Node = Ref;

    fn false_node(&self) -> Ref {
        FALSE
    }

    fn true_node(&self) -> Ref {
        TRUE
    }

    fn is_leaf(&self, node: Ref) -> bool {
        node == FALSE || node == TRUE || matches!(self.node(node), MtNode::Leaf(..))
    }

    fn var(&self, node: Ref) -> u32 {
        match self.node(node) {
            MtNode::Branch(v, ..) => v,
            MtNode::Leaf(..) => panic!("leaf has no variable"),
        }
    }

    fn low(&self, node: Ref) -> Ref {
        match self.node(node) {
            MtNode::Branch(_, low, _) => low,
            MtNode::Leaf(..) => panic!("leaf has no children"),
        }
    }

    fn high(&self, node: Ref) -> Ref {
        match self.node(node) {
            MtNode::Branch(_, _, high) => high,
            MtNode::Leaf(..) => panic!("leaf has no children"),
        }
    }

    fn leaf_type(&self, node: Ref) -> u32 {
        match self.node(node) {
            MtNode::Leaf(t, _) => t,
            MtNode::Branch(..) => panic!("branch has no leaf type"),
        }
    }

    fn leaf_value(&self, node: Ref) -> u64 {
        match self.node(node) {
            MtNode::Leaf(_, v) => v,
            MtNode::Branch(..) => panic!("branch has no leaf value"),
        }
    }
}

impl MtbddBuilder for Mtbdd {
    fn make_node(&mut self, var: u32, low: Ref, high: Ref) -> Ref {
        self.branch(var, low, high)
    }

    fn make_leaf(&mut self, leaf_type: u32, value: u64) -> Ref {
        self.leaf(leaf_type, value)
    }
}

//! Interface to an external multi-terminal decision diagram library
//!
//! The engine converts tagged diagrams from and to classical multi-terminal
//! diagrams (no ZDD rule, no tags) but does not implement one itself; it
//! only needs read access for the conversion into tagged form and node
//! construction for the conversion out of it.

use std::hash::Hash;

/// Read access to a multi-terminal decision diagram
///
/// Node references are plain copyable values (indices or pointers);
/// equality must be structural equality of the represented function, which
/// any hash-consed implementation gives for free.
pub trait MtbddSource {
    type Node: Copy + Eq + Hash;

    /// The False terminal
    fn false_node(&self) -> Self::Node;
    /// The True terminal
    fn true_node(&self) -> Self::Node;

    fn is_leaf(&self, node: Self::Node) -> bool;

    /// Decision variable of an inner node
    fn var(&self, node: Self::Node) -> u32;
    fn low(&self, node: Self::Node) -> Self::Node;
    fn high(&self, node: Self::Node) -> Self::Node;

    fn leaf_type(&self, node: Self::Node) -> u32;
    fn leaf_value(&self, node: Self::Node) -> u64;
}

/// Node construction in a multi-terminal decision diagram
///
/// `make_node` is expected to apply the BDD reduction rule (equal children
/// collapse) and hash-cons the result.
pub trait MtbddBuilder: MtbddSource {
    fn make_node(&mut self, var: u32, low: Self::Node, high: Self::Node) -> Self::Node;
    fn make_leaf(&mut self, leaf_type: u32, value: u64) -> Self::Node;
}

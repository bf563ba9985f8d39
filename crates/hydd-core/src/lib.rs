//! Shared building blocks for the hydd decision diagram engine
//!
//! Hybrid tagged decision diagrams combine the BDD and ZDD minimization
//! rules in one shared graph. Every edge carries a 20-bit tag naming the
//! first variable governed by the ZDD rule; variables before the tag follow
//! the BDD rule. This crate defines the edge encoding, the immutable
//! two-word node record stored in the unique table, the error types shared
//! across the workspace, and the interface to an external multi-terminal
//! decision diagram library.

mod edge;
mod error;
mod mt;
mod node;

pub use edge::{Edge, MAX_VAR, NO_VAR};
pub use error::{AllocResult, Error, OutOfMemory};
pub use mt::{MtbddBuilder, MtbddSource};
pub use node::{Node, MAX_NODE_INDEX};

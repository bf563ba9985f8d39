//! A concurrent hybrid tagged decision diagram engine
//!
//! Decision diagrams canonically represent Boolean functions over a totally
//! ordered set of variables (the *domain*). This crate fuses the two
//! classical minimization rules — the BDD rule (skip variables whose
//! cofactors are equal) and the ZDD rule (skip variables whose high
//! cofactor is False) — in a single shared graph: every edge carries a tag
//! naming the first variable at which ZDD-style skipping begins, so both
//! Boolean functions and sparse sets of assignments stay compact in one
//! structure.
//!
//! All state lives in a [`Manager`]: the shared hash-consed node table, the
//! lossy memoization cache, a fork-join worker pool for the parallel
//! operation kernels, the root-protection registry, and the per-thread
//! reference stacks scanned by the mark-and-sweep garbage collector.
//!
//! ```
//! use hydd::{Edge, Manager};
//!
//! let manager = Manager::new(1 << 16, 1 << 14, 2);
//! let dom = manager.var_set(&[0, 1, 2]).unwrap();
//! let a = manager.cube(dom, &[1, 0, 2]).unwrap();
//! let b = manager.cube(dom, &[1, 2, 0]).unwrap();
//! let both = manager.and(a, b, dom).unwrap();
//! assert_eq!(both, manager.cube(dom, &[1, 0, 0]).unwrap());
//! assert_eq!(manager.sat_count(both, dom), 1.0);
//! assert_ne!(both, Edge::FALSE);
//! ```
//!
//! ## Feature flags
#![doc = document_features::document_features!()]

mod apply;
mod convert;
mod count;
mod cube;
mod dot;
mod enumerate;
mod gc;
mod manager;
mod op;
mod quant;
mod rel;

pub use hydd_core::{
    AllocResult, Edge, Error, MtbddBuilder, MtbddSource, Node, OutOfMemory, MAX_VAR, NO_VAR,
};

pub use gc::EdgeCell;
pub use manager::Manager;
#[cfg(feature = "statistics")]
pub use op::print_stats;

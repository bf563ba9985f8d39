//! Error types shared across the workspace

use thiserror::Error;

/// The unique table could not accommodate a node
///
/// Kernels propagate this with `?`; the operation wrapper turns a repeat
/// failure (after a collection) into [`Error::UniqueTableFull`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct OutOfMemory;

/// Result of any computation that may intern nodes
pub type AllocResult<T> = Result<T, OutOfMemory>;

impl From<Error> for OutOfMemory {
    /// Re-entrant engine calls (operations invoked from enumeration
    /// callbacks) report [`Error::UniqueTableFull`]; converting back lets
    /// the callback propagate it with `?` into the enclosing operation's
    /// collect-and-retry loop.
    fn from(_: Error) -> Self {
        OutOfMemory
    }
}

/// Errors reported by the public operation surface
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum Error {
    /// The unique table is full even after a forced collection
    #[error("unique table full, {filled} of {capacity} buckets filled")]
    UniqueTableFull { filled: usize, capacity: usize },
}

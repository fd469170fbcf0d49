//! Scalar index types shared across the crate.

/// Global identifier of a coarse tree, stable across partitions.
pub type GlobalTreeId = i64;

/// Tree index relative to the first tree of a process.
pub type LocalTreeId = i64;

/// Global or in-tree index of a refined child element.
pub type ChildId = i64;

/// Linear index of a refined element within its tree at a given level.
pub type LinearId = u64;

/// Refinement level of an element.
pub type Level = u32;

/// Rank of a process in a communicator.
pub type Rank = i32;

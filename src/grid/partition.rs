//! Uniform partition of refined children across processes.

use crate::grid::CoarseMesh;
use crate::reference_cell::ReferenceCellType;
use crate::types::{ChildId, GlobalTreeId, Level};

/// The contiguous range of refined children assigned to one rank, expressed
/// as (tree id, offset within that tree's children) bounds.
///
/// The range starts at child `child_in_tree_begin` of `first_local_tree` and
/// ends before child `child_in_tree_end` of `last_local_tree`. An empty rank
/// has `last_local_tree == first_local_tree`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformPartition {
    /// Global id of the first tree with children on this rank.
    pub first_local_tree: GlobalTreeId,
    /// Offset of the first child within `first_local_tree`.
    pub child_in_tree_begin: ChildId,
    /// Global id of the last tree with children on this rank.
    pub last_local_tree: GlobalTreeId,
    /// End offset of the child range within `last_local_tree`.
    pub child_in_tree_end: ChildId,
}

/// Split the level-`level` children of every tree evenly across the ranks of
/// the mesh communicator and return this rank's share.
///
/// Every tree is assumed to refine into `2^(dimension * level)` children, so
/// pyramidal trees are refused. Each rank computes the same global child
/// boundaries from `(num_trees, dimension, level, mpi_size)` alone; the
/// boundary arithmetic is widened to 128 bits so the products cannot
/// overflow.
pub fn uniform_bounds(cmesh: &CoarseMesh, level: Level) -> UniformPartition {
    if cmesh.num_trees_of_class(ReferenceCellType::Pyramid) != 0 {
        panic!("uniform partition does not support pyramidal elements");
    }

    let shift = cmesh.dimension() as u32 * level;
    assert!(shift < 63, "level {level} overflows the child index range");
    let children_per_tree = 1i64 << shift;
    let global_num_children = cmesh.num_trees() as i128 * children_per_tree as i128;

    let rank = cmesh.mpi_rank() as i128;
    let size = cmesh.mpi_size() as i128;

    let first_global_child = if rank == 0 {
        0
    } else {
        global_num_children * rank / size
    };
    let last_global_child = if rank == size - 1 {
        global_num_children
    } else {
        global_num_children * (rank + 1) / size
    };
    debug_assert!(0 <= first_global_child && first_global_child <= global_num_children);
    debug_assert!(first_global_child <= last_global_child);

    let first_global_child = first_global_child as i64;
    let last_global_child = last_global_child as i64;

    let first_local_tree = first_global_child / children_per_tree;
    let child_in_tree_begin = first_global_child - first_local_tree * children_per_tree;

    if first_global_child < last_global_child {
        let last_local_tree = (last_global_child - 1) / children_per_tree;
        UniformPartition {
            first_local_tree,
            child_in_tree_begin,
            last_local_tree,
            child_in_tree_end: last_global_child - last_local_tree * children_per_tree,
        }
    } else {
        // empty rank
        UniformPartition {
            first_local_tree,
            child_in_tree_begin,
            last_local_tree: first_local_tree,
            child_in_tree_end: last_global_child,
        }
    }
}

//! Coarse mesh builder.
//!
//! The builder is the uncommitted half of the mesh lifecycle: trees, face
//! joins and the communicator are entered here, and [`CoarseMeshBuilder::commit`]
//! freezes them into a [`CoarseMesh`]. Contract violations panic; there is no
//! recoverable error in this layer.

use std::sync::Arc;

use fxhash::FxHashMap;

use crate::grid::coarse_mesh::{CoarseGhost, CoarseMesh, CoarseTree, CommHandle, FaceLink};
use crate::reference_cell::{self, ReferenceCellType};
use crate::traits::Transport;
use crate::types::GlobalTreeId;

/// Builder for a [`CoarseMesh`].
///
/// Entry order: communicator, then partition layout (optional), then tree
/// count, then trees and face joins, then commit. `commit` is collective over
/// the communicator.
pub struct CoarseMeshBuilder {
    comm: Option<Arc<dyn Transport>>,
    do_dup: bool,
    dimension: i32,
    partitioned: bool,
    num_trees: GlobalTreeId,
    num_local_trees: GlobalTreeId,
    num_ghosts: GlobalTreeId,
    first_tree: GlobalTreeId,
    trees: Option<Vec<Option<CoarseTree>>>,
    ghosts: Vec<Option<CoarseGhost>>,
    tree_offsets: Option<Vec<GlobalTreeId>>,
    num_trees_per_class: [i64; reference_cell::CELL_TYPE_COUNT],
}

impl CoarseMeshBuilder {
    /// Create an empty builder with no communicator and unset dimension.
    pub fn new() -> Self {
        Self {
            comm: None,
            do_dup: false,
            dimension: -1,
            partitioned: false,
            num_trees: 0,
            num_local_trees: 0,
            num_ghosts: 0,
            first_tree: 0,
            trees: None,
            ghosts: Vec::new(),
            tree_offsets: None,
            num_trees_per_class: [0; reference_cell::CELL_TYPE_COUNT],
        }
    }

    /// Attach the communicator the mesh will be committed on.
    ///
    /// With `do_dup` the communicator is duplicated at commit and the mesh
    /// owns the duplicate; otherwise the mesh shares the caller's handle.
    pub fn set_mpicomm(&mut self, comm: Arc<dyn Transport>, do_dup: bool) {
        assert!(self.comm.is_none(), "communicator is already set");
        self.comm = Some(comm);
        self.do_dup = do_dup;
    }

    /// Declare the partition layout of the mesh.
    ///
    /// With `partitioned = false` this is equivalent to
    /// [`CoarseMeshBuilder::set_num_trees`] with `num_global_trees`, and
    /// `first_local_tree` and `num_ghosts` are ignored. Otherwise it records
    /// the global tree count, this process's first tree and its ghost count;
    /// the local tree count follows in `set_num_trees`.
    pub fn set_partitioned(
        &mut self,
        partitioned: bool,
        num_global_trees: GlobalTreeId,
        first_local_tree: GlobalTreeId,
        num_ghosts: GlobalTreeId,
    ) {
        assert!(!self.partitioned, "partition layout is already set");
        assert!(
            self.num_trees == 0 && self.trees.is_none() && self.first_tree == 0,
            "partition layout must be declared before any trees"
        );

        if !partitioned {
            self.set_num_trees(num_global_trees);
            return;
        }
        assert!(num_global_trees > 0, "a partitioned mesh needs trees");
        assert!(0 <= first_local_tree && first_local_tree <= num_global_trees);
        assert!(num_ghosts >= 0);
        self.partitioned = true;
        self.num_trees = num_global_trees;
        self.first_tree = first_local_tree;
        self.num_ghosts = num_ghosts;
        self.ghosts = vec![None; num_ghosts as usize];
    }

    /// Set the number of trees and allocate their slots.
    ///
    /// For a partitioned mesh this is the local tree count (0 allowed) and
    /// the global count must already have been declared; for a replicated
    /// mesh it is the global count and must be positive.
    pub fn set_num_trees(&mut self, num_trees: GlobalTreeId) {
        assert!(self.trees.is_none(), "number of trees is already set");

        if self.partitioned {
            assert!(self.num_trees > 0);
            assert!(num_trees >= 0);
            assert!(
                self.first_tree + num_trees <= self.num_trees,
                "local tree range [{}, {}) exceeds the global count {}",
                self.first_tree,
                self.first_tree + num_trees,
                self.num_trees
            );
            self.num_local_trees = num_trees;
        } else {
            assert!(num_trees > 0, "a replicated mesh needs at least one tree");
            assert!(self.num_trees == 0);
            self.num_trees = num_trees;
            self.num_local_trees = num_trees;
        }
        self.trees = Some(vec![None; self.num_local_trees as usize]);
    }

    /// Record the per-rank first-tree table of a partitioned mesh.
    ///
    /// `offsets[r]` is the global id of rank `r`'s first tree and the final
    /// entry is the global tree count; the length is checked against the
    /// communicator size at commit.
    pub fn set_tree_offsets(&mut self, offsets: Vec<GlobalTreeId>) {
        assert!(self.partitioned, "tree offsets only apply to a partitioned mesh");
        assert!(self.tree_offsets.is_none(), "tree offsets are already set");
        assert_eq!(
            *offsets.last().expect("tree offsets cannot be empty"),
            self.num_trees,
            "tree offsets must end at the global tree count"
        );
        self.tree_offsets = Some(offsets);
    }

    fn tree_id_is_valid(&self, tree_id: GlobalTreeId) -> bool {
        if self.partitioned {
            self.first_tree <= tree_id && tree_id < self.first_tree + self.num_local_trees
        } else {
            0 <= tree_id && tree_id < self.num_trees
        }
    }

    fn tree_index(&self, tree_id: GlobalTreeId) -> usize {
        debug_assert!(self.tree_id_is_valid(tree_id));
        if self.partitioned {
            (tree_id - self.first_tree) as usize
        } else {
            tree_id as usize
        }
    }

    fn check_dimension(&mut self, eclass: ReferenceCellType) {
        // the first inserted cell fixes the mesh dimension
        if self.dimension == -1 {
            self.dimension = reference_cell::dim(eclass);
        } else {
            assert_eq!(
                reference_cell::dim(eclass),
                self.dimension,
                "cell class {eclass:?} does not match the mesh dimension {}",
                self.dimension
            );
        }
    }

    /// Insert the tree with global id `tree_id` as a cell of class `eclass`.
    ///
    /// All face links start out unset.
    pub fn set_tree(&mut self, tree_id: GlobalTreeId, eclass: ReferenceCellType) {
        assert!(self.trees.is_some(), "set_num_trees must come first");
        assert!(
            self.tree_id_is_valid(tree_id),
            "tree {tree_id} is not in this process's range"
        );
        self.check_dimension(eclass);
        self.num_trees_per_class[eclass as usize] += 1;

        let index = self.tree_index(tree_id);
        let slot = &mut self.trees.as_mut().unwrap()[index];
        assert!(slot.is_none(), "tree {tree_id} is already set");
        *slot = Some(CoarseTree {
            tree_id,
            eclass,
            face_neighbors: vec![None; reference_cell::num_faces(eclass)],
        });
    }

    /// Declare the `ghost_index`-th ghost tree of a partitioned mesh.
    pub fn set_ghost(
        &mut self,
        ghost_index: usize,
        global_id: GlobalTreeId,
        eclass: ReferenceCellType,
    ) {
        assert!(self.partitioned, "ghost trees only apply to a partitioned mesh");
        assert!(
            ghost_index < self.ghosts.len(),
            "ghost index {ghost_index} exceeds the declared count {}",
            self.ghosts.len()
        );
        assert!(
            !self.tree_id_is_valid(global_id),
            "tree {global_id} is local, not a ghost"
        );
        self.check_dimension(eclass);
        let slot = &mut self.ghosts[ghost_index];
        assert!(slot.is_none(), "ghost {ghost_index} is already set");
        *slot = Some(CoarseGhost { global_id, eclass });
    }

    /// Cell class of `tree_id` if it is addressable on this process, either
    /// as a local tree or a declared ghost.
    fn addressable_class(&self, tree_id: GlobalTreeId) -> Option<ReferenceCellType> {
        if self.tree_id_is_valid(tree_id) {
            return self.trees.as_ref()?[self.tree_index(tree_id)]
                .as_ref()
                .map(|t| t.eclass);
        }
        self.ghosts
            .iter()
            .flatten()
            .find(|g| g.global_id == tree_id)
            .map(|g| g.eclass)
    }

    /// Join face `face1` of `tree1` with face `face2` of `tree2`.
    ///
    /// At least one of the trees must be local; both must be addressable so
    /// the face shapes can be checked. `orientation` is a corner rotation of
    /// the shared face shape. Each local side records a [`FaceLink`] to the
    /// other.
    pub fn join_faces(
        &mut self,
        tree1: GlobalTreeId,
        tree2: GlobalTreeId,
        face1: usize,
        face2: usize,
        orientation: usize,
    ) {
        assert!(
            self.tree_id_is_valid(tree1) || self.tree_id_is_valid(tree2),
            "neither tree {tree1} nor tree {tree2} is local"
        );
        let class1 = self
            .addressable_class(tree1)
            .unwrap_or_else(|| panic!("tree {tree1} is not addressable on this process"));
        let class2 = self
            .addressable_class(tree2)
            .unwrap_or_else(|| panic!("tree {tree2} is not addressable on this process"));

        assert!(face1 < reference_cell::num_faces(class1));
        assert!(face2 < reference_cell::num_faces(class2));
        let face_shape = reference_cell::face_cell_types(class1)[face1];
        assert_eq!(
            face_shape,
            reference_cell::face_cell_types(class2)[face2],
            "cannot join faces of different shapes"
        );
        assert!(
            orientation < reference_cell::corner_count(face_shape),
            "orientation {orientation} is invalid for a {face_shape:?} face"
        );

        let max_faces = reference_cell::max_faces_per_dim(self.dimension);
        let mut link = |from: GlobalTreeId, face: usize, to: GlobalTreeId,
                        to_class: ReferenceCellType, to_face: usize| {
            if !self.tree_id_is_valid(from) {
                return;
            }
            let index = self.tree_index(from);
            let tree = self.trees.as_mut().unwrap()[index]
                .as_mut()
                .unwrap_or_else(|| panic!("tree {from} was never set"));
            let slot = &mut tree.face_neighbors[face];
            assert!(slot.is_none(), "face {face} of tree {from} is already joined");
            *slot = Some(FaceLink {
                tree: to,
                eclass: to_class,
                tree_to_face: (orientation * max_faces + to_face) as i8,
            });
        };
        link(tree1, face1, tree2, class2, face2);
        link(tree2, face2, tree1, class1, face1);
    }

    /// Commit the mesh: duplicate the communicator if requested, query rank
    /// and size, check every declared slot was filled and freeze.
    ///
    /// Collective over the communicator.
    pub fn commit(self) -> CoarseMesh {
        let comm = self.comm.expect("no communicator set before commit");
        assert!(self.num_trees > 0, "cannot commit an empty mesh");

        let comm = if self.do_dup {
            CommHandle::Owned(comm.duplicate())
        } else {
            CommHandle::Shared(comm)
        };
        let mpi_rank = comm.get().rank();
        let mpi_size = comm.get().size();

        let first_tree = self.first_tree;
        let trees: Vec<CoarseTree> = self
            .trees
            .expect("set_num_trees was never called")
            .into_iter()
            .enumerate()
            .map(|(i, slot)| {
                slot.unwrap_or_else(|| panic!("tree {} was never set", first_tree + i as GlobalTreeId))
            })
            .collect();
        let ghosts: Vec<CoarseGhost> = self
            .ghosts
            .into_iter()
            .enumerate()
            .map(|(i, slot)| slot.unwrap_or_else(|| panic!("ghost {i} was never set")))
            .collect();
        let ghost_index_by_id: FxHashMap<GlobalTreeId, usize> = ghosts
            .iter()
            .enumerate()
            .map(|(i, g)| (g.global_id, i))
            .collect();

        if let Some(offsets) = &self.tree_offsets {
            assert_eq!(
                offsets.len(),
                mpi_size as usize + 1,
                "tree offsets must have one entry per rank plus the closing count"
            );
            assert_eq!(
                offsets[mpi_rank as usize], first_tree,
                "tree offsets disagree with this rank's first tree"
            );
        }

        CoarseMesh {
            dimension: self.dimension,
            partitioned: self.partitioned,
            comm,
            mpi_rank,
            mpi_size,
            num_trees: self.num_trees,
            num_local_trees: self.num_local_trees,
            num_ghosts: self.num_ghosts,
            first_tree,
            trees,
            ghosts,
            ghost_index_by_id,
            tree_offsets: self.tree_offsets,
            num_trees_per_class: self.num_trees_per_class,
        }
    }
}

impl Default for CoarseMeshBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::traits::SerialComm;

    fn serial() -> Arc<dyn Transport> {
        Arc::new(SerialComm)
    }

    #[test]
    fn test_single_triangle_mesh() {
        let mut builder = CoarseMeshBuilder::new();
        builder.set_mpicomm(serial(), false);
        builder.set_num_trees(1);
        builder.set_tree(0, ReferenceCellType::Triangle);
        let cmesh = builder.commit();

        assert_eq!(cmesh.dimension(), 2);
        assert_eq!(cmesh.num_trees(), 1);
        assert_eq!(cmesh.num_local_trees(), 1);
        assert_eq!(cmesh.num_trees_of_class(ReferenceCellType::Triangle), 1);
        assert_eq!(cmesh.tree_class(0), ReferenceCellType::Triangle);
    }

    #[test]
    fn test_replicated_set_partitioned_is_set_num_trees() {
        let mut builder = CoarseMeshBuilder::new();
        builder.set_mpicomm(serial(), false);
        builder.set_partitioned(false, 4, 99, 99);
        for i in 0..4 {
            builder.set_tree(i, ReferenceCellType::Quadrilateral);
        }
        let cmesh = builder.commit();
        assert!(!cmesh.is_partitioned());
        assert_eq!(cmesh.num_trees(), 4);
        assert_eq!(cmesh.num_local_trees(), 4);
        assert_eq!(cmesh.first_treeid(), 0);
    }

    #[test]
    fn test_commit_without_dup_shares_the_handle() {
        let comm: Arc<dyn Transport> = Arc::new(SerialComm);
        let mut builder = CoarseMeshBuilder::new();
        builder.set_mpicomm(Arc::clone(&comm), false);
        builder.set_num_trees(1);
        builder.set_tree(0, ReferenceCellType::Interval);
        let cmesh = builder.commit();
        // the caller's handle is untouched and still shared with the mesh
        assert_eq!(Arc::strong_count(&comm), 2);
        assert_eq!(cmesh.mpi_rank(), 0);
        assert_eq!(cmesh.mpi_size(), 1);
    }

    #[test]
    fn test_commit_with_dup_owns_a_duplicate() {
        let comm: Arc<dyn Transport> = Arc::new(SerialComm);
        let mut builder = CoarseMeshBuilder::new();
        builder.set_mpicomm(Arc::clone(&comm), true);
        builder.set_num_trees(1);
        builder.set_tree(0, ReferenceCellType::Interval);
        let cmesh = builder.commit();
        // the duplicate replaced the shared handle
        assert_eq!(Arc::strong_count(&comm), 1);
        assert_eq!(cmesh.mpi_rank(), 0);
    }

    #[test]
    fn test_join_faces_links_both_sides() {
        let mut builder = CoarseMeshBuilder::new();
        builder.set_mpicomm(serial(), false);
        builder.set_num_trees(2);
        builder.set_tree(0, ReferenceCellType::Triangle);
        builder.set_tree(1, ReferenceCellType::Triangle);
        builder.join_faces(0, 1, 1, 2, 0);
        let cmesh = builder.commit();

        let link01 = cmesh.tree(0).face_neighbors()[1].unwrap();
        assert_eq!(link01.tree, 1);
        assert_eq!(link01.eclass, ReferenceCellType::Triangle);
        assert_eq!(link01.neighbor_face(2), 2);
        assert_eq!(link01.orientation(2), 0);

        let link10 = cmesh.tree(1).face_neighbors()[2].unwrap();
        assert_eq!(link10.tree, 0);
        assert_eq!(link10.neighbor_face(2), 1);

        // the remaining faces stay on the boundary
        assert!(cmesh.tree(0).face_neighbors()[0].is_none());
        assert!(cmesh.tree(1).face_neighbors()[0].is_none());
    }

    #[test]
    #[should_panic(expected = "different shapes")]
    fn test_join_faces_rejects_shape_mismatch() {
        let mut builder = CoarseMeshBuilder::new();
        builder.set_mpicomm(serial(), false);
        builder.set_num_trees(2);
        builder.set_tree(0, ReferenceCellType::Tetrahedron);
        builder.set_tree(1, ReferenceCellType::Prism);
        // a triangle face cannot meet a quadrilateral face
        builder.join_faces(0, 1, 0, 0, 0);
    }

    #[test]
    #[should_panic(expected = "does not match the mesh dimension")]
    fn test_mixed_dimension_is_rejected() {
        let mut builder = CoarseMeshBuilder::new();
        builder.set_mpicomm(serial(), false);
        builder.set_num_trees(2);
        builder.set_tree(0, ReferenceCellType::Triangle);
        builder.set_tree(1, ReferenceCellType::Tetrahedron);
    }

    #[test]
    #[should_panic(expected = "already set")]
    fn test_set_num_trees_twice_is_rejected() {
        let mut builder = CoarseMeshBuilder::new();
        builder.set_mpicomm(serial(), false);
        builder.set_num_trees(1);
        builder.set_num_trees(1);
    }

    #[test]
    #[should_panic(expected = "not in this process's range")]
    fn test_set_tree_outside_range_is_rejected() {
        let mut builder = CoarseMeshBuilder::new();
        builder.set_mpicomm(serial(), false);
        builder.set_num_trees(1);
        builder.set_tree(1, ReferenceCellType::Interval);
    }

    #[test]
    #[should_panic(expected = "was never set")]
    fn test_commit_with_missing_tree_is_rejected() {
        let mut builder = CoarseMeshBuilder::new();
        builder.set_mpicomm(serial(), false);
        builder.set_num_trees(2);
        builder.set_tree(0, ReferenceCellType::Interval);
        builder.commit();
    }

    #[test]
    #[should_panic(expected = "no communicator")]
    fn test_commit_without_comm_is_rejected() {
        let mut builder = CoarseMeshBuilder::new();
        builder.set_num_trees(1);
        builder.set_tree(0, ReferenceCellType::Interval);
        builder.commit();
    }
}

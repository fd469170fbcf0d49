//! Committed coarse mesh and its accessors.

use fxhash::FxHashMap;

use crate::reference_cell::{self, ReferenceCellType};
use crate::traits::Transport;
use crate::types::{GlobalTreeId, Rank};

/// A face-to-face link between two coarse trees.
///
/// The `tree_to_face` code packs the neighbor's face index and the
/// orientation of the identification as
/// `orientation * max_faces_per_dim(dim) + neighbor_face`, where `dim` is the
/// mesh dimension and the orientation is a corner rotation of the shared face
/// shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceLink {
    /// Global id of the neighbor tree.
    pub tree: GlobalTreeId,
    /// Cell class of the neighbor tree.
    pub eclass: ReferenceCellType,
    /// Packed neighbor face index and orientation.
    pub tree_to_face: i8,
}

impl FaceLink {
    /// The neighbor's face index behind this link.
    pub fn neighbor_face(&self, dim: i32) -> usize {
        self.tree_to_face as usize % reference_cell::max_faces_per_dim(dim)
    }

    /// The orientation of the face identification.
    pub fn orientation(&self, dim: i32) -> usize {
        self.tree_to_face as usize / reference_cell::max_faces_per_dim(dim)
    }
}

/// One reference cell of the coarse mesh.
#[derive(Debug, Clone)]
pub struct CoarseTree {
    /// Global id, stable across partitions.
    pub tree_id: GlobalTreeId,
    /// Cell class.
    pub eclass: ReferenceCellType,
    pub(crate) face_neighbors: Vec<Option<FaceLink>>,
}

impl CoarseTree {
    /// Face links of this tree, indexed by face; `None` marks a face on the
    /// domain boundary or one not yet joined.
    pub fn face_neighbors(&self) -> &[Option<FaceLink>] {
        &self.face_neighbors
    }
}

/// A coarse tree owned by another process but face-adjacent to this one.
#[derive(Debug, Clone, Copy)]
pub struct CoarseGhost {
    /// Global id of the tree.
    pub global_id: GlobalTreeId,
    /// Cell class.
    pub eclass: ReferenceCellType,
}

/// Communicator attachment of a committed mesh.
///
/// `Shared` borrows the caller's handle through shared ownership; `Owned`
/// holds a duplicate released when the mesh is dropped.
pub(crate) enum CommHandle {
    Shared(std::sync::Arc<dyn Transport>),
    Owned(Box<dyn Transport>),
}

impl CommHandle {
    pub(crate) fn get(&self) -> &dyn Transport {
        match self {
            CommHandle::Shared(comm) => comm.as_ref(),
            CommHandle::Owned(comm) => comm.as_ref(),
        }
    }
}

/// A committed coarse mesh: a connectivity graph of reference cells
/// ("trees"), possibly split across the processes of a communicator.
///
/// Built through [`crate::grid::CoarseMeshBuilder`]; once committed the mesh
/// is immutable.
pub struct CoarseMesh {
    pub(crate) dimension: i32,
    pub(crate) partitioned: bool,
    pub(crate) comm: CommHandle,
    pub(crate) mpi_rank: Rank,
    pub(crate) mpi_size: Rank,
    pub(crate) num_trees: GlobalTreeId,
    pub(crate) num_local_trees: GlobalTreeId,
    pub(crate) num_ghosts: GlobalTreeId,
    pub(crate) first_tree: GlobalTreeId,
    pub(crate) trees: Vec<CoarseTree>,
    pub(crate) ghosts: Vec<CoarseGhost>,
    pub(crate) ghost_index_by_id: FxHashMap<GlobalTreeId, usize>,
    pub(crate) tree_offsets: Option<Vec<GlobalTreeId>>,
    pub(crate) num_trees_per_class: [i64; reference_cell::CELL_TYPE_COUNT],
}

impl CoarseMesh {
    /// Dimension shared by every tree of the mesh.
    pub fn dimension(&self) -> i32 {
        self.dimension
    }

    /// Whether the trees are split across processes.
    pub fn is_partitioned(&self) -> bool {
        self.partitioned
    }

    /// Global number of trees.
    pub fn num_trees(&self) -> GlobalTreeId {
        self.num_trees
    }

    /// Number of trees on this process; equals [`CoarseMesh::num_trees`] when
    /// the mesh is replicated.
    pub fn num_local_trees(&self) -> GlobalTreeId {
        if self.partitioned {
            self.num_local_trees
        } else {
            self.num_trees
        }
    }

    /// Number of neighbor trees owned by other processes.
    pub fn num_ghosts(&self) -> GlobalTreeId {
        self.num_ghosts
    }

    /// Global id of the first tree on this process; 0 when replicated.
    pub fn first_treeid(&self) -> GlobalTreeId {
        self.first_tree
    }

    /// Rank of this process on the mesh communicator.
    pub fn mpi_rank(&self) -> Rank {
        self.mpi_rank
    }

    /// Size of the mesh communicator.
    pub fn mpi_size(&self) -> Rank {
        self.mpi_size
    }

    /// The communicator the mesh was committed on.
    pub fn comm(&self) -> &dyn Transport {
        self.comm.get()
    }

    /// Number of trees of class `eclass` inserted on this process.
    pub fn num_trees_of_class(&self, eclass: ReferenceCellType) -> i64 {
        self.num_trees_per_class[eclass as usize]
    }

    /// Per-rank first-tree table of length `mpi_size + 1`, present only when
    /// the mesh is partitioned and the builder supplied it.
    pub fn tree_offsets(&self) -> Option<&[GlobalTreeId]> {
        self.tree_offsets.as_deref()
    }

    /// Whether `tree_id` addresses a tree stored on this process.
    pub fn tree_id_is_valid(&self, tree_id: GlobalTreeId) -> bool {
        if self.partitioned {
            self.first_tree <= tree_id && tree_id < self.first_tree + self.num_local_trees
        } else {
            0 <= tree_id && tree_id < self.num_trees
        }
    }

    /// Index of `tree_id` in this process's tree storage.
    pub fn tree_index(&self, tree_id: GlobalTreeId) -> usize {
        assert!(
            self.tree_id_is_valid(tree_id),
            "tree {tree_id} is not local to rank {}",
            self.mpi_rank
        );
        if self.partitioned {
            (tree_id - self.first_tree) as usize
        } else {
            tree_id as usize
        }
    }

    /// The local tree with global id `tree_id`.
    pub fn tree(&self, tree_id: GlobalTreeId) -> &CoarseTree {
        &self.trees[self.tree_index(tree_id)]
    }

    /// Cell class of the local tree with global id `tree_id`.
    pub fn tree_class(&self, tree_id: GlobalTreeId) -> ReferenceCellType {
        self.tree(tree_id).eclass
    }

    /// Cell class of the `ghost_index`-th ghost tree.
    pub fn ghost_class(&self, ghost_index: usize) -> ReferenceCellType {
        self.ghosts[ghost_index].eclass
    }

    /// Index into the ghost storage of the ghost tree with global id
    /// `tree_id`, `None` if that tree is not a ghost of this process.
    pub fn ghost_index_of(&self, tree_id: GlobalTreeId) -> Option<usize> {
        self.ghost_index_by_id.get(&tree_id).copied()
    }
}

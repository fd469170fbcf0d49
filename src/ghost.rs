//! One layer of ghost elements for a partitioned forest.
//!
//! Follows the ghost construction of Burstedde, Wilcox and Ghattas,
//! "Scalable algorithms for parallel adaptive mesh refinement on forests of
//! octrees". Construction runs in two phases: ghost-tree discovery walks the
//! coarse face links to find the trees through which this process touches
//! other processes, then remote-element discovery builds every element's
//! half-face neighbors and asks the forest which rank owns them. The result
//! is a pair of tables: ghost trees (indexed by global id) and, per remote
//! rank, the local elements that rank needs. Sending the latter and filling
//! the former belongs to a transport layer on top.

use std::collections::hash_map::Entry;

use fxhash::FxHashMap;
use itertools::Itertools;
use log::debug;

use crate::reference_cell::ReferenceCellType;
use crate::traits::ForestView;
use crate::types::{GlobalTreeId, LocalTreeId, Rank};

/// A tree owned by another process whose elements this process must track.
#[derive(Debug, Clone)]
pub struct GhostTree<E> {
    global_id: GlobalTreeId,
    eclass: ReferenceCellType,
    elements: Vec<E>,
}

impl<E> GhostTree<E> {
    /// Global id of the tree.
    pub fn global_id(&self) -> GlobalTreeId {
        self.global_id
    }

    /// Cell class of the tree.
    pub fn eclass(&self) -> ReferenceCellType {
        self.eclass
    }

    /// Ghost elements of this tree in scheme linear order, deduplicated.
    ///
    /// Empty until the exchange layer fills it.
    pub fn elements(&self) -> &[E] {
        &self.elements
    }
}

/// One of this process's trees as seen by a specific remote rank.
#[derive(Debug, Clone)]
pub struct RemoteTree<E> {
    global_id: GlobalTreeId,
    eclass: ReferenceCellType,
    elements: Vec<E>,
}

impl<E> RemoteTree<E> {
    fn new(global_id: GlobalTreeId, eclass: ReferenceCellType) -> Self {
        Self {
            global_id,
            eclass,
            elements: Vec::new(),
        }
    }

    /// Global id of the tree.
    pub fn global_id(&self) -> GlobalTreeId {
        self.global_id
    }

    /// Cell class of the tree.
    pub fn eclass(&self) -> ReferenceCellType {
        self.eclass
    }

    /// The local elements the remote rank needs, in scheme linear order,
    /// deduplicated.
    pub fn elements(&self) -> &[E] {
        &self.elements
    }
}

/// The trees and elements one remote rank needs from this process.
#[derive(Debug, Clone)]
pub struct RemoteEntry<E> {
    remote_rank: Rank,
    remote_trees: Vec<RemoteTree<E>>,
}

impl<E> RemoteEntry<E> {
    /// The rank this entry belongs to.
    pub fn remote_rank(&self) -> Rank {
        self.remote_rank
    }

    /// The remote trees in local-tree-id order.
    pub fn remote_trees(&self) -> &[RemoteTree<E>] {
        &self.remote_trees
    }
}

/// Where one rank's contribution starts inside the ghost tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessOffset {
    /// Index of the rank's first ghost tree in the ghost-tree table.
    pub tree_index: usize,
    /// Index of the rank's first element inside that tree's elements.
    pub first_element: usize,
}

/// One layer of inter-process halo for a committed forest.
///
/// Immutable once built. `ghost_trees` is sorted ascending by global id and
/// `global_tree_to_ghost_tree` indexes into it; `remote_ghosts` holds, per
/// remote rank, the local elements that rank needs. `processes` and
/// `process_offsets` locate the incoming contributions and are filled by the
/// exchange layer.
pub struct GhostLayer<E> {
    ghost_trees: Vec<GhostTree<E>>,
    global_tree_to_ghost_tree: FxHashMap<GlobalTreeId, usize>,
    process_offsets: FxHashMap<Rank, ProcessOffset>,
    processes: Vec<Rank>,
    remote_ghosts: FxHashMap<Rank, RemoteEntry<E>>,
    remote_processes: Vec<Rank>,
}

impl<E: Clone> GhostLayer<E> {
    /// Build the ghost layer of `forest`.
    ///
    /// Collective: every rank of the forest's communicator must call this, as
    /// owner lookups rely on globally consistent partition data.
    pub fn build<F>(forest: &F) -> Self
    where
        F: ForestView<Element = E>,
    {
        let mut builder = GhostBuilder::new(forest);
        builder.fill_ghost_tree_array();
        builder.remote_discovery();
        builder.freeze()
    }
}

impl<E> GhostLayer<E> {
    /// Number of ghost trees.
    pub fn num_ghost_trees(&self) -> usize {
        self.ghost_trees.len()
    }

    /// The ghost trees, sorted ascending by global id.
    pub fn ghost_trees(&self) -> &[GhostTree<E>] {
        &self.ghost_trees
    }

    /// Index of the ghost tree with global id `gtreeid`, `None` if that tree
    /// is not tracked.
    pub fn ghost_tree_index(&self, gtreeid: GlobalTreeId) -> Option<usize> {
        self.global_tree_to_ghost_tree.get(&gtreeid).copied()
    }

    /// The ghost tree with global id `gtreeid`.
    pub fn ghost_tree_by_id(&self, gtreeid: GlobalTreeId) -> Option<&GhostTree<E>> {
        self.ghost_tree_index(gtreeid).map(|i| &self.ghost_trees[i])
    }

    /// Ranks owning some ghost of this process, sorted ascending. Filled by
    /// the exchange layer.
    pub fn processes(&self) -> &[Rank] {
        &self.processes
    }

    /// Where `rank`'s contribution begins in the ghost tables. Filled by the
    /// exchange layer.
    pub fn process_offset(&self, rank: Rank) -> Option<ProcessOffset> {
        self.process_offsets.get(&rank).copied()
    }

    /// Ranks that need some of this process's elements, sorted ascending.
    pub fn remote_processes(&self) -> &[Rank] {
        &self.remote_processes
    }

    /// The trees and elements `rank` needs from this process.
    pub fn remote_entry(&self, rank: Rank) -> Option<&RemoteEntry<E>> {
        self.remote_ghosts.get(&rank)
    }
}

/// In-progress ghost layer. Phase A fills the ghost-tree table, phase B the
/// remote tables; `freeze` hands out the immutable layer.
struct GhostBuilder<'f, F: ForestView> {
    forest: &'f F,
    ghost_trees: Vec<GhostTree<F::Element>>,
    global_tree_to_ghost_tree: FxHashMap<GlobalTreeId, usize>,
    remote_ghosts: FxHashMap<Rank, RemoteEntry<F::Element>>,
    remote_processes: Vec<Rank>,
}

impl<'f, F: ForestView> GhostBuilder<'f, F> {
    fn new(forest: &'f F) -> Self {
        Self {
            forest,
            ghost_trees: Vec::new(),
            global_tree_to_ghost_tree: FxHashMap::default(),
            remote_ghosts: FxHashMap::default(),
            remote_processes: Vec::new(),
        }
    }

    /// Track `gtreeid` as a ghost tree; no-op if it already is one.
    fn add_ghost_tree(&mut self, gtreeid: GlobalTreeId) {
        let cmesh = self.forest.cmesh();
        // the tree must be addressable in the cmesh, as a local tree or ghost
        let eclass = if cmesh.tree_id_is_valid(gtreeid) {
            cmesh.tree_class(gtreeid)
        } else {
            let ghost_index = cmesh.ghost_index_of(gtreeid).unwrap_or_else(|| {
                panic!("tree {gtreeid} is neither local nor a ghost in the coarse mesh")
            });
            cmesh.ghost_class(ghost_index)
        };

        match self.global_tree_to_ghost_tree.entry(gtreeid) {
            Entry::Occupied(_) => {}
            Entry::Vacant(slot) => {
                debug!("adding global tree {gtreeid} to the ghost layer");
                slot.insert(self.ghost_trees.len());
                self.ghost_trees.push(GhostTree {
                    global_id: gtreeid,
                    eclass,
                    elements: Vec::new(),
                });
            }
        }
    }

    /// Phase A: create a ghost-tree entry for every local tree that touches
    /// another process through a coarse face, then sort by global id.
    fn fill_ghost_tree_array(&mut self) {
        let forest = self.forest;
        let num_local_trees = forest.num_local_trees();

        // a shared first or last tree has elements on another rank by
        // definition
        if forest.first_tree_shared() {
            self.add_ghost_tree(forest.first_local_tree_id());
        }
        if forest.last_tree_shared() {
            self.add_ghost_tree(forest.first_local_tree_id() + num_local_trees - 1);
        }

        let first_ctreeid = forest.cmesh().first_treeid();
        for itree in 0..num_local_trees {
            let ctree = forest.coarse_tree(itree);
            for link in ctree.face_neighbors() {
                // an unset link is a domain boundary
                let Some(link) = link else { continue };
                let cneighid = link.tree - first_ctreeid;
                if forest.cmesh_ltreeid_to_ltreeid(cneighid).is_none() {
                    // the neighbor has no local elements, so this tree faces
                    // another process
                    self.add_ghost_tree(ctree.tree_id);
                }
            }
        }

        // sort by global id and refresh the indices the sort invalidated
        self.ghost_trees.sort_by_key(|tree| tree.global_id);
        for (index, tree) in self.ghost_trees.iter().enumerate() {
            self.global_tree_to_ghost_tree.insert(tree.global_id, index);
        }
    }

    /// Register `elem` of local tree `ltreeid` as needed by `remote_rank`.
    ///
    /// Called in scheme linear order per tree and in local tree order, so a
    /// tree already present is the last entry of the rank's tree list and a
    /// duplicate element is the last entry of that tree's element list.
    fn add_remote(&mut self, remote_rank: Rank, ltreeid: LocalTreeId, elem: &F::Element) {
        let forest = self.forest;
        let eclass = forest.tree_class(ltreeid);
        let scheme = forest.eclass_scheme(eclass);
        let gtreeid = forest.first_local_tree_id() + ltreeid;

        let entry = match self.remote_ghosts.entry(remote_rank) {
            Entry::Vacant(slot) => {
                self.remote_processes.push(remote_rank);
                slot.insert(RemoteEntry {
                    remote_rank,
                    remote_trees: vec![RemoteTree::new(gtreeid, eclass)],
                })
            }
            Entry::Occupied(slot) => slot.into_mut(),
        };

        if entry.remote_trees.last().map(|tree| tree.global_id) != Some(gtreeid) {
            entry.remote_trees.push(RemoteTree::new(gtreeid, eclass));
        }
        let tree = entry.remote_trees.last_mut().unwrap();

        let level = scheme.level(elem);
        let linear_id = scheme.linear_id(elem, level);
        let already_recorded = tree.elements.last().is_some_and(|previous| {
            let previous_level = scheme.level(previous);
            previous_level == level && scheme.linear_id(previous, previous_level) == linear_id
        });
        if !already_recorded {
            debug!("element {linear_id} of tree {gtreeid} is remote to rank {remote_rank}");
            tree.elements.push(elem.clone());
        }
    }

    /// Phase B: construct every element's half-face neighbors and register
    /// the element as remote wherever a neighbor is owned elsewhere.
    fn remote_discovery(&mut self) {
        let forest = self.forest;
        let my_rank = forest.cmesh().mpi_rank();
        let mpi_size = forest.cmesh().mpi_size();

        let mut half_neighbors: Vec<F::Element> = Vec::new();
        for itree in 0..forest.num_local_trees() {
            let tree_class = forest.tree_class(itree);
            let scheme = forest.eclass_scheme(tree_class);

            for ielem in 0..forest.tree_element_count(itree) {
                let elem = forest.tree_element(itree, ielem);
                for iface in 0..scheme.num_faces(elem) {
                    let neigh_class = forest.element_neighbor_class(itree, elem, iface);
                    let neigh_scheme = forest.eclass_scheme(neigh_class);
                    let num_face_children = scheme.num_face_children(elem, iface);

                    // the scratch only regrows; the neighbor scheme owns the
                    // allocation and the old elements drop here
                    if half_neighbors.len() < num_face_children {
                        half_neighbors = neigh_scheme.new_elements(num_face_children);
                    }

                    let Some(neighbor_tree) = forest.element_half_face_neighbors(
                        itree,
                        elem,
                        iface,
                        &mut half_neighbors[..num_face_children],
                    ) else {
                        // domain boundary
                        continue;
                    };

                    for neighbor in &half_neighbors[..num_face_children] {
                        let owner = forest.element_find_owner(neighbor_tree, neighbor, neigh_class);
                        assert!(
                            0 <= owner && owner < mpi_size,
                            "element owner {owner} is outside the communicator"
                        );
                        if owner != my_rank {
                            self.add_remote(owner, itree, elem);
                        }
                    }
                }
            }
        }
    }

    fn freeze(mut self) -> GhostLayer<F::Element> {
        self.remote_processes.sort_unstable();
        debug_assert!(self
            .ghost_trees
            .iter()
            .tuple_windows()
            .all(|(a, b)| a.global_id < b.global_id));
        debug_assert!(self
            .remote_processes
            .iter()
            .tuple_windows()
            .all(|(a, b)| a < b));

        GhostLayer {
            ghost_trees: self.ghost_trees,
            global_tree_to_ghost_tree: self.global_tree_to_ghost_tree,
            process_offsets: FxHashMap::default(),
            processes: Vec::new(),
            remote_ghosts: self.remote_ghosts,
            remote_processes: self.remote_processes,
        }
    }
}

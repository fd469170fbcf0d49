//! Collaborator contracts for a refined forest sitting on a coarse mesh.
//!
//! The ghost layer is built against these traits rather than a concrete
//! forest, so the refinement machinery (element construction, linear
//! ordering, owner search) stays outside this crate.

use crate::grid::{CoarseMesh, CoarseTree};
use crate::reference_cell::ReferenceCellType;
use crate::types::{GlobalTreeId, Level, LinearId, LocalTreeId, Rank};

/// Polymorphic operations on the refined elements of one cell class.
///
/// Elements are opaque to the mesh layer; the scheme owns their
/// representation and allocation. Dropping an element returned by
/// [`ElementScheme::new_elements`] releases it.
pub trait ElementScheme {
    /// The element representation this scheme operates on.
    type Element: Clone;

    /// The cell class this scheme refines.
    fn cell_type(&self) -> ReferenceCellType;

    /// Byte size of one element, for sizing exchange messages.
    fn element_size(&self) -> usize;

    /// Refinement level of an element.
    fn level(&self, elem: &Self::Element) -> Level;

    /// Linear index of an element at `level`, monotone in the scheme's
    /// traversal order.
    fn linear_id(&self, elem: &Self::Element, level: Level) -> LinearId;

    /// Number of faces of a refined element.
    fn num_faces(&self, elem: &Self::Element) -> usize;

    /// Number of same-or-finer neighbors needed to cover `face` from the
    /// other side.
    fn num_face_children(&self, elem: &Self::Element, face: usize) -> usize;

    /// Allocate `n` elements in an unspecified state, to be overwritten by
    /// neighbor construction.
    fn new_elements(&self, n: usize) -> Vec<Self::Element>;
}

/// Read access to a committed forest, as consumed by the ghost layer.
///
/// Local trees are indexed `0..num_local_trees`; the global id of local tree
/// `i` is `first_local_tree_id() + i` and coincides with the id of the coarse
/// tree it refines.
pub trait ForestView {
    /// The element representation shared by all schemes of this forest.
    type Element: Clone;

    /// The coarse mesh this forest refines.
    fn cmesh(&self) -> &CoarseMesh;

    /// Number of trees with elements on this process.
    fn num_local_trees(&self) -> LocalTreeId;

    /// Global id of the first local tree.
    fn first_local_tree_id(&self) -> GlobalTreeId;

    /// Whether the first local tree also has elements on a lower rank.
    fn first_tree_shared(&self) -> bool;

    /// Whether the last local tree also has elements on a higher rank.
    fn last_tree_shared(&self) -> bool;

    /// Cell class of a local tree.
    fn tree_class(&self, ltreeid: LocalTreeId) -> ReferenceCellType;

    /// Number of elements of a local tree.
    fn tree_element_count(&self, ltreeid: LocalTreeId) -> usize;

    /// The `index`-th element of a local tree, in the scheme's linear order.
    fn tree_element(&self, ltreeid: LocalTreeId, index: usize) -> &Self::Element;

    /// The scheme refining cells of class `eclass`.
    fn eclass_scheme(&self, eclass: ReferenceCellType)
        -> &dyn ElementScheme<Element = Self::Element>;

    /// The coarse tree behind local tree `ltreeid`, with its face links.
    fn coarse_tree(&self, ltreeid: LocalTreeId) -> &CoarseTree;

    /// Translate a cmesh-local tree id into a forest-local tree id, `None` if
    /// that tree has no elements on this process.
    fn cmesh_ltreeid_to_ltreeid(&self, cltreeid: LocalTreeId) -> Option<LocalTreeId>;

    /// Cell class of the tree on the other side of `face` of `elem`.
    fn element_neighbor_class(
        &self,
        ltreeid: LocalTreeId,
        elem: &Self::Element,
        face: usize,
    ) -> ReferenceCellType;

    /// Construct the half-face neighbors of `elem` across `face` into `out`.
    ///
    /// Returns the global id of the tree containing the neighbors, or `None`
    /// if the face lies on the domain boundary. `out` must hold
    /// [`ElementScheme::num_face_children`] elements of the neighbor scheme.
    fn element_half_face_neighbors(
        &self,
        ltreeid: LocalTreeId,
        elem: &Self::Element,
        face: usize,
        out: &mut [Self::Element],
    ) -> Option<GlobalTreeId>;

    /// Rank owning `elem` inside global tree `gtreeid`.
    fn element_find_owner(
        &self,
        gtreeid: GlobalTreeId,
        elem: &Self::Element,
        eclass: ReferenceCellType,
    ) -> Rank;
}

//! Canonical coarse meshes.

use std::sync::Arc;

use crate::grid::{CoarseMesh, CoarseMeshBuilder};
use crate::reference_cell::{self, ReferenceCellType};
use crate::traits::Transport;

/// A replicated, committed mesh of one cell of class `eclass`.
pub fn single_cell(
    eclass: ReferenceCellType,
    comm: Arc<dyn Transport>,
    do_dup: bool,
) -> CoarseMesh {
    let mut builder = CoarseMeshBuilder::new();
    builder.set_mpicomm(comm, do_dup);
    builder.set_num_trees(1);
    builder.set_tree(0, eclass);
    builder.commit()
}

/// A single-triangle mesh.
pub fn triangle(comm: Arc<dyn Transport>, do_dup: bool) -> CoarseMesh {
    single_cell(ReferenceCellType::Triangle, comm, do_dup)
}

/// A single-tetrahedron mesh.
pub fn tetrahedron(comm: Arc<dyn Transport>, do_dup: bool) -> CoarseMesh {
    single_cell(ReferenceCellType::Tetrahedron, comm, do_dup)
}

/// A single-quadrilateral mesh.
pub fn quadrilateral(comm: Arc<dyn Transport>, do_dup: bool) -> CoarseMesh {
    single_cell(ReferenceCellType::Quadrilateral, comm, do_dup)
}

/// A single-hexahedron mesh.
pub fn hexahedron(comm: Arc<dyn Transport>, do_dup: bool) -> CoarseMesh {
    single_cell(ReferenceCellType::Hexahedron, comm, do_dup)
}

/// The unit hypercube of `eclass`'s dimension, tiled with the minimal number
/// of trees of that class.
///
/// Only the triangle tiling joins its interior face; the multi-tree 3D
/// tilings (tetrahedron, prism, pyramid) come back as disconnected trees
/// with every face link unset.
pub fn hypercube(eclass: ReferenceCellType, comm: Arc<dyn Transport>, do_dup: bool) -> CoarseMesh {
    let num_trees = reference_cell::hypercube_tree_count(eclass);
    let mut builder = CoarseMeshBuilder::new();
    builder.set_mpicomm(comm, do_dup);
    builder.set_num_trees(num_trees as i64);
    for i in 0..num_trees {
        builder.set_tree(i as i64, eclass);
    }
    if eclass == ReferenceCellType::Triangle {
        // the two triangles meet along the square's diagonal
        builder.join_faces(0, 1, 1, 2, 0);
    }
    // TODO: join the interior faces of the tetrahedron, prism and pyramid
    // hypercubes once their corner orderings are pinned down
    builder.commit()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::traits::SerialComm;

    fn serial() -> Arc<dyn Transport> {
        Arc::new(SerialComm)
    }

    #[test]
    fn test_tetrahedral_hypercube() {
        let cmesh = hypercube(ReferenceCellType::Tetrahedron, serial(), false);
        assert_eq!(cmesh.num_trees(), 6);
        assert_eq!(cmesh.dimension(), 3);
        assert_eq!(cmesh.num_trees_of_class(ReferenceCellType::Tetrahedron), 6);
        for i in 0..6 {
            assert_eq!(cmesh.tree_class(i), ReferenceCellType::Tetrahedron);
        }
    }

    #[test]
    fn test_triangle_hypercube_joins_the_diagonal() {
        let cmesh = hypercube(ReferenceCellType::Triangle, serial(), false);
        assert_eq!(cmesh.num_trees(), 2);
        let link = cmesh.tree(0).face_neighbors()[1].unwrap();
        assert_eq!(link.tree, 1);
        assert_eq!(link.neighbor_face(2), 2);
    }

    #[test]
    fn test_single_cell_wrappers() {
        assert_eq!(triangle(serial(), false).dimension(), 2);
        assert_eq!(quadrilateral(serial(), false).dimension(), 2);
        assert_eq!(tetrahedron(serial(), false).dimension(), 3);
        assert_eq!(hexahedron(serial(), false).dimension(), 3);
    }
}

//! Reference cell types and their static tables.

/// The shape classes a coarse tree can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ReferenceCellType {
    /// A single point
    Point = 0,
    /// A line segment
    Interval = 1,
    /// A quadrilateral
    Quadrilateral = 2,
    /// A triangle
    Triangle = 3,
    /// A hexahedron
    Hexahedron = 4,
    /// A tetrahedron
    Tetrahedron = 5,
    /// A triangular prism
    Prism = 6,
    /// A square-based pyramid
    Pyramid = 7,
}

/// Number of distinct reference cell types.
pub const CELL_TYPE_COUNT: usize = 8;

/// All reference cell types, indexable by discriminant.
pub const ALL_CELL_TYPES: [ReferenceCellType; CELL_TYPE_COUNT] = [
    ReferenceCellType::Point,
    ReferenceCellType::Interval,
    ReferenceCellType::Quadrilateral,
    ReferenceCellType::Triangle,
    ReferenceCellType::Hexahedron,
    ReferenceCellType::Tetrahedron,
    ReferenceCellType::Prism,
    ReferenceCellType::Pyramid,
];

/// The topological dimension of the reference cell.
pub fn dim(cell: ReferenceCellType) -> i32 {
    match cell {
        ReferenceCellType::Point => 0,
        ReferenceCellType::Interval => 1,
        ReferenceCellType::Quadrilateral | ReferenceCellType::Triangle => 2,
        ReferenceCellType::Hexahedron
        | ReferenceCellType::Tetrahedron
        | ReferenceCellType::Prism
        | ReferenceCellType::Pyramid => 3,
    }
}

/// The number of faces (codimension-one entities) of the reference cell.
pub fn num_faces(cell: ReferenceCellType) -> usize {
    match cell {
        ReferenceCellType::Point => 0,
        ReferenceCellType::Interval => 2,
        ReferenceCellType::Quadrilateral => 4,
        ReferenceCellType::Triangle => 3,
        ReferenceCellType::Hexahedron => 6,
        ReferenceCellType::Tetrahedron => 4,
        ReferenceCellType::Prism => 5,
        ReferenceCellType::Pyramid => 5,
    }
}

/// The number of corners of the reference cell.
pub fn corner_count(cell: ReferenceCellType) -> usize {
    match cell {
        ReferenceCellType::Point => 1,
        ReferenceCellType::Interval => 2,
        ReferenceCellType::Quadrilateral => 4,
        ReferenceCellType::Triangle => 3,
        ReferenceCellType::Hexahedron => 8,
        ReferenceCellType::Tetrahedron => 4,
        ReferenceCellType::Prism => 6,
        ReferenceCellType::Pyramid => 5,
    }
}

/// The shape of each face of the reference cell, in face order.
pub fn face_cell_types(cell: ReferenceCellType) -> &'static [ReferenceCellType] {
    match cell {
        ReferenceCellType::Point => &[],
        ReferenceCellType::Interval => &[ReferenceCellType::Point; 2],
        ReferenceCellType::Quadrilateral => &[ReferenceCellType::Interval; 4],
        ReferenceCellType::Triangle => &[ReferenceCellType::Interval; 3],
        ReferenceCellType::Hexahedron => &[ReferenceCellType::Quadrilateral; 6],
        ReferenceCellType::Tetrahedron => &[ReferenceCellType::Triangle; 4],
        ReferenceCellType::Prism => &[
            ReferenceCellType::Quadrilateral,
            ReferenceCellType::Quadrilateral,
            ReferenceCellType::Quadrilateral,
            ReferenceCellType::Triangle,
            ReferenceCellType::Triangle,
        ],
        ReferenceCellType::Pyramid => &[
            ReferenceCellType::Triangle,
            ReferenceCellType::Triangle,
            ReferenceCellType::Triangle,
            ReferenceCellType::Triangle,
            ReferenceCellType::Quadrilateral,
        ],
    }
}

/// The largest face count among cells of dimension `dim`.
///
/// This is the modulus of the tree-to-face encoding stored on
/// [`crate::grid::FaceLink`].
pub fn max_faces_per_dim(dim: i32) -> usize {
    match dim {
        0 => 1,
        1 => 2,
        2 => 4,
        3 => 6,
        _ => unreachable!("invalid dimension {dim}"),
    }
}

/// The number of trees of this class needed to tile the unit hypercube of the
/// class's dimension.
pub fn hypercube_tree_count(cell: ReferenceCellType) -> usize {
    match cell {
        ReferenceCellType::Point => 1,
        ReferenceCellType::Interval => 1,
        ReferenceCellType::Quadrilateral => 1,
        ReferenceCellType::Triangle => 2,
        ReferenceCellType::Hexahedron => 1,
        ReferenceCellType::Tetrahedron => 6,
        ReferenceCellType::Prism => 2,
        ReferenceCellType::Pyramid => 3,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_face_tables_consistent() {
        for cell in ALL_CELL_TYPES {
            assert_eq!(face_cell_types(cell).len(), num_faces(cell));
            for face in face_cell_types(cell) {
                assert_eq!(dim(*face), dim(cell) - 1);
            }
            assert!(num_faces(cell) <= max_faces_per_dim(dim(cell)));
        }
    }

    #[test]
    fn test_discriminants_index_all_cell_types() {
        for (i, cell) in ALL_CELL_TYPES.iter().enumerate() {
            assert_eq!(*cell as usize, i);
        }
    }
}

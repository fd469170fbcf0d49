//! Coarse mesh: builder, committed mesh, uniform partition and canonical
//! shapes.

mod builder;
mod coarse_mesh;
pub mod partition;
pub mod shapes;

pub use builder::CoarseMeshBuilder;
pub use coarse_mesh::{CoarseGhost, CoarseMesh, CoarseTree, FaceLink};
pub use partition::{uniform_bounds, UniformPartition};

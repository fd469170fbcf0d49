//! Distributed coarse meshes and ghost layers for forests of adaptive trees.
//!
//! A coarse mesh is a connectivity graph of reference cells ("trees") joined
//! along faces, either replicated on every process or partitioned across the
//! ranks of a communicator. It is entered through
//! [`grid::CoarseMeshBuilder`] and frozen by committing. On a committed mesh,
//! [`grid::uniform_bounds`] splits the refined children of every tree evenly
//! across ranks, and [`ghost::GhostLayer`] discovers, for an already
//! partitioned forest of refined elements, which local elements other ranks
//! need and which ghost trees this rank must track to form one layer of
//! inter-process halo.
//!
//! The refinement machinery itself (element construction, linear ordering,
//! owner search) stays behind the traits in [`traits::forest`], and the MPI
//! surface behind [`traits::transport`]; enable the `mpi` feature for
//! communicator implementations backed by the `mpi` crate.

pub mod ghost;
pub mod grid;
pub mod reference_cell;
pub mod traits;
pub mod types;

pub use ghost::GhostLayer;
pub use grid::{uniform_bounds, CoarseMesh, CoarseMeshBuilder, UniformPartition};
pub use reference_cell::ReferenceCellType;

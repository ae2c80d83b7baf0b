//! Dense signed-distance voxel engine.
//!
//! A [`VoxelGrid`] holds world-unit distances (negative inside) on a
//! regular lattice. The operations mirror a narrow-band level-set library:
//! [`mesh_to_grid`] samples a mesh, [`dilate`] widens the valid band,
//! [`redistance`] moves the zero level and [`grid_to_mesh`] extracts an
//! isosurface.
//!
//! Sampling through [`VoxelGrid::sample`] uses a single-threaded cache.
//! Parallel code samples through a [`GridReader`].

mod extract;
mod grid;
mod ops;

pub use extract::grid_to_mesh;
pub use grid::{GridReader, VoxelField, VoxelGrid};
pub use ops::{DEFAULT_MAX_VOXELS, MeshToGridParams, dilate, mesh_to_grid, redistance};

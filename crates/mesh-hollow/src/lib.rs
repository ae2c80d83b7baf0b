//! Hollowing of resin prints and drain-hole drilling.
//!
//! A solid part is hollowed by offsetting its surface inward through a
//! voxel distance field. The resulting cavity surface is merged into the
//! part with reversed winding, triangles of the part that reach into the
//! cavity are trimmed, and cylindrical drain holes are cut with the boolean
//! kernel from `mesh_repair`.
//!
//! # Units and Conventions
//!
//! Millimeters throughout. Distances sampled from an [`Interior`] are
//! negative inside the cavity. A [`DrainHole`] points from the outer surface
//! into the part.
//!
//! # Quick Start with HollowBuilder
//!
//! ```no_run
//! use mesh_repair::Mesh;
//! use mesh_hollow::HollowBuilder;
//!
//! let mesh = Mesh::load("part.stl").unwrap();
//!
//! let output = HollowBuilder::new(&mesh)
//!     .min_thickness(2.0)
//!     .closing_distance(0.5)
//!     .build()
//!     .unwrap()
//!     .expect("not cancelled");
//!
//! output.mesh.save("hollowed.stl").unwrap();
//! ```
//!
//! # Step by Step
//!
//! ```no_run
//! use mesh_repair::Mesh;
//! use mesh_repair::progress::JobControl;
//! use mesh_hollow::{
//!     DrainHole, HollowFlags, HollowingConfig, generate_interior, hollow_mesh,
//!     hollow_mesh_and_drill,
//! };
//!
//! let mut mesh = Mesh::load("part.stl").unwrap();
//! let config = HollowingConfig::with_thickness(2.0);
//!
//! let control = JobControl::none().with_status(|percent, message| {
//!     println!("{percent}%: {message}");
//! });
//! let interior = generate_interior(&mesh, &config, &control)
//!     .unwrap()
//!     .expect("not cancelled");
//!
//! hollow_mesh(&mut mesh, &interior, HollowFlags::empty());
//!
//! let mut holes = vec![DrainHole::new(
//!     [10.0, 10.0, 21.0].into(),
//!     [0.0, 0.0, -1.0].into(),
//!     2.0,
//!     6.0,
//! )];
//! let status = hollow_mesh_and_drill(
//!     &mut mesh,
//!     &interior,
//!     &mut holes,
//!     &mut rand::thread_rng(),
//!     |i| eprintln!("hole {i} failed"),
//! );
//! println!("drilling: {status}");
//! ```

mod builder;
mod config;
mod distance;
mod drainhole;
mod drill;
mod error;
mod facehash;
mod hollow;
mod interior;
mod trim;
pub mod voxel;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{HollowError, HollowErrorCode, HollowResult};

// Builder API (recommended)
pub use builder::{HollowBuilder, HollowOutput};

// Parameters and job documents
pub use config::{HollowJob, HollowingConfig, voxel_scale};

// Interior cavity and distance queries
pub use distance::{DistanceField, TriangleBubble};
pub use interior::{Interior, generate_interior, generate_interior_from_grid};

// Trimming and merging
pub use hollow::{HollowFlags, hollow_mesh, hollow_mesh_with_config, swap_normals};
pub use trim::{TrimStats, remove_inside_triangles};

// Drain holes
pub use drainhole::{DrainHole, HOLE_STICK_OUT_LENGTH, HoleHit, drainholes_mesh};
pub use drill::{DrillStatus, hollow_mesh_and_drill};
pub use facehash::{FaceHash, FaceKey, create_exclude_mask, facekey};

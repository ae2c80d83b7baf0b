//! Triangle mesh primitives for print preparation.
//!
//! This crate holds the mesh model shared by the hollowing pipeline and the
//! CLI: loading and saving, validation, cleanup, a BVH, self-intersection
//! detection and an exact-ish boolean kernel that drilling runs on.
//!
//! # Units and Scale
//!
//! **This library assumes millimeter (mm) units.** Tolerances inside the
//! boolean kernel are relative to the operand size; the welding helpers take
//! an absolute epsilon.
//!
//! # Coordinate System
//!
//! Right-handed. Face winding is **counter-clockwise (CCW) when viewed from
//! outside** the mesh, so normals point outward by the right-hand rule and a
//! closed mesh has positive signed volume.
//!
//! # Quick Start
//!
//! ```no_run
//! use mesh_repair::Mesh;
//!
//! let mesh = Mesh::load("model.stl").unwrap();
//!
//! let report = mesh.validate();
//! println!("{}", report);
//! if !report.bounds_a_volume() {
//!     println!("Not a closed solid: {} boundary edges", report.boundary_edge_count);
//! }
//!
//! mesh.save("copy.obj").unwrap();
//! ```
//!
//! # Boolean operations
//!
//! ```no_run
//! use mesh_repair::{KernelMesh, Mesh};
//!
//! let part = Mesh::load("part.stl").unwrap();
//! let tool = Mesh::load("tool.stl").unwrap();
//!
//! let mut result = KernelMesh::from_mesh(&part).unwrap();
//! result.subtract(&KernelMesh::from_mesh(&tool).unwrap()).unwrap();
//! result.into_mesh().save("cut.stl").unwrap();
//! ```

mod error;
pub mod tracing_ext;
mod types;

pub mod adjacency;
pub mod boolean;
pub mod bvh;
pub mod intersect;
pub mod io;
pub mod progress;
pub mod repair;
pub mod validate;

pub use error::{ErrorCode, MeshError, MeshResult, RecoverySuggestion, ValidationIssue};
pub use types::{Mesh, Triangle, Vertex};

pub use adjacency::{MeshAdjacency, VertexFaceIndex};
pub use boolean::{BooleanOp, KernelMesh, SolidQuery, boolean_operation};
pub use bvh::{Aabb, Bvh};
pub use intersect::{
    IntersectionParams, SelfIntersectionResult, detect_self_intersections, has_self_intersections,
};
pub use io::{MeshFormat, load_mesh, save_mesh, save_obj, save_stl};
pub use progress::{JobControl, Progress, ProgressCallback};
pub use repair::{
    remove_collapsed_faces, remove_degenerate_triangles, remove_unconnected_vertices,
    weld_vertices,
};
pub use tracing_ext::{OperationTimer, log_io_operation, log_mesh_stats, log_validation_result};
pub use validate::{
    MeshReport, ValidationOptions, bounds_a_volume, validate_mesh, validate_mesh_data,
};

// Convenience methods on Mesh
impl Mesh {
    /// Load a mesh from a file, auto-detecting format from extension.
    pub fn load(path: impl AsRef<std::path::Path>) -> MeshResult<Self> {
        io::load_mesh(path.as_ref())
    }

    /// Save the mesh to a file, auto-detecting format from extension.
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> MeshResult<()> {
        io::save_mesh(self, path.as_ref())
    }

    /// Validate the mesh and return a report.
    pub fn validate(&self) -> MeshReport {
        validate::validate_mesh(self)
    }

    /// Check for penetrating faces.
    pub fn detect_self_intersections(&self) -> SelfIntersectionResult {
        intersect::detect_self_intersections(self, &IntersectionParams::default())
    }
}

//! Mesh validation and reporting.

use nalgebra::Point3;
use serde::Serialize;
use tracing::{debug, warn};

use crate::Mesh;
use crate::adjacency::MeshAdjacency;
use crate::error::{MeshError, MeshResult, ValidationIssue};

/// Validation report for a mesh.
#[derive(Debug, Clone, Serialize)]
pub struct MeshReport {
    /// Whether the mesh has no boundary edges.
    pub is_watertight: bool,

    /// Whether all edges have at most 2 adjacent faces.
    pub is_manifold: bool,

    /// Whether every directed edge is matched by exactly one reversed twin.
    pub is_consistently_oriented: bool,

    /// Number of boundary edges (edges with 1 adjacent face).
    pub boundary_edge_count: usize,

    /// Number of non-manifold edges (edges with >2 adjacent faces).
    pub non_manifold_edge_count: usize,

    /// Total vertex count.
    pub vertex_count: usize,

    /// Total face count.
    pub face_count: usize,

    /// Bounding box as (min_corner, max_corner).
    pub bounds: Option<(Point3<f64>, Point3<f64>)>,

    /// Signed volume (positive = outward normals). Only meaningful when closed.
    pub signed_volume: f64,

    /// Total surface area of the mesh.
    pub surface_area: f64,

    /// Number of vertex-connected components.
    pub component_count: usize,
}

impl MeshReport {
    /// Closed, edge-manifold, consistently oriented and enclosing positive
    /// volume: the mesh is the boundary of a solid.
    pub fn bounds_a_volume(&self) -> bool {
        self.face_count > 0
            && self.is_watertight
            && self.is_manifold
            && self.is_consistently_oriented
            && self.signed_volume > 0.0
    }

    /// Whether the normals point inward.
    pub fn is_inside_out(&self) -> bool {
        self.signed_volume < 0.0
    }
}

impl std::fmt::Display for MeshReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Mesh Report:")?;
        writeln!(f, "  Vertices: {}", self.vertex_count)?;
        writeln!(f, "  Faces: {}", self.face_count)?;
        writeln!(f, "  Components: {}", self.component_count)?;

        if let Some((min, max)) = &self.bounds {
            writeln!(
                f,
                "  Bounds: [{:.1}, {:.1}, {:.1}] to [{:.1}, {:.1}, {:.1}]",
                min.x, min.y, min.z, max.x, max.y, max.z
            )?;
        }

        writeln!(f, "  Surface Area: {:.2}", self.surface_area)?;
        writeln!(f, "  Volume: {:.2}", self.signed_volume)?;
        writeln!(
            f,
            "  Watertight: {} (boundary edges: {})",
            if self.is_watertight { "yes" } else { "NO" },
            self.boundary_edge_count
        )?;
        writeln!(
            f,
            "  Manifold: {} (non-manifold edges: {})",
            if self.is_manifold { "yes" } else { "NO" },
            self.non_manifold_edge_count
        )?;
        write!(
            f,
            "  Orientation: {}",
            if !self.is_consistently_oriented {
                "INCONSISTENT"
            } else if self.is_inside_out() {
                "INSIDE-OUT"
            } else {
                "correct"
            }
        )
    }
}

/// Validate a mesh and return a report.
pub fn validate_mesh(mesh: &Mesh) -> MeshReport {
    let adjacency = MeshAdjacency::build(&mesh.faces);

    let boundary_edge_count = adjacency.boundary_edge_count();
    let non_manifold_edge_count = adjacency.non_manifold_edge_count();

    let report = MeshReport {
        is_watertight: boundary_edge_count == 0,
        is_manifold: non_manifold_edge_count == 0,
        is_consistently_oriented: adjacency.orientation_defect_count() == 0,
        boundary_edge_count,
        non_manifold_edge_count,
        vertex_count: mesh.vertex_count(),
        face_count: mesh.face_count(),
        bounds: mesh.bounds(),
        signed_volume: mesh.signed_volume(),
        surface_area: mesh.surface_area(),
        component_count: count_components(mesh),
    };

    debug!("{}", report);

    report
}

/// Whether `mesh` is the closed, oriented boundary of a solid.
///
/// Several disjoint or nested closed shells qualify as long as the total
/// signed volume is positive, which is what a hollowed part looks like.
pub fn bounds_a_volume(mesh: &Mesh) -> bool {
    if mesh.is_empty() {
        return false;
    }
    let report = validate_mesh(mesh);
    if !report.bounds_a_volume() {
        warn!(
            boundary_edges = report.boundary_edge_count,
            non_manifold_edges = report.non_manifold_edge_count,
            oriented = report.is_consistently_oriented,
            signed_volume = report.signed_volume,
            "Mesh does not bound a volume"
        );
        return false;
    }
    true
}

/// Vertex-connected components via union-find over face corners.
fn count_components(mesh: &Mesh) -> usize {
    fn find(parent: &mut [u32], mut x: u32) -> u32 {
        while parent[x as usize] != x {
            let next = parent[parent[x as usize] as usize];
            parent[x as usize] = next;
            x = next;
        }
        x
    }

    let mut parent: Vec<u32> = (0..mesh.vertices.len() as u32).collect();
    for face in &mesh.faces {
        let root = find(&mut parent, face[0]);
        for &v in &face[1..] {
            let other = find(&mut parent, v);
            parent[other as usize] = root;
        }
    }

    let mut used = vec![false; mesh.vertices.len()];
    for face in &mesh.faces {
        for &v in face {
            used[v as usize] = true;
        }
    }

    (0..mesh.vertices.len() as u32)
        .filter(|&v| used[v as usize] && find(&mut parent, v) == v)
        .count()
}

/// Options for mesh data validation.
#[derive(Debug, Clone)]
pub struct ValidationOptions {
    /// Whether to reject the mesh on finding invalid data (default: true).
    /// If false, issues are collected but validation continues.
    pub reject_on_invalid: bool,
    /// Maximum number of issues to collect before stopping (default: 100).
    pub max_issues: usize,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            reject_on_invalid: true,
            max_issues: 100,
        }
    }
}

impl ValidationOptions {
    /// Create options that collect all issues without rejecting.
    pub fn collect_all() -> Self {
        Self {
            reject_on_invalid: false,
            max_issues: 1000,
        }
    }
}

/// Validate mesh data for invalid indices and non-finite coordinates.
///
/// Returns the collected issues; with `reject_on_invalid` the first issue is
/// returned as an error instead.
///
/// ```
/// use mesh_repair::{Mesh, Vertex};
/// use mesh_repair::validate::{validate_mesh_data, ValidationOptions};
///
/// let mut mesh = Mesh::new();
/// mesh.vertices.push(Vertex::from_coords(0.0, 0.0, 0.0));
/// mesh.faces.push([0, 0, 7]);
///
/// let issues = validate_mesh_data(&mesh, &ValidationOptions::collect_all()).unwrap();
/// assert_eq!(issues.len(), 1);
/// assert!(validate_mesh_data(&mesh, &ValidationOptions::default()).is_err());
/// ```
pub fn validate_mesh_data(
    mesh: &Mesh,
    options: &ValidationOptions,
) -> MeshResult<Vec<ValidationIssue>> {
    let mut issues = Vec::new();
    let mut push = |issue: ValidationIssue| -> MeshResult<bool> {
        if options.reject_on_invalid {
            return Err(MeshError::from(issue));
        }
        issues.push(issue);
        Ok(issues.len() < options.max_issues)
    };

    'vertices: for (vertex_index, vertex) in mesh.vertices.iter().enumerate() {
        let p = vertex.position;
        for (coordinate, value) in [("x", p.x), ("y", p.y), ("z", p.z)] {
            if !value.is_finite()
                && !push(ValidationIssue::NonFiniteCoordinate {
                    vertex_index,
                    coordinate,
                    value,
                })?
            {
                break 'vertices;
            }
        }
    }

    let vertex_count = mesh.vertices.len();
    'faces: for (face_index, face) in mesh.faces.iter().enumerate() {
        for &vertex_index in face {
            if vertex_index as usize >= vertex_count
                && !push(ValidationIssue::InvalidVertexIndex {
                    face_index,
                    vertex_index,
                    vertex_count,
                })?
            {
                break 'faces;
            }
        }
    }

    if !issues.is_empty() {
        warn!(issues = issues.len(), "Mesh data validation found problems");
    }

    Ok(issues)
}

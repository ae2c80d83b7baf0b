//! Self-intersection detection for meshes.
//!
//! Two triangles self-intersect when their interiors penetrate each other.
//! Triangles that merely touch along an edge or at a point do not count, and
//! triangles sharing a vertex index are skipped entirely by default.

use nalgebra::Vector3;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::{debug, warn};

use crate::bvh::Bvh;
use crate::types::{Mesh, Triangle};

/// Result of self-intersection detection.
#[derive(Debug, Clone)]
pub struct SelfIntersectionResult {
    /// Whether the mesh has any self-intersections.
    pub has_intersections: bool,
    /// Number of intersecting triangle pairs found.
    pub intersection_count: usize,
    /// Intersecting pairs as (face_idx_a, face_idx_b), at most `max_reported`.
    pub intersecting_pairs: Vec<(u32, u32)>,
    /// Total faces checked.
    pub faces_checked: usize,
    /// Whether the search was terminated early due to reaching max_reported.
    pub truncated: bool,
}

impl SelfIntersectionResult {
    /// Check if the mesh is free of self-intersections.
    pub fn is_clean(&self) -> bool {
        !self.has_intersections
    }

    fn clean(faces_checked: usize) -> Self {
        Self {
            has_intersections: false,
            intersection_count: 0,
            intersecting_pairs: Vec::new(),
            faces_checked,
            truncated: false,
        }
    }
}

impl std::fmt::Display for SelfIntersectionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.has_intersections {
            write!(
                f,
                "Self-intersections found: {} pair(s){}",
                self.intersection_count,
                if self.truncated { " (truncated)" } else { "" }
            )
        } else {
            write!(f, "No self-intersections detected")
        }
    }
}

/// Parameters for self-intersection detection.
#[derive(Debug, Clone)]
pub struct IntersectionParams {
    /// Maximum number of intersecting pairs to report.
    /// Set to 0 for unlimited (may be slow for badly broken meshes).
    pub max_reported: usize,
    /// Penetration depth below which triangles are considered touching.
    pub epsilon: f64,
    /// Whether to skip triangles sharing a vertex index.
    pub skip_adjacent: bool,
}

impl Default for IntersectionParams {
    fn default() -> Self {
        Self {
            max_reported: 100,
            epsilon: 1e-9,
            skip_adjacent: true,
        }
    }
}

impl IntersectionParams {
    /// Stop at the first intersecting pair.
    pub fn first_only() -> Self {
        Self {
            max_reported: 1,
            ..Default::default()
        }
    }
}

/// Detect self-intersections in a mesh.
///
/// Candidate pairs come from a BVH over the faces; each candidate is checked
/// with a separating axis test, in parallel over faces.
///
/// ```
/// use mesh_repair::{Mesh, Vertex};
/// use mesh_repair::intersect::{detect_self_intersections, IntersectionParams};
///
/// let mut mesh = Mesh::new();
/// mesh.vertices.push(Vertex::from_coords(0.0, 0.0, 0.0));
/// mesh.vertices.push(Vertex::from_coords(1.0, 0.0, 0.0));
/// mesh.vertices.push(Vertex::from_coords(0.0, 1.0, 0.0));
/// mesh.faces.push([0, 1, 2]);
///
/// let result = detect_self_intersections(&mesh, &IntersectionParams::default());
/// assert!(result.is_clean());
/// ```
pub fn detect_self_intersections(
    mesh: &Mesh,
    params: &IntersectionParams,
) -> SelfIntersectionResult {
    let face_count = mesh.faces.len();

    if face_count < 2 {
        return SelfIntersectionResult::clean(face_count);
    }

    debug!(faces = face_count, "Checking for self-intersections");

    let triangles: Vec<Triangle> = mesh.triangles().collect();
    let bvh = Bvh::from_triangles(&triangles);

    let max_pairs = if params.max_reported == 0 {
        usize::MAX
    } else {
        params.max_reported
    };

    let intersection_count = AtomicUsize::new(0);
    let should_stop = AtomicBool::new(false);

    let mut intersecting_pairs: Vec<(u32, u32)> = (0..face_count)
        .into_par_iter()
        .flat_map_iter(|i| {
            let mut local_pairs = Vec::new();
            if should_stop.load(Ordering::Relaxed) {
                return local_pairs;
            }

            let query = bvh.triangle_box(i as u32).expanded(params.epsilon);
            for j in bvh.query_box(&query) {
                let j = j as usize;
                if j <= i {
                    continue;
                }
                if should_stop.load(Ordering::Relaxed) {
                    break;
                }

                if params.skip_adjacent && shares_vertex(&mesh.faces[i], &mesh.faces[j]) {
                    continue;
                }

                if triangles_intersect(&triangles[i], &triangles[j], params.epsilon) {
                    let count = intersection_count.fetch_add(1, Ordering::Relaxed);

                    if count < max_pairs {
                        local_pairs.push((i as u32, j as u32));
                    }

                    if count + 1 >= max_pairs && params.max_reported > 0 {
                        should_stop.store(true, Ordering::Relaxed);
                        break;
                    }
                }
            }

            local_pairs
        })
        .collect();

    intersecting_pairs.sort_unstable();
    intersecting_pairs.truncate(max_pairs);

    let final_count = intersection_count.load(Ordering::Relaxed);
    let truncated = params.max_reported > 0 && final_count >= max_pairs;

    if final_count > 0 {
        warn!(pairs = final_count, truncated, "Self-intersecting triangles found");
    } else {
        debug!("No self-intersections found");
    }

    SelfIntersectionResult {
        has_intersections: final_count > 0,
        intersection_count: final_count,
        intersecting_pairs,
        faces_checked: face_count,
        truncated,
    }
}

/// Whether any two non-adjacent faces of `mesh` penetrate each other.
pub fn has_self_intersections(mesh: &Mesh) -> bool {
    !detect_self_intersections(mesh, &IntersectionParams::first_only()).is_clean()
}

#[inline]
fn shares_vertex(a: &[u32; 3], b: &[u32; 3]) -> bool {
    a.iter().any(|v| b.contains(v))
}

/// Separating axis test for penetrating triangles.
///
/// Projections that overlap by less than `epsilon` (scaled by the axis length)
/// count as separated, so triangles touching at a point or along an edge do
/// not intersect.
pub(crate) fn triangles_intersect(t1: &Triangle, t2: &Triangle, epsilon: f64) -> bool {
    let n1 = t1.normal_unnormalized();
    let n2 = t2.normal_unnormalized();

    // Degenerate triangles don't intersect meaningfully
    if n1.norm_squared() < epsilon * epsilon || n2.norm_squared() < epsilon * epsilon {
        return false;
    }

    let edges1 = [t1.v1 - t1.v0, t1.v2 - t1.v1, t1.v0 - t1.v2];
    let edges2 = [t2.v1 - t2.v0, t2.v2 - t2.v1, t2.v0 - t2.v2];

    let cross_normals = n1.cross(&n2);
    let is_coplanar =
        cross_normals.norm_squared() < epsilon * epsilon * n1.norm_squared() * n2.norm_squared();

    if is_coplanar {
        // Parallel planes apart from each other.
        if n1.dot(&(t2.v0 - t1.v0)).abs() > epsilon * n1.norm() {
            return false;
        }

        // In-plane edge normals of both triangles.
        let in_plane = edges1
            .iter()
            .map(|e| n1.cross(e))
            .chain(edges2.iter().map(|e| n2.cross(e)));
        for axis in in_plane {
            if axis.norm_squared() > epsilon * epsilon && separated_by_axis(&axis, t1, t2, epsilon)
            {
                return false;
            }
        }
        return true;
    }

    if separated_by_axis(&n1, t1, t2, epsilon) || separated_by_axis(&n2, t1, t2, epsilon) {
        return false;
    }

    for e1 in &edges1 {
        for e2 in &edges2 {
            let axis = e1.cross(e2);
            if axis.norm_squared() > epsilon * epsilon && separated_by_axis(&axis, t1, t2, epsilon)
            {
                return false;
            }
        }
    }

    true
}

fn separated_by_axis(axis: &Vector3<f64>, t1: &Triangle, t2: &Triangle, epsilon: f64) -> bool {
    let project = |t: &Triangle| {
        let p = [
            axis.dot(&t.v0.coords),
            axis.dot(&t.v1.coords),
            axis.dot(&t.v2.coords),
        ];
        (p[0].min(p[1]).min(p[2]), p[0].max(p[1]).max(p[2]))
    };
    let (min1, max1) = project(t1);
    let (min2, max2) = project(t2);

    let tolerance = epsilon * axis.norm();
    max1 - tolerance <= min2 || max2 - tolerance <= min1
}

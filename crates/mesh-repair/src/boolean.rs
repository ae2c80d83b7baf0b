//! Mesh boolean operations.
//!
//! A triangle splitting kernel working on closed, oriented meshes:
//!
//! 1. Candidate face pairs between the operands come from a BVH.
//! 2. Each non-coplanar pair that crosses yields an intersection segment.
//! 3. Every cut face is re-triangulated in its own plane with a constrained
//!    Delaunay triangulation that keeps the segments as edges.
//! 4. Each fragment is classified inside/outside the other operand by ray
//!    parity, and the fragments are assembled according to the operation.
//! 5. The result is welded back into an indexed mesh.
//!
//! Segment endpoints on a shared edge are computed from the edge endpoints
//! in a canonical order, so both faces adjacent to the edge are split at the
//! bit-identical point and the result welds shut.
//!
//! ```
//! use mesh_repair::boolean::KernelMesh;
//! use mesh_repair::Mesh;
//! use nalgebra::Point3;
//!
//! fn cube(min: f64, max: f64) -> Mesh {
//!     let p = |x: f64, y: f64, z: f64| Point3::new(x, y, z);
//!     Mesh::from_parts(
//!         vec![
//!             p(min, min, min), p(max, min, min), p(max, max, min), p(min, max, min),
//!             p(min, min, max), p(max, min, max), p(max, max, max), p(min, max, max),
//!         ],
//!         vec![
//!             [0, 2, 1], [0, 3, 2], [4, 5, 6], [4, 6, 7],
//!             [0, 1, 5], [0, 5, 4], [2, 3, 7], [2, 7, 6],
//!             [1, 2, 6], [1, 6, 5], [0, 4, 7], [0, 7, 3],
//!         ],
//!     )
//! }
//!
//! let mut a = KernelMesh::from_mesh(&cube(0.0, 2.0)).unwrap();
//! let b = KernelMesh::from_mesh(&cube(1.0, 3.0)).unwrap();
//! a.subtract(&b).unwrap();
//!
//! assert!(a.bounds_a_volume());
//! assert!((a.to_mesh().volume() - 7.0).abs() < 1e-9);
//! ```

use hashbrown::HashMap;
use nalgebra::{Point3, Vector3};
use rayon::prelude::*;
use spade::{ConstrainedDelaunayTriangulation, Point2, Triangulation};
use tracing::{debug, warn};

use crate::bvh::{Aabb, Bvh};
use crate::intersect::has_self_intersections;
use crate::repair::{
    remove_collapsed_faces, remove_degenerate_triangles, remove_unconnected_vertices,
    weld_vertices,
};
use crate::tracing_ext::OperationTimer;
use crate::validate::{ValidationOptions, bounds_a_volume, validate_mesh_data};
use crate::{Mesh, MeshError, MeshResult, Triangle};

/// Relative tolerance, scaled by the size of the operands.
const RELATIVE_EPS: f64 = 1e-10;

/// Fragments whose doubled area falls below this fraction of their squared
/// longest edge are dropped.
const SLIVER_RATIO: f64 = 1e-14;

/// Ray directions for inside tests. Deliberately not axis aligned.
const RAY_DIRECTIONS: [[f64; 3]; 3] = [
    [0.8017, 0.2974, 0.5185],
    [-0.3713, 0.8522, 0.3687],
    [0.2267, -0.4158, 0.8807],
];

/// Boolean operation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanOp {
    /// A ∪ B.
    Union,
    /// A − B.
    Difference,
}

impl BooleanOp {
    fn name(self) -> &'static str {
        match self {
            BooleanOp::Union => "union",
            BooleanOp::Difference => "difference",
        }
    }
}

/// A mesh prepared for the boolean kernel: validated, free of degenerate
/// faces, with coincident vertices welded.
#[derive(Debug, Clone, Default)]
pub struct KernelMesh {
    mesh: Mesh,
}

impl KernelMesh {
    /// Convert a mesh into the kernel representation.
    ///
    /// Fails on out-of-range indices and non-finite coordinates.
    pub fn from_mesh(mesh: &Mesh) -> MeshResult<Self> {
        validate_mesh_data(mesh, &ValidationOptions::default())?;

        let mut mesh = mesh.clone();
        if mesh.is_empty() {
            return Ok(Self { mesh: Mesh::new() });
        }

        let eps = tolerance_for(&mesh);
        remove_collapsed_faces(&mut mesh);
        weld_vertices(&mut mesh, eps);
        remove_degenerate_triangles(&mut mesh, eps * eps);
        remove_unconnected_vertices(&mut mesh);

        Ok(Self { mesh })
    }

    /// Whether there is no face.
    pub fn is_empty(&self) -> bool {
        self.mesh.is_empty()
    }

    /// Number of faces.
    pub fn face_count(&self) -> usize {
        self.mesh.face_count()
    }

    /// Borrow the underlying mesh.
    pub fn as_mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// Copy out the underlying mesh.
    pub fn to_mesh(&self) -> Mesh {
        self.mesh.clone()
    }

    /// Take the underlying mesh.
    pub fn into_mesh(self) -> Mesh {
        self.mesh
    }

    /// Whether any two non-adjacent faces penetrate each other.
    pub fn self_intersects(&self) -> bool {
        has_self_intersections(&self.mesh)
    }

    /// Closed, edge-manifold, consistently oriented, positive volume.
    pub fn bounds_a_volume(&self) -> bool {
        bounds_a_volume(&self.mesh)
    }

    /// Replace `self` with `self ∪ other`.
    pub fn union(&mut self, other: &KernelMesh) -> MeshResult<()> {
        if other.is_empty() {
            return Ok(());
        }
        if self.is_empty() {
            self.mesh = other.mesh.clone();
            return Ok(());
        }
        self.mesh = boolean_operation(&self.mesh, &other.mesh, BooleanOp::Union)?;
        Ok(())
    }

    /// Replace `self` with `self − other`.
    pub fn subtract(&mut self, other: &KernelMesh) -> MeshResult<()> {
        if self.is_empty() || other.is_empty() {
            return Ok(());
        }
        self.mesh = boolean_operation(&self.mesh, &other.mesh, BooleanOp::Difference)?;
        Ok(())
    }

    /// Ray-parity inside test against this mesh.
    ///
    /// Builds a fresh [`SolidQuery`]; keep one around for repeated queries.
    pub fn contains_point(&self, point: &Point3<f64>) -> bool {
        SolidQuery::new(&self.mesh).contains(point)
    }
}

/// Repeated inside tests against one closed mesh.
///
/// Each query is a majority vote of ray parities over skewed directions, so
/// points whose axis rays would run through shared edges still classify
/// correctly.
#[derive(Debug, Clone)]
pub struct SolidQuery {
    triangles: Vec<Triangle>,
    bvh: Bvh,
    eps: f64,
}

impl SolidQuery {
    pub fn new(mesh: &Mesh) -> Self {
        let triangles: Vec<Triangle> = mesh.triangles().collect();
        let bvh = Bvh::from_triangles(&triangles);
        Self {
            triangles,
            bvh,
            eps: tolerance_for(mesh),
        }
    }

    /// Whether `point` lies inside the mesh. Always false for an empty mesh.
    pub fn contains(&self, point: &Point3<f64>) -> bool {
        !self.triangles.is_empty() && is_inside(point, &self.triangles, &self.bvh, self.eps)
    }
}

impl From<KernelMesh> for Mesh {
    fn from(kernel: KernelMesh) -> Self {
        kernel.mesh
    }
}

/// Run a boolean operation on two closed meshes.
pub fn boolean_operation(a: &Mesh, b: &Mesh, op: BooleanOp) -> MeshResult<Mesh> {
    let _timer = OperationTimer::with_context("boolean", a.face_count() + b.face_count(), 0);

    let tris_a: Vec<Triangle> = a.triangles().collect();
    let tris_b: Vec<Triangle> = b.triangles().collect();
    let bvh_a = Bvh::from_triangles(&tris_a);
    let bvh_b = Bvh::from_triangles(&tris_b);

    let mut extent = Aabb::empty();
    for bounds in [bvh_a.bounds(), bvh_b.bounds()].into_iter().flatten() {
        extent.grow(&bounds);
    }
    let eps = RELATIVE_EPS * extent.diagonal().norm().max(1.0);

    // Intersection segments, collected per face of each operand.
    let (tris_a, tris_b) = (&tris_a, &tris_b);
    let pairs: Vec<(u32, u32, [Point3<f64>; 2])> = (0..tris_a.len())
        .into_par_iter()
        .flat_map_iter(|ia| {
            let query = bvh_a.triangle_box(ia as u32).expanded(eps);
            let ta = &tris_a[ia];
            bvh_b
                .query_box(&query)
                .into_iter()
                .filter_map(move |ib| {
                    intersection_segment(ta, &tris_b[ib as usize], eps)
                        .map(|seg| (ia as u32, ib, seg))
                })
                .collect::<Vec<_>>()
        })
        .collect();

    let mut segments_a: HashMap<u32, Vec<[Point3<f64>; 2]>> = HashMap::new();
    let mut segments_b: HashMap<u32, Vec<[Point3<f64>; 2]>> = HashMap::new();
    for (ia, ib, seg) in &pairs {
        segments_a.entry(*ia).or_default().push(*seg);
        segments_b.entry(*ib).or_default().push(*seg);
    }

    debug!(
        operation = op.name(),
        segments = pairs.len(),
        cut_a = segments_a.len(),
        cut_b = segments_b.len(),
        "Intersection segments computed"
    );

    // Cut points on a shared edge must split the neighbor as well, or the
    // result has T-junctions there.
    let points_a = edge_points(tris_a, &bvh_a, &segments_a, eps);
    let points_b = edge_points(tris_b, &bvh_b, &segments_b, eps);

    let fragments_a = split_all(tris_a, &segments_a, &points_a, eps, op)?;
    let fragments_b = split_all(tris_b, &segments_b, &points_b, eps, op)?;

    let keep_a = classify(&fragments_a, tris_b, &bvh_b, eps);
    let keep_b = classify(&fragments_b, tris_a, &bvh_a, eps);

    let mut soup = Vec::with_capacity(fragments_a.len() + fragments_b.len());
    for (tri, inside) in fragments_a.iter().zip(keep_a) {
        if !inside {
            soup.push(*tri);
        }
    }
    for (tri, inside) in fragments_b.iter().zip(keep_b) {
        match op {
            BooleanOp::Union if !inside => soup.push(*tri),
            BooleanOp::Difference if inside => soup.push(tri.flipped()),
            _ => {}
        }
    }

    let mut result = Mesh::from_triangles(&soup);
    weld_vertices(&mut result, eps);
    remove_collapsed_faces(&mut result);
    remove_unconnected_vertices(&mut result);

    debug!(
        operation = op.name(),
        faces = result.face_count(),
        vertices = result.vertex_count(),
        "Boolean finished"
    );

    Ok(result)
}

fn tolerance_for(mesh: &Mesh) -> f64 {
    let diagonal = mesh
        .bounds()
        .map(|(min, max)| (max - min).norm())
        .unwrap_or(0.0);
    RELATIVE_EPS * diagonal.max(1.0)
}

fn split_all(
    triangles: &[Triangle],
    segments: &HashMap<u32, Vec<[Point3<f64>; 2]>>,
    points: &HashMap<u32, Vec<Point3<f64>>>,
    eps: f64,
    op: BooleanOp,
) -> MeshResult<Vec<Triangle>> {
    let pieces: Vec<Vec<Triangle>> = triangles
        .par_iter()
        .enumerate()
        .map(|(idx, tri)| {
            let key = idx as u32;
            if !segments.contains_key(&key) && !points.contains_key(&key) {
                return Ok(vec![*tri]);
            }
            let segs = segments.get(&key).map_or(&[][..], Vec::as_slice);
            let extra = points.get(&key).map_or(&[][..], Vec::as_slice);
            split_triangle(tri, segs, extra, eps).map_err(|details| {
                warn!(face = idx, %details, "Failed to re-triangulate cut face");
                MeshError::boolean_failed(op.name(), details)
            })
        })
        .collect::<MeshResult<_>>()?;

    Ok(pieces.into_iter().flatten().collect())
}

/// Segment endpoints lying inside an edge of some triangle, keyed by that
/// triangle.
fn edge_points(
    triangles: &[Triangle],
    bvh: &Bvh,
    segments: &HashMap<u32, Vec<[Point3<f64>; 2]>>,
    eps: f64,
) -> HashMap<u32, Vec<Point3<f64>>> {
    let mut points: HashMap<u32, Vec<Point3<f64>>> = HashMap::new();
    for p in segments.values().flatten().flatten() {
        let query = Aabb::new(*p, *p).expanded(eps);
        for idx in bvh.query_box(&query) {
            if on_edge_interior(&triangles[idx as usize], p, eps) {
                points.entry(idx).or_default().push(*p);
            }
        }
    }
    points
}

/// Whether `p` lies on an edge of `tri` away from its corners.
fn on_edge_interior(tri: &Triangle, p: &Point3<f64>, eps: f64) -> bool {
    let corners = tri.vertices();
    if corners.iter().any(|c| (c - p).norm() <= eps) {
        return false;
    }
    (0..3).any(|i| {
        let (u, v) = (corners[i], corners[(i + 1) % 3]);
        let edge = v - u;
        let len2 = edge.norm_squared();
        if len2 <= eps * eps {
            return false;
        }
        let t = (p - u).dot(&edge) / len2;
        t > 0.0 && t < 1.0 && (u + edge * t - p).norm() <= eps
    })
}

/// Signed distances of a triangle's corners to the plane through `origin`
/// with normal `normal`.
fn plane_distances(tri: &Triangle, origin: &Point3<f64>, normal: &Vector3<f64>) -> [f64; 3] {
    tri.vertices().map(|v| normal.dot(&(v - origin)))
}

/// Point where the edge `(u, v)` crosses the plane. The edge endpoints are
/// put in lexicographic order first so both faces sharing the edge get the
/// same bits.
fn edge_crossing(u: Point3<f64>, du: f64, v: Point3<f64>, dv: f64) -> Point3<f64> {
    let (u, du, v, dv) = if lex_less(&u, &v) {
        (u, du, v, dv)
    } else {
        (v, dv, u, du)
    };
    let t = du / (du - dv);
    u + (v - u) * t
}

fn lex_less(a: &Point3<f64>, b: &Point3<f64>) -> bool {
    (a.x, a.y, a.z) < (b.x, b.y, b.z)
}

/// The chord a plane cuts from a triangle, given the corner distances.
fn plane_section(tri: &Triangle, dist: &[f64; 3], eps: f64) -> Option<[Point3<f64>; 2]> {
    let corners = tri.vertices();
    let mut points: Vec<Point3<f64>> = Vec::with_capacity(3);

    for (corner, d) in corners.iter().zip(dist) {
        if d.abs() <= eps {
            points.push(*corner);
        }
    }
    for i in 0..3 {
        let j = (i + 1) % 3;
        let (di, dj) = (dist[i], dist[j]);
        if (di > eps && dj < -eps) || (di < -eps && dj > eps) {
            points.push(edge_crossing(corners[i], di, corners[j], dj));
        }
    }

    match points.as_slice() {
        [p, q] if (q - p).norm() > eps => Some([*p, *q]),
        _ => None,
    }
}

/// Segment along which two non-coplanar triangles cross, if any.
fn intersection_segment(t1: &Triangle, t2: &Triangle, eps: f64) -> Option<[Point3<f64>; 2]> {
    let n1 = t1.normal()?;
    let n2 = t2.normal()?;

    let d1 = plane_distances(t1, &t2.v0, &n2);
    if d1.iter().all(|&d| d > eps) || d1.iter().all(|&d| d < -eps) {
        return None;
    }
    let d2 = plane_distances(t2, &t1.v0, &n1);
    if d2.iter().all(|&d| d > eps) || d2.iter().all(|&d| d < -eps) {
        return None;
    }
    // Coplanar pairs are left to the classifier.
    if d1.iter().all(|d| d.abs() <= eps) || d2.iter().all(|d| d.abs() <= eps) {
        return None;
    }

    let s1 = plane_section(t1, &d1, eps)?;
    let s2 = plane_section(t2, &d2, eps)?;

    let dir = n1.cross(&n2);
    let param = |p: &Point3<f64>| dir.dot(&p.coords);
    let sorted = |s: [Point3<f64>; 2]| {
        if param(&s[0]) <= param(&s[1]) {
            s
        } else {
            [s[1], s[0]]
        }
    };
    let s1 = sorted(s1);
    let s2 = sorted(s2);

    let start = if param(&s1[0]) >= param(&s2[0]) { s1[0] } else { s2[0] };
    let end = if param(&s1[1]) <= param(&s2[1]) { s1[1] } else { s2[1] };

    if param(&end) - param(&start) <= eps * dir.norm() || (end - start).norm() <= eps {
        return None;
    }
    Some([start, end])
}

/// Re-triangulate `tri` so every segment becomes a union of fragment edges
/// and every extra point becomes a fragment corner.
fn split_triangle(
    tri: &Triangle,
    segments: &[[Point3<f64>; 2]],
    points: &[Point3<f64>],
    eps: f64,
) -> Result<Vec<Triangle>, String> {
    let Some(normal) = tri.normal() else {
        return Ok(vec![*tri]);
    };

    // Drop the dominant normal axis and triangulate in the remaining two.
    let axis = normal.iamax();
    let (u_axis, v_axis) = match axis {
        0 => (1, 2),
        1 => (2, 0),
        _ => (0, 1),
    };
    let project = |p: &Point3<f64>| Point2::new(p[u_axis], p[v_axis]);

    let mut cdt = ConstrainedDelaunayTriangulation::<Point2<f64>>::new();
    let mut lifted: HashMap<usize, Point3<f64>> = HashMap::new();
    let mut insert = |cdt: &mut ConstrainedDelaunayTriangulation<Point2<f64>>,
                      p: &Point3<f64>| {
        let handle = cdt.insert(project(p)).map_err(|e| format!("{e:?}"))?;
        lifted.entry(handle.index()).or_insert(*p);
        Ok::<_, String>(handle)
    };

    for corner in tri.vertices() {
        insert(&mut cdt, &corner)?;
    }
    for p in points {
        insert(&mut cdt, p)?;
    }

    let mut skipped = 0usize;
    for [p, q] in segments {
        let from = insert(&mut cdt, p)?;
        let to = insert(&mut cdt, q)?;
        if from == to {
            continue;
        }
        if cdt.can_add_constraint(from, to) {
            cdt.add_constraint(from, to);
        } else {
            skipped += 1;
        }
    }
    if skipped > 0 {
        debug!(skipped, "Crossing constraints skipped");
    }

    let mut fragments = Vec::with_capacity(cdt.num_inner_faces());
    for face in cdt.inner_faces() {
        let [a, b, c] = face.vertices().map(|v| lifted.get(&v.fix().index()).copied());
        let (Some(a), Some(b), Some(c)) = (a, b, c) else {
            return Err("triangulation produced an unknown vertex".to_string());
        };

        let mut fragment = Triangle::new(a, b, c);
        let n = fragment.normal_unnormalized();
        let longest = fragment.max_edge_length();
        if n.norm() <= SLIVER_RATIO * longest * longest || longest <= eps {
            continue;
        }
        if n.dot(&normal) < 0.0 {
            fragment = fragment.flipped();
        }
        fragments.push(fragment);
    }

    Ok(fragments)
}

/// Inside flags for every fragment against the other operand.
fn classify(fragments: &[Triangle], other: &[Triangle], bvh: &Bvh, eps: f64) -> Vec<bool> {
    fragments
        .par_iter()
        .map(|tri| is_inside(&tri.centroid(), other, bvh, eps))
        .collect()
}

/// Majority vote of ray parities over a few skewed directions.
fn is_inside(point: &Point3<f64>, triangles: &[Triangle], bvh: &Bvh, eps: f64) -> bool {
    if let Some(bounds) = bvh.bounds()
        && !bounds.expanded(eps).contains(point)
    {
        return false;
    }

    let votes = RAY_DIRECTIONS
        .iter()
        .filter(|d| {
            let dir = Vector3::new(d[0], d[1], d[2]);
            let mut crossings = 0usize;
            bvh.ray_candidates(point, &dir, |idx| {
                if ray_hits_triangle(point, &dir, &triangles[idx as usize], eps) {
                    crossings += 1;
                }
            });
            crossings % 2 == 1
        })
        .count();

    votes * 2 > RAY_DIRECTIONS.len()
}

/// Möller–Trumbore, hits at `t > eps` only.
pub(crate) fn ray_hits_triangle(
    origin: &Point3<f64>,
    dir: &Vector3<f64>,
    tri: &Triangle,
    eps: f64,
) -> bool {
    let edge1 = tri.v1 - tri.v0;
    let edge2 = tri.v2 - tri.v0;
    let h = dir.cross(&edge2);
    let a = edge1.dot(&h);
    if a.abs() < 1e-14 {
        return false;
    }

    let f = 1.0 / a;
    let s = origin - tri.v0;
    let u = f * s.dot(&h);
    if !(0.0..=1.0).contains(&u) {
        return false;
    }

    let q = s.cross(&edge1);
    let v = f * dir.dot(&q);
    if v < 0.0 || u + v > 1.0 {
        return false;
    }

    f * edge2.dot(&q) > eps
}

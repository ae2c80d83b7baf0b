//! Geometric face identity and the trimming exclude mask.
//!
//! A face key depends only on where a triangle is and how it is wound, so
//! the same triangle can be recognized in a different mesh after a boolean
//! operation renumbered everything.

use hashbrown::HashSet;
use nalgebra::{Point3, Vector3};
use tracing::debug;

use mesh_repair::{Mesh, VertexFaceIndex};

use crate::drainhole::DrainHole;
use crate::interior::Interior;

/// Coordinates are snapped to this many integer steps per unit.
const KEY_SCALE: f64 = 1e6;

/// A triangle's area vector moved to its centroid, in snapped coordinates.
pub type FaceKey = [i128; 3];

/// Cavity faces deeper than this below the cavity surface are never part
/// of a hole wall.
const HOLE_WALL_MAX_DEPTH: f64 = -0.5;

fn snap(p: &Point3<f64>) -> [i128; 3] {
    [
        (p.x * KEY_SCALE).round() as i128,
        (p.y * KEY_SCALE).round() as i128,
        (p.z * KEY_SCALE).round() as i128,
    ]
}

/// Key of the triangle `[p0, p1, p2]`.
///
/// Invariant under cyclic rotation of the corners, distinct for the
/// reversed winding.
pub fn facekey(points: &[Point3<f64>; 3]) -> FaceKey {
    let [p0, p1, p2] = points.each_ref().map(snap);
    let a = [p0[0] - p2[0], p0[1] - p2[1], p0[2] - p2[2]];
    let b = [p1[0] - p2[0], p1[1] - p2[1], p1[2] - p2[2]];
    let cross = [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ];
    std::array::from_fn(|k| cross[k] + (p0[k] + p1[k] + p2[k]) / 3)
}

fn face_points(mesh: &Mesh, face: &[u32; 3]) -> [Point3<f64>; 3] {
    face.map(|v| mesh.position(v))
}

/// Set of face keys of one mesh.
#[derive(Debug, Clone, Default)]
pub struct FaceHash {
    keys: HashSet<FaceKey>,
}

impl FaceHash {
    /// Keys of every face of `mesh` as wound.
    pub fn new(mesh: &Mesh) -> Self {
        let keys = mesh
            .faces
            .iter()
            .map(|f| facekey(&face_points(mesh, f)))
            .collect();
        Self { keys }
    }

    /// Keys of the faces of an interior mesh as they appear once merged
    /// into the part, i.e. with reversed winding.
    pub fn from_interior(mesh: &Mesh) -> Self {
        let keys = mesh
            .faces
            .iter()
            .map(|&[a, b, c]| facekey(&face_points(mesh, &[c, b, a])))
            .collect();
        Self { keys }
    }

    pub fn contains(&self, key: &FaceKey) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

fn distance_to_segment(p: &Point3<f64>, a: &Point3<f64>, b: &Point3<f64>) -> f64 {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq == 0.0 {
        return (p - a).norm();
    }
    let t = ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    (p - (a + ab * t)).norm()
}

/// Whether a face with this centroid and unit normal looks like a piece
/// of the hole's cylinder wall.
fn on_hole_wall(hole: &DrainHole, centroid: &Point3<f64>, normal: &Vector3<f64>) -> bool {
    let steps = DrainHole::STEPS as f64;
    let end = hole.pos + hole.normal * hole.height;
    let off_wall = (distance_to_segment(centroid, &hole.pos, &end) - hole.radius).abs();

    off_wall < hole.radius / steps && hole.normal.dot(normal).abs() < 1.0 / steps
}

/// Mark the faces of `mesh` that trimming must leave alone.
///
/// Seeds are faces that came from the interior wall (recognized by face
/// key) and faces lying on the wall of a non-failed hole. Each seed also
/// protects its vertex-sharing neighbors and their neighbors.
pub fn create_exclude_mask(mesh: &Mesh, interior: &Interior, holes: &[DrainHole]) -> Vec<bool> {
    let interior_hash = FaceHash::from_interior(&interior.mesh);
    let field = interior.distance_field();
    let index = VertexFaceIndex::build(mesh.vertex_count(), &mesh.faces);
    let mut mask = vec![false; mesh.face_count()];

    let exclude_neighbors = |mask: &mut [bool], face: &[u32; 3]| {
        for neighbor in index.one_ring(face) {
            mask[neighbor as usize] = true;
            for second in index.one_ring(&mesh.faces[neighbor as usize]) {
                mask[second as usize] = true;
            }
        }
    };

    let mut seeds = 0usize;
    for face in &mesh.faces {
        let points = face_points(mesh, face);

        if interior_hash.contains(&facekey(&points)) {
            exclude_neighbors(&mut mask, face);
            seeds += 1;
            continue;
        }

        let centroid = Point3::from((points[0].coords + points[1].coords + points[2].coords) / 3.0);
        if field.is_some_and(|f| f.point_distance(&centroid) < HOLE_WALL_MAX_DEPTH) {
            continue;
        }
        let Some(normal) = (points[1] - points[0])
            .cross(&(points[2] - points[0]))
            .try_normalize(f64::EPSILON)
        else {
            continue;
        };

        if holes
            .iter()
            .filter(|h| !h.failed)
            .any(|h| on_hole_wall(h, &centroid, &normal))
        {
            exclude_neighbors(&mut mask, face);
            seeds += 1;
        }
    }

    debug!(
        seeds,
        excluded = mask.iter().filter(|&&m| m).count(),
        faces = mesh.face_count(),
        "Exclude mask built"
    );
    mask
}

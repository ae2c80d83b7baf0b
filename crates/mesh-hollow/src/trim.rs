//! Adaptive removal of triangles that reach into the cavity.
//!
//! Every face is bisected along its longest edge until its bounding bubble
//! can be classified against the interior. A face whose subdivision touches
//! the cavity is removed as a whole and only its outside fragments are
//! re-added.

use std::sync::{Mutex, PoisonError};
use std::sync::atomic::{AtomicBool, Ordering};

use nalgebra::Point3;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use mesh_repair::{Aabb, Mesh, OperationTimer, Triangle, Vertex};

use crate::distance::{DistanceField, TriangleBubble};
use crate::interior::Interior;

/// Counts from one trimming pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TrimStats {
    /// Original faces removed.
    pub removed: usize,
    /// Fragments appended.
    pub added: usize,
}

/// A node of the subdivision of one original face.
#[derive(Debug, Clone, Copy)]
struct DivFace {
    verts: [Point3<f64>; 3],
    /// Index of the original face; `None` for fragments.
    face_id: Option<usize>,
    /// Original face this node descends from.
    parent: usize,
}

impl DivFace {
    fn root(face_id: usize, verts: [Point3<f64>; 3]) -> Self {
        Self {
            verts,
            face_id: Some(face_id),
            parent: face_id,
        }
    }

    /// Split at the midpoint of the longest edge. Both children keep the
    /// parent's winding.
    fn split(&self) -> [DivFace; 2] {
        let v = &self.verts;
        let edges = [v[0] - v[1], v[1] - v[2], v[2] - v[0]];
        let mut order = [0usize, 1, 2];
        order.sort_by(|&a, &b| edges[b].norm_squared().total_cmp(&edges[a].norm_squared()));

        let [longest, second, third] = order;
        let mid = nalgebra::center(&v[longest], &v[(longest + 1) % 3]);
        let parent = self.face_id.unwrap_or(self.parent);
        let child = |edge: usize| DivFace {
            verts: [mid, v[edge], v[(edge + 1) % 3]],
            face_id: None,
            parent,
        };
        [child(second), child(third)]
    }
}

/// Per-root outcome shared across threads.
struct MeshMods {
    to_remove: Vec<AtomicBool>,
    new_triangles: Mutex<Vec<[Point3<f64>; 3]>>,
}

/// Classify one node. Returns true if it must be divided further.
fn visit(
    face: &DivFace,
    field: &DistanceField<'_>,
    to_remove: &[AtomicBool],
    leaves: &mut Vec<[Point3<f64>; 3]>,
) -> bool {
    let bubble = TriangleBubble::from_points(&face.verts);
    let d = field.bubble_distance(&bubble);
    if d.is_nan() {
        return true;
    }
    let r = bubble.radius;

    if d - r < 0.0 {
        if let Some(id) = face.face_id {
            to_remove[id].store(true, Ordering::Relaxed);
        }
        to_remove[face.parent].store(true, Ordering::Relaxed);

        // Whatever is left outside lies within the wall.
        return r + d >= field.thickness();
    }

    if face.face_id.is_none() {
        leaves.push(face.verts);
    }
    false
}

/// Subdivide one original face with an explicit work stack.
fn trim_face(root: DivFace, field: &DistanceField<'_>, mods: &MeshMods) {
    let mut leaves = Vec::new();
    let mut stack = Vec::new();

    if visit(&root, field, &mods.to_remove, &mut leaves) {
        stack.extend(root.split());
    }
    while let Some(face) = stack.pop() {
        if visit(&face, field, &mods.to_remove, &mut leaves) {
            stack.extend(face.split());
        }
    }

    // An untouched original still represents its whole area.
    if !leaves.is_empty() && mods.to_remove[root.parent].load(Ordering::Relaxed) {
        mods.new_triangles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(leaves);
    }
}

/// Replace triangles that overlap the interior cavity by their outside
/// fragments.
///
/// Faces flagged in `exclude_mask` are kept verbatim; the mask is ignored
/// unless it has one entry per face. Kept faces retain their vertex
/// indices and come first, fragments are appended with fresh vertices.
/// No-op when the interior's grid was released.
pub fn remove_inside_triangles(
    mesh: &mut Mesh,
    interior: &Interior,
    exclude_mask: Option<&[bool]>,
) -> TrimStats {
    let Some(field) = interior.distance_field() else {
        warn!("Interior grid was released, skipping trimming");
        return TrimStats::default();
    };
    let Some(cavity) = Aabb::from_mesh(&interior.mesh) else {
        return TrimStats::default();
    };
    let _timer =
        OperationTimer::with_context("remove_inside_triangles", mesh.face_count(), mesh.vertex_count());

    // Faces further than the narrow band from the cavity box cannot touch it.
    let reach = cavity.expanded(interior.full_narrowb);

    let exclude_mask = exclude_mask.filter(|mask| {
        let usable = mask.len() == mesh.face_count();
        if !usable {
            warn!(
                mask = mask.len(),
                faces = mesh.face_count(),
                "Exclude mask does not match the mesh, ignoring it"
            );
        }
        usable
    });
    let is_excluded = |face_id: usize| exclude_mask.is_some_and(|mask| mask[face_id]);

    let mods = MeshMods {
        to_remove: (0..mesh.face_count()).map(|_| AtomicBool::new(false)).collect(),
        new_triangles: Mutex::new(Vec::new()),
    };

    (0..mesh.face_count()).into_par_iter().for_each(|face_id| {
        if is_excluded(face_id) {
            return;
        }
        let [a, b, c] = mesh.faces[face_id];
        let verts = [mesh.position(a), mesh.position(b), mesh.position(c)];
        if verts.iter().any(|p| !p.coords.iter().all(|x| x.is_finite())) {
            return;
        }
        if !reach.intersects(&Aabb::from_triangle(&Triangle::new(verts[0], verts[1], verts[2]))) {
            return;
        }
        trim_face(DivFace::root(face_id, verts), &field, &mods);
    });

    let to_remove: Vec<bool> = mods.to_remove.into_iter().map(AtomicBool::into_inner).collect();
    let new_triangles = mods
        .new_triangles
        .into_inner()
        .unwrap_or_else(PoisonError::into_inner);

    let removed = to_remove.iter().filter(|&&r| r).count();
    let mut faces: Vec<[u32; 3]> = mesh
        .faces
        .iter()
        .zip(&to_remove)
        .filter(|&(_, &r)| !r)
        .map(|(f, _)| *f)
        .collect();

    let mut added = 0;
    for verts in &new_triangles {
        if Triangle::new(verts[0], verts[1], verts[2]).normal().is_none() {
            continue;
        }
        match append_fragment(&mut mesh.vertices, verts) {
            Some(face) => {
                faces.push(face);
                added += 1;
            }
            None => {
                warn!(
                    vertices = mesh.vertices.len(),
                    "Vertex index space exhausted, remaining fragments dropped"
                );
                break;
            }
        }
    }
    mesh.faces = faces;

    info!(removed, added, "Trimming: triangles removed and added");
    TrimStats { removed, added }
}

/// Push the corners of one fragment and return its face, or `None` when
/// they would not fit in 32-bit indices.
fn append_fragment(vertices: &mut Vec<Vertex>, verts: &[Point3<f64>; 3]) -> Option<[u32; 3]> {
    let base = u32::try_from(vertices.len()).ok()?;
    let last = base.checked_add(2)?;
    vertices.extend(verts.iter().map(|p| Vertex::new(*p)));
    Some([base, base + 1, last])
}

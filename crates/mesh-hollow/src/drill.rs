//! Drilling drain holes into a hollowed part.

use std::fmt;

use bitflags::bitflags;
use nalgebra::Vector3;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use mesh_repair::{
    Aabb, Bvh, KernelMesh, Mesh, MeshResult, OperationTimer, has_self_intersections,
    remove_unconnected_vertices,
};

use crate::drainhole::{DrainHole, EPSILON};
use crate::facehash::create_exclude_mask;
use crate::hollow::HollowFlags;
use crate::interior::Interior;
use crate::trim::remove_inside_triangles;

bitflags! {
    /// Outcome of [`hollow_mesh_and_drill`]. Bits are independent.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct DrillStatus: u32 {
        /// The part does not bound a volume. Drilling was still attempted.
        const FAULTY_MESH = 0b0000_0001;
        /// The merged holes do not bound a volume. Drilling was still attempted.
        const FAULTY_HOLES = 0b0000_0010;
        /// The part was left untouched.
        const DRILLING_FAILED = 0b0000_0100;
    }
}

impl DrillStatus {
    pub const OK: Self = Self::empty();

    /// Whether the drilled mesh can be used.
    pub fn is_applied(&self) -> bool {
        !self.contains(Self::DRILLING_FAILED)
    }
}

impl fmt::Display for DrillStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "ok");
        }
        let names: Vec<&str> = self.iter_names().map(|(name, _)| name).collect();
        write!(f, "{}", names.join(" | "))
    }
}

/// Copy of `hole` with position and axis nudged by less than `EPSILON`
/// per component, so hole caps never lie exactly on part faces.
fn jittered(hole: &DrainHole, rng: &mut impl Rng) -> DrainHole {
    let mut nudge = || Vector3::from_fn(|_, _| rng.gen_range(0.0..EPSILON));
    let mut hole = hole.clone();
    hole.normal = (hole.normal + nudge()).normalize();
    hole.pos += nudge();
    hole
}

/// Faces of `mesh` whose boxes overlap the box of `hole_mesh`, with
/// unused vertices dropped.
fn shell_patch(mesh: &Mesh, bvh: &Bvh, hole_mesh: &Mesh) -> Mesh {
    let Some(bounds) = Aabb::from_mesh(hole_mesh) else {
        return Mesh::new();
    };
    let mut patch = Mesh::new();
    patch.vertices = mesh.vertices.clone();
    patch.faces = bvh
        .query_box(&bounds)
        .into_iter()
        .map(|fi| mesh.faces[fi as usize])
        .collect();
    remove_unconnected_vertices(&mut patch);
    patch
}

/// Cut `holes` into `mesh`, then trim what the cuts exposed of the
/// cavity.
///
/// Every hole is drilled at a randomly jittered pose drawn from `rng`. A
/// hole that misses the part, or whose neighborhood self-intersects, is
/// marked `failed`, reported to `on_hole_fail` and skipped. When the
/// result has [`DrillStatus::DRILLING_FAILED`] set, `mesh` is unchanged.
pub fn hollow_mesh_and_drill(
    mesh: &mut Mesh,
    interior: &Interior,
    holes: &mut [DrainHole],
    rng: &mut impl Rng,
    on_hole_fail: impl FnMut(usize),
) -> DrillStatus {
    cut_holes(mesh, interior, holes, rng, true, on_hole_fail)
}

/// Drilling as the builder runs it. The part is trimmed only with
/// [`HollowFlags::REMOVE_INSIDE_TRIANGLES`], and then also when drilling
/// fails and leaves the part uncut.
pub(crate) fn drill_holes(
    mesh: &mut Mesh,
    interior: &Interior,
    holes: &mut [DrainHole],
    rng: &mut impl Rng,
    flags: HollowFlags,
    on_hole_fail: impl FnMut(usize),
) -> DrillStatus {
    let trim = flags.contains(HollowFlags::REMOVE_INSIDE_TRIANGLES);
    let status = cut_holes(mesh, interior, holes, rng, trim, on_hole_fail);
    if trim && !status.is_applied() {
        warn!(%status, "Drilling failed, trimming the undrilled part");
        trim_drilled(mesh, interior, &[]);
    }
    status
}

fn cut_holes(
    mesh: &mut Mesh,
    interior: &Interior,
    holes: &mut [DrainHole],
    rng: &mut impl Rng,
    trim: bool,
    mut on_hole_fail: impl FnMut(usize),
) -> DrillStatus {
    let _timer = OperationTimer::with_context("drill", mesh.face_count(), mesh.vertex_count());
    let bvh = Bvh::build(mesh);
    let mut holes_mesh = KernelMesh::default();

    for (i, hole) in holes.iter_mut().enumerate() {
        let hole_mesh = jittered(hole, rng).to_mesh();
        let patch = shell_patch(mesh, &bvh, &hole_mesh);

        if patch.is_empty() || has_self_intersections(&patch) {
            warn!(
                hole = i,
                patch_faces = patch.face_count(),
                "Drain hole skipped: no clean surface to drill"
            );
            hole.failed = true;
            on_hole_fail(i);
            continue;
        }

        let merged = KernelMesh::from_mesh(&hole_mesh).and_then(|h| holes_mesh.union(&h));
        if let Err(e) = merged {
            warn!(hole = i, error = %e, "Failed to merge drain hole");
            return DrillStatus::DRILLING_FAILED;
        }
    }

    let mut status = DrillStatus::OK;
    if holes_mesh.self_intersects() {
        status |= DrillStatus::DRILLING_FAILED;
    }

    let shell = match KernelMesh::from_mesh(mesh) {
        Ok(shell) => shell,
        Err(e) => {
            warn!(error = %e, "Part cannot be drilled");
            return status | DrillStatus::DRILLING_FAILED;
        }
    };
    if !shell.bounds_a_volume() {
        status |= DrillStatus::FAULTY_MESH;
    }
    if !holes_mesh.is_empty() && !holes_mesh.bounds_a_volume() {
        status |= DrillStatus::FAULTY_HOLES;
    }
    if status.contains(DrillStatus::DRILLING_FAILED) {
        warn!(%status, "Drain holes intersect each other, part left as is");
        return status;
    }

    if !holes_mesh.is_empty() {
        match subtract(shell, &holes_mesh) {
            Ok(drilled) => *mesh = drilled,
            Err(e) => {
                warn!(error = %e, "Drilling failed");
                return status | DrillStatus::DRILLING_FAILED;
            }
        }
    }

    if trim {
        trim_drilled(mesh, interior, holes);
    }

    info!(
        %status,
        drilled = holes.iter().filter(|h| !h.failed).count(),
        failed = holes.iter().filter(|h| h.failed).count(),
        "Drilling finished"
    );
    status
}

/// Trim part triangles reaching into the cavity, keeping the cavity walls
/// and hole walls of the merged mesh as they are.
fn trim_drilled(mesh: &mut Mesh, interior: &Interior, holes: &[DrainHole]) {
    let exclude_mask = create_exclude_mask(mesh, interior, holes);
    let stats = remove_inside_triangles(mesh, interior, Some(&exclude_mask));
    debug!(removed = stats.removed, added = stats.added, "Drilled part trimmed");
}

fn subtract(mut shell: KernelMesh, holes: &KernelMesh) -> MeshResult<Mesh> {
    shell.subtract(holes)?;
    Ok(shell.into_mesh())
}

//! Merging the interior cavity into the part.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use mesh_repair::Mesh;
use mesh_repair::progress::JobControl;

use crate::config::HollowingConfig;
use crate::error::HollowResult;
use crate::interior::{Interior, generate_interior};
use crate::trim::{TrimStats, remove_inside_triangles};

bitflags! {
    /// Options for [`hollow_mesh`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct HollowFlags: u32 {
        /// Trim part triangles that reach into the cavity before merging.
        const REMOVE_INSIDE_TRIANGLES = 0b0000_0001;
    }
}

/// Reverse the winding of every triangle.
pub fn swap_normals(mesh: &mut Mesh) {
    mesh.flip_faces();
}

/// Add the interior cavity to `mesh` as inward-facing walls.
///
/// With [`HollowFlags::REMOVE_INSIDE_TRIANGLES`], part triangles that
/// overlap the cavity are trimmed first; this needs the interior's grid.
/// Nothing happens if either mesh is empty.
pub fn hollow_mesh(mesh: &mut Mesh, interior: &Interior, flags: HollowFlags) -> TrimStats {
    if mesh.is_empty() || interior.is_empty() {
        debug!("Nothing to hollow");
        return TrimStats::default();
    }

    let stats = if flags.contains(HollowFlags::REMOVE_INSIDE_TRIANGLES) && interior.grid().is_some() {
        remove_inside_triangles(mesh, interior, None)
    } else {
        TrimStats::default()
    };

    let mut cavity = interior.mesh.clone();
    swap_normals(&mut cavity);
    mesh.merge(&cavity);

    info!(
        cavity_faces = cavity.face_count(),
        total_faces = mesh.face_count(),
        "Interior merged"
    );
    stats
}

/// Generate the interior from `config` and hollow `mesh` with it.
///
/// No-op when hollowing is disabled or the cavity comes out empty.
pub fn hollow_mesh_with_config(
    mesh: &mut Mesh,
    config: &HollowingConfig,
    flags: HollowFlags,
) -> HollowResult<()> {
    if !config.enabled {
        debug!("Hollowing disabled");
        return Ok(());
    }
    if let Some(interior) = generate_interior(mesh, config, &JobControl::none())? {
        hollow_mesh(mesh, &interior, flags);
    }
    Ok(())
}

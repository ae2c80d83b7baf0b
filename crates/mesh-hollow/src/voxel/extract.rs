//! Isosurface extraction using Surface Nets.

use fast_surface_nets::{SurfaceNetsBuffer, ndshape::RuntimeShape, surface_nets};
use tracing::{debug, info};

use mesh_repair::{Mesh, Vertex};

use crate::error::{HollowError, HollowResult};

use super::grid::{VoxelField, VoxelGrid};

/// Extract the `iso` level set of a grid as an outward-oriented mesh.
///
/// `adaptivity` must lie in `[0, 1]`. The dense engine always produces a
/// uniform tessellation, so any valid value gives the same result.
pub fn grid_to_mesh(grid: &VoxelGrid, iso: f64, adaptivity: f64) -> HollowResult<Mesh> {
    if !(0.0..=1.0).contains(&adaptivity) {
        return Err(HollowError::invalid_config(
            "adaptivity",
            adaptivity,
            "must be within [0, 1]",
        ));
    }
    let mesh = level_set(grid.field(), iso)?;

    info!(
        vertices = mesh.vertex_count(),
        faces = mesh.face_count(),
        iso,
        "Isosurface mesh created"
    );
    Ok(mesh)
}

pub(super) fn level_set(field: &VoxelField, iso: f64) -> HollowResult<Mesh> {
    // Surface nets needs a positive border to close the surface.
    let padded_dims = field.dims.map(|d| d + 2);
    let padded_size = padded_dims[0] * padded_dims[1] * padded_dims[2];
    let mut padded_sdf = vec![1000.0f32; padded_size];

    let iso = iso as f32;
    for z in 0..field.dims[2] {
        for y in 0..field.dims[1] {
            for x in 0..field.dims[0] {
                let dst = (x + 1)
                    + (y + 1) * padded_dims[0]
                    + (z + 1) * padded_dims[0] * padded_dims[1];
                padded_sdf[dst] = field.values[field.linearize(x, y, z)] - iso;
            }
        }
    }

    let shape = RuntimeShape::<u32, 3>::new(padded_dims.map(|d| d as u32));
    let mut buffer = SurfaceNetsBuffer::default();
    surface_nets(
        &padded_sdf,
        &shape,
        [0, 0, 0],
        padded_dims.map(|d| d as u32 - 1),
        &mut buffer,
    );

    if buffer.indices.is_empty() {
        return Err(HollowError::EmptyIsosurface);
    }

    debug!(
        positions = buffer.positions.len(),
        indices = buffer.indices.len(),
        "Surface nets complete"
    );

    let mut mesh = Mesh::with_capacity(buffer.positions.len(), buffer.indices.len() / 3);
    // Padded index p is sample p - 1, whose center is half a voxel in.
    mesh.vertices.extend(buffer.positions.iter().map(|pos| {
        let [x, y, z] = pos.map(|c| (f64::from(c) - 0.5) * field.voxel_size);
        Vertex::from_coords(field.origin.x + x, field.origin.y + y, field.origin.z + z)
    }));
    mesh.faces
        .extend(buffer.indices.chunks_exact(3).map(|c| [c[0], c[1], c[2]]));

    if mesh.signed_volume() < 0.0 {
        mesh.flip_faces();
    }

    Ok(mesh)
}

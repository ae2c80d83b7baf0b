//! Fixtures shared by unit tests.

use nalgebra::Point3;

use mesh_repair::{Mesh, Vertex};

use crate::interior::Interior;
use crate::voxel::{VoxelField, VoxelGrid};

/// Axis-aligned box with outward-facing triangles.
pub fn cuboid(min: [f64; 3], max: [f64; 3]) -> Mesh {
    let mut mesh = Mesh::new();
    for z in [min[2], max[2]] {
        for y in [min[1], max[1]] {
            for x in [min[0], max[0]] {
                mesh.vertices.push(Vertex::from_coords(x, y, z));
            }
        }
    }
    mesh.faces.extend([
        [0, 2, 1], [1, 2, 3],
        [4, 5, 6], [5, 7, 6],
        [0, 1, 4], [1, 5, 4],
        [2, 6, 3], [3, 6, 7],
        [0, 4, 2], [2, 4, 6],
        [1, 3, 5], [3, 7, 5],
    ]);
    mesh
}

/// Cube spanning `[0, size]` on every axis.
pub fn cube(size: f64) -> Mesh {
    cuboid([0.0; 3], [size; 3])
}

/// Interior over a 10mm grid holding `z - 5`, with a 1mm wall: the cavity
/// is everything below z = 4.
pub fn plane_interior() -> Interior {
    let mut field = VoxelField {
        dims: [10, 10, 10],
        origin: Point3::origin(),
        voxel_size: 1.0,
        values: vec![0.0; 1000],
        exterior_band: 5.0,
        interior_band: 5.0,
    };
    for idx in 0..field.total_voxels() {
        let [x, y, z] = field.delinearize(idx);
        field.values[idx] = (field.voxel_center(x, y, z).z - 5.0) as f32;
    }
    let cavity = cuboid([0.0, 0.0, 0.0], [10.0, 10.0, 4.0]);
    Interior::new(cavity, Some(VoxelGrid::new(field)), -1.0, 1.0, 2.0)
}

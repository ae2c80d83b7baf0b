//! Grid construction, dilation and redistancing.

use mesh_to_sdf::{Grid, SignMethod, Topology, generate_grid_sdf};
use nalgebra::{Point3, Vector3};
use rayon::prelude::*;
use tracing::{debug, info};

use mesh_repair::{Mesh, SolidQuery};

use crate::error::{HollowError, HollowResult};

use super::extract::level_set;
use super::grid::{VoxelField, VoxelGrid};

/// Voxel budget applied to every grid the engine allocates.
pub const DEFAULT_MAX_VOXELS: usize = 50_000_000;

/// Parameters for [`mesh_to_grid`].
#[derive(Debug, Clone)]
pub struct MeshToGridParams {
    /// Voxels per world unit.
    pub voxel_scale: f64,
    /// Valid band outside the surface, in voxels.
    pub exterior_bandwidth: f32,
    /// Valid band inside the surface, in voxels.
    pub interior_bandwidth: f32,
    /// Maximum number of voxels before error (memory safety).
    pub max_voxels: usize,
}

impl Default for MeshToGridParams {
    fn default() -> Self {
        Self {
            voxel_scale: 1.0,
            exterior_bandwidth: 3.0,
            interior_bandwidth: 3.0,
            max_voxels: DEFAULT_MAX_VOXELS,
        }
    }
}

/// Sample the signed distance of a closed mesh on a new grid.
///
/// The grid covers the mesh bounds padded by the exterior band plus one
/// voxel. Values outside the bands are clamped.
pub fn mesh_to_grid(mesh: &Mesh, params: &MeshToGridParams) -> HollowResult<VoxelGrid> {
    if !params.voxel_scale.is_finite() || params.voxel_scale <= 0.0 {
        return Err(HollowError::invalid_config(
            "voxel_scale",
            params.voxel_scale,
            "must be finite and > 0",
        ));
    }
    let (min, max) = mesh.bounds().ok_or(HollowError::EmptyMesh)?;
    if mesh.faces.is_empty() {
        return Err(HollowError::EmptyMesh);
    }

    let voxel_size = 1.0 / params.voxel_scale;
    let padding = (f64::from(params.exterior_bandwidth.max(0.0)) + 1.0) * voxel_size;
    let origin = min - Vector3::repeat(padding);
    let extent = (max - min) + Vector3::repeat(2.0 * padding);
    let dims = [
        ((extent.x / voxel_size).ceil() as usize).max(1),
        ((extent.y / voxel_size).ceil() as usize).max(1),
        ((extent.z / voxel_size).ceil() as usize).max(1),
    ];
    check_budget(dims, params.max_voxels)?;

    info!(
        dims = ?dims,
        total = dims[0] * dims[1] * dims[2],
        voxel_size,
        "Creating voxel grid"
    );

    let exterior_band = params.exterior_bandwidth * voxel_size as f32;
    let interior_band = params.interior_bandwidth * voxel_size as f32;
    let mut field = VoxelField {
        dims,
        origin,
        voxel_size,
        values: sample_mesh_sdf(mesh, dims, origin, voxel_size, SignMethod::Normal),
        exterior_band,
        interior_band,
    };

    // Cell centers line up with face diagonals on axis-aligned parts, where
    // axis ray parity miscounts. Signs come from skewed rays instead.
    let solid = SolidQuery::new(mesh);
    let signs: Vec<bool> = (0..field.values.len())
        .into_par_iter()
        .map(|idx| {
            let [x, y, z] = field.delinearize(idx);
            solid.contains(&field.voxel_center(x, y, z))
        })
        .collect();
    field
        .values
        .par_iter_mut()
        .zip(signs)
        .for_each(|(v, inside)| {
            let magnitude = v.abs();
            let signed = if inside { -magnitude } else { magnitude };
            *v = signed.clamp(-interior_band, exterior_band);
        });

    Ok(VoxelGrid::new(field))
}

/// Widen the valid band by world distances `outer_range` and `inner_range`.
///
/// The grid is padded so the widened exterior band fits. Distances are
/// rebuilt from the zero level set.
pub fn dilate(grid: &VoxelGrid, outer_range: f64, inner_range: f64) -> HollowResult<VoxelGrid> {
    let field = grid.field();
    let outer = outer_range.max(0.0);
    let inner = inner_range.max(0.0);
    if outer == 0.0 && inner == 0.0 {
        return Ok(grid.clone());
    }

    let pad = (outer / field.voxel_size).ceil() as usize;
    debug!(outer, inner, pad, "Dilating grid");

    let rebuilt = rebuild(
        field,
        0.0,
        field.exterior_band + outer as f32,
        field.interior_band + inner as f32,
        pad,
    )?;
    Ok(VoxelGrid::new(rebuilt))
}

/// Re-level the field so that `target_iso` becomes the zero level.
///
/// The result carries true distances to the `target_iso` level set within
/// `band_out`/`band_in` voxels.
pub fn redistance(
    grid: &VoxelGrid,
    target_iso: f64,
    band_out: f32,
    band_in: f32,
) -> HollowResult<VoxelGrid> {
    let field = grid.field();
    let voxel_size = field.voxel_size as f32;
    debug!(target_iso, band_out, band_in, "Redistancing grid");

    let rebuilt = rebuild(
        field,
        target_iso,
        band_out * voxel_size,
        band_in * voxel_size,
        0,
    )?;
    Ok(VoxelGrid::new(rebuilt))
}

/// Distances to the `iso` level set of `field` on a grid grown by `pad`
/// voxels per side. Signs come from the old field.
fn rebuild(
    field: &VoxelField,
    iso: f64,
    exterior_band: f32,
    interior_band: f32,
    pad: usize,
) -> HollowResult<VoxelField> {
    let surface = level_set(field, iso)?;

    let dims = field.dims.map(|d| d + 2 * pad);
    check_budget(dims, DEFAULT_MAX_VOXELS.max(field.total_voxels()))?;
    let voxel_size = field.voxel_size;
    let origin = field.origin - Vector3::repeat(pad as f64 * voxel_size);

    let unsigned = sample_mesh_sdf(&surface, dims, origin, voxel_size, SignMethod::Normal);

    let pad = pad as i64;
    let iso = iso as f32;
    let mut rebuilt = VoxelField {
        dims,
        origin,
        voxel_size,
        values: Vec::new(),
        exterior_band,
        interior_band,
    };
    rebuilt.values = (0..unsigned.len())
        .into_par_iter()
        .map(|idx| {
            let [x, y, z] = rebuilt.delinearize(idx);
            let old = field.value(x as i64 - pad, y as i64 - pad, z as i64 - pad) - iso;
            let magnitude = unsigned[idx].abs();
            let signed = if old < 0.0 { -magnitude } else { magnitude };
            signed.clamp(-interior_band, exterior_band)
        })
        .collect();

    Ok(rebuilt)
}

fn check_budget(dims: [usize; 3], max_voxels: usize) -> HollowResult<()> {
    let total = dims[0] * dims[1] * dims[2];
    if total > max_voxels {
        return Err(HollowError::grid_too_large(dims, max_voxels));
    }
    Ok(())
}

/// Signed distance of `mesh` at every cell center, X varying fastest.
fn sample_mesh_sdf(
    mesh: &Mesh,
    dims: [usize; 3],
    origin: Point3<f64>,
    voxel_size: f64,
    sign: SignMethod,
) -> Vec<f32> {
    let vertices: Vec<[f32; 3]> = mesh
        .vertices
        .iter()
        .map(|v| {
            [
                v.position.x as f32,
                v.position.y as f32,
                v.position.z as f32,
            ]
        })
        .collect();
    let indices: Vec<u32> = mesh.faces.iter().flat_map(|f| f.iter().copied()).collect();

    let first_cell = origin + Vector3::repeat(0.5 * voxel_size);
    let size = voxel_size as f32;
    let grid = Grid::new(
        [first_cell.x as f32, first_cell.y as f32, first_cell.z as f32],
        [size, size, size],
        dims,
    );

    let sdf = generate_grid_sdf(
        &vertices,
        Topology::TriangleList(Some(&indices)),
        &grid,
        sign,
    );

    // mesh_to_sdf stores Z fastest.
    let [nx, ny, _] = dims;
    (0..dims[0] * dims[1] * dims[2])
        .into_par_iter()
        .map(|idx| {
            let z = idx / (nx * ny);
            let rem = idx % (nx * ny);
            sdf[grid.get_cell_idx(&[rem % nx, rem / nx, z])]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use mesh_repair::Vertex;

    fn create_cube(size: f64) -> Mesh {
        let mut mesh = Mesh::new();
        for z in [0.0, size] {
            for y in [0.0, size] {
                for x in [0.0, size] {
                    mesh.vertices.push(Vertex::from_coords(x, y, z));
                }
            }
        }
        let faces = [
            [0, 2, 1], [1, 2, 3],
            [4, 5, 6], [5, 7, 6],
            [0, 1, 4], [1, 5, 4],
            [2, 6, 3], [3, 6, 7],
            [0, 4, 2], [2, 4, 6],
            [1, 3, 5], [3, 7, 5],
        ];
        mesh.faces.extend(faces);
        mesh
    }

    fn params(voxel_scale: f64) -> MeshToGridParams {
        MeshToGridParams {
            voxel_scale,
            ..Default::default()
        }
    }

    #[test]
    fn test_grid_construction() {
        let grid = mesh_to_grid(&create_cube(10.0), &params(1.0)).unwrap();
        // 10mm cube + 4 voxels of padding on each side
        assert_eq!(grid.dims(), [18, 18, 18]);
        assert_relative_eq!(grid.field().exterior_band, 3.0);
    }

    #[test]
    fn test_grid_values_are_clamped_signed_distances() {
        let grid = mesh_to_grid(&create_cube(10.0), &params(2.0)).unwrap();
        let center = grid.sample(&Point3::new(5.0, 5.0, 5.0));
        assert_relative_eq!(center, -1.5, epsilon = 1e-4);

        let near_wall = grid.sample(&Point3::new(5.0, 5.0, 9.25));
        assert_relative_eq!(near_wall, -0.75, epsilon = 0.05);

        let outside = grid.sample(&Point3::new(5.0, 5.0, 10.5));
        assert_relative_eq!(outside, 0.5, epsilon = 0.05);
    }

    #[test]
    fn test_deep_interior_is_never_positive() {
        let grid = mesh_to_grid(&create_cube(10.0), &params(2.0)).unwrap();
        let field = grid.field();
        let mut deep = 0;
        for idx in 0..field.total_voxels() {
            let [x, y, z] = field.delinearize(idx);
            let c = field.voxel_center(x, y, z);
            let depth = [c.x, c.y, c.z, 10.0 - c.x, 10.0 - c.y, 10.0 - c.z]
                .into_iter()
                .fold(f64::INFINITY, f64::min);
            if depth > 1.0 {
                deep += 1;
                assert!(field.values[idx] < 0.0, "cell {:?} at depth {depth}", [x, y, z]);
            }
        }
        assert_eq!(deep, 16 * 16 * 16);
        assert_relative_eq!(grid.sample(&Point3::new(5.0, 5.0, 5.0)), -1.5, epsilon = 1e-4);
    }

    #[test]
    fn test_grid_too_large() {
        let err = mesh_to_grid(
            &create_cube(10.0),
            &MeshToGridParams {
                voxel_scale: 10.0,
                max_voxels: 1000,
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, HollowError::GridTooLarge { .. }));
    }

    #[test]
    fn test_empty_and_invalid_input() {
        assert!(matches!(
            mesh_to_grid(&Mesh::new(), &params(1.0)),
            Err(HollowError::EmptyMesh)
        ));
        assert!(matches!(
            mesh_to_grid(&create_cube(1.0), &params(0.0)),
            Err(HollowError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_dilate_widens_interior_band() {
        let grid = mesh_to_grid(&create_cube(10.0), &params(2.0)).unwrap();
        let dilated = dilate(&grid, 0.5, 2.0).unwrap();

        assert_eq!(dilated.dims(), grid.dims().map(|d| d + 2));
        assert_relative_eq!(dilated.field().interior_band, 3.5);
        assert_relative_eq!(dilated.field().exterior_band, 2.0);

        let deep = dilated.sample(&Point3::new(5.0, 5.0, 7.25));
        assert_relative_eq!(deep, -2.75, epsilon = 0.1);
    }

    #[test]
    fn test_redistance_moves_zero_level() {
        let grid = mesh_to_grid(&create_cube(10.0), &params(2.0)).unwrap();
        let grid = dilate(&grid, 0.0, 3.0).unwrap();
        let moved = redistance(&grid, -2.0, 2.0, 2.0).unwrap();

        // Old level -2 is the plane z = 8 near the top face center
        assert_relative_eq!(moved.sample(&Point3::new(5.0, 5.0, 8.0)), 0.0, epsilon = 0.1);
        assert_relative_eq!(moved.sample(&Point3::new(5.0, 5.0, 8.5)), 0.5, epsilon = 0.1);
        assert_relative_eq!(moved.sample(&Point3::new(5.0, 5.0, 7.75)), -0.25, epsilon = 0.1);
        assert_relative_eq!(moved.field().exterior_band, 1.0);
    }
}

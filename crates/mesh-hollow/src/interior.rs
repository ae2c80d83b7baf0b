//! Interior cavity generation.

use tracing::{debug, info};

use mesh_repair::progress::JobControl;
use mesh_repair::{Mesh, OperationTimer};

use crate::config::{HollowingConfig, voxel_scale};
use crate::error::{HollowError, HollowResult};
use crate::voxel::{MeshToGridParams, VoxelGrid, dilate, grid_to_mesh, mesh_to_grid, redistance};

/// Closing distances at or below this are treated as zero.
const CLOSING_EPSILON: f64 = 1e-4;

/// Narrow band kept around the redistanced level, in voxels.
const CLOSING_NARROW_BAND: f32 = 1.0;

/// Band width of the initial mesh sampling, in voxels.
const MESH_BANDWIDTH: f32 = 3.0;

const STATUS_MESSAGE: &str = "Hollowing";

/// The cavity of a hollowed part.
///
/// `mesh` is the cavity surface, oriented outward (away from the cavity
/// center). Distances sampled from the grid minus `iso_surface` are
/// negative inside the cavity.
#[derive(Debug)]
pub struct Interior {
    pub mesh: Mesh,
    grid: Option<VoxelGrid>,
    /// Grid level the cavity surface was extracted at.
    pub iso_surface: f64,
    /// Requested wall thickness.
    pub thickness: f64,
    /// Half the summed band widths; larger triangles cannot be classified.
    pub full_narrowb: f64,
}

impl Interior {
    /// Assemble an interior from its parts.
    pub fn new(
        mesh: Mesh,
        grid: Option<VoxelGrid>,
        iso_surface: f64,
        thickness: f64,
        full_narrowb: f64,
    ) -> Self {
        Self {
            mesh,
            grid,
            iso_surface,
            thickness,
            full_narrowb,
        }
    }

    /// The distance grid, unless it was released.
    pub fn grid(&self) -> Option<&VoxelGrid> {
        self.grid.as_ref()
    }

    /// Move the grid out, leaving only the mesh and parameters.
    pub fn release_grid(&mut self) -> Option<VoxelGrid> {
        self.grid.take()
    }

    pub fn is_empty(&self) -> bool {
        self.mesh.is_empty()
    }
}

/// Generate the interior cavity of a closed mesh.
///
/// Returns `Ok(None)` if `control` requested a stop; nothing is kept in
/// that case.
pub fn generate_interior(
    mesh: &Mesh,
    config: &HollowingConfig,
    control: &JobControl,
) -> HollowResult<Option<Interior>> {
    config.validate()?;
    if mesh.is_empty() {
        return Err(HollowError::EmptyMesh);
    }
    let _timer =
        OperationTimer::with_context("generate_interior", mesh.face_count(), mesh.vertex_count());

    let params = MeshToGridParams {
        voxel_scale: voxel_scale(mesh.volume(), config),
        exterior_bandwidth: MESH_BANDWIDTH,
        interior_bandwidth: MESH_BANDWIDTH,
        ..Default::default()
    };
    let grid = mesh_to_grid(mesh, &params)?;

    if control.stop_requested() {
        return Ok(None);
    }
    generate_interior_from_grid(&grid, config, control)
}

/// Generate the interior from a grid already sampled from the part.
///
/// Progress is reported at 0, 30, 70 and 100 percent. The stop predicate
/// is polled before every report.
pub fn generate_interior_from_grid(
    grid: &VoxelGrid,
    config: &HollowingConfig,
    control: &JobControl,
) -> HollowResult<Option<Interior>> {
    config.validate()?;

    let voxel_scale = grid.voxel_scale();
    let offset = config.min_thickness;
    let closing = config.closing_distance;
    let mut in_range = 1.1 * (offset + closing);
    let mut out_range = 1.0 / voxel_scale;

    if control.stop_requested() {
        return Ok(None);
    }
    control.report(0, STATUS_MESSAGE);

    let mut grid = dilate(grid, out_range, in_range)?;

    if control.stop_requested() {
        return Ok(None);
    }
    control.report(30, STATUS_MESSAGE);

    let iso_surface = if closing > CLOSING_EPSILON {
        // Erode by wall plus closing, then grow back by the closing distance.
        grid = redistance(
            &grid,
            -(offset + closing),
            CLOSING_NARROW_BAND,
            CLOSING_NARROW_BAND,
        )?;
        grid = dilate(&grid, 1.1 * closing.ceil(), 0.0)?;

        out_range = closing;
        in_range = f64::from(CLOSING_NARROW_BAND) / voxel_scale;
        closing
    } else {
        -offset
    };

    if control.stop_requested() {
        return Ok(None);
    }
    control.report(70, STATUS_MESSAGE);

    let mesh = grid_to_mesh(&grid, iso_surface, 0.0)?;

    if control.stop_requested() {
        return Ok(None);
    }
    control.report(100, STATUS_MESSAGE);

    let full_narrowb = (out_range + in_range) / 2.0;
    debug!(iso_surface, full_narrowb, voxel_scale, "Interior parameters");
    info!(
        faces = mesh.face_count(),
        volume = mesh.volume(),
        "Interior generated"
    );

    Ok(Some(Interior::new(
        mesh,
        Some(grid),
        iso_surface,
        offset,
        full_narrowb,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::cube;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn config(closing_distance: f64) -> HollowingConfig {
        HollowingConfig {
            min_thickness: 1.0,
            quality: 0.0,
            closing_distance,
            enabled: true,
        }
    }

    #[test]
    fn test_interior_of_cube() {
        let mesh = cube(10.0);
        let interior = generate_interior(&mesh, &config(0.0), &JobControl::none())
            .unwrap()
            .unwrap();

        assert_eq!(interior.iso_surface, -1.0);
        assert_eq!(interior.thickness, 1.0);
        assert!(interior.grid().is_some());

        // Cavity is roughly the 8mm cube inset by the wall.
        let (min, max) = interior.mesh.bounds().unwrap();
        for axis in 0..3 {
            assert!((min[axis] - 1.0).abs() < 0.3, "min {axis}: {}", min[axis]);
            assert!((max[axis] - 9.0).abs() < 0.3, "max {axis}: {}", max[axis]);
        }
        let volume = interior.mesh.signed_volume();
        assert!(volume > 400.0 && volume < 512.0 + 20.0, "volume {volume}");
    }

    #[test]
    fn test_closing_keeps_cavity_inside_wall() {
        let mesh = cube(10.0);
        let interior = generate_interior(&mesh, &config(0.5), &JobControl::none())
            .unwrap()
            .unwrap();

        assert_eq!(interior.iso_surface, 0.5);
        let (min, max) = interior.mesh.bounds().unwrap();
        for axis in 0..3 {
            assert!(min[axis] > 0.6 && max[axis] < 9.4);
        }
        assert!(interior.mesh.signed_volume() > 300.0);
    }

    #[test]
    fn test_progress_milestones() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let control = JobControl::none().with_status(move |percent, message| {
            assert_eq!(message, "Hollowing");
            sink.lock().unwrap().push(percent);
        });

        generate_interior(&cube(10.0), &config(0.0), &control)
            .unwrap()
            .unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![0, 30, 70, 100]);
    }

    #[test]
    fn test_cancellation_returns_none() {
        for stop_after in 0..5 {
            let polls = Arc::new(AtomicUsize::new(0));
            let counter = Arc::clone(&polls);
            let control = JobControl::none()
                .with_stop(move || counter.fetch_add(1, Ordering::SeqCst) >= stop_after);

            let result = generate_interior(&cube(10.0), &config(0.0), &control).unwrap();
            assert!(result.is_none(), "stop after {stop_after} polls");
        }
    }

    #[test]
    fn test_invalid_input() {
        let bad = HollowingConfig {
            min_thickness: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            generate_interior(&cube(10.0), &bad, &JobControl::none()),
            Err(HollowError::InvalidConfig { .. })
        ));
        assert!(matches!(
            generate_interior(&Mesh::new(), &config(0.0), &JobControl::none()),
            Err(HollowError::EmptyMesh)
        ));
    }

    #[test]
    fn test_release_grid() {
        let mut interior = generate_interior(&cube(10.0), &config(0.0), &JobControl::none())
            .unwrap()
            .unwrap();
        assert!(interior.release_grid().is_some());
        assert!(interior.grid().is_none());
        assert!(!interior.is_empty());
    }
}

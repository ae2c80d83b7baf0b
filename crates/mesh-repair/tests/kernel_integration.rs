//! End-to-end tests for mesh-repair.
//!
//! These exercise load -> validate -> boolean -> save the way the hollowing
//! pipeline uses them.

use mesh_repair::progress::JobControl;
use mesh_repair::{
    Aabb, Bvh, KernelMesh, Mesh, MeshError, Vertex, bounds_a_volume, has_self_intersections,
    remove_unconnected_vertices, validate_mesh,
};
use nalgebra::Point3;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use tempfile::tempdir;

/// Axis-aligned box with CCW winding seen from outside.
fn create_box(min: [f64; 3], max: [f64; 3]) -> Mesh {
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

fn create_test_cube(size: f64) -> Mesh {
    create_box([0.0; 3], [size; 3])
}

fn kernel(mesh: &Mesh) -> KernelMesh {
    KernelMesh::from_mesh(mesh).expect("valid kernel mesh")
}

// =============================================================================
// I/O
// =============================================================================

#[test]
fn test_stl_roundtrip_keeps_solid() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cube.stl");

    create_test_cube(10.0).save(&path).unwrap();
    let loaded = Mesh::load(&path).unwrap();

    assert_eq!(loaded.face_count(), 12);
    assert_eq!(loaded.vertex_count(), 8);
    let report = validate_mesh(&loaded);
    assert!(report.bounds_a_volume(), "{report}");
    assert!((report.signed_volume - 1000.0).abs() < 1e-3);
}

#[test]
fn test_obj_roundtrip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cube.obj");

    create_test_cube(2.0).save(&path).unwrap();
    let loaded = Mesh::load(&path).unwrap();
    assert_eq!(loaded.face_count(), 12);
    assert!(bounds_a_volume(&loaded));
}

#[test]
fn test_unsupported_and_missing_files() {
    let dir = tempdir().unwrap();

    let err = create_test_cube(1.0).save(dir.path().join("cube.xyz")).unwrap_err();
    assert!(matches!(err, MeshError::UnsupportedFormat { .. }));

    assert!(Mesh::load(dir.path().join("missing.stl")).is_err());
}

// =============================================================================
// Validation
// =============================================================================

#[test]
fn test_open_and_inverted_meshes_do_not_bound_a_volume() {
    let mut open = create_test_cube(10.0);
    open.faces.truncate(10);
    let report = validate_mesh(&open);
    assert!(!report.is_watertight);
    assert_eq!(report.boundary_edge_count, 4);
    assert!(!report.bounds_a_volume());

    let mut inverted = create_test_cube(10.0);
    inverted.flip_faces();
    assert!(!bounds_a_volume(&inverted));
    assert!(inverted.is_inside_out());
}

// =============================================================================
// Boolean kernel
// =============================================================================

#[test]
fn test_subtract_through_box() {
    let mut part = kernel(&create_test_cube(10.0));
    let tool = kernel(&create_box([2.0, 2.0, -1.0], [8.0, 8.0, 11.0]));

    part.subtract(&tool).unwrap();

    assert!(part.bounds_a_volume());
    assert!(!part.self_intersects());
    let volume = part.as_mesh().signed_volume();
    assert!((volume - 640.0).abs() < 1e-6, "volume {volume}");
    assert!(!part.contains_point(&Point3::new(5.0, 5.0, 5.0)));
    assert!(part.contains_point(&Point3::new(1.0, 5.0, 5.0)));
}

#[test]
fn test_subtract_enclosed_box_leaves_cavity() {
    let mut part = kernel(&create_test_cube(10.0));
    part.subtract(&kernel(&create_box([2.0; 3], [8.0; 3]))).unwrap();

    let mesh = part.into_mesh();
    assert_eq!(mesh.face_count(), 24);
    assert!((mesh.signed_volume() - 784.0).abs() < 1e-6);
    assert!(bounds_a_volume(&mesh));
}

#[test]
fn test_union_of_overlapping_cubes() {
    let mut a = kernel(&create_test_cube(10.0));
    a.union(&kernel(&create_box([5.0; 3], [15.0; 3]))).unwrap();

    assert!(a.bounds_a_volume());
    let volume = a.as_mesh().signed_volume();
    assert!((volume - 1875.0).abs() < 1e-6, "volume {volume}");
}

#[test]
fn test_empty_operands_short_circuit() {
    let cube = kernel(&create_test_cube(1.0));

    let mut empty = KernelMesh::default();
    empty.subtract(&cube).unwrap();
    assert!(empty.is_empty());

    empty.union(&cube).unwrap();
    assert_eq!(empty.face_count(), 12);

    let mut part = cube.clone();
    part.subtract(&KernelMesh::default()).unwrap();
    assert_eq!(part.face_count(), 12);
}

// =============================================================================
// Self-intersection and patches
// =============================================================================

#[test]
fn test_overlapping_shells_self_intersect() {
    let cube = create_test_cube(10.0);
    assert!(!has_self_intersections(&cube));

    let mut overlapping = cube.clone();
    overlapping.merge(&create_box([5.0; 3], [15.0; 3]));
    assert!(has_self_intersections(&overlapping));

    // Nested shells do not touch.
    let mut nested = cube;
    nested.merge(&create_box([2.0; 3], [8.0; 3]));
    assert!(!has_self_intersections(&nested));
}

#[test]
fn test_patch_extraction() {
    let mesh = create_test_cube(10.0);
    let bvh = Bvh::build(&mesh);

    let query = Aabb::new(Point3::new(4.0, 4.0, 9.0), Point3::new(6.0, 6.0, 11.0));
    let mut patch = Mesh::new();
    patch.vertices = mesh.vertices.clone();
    patch.faces = bvh
        .query_box(&query)
        .into_iter()
        .map(|fi| mesh.faces[fi as usize])
        .collect();

    assert_eq!(patch.face_count(), 2);
    assert_eq!(remove_unconnected_vertices(&mut patch), 4);
    assert_eq!(patch.vertex_count(), 4);
    assert!(!has_self_intersections(&patch));
}

// =============================================================================
// Job control
// =============================================================================

#[test]
fn test_job_control_reports_and_stops() {
    let last = Arc::new(AtomicU8::new(0));
    let sink = Arc::clone(&last);
    let control = JobControl::none()
        .with_status(move |percent, _| sink.store(percent, Ordering::SeqCst))
        .with_stop(|| true);

    control.report(70, "Hollowing");
    assert_eq!(last.load(Ordering::SeqCst), 70);
    assert!(control.stop_requested());
    assert!(!JobControl::none().stop_requested());
}

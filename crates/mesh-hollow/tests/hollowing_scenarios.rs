//! End-to-end hollowing and drilling of a 10mm cube.
//!
//! These run the whole pipeline: interior generation, merging, trimming
//! and drilling with the boolean kernel.

use mesh_hollow::{
    DrainHole, DrillStatus, FaceHash, HOLE_STICK_OUT_LENGTH, HollowBuilder, HollowFlags,
    HollowingConfig, Interior, create_exclude_mask, facekey, generate_interior, hollow_mesh,
    hollow_mesh_and_drill, remove_inside_triangles,
};
use mesh_repair::progress::JobControl;
use mesh_repair::{Mesh, MeshAdjacency, Vertex, VertexFaceIndex};
use nalgebra::{Point3, Vector3};
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Cube spanning [0, size] with outward CCW winding.
fn create_test_cube(size: f64) -> Mesh {
    let mut mesh = Mesh::new();

    mesh.vertices.push(Vertex::from_coords(0.0, 0.0, 0.0)); // 0
    mesh.vertices.push(Vertex::from_coords(size, 0.0, 0.0)); // 1
    mesh.vertices.push(Vertex::from_coords(size, size, 0.0)); // 2
    mesh.vertices.push(Vertex::from_coords(0.0, size, 0.0)); // 3
    mesh.vertices.push(Vertex::from_coords(0.0, 0.0, size)); // 4
    mesh.vertices.push(Vertex::from_coords(size, 0.0, size)); // 5
    mesh.vertices.push(Vertex::from_coords(size, size, size)); // 6
    mesh.vertices.push(Vertex::from_coords(0.0, size, size)); // 7

    // Bottom
    mesh.faces.push([0, 2, 1]);
    mesh.faces.push([0, 3, 2]);
    // Top
    mesh.faces.push([4, 5, 6]);
    mesh.faces.push([4, 6, 7]);
    // Front
    mesh.faces.push([0, 1, 5]);
    mesh.faces.push([0, 5, 4]);
    // Back
    mesh.faces.push([3, 7, 6]);
    mesh.faces.push([3, 6, 2]);
    // Left
    mesh.faces.push([0, 4, 7]);
    mesh.faces.push([0, 7, 3]);
    // Right
    mesh.faces.push([1, 2, 6]);
    mesh.faces.push([1, 6, 5]);

    mesh
}

fn config(quality: f64) -> HollowingConfig {
    HollowingConfig {
        min_thickness: 1.0,
        quality,
        closing_distance: 0.0,
        enabled: true,
    }
}

fn interior_of(mesh: &Mesh, quality: f64) -> Interior {
    generate_interior(mesh, &config(quality), &JobControl::none())
        .expect("interior generation failed")
        .expect("not cancelled")
}

/// Hole of radius 1 and depth 5 on the center of the top face, pulled out
/// of the surface like holes placed by a user.
fn top_hole() -> DrainHole {
    let mut hole = DrainHole::new(Point3::new(5.0, 5.0, 10.0), -Vector3::z(), 1.0, 5.0);
    hole.stick_out(HOLE_STICK_OUT_LENGTH);
    hole
}

/// Number of triangles hit by the ray `origin + t * dir`, t > 0.
fn ray_crossings(mesh: &Mesh, origin: Point3<f64>, dir: Vector3<f64>) -> usize {
    mesh.triangles()
        .filter(|tri| {
            let [v0, v1, v2] = tri.vertices();
            let e1 = v1 - v0;
            let e2 = v2 - v0;
            let p = dir.cross(&e2);
            let det = e1.dot(&p);
            if det.abs() < 1e-12 {
                return false;
            }
            let s = origin - v0;
            let u = s.dot(&p) / det;
            if !(0.0..=1.0).contains(&u) {
                return false;
            }
            let q = s.cross(&e1);
            let v = dir.dot(&q) / det;
            if v < 0.0 || u + v > 1.0 {
                return false;
            }
            e2.dot(&q) / det > 0.0
        })
        .count()
}

// =============================================================================
// Hollowing
// =============================================================================

#[test]
fn test_hollowed_cube_has_nested_shells() {
    let mut mesh = create_test_cube(10.0);
    let interior = interior_of(&mesh, 0.5);

    assert!(MeshAdjacency::build(&interior.mesh.faces).is_watertight());
    let (min, max) = interior.mesh.bounds().unwrap();
    for axis in 0..3 {
        assert!((min[axis] - 1.0).abs() < 0.25, "cavity min {axis}: {}", min[axis]);
        assert!((max[axis] - 9.0).abs() < 0.25, "cavity max {axis}: {}", max[axis]);
    }

    let stats = hollow_mesh(&mut mesh, &interior, HollowFlags::REMOVE_INSIDE_TRIANGLES);
    assert_eq!(stats.removed, 0);
    assert_eq!(mesh.face_count(), 12 + interior.mesh.face_count());

    let volume = mesh.signed_volume();
    assert!(volume > 0.0 && volume < 1000.0, "volume {volume}");
    // Wall volume of a 10mm cube with a ~8mm cavity.
    assert!(volume > 400.0 && volume < 600.0, "volume {volume}");

    let down = -Vector3::z();
    assert_eq!(ray_crossings(&mesh, Point3::new(5.3, 5.4, 20.0), down), 4);
}

#[test]
fn test_builder_matches_manual_pipeline() {
    let mesh = create_test_cube(10.0);
    let output = HollowBuilder::new(&mesh)
        .config(config(0.0))
        .build()
        .unwrap()
        .unwrap();

    let interior = interior_of(&mesh, 0.0);
    assert_eq!(output.interior_faces, interior.mesh.face_count());
    assert_eq!(output.mesh.face_count(), 12 + interior.mesh.face_count());
    assert_eq!(output.status, DrillStatus::OK);
}

// =============================================================================
// Trimming
// =============================================================================

#[test]
fn test_trimming_is_idempotent() {
    let mut mesh = create_test_cube(10.0);
    let interior = interior_of(&mesh, 0.0);

    // A fin reaching from the wall into the cavity.
    let base = mesh.vertices.len() as u32;
    mesh.vertices.push(Vertex::from_coords(0.5, 5.0, 2.0));
    mesh.vertices.push(Vertex::from_coords(5.0, 5.0, 5.0));
    mesh.vertices.push(Vertex::from_coords(0.5, 5.0, 8.0));
    mesh.faces.push([base, base + 1, base + 2]);

    let first = remove_inside_triangles(&mut mesh, &interior, None);
    assert_eq!(first.removed, 1);

    let faces = mesh.face_count();
    let second = remove_inside_triangles(&mut mesh, &interior, None);
    assert_eq!(second.removed, 0);
    assert_eq!(second.added, 0);
    assert_eq!(mesh.face_count(), faces);
}

// =============================================================================
// Exclude mask
// =============================================================================

#[test]
fn test_exclude_mask_protects_cavity() {
    let mut mesh = create_test_cube(10.0);
    let interior = interior_of(&mesh, 0.0);
    hollow_mesh(&mut mesh, &interior, HollowFlags::empty());

    let mask = create_exclude_mask(&mesh, &interior, &[]);
    assert_eq!(mask.len(), mesh.face_count());
    assert!(mask[..12].iter().all(|m| !m), "outer faces must stay trimmable");
    assert!(mask[12..].iter().all(|&m| m), "cavity faces must be excluded");

    // Every hash match protects its one-ring.
    let hash = FaceHash::from_interior(&interior.mesh);
    let index = VertexFaceIndex::build(mesh.vertex_count(), &mesh.faces);
    for face in &mesh.faces {
        let points = face.map(|v| mesh.position(v));
        if hash.contains(&facekey(&points)) {
            assert!(index.one_ring(face).all(|n| mask[n as usize]));
        }
    }

    // Protected cavity faces survive an unmasked-looking pass.
    let before = mesh.face_count();
    let stats = remove_inside_triangles(&mut mesh, &interior, Some(&mask));
    assert_eq!(stats.removed, 0);
    assert_eq!(mesh.face_count(), before);
}

// =============================================================================
// Drilling
// =============================================================================

#[test]
fn test_drilled_cube_has_through_hole() {
    let mut mesh = create_test_cube(10.0);
    let interior = interior_of(&mesh, 0.0);
    hollow_mesh(&mut mesh, &interior, HollowFlags::empty());

    let origin = Point3::new(5.3, 5.4, 20.0);
    let down = -Vector3::z();
    let undrilled = ray_crossings(&mesh, origin, down);
    assert_eq!(undrilled, 4);

    let mut holes = vec![top_hole()];
    let mut failed = Vec::new();
    let status = hollow_mesh_and_drill(
        &mut mesh,
        &interior,
        &mut holes,
        &mut StdRng::seed_from_u64(42),
        |i| failed.push(i),
    );

    assert!(failed.is_empty());
    assert!(!holes[0].failed);
    assert!(!status.contains(DrillStatus::DRILLING_FAILED), "{status}");
    assert!(!status.contains(DrillStatus::FAULTY_HOLES), "{status}");

    let drilled = ray_crossings(&mesh, origin, down);
    assert!(drilled > 0 && drilled % 2 == 0, "{drilled} crossings");
    assert!(drilled < undrilled, "{drilled} crossings");
}

#[test]
fn test_hole_outside_part_fails_without_touching_mesh() {
    let mut mesh = create_test_cube(10.0);
    let interior = interior_of(&mesh, 0.0);
    hollow_mesh(&mut mesh, &interior, HollowFlags::empty());
    let before = mesh.clone();

    let mut holes = vec![DrainHole::new(
        Point3::new(30.0, 30.0, 30.0),
        -Vector3::z(),
        1.0,
        5.0,
    )];
    let mut failed = Vec::new();
    let status = hollow_mesh_and_drill(
        &mut mesh,
        &interior,
        &mut holes,
        &mut StdRng::seed_from_u64(42),
        |i| failed.push(i),
    );

    assert_eq!(failed, vec![0]);
    assert!(holes[0].failed);
    assert!(status.is_applied());
    assert_eq!(mesh.faces, before.faces);
    assert_eq!(mesh.vertex_count(), before.vertex_count());
}

#[test]
fn test_builder_drills_and_reports() {
    let mesh = create_test_cube(10.0);
    let output = HollowBuilder::new(&mesh)
        .config(config(0.0))
        .hole(top_hole())
        .hole(DrainHole::new(Point3::new(-40.0, 0.0, 0.0), Vector3::x(), 1.0, 2.0))
        .seed(7)
        .build()
        .unwrap()
        .unwrap();

    assert_eq!(output.failed_holes, vec![1]);
    assert!(output.status.is_applied(), "{}", output.status);
    let crossings = ray_crossings(&output.mesh, Point3::new(5.3, 5.4, 20.0), -Vector3::z());
    assert_eq!(crossings, 2);
}

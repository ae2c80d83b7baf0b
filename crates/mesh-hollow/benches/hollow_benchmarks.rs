//! Benchmarks for mesh-hollow operations.
//!
//! Run with: cargo bench -p mesh-hollow
//!
//! To compare against baseline:
//! 1. First run: cargo bench -p mesh-hollow -- --save-baseline main
//! 2. After changes: cargo bench -p mesh-hollow -- --baseline main

use std::collections::HashMap;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use mesh_hollow::{
    DrainHole, HollowFlags, HollowingConfig, Interior, create_exclude_mask, generate_interior,
    hollow_mesh, hollow_mesh_and_drill, remove_inside_triangles,
};
use mesh_repair::progress::JobControl;
use mesh_repair::{Mesh, Vertex};
use nalgebra::{Point3, Vector3};
use rand::SeedableRng;
use rand::rngs::StdRng;

// =============================================================================
// Test Mesh Generation
// =============================================================================

/// Cube spanning [0, size] (12 triangles).
fn create_cube(size: f64) -> Mesh {
    let mut mesh = Mesh::new();
    for z in [0.0, size] {
        for y in [0.0, size] {
            for x in [0.0, size] {
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

/// Icosphere of the given radius centered at `(radius, radius, radius)`.
fn create_sphere(radius: f64, subdivisions: u32) -> Mesh {
    let phi = (1.0 + 5.0_f64.sqrt()) / 2.0;
    let (a, b) = (1.0, 1.0 / phi);
    let ico_verts = [
        [0.0, b, -a], [b, a, 0.0], [-b, a, 0.0], [0.0, b, a],
        [0.0, -b, a], [-a, 0.0, b], [0.0, -b, -a], [a, 0.0, -b],
        [a, 0.0, b], [-a, 0.0, -b], [b, -a, 0.0], [-b, -a, 0.0],
    ];
    let mut mesh = Mesh::new();
    for v in &ico_verts {
        let p = Vector3::from(*v).normalize();
        mesh.vertices.push(Vertex::new(Point3::from(p)));
    }
    mesh.faces.extend([
        [0, 1, 2], [3, 2, 1], [3, 4, 5], [3, 8, 4], [0, 6, 7],
        [0, 9, 6], [4, 10, 11], [6, 11, 10], [2, 5, 9], [11, 9, 5],
        [1, 7, 8], [10, 8, 7], [3, 5, 2], [3, 1, 8], [0, 2, 9],
        [0, 7, 1], [6, 9, 11], [6, 10, 7], [4, 11, 5], [4, 8, 10],
    ]);

    for _ in 0..subdivisions {
        let mut midpoints: HashMap<(u32, u32), u32> = HashMap::new();
        let mut faces = Vec::with_capacity(mesh.faces.len() * 4);
        for &[v0, v1, v2] in &mesh.faces {
            let mut mid = |a: u32, b: u32| {
                *midpoints.entry((a.min(b), a.max(b))).or_insert_with(|| {
                    let p = nalgebra::center(
                        &mesh.vertices[a as usize].position,
                        &mesh.vertices[b as usize].position,
                    );
                    mesh.vertices.push(Vertex::new(Point3::from(p.coords.normalize())));
                    (mesh.vertices.len() - 1) as u32
                })
            };
            let (m01, m12, m20) = (mid(v0, v1), mid(v1, v2), mid(v2, v0));
            faces.extend([[v0, m01, m20], [v1, m12, m01], [v2, m20, m12], [m01, m12, m20]]);
        }
        mesh.faces = faces;
    }

    mesh.scale(radius);
    mesh.translate(Vector3::repeat(radius));
    mesh
}

fn config(quality: f64) -> HollowingConfig {
    HollowingConfig {
        min_thickness: 1.5,
        quality,
        closing_distance: 0.0,
        enabled: true,
    }
}

fn interior_of(mesh: &Mesh) -> Interior {
    generate_interior(mesh, &config(0.0), &JobControl::none())
        .expect("interior generation failed")
        .expect("not cancelled")
}

// =============================================================================
// Interior Generation Benchmarks
// =============================================================================

fn bench_interior(c: &mut Criterion) {
    let mut group = c.benchmark_group("Interior");
    group.sample_size(10); // Voxelization is slow

    let test_cases = [
        ("cube_20mm", create_cube(20.0)),
        ("sphere_r10_1280tri", create_sphere(10.0, 3)),
    ];

    for (name, mesh) in &test_cases {
        for quality in [0.0, 0.5] {
            group.throughput(Throughput::Elements(mesh.faces.len() as u64));
            let config = config(quality);
            group.bench_with_input(
                BenchmarkId::new(format!("generate_q{quality}"), name),
                mesh,
                |b, mesh| {
                    b.iter(|| generate_interior(black_box(mesh), &config, &JobControl::none()))
                },
            );
        }
    }

    group.finish();
}

// =============================================================================
// Trimming Benchmarks
// =============================================================================

fn bench_trimming(c: &mut Criterion) {
    let mut group = c.benchmark_group("Trimming");
    group.sample_size(20);

    let sphere = create_sphere(10.0, 3);
    let interior = interior_of(&sphere);

    // A coarse sphere reaching into the cavity forces deep subdivision.
    let mut probe = create_sphere(4.0, 1);
    probe.translate(Vector3::new(3.0, 3.0, 3.0));

    group.bench_function("remove_inside_triangles", |b| {
        b.iter_batched(
            || probe.clone(),
            |mut mesh| remove_inside_triangles(&mut mesh, &interior, None),
            criterion::BatchSize::SmallInput,
        )
    });

    let mut hollowed = sphere.clone();
    hollow_mesh(&mut hollowed, &interior, HollowFlags::empty());
    group.throughput(Throughput::Elements(hollowed.faces.len() as u64));
    group.bench_function("create_exclude_mask", |b| {
        b.iter(|| create_exclude_mask(black_box(&hollowed), &interior, &[]))
    });

    group.finish();
}

// =============================================================================
// Drilling Benchmarks
// =============================================================================

fn bench_drilling(c: &mut Criterion) {
    let mut group = c.benchmark_group("Drilling");
    group.sample_size(10);

    let cube = create_cube(20.0);
    let interior = interior_of(&cube);
    let mut hollowed = cube.clone();
    hollow_mesh(&mut hollowed, &interior, HollowFlags::empty());

    let mut hole = DrainHole::new(Point3::new(10.0, 10.0, 20.0), -Vector3::z(), 1.5, 4.0);
    hole.stick_out(1.0);

    group.bench_function("single_hole", |b| {
        b.iter_batched(
            || (hollowed.clone(), vec![hole.clone()], StdRng::seed_from_u64(1)),
            |(mut mesh, mut holes, mut rng)| {
                hollow_mesh_and_drill(&mut mesh, &interior, &mut holes, &mut rng, |_| {})
            },
            criterion::BatchSize::SmallInput,
        )
    });

    group.finish();
}

criterion_group!(benches, bench_interior, bench_trimming, bench_drilling);

criterion_main!(benches);

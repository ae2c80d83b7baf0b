//! Cleanup passes on indexed triangle sets: welding coincident vertices,
//! dropping collapsed faces and compacting the vertex array.

use hashbrown::HashMap;
use nalgebra::Point3;
use tracing::debug;

use crate::Mesh;

/// Merge vertices closer than `epsilon` into the lowest-indexed one.
///
/// Uses a spatial hash with `2 * epsilon` cells. Faces that collapse onto an
/// edge or a point after the merge are removed. Returns the number of
/// vertices merged (the vertex array itself is not compacted, see
/// [`remove_unconnected_vertices`]).
pub fn weld_vertices(mesh: &mut Mesh, epsilon: f64) -> usize {
    if mesh.vertices.is_empty() || epsilon <= 0.0 {
        return 0;
    }

    let cell_size = epsilon * 2.0;
    let mut cells: HashMap<(i64, i64, i64), Vec<u32>> = HashMap::new();
    for (idx, vertex) in mesh.vertices.iter().enumerate() {
        cells
            .entry(cell_of(&vertex.position, cell_size))
            .or_default()
            .push(idx as u32);
    }

    let mut remap: Vec<u32> = (0..mesh.vertices.len() as u32).collect();
    let mut merged = 0;

    for (idx, vertex) in mesh.vertices.iter().enumerate() {
        let idx = idx as u32;
        if remap[idx as usize] != idx {
            continue;
        }

        let (cx, cy, cz) = cell_of(&vertex.position, cell_size);
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(candidates) = cells.get(&(cx + dx, cy + dy, cz + dz)) else {
                        continue;
                    };
                    for &other in candidates {
                        if other <= idx || remap[other as usize] != other {
                            continue;
                        }
                        let d = (vertex.position - mesh.vertices[other as usize].position).norm();
                        if d < epsilon {
                            remap[other as usize] = idx;
                            merged += 1;
                        }
                    }
                }
            }
        }
    }

    if merged == 0 {
        return 0;
    }

    for face in &mut mesh.faces {
        for v in face.iter_mut() {
            *v = remap[*v as usize];
        }
    }
    remove_collapsed_faces(mesh);

    debug!(merged, epsilon, "Welded vertices");
    merged
}

/// Remove faces that reference the same vertex twice.
pub fn remove_collapsed_faces(mesh: &mut Mesh) -> usize {
    let before = mesh.faces.len();
    mesh.faces
        .retain(|&[a, b, c]| a != b && b != c && a != c);
    before - mesh.faces.len()
}

/// Remove faces whose area is below `area_threshold`.
pub fn remove_degenerate_triangles(mesh: &mut Mesh, area_threshold: f64) -> usize {
    let before = mesh.faces.len();
    let vertices = &mesh.vertices;
    mesh.faces.retain(|&[a, b, c]| {
        let (p0, p1, p2) = (
            vertices[a as usize].position,
            vertices[b as usize].position,
            vertices[c as usize].position,
        );
        (p1 - p0).cross(&(p2 - p0)).norm() * 0.5 >= area_threshold
    });

    let removed = before - mesh.faces.len();
    if removed > 0 {
        debug!(removed, area_threshold, "Removed degenerate triangles");
    }
    removed
}

/// Drop vertices no face refers to and renumber the faces.
///
/// Returns the number of vertices removed.
pub fn remove_unconnected_vertices(mesh: &mut Mesh) -> usize {
    let mut remap = vec![u32::MAX; mesh.vertices.len()];
    for face in &mesh.faces {
        for &v in face {
            remap[v as usize] = 0;
        }
    }

    let mut kept = 0u32;
    for slot in remap.iter_mut() {
        if *slot == 0 {
            *slot = kept;
            kept += 1;
        }
    }

    let removed = mesh.vertices.len() - kept as usize;
    if removed == 0 {
        return 0;
    }

    let mut idx = 0;
    mesh.vertices.retain(|_| {
        let keep = remap[idx] != u32::MAX;
        idx += 1;
        keep
    });
    for face in &mut mesh.faces {
        for v in face.iter_mut() {
            *v = remap[*v as usize];
        }
    }

    debug!(removed, "Removed unconnected vertices");
    removed
}

fn cell_of(pos: &Point3<f64>, cell_size: f64) -> (i64, i64, i64) {
    (
        (pos.x / cell_size).floor() as i64,
        (pos.y / cell_size).floor() as i64,
        (pos.z / cell_size).floor() as i64,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Triangle, validate_mesh};

    fn unit_triangles() -> Vec<Triangle> {
        let p = |x, y, z| Point3::new(x, y, z);
        vec![
            Triangle::new(p(0.0, 0.0, 0.0), p(0.0, 1.0, 0.0), p(1.0, 0.0, 0.0)),
            Triangle::new(p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 0.0, 1.0)),
            Triangle::new(p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0), p(0.0, 0.0, 1.0)),
            Triangle::new(p(0.0, 0.0, 0.0), p(0.0, 0.0, 1.0), p(0.0, 1.0, 0.0)),
        ]
    }

    #[test]
    fn test_weld_closes_triangle_soup() {
        let mut mesh = Mesh::from_triangles(&unit_triangles());
        assert_eq!(mesh.vertex_count(), 12);
        assert!(!validate_mesh(&mesh).is_watertight);

        let merged = weld_vertices(&mut mesh, 1e-6);
        assert_eq!(merged, 8);
        assert_eq!(remove_unconnected_vertices(&mut mesh), 8);
        assert_eq!(mesh.vertex_count(), 4);

        let report = validate_mesh(&mesh);
        assert!(report.is_watertight);
        assert!(report.signed_volume > 0.0);
    }

    #[test]
    fn test_weld_removes_collapsed_faces() {
        let mut mesh = Mesh::from_parts(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0 + 1e-9, 0.0, 0.0),
            ],
            vec![[0, 1, 2]],
        );
        assert_eq!(weld_vertices(&mut mesh, 1e-6), 1);
        assert!(mesh.faces.is_empty());
    }

    #[test]
    fn test_remove_degenerate_triangles() {
        let mut mesh = Mesh::from_parts(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(2.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 1, 3]],
        );
        assert_eq!(remove_degenerate_triangles(&mut mesh, 1e-12), 1);
        assert_eq!(mesh.faces, vec![[0, 1, 3]]);
    }

    #[test]
    fn test_remove_unconnected_vertices_renumbers() {
        let mut mesh = Mesh::from_parts(
            vec![
                Point3::new(9.0, 9.0, 9.0),
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(9.0, 9.0, 9.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            vec![[1, 2, 4]],
        );
        assert_eq!(remove_unconnected_vertices(&mut mesh), 2);
        assert_eq!(mesh.faces, vec![[0, 1, 2]]);
        assert_eq!(mesh.position(2), Point3::new(0.0, 1.0, 0.0));
        assert_eq!(remove_unconnected_vertices(&mut mesh), 0);
    }
}

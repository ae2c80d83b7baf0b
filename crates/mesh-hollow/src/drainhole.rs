//! Cylindrical drain holes.
//!
//! A hole starts at `pos` and extends `height` along the unit `normal`,
//! i.e. `normal` points from the outer surface into the part.

use std::f64::consts::PI;

use nalgebra::{Isometry3, Point3, Rotation3, Vector3};
use serde::{Deserialize, Serialize};

use mesh_repair::{Mesh, Vertex};

/// Tolerance for plane and parallelism tests.
pub(crate) const EPSILON: f64 = 1e-4;

/// How far holes placed on a surface are pulled out of it.
pub const HOLE_STICK_OUT_LENGTH: f64 = 1.0;

/// A cylindrical drain hole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrainHole {
    /// Center of the entry cap.
    pub pos: Point3<f64>,
    /// Unit axis direction, pointing into the part.
    pub normal: Vector3<f64>,
    pub radius: f64,
    pub height: f64,
    /// Set when drilling skipped this hole. Never cleared.
    #[serde(default)]
    pub failed: bool,
}

impl Default for DrainHole {
    fn default() -> Self {
        Self {
            pos: Point3::origin(),
            normal: Vector3::z(),
            radius: 5.0,
            height: 10.0,
            failed: false,
        }
    }
}

/// One ray hit: ray parameter and the surface normal pointing into the hole.
pub type HoleHit = (f64, Vector3<f64>);

impl DrainHole {
    /// Number of segments around the cylinder.
    pub const STEPS: usize = 32;

    pub fn new(pos: Point3<f64>, normal: Vector3<f64>, radius: f64, height: f64) -> Self {
        Self {
            pos,
            normal,
            radius,
            height,
            failed: false,
        }
    }

    /// Move the entry back along the axis by `length` and deepen the hole
    /// by the same amount, so a hole placed on a flat face starts outside it.
    pub fn stick_out(&mut self, length: f64) {
        let dir = self.normal.try_normalize(EPSILON).unwrap_or_else(Vector3::z);
        self.pos -= dir * length;
        self.height += length;
    }

    /// The hole placed by an object transform, then stuck out by
    /// [`HOLE_STICK_OUT_LENGTH`].
    pub fn transformed(&self, transform: &Isometry3<f64>) -> Self {
        let mut hole = Self {
            pos: transform * self.pos,
            normal: transform.rotation * self.normal,
            ..self.clone()
        };
        hole.stick_out(HOLE_STICK_OUT_LENGTH);
        hole
    }

    /// Equal up to [`EPSILON`] in every parameter. Ignores `failed`.
    pub fn approx_eq(&self, other: &DrainHole) -> bool {
        (self.pos - other.pos).amax() < EPSILON
            && (self.normal - other.normal).amax() < EPSILON
            && (self.radius - other.radius).abs() < EPSILON
            && (self.height - other.height).abs() < EPSILON
    }

    /// Closed, outward-oriented cylinder mesh of the hole.
    pub fn to_mesh(&self) -> Mesh {
        let n = Self::STEPS;
        let mut mesh = Mesh::with_capacity(2 * n + 2, 4 * n);

        for z in [0.0, self.height] {
            for i in 0..n {
                let angle = 2.0 * PI * i as f64 / n as f64;
                mesh.vertices.push(Vertex::from_coords(
                    self.radius * angle.cos(),
                    self.radius * angle.sin(),
                    z,
                ));
            }
        }
        let bottom = 2 * n as u32;
        let top = bottom + 1;
        mesh.vertices.push(Vertex::from_coords(0.0, 0.0, 0.0));
        mesh.vertices.push(Vertex::from_coords(0.0, 0.0, self.height));

        for i in 0..n as u32 {
            let j = (i + 1) % n as u32;
            let (ti, tj) = (i + n as u32, j + n as u32);
            mesh.faces.push([bottom, j, i]);
            mesh.faces.push([top, ti, tj]);
            mesh.faces.push([i, j, tj]);
            mesh.faces.push([i, tj, ti]);
        }

        let axis = self.normal.try_normalize(EPSILON).unwrap_or_else(Vector3::z);
        let rotation = Rotation3::rotation_between(&Vector3::z(), &axis)
            .unwrap_or_else(|| Rotation3::from_axis_angle(&Vector3::x_axis(), PI));
        for v in &mut mesh.vertices {
            v.position = rotation * v.position + self.pos.coords;
        }

        mesh
    }

    /// Whether `p` lies strictly within the hole's radius and between
    /// `EPSILON` and `height` along the axis.
    pub fn is_inside(&self, p: &Point3<f64>) -> bool {
        let to_p = p - self.pos;
        let axial = to_p.dot(&self.normal);
        if !(EPSILON..=self.height).contains(&axial) {
            return false;
        }
        let radial = to_p - self.normal * axial;
        radial.norm_squared() < self.radius * self.radius
    }

    /// Entry and exit of the line `origin + t * dir` through the hole.
    ///
    /// `t` is measured along the normalized `dir`. Returns the two hits
    /// sorted by `t`, or `None` unless exactly two were found. Normals
    /// point into the hole. `normal` must be unit length.
    pub fn get_intersections(
        &self,
        origin: &Point3<f64>,
        dir: &Vector3<f64>,
    ) -> Option<[HoleHit; 2]> {
        let dir = dir.try_normalize(f64::EPSILON)?;
        let n = self.normal;
        let sqr_radius = self.radius * self.radius;

        // Bounding sphere of the cylinder.
        let center = self.pos + n * (self.height / 2.0);
        let to_center = center - origin;
        let off_line = to_center - dir * to_center.dot(&dir);
        if off_line.norm_squared() > (self.height / 2.0).powi(2) + sqr_radius {
            return None;
        }

        let mut hits: Vec<HoleHit> = Vec::with_capacity(2);
        let along = dir.dot(&n);

        // The entry cap can coincide with a flat mesh surface, so it sits
        // slightly outside the hole.
        let base_center = self.pos - n * EPSILON;

        if along.abs() > EPSILON {
            let caps = [(base_center, n), (self.pos + n * self.height, -n)];
            for (cap_center, inward) in caps {
                let t = (cap_center - origin).dot(&n) / along;
                let point = origin + dir * t;
                if (cap_center - point).norm_squared() < sqr_radius {
                    hits.push((t, inward));
                }
            }
        }

        if hits.len() != 2 && (along.abs() - 1.0).abs() > EPSILON {
            // Circle-line intersection in the base plane.
            let project = |p: Point3<f64>| p - n * (p - base_center).dot(&n);
            let proj_origin = project(*origin);
            let proj_dir = project(origin + dir) - proj_origin;
            let par_scale = proj_dir.norm();
            let proj_dir = proj_dir / par_scale;

            let closest = proj_origin + proj_dir * (base_center - proj_origin).dot(&proj_dir);
            let sqr_half_chord = sqr_radius - (closest - base_center).norm_squared();

            if sqr_half_chord >= 0.0 {
                let half_chord = sqr_half_chord.sqrt();
                for side in [-1.0, 1.0] {
                    if hits.len() == 2 {
                        break;
                    }
                    let isect = closest + proj_dir * (side * half_chord);
                    let to_isect = isect - proj_origin;
                    let mut t = to_isect.norm() / par_scale;
                    if to_isect.dot(&proj_dir) < 0.0 {
                        t = -t;
                    }
                    let inward = (base_center - isect)
                        .try_normalize(f64::EPSILON)
                        .unwrap_or_else(Vector3::zeros);
                    let height = (origin + dir * t - base_center).dot(&n);
                    if height > 0.0 && height < self.height {
                        hits.push((t, inward));
                    }
                }
            }
        }

        match hits.as_slice() {
            &[a, b] if a.0 <= b.0 => Some([a, b]),
            &[a, b] => Some([b, a]),
            _ => None,
        }
    }
}

/// All non-failed holes merged into one mesh.
pub fn drainholes_mesh(holes: &[DrainHole]) -> Mesh {
    let mut mesh = Mesh::new();
    for hole in holes.iter().filter(|h| !h.failed) {
        mesh.merge(&hole.to_mesh());
    }
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn vertical_hole() -> DrainHole {
        DrainHole::new(Point3::origin(), Vector3::z(), 1.0, 5.0)
    }

    #[test]
    fn test_defaults() {
        let hole = DrainHole::default();
        assert_eq!(hole.normal, Vector3::z());
        assert_eq!(hole.radius, 5.0);
        assert_eq!(hole.height, 10.0);
        assert!(!hole.failed);
    }

    #[test]
    fn test_to_mesh_is_closed_and_outward() {
        let hole = DrainHole::new(Point3::new(1.0, 2.0, 3.0), Vector3::new(0.0, 0.0, -1.0), 2.0, 6.0);
        let mesh = hole.to_mesh();
        assert_eq!(mesh.face_count(), 4 * DrainHole::STEPS);

        let report = mesh.validate();
        assert!(report.bounds_a_volume());

        // A 32-gon prism is slightly smaller than the cylinder.
        let polygon = 0.5 * 32.0 * 4.0 * (2.0 * PI / 32.0).sin();
        assert_relative_eq!(mesh.volume(), polygon * 6.0, epsilon = 1e-9);

        let (min, max) = mesh.bounds().unwrap();
        assert_relative_eq!(max.z, 3.0, epsilon = 1e-9);
        assert_relative_eq!(min.z, -3.0, epsilon = 1e-9);
        assert_relative_eq!(min.x, -1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_to_mesh_tilted_axis() {
        let normal = Vector3::new(1.0, 1.0, 0.0).normalize();
        let hole = DrainHole::new(Point3::origin(), normal, 1.0, 4.0);
        let mesh = hole.to_mesh();
        let top_center = mesh.vertices[2 * DrainHole::STEPS + 1].position;
        assert_relative_eq!(top_center, Point3::from(normal * 4.0), epsilon = 1e-9);
        assert!(mesh.signed_volume() > 0.0);
    }

    #[test]
    fn test_is_inside() {
        let hole = vertical_hole();
        assert!(hole.is_inside(&Point3::new(0.5, 0.0, 2.5)));
        assert!(hole.is_inside(&Point3::new(0.0, 0.0, 5.0)));
        assert!(!hole.is_inside(&Point3::new(0.0, 0.0, 0.0)));
        assert!(!hole.is_inside(&Point3::new(0.0, 0.0, 5.1)));
        assert!(!hole.is_inside(&Point3::new(1.0, 0.0, 2.5)));
    }

    #[test]
    fn test_perpendicular_ray_through_axis() {
        let hole = vertical_hole();
        let [entry, exit] = hole
            .get_intersections(&Point3::new(-10.0, 0.0, 2.5), &Vector3::x())
            .unwrap();

        assert_relative_eq!(entry.0, 9.0, epsilon = 1e-6);
        assert_relative_eq!(exit.0, 11.0, epsilon = 1e-6);
        assert_relative_eq!(entry.1, Vector3::x(), epsilon = 1e-9);
        assert_relative_eq!(exit.1, -Vector3::x(), epsilon = 1e-9);
    }

    #[test]
    fn test_ray_along_axis_hits_both_caps() {
        let hole = vertical_hole();
        let [entry, exit] = hole
            .get_intersections(&Point3::new(0.2, 0.1, -3.0), &Vector3::new(0.0, 0.0, 2.0))
            .unwrap();
        assert_relative_eq!(entry.0, 3.0 - EPSILON, epsilon = 1e-9);
        assert_relative_eq!(exit.0, 8.0, epsilon = 1e-9);
        assert_eq!(entry.1, Vector3::z());
        assert_eq!(exit.1, -Vector3::z());
    }

    #[test]
    fn test_oblique_ray_through_wall() {
        let hole = vertical_hole();
        let dir = Vector3::new(1.0, 0.0, 1.0);
        let [entry, exit] = hole
            .get_intersections(&Point3::new(0.0, 0.0, 3.5), &dir)
            .unwrap();
        // Wall hits at x = -1 (behind the origin) and x = 1.
        assert_relative_eq!(entry.0, -2.0f64.sqrt(), epsilon = 1e-6);
        assert_relative_eq!(exit.0, 2.0f64.sqrt(), epsilon = 1e-6);
        assert_relative_eq!(entry.1, Vector3::x(), epsilon = 1e-6);
        assert_relative_eq!(exit.1, -Vector3::x(), epsilon = 1e-6);
    }

    #[test]
    fn test_ray_through_rim_is_discarded() {
        // Exits exactly on the top rim: one wall hit only.
        let hole = vertical_hole();
        let dir = Vector3::new(1.0, 0.0, 1.0);
        assert!(
            hole.get_intersections(&Point3::new(0.0, 0.0, 4.0), &dir)
                .is_none()
        );
    }

    #[test]
    fn test_missing_ray() {
        let hole = vertical_hole();
        assert!(
            hole.get_intersections(&Point3::new(-10.0, 5.0, 2.5), &Vector3::x())
                .is_none()
        );
        assert!(
            hole.get_intersections(&Point3::new(-10.0, 0.0, 20.0), &Vector3::x())
                .is_none()
        );
    }

    #[test]
    fn test_stick_out_and_transform() {
        let mut hole = vertical_hole();
        hole.stick_out(1.0);
        assert_eq!(hole.pos, Point3::new(0.0, 0.0, -1.0));
        assert_eq!(hole.height, 6.0);

        let transform = Isometry3::translation(10.0, 0.0, 0.0);
        let placed = vertical_hole().transformed(&transform);
        assert!(placed.approx_eq(&DrainHole::new(
            Point3::new(10.0, 0.0, -HOLE_STICK_OUT_LENGTH),
            Vector3::z(),
            1.0,
            5.0 + HOLE_STICK_OUT_LENGTH,
        )));
    }

    #[test]
    fn test_drainholes_mesh_skips_failed() {
        let mut failed = vertical_hole();
        failed.failed = true;
        let holes = [vertical_hole(), failed, DrainHole::default()];
        let mesh = drainholes_mesh(&holes);
        assert_eq!(mesh.face_count(), 2 * 4 * DrainHole::STEPS);
    }

    proptest! {
        #[test]
        fn is_inside_respects_extent(
            px in -10.0f64..10.0, py in -10.0f64..10.0, pz in -10.0f64..10.0,
            nx in -1.0f64..1.0, ny in -1.0f64..1.0, nz in -1.0f64..1.0,
            radius in 0.1f64..5.0, height in 0.1f64..10.0,
            qx in -20.0f64..20.0, qy in -20.0f64..20.0, qz in -20.0f64..20.0,
        ) {
            let normal = Vector3::new(nx, ny, nz);
            prop_assume!(normal.norm() > 0.1);
            let normal = normal.normalize();
            let hole = DrainHole::new(Point3::new(px, py, pz), normal, radius, height);

            let q = Point3::new(qx, qy, qz);
            let to_q = q - hole.pos;
            let axial = to_q.dot(&normal);
            let radial = (to_q - normal * axial).norm();

            if axial < 0.0 || axial > height || radial >= radius {
                prop_assert!(!hole.is_inside(&q));
            }
        }
    }
}

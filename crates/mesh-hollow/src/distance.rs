//! Signed distance to an interior's cavity surface.

use nalgebra::Point3;

use mesh_repair::Triangle;

use crate::interior::Interior;
use crate::voxel::GridReader;

/// A sphere around a triangle's bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleBubble {
    pub center: Point3<f64>,
    pub radius: f64,
}

impl TriangleBubble {
    pub fn from_points(points: &[Point3<f64>; 3]) -> Self {
        let min = points[0].inf(&points[1]).inf(&points[2]);
        let max = points[0].sup(&points[1]).sup(&points[2]);
        Self {
            center: nalgebra::center(&min, &max),
            radius: (max - min).norm() / 2.0,
        }
    }

    pub fn from_triangle(tri: &Triangle) -> Self {
        Self::from_points(&tri.vertices())
    }
}

/// Thread-safe distance queries against an [`Interior`].
///
/// Negative distances are inside the cavity.
#[derive(Debug, Clone, Copy)]
pub struct DistanceField<'a> {
    reader: GridReader<'a>,
    iso_surface: f64,
    thickness: f64,
    full_narrowb: f64,
}

impl Interior {
    /// Distance queries through a fresh grid reader. `None` once the grid
    /// was released.
    pub fn distance_field(&self) -> Option<DistanceField<'_>> {
        let grid = self.grid()?;
        Some(DistanceField {
            reader: grid.reader(),
            iso_surface: self.iso_surface,
            thickness: self.thickness,
            full_narrowb: self.full_narrowb,
        })
    }
}

impl DistanceField<'_> {
    /// Grid value at `p`, before the iso shift.
    #[inline]
    pub fn raw(&self, p: &Point3<f64>) -> f64 {
        self.reader.sample(p)
    }

    /// Signed distance from `p` to the cavity surface.
    #[inline]
    pub fn point_distance(&self, p: &Point3<f64>) -> f64 {
        self.raw(p) - self.iso_surface
    }

    /// Distance from the bubble center to the cavity surface, or NaN if
    /// the bubble is too big to classify.
    ///
    /// A bubble is too big when its diameter exceeds the narrow band, or
    /// when it already reaches below the grid's zero level while being
    /// wider than the wall.
    pub fn bubble_distance(&self, bubble: &TriangleBubble) -> f64 {
        let r = bubble.radius;
        let raw = self.raw(&bubble.center);

        if 2.0 * r > self.full_narrowb || (raw - r < 0.0 && 2.0 * r > self.thickness) {
            return f64::NAN;
        }
        raw - self.iso_surface
    }

    pub fn thickness(&self) -> f64 {
        self.thickness
    }
}

//! Dense signed-distance grid and its sampling views.

use std::cell::Cell;

use nalgebra::{Point3, Vector3};

/// Samples of a signed distance field on a regular lattice.
///
/// Sample `(x, y, z)` sits at the cell center
/// `origin + (i + 0.5) * voxel_size`. Values are world-unit distances,
/// negative inside, clamped to `[-interior_band, exterior_band]`.
/// Points outside the lattice read as `exterior_band`.
#[derive(Debug, Clone)]
pub struct VoxelField {
    /// Grid dimensions [x, y, z].
    pub dims: [usize; 3],
    /// Min corner of the lattice in world coordinates.
    pub origin: Point3<f64>,
    /// Edge length of one voxel in world units.
    pub voxel_size: f64,
    /// Distance samples, X varying fastest.
    pub values: Vec<f32>,
    /// Width of the valid band outside the zero level, world units.
    pub exterior_band: f32,
    /// Width of the valid band inside the zero level, world units.
    pub interior_band: f32,
}

impl VoxelField {
    /// Total number of voxels in the grid.
    #[inline]
    pub fn total_voxels(&self) -> usize {
        self.dims[0] * self.dims[1] * self.dims[2]
    }

    /// Voxels per world unit.
    #[inline]
    pub fn voxel_scale(&self) -> f64 {
        1.0 / self.voxel_size
    }

    /// Value read for points off the lattice.
    #[inline]
    pub fn background(&self) -> f32 {
        self.exterior_band
    }

    /// Convert 3D grid coordinates to linear index.
    #[inline]
    pub fn linearize(&self, x: usize, y: usize, z: usize) -> usize {
        x + y * self.dims[0] + z * self.dims[0] * self.dims[1]
    }

    /// Convert linear index to 3D grid coordinates.
    #[inline]
    pub fn delinearize(&self, idx: usize) -> [usize; 3] {
        let z = idx / (self.dims[0] * self.dims[1]);
        let rem = idx % (self.dims[0] * self.dims[1]);
        [rem % self.dims[0], rem / self.dims[0], z]
    }

    /// World position of a voxel center.
    #[inline]
    pub fn voxel_center(&self, x: usize, y: usize, z: usize) -> Point3<f64> {
        self.origin
            + Vector3::new(x as f64 + 0.5, y as f64 + 0.5, z as f64 + 0.5) * self.voxel_size
    }

    /// Sample at signed lattice coordinates, background when off the grid.
    #[inline]
    pub fn value(&self, x: i64, y: i64, z: i64) -> f32 {
        let [nx, ny, nz] = self.dims.map(|d| d as i64);
        if x < 0 || y < 0 || z < 0 || x >= nx || y >= ny || z >= nz {
            return self.background();
        }
        self.values[self.linearize(x as usize, y as usize, z as usize)]
    }

    /// Lattice cell containing `p` and the fractional position inside it.
    fn locate(&self, p: &Point3<f64>) -> ([i64; 3], [f64; 3]) {
        let u = (p - self.origin) / self.voxel_size - Vector3::repeat(0.5);
        let base = [u.x.floor(), u.y.floor(), u.z.floor()];
        (
            base.map(|b| b as i64),
            [u.x - base[0], u.y - base[1], u.z - base[2]],
        )
    }

    /// The eight samples around a cell, bit 0 = x, bit 1 = y, bit 2 = z.
    fn corners(&self, base: [i64; 3]) -> [f32; 8] {
        std::array::from_fn(|i| {
            self.value(
                base[0] + (i & 1) as i64,
                base[1] + ((i >> 1) & 1) as i64,
                base[2] + ((i >> 2) & 1) as i64,
            )
        })
    }

    /// Trilinear sample of the field.
    pub fn sample(&self, p: &Point3<f64>) -> f64 {
        let (base, frac) = self.locate(p);
        trilinear(&self.corners(base), frac)
    }
}

fn trilinear(c: &[f32; 8], [fx, fy, fz]: [f64; 3]) -> f64 {
    let lerp = |a: f32, b: f32, t: f64| f64::from(a) + (f64::from(b) - f64::from(a)) * t;
    let x00 = lerp(c[0], c[1], fx);
    let x10 = lerp(c[2], c[3], fx);
    let x01 = lerp(c[4], c[5], fx);
    let x11 = lerp(c[6], c[7], fx);
    let y0 = x00 + (x10 - x00) * fy;
    let y1 = x01 + (x11 - x01) * fy;
    y0 + (y1 - y0) * fz
}

#[derive(Debug, Clone, Copy)]
struct CachedCell {
    base: [i64; 3],
    corners: [f32; 8],
}

/// A voxel field with a last-cell lookup cache.
///
/// The cache lives in a [`Cell`], which makes the grid `!Sync`. Parallel
/// sampling goes through [`VoxelGrid::reader`], which clears the cache and
/// hands out a [`GridReader`] that can be shared between threads.
#[derive(Debug, Clone)]
pub struct VoxelGrid {
    field: VoxelField,
    cache: Cell<Option<CachedCell>>,
}

impl VoxelGrid {
    pub fn new(field: VoxelField) -> Self {
        Self {
            field,
            cache: Cell::new(None),
        }
    }

    pub fn field(&self) -> &VoxelField {
        &self.field
    }

    pub fn into_field(self) -> VoxelField {
        self.field
    }

    pub fn dims(&self) -> [usize; 3] {
        self.field.dims
    }

    pub fn voxel_size(&self) -> f64 {
        self.field.voxel_size
    }

    pub fn voxel_scale(&self) -> f64 {
        self.field.voxel_scale()
    }

    /// Trilinear sample, reusing the corner values of the last cell hit.
    pub fn sample(&self, p: &Point3<f64>) -> f64 {
        let (base, frac) = self.field.locate(p);
        let corners = match self.cache.get() {
            Some(cell) if cell.base == base => cell.corners,
            _ => {
                let corners = self.field.corners(base);
                self.cache.set(Some(CachedCell { base, corners }));
                corners
            }
        };
        trilinear(&corners, frac)
    }

    /// Drop the cached cell.
    pub fn reset_cache(&self) {
        self.cache.set(None);
    }

    /// Reset the cache and return a thread-safe read-only view.
    pub fn reader(&self) -> GridReader<'_> {
        self.reset_cache();
        GridReader { field: &self.field }
    }
}

/// Read-only view of a [`VoxelGrid`] for concurrent sampling.
///
/// Only obtainable from [`VoxelGrid::reader`].
#[derive(Debug, Clone, Copy)]
pub struct GridReader<'a> {
    field: &'a VoxelField,
}

impl GridReader<'_> {
    pub fn sample(&self, p: &Point3<f64>) -> f64 {
        self.field.sample(p)
    }

    pub fn voxel_size(&self) -> f64 {
        self.field.voxel_size
    }

    pub fn field(&self) -> &VoxelField {
        self.field
    }
}

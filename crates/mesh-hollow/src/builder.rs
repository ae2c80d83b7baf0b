//! Fluent builder for the full hollow-and-drill pipeline.
//!
//! # Example
//!
//! ```no_run
//! use mesh_repair::Mesh;
//! use mesh_hollow::{DrainHole, HollowBuilder};
//!
//! let mesh = Mesh::load("part.stl").unwrap();
//!
//! let output = HollowBuilder::new(&mesh)
//!     .min_thickness(2.0)
//!     .quality(0.7)
//!     .hole(DrainHole::new([10.0, 10.0, 21.0].into(), [0.0, 0.0, -1.0].into(), 2.0, 6.0))
//!     .seed(42)
//!     .build()
//!     .unwrap()
//!     .expect("not cancelled");
//!
//! output.mesh.save("hollowed.stl").unwrap();
//! ```

use rand::SeedableRng;
use rand::rngs::StdRng;

use mesh_repair::Mesh;
use mesh_repair::progress::{JobControl, ProgressCallback};

use crate::config::{HollowJob, HollowingConfig};
use crate::drainhole::DrainHole;
use crate::drill::{DrillStatus, drill_holes};
use crate::error::HollowResult;
use crate::hollow::{HollowFlags, hollow_mesh};
use crate::interior::generate_interior;

/// Result of [`HollowBuilder::build`].
#[derive(Debug)]
pub struct HollowOutput {
    /// The hollowed, and possibly drilled, part.
    pub mesh: Mesh,
    /// Faces of the cavity surface that was merged in.
    pub interior_faces: usize,
    /// Drilling outcome; [`DrillStatus::OK`] when there were no holes.
    pub status: DrillStatus,
    /// Indices of holes that could not be drilled.
    pub failed_holes: Vec<usize>,
}

/// Fluent builder for hollowing a part and drilling its drain holes.
pub struct HollowBuilder<'a> {
    mesh: &'a Mesh,
    config: HollowingConfig,
    holes: Vec<DrainHole>,
    seed: Option<u64>,
    remove_inside_triangles: bool,
    progress_callback: Option<ProgressCallback>,
}

impl<'a> HollowBuilder<'a> {
    pub fn new(mesh: &'a Mesh) -> Self {
        Self {
            mesh,
            config: HollowingConfig::default(),
            holes: Vec::new(),
            seed: None,
            remove_inside_triangles: true,
            progress_callback: None,
        }
    }

    /// Replace all hollowing parameters.
    pub fn config(mut self, config: HollowingConfig) -> Self {
        self.config = config;
        self
    }

    /// Take parameters and holes from a job document.
    pub fn job(mut self, job: HollowJob) -> Self {
        self.config = job.config;
        self.holes = job.holes;
        self
    }

    /// Wall thickness in mm.
    pub fn min_thickness(mut self, thickness: f64) -> Self {
        self.config.min_thickness = thickness;
        self
    }

    /// Voxel density in `[0, 1]`.
    pub fn quality(mut self, quality: f64) -> Self {
        self.config.quality = quality;
        self
    }

    /// Closing distance in mm; zero disables closing.
    pub fn closing_distance(mut self, distance: f64) -> Self {
        self.config.closing_distance = distance;
        self
    }

    pub fn holes(mut self, holes: Vec<DrainHole>) -> Self {
        self.holes = holes;
        self
    }

    pub fn hole(mut self, hole: DrainHole) -> Self {
        self.holes.push(hole);
        self
    }

    /// Seed for the hole jitter. Without one, every build differs slightly.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Whether part triangles reaching into the cavity are trimmed.
    /// On by default.
    pub fn remove_inside_triangles(mut self, enabled: bool) -> Self {
        self.remove_inside_triangles = enabled;
        self
    }

    /// Report interior generation progress. Returning `false` from the
    /// callback cancels the build.
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Run the pipeline: generate the interior, merge it, then drill.
    ///
    /// Returns `Ok(None)` when cancelled through the progress callback.
    /// A disabled config yields the input unchanged.
    pub fn build(self) -> HollowResult<Option<HollowOutput>> {
        let mut mesh = self.mesh.clone();
        if !self.config.enabled {
            return Ok(Some(HollowOutput {
                mesh,
                interior_faces: 0,
                status: DrillStatus::OK,
                failed_holes: Vec::new(),
            }));
        }

        let control = match self.progress_callback {
            Some(callback) => JobControl::from_progress(callback),
            None => JobControl::none(),
        };
        let Some(interior) = generate_interior(&mesh, &self.config, &control)? else {
            return Ok(None);
        };

        let mut flags = HollowFlags::empty();
        if self.remove_inside_triangles {
            flags |= HollowFlags::REMOVE_INSIDE_TRIANGLES;
        }

        let mut failed_holes = Vec::new();
        let mut status = DrillStatus::OK;
        if self.holes.is_empty() {
            hollow_mesh(&mut mesh, &interior, flags);
        } else {
            // Trimming waits until the holes are cut.
            hollow_mesh(&mut mesh, &interior, HollowFlags::empty());

            let mut rng = match self.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            let mut holes = self.holes;
            status = drill_holes(&mut mesh, &interior, &mut holes, &mut rng, flags, |i| {
                failed_holes.push(i)
            });
        }

        Ok(Some(HollowOutput {
            mesh,
            interior_faces: interior.mesh.face_count(),
            status,
            failed_holes,
        }))
    }
}

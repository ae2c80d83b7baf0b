//! Hollowing parameters and job documents.
//!
//! Both types serialize to TOML so a hollowing job can be stored next to
//! the model:
//!
//! ```toml
//! [config]
//! min_thickness = 2.0
//! quality = 0.5
//! closing_distance = 0.5
//!
//! [[holes]]
//! pos = [10.0, 10.0, 21.0]
//! normal = [0.0, 0.0, -1.0]
//! radius = 2.0
//! height = 6.0
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::drainhole::DrainHole;
use crate::error::{HollowError, HollowResult};

/// Parameters of the interior cavity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HollowingConfig {
    /// Wall thickness between the outer surface and the cavity (mm).
    pub min_thickness: f64,
    /// Voxel density in `[0, 1]`; higher is finer and slower.
    pub quality: f64,
    /// Morphological closing applied to the cavity (mm). Zero disables it.
    pub closing_distance: f64,
    /// When false, hollowing is a no-op.
    pub enabled: bool,
}

impl Default for HollowingConfig {
    fn default() -> Self {
        Self {
            min_thickness: 2.0,
            quality: 0.5,
            closing_distance: 0.5,
            enabled: true,
        }
    }
}

impl HollowingConfig {
    /// Config with the given wall thickness and defaults otherwise.
    pub fn with_thickness(min_thickness: f64) -> Self {
        Self {
            min_thickness,
            ..Default::default()
        }
    }

    /// Check that every parameter is in range.
    pub fn validate(&self) -> HollowResult<()> {
        if !self.min_thickness.is_finite() || self.min_thickness <= 0.0 {
            return Err(HollowError::invalid_config(
                "min_thickness",
                self.min_thickness,
                "must be finite and > 0",
            ));
        }
        if !self.quality.is_finite() || !(0.0..=1.0).contains(&self.quality) {
            return Err(HollowError::invalid_config(
                "quality",
                self.quality,
                "must be within [0, 1]",
            ));
        }
        if !self.closing_distance.is_finite() || self.closing_distance < 0.0 {
            return Err(HollowError::invalid_config(
                "closing_distance",
                self.closing_distance,
                "must be finite and >= 0",
            ));
        }
        Ok(())
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> HollowResult<Self> {
        parse_toml(toml_str)
    }

    /// Load from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> HollowResult<Self> {
        read_toml(path.as_ref())
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> HollowResult<String> {
        write_toml(self)
    }

    /// Save to a TOML file.
    pub fn save_toml(&self, path: impl AsRef<Path>) -> HollowResult<()> {
        save(self, path.as_ref())
    }
}

/// A hollowing configuration together with the holes to drill.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HollowJob {
    pub config: HollowingConfig,
    pub holes: Vec<DrainHole>,
}

impl HollowJob {
    pub fn from_toml(toml_str: &str) -> HollowResult<Self> {
        parse_toml(toml_str)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> HollowResult<Self> {
        read_toml(path.as_ref())
    }

    pub fn to_toml(&self) -> HollowResult<String> {
        write_toml(self)
    }

    pub fn save_toml(&self, path: impl AsRef<Path>) -> HollowResult<()> {
        save(self, path.as_ref())
    }
}

fn parse_toml<T: for<'de> Deserialize<'de>>(toml_str: &str) -> HollowResult<T> {
    toml::from_str(toml_str).map_err(|e| HollowError::ConfigParse {
        details: e.to_string(),
    })
}

fn read_toml<T: for<'de> Deserialize<'de>>(path: &Path) -> HollowResult<T> {
    let contents = std::fs::read_to_string(path).map_err(|source| HollowError::ConfigIo {
        path: path.to_path_buf(),
        source,
    })?;
    parse_toml(&contents)
}

fn write_toml<T: Serialize>(value: &T) -> HollowResult<String> {
    toml::to_string_pretty(value).map_err(|e| HollowError::ConfigParse {
        details: e.to_string(),
    })
}

fn save<T: Serialize>(value: &T, path: &Path) -> HollowResult<()> {
    let toml_str = write_toml(value)?;
    std::fs::write(path, toml_str).map_err(|source| HollowError::ConfigIo {
        path: path.to_path_buf(),
        source,
    })
}

const MIN_SAMPLES_IN_WALL: f64 = 3.5;
const MAX_OVERSAMPLING: f64 = 8.0;
const UNIT_VOLUME: f64 = 500_000.0;

/// Voxels per world unit for a mesh of the given volume.
///
/// The allowed range starts at enough density for 3.5 samples across the
/// wall and ends at an oversampling cap that shrinks for large models.
/// `quality` picks a point in that range.
pub fn voxel_scale(mesh_volume: f64, config: &HollowingConfig) -> f64 {
    let divider = (mesh_volume / UNIT_VOLUME).max(1.0);
    let min_oversampling = (MIN_SAMPLES_IN_WALL / config.min_thickness).max(1.0);
    let max_oversampling = min_oversampling.max(MAX_OVERSAMPLING / divider);
    let scale = min_oversampling + (max_oversampling - min_oversampling) * config.quality;

    debug!(
        mesh_volume,
        max_oversampling,
        voxel_scale = scale,
        "Voxel scale chosen"
    );
    scale
}

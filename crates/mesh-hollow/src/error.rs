// Allow unused_assignments lint for error struct fields that are used in thiserror Display macros
// but appear as "never read" to the compiler. This is a false positive in newer Rust versions.
#![allow(unused_assignments)]

//! Error types for hollowing and drilling with rich diagnostics.
//!
//! Cancellation is not an error: interior generation returns `Ok(None)` when
//! stopped. Drilling never returns an error at all; it reports through
//! [`DrillStatus`](crate::DrillStatus).

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias for hollowing operations.
pub type HollowResult<T> = Result<T, HollowError>;

/// Machine-readable error codes for hollowing operations.
///
/// Codes follow the pattern `HOLLOW-XXXX` where:
/// - 1xxx = Configuration and input errors
/// - 2xxx = Voxel engine errors
/// - 3xxx = Drilling errors
/// - 4xxx = I/O errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HollowErrorCode {
    /// HOLLOW-1001: Input mesh is empty
    EmptyMesh = 1001,
    /// HOLLOW-1002: Invalid configuration
    InvalidConfig = 1002,

    /// HOLLOW-2001: Voxel grid too large
    GridTooLarge = 2001,
    /// HOLLOW-2002: Distance field sampling failed
    SdfFailed = 2002,
    /// HOLLOW-2003: Isosurface extraction produced nothing
    EmptyIsosurface = 2003,

    /// HOLLOW-3001: Mesh kernel error
    MeshKernel = 3001,

    /// HOLLOW-4001: Configuration file could not be read or written
    ConfigIo = 4001,
    /// HOLLOW-4002: Configuration file could not be parsed
    ConfigParse = 4002,
}

impl HollowErrorCode {
    /// Returns the error code as a string in the format `HOLLOW-XXXX`.
    pub fn as_str(&self) -> &'static str {
        match self {
            HollowErrorCode::EmptyMesh => "HOLLOW-1001",
            HollowErrorCode::InvalidConfig => "HOLLOW-1002",
            HollowErrorCode::GridTooLarge => "HOLLOW-2001",
            HollowErrorCode::SdfFailed => "HOLLOW-2002",
            HollowErrorCode::EmptyIsosurface => "HOLLOW-2003",
            HollowErrorCode::MeshKernel => "HOLLOW-3001",
            HollowErrorCode::ConfigIo => "HOLLOW-4001",
            HollowErrorCode::ConfigParse => "HOLLOW-4002",
        }
    }
}

impl std::fmt::Display for HollowErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors that can occur while hollowing.
#[derive(Debug, Error, Diagnostic)]
pub enum HollowError {
    /// Input mesh is empty.
    #[error("input mesh is empty")]
    #[diagnostic(
        code(hollow::input::empty),
        help("The input mesh must have at least one vertex and one face. Check that the mesh was loaded correctly.")
    )]
    EmptyMesh,

    /// Invalid configuration value.
    #[error("invalid hollowing configuration: {param} = {value}: {details}")]
    #[diagnostic(
        code(hollow::config::invalid),
        help("min_thickness must be > 0, quality in [0, 1], closing_distance >= 0, all finite.")
    )]
    InvalidConfig {
        param: &'static str,
        value: String,
        details: String,
    },

    /// Voxel grid would be too large.
    #[error("voxel grid too large: {dims:?} = {total} voxels exceeds limit of {max}")]
    #[diagnostic(
        code(hollow::grid::too_large),
        help("Lower the quality setting or increase the wall thickness; both reduce the voxel density.")
    )]
    GridTooLarge {
        dims: [usize; 3],
        total: usize,
        max: usize,
    },

    /// Distance field sampling failed.
    #[error("distance field computation failed: {details}")]
    #[diagnostic(
        code(hollow::sdf::failed),
        help("The mesh may have degenerate triangles or non-finite coordinates.")
    )]
    SdfFailed { details: String },

    /// Isosurface extraction produced no triangles.
    #[error("isosurface extraction produced an empty mesh")]
    #[diagnostic(
        code(hollow::isosurface::empty),
        help("The wall thickness may exceed half the part size. Try a thinner wall.")
    )]
    EmptyIsosurface,

    /// Configuration file could not be read or written.
    #[error("failed to access configuration file {path}")]
    #[diagnostic(code(hollow::config::io))]
    ConfigIo {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed or serialized.
    #[error("invalid configuration document: {details}")]
    #[diagnostic(
        code(hollow::config::parse),
        help("The document must be TOML with `min_thickness`, `quality`, `closing_distance` and optional `[[holes]]` tables.")
    )]
    ConfigParse { details: String },

    /// Underlying mesh error.
    #[error("mesh operation failed: {0}")]
    #[diagnostic(code(hollow::mesh::error))]
    MeshError(#[from] mesh_repair::MeshError),
}

impl HollowError {
    /// Returns the machine-readable error code.
    pub fn code(&self) -> HollowErrorCode {
        match self {
            HollowError::EmptyMesh => HollowErrorCode::EmptyMesh,
            HollowError::InvalidConfig { .. } => HollowErrorCode::InvalidConfig,
            HollowError::GridTooLarge { .. } => HollowErrorCode::GridTooLarge,
            HollowError::SdfFailed { .. } => HollowErrorCode::SdfFailed,
            HollowError::EmptyIsosurface => HollowErrorCode::EmptyIsosurface,
            HollowError::ConfigIo { .. } => HollowErrorCode::ConfigIo,
            HollowError::ConfigParse { .. } => HollowErrorCode::ConfigParse,
            HollowError::MeshError(_) => HollowErrorCode::MeshKernel,
        }
    }

    /// Create a grid too large error.
    pub fn grid_too_large(dims: [usize; 3], max: usize) -> Self {
        HollowError::GridTooLarge {
            dims,
            total: dims[0] * dims[1] * dims[2],
            max,
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(
        param: &'static str,
        value: impl ToString,
        details: impl Into<String>,
    ) -> Self {
        HollowError::InvalidConfig {
            param,
            value: value.to_string(),
            details: details.into(),
        }
    }

    /// Create an SDF failed error.
    pub fn sdf_failed(details: impl Into<String>) -> Self {
        HollowError::SdfFailed {
            details: details.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(HollowError::EmptyMesh.code().as_str(), "HOLLOW-1001");
        assert_eq!(
            HollowError::grid_too_large([10, 10, 10], 5).code(),
            HollowErrorCode::GridTooLarge
        );
        assert_eq!(HollowErrorCode::EmptyIsosurface.to_string(), "HOLLOW-2003");
    }

    #[test]
    fn test_error_display() {
        let err = HollowError::grid_too_large([100, 100, 100], 500_000);
        let display = format!("{}", err);
        assert!(display.contains("1000000 voxels"));
        assert!(display.contains("500000"));

        let err = HollowError::invalid_config("quality", 1.5, "must be within [0, 1]");
        assert!(err.to_string().contains("quality = 1.5"));
    }

    #[test]
    fn test_from_mesh_error() {
        let err: HollowError = mesh_repair::MeshError::empty_mesh("test").into();
        assert!(matches!(err, HollowError::MeshError(_)));
        assert_eq!(err.code(), HollowErrorCode::MeshKernel);
    }
}

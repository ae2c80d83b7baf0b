//! Tracing helpers for mesh operations.
//!
//! Nothing here installs a subscriber; applications do that. With
//! `tracing-subscriber` and `RUST_LOG=mesh_repair=debug` the kernel reports
//! segment counts, welding and per-operation timing.
//!
//! ```rust,ignore
//! use tracing_subscriber::{fmt, prelude::*, EnvFilter};
//!
//! tracing_subscriber::registry()
//!     .with(fmt::layer())
//!     .with(EnvFilter::from_default_env())
//!     .init();
//! ```

use std::path::Path;
use std::time::Instant;

use tracing::{Span, debug, info, warn};

use crate::{Mesh, MeshReport};

/// Logs the duration of an operation when dropped.
///
/// ```
/// use mesh_repair::tracing_ext::OperationTimer;
///
/// let timer = OperationTimer::new("weld");
/// assert!(timer.elapsed_ms() >= 0.0);
/// ```
pub struct OperationTimer {
    name: &'static str,
    start: Instant,
    span: Span,
}

impl OperationTimer {
    /// Start timing `name`.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::debug_span!("mesh_operation", operation = name);
        debug!(target: "mesh_repair::timing", operation = name, "Starting operation");
        Self {
            name,
            start: Instant::now(),
            span,
        }
    }

    /// Start timing `name`, recording the input size on the span.
    pub fn with_context(name: &'static str, face_count: usize, vertex_count: usize) -> Self {
        let span = tracing::debug_span!(
            "mesh_operation",
            operation = name,
            faces = face_count,
            vertices = vertex_count
        );
        debug!(
            target: "mesh_repair::timing",
            operation = name,
            faces = face_count,
            vertices = vertex_count,
            "Starting operation"
        );
        Self {
            name,
            start: Instant::now(),
            span,
        }
    }

    /// Milliseconds since the timer started.
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    pub fn span(&self) -> &Span {
        &self.span
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        debug!(
            target: "mesh_repair::timing",
            operation = self.name,
            elapsed_ms = format!("{:.2}", self.elapsed_ms()),
            "Operation completed"
        );
    }
}

/// Log mesh size and extent at debug level.
pub fn log_mesh_stats(mesh: &Mesh, context: &str) {
    let (min, max) = mesh.bounds().unwrap_or_default();
    let dims = max - min;

    debug!(
        target: "mesh_repair::mesh_state",
        context,
        vertices = mesh.vertex_count(),
        faces = mesh.face_count(),
        dimensions = format!("{:.2} x {:.2} x {:.2}", dims.x, dims.y, dims.z),
        "Mesh state"
    );
}

/// Log a validation report: info when the mesh bounds a volume, warn otherwise.
pub fn log_validation_result(report: &MeshReport) {
    if report.bounds_a_volume() {
        info!(
            target: "mesh_repair::validation",
            vertices = report.vertex_count,
            faces = report.face_count,
            components = report.component_count,
            "Mesh bounds a volume"
        );
    } else {
        warn!(
            target: "mesh_repair::validation",
            boundary_edges = report.boundary_edge_count,
            non_manifold_edges = report.non_manifold_edge_count,
            oriented = report.is_consistently_oriented,
            signed_volume = report.signed_volume,
            "Mesh does not bound a volume"
        );
    }
}

/// Log a file load or save.
pub fn log_io_operation(operation: &str, path: &Path, format: &str, success: bool) {
    let path = path.display().to_string();
    if success {
        info!(target: "mesh_repair::io", operation, path, format, "I/O operation completed");
    } else {
        warn!(target: "mesh_repair::io", operation, path, format, "I/O operation failed");
    }
}

//! Progress reporting and cancellation for long-running operations.
//!
//! Two styles are supported:
//! - [`ProgressCallback`]: a single closure receiving a [`Progress`] snapshot,
//!   returning `false` to request cancellation.
//! - [`JobControl`]: a percent/message status sink plus a separate stop
//!   predicate, polled between the stages of a multi-stage job.
//!
//! ```
//! use mesh_repair::progress::{JobControl, Progress, ProgressCallback};
//!
//! let callback: ProgressCallback = Box::new(|progress: &Progress| {
//!     println!("{}% complete: {}", progress.percent(), progress.message);
//!     true // return false to cancel
//! });
//!
//! let ctl = JobControl::from_progress(callback);
//! ctl.report(30, "Hollowing");
//! assert!(!ctl.stop_requested());
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Progress information passed to callbacks.
#[derive(Debug, Clone)]
pub struct Progress {
    /// Current step (0-based).
    pub current: u64,

    /// Total number of steps.
    pub total: u64,

    /// Human-readable message describing current operation.
    pub message: String,

    /// Elapsed time since operation started.
    pub elapsed: Duration,
}

impl Progress {
    /// Create a new progress report.
    pub fn new(current: u64, total: u64, message: impl Into<String>) -> Self {
        Self {
            current,
            total,
            message: message.into(),
            elapsed: Duration::ZERO,
        }
    }

    /// Get progress as a fraction (0.0 to 1.0).
    #[inline]
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.current as f64) / (self.total as f64)
        }
    }

    /// Get progress as a percentage (0 to 100).
    #[inline]
    pub fn percent(&self) -> u32 {
        (self.fraction() * 100.0).round() as u32
    }

    /// Check if the operation is complete.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.current >= self.total
    }
}

/// Callback function for progress reporting.
///
/// Returns `true` to continue, `false` to request cancellation.
pub type ProgressCallback = Box<dyn Fn(&Progress) -> bool + Send + Sync>;

/// Status sink receiving a percentage (0-100) and a stage message.
pub type StatusFn = Box<dyn Fn(u8, &str) + Send + Sync>;

/// Predicate polled between stages; `true` means stop as soon as possible.
pub type StopFn = Box<dyn Fn() -> bool + Send + Sync>;

/// Status reporting and cooperative cancellation for a staged job.
///
/// Both parts are optional; [`JobControl::none`] reports nothing and never
/// stops.
#[derive(Default)]
pub struct JobControl {
    status: Option<StatusFn>,
    stop: Option<StopFn>,
}

impl JobControl {
    /// A controller that ignores status and never requests a stop.
    pub fn none() -> Self {
        Self::default()
    }

    /// Attach a status sink.
    pub fn with_status(mut self, status: impl Fn(u8, &str) + Send + Sync + 'static) -> Self {
        self.status = Some(Box::new(status));
        self
    }

    /// Attach a stop predicate.
    pub fn with_stop(mut self, stop: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        self.stop = Some(Box::new(stop));
        self
    }

    /// Adapt a [`ProgressCallback`]: each status report becomes a
    /// `Progress { current: percent, total: 100 }` and a `false` return
    /// latches the stop flag.
    pub fn from_progress(callback: ProgressCallback) -> Self {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);

        Self::none()
            .with_status(move |percent, message| {
                if !callback(&Progress::new(u64::from(percent), 100, message)) {
                    flag.store(true, Ordering::Relaxed);
                }
            })
            .with_stop(move || cancelled.load(Ordering::Relaxed))
    }

    /// Forward a status report to the sink, if any.
    pub fn report(&self, percent: u8, message: &str) {
        if let Some(status) = &self.status {
            status(percent.min(100), message);
        }
    }

    /// Whether the job should stop.
    pub fn stop_requested(&self) -> bool {
        self.stop.as_ref().is_some_and(|stop| stop())
    }
}

impl std::fmt::Debug for JobControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobControl")
            .field("status", &self.status.is_some())
            .field("stop", &self.stop.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_progress_fraction() {
        let progress = Progress::new(25, 100, "Testing");
        assert!((progress.fraction() - 0.25).abs() < 1e-10);
        assert_eq!(progress.percent(), 25);
        assert!(!progress.is_complete());
        assert_eq!(Progress::new(0, 0, "empty").fraction(), 0.0);
    }

    #[test]
    fn test_none_never_stops() {
        let ctl = JobControl::none();
        ctl.report(50, "ignored");
        assert!(!ctl.stop_requested());
    }

    #[test]
    fn test_status_and_stop() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let ctl = JobControl::none()
            .with_status(move |p, msg| sink.lock().unwrap().push((p, msg.to_string())))
            .with_stop(|| true);

        ctl.report(30, "stage");
        ctl.report(250, "clamped");
        assert!(ctl.stop_requested());
        assert_eq!(
            *seen.lock().unwrap(),
            vec![(30, "stage".to_string()), (100, "clamped".to_string())]
        );
    }

    #[test]
    fn test_progress_callback_cancels() {
        let callback: ProgressCallback = Box::new(|p| p.percent() < 70);
        let ctl = JobControl::from_progress(callback);

        ctl.report(30, "Hollowing");
        assert!(!ctl.stop_requested());
        ctl.report(70, "Hollowing");
        assert!(ctl.stop_requested());
    }
}

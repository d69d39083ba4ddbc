//! Progress reporting for long-running simulations.
//!
//! Provides progress tracking and ETA estimation, and turns into a
//! [`ProgressCallback`] for the simulation driver. The image-source count
//! grows with the cube of the reflection order, so large rooms can run for a
//! while.

use crate::simulate::{CallbackAction, ProgressCallback, SimulationProgress};
use log::info;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Progress reporter for simulation runs.
///
/// Tracks elapsed time, reports progress at configurable intervals,
/// and estimates time remaining based on current progress. It can be shared
/// by the worker threads of one run.
pub struct ProgressReporter {
    /// When the operation started
    start_time: Instant,
    /// Name of the operation (for display)
    name: String,
    /// How often to report progress
    report_interval: Duration,
    /// When we last reported
    last_report: Mutex<Instant>,
    /// Stop the run once this much time has elapsed
    deadline: Option<Duration>,
    /// Whether to log progress
    verbose: bool,
}

impl ProgressReporter {
    /// Create a new progress reporter
    ///
    /// # Arguments
    /// * `name` - Name of the operation (e.g., "small_room (enhanced)")
    pub fn new(name: impl Into<String>) -> Self {
        let now = Instant::now();
        Self {
            start_time: now,
            name: name.into(),
            report_interval: Duration::from_secs(5),
            last_report: Mutex::new(now),
            deadline: None,
            verbose: true,
        }
    }

    /// Set the report interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.report_interval = interval;
        self
    }

    /// Set whether to log progress
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Ask the run to stop once `limit` has elapsed
    pub fn with_deadline(mut self, limit: Duration) -> Self {
        self.deadline = Some(limit);
        self
    }

    /// Estimated time remaining
    pub fn eta(&self, progress: &SimulationProgress) -> Duration {
        let fraction = progress.fraction();
        if fraction > 0.01 && progress.completed > 0 {
            let elapsed = self.start_time.elapsed().as_secs_f64();
            Duration::from_secs_f64(elapsed * (1.0 - fraction) / fraction)
        } else {
            Duration::from_secs(0)
        }
    }

    /// Report progress; only logs if enough time has passed since the last report.
    pub fn report(&self, progress: &SimulationProgress) -> CallbackAction {
        let elapsed = self.start_time.elapsed();
        if let Some(limit) = self.deadline {
            if elapsed >= limit {
                log::warn!(
                    "[{}] stopping after {:.1}s (limit {:.1}s)",
                    self.name,
                    elapsed.as_secs_f64(),
                    limit.as_secs_f64()
                );
                return CallbackAction::Stop;
            }
        }

        if !self.verbose {
            return CallbackAction::Continue;
        }

        let now = Instant::now();
        let due = match self.last_report.lock() {
            Ok(mut last) if now.duration_since(*last) >= self.report_interval => {
                *last = now;
                true
            }
            _ => false,
        };

        if due {
            info!(
                "[{}] {:5.1}% | pairs {}/{} | images {}/{} | elapsed: {:.1}s | ETA: {:.1}s",
                self.name,
                progress.fraction() * 100.0,
                progress.pairs_done,
                progress.total_pairs,
                progress.completed,
                progress.total,
                elapsed.as_secs_f64(),
                self.eta(progress).as_secs_f64()
            );
        }

        CallbackAction::Continue
    }

    /// Final report with total statistics.
    pub fn finish(&self) {
        if !self.verbose {
            return;
        }
        info!(
            "[{}] Complete | total time: {:.1}s",
            self.name,
            self.start_time.elapsed().as_secs_f64()
        );
    }

    /// Get elapsed time since start
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Driver callback backed by a shared reporter; the caller keeps its
    /// handle for [`ProgressReporter::finish`].
    pub fn into_callback(self: Arc<Self>) -> ProgressCallback {
        Box::new(move |progress: &SimulationProgress| self.report(progress))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(completed: usize, total: usize) -> SimulationProgress {
        SimulationProgress {
            completed,
            total,
            pairs_done: 0,
            total_pairs: 1,
        }
    }

    #[test]
    fn test_reporter_continues() {
        let reporter = ProgressReporter::new("Test")
            .with_interval(Duration::from_millis(0))
            .with_verbose(false);
        assert_eq!(reporter.report(&progress(10, 100)), CallbackAction::Continue);
    }

    #[test]
    fn test_reporter_deadline_stops() {
        let reporter = ProgressReporter::new("Test")
            .with_verbose(false)
            .with_deadline(Duration::from_millis(0));
        assert_eq!(reporter.report(&progress(10, 100)), CallbackAction::Stop);
    }

    #[test]
    fn test_eta() {
        let reporter = ProgressReporter::new("Test");
        assert_eq!(reporter.eta(&progress(0, 100)), Duration::from_secs(0));
        std::thread::sleep(Duration::from_millis(10));
        // halfway: remaining time equals elapsed time
        let eta = reporter.eta(&progress(50, 100));
        assert!(eta.as_millis() >= 10);
    }

    #[test]
    fn test_elapsed() {
        let reporter = ProgressReporter::new("Test");
        std::thread::sleep(Duration::from_millis(10));
        assert!(reporter.elapsed().as_millis() >= 10);
    }

    #[test]
    fn test_into_callback() {
        let reporter = Arc::new(ProgressReporter::new("Test").with_verbose(false));
        let callback = Arc::clone(&reporter).into_callback();
        assert_eq!(callback(&progress(1, 2)), CallbackAction::Continue);
        assert_eq!(Arc::strong_count(&reporter), 2);

        drop(callback);
        reporter.finish();
        assert_eq!(Arc::strong_count(&reporter), 1);
    }

    #[test]
    fn test_callback_stops_driver_at_deadline() {
        use crate::room::{Band, BandCoefficients, Point3D, RoomModel, RoomScene};
        use crate::simulate::{SimulationDriver, SimulationOptions};
        use std::collections::BTreeMap;

        let mut abs = BTreeMap::new();
        abs.insert(Band::Mid, BandCoefficients::uniform(0.2).unwrap());
        let room = RoomModel::new([5.0, 4.0, 3.0], abs, 10).unwrap();
        let scene = RoomScene::new(
            room,
            vec![Point3D::new(1.0, 1.0, 1.0)],
            vec![Point3D::new(4.0, 3.0, 2.0)],
        )
        .unwrap();

        let reporter = Arc::new(
            ProgressReporter::new("Test")
                .with_verbose(false)
                .with_deadline(Duration::from_millis(0)),
        );
        let driver = SimulationDriver::new(SimulationOptions::default())
            .with_progress(Arc::clone(&reporter).into_callback());
        assert!(driver.run(&scene).unwrap_err().is_cancelled());
    }
}

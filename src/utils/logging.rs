use log::{log_enabled, warn, Level};
use std::time::{Duration, Instant};

/// Traces the wall time of a driver stage at `trace` level.
pub struct ScopedTimer<'a> {
    label: &'a str,
    start: Instant,
}

impl<'a> ScopedTimer<'a> {
    pub fn new(label: &'a str) -> Self {
        if log_enabled!(Level::Trace) {
            log::trace!("start {label}");
        }
        Self {
            label,
            start: Instant::now(),
        }
    }
}

impl Drop for ScopedTimer<'_> {
    fn drop(&mut self) {
        if log_enabled!(Level::Trace) {
            let elapsed = self.start.elapsed();
            log::trace!("end {} ({} µs)", self.label, elapsed.as_micros());
        }
    }
}

/// Warns when simulating one frame took longer than the frame it represents.
pub fn warn_if_frame_budget_exceeded(frame: u32, duration: Duration, budget: Duration) {
    if duration > budget {
        warn!(
            "frame {frame} took {:.2} ms, longer than its {:.2} ms of simulated time",
            duration.as_secs_f32() * 1000.0,
            budget.as_secs_f32() * 1000.0
        );
    }
}

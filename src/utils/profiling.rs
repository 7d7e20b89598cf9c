use std::time::{Duration, Instant};

use log::debug;

/// Per-stage wall time of the driver, accumulated over one or more time steps.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct StepProfiler {
    pub gravity_time: Duration,
    pub broad_phase_time: Duration,
    pub narrow_phase_time: Duration,
    pub assembly_time: Duration,
    pub solver_time: Duration,
    pub integrator_time: Duration,
    pub total_step_time: Duration,

    pub steps: u64,
    pub body_count: usize,
    pub contact_count: usize,
}

impl StepProfiler {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn percent(&self, stage: Duration) -> f32 {
        let total_us = self.total_step_time.as_micros() as f32;
        if total_us < 1.0 {
            0.0
        } else {
            stage.as_micros() as f32 / total_us * 100.0
        }
    }

    /// Logs the accumulated profile at `debug` level.
    pub fn report(&self) {
        if self.steps == 0 {
            return;
        }
        debug!(
            "profile: {} steps, {} bodies, {} contacts, {:.2} ms total",
            self.steps,
            self.body_count,
            self.contact_count,
            self.total_step_time.as_secs_f32() * 1000.0
        );
        for (name, stage) in [
            ("gravity", self.gravity_time),
            ("broad phase", self.broad_phase_time),
            ("narrow phase", self.narrow_phase_time),
            ("assembly", self.assembly_time),
            ("solver", self.solver_time),
            ("integrator", self.integrator_time),
        ] {
            debug!(
                "  {name:<12} {:.3} ms ({:.1}%)",
                stage.as_secs_f32() * 1000.0,
                self.percent(stage)
            );
        }
    }
}

/// Adds the lifetime of the guard to a profiler field.
pub struct StageTimer<'a> {
    start: Instant,
    output: &'a mut Duration,
}

impl<'a> StageTimer<'a> {
    pub fn new(output: &'a mut Duration) -> Self {
        Self {
            start: Instant::now(),
            output,
        }
    }
}

impl Drop for StageTimer<'_> {
    fn drop(&mut self) {
        *self.output += self.start.elapsed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_timer_accumulates() {
        let mut profiler = StepProfiler::default();
        {
            let _timer = StageTimer::new(&mut profiler.solver_time);
            std::thread::sleep(Duration::from_millis(1));
        }
        assert!(profiler.solver_time >= Duration::from_millis(1));
        profiler.reset();
        assert_eq!(profiler.solver_time, Duration::ZERO);
    }
}

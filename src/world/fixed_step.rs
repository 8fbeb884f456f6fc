use log::warn;

use crate::utils::{ensure_time_step, PhysicsError};

pub const DEFAULT_MAX_SUB_STEPS: usize = 8;

/// Outcome of one [`FixedStepAccumulator::advance`] call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedStepResult {
    /// Fixed steps executed during this call.
    pub steps: usize,
    /// `remainder / fixed_step`, clamped to `[0, 1]`.
    pub interpolation_alpha: f64,
    /// Time left in the accumulator after the steps ran; exceeds one step after a capped call.
    pub remainder: f64,
}

/// Turns variable frame deltas into a deterministic sequence of fixed steps.
///
/// The sequence of `step_fn` invocations depends only on the sequence of `frame_dt`
/// values, never on wall-clock jitter, so replaying the same deltas replays the same
/// simulation bit for bit.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedStepAccumulator {
    fixed_step: f64,
    max_sub_steps: usize,
    accumulator: f64,
    total_steps: u64,
}

impl FixedStepAccumulator {
    /// # Errors
    /// `InvalidTimeStep` for a non-positive step, `InvalidArgument` when `max_sub_steps` is 0.
    pub fn new(fixed_step: f64, max_sub_steps: usize) -> Result<Self, PhysicsError> {
        ensure_time_step(fixed_step)?;
        if max_sub_steps == 0 {
            return Err(PhysicsError::invalid_argument("max sub steps must be >= 1"));
        }
        Ok(Self { fixed_step, max_sub_steps, accumulator: 0.0, total_steps: 0 })
    }

    pub fn fixed_step(&self) -> f64 {
        self.fixed_step
    }

    pub fn max_sub_steps(&self) -> usize {
        self.max_sub_steps
    }

    pub fn accumulator(&self) -> f64 {
        self.accumulator
    }

    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }

    pub fn interpolation_alpha(&self) -> f64 {
        (self.accumulator / self.fixed_step).clamp(0.0, 1.0)
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
        self.total_steps = 0;
    }

    /// Adds `frame_dt` and runs `step_fn(fixed_step)` while a whole step is available,
    /// at most `max_sub_steps` times.
    ///
    /// When the cap is hit, the pending steps stay in the accumulator and run on later
    /// calls; the interpolation alpha then saturates at 1.
    ///
    /// # Errors
    /// `InvalidArgument` for a negative or non-finite `frame_dt`; any error from `step_fn`
    /// is returned immediately and the step it failed on is not consumed.
    pub fn advance<F>(&mut self, frame_dt: f64, mut step_fn: F) -> Result<FixedStepResult, PhysicsError>
    where
        F: FnMut(f64) -> Result<(), PhysicsError>,
    {
        if !frame_dt.is_finite() || frame_dt < 0.0 {
            return Err(PhysicsError::invalid_argument(format!("frame dt must be finite and >= 0, got {}", frame_dt)));
        }
        self.accumulator += frame_dt;

        let mut steps = 0;
        while self.accumulator >= self.fixed_step && steps < self.max_sub_steps {
            step_fn(self.fixed_step)?;
            self.accumulator -= self.fixed_step;
            self.total_steps += 1;
            steps += 1;
        }

        if self.accumulator >= self.fixed_step {
            warn!(
                "fixed step cap of {} sub steps reached, {:.6}s of simulation time pending",
                self.max_sub_steps, self.accumulator
            );
        }

        Ok(FixedStepResult { steps, interpolation_alpha: self.interpolation_alpha(), remainder: self.accumulator })
    }
}

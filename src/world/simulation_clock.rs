use crate::utils::{ensure_finite, PhysicsError};

/// Scales and pauses real time before it reaches the fixed-step accumulator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationClock {
    simulation_time: f64,
    time_scale: f64,
    paused: bool,
}

impl Default for SimulationClock {
    fn default() -> Self {
        Self { simulation_time: 0.0, time_scale: 1.0, paused: false }
    }
}

impl SimulationClock {
    pub fn new(simulation_time: f64, time_scale: f64, paused: bool) -> Result<Self, PhysicsError> {
        ensure_finite(simulation_time, "simulation time")?;
        validate_time_scale(time_scale)?;
        Ok(Self { simulation_time, time_scale, paused })
    }

    pub fn simulation_time(&self) -> f64 {
        self.simulation_time
    }

    pub fn time_scale(&self) -> f64 {
        self.time_scale
    }

    pub fn set_time_scale(&mut self, time_scale: f64) -> Result<(), PhysicsError> {
        self.time_scale = validate_time_scale(time_scale)?;
        Ok(())
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn reset(&mut self, simulation_time: f64) -> Result<(), PhysicsError> {
        self.simulation_time = ensure_finite(simulation_time, "simulation time")?;
        Ok(())
    }

    /// Converts a real-time delta into simulation time.
    ///
    /// # Returns
    /// The scaled delta actually added, zero while paused.
    pub fn advance(&mut self, real_dt: f64) -> Result<f64, PhysicsError> {
        if !real_dt.is_finite() || real_dt < 0.0 {
            return Err(PhysicsError::invalid_argument(format!("real dt must be finite and >= 0, got {}", real_dt)));
        }
        if self.paused {
            return Ok(0.0);
        }
        let scaled = real_dt * self.time_scale;
        self.simulation_time += scaled;
        Ok(scaled)
    }
}

fn validate_time_scale(time_scale: f64) -> Result<f64, PhysicsError> {
    if time_scale.is_finite() && time_scale >= 0.0 {
        Ok(time_scale)
    } else {
        Err(PhysicsError::invalid_argument(format!("time scale must be finite and >= 0, got {}", time_scale)))
    }
}

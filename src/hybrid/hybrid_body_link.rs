use crate::backends::PhysicsBodyHandle;
use crate::utils::PhysicsError;

/// Which world is authoritative for a linked body's motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HybridOwnership {
    General,
    Orbital,
}

/// Which parts of the owner's state are copied onto the follower.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateHandoffMode {
    /// Position, orientation and both velocities.
    FullState,
    /// Position and linear velocity; the follower keeps its orientation and spin.
    PositionVelocityOnly,
}

/// What to do when owner and follower have drifted apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictPolicy {
    Overwrite,
    /// Skip the hand-off when any divergence exceeds its threshold.
    RejectOnDivergence,
}

/// One logical body represented in both the general and the orbital world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HybridBodyLink {
    pub general_body: PhysicsBodyHandle,
    pub orbital_body: PhysicsBodyHandle,
    pub ownership: HybridOwnership,
    pub handoff_mode: StateHandoffMode,
    pub conflict_policy: ConflictPolicy,
    pub max_position_divergence: f64,
    pub max_linear_velocity_divergence: f64,
    pub max_angular_velocity_divergence: f64,
}

impl HybridBodyLink {
    /// A link that always overwrites the follower.
    pub fn new(
        general_body: PhysicsBodyHandle,
        orbital_body: PhysicsBodyHandle,
        ownership: HybridOwnership,
        handoff_mode: StateHandoffMode,
    ) -> Self {
        Self {
            general_body,
            orbital_body,
            ownership,
            handoff_mode,
            conflict_policy: ConflictPolicy::Overwrite,
            max_position_divergence: f64::INFINITY,
            max_linear_velocity_divergence: f64::INFINITY,
            max_angular_velocity_divergence: f64::INFINITY,
        }
    }

    /// Sets the conflict policy and divergence thresholds (metres, m/s, rad/s). `None`
    /// leaves a threshold unbounded.
    ///
    /// # Errors
    /// `InvalidArgument` for a negative or NaN threshold.
    pub fn with_conflict_policy(
        mut self,
        conflict_policy: ConflictPolicy,
        max_position_divergence: Option<f64>,
        max_linear_velocity_divergence: Option<f64>,
        max_angular_velocity_divergence: Option<f64>,
    ) -> Result<Self, PhysicsError> {
        self.conflict_policy = conflict_policy;
        self.max_position_divergence = threshold(max_position_divergence, "max position divergence")?;
        self.max_linear_velocity_divergence =
            threshold(max_linear_velocity_divergence, "max linear velocity divergence")?;
        self.max_angular_velocity_divergence =
            threshold(max_angular_velocity_divergence, "max angular velocity divergence")?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), PhysicsError> {
        for (value, name) in [
            (self.max_position_divergence, "max position divergence"),
            (self.max_linear_velocity_divergence, "max linear velocity divergence"),
            (self.max_angular_velocity_divergence, "max angular velocity divergence"),
        ] {
            threshold(Some(value), name)?;
        }
        Ok(())
    }

    pub fn involves(&self, handle: PhysicsBodyHandle) -> bool {
        self.general_body == handle || self.orbital_body == handle
    }
}

fn threshold(value: Option<f64>, name: &str) -> Result<f64, PhysicsError> {
    match value {
        None => Ok(f64::INFINITY),
        Some(v) if v >= 0.0 => Ok(v),
        Some(v) => Err(PhysicsError::invalid_argument(format!("{} must be >= 0 and not NaN, got {}", name, v))),
    }
}

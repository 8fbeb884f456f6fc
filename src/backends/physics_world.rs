use std::sync::atomic::{AtomicU64, Ordering};

use crate::backends::ReferenceFrame;
use crate::interactions::CollisionFilter;
use crate::models::{Quaternion, Ray3D};
use crate::utils::{ensure_finite, ensure_finite_vector, ensure_time_step, PhysicsError, Vector3, ZERO_VECTOR};

pub const DEFAULT_RUNTIME_SOLVER_ITERATIONS: usize = 20;
pub const DEFAULT_CONTACT_FRICTION: f64 = f64::INFINITY;
pub const DEFAULT_CONTACT_BOUNCE: f64 = 0.1;
pub const DEFAULT_CONTACT_SOFT_CFM: f64 = 1e-5;
pub const DEFAULT_CONTACT_BOUNCE_VELOCITY: f64 = 0.1;
pub const DEFAULT_GRAVITY: Vector3 = (0.0, -9.81, 0.0);
pub const DEFAULT_FIXED_STEP_SECONDS: f64 = 1.0 / 60.0;

/// Identifies one world instance; handles remember the world that issued them.
pub type WorldId = u64;

static NEXT_WORLD_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_world_id() -> WorldId {
    NEXT_WORLD_ID.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PhysicsBodyHandle {
    world: WorldId,
    id: u64,
}

impl PhysicsBodyHandle {
    pub(crate) fn new(world: WorldId, id: u64) -> Self {
        Self { world, id }
    }

    pub fn world_id(&self) -> WorldId {
        self.world
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PhysicsConstraintHandle {
    world: WorldId,
    id: u64,
}

impl PhysicsConstraintHandle {
    pub(crate) fn new(world: WorldId, id: u64) -> Self {
        Self { world, id }
    }

    pub fn world_id(&self) -> WorldId {
        self.world
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Rejects a handle issued by another world.
pub(crate) fn check_body_handle(world: WorldId, handle: PhysicsBodyHandle) -> Result<u64, PhysicsError> {
    if handle.world == world {
        Ok(handle.id)
    } else {
        Err(PhysicsError::InvalidHandle(format!(
            "body {} belongs to world {}, not world {}",
            handle.id, handle.world, world
        )))
    }
}

pub(crate) fn check_constraint_handle(world: WorldId, handle: PhysicsConstraintHandle) -> Result<u64, PhysicsError> {
    if handle.world == world {
        Ok(handle.id)
    } else {
        Err(PhysicsError::InvalidHandle(format!(
            "constraint {} belongs to world {}, not world {}",
            handle.id, handle.world, world
        )))
    }
}

pub(crate) fn unknown_body(handle: PhysicsBodyHandle) -> PhysicsError {
    PhysicsError::InvalidHandle(format!("unknown body handle {}", handle.id))
}

/// Immutable snapshot of a body exchanged between simulation, hand-off and rendering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsBodyState {
    pub position: Vector3,
    pub orientation: Quaternion,
    pub linear_velocity: Vector3,
    pub angular_velocity: Vector3,
    pub reference_frame: ReferenceFrame,
    pub timestamp: f64,
}

impl PhysicsBodyState {
    pub fn new(
        position: Vector3,
        orientation: Quaternion,
        linear_velocity: Vector3,
        angular_velocity: Vector3,
        reference_frame: ReferenceFrame,
        timestamp: f64,
    ) -> Result<Self, PhysicsError> {
        let state = Self { position, orientation, linear_velocity, angular_velocity, reference_frame, timestamp };
        state.validate()?;
        Ok(state)
    }

    /// A body at `position` with identity orientation and no motion.
    pub fn at_rest(position: Vector3, reference_frame: ReferenceFrame) -> Result<Self, PhysicsError> {
        Self::new(position, Quaternion::identity(), ZERO_VECTOR, ZERO_VECTOR, reference_frame, 0.0)
    }

    pub fn with_linear_velocity(mut self, linear_velocity: Vector3) -> Result<Self, PhysicsError> {
        self.linear_velocity = ensure_finite_vector(linear_velocity, "linear velocity")?;
        Ok(self)
    }

    pub fn with_angular_velocity(mut self, angular_velocity: Vector3) -> Result<Self, PhysicsError> {
        self.angular_velocity = ensure_finite_vector(angular_velocity, "angular velocity")?;
        Ok(self)
    }

    pub fn with_orientation(mut self, orientation: Quaternion) -> Result<Self, PhysicsError> {
        if !orientation.is_finite() {
            return Err(PhysicsError::invalid_argument("orientation must be finite"));
        }
        self.orientation = orientation;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), PhysicsError> {
        ensure_finite_vector(self.position, "position")?;
        ensure_finite_vector(self.linear_velocity, "linear velocity")?;
        ensure_finite_vector(self.angular_velocity, "angular velocity")?;
        ensure_finite(self.timestamp, "timestamp")?;
        if !self.orientation.is_finite() {
            return Err(PhysicsError::invalid_argument("orientation must be finite"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhysicsBodyType {
    Static,
    Kinematic,
    Dynamic,
}

/// Collision shape in body-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PhysicsShape {
    Box { half_extents: Vector3 },
    Sphere { radius: f64 },
    /// Segment along local Y of `half_height` either side of the center, swept by `radius`.
    Capsule { radius: f64, half_height: f64 },
}

impl PhysicsShape {
    pub fn validate(&self) -> Result<(), PhysicsError> {
        let valid = match *self {
            PhysicsShape::Box { half_extents } => {
                ensure_finite_vector(half_extents, "box half extents")?;
                half_extents.0 > 0.0 && half_extents.1 > 0.0 && half_extents.2 > 0.0
            }
            PhysicsShape::Sphere { radius } => ensure_finite(radius, "sphere radius")? > 0.0,
            PhysicsShape::Capsule { radius, half_height } => {
                ensure_finite(radius, "capsule radius")? > 0.0 && ensure_finite(half_height, "capsule half height")? >= 0.0
            }
        };
        if valid {
            Ok(())
        } else {
            Err(PhysicsError::invalid_argument(format!("shape dimensions must be positive: {:?}", self)))
        }
    }

    /// Radius of a sphere around the body origin enclosing the shape.
    pub fn bounding_radius(&self) -> f64 {
        match *self {
            PhysicsShape::Box { half_extents: (x, y, z) } => (x * x + y * y + z * z).sqrt(),
            PhysicsShape::Sphere { radius } => radius,
            PhysicsShape::Capsule { radius, half_height } => radius + half_height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsBodyDefinition {
    pub body_type: PhysicsBodyType,
    pub shape: PhysicsShape,
    pub mass_kg: f64,
    /// `None` uses the world's contact friction.
    pub friction: Option<f64>,
    /// `None` uses the world's contact bounce.
    pub restitution: Option<f64>,
    pub filter: CollisionFilter,
    pub initial_state: PhysicsBodyState,
}

impl PhysicsBodyDefinition {
    pub fn new(
        body_type: PhysicsBodyType,
        shape: PhysicsShape,
        mass_kg: f64,
        initial_state: PhysicsBodyState,
    ) -> Result<Self, PhysicsError> {
        shape.validate()?;
        ensure_finite(mass_kg, "mass")?;
        if mass_kg < 0.0 {
            return Err(PhysicsError::invalid_argument(format!("mass must be >= 0, got {}", mass_kg)));
        }
        initial_state.validate()?;
        Ok(Self {
            body_type,
            shape,
            mass_kg,
            friction: None,
            restitution: None,
            filter: CollisionFilter::default(),
            initial_state,
        })
    }

    pub fn with_material(mut self, friction: f64, restitution: f64) -> Result<Self, PhysicsError> {
        if friction.is_nan() || friction < 0.0 {
            return Err(PhysicsError::invalid_argument("friction must be >= 0"));
        }
        ensure_finite(restitution, "restitution")?;
        if !(0.0..=1.0).contains(&restitution) {
            return Err(PhysicsError::invalid_argument("restitution must be in [0,1]"));
        }
        self.friction = Some(friction);
        self.restitution = Some(restitution);
        Ok(self)
    }

    pub fn with_filter(mut self, filter: CollisionFilter) -> Self {
        self.filter = filter;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhysicsConstraintType {
    Fixed,
    Ball,
    Hinge,
    Slider,
}

/// Joint between two bodies, or between one body and the world anchor when `body_b` is `None`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsConstraintDefinition {
    pub constraint_type: PhysicsConstraintType,
    pub body_a: PhysicsBodyHandle,
    pub body_b: Option<PhysicsBodyHandle>,
    pub anchor: Vector3,
    pub axis: Vector3,
    pub stiffness: f64,
}

impl PhysicsConstraintDefinition {
    pub fn new(
        constraint_type: PhysicsConstraintType,
        body_a: PhysicsBodyHandle,
        body_b: Option<PhysicsBodyHandle>,
        anchor: Vector3,
    ) -> Result<Self, PhysicsError> {
        ensure_finite_vector(anchor, "anchor")?;
        if body_b == Some(body_a) {
            return Err(PhysicsError::invalid_argument("a constraint needs two distinct bodies"));
        }
        Ok(Self { constraint_type, body_a, body_b, anchor, axis: (0.0, 1.0, 0.0), stiffness: 1.0 })
    }

    pub fn with_axis(mut self, axis: Vector3) -> Result<Self, PhysicsError> {
        self.axis = ensure_finite_vector(axis, "axis")?;
        Ok(self)
    }

    pub fn with_stiffness(mut self, stiffness: f64) -> Result<Self, PhysicsError> {
        ensure_finite(stiffness, "stiffness")?;
        if !(0.0..=1.0).contains(&stiffness) {
            return Err(PhysicsError::invalid_argument("stiffness must be in [0,1]"));
        }
        self.stiffness = stiffness;
        Ok(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PhysicsCapabilities {
    pub rigid_bodies: bool,
    pub n_body: bool,
    pub constraints: bool,
    pub queries: bool,
    pub deterministic_stepping: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsRuntimeTuning {
    pub solver_iterations: usize,
    pub contact_friction: f64,
    pub contact_bounce: f64,
    pub contact_soft_cfm: f64,
    pub contact_bounce_velocity: f64,
}

impl Default for PhysicsRuntimeTuning {
    fn default() -> Self {
        Self {
            solver_iterations: DEFAULT_RUNTIME_SOLVER_ITERATIONS,
            contact_friction: DEFAULT_CONTACT_FRICTION,
            contact_bounce: DEFAULT_CONTACT_BOUNCE,
            contact_soft_cfm: DEFAULT_CONTACT_SOFT_CFM,
            contact_bounce_velocity: DEFAULT_CONTACT_BOUNCE_VELOCITY,
        }
    }
}

impl PhysicsRuntimeTuning {
    pub fn new(
        solver_iterations: Option<usize>,
        contact_friction: Option<f64>,
        contact_bounce: Option<f64>,
        contact_soft_cfm: Option<f64>,
        contact_bounce_velocity: Option<f64>,
    ) -> Result<Self, PhysicsError> {
        let default = Self::default();
        let tuning = Self {
            solver_iterations: solver_iterations.unwrap_or(default.solver_iterations),
            contact_friction: contact_friction.unwrap_or(default.contact_friction),
            contact_bounce: contact_bounce.unwrap_or(default.contact_bounce),
            contact_soft_cfm: contact_soft_cfm.unwrap_or(default.contact_soft_cfm),
            contact_bounce_velocity: contact_bounce_velocity.unwrap_or(default.contact_bounce_velocity),
        };
        tuning.validate()?;
        Ok(tuning)
    }

    /// Friction may be `+inf` (no slip); every other value must be finite.
    pub fn validate(&self) -> Result<(), PhysicsError> {
        if self.solver_iterations == 0 {
            return Err(PhysicsError::invalid_argument("solver iterations must be >= 1"));
        }
        if self.contact_friction.is_nan() || self.contact_friction < 0.0 {
            return Err(PhysicsError::invalid_argument("contact friction must be >= 0"));
        }
        if !(0.0..=1.0).contains(&ensure_finite(self.contact_bounce, "contact bounce")?) {
            return Err(PhysicsError::invalid_argument("contact bounce must be in [0,1]"));
        }
        if ensure_finite(self.contact_soft_cfm, "contact soft cfm")? < 0.0 {
            return Err(PhysicsError::invalid_argument("contact soft cfm must be >= 0"));
        }
        if ensure_finite(self.contact_bounce_velocity, "contact bounce velocity")? < 0.0 {
            return Err(PhysicsError::invalid_argument("contact bounce velocity must be >= 0"));
        }
        Ok(())
    }
}

/// Creation-time settings shared by every backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsWorldConfiguration {
    pub reference_frame: ReferenceFrame,
    pub gravity: Vector3,
    pub fixed_step_seconds: f64,
    pub runtime_tuning: PhysicsRuntimeTuning,
}

impl Default for PhysicsWorldConfiguration {
    fn default() -> Self {
        Self {
            reference_frame: ReferenceFrame::World,
            gravity: DEFAULT_GRAVITY,
            fixed_step_seconds: DEFAULT_FIXED_STEP_SECONDS,
            runtime_tuning: PhysicsRuntimeTuning::default(),
        }
    }
}

impl PhysicsWorldConfiguration {
    pub fn new(
        reference_frame: Option<ReferenceFrame>,
        gravity: Option<Vector3>,
        fixed_step_seconds: Option<f64>,
        runtime_tuning: Option<PhysicsRuntimeTuning>,
    ) -> Result<Self, PhysicsError> {
        let default = Self::default();
        let configuration = Self {
            reference_frame: reference_frame.unwrap_or(default.reference_frame),
            gravity: gravity.unwrap_or(default.gravity),
            fixed_step_seconds: fixed_step_seconds.unwrap_or(default.fixed_step_seconds),
            runtime_tuning: runtime_tuning.unwrap_or(default.runtime_tuning),
        };
        configuration.validate()?;
        Ok(configuration)
    }

    pub fn validate(&self) -> Result<(), PhysicsError> {
        ensure_finite_vector(self.gravity, "gravity")?;
        ensure_time_step(self.fixed_step_seconds)?;
        self.runtime_tuning.validate()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastHit {
    pub body: PhysicsBodyHandle,
    pub distance: f64,
    pub point: Vector3,
    pub normal: Vector3,
}

/// Uniform contract over every simulation backend.
///
/// Handles are scoped to the world that issued them; passing a handle from another world
/// fails with `InvalidHandle`. Every operation on a closed world fails with `WorldClosed`.
pub trait PhysicsWorld: Send {
    fn backend_id(&self) -> &str;

    fn capabilities(&self) -> PhysicsCapabilities;

    fn configuration(&self) -> &PhysicsWorldConfiguration;

    fn create_body(&mut self, definition: &PhysicsBodyDefinition) -> Result<PhysicsBodyHandle, PhysicsError>;

    /// `Ok(false)` when the handle is well formed but no longer present.
    fn remove_body(&mut self, handle: PhysicsBodyHandle) -> Result<bool, PhysicsError>;

    /// Live body handles in creation order.
    fn body_handles(&self) -> Result<Vec<PhysicsBodyHandle>, PhysicsError>;

    fn body_state(&self, handle: PhysicsBodyHandle) -> Result<PhysicsBodyState, PhysicsError>;

    /// States in another frame are re-expressed in the world's frame.
    fn set_body_state(&mut self, handle: PhysicsBodyHandle, state: &PhysicsBodyState) -> Result<(), PhysicsError>;

    fn create_constraint(
        &mut self,
        definition: &PhysicsConstraintDefinition,
    ) -> Result<PhysicsConstraintHandle, PhysicsError>;

    fn remove_constraint(&mut self, handle: PhysicsConstraintHandle) -> Result<bool, PhysicsError>;

    fn constraint_handles(&self) -> Result<Vec<PhysicsConstraintHandle>, PhysicsError>;

    fn runtime_tuning(&self) -> Result<PhysicsRuntimeTuning, PhysicsError>;

    fn set_runtime_tuning(&mut self, tuning: PhysicsRuntimeTuning) -> Result<(), PhysicsError>;

    fn gravity(&self) -> Result<Vector3, PhysicsError>;

    fn set_gravity(&mut self, gravity: Vector3) -> Result<(), PhysicsError>;

    /// The only operation that advances simulated time.
    fn step(&mut self, dt: f64) -> Result<(), PhysicsError>;

    fn simulation_time(&self) -> f64;

    fn raycast(&self, _ray: &Ray3D, _max_distance: f64) -> Result<Option<RaycastHit>, PhysicsError> {
        Err(PhysicsError::unsupported(format!("{} does not support raycasts", self.backend_id())))
    }

    fn overlap_sphere(&self, _center: Vector3, _radius: f64) -> Result<Vec<PhysicsBodyHandle>, PhysicsError> {
        Err(PhysicsError::unsupported(format!("{} does not support overlap queries", self.backend_id())))
    }

    fn close(&mut self);

    fn is_closed(&self) -> bool;
}

/// A named engine able to create worlds.
pub trait PhysicsBackend: Send + Sync {
    fn id(&self) -> &str;

    fn capabilities(&self) -> PhysicsCapabilities;

    fn create_world(&self, configuration: PhysicsWorldConfiguration) -> Result<Box<dyn PhysicsWorld>, PhysicsError>;
}

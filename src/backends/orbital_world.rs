use std::collections::BTreeMap;

use log::{debug, info};

use crate::backends::{
    check_body_handle, check_constraint_handle, next_world_id, unknown_body, PhysicsBackend, PhysicsBodyDefinition,
    PhysicsBodyHandle, PhysicsBodyState, PhysicsBodyType, PhysicsCapabilities, PhysicsConstraintDefinition,
    PhysicsConstraintHandle, PhysicsRuntimeTuning, PhysicsWorld, PhysicsWorldConfiguration, ReferenceFrameBridge,
    WorldId,
};
use crate::utils::{
    add_scaled, add_vectors, ensure_finite, ensure_finite_vector, ensure_time_step, is_finite_vector, magnitude_squared,
    scale_vector, subtract_vectors, PhysicsError, Vector3,
};

pub const ORBITAL_BACKEND_ID: &str = "orekit";

/// Newtonian constant of gravitation in m^3 kg^-1 s^-2.
pub const GRAVITATIONAL_CONSTANT: f64 = 6.674_30e-11;

/// Squared separation below which a pair exerts no force (1 mm).
const MIN_SEPARATION_SQUARED: f64 = 1e-6;

#[derive(Debug, Clone, Copy)]
struct OrbitalBody {
    body_type: PhysicsBodyType,
    mass_kg: f64,
    state: PhysicsBodyState,
}

/// Point-mass n-body world integrated with classical RK4.
///
/// Every dynamic body is accelerated by the uniform gravity vector and by the Newtonian
/// attraction of every other body with positive mass, evaluated on the states at the
/// start of the step. States are kept in the configured reference frame; the epoch used
/// for frame transforms is the simulation time in seconds past J2000.
pub struct OrbitalWorld {
    world_id: WorldId,
    configuration: PhysicsWorldConfiguration,
    bodies: BTreeMap<u64, OrbitalBody>,
    next_body_id: u64,
    time_scale: f64,
    simulation_time: f64,
    closed: bool,
}

impl OrbitalWorld {
    /// # Errors
    /// `InvalidArgument` if the configuration fails validation.
    pub fn new(configuration: PhysicsWorldConfiguration) -> Result<Self, PhysicsError> {
        configuration.validate()?;
        let world_id = next_world_id();
        debug!("created orbital world {} in {:?}", world_id, configuration.reference_frame);
        Ok(Self {
            world_id,
            configuration,
            bodies: BTreeMap::new(),
            next_body_id: 1,
            time_scale: 1.0,
            simulation_time: 0.0,
            closed: false,
        })
    }

    pub fn world_id(&self) -> WorldId {
        self.world_id
    }

    pub fn time_scale(&self) -> f64 {
        self.time_scale
    }

    /// Multiplies every step's dt. Must be finite and strictly positive.
    pub fn set_time_scale(&mut self, time_scale: f64) -> Result<(), PhysicsError> {
        self.ensure_open()?;
        if !(ensure_finite(time_scale, "time scale")? > 0.0) {
            return Err(PhysicsError::invalid_argument("time scale must be > 0"));
        }
        self.time_scale = time_scale;
        Ok(())
    }

    /// Seconds past J2000 at the current simulation time.
    pub fn epoch_seconds(&self) -> f64 {
        self.simulation_time
    }

    /// Propagates to the absolute simulation time `target_time`, ignoring the time scale.
    /// A target equal to the current time is a no-op.
    ///
    /// # Errors
    /// `NonMonotonicTime` for a target earlier than the current time, `InvalidArgument`
    /// for a non-finite target, `WorldClosed` after `close`.
    pub fn advance_to(&mut self, target_time: f64) -> Result<(), PhysicsError> {
        self.ensure_open()?;
        ensure_finite(target_time, "target time")?;
        if target_time < self.simulation_time {
            return Err(PhysicsError::NonMonotonicTime { requested: target_time, last: self.simulation_time });
        }
        let duration = target_time - self.simulation_time;
        if duration > 0.0 {
            self.integrate(duration, target_time)?;
        }
        Ok(())
    }

    /// Integrates every body over `duration` seconds of simulation time and lands the
    /// clock on `target_time`. Nothing is committed when a state leaves the finite range.
    fn integrate(&mut self, duration: f64, target_time: f64) -> Result<(), PhysicsError> {
        let frame = self.configuration.reference_frame;
        let mut next = BTreeMap::new();
        for (&id, body) in &self.bodies {
            let mut state = PhysicsBodyState { reference_frame: frame, timestamp: target_time, ..body.state };
            match body.body_type {
                PhysicsBodyType::Static => {}
                PhysicsBodyType::Kinematic => {
                    state.position = add_scaled(body.state.position, body.state.linear_velocity, duration);
                }
                PhysicsBodyType::Dynamic => {
                    let (position, velocity) = self.integrate_dynamic(id, &body.state, duration, &self.bodies);
                    state.position = position;
                    state.linear_velocity = velocity;
                }
            }
            if !is_finite_vector(state.position) || !is_finite_vector(state.linear_velocity) {
                return Err(PhysicsError::CalculationError(format!(
                    "orbital body {} left the finite range over a {}s step",
                    id, duration
                )));
            }
            next.insert(id, state);
        }
        for (id, state) in next {
            if let Some(body) = self.bodies.get_mut(&id) {
                body.state = state;
            }
        }
        self.simulation_time = target_time;
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), PhysicsError> {
        if self.closed {
            Err(PhysicsError::WorldClosed)
        } else {
            Ok(())
        }
    }

    fn normalize_frame(&self, state: &PhysicsBodyState) -> Result<PhysicsBodyState, PhysicsError> {
        state.validate()?;
        ReferenceFrameBridge::transform(state, self.configuration.reference_frame, self.epoch_seconds())
    }

    fn acceleration(&self, this: u64, position: Vector3, snapshot: &BTreeMap<u64, OrbitalBody>) -> Vector3 {
        let mut acceleration = self.configuration.gravity;
        for (&id, other) in snapshot {
            if id == this || !(other.mass_kg > 0.0) {
                continue;
            }
            let delta = subtract_vectors(other.state.position, position);
            let r2 = magnitude_squared(delta);
            if r2 < MIN_SEPARATION_SQUARED {
                continue;
            }
            let inv_r = 1.0 / r2.sqrt();
            let scale = GRAVITATIONAL_CONSTANT * other.mass_kg * inv_r * inv_r * inv_r;
            acceleration = add_scaled(acceleration, delta, scale);
        }
        acceleration
    }

    fn integrate_dynamic(
        &self,
        id: u64,
        state: &PhysicsBodyState,
        dt: f64,
        snapshot: &BTreeMap<u64, OrbitalBody>,
    ) -> (Vector3, Vector3) {
        let p0 = state.position;
        let v0 = state.linear_velocity;

        let k1p = v0;
        let k1v = self.acceleration(id, p0, snapshot);
        let k2p = add_scaled(v0, k1v, 0.5 * dt);
        let k2v = self.acceleration(id, add_scaled(p0, k1p, 0.5 * dt), snapshot);
        let k3p = add_scaled(v0, k2v, 0.5 * dt);
        let k3v = self.acceleration(id, add_scaled(p0, k2p, 0.5 * dt), snapshot);
        let k4p = add_scaled(v0, k3v, dt);
        let k4v = self.acceleration(id, add_scaled(p0, k3p, dt), snapshot);

        let weighted = |k1: Vector3, k2: Vector3, k3: Vector3, k4: Vector3| {
            add_vectors(add_vectors(k1, scale_vector(add_vectors(k2, k3), 2.0)), k4)
        };
        (
            add_scaled(p0, weighted(k1p, k2p, k3p, k4p), dt / 6.0),
            add_scaled(v0, weighted(k1v, k2v, k3v, k4v), dt / 6.0),
        )
    }
}

impl PhysicsWorld for OrbitalWorld {
    fn backend_id(&self) -> &str {
        ORBITAL_BACKEND_ID
    }

    fn capabilities(&self) -> PhysicsCapabilities {
        OrbitalBackend.capabilities()
    }

    fn configuration(&self) -> &PhysicsWorldConfiguration {
        &self.configuration
    }

    fn create_body(&mut self, definition: &PhysicsBodyDefinition) -> Result<PhysicsBodyHandle, PhysicsError> {
        self.ensure_open()?;
        let state = self.normalize_frame(&definition.initial_state)?;
        if ensure_finite(definition.mass_kg, "mass")? < 0.0 {
            return Err(PhysicsError::invalid_argument(format!("mass must be >= 0, got {}", definition.mass_kg)));
        }
        let id = self.next_body_id;
        self.next_body_id += 1;
        self.bodies.insert(id, OrbitalBody { body_type: definition.body_type, mass_kg: definition.mass_kg, state });
        Ok(PhysicsBodyHandle::new(self.world_id, id))
    }

    fn remove_body(&mut self, handle: PhysicsBodyHandle) -> Result<bool, PhysicsError> {
        self.ensure_open()?;
        let id = check_body_handle(self.world_id, handle)?;
        Ok(self.bodies.remove(&id).is_some())
    }

    fn body_handles(&self) -> Result<Vec<PhysicsBodyHandle>, PhysicsError> {
        self.ensure_open()?;
        Ok(self.bodies.keys().map(|&id| PhysicsBodyHandle::new(self.world_id, id)).collect())
    }

    fn body_state(&self, handle: PhysicsBodyHandle) -> Result<PhysicsBodyState, PhysicsError> {
        self.ensure_open()?;
        let id = check_body_handle(self.world_id, handle)?;
        self.bodies.get(&id).map(|body| body.state).ok_or_else(|| unknown_body(handle))
    }

    fn set_body_state(&mut self, handle: PhysicsBodyHandle, state: &PhysicsBodyState) -> Result<(), PhysicsError> {
        self.ensure_open()?;
        let id = check_body_handle(self.world_id, handle)?;
        if !self.bodies.contains_key(&id) {
            return Err(unknown_body(handle));
        }
        let normalized = self.normalize_frame(state)?;
        if let Some(body) = self.bodies.get_mut(&id) {
            body.state = normalized;
        }
        Ok(())
    }

    fn create_constraint(
        &mut self,
        _definition: &PhysicsConstraintDefinition,
    ) -> Result<PhysicsConstraintHandle, PhysicsError> {
        self.ensure_open()?;
        Err(PhysicsError::unsupported(format!("{} does not support rigid-body constraints", ORBITAL_BACKEND_ID)))
    }

    fn remove_constraint(&mut self, handle: PhysicsConstraintHandle) -> Result<bool, PhysicsError> {
        self.ensure_open()?;
        check_constraint_handle(self.world_id, handle)?;
        Ok(false)
    }

    fn constraint_handles(&self) -> Result<Vec<PhysicsConstraintHandle>, PhysicsError> {
        self.ensure_open()?;
        Ok(Vec::new())
    }

    fn runtime_tuning(&self) -> Result<PhysicsRuntimeTuning, PhysicsError> {
        self.ensure_open()?;
        Ok(self.configuration.runtime_tuning)
    }

    fn set_runtime_tuning(&mut self, tuning: PhysicsRuntimeTuning) -> Result<(), PhysicsError> {
        self.ensure_open()?;
        tuning.validate()?;
        self.configuration.runtime_tuning = tuning;
        Ok(())
    }

    fn gravity(&self) -> Result<Vector3, PhysicsError> {
        self.ensure_open()?;
        Ok(self.configuration.gravity)
    }

    fn set_gravity(&mut self, gravity: Vector3) -> Result<(), PhysicsError> {
        self.ensure_open()?;
        self.configuration.gravity = ensure_finite_vector(gravity, "gravity")?;
        Ok(())
    }

    fn step(&mut self, dt: f64) -> Result<(), PhysicsError> {
        self.ensure_open()?;
        let scaled_dt = ensure_time_step(dt)? * self.time_scale;
        let target_time = self.simulation_time + scaled_dt;
        self.integrate(scaled_dt, target_time)
    }

    fn simulation_time(&self) -> f64 {
        self.simulation_time
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.bodies.clear();
            info!("closed orbital world {}", self.world_id);
        }
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

/// Backend id `"orekit"`: n-body point-mass propagation.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrbitalBackend;

impl PhysicsBackend for OrbitalBackend {
    fn id(&self) -> &str {
        ORBITAL_BACKEND_ID
    }

    fn capabilities(&self) -> PhysicsCapabilities {
        PhysicsCapabilities {
            rigid_bodies: false,
            n_body: true,
            constraints: false,
            queries: false,
            deterministic_stepping: true,
        }
    }

    fn create_world(&self, configuration: PhysicsWorldConfiguration) -> Result<Box<dyn PhysicsWorld>, PhysicsError> {
        Ok(Box::new(OrbitalWorld::new(configuration)?))
    }
}

use std::collections::BTreeSet;
use std::sync::Arc;

use log::{debug, info, warn};
use parking_lot::Mutex;

use crate::backends::{
    check_body_handle, check_constraint_handle, next_world_id, unknown_body, NativeRuntime, PhysicsBackend,
    PhysicsBodyDefinition, PhysicsBodyHandle, PhysicsBodyState, PhysicsCapabilities, PhysicsConstraintDefinition,
    PhysicsConstraintHandle, PhysicsRuntimeTuning, PhysicsWorld, PhysicsWorldConfiguration, RaycastHit,
    ReferenceFrameBridge, RigidBodyWorld, RsBodyDesc, RsBodyState, RsRaycastRequest, RsWorldConfig, WorldId,
    NATIVE_LIBRARY_ENV, NATIVE_STATUS_INVALID,
};
use crate::models::Ray3D;
use crate::utils::{ensure_time_step, PhysicsError, Vector3};

pub const NATIVE_BACKEND_ID: &str = "jolt";

/// Environment variable that makes the native backend fall back unconditionally.
pub const NATIVE_FORCE_FAILURE_ENV: &str = "RS_PHYSICS_NATIVE_FORCE_FAILURE";

const NATIVE_CAPABILITIES: PhysicsCapabilities = PhysicsCapabilities {
    rigid_bodies: true,
    n_body: false,
    constraints: false,
    queries: true,
    deterministic_stepping: true,
};

/// World living inside the native engine. Bodies are owned by the engine; this side keeps
/// only their ids and the simulation clock.
pub struct NativeWorld {
    world_id: WorldId,
    runtime: Arc<NativeRuntime>,
    native_world: u64,
    configuration: PhysicsWorldConfiguration,
    bodies: BTreeSet<u64>,
    simulation_time: f64,
    closed: bool,
}

impl NativeWorld {
    /// # Errors
    /// `InvalidArgument` for a bad configuration, `NativeCallFailed` if the engine refuses it.
    pub fn new(runtime: Arc<NativeRuntime>, configuration: PhysicsWorldConfiguration) -> Result<Self, PhysicsError> {
        configuration.validate()?;
        let native_config = RsWorldConfig {
            gravity: configuration.gravity.into(),
            fixed_step_seconds: configuration.fixed_step_seconds,
            solver_iterations: u32::try_from(configuration.runtime_tuning.solver_iterations).unwrap_or(u32::MAX),
        };
        let native_world = runtime.world_create(&native_config)?;
        let world_id = next_world_id();
        debug!("created native world {} (engine handle {}) from '{}'", world_id, native_world, runtime.library());
        Ok(Self {
            world_id,
            runtime,
            native_world,
            configuration,
            bodies: BTreeSet::new(),
            simulation_time: 0.0,
            closed: false,
        })
    }

    pub fn world_id(&self) -> WorldId {
        self.world_id
    }

    fn ensure_open(&self) -> Result<(), PhysicsError> {
        if self.closed {
            Err(PhysicsError::WorldClosed)
        } else {
            Ok(())
        }
    }

    fn body_id(&self, handle: PhysicsBodyHandle) -> Result<u64, PhysicsError> {
        let id = check_body_handle(self.world_id, handle)?;
        if self.bodies.contains(&id) {
            Ok(id)
        } else {
            Err(unknown_body(handle))
        }
    }

    fn in_world_frame(&self, state: &PhysicsBodyState) -> Result<PhysicsBodyState, PhysicsError> {
        state.validate()?;
        let transformed =
            ReferenceFrameBridge::transform(state, self.configuration.reference_frame, self.simulation_time)?;
        Ok(PhysicsBodyState { timestamp: self.simulation_time, ..transformed })
    }

    fn unsupported(&self, operation: &str) -> PhysicsError {
        PhysicsError::unsupported(format!("{} does not support {}", NATIVE_BACKEND_ID, operation))
    }
}

impl PhysicsWorld for NativeWorld {
    fn backend_id(&self) -> &str {
        NATIVE_BACKEND_ID
    }

    fn capabilities(&self) -> PhysicsCapabilities {
        NATIVE_CAPABILITIES
    }

    fn configuration(&self) -> &PhysicsWorldConfiguration {
        &self.configuration
    }

    fn create_body(&mut self, definition: &PhysicsBodyDefinition) -> Result<PhysicsBodyHandle, PhysicsError> {
        self.ensure_open()?;
        definition.shape.validate()?;
        let state = self.in_world_frame(&definition.initial_state)?;
        let desc = RsBodyDesc::from_definition(definition, &state);
        let id = self.runtime.body_create(self.native_world, &desc)?;
        self.bodies.insert(id);
        Ok(PhysicsBodyHandle::new(self.world_id, id))
    }

    fn remove_body(&mut self, handle: PhysicsBodyHandle) -> Result<bool, PhysicsError> {
        self.ensure_open()?;
        let id = check_body_handle(self.world_id, handle)?;
        if !self.bodies.remove(&id) {
            return Ok(false);
        }
        self.runtime.body_destroy(self.native_world, id)
    }

    fn body_handles(&self) -> Result<Vec<PhysicsBodyHandle>, PhysicsError> {
        self.ensure_open()?;
        Ok(self.bodies.iter().map(|&id| PhysicsBodyHandle::new(self.world_id, id)).collect())
    }

    fn body_state(&self, handle: PhysicsBodyHandle) -> Result<PhysicsBodyState, PhysicsError> {
        self.ensure_open()?;
        let id = self.body_id(handle)?;
        self.runtime
            .body_get_state(self.native_world, id)?
            .to_state(self.configuration.reference_frame)
    }

    fn set_body_state(&mut self, handle: PhysicsBodyHandle, state: &PhysicsBodyState) -> Result<(), PhysicsError> {
        self.ensure_open()?;
        let id = self.body_id(handle)?;
        let state = self.in_world_frame(state)?;
        self.runtime.body_set_state(self.native_world, id, &RsBodyState::from(&state))
    }

    fn create_constraint(
        &mut self,
        _definition: &PhysicsConstraintDefinition,
    ) -> Result<PhysicsConstraintHandle, PhysicsError> {
        self.ensure_open()?;
        Err(self.unsupported("constraints"))
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

    fn set_runtime_tuning(&mut self, _tuning: PhysicsRuntimeTuning) -> Result<(), PhysicsError> {
        self.ensure_open()?;
        Err(self.unsupported("runtime tuning changes"))
    }

    fn gravity(&self) -> Result<Vector3, PhysicsError> {
        self.ensure_open()?;
        Ok(self.configuration.gravity)
    }

    fn set_gravity(&mut self, _gravity: Vector3) -> Result<(), PhysicsError> {
        self.ensure_open()?;
        Err(self.unsupported("gravity changes after creation"))
    }

    fn step(&mut self, dt: f64) -> Result<(), PhysicsError> {
        self.ensure_open()?;
        ensure_time_step(dt)?;
        self.runtime.world_step(self.native_world, dt)?;
        self.simulation_time += dt;
        Ok(())
    }

    fn simulation_time(&self) -> f64 {
        self.simulation_time
    }

    fn raycast(&self, ray: &Ray3D, max_distance: f64) -> Result<Option<RaycastHit>, PhysicsError> {
        self.ensure_open()?;
        if max_distance.is_nan() || max_distance < 0.0 {
            return Err(PhysicsError::invalid_argument("max distance must be >= 0"));
        }
        let request = RsRaycastRequest {
            origin: ray.origin().into(),
            direction: ray.direction().into(),
            max_distance: max_distance.clamp(f64::MIN_POSITIVE, f64::MAX),
        };
        let Some(hit) = self.runtime.world_raycast(self.native_world, &request)? else {
            return Ok(None);
        };
        if !self.bodies.contains(&hit.body) {
            return Err(PhysicsError::NativeCallFailed { operation: "world_raycast", status: NATIVE_STATUS_INVALID });
        }
        Ok(Some(RaycastHit {
            body: PhysicsBodyHandle::new(self.world_id, hit.body),
            distance: hit.distance,
            point: hit.point.into(),
            normal: hit.normal.into(),
        }))
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.bodies.clear();
        match self.runtime.world_destroy(self.native_world) {
            Ok(()) => info!("closed native world {}", self.world_id),
            Err(err) => warn!("native world {} did not close cleanly: {}", self.world_id, err),
        }
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for NativeWorld {
    fn drop(&mut self) {
        self.close();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NativeBackendOptions {
    /// Explicit library path; `None` uses the environment or the platform default name.
    pub library_path: Option<String>,
    /// Skip the native engine and fall back immediately.
    pub force_failure: bool,
    /// Surface native failures instead of falling back.
    pub strict: bool,
}

impl NativeBackendOptions {
    /// Reads `RS_PHYSICS_NATIVE_LIBRARY` and `RS_PHYSICS_NATIVE_FORCE_FAILURE`.
    pub fn from_env() -> Self {
        let library_path = std::env::var(NATIVE_LIBRARY_ENV)
            .ok()
            .filter(|path| !path.trim().is_empty());
        let force_failure = std::env::var(NATIVE_FORCE_FAILURE_ENV)
            .map(|value| is_truthy(&value))
            .unwrap_or(false);
        Self { library_path, force_failure, strict: false }
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// Backend id `"jolt"`: the native engine, falling back to the rigid-body engine when the
/// library cannot be used.
pub struct NativeBackend {
    options: NativeBackendOptions,
    runtime: Option<Arc<NativeRuntime>>,
    last_fallback_reason: Mutex<Option<String>>,
}

impl NativeBackend {
    pub fn new(options: NativeBackendOptions) -> Self {
        Self { options, runtime: None, last_fallback_reason: Mutex::new(None) }
    }

    pub fn from_env() -> Self {
        Self::new(NativeBackendOptions::from_env())
    }

    /// Uses `runtime` instead of loading a library.
    pub fn with_runtime(options: NativeBackendOptions, runtime: Arc<NativeRuntime>) -> Self {
        Self { runtime: Some(runtime), ..Self::new(options) }
    }

    pub fn options(&self) -> &NativeBackendOptions {
        &self.options
    }

    /// Why the most recent world creation fell back, if it did.
    pub fn last_fallback_reason(&self) -> Option<String> {
        self.last_fallback_reason.lock().clone()
    }

    fn native_world(&self, configuration: PhysicsWorldConfiguration) -> Result<NativeWorld, PhysicsError> {
        if self.options.force_failure {
            return Err(PhysicsError::NativeLibraryUnavailable {
                library: NativeRuntime::resolve_library_path(self.options.library_path.as_deref()),
                reason: "native backend disabled by forced-failure flag".to_string(),
            });
        }
        let runtime = match &self.runtime {
            Some(runtime) => Arc::clone(runtime),
            None => NativeRuntime::initialize(self.options.library_path.as_deref())?,
        };
        NativeWorld::new(runtime, configuration)
    }
}

impl PhysicsBackend for NativeBackend {
    fn id(&self) -> &str {
        NATIVE_BACKEND_ID
    }

    fn capabilities(&self) -> PhysicsCapabilities {
        NATIVE_CAPABILITIES
    }

    fn create_world(&self, configuration: PhysicsWorldConfiguration) -> Result<Box<dyn PhysicsWorld>, PhysicsError> {
        configuration.validate()?;
        match self.native_world(configuration) {
            Ok(world) => {
                *self.last_fallback_reason.lock() = None;
                Ok(Box::new(world))
            }
            Err(err) if self.options.strict => Err(err),
            Err(err) => {
                let reason = err.to_string();
                warn!("native backend '{}' unavailable, falling back: {}", NATIVE_BACKEND_ID, reason);
                *self.last_fallback_reason.lock() = Some(reason);
                Ok(Box::new(RigidBodyWorld::new(configuration)?))
            }
        }
    }
}

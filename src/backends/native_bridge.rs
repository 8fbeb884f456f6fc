//! C ABI of the native engine and the process-wide handle to the loaded library.
//!
//! Handles crossing the boundary are `u64`, with `0` meaning failure. Calls returning a
//! status use `0` for success and the negative `NATIVE_STATUS_*` codes otherwise.

use std::sync::Arc;

#[cfg(feature = "native")]
use log::{info, warn};
#[cfg(feature = "native")]
use parking_lot::{const_mutex, Mutex};

use crate::backends::{PhysicsBodyDefinition, PhysicsBodyState, PhysicsBodyType, PhysicsShape, ReferenceFrame};
use crate::models::Quaternion;
use crate::utils::{PhysicsError, Vector3};

pub const NATIVE_API_VERSION: u32 = 1;
pub const NATIVE_STATUS_OK: i32 = 0;
pub const NATIVE_STATUS_BAD_ARGUMENTS: i32 = -1;
pub const NATIVE_STATUS_NOT_FOUND: i32 = -2;
pub const NATIVE_STATUS_INVALID: i32 = -3;

pub const NATIVE_BODY_STATIC: i32 = 0;
pub const NATIVE_BODY_KINEMATIC: i32 = 1;
pub const NATIVE_BODY_DYNAMIC: i32 = 2;

pub const NATIVE_SHAPE_BOX: i32 = 0;
pub const NATIVE_SHAPE_SPHERE: i32 = 1;
pub const NATIVE_SHAPE_CAPSULE: i32 = 2;

/// Environment variable naming the shared library to load.
pub const NATIVE_LIBRARY_ENV: &str = "RS_PHYSICS_NATIVE_LIBRARY";
/// Base name of the reference shim, decorated per platform when no path is given.
pub const NATIVE_LIBRARY_NAME: &str = "rs_physics_shim";

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RsVec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl From<Vector3> for RsVec3 {
    fn from(v: Vector3) -> Self {
        Self { x: v.0, y: v.1, z: v.2 }
    }
}

impl From<RsVec3> for Vector3 {
    fn from(v: RsVec3) -> Self {
        (v.x, v.y, v.z)
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RsQuat {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Default for RsQuat {
    fn default() -> Self {
        Self { w: 1.0, x: 0.0, y: 0.0, z: 0.0 }
    }
}

impl From<Quaternion> for RsQuat {
    fn from(q: Quaternion) -> Self {
        Self { w: q.w, x: q.x, y: q.y, z: q.z }
    }
}

impl From<RsQuat> for Quaternion {
    fn from(q: RsQuat) -> Self {
        Quaternion::new(q.w, q.x, q.y, q.z)
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RsBodyState {
    pub position: RsVec3,
    pub orientation: RsQuat,
    pub linear_velocity: RsVec3,
    pub angular_velocity: RsVec3,
    pub timestamp: f64,
}

impl RsBodyState {
    pub fn is_finite(&self) -> bool {
        let finite = |v: RsVec3| v.x.is_finite() && v.y.is_finite() && v.z.is_finite();
        finite(self.position)
            && finite(self.linear_velocity)
            && finite(self.angular_velocity)
            && Quaternion::from(self.orientation).is_finite()
            && self.timestamp.is_finite()
    }

    /// The state tagged with `frame`; native engines carry no frame of their own.
    pub fn to_state(&self, frame: ReferenceFrame) -> Result<PhysicsBodyState, PhysicsError> {
        PhysicsBodyState::new(
            self.position.into(),
            self.orientation.into(),
            self.linear_velocity.into(),
            self.angular_velocity.into(),
            frame,
            self.timestamp,
        )
    }
}

impl From<&PhysicsBodyState> for RsBodyState {
    fn from(state: &PhysicsBodyState) -> Self {
        Self {
            position: state.position.into(),
            orientation: state.orientation.into(),
            linear_velocity: state.linear_velocity.into(),
            angular_velocity: state.angular_velocity.into(),
            timestamp: state.timestamp,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RsWorldConfig {
    pub gravity: RsVec3,
    pub fixed_step_seconds: f64,
    pub solver_iterations: u32,
}

/// Body description. `shape_size` holds the box half extents, the sphere radius in `x`,
/// or the capsule radius in `x` and half height in `y`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RsBodyDesc {
    pub body_type: i32,
    pub shape_type: i32,
    pub shape_size: RsVec3,
    pub mass_kg: f64,
    pub friction: f64,
    pub restitution: f64,
    pub initial_state: RsBodyState,
}

impl RsBodyDesc {
    /// Encodes `definition` with `state` already expressed in the world's frame.
    /// Unset material values are sent as negative numbers so the engine applies its own.
    pub fn from_definition(definition: &PhysicsBodyDefinition, state: &PhysicsBodyState) -> Self {
        let (shape_type, shape_size) = match definition.shape {
            PhysicsShape::Box { half_extents } => (NATIVE_SHAPE_BOX, half_extents.into()),
            PhysicsShape::Sphere { radius } => (NATIVE_SHAPE_SPHERE, RsVec3 { x: radius, y: 0.0, z: 0.0 }),
            PhysicsShape::Capsule { radius, half_height } => {
                (NATIVE_SHAPE_CAPSULE, RsVec3 { x: radius, y: half_height, z: 0.0 })
            }
        };
        Self {
            body_type: body_type_code(definition.body_type),
            shape_type,
            shape_size,
            mass_kg: definition.mass_kg,
            friction: definition.friction.map_or(-1.0, |f| f.min(f64::MAX)),
            restitution: definition.restitution.unwrap_or(-1.0),
            initial_state: state.into(),
        }
    }

    pub fn body_type(&self) -> Option<PhysicsBodyType> {
        match self.body_type {
            NATIVE_BODY_STATIC => Some(PhysicsBodyType::Static),
            NATIVE_BODY_KINEMATIC => Some(PhysicsBodyType::Kinematic),
            NATIVE_BODY_DYNAMIC => Some(PhysicsBodyType::Dynamic),
            _ => None,
        }
    }

    pub fn shape(&self) -> Option<PhysicsShape> {
        let size = self.shape_size;
        let shape = match self.shape_type {
            NATIVE_SHAPE_BOX => PhysicsShape::Box { half_extents: size.into() },
            NATIVE_SHAPE_SPHERE => PhysicsShape::Sphere { radius: size.x },
            NATIVE_SHAPE_CAPSULE => PhysicsShape::Capsule { radius: size.x, half_height: size.y },
            _ => return None,
        };
        shape.validate().ok().map(|_| shape)
    }
}

pub fn body_type_code(body_type: PhysicsBodyType) -> i32 {
    match body_type {
        PhysicsBodyType::Static => NATIVE_BODY_STATIC,
        PhysicsBodyType::Kinematic => NATIVE_BODY_KINEMATIC,
        PhysicsBodyType::Dynamic => NATIVE_BODY_DYNAMIC,
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RsRaycastRequest {
    pub origin: RsVec3,
    pub direction: RsVec3,
    pub max_distance: f64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RsRaycastHit {
    pub body: u64,
    pub distance: f64,
    pub point: RsVec3,
    pub normal: RsVec3,
}

pub type ApiVersionFn = unsafe extern "C" fn() -> u32;
pub type WorldCreateFn = unsafe extern "C" fn(*const RsWorldConfig) -> u64;
pub type WorldDestroyFn = unsafe extern "C" fn(u64) -> i32;
pub type BodyCreateFn = unsafe extern "C" fn(u64, *const RsBodyDesc) -> u64;
pub type BodyDestroyFn = unsafe extern "C" fn(u64, u64) -> i32;
pub type BodyGetStateFn = unsafe extern "C" fn(u64, u64, *mut RsBodyState) -> i32;
pub type BodySetStateFn = unsafe extern "C" fn(u64, u64, *const RsBodyState) -> i32;
pub type WorldStepFn = unsafe extern "C" fn(u64, f64) -> i32;
pub type WorldRaycastFn = unsafe extern "C" fn(u64, *const RsRaycastRequest, *mut RsRaycastHit) -> i32;

/// Entry points resolved from the native library.
#[derive(Debug, Clone, Copy)]
pub struct NativeApi {
    pub api_version: ApiVersionFn,
    pub world_create: WorldCreateFn,
    pub world_destroy: WorldDestroyFn,
    pub body_create: BodyCreateFn,
    pub body_destroy: BodyDestroyFn,
    pub body_get_state: BodyGetStateFn,
    pub body_set_state: BodySetStateFn,
    pub world_step: WorldStepFn,
    pub world_raycast: WorldRaycastFn,
}

#[cfg(feature = "native")]
impl NativeApi {
    /// # Safety
    /// `library` must export the `rs_physics_*` symbols with the signatures above.
    unsafe fn resolve(library: &libloading::Library) -> Result<Self, libloading::Error> {
        Ok(Self {
            api_version: *library.get::<ApiVersionFn>(b"rs_physics_api_version\0")?,
            world_create: *library.get::<WorldCreateFn>(b"rs_physics_world_create\0")?,
            world_destroy: *library.get::<WorldDestroyFn>(b"rs_physics_world_destroy\0")?,
            body_create: *library.get::<BodyCreateFn>(b"rs_physics_body_create\0")?,
            body_destroy: *library.get::<BodyDestroyFn>(b"rs_physics_body_destroy\0")?,
            body_get_state: *library.get::<BodyGetStateFn>(b"rs_physics_body_get_state\0")?,
            body_set_state: *library.get::<BodySetStateFn>(b"rs_physics_body_set_state\0")?,
            world_step: *library.get::<WorldStepFn>(b"rs_physics_world_step\0")?,
            world_raycast: *library.get::<WorldRaycastFn>(b"rs_physics_world_raycast\0")?,
        })
    }
}

fn check_status(operation: &'static str, status: i32) -> Result<(), PhysicsError> {
    if status == NATIVE_STATUS_OK {
        Ok(())
    } else {
        Err(PhysicsError::NativeCallFailed { operation, status })
    }
}

/// A loaded native engine. Function pointers stay valid for as long as the runtime lives.
#[derive(Debug)]
pub struct NativeRuntime {
    library: String,
    api: NativeApi,
    #[cfg(feature = "native")]
    _library: Option<libloading::Library>,
}

#[cfg(feature = "native")]
static RUNTIME: Mutex<Option<Result<Arc<NativeRuntime>, PhysicsError>>> = const_mutex(None);

impl NativeRuntime {
    /// Wraps an engine already linked into the process.
    ///
    /// # Errors
    /// `NativeLibraryUnavailable` if the engine reports an unsupported API version.
    pub fn from_api(library: impl Into<String>, api: NativeApi) -> Result<Self, PhysicsError> {
        let library = library.into();
        // SAFETY: the caller supplies function pointers following the C ABI above.
        let version = unsafe { (api.api_version)() };
        if version != NATIVE_API_VERSION {
            return Err(PhysicsError::NativeLibraryUnavailable {
                library,
                reason: format!("API version {} is not supported, expected {}", version, NATIVE_API_VERSION),
            });
        }
        Ok(Self {
            library,
            api,
            #[cfg(feature = "native")]
            _library: None,
        })
    }

    /// Path of the explicit library, else `RS_PHYSICS_NATIVE_LIBRARY`, else the platform file
    /// name of the reference shim.
    pub fn resolve_library_path(path: Option<&str>) -> String {
        if let Some(path) = path {
            return path.to_string();
        }
        match std::env::var(NATIVE_LIBRARY_ENV) {
            Ok(path) if !path.trim().is_empty() => path,
            _ => default_library_name(),
        }
    }

    /// Loads the native library once per process and caches the outcome, failures included.
    /// A later call with a different path returns the cached result until [`teardown`].
    ///
    /// [`teardown`]: NativeRuntime::teardown
    #[cfg(feature = "native")]
    pub fn initialize(path: Option<&str>) -> Result<Arc<NativeRuntime>, PhysicsError> {
        let mut slot = RUNTIME.lock();
        if let Some(cached) = slot.as_ref() {
            return cached.clone();
        }
        let library = Self::resolve_library_path(path);
        let outcome = Self::load(&library).map(Arc::new);
        match &outcome {
            Ok(_) => info!("loaded native physics library '{}'", library),
            Err(err) => warn!("native physics library unavailable: {}", err),
        }
        *slot = Some(outcome.clone());
        outcome
    }

    #[cfg(not(feature = "native"))]
    pub fn initialize(path: Option<&str>) -> Result<Arc<NativeRuntime>, PhysicsError> {
        Err(PhysicsError::NativeLibraryUnavailable {
            library: Self::resolve_library_path(path),
            reason: "built without the `native` feature".to_string(),
        })
    }

    #[cfg(feature = "native")]
    fn load(library: &str) -> Result<NativeRuntime, PhysicsError> {
        let unavailable = |reason: String| PhysicsError::NativeLibraryUnavailable { library: library.to_string(), reason };
        // SAFETY: loading runs the library's initialisers; the shim has none with side effects.
        let handle = unsafe { libloading::Library::new(library) }.map_err(|err| unavailable(err.to_string()))?;
        // SAFETY: the symbols are looked up by their documented names and signatures.
        let api = unsafe { NativeApi::resolve(&handle) }.map_err(|err| unavailable(err.to_string()))?;
        let mut runtime = Self::from_api(library, api)?;
        runtime._library = Some(handle);
        Ok(runtime)
    }

    /// Drops the cached runtime. Worlds still holding it keep the library loaded.
    #[cfg(feature = "native")]
    pub fn teardown() {
        if RUNTIME.lock().take().is_some() {
            info!("native physics runtime released");
        }
    }

    #[cfg(not(feature = "native"))]
    pub fn teardown() {}

    /// Whether a cached runtime loaded successfully.
    #[cfg(feature = "native")]
    pub fn is_available() -> bool {
        matches!(RUNTIME.lock().as_ref(), Some(Ok(_)))
    }

    #[cfg(not(feature = "native"))]
    pub fn is_available() -> bool {
        false
    }

    pub fn library(&self) -> &str {
        &self.library
    }

    pub fn api_version(&self) -> u32 {
        // SAFETY: validated when the runtime was created.
        unsafe { (self.api.api_version)() }
    }

    pub fn world_create(&self, config: &RsWorldConfig) -> Result<u64, PhysicsError> {
        // SAFETY: the pointer comes from a live reference for the duration of the call.
        let world = unsafe { (self.api.world_create)(config) };
        if world == 0 {
            return Err(PhysicsError::NativeCallFailed { operation: "world_create", status: NATIVE_STATUS_INVALID });
        }
        Ok(world)
    }

    pub fn world_destroy(&self, world: u64) -> Result<(), PhysicsError> {
        // SAFETY: plain integer arguments.
        check_status("world_destroy", unsafe { (self.api.world_destroy)(world) })
    }

    pub fn body_create(&self, world: u64, desc: &RsBodyDesc) -> Result<u64, PhysicsError> {
        // SAFETY: the pointer comes from a live reference for the duration of the call.
        let body = unsafe { (self.api.body_create)(world, desc) };
        if body == 0 {
            return Err(PhysicsError::NativeCallFailed { operation: "body_create", status: NATIVE_STATUS_INVALID });
        }
        Ok(body)
    }

    /// `Ok(false)` when the engine no longer knows the body.
    pub fn body_destroy(&self, world: u64, body: u64) -> Result<bool, PhysicsError> {
        // SAFETY: plain integer arguments.
        match unsafe { (self.api.body_destroy)(world, body) } {
            NATIVE_STATUS_OK => Ok(true),
            NATIVE_STATUS_NOT_FOUND => Ok(false),
            status => Err(PhysicsError::NativeCallFailed { operation: "body_destroy", status }),
        }
    }

    pub fn body_get_state(&self, world: u64, body: u64) -> Result<RsBodyState, PhysicsError> {
        let mut state = RsBodyState::default();
        // SAFETY: `state` outlives the call and is only written by the engine.
        check_status("body_get_state", unsafe { (self.api.body_get_state)(world, body, &mut state) })?;
        Ok(state)
    }

    pub fn body_set_state(&self, world: u64, body: u64, state: &RsBodyState) -> Result<(), PhysicsError> {
        // SAFETY: the pointer comes from a live reference for the duration of the call.
        check_status("body_set_state", unsafe { (self.api.body_set_state)(world, body, state) })
    }

    pub fn world_step(&self, world: u64, dt: f64) -> Result<(), PhysicsError> {
        // SAFETY: plain arguments.
        check_status("world_step", unsafe { (self.api.world_step)(world, dt) })
    }

    /// `Ok(None)` when nothing is hit within the request's range.
    pub fn world_raycast(&self, world: u64, request: &RsRaycastRequest) -> Result<Option<RsRaycastHit>, PhysicsError> {
        let mut hit = RsRaycastHit::default();
        // SAFETY: both pointers come from live locals for the duration of the call.
        match unsafe { (self.api.world_raycast)(world, request, &mut hit) } {
            NATIVE_STATUS_OK => Ok(Some(hit)),
            NATIVE_STATUS_NOT_FOUND => Ok(None),
            status => Err(PhysicsError::NativeCallFailed { operation: "world_raycast", status }),
        }
    }
}

#[cfg(feature = "native")]
fn default_library_name() -> String {
    libloading::library_filename(NATIVE_LIBRARY_NAME).to_string_lossy().into_owned()
}

#[cfg(not(feature = "native"))]
fn default_library_name() -> String {
    NATIVE_LIBRARY_NAME.to_string()
}

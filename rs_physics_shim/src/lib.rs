// rs_physics_shim/src/lib.rs
// C ABI over the core's rigid-body world, in the layout the native backend loads.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, warn};
use parking_lot::{const_mutex, Mutex};
use rs_physics_core::backends::{
    PhysicsBodyDefinition, PhysicsBodyHandle, PhysicsRuntimeTuning, PhysicsWorld, PhysicsWorldConfiguration,
    ReferenceFrame, RigidBodyWorld, RsBodyDesc, RsBodyState, RsRaycastHit, RsRaycastRequest, RsWorldConfig,
    NATIVE_API_VERSION, NATIVE_STATUS_BAD_ARGUMENTS, NATIVE_STATUS_INVALID, NATIVE_STATUS_NOT_FOUND,
    NATIVE_STATUS_OK,
};
use rs_physics_core::models::Ray3D;
use rs_physics_core::utils::PhysicsError;

struct ShimWorld {
    world: RigidBodyWorld,
    bodies: BTreeMap<u64, PhysicsBodyHandle>,
}

impl ShimWorld {
    fn handle(&self, body: u64) -> Result<PhysicsBodyHandle, PhysicsError> {
        self.bodies
            .get(&body)
            .copied()
            .ok_or_else(|| PhysicsError::InvalidHandle(format!("no body {}", body)))
    }
}

static WORLDS: Mutex<BTreeMap<u64, ShimWorld>> = const_mutex(BTreeMap::new());
static NEXT_WORLD: AtomicU64 = AtomicU64::new(1);

fn status_of(err: &PhysicsError) -> i32 {
    match err {
        PhysicsError::InvalidHandle(_) => NATIVE_STATUS_NOT_FOUND,
        err if err.is_invalid_input() => NATIVE_STATUS_BAD_ARGUMENTS,
        _ => NATIVE_STATUS_INVALID,
    }
}

fn status(result: Result<(), PhysicsError>) -> i32 {
    match result {
        Ok(()) => NATIVE_STATUS_OK,
        Err(err) => {
            debug!("shim call failed: {}", err);
            status_of(&err)
        }
    }
}

fn with_world<R>(world: u64, f: impl FnOnce(&mut ShimWorld) -> Result<R, PhysicsError>) -> Result<R, PhysicsError> {
    let mut worlds = WORLDS.lock();
    let shim = worlds
        .get_mut(&world)
        .ok_or_else(|| PhysicsError::InvalidHandle(format!("no world {}", world)))?;
    f(shim)
}

fn configuration(config: &RsWorldConfig) -> Result<PhysicsWorldConfiguration, PhysicsError> {
    let iterations = usize::try_from(config.solver_iterations)
        .map_err(|_| PhysicsError::invalid_argument("solver iterations out of range"))?;
    let tuning = PhysicsRuntimeTuning::new(Some(iterations), None, None, None, None)?;
    PhysicsWorldConfiguration::new(None, Some(config.gravity.into()), Some(config.fixed_step_seconds), Some(tuning))
}

fn definition(desc: &RsBodyDesc) -> Result<PhysicsBodyDefinition, PhysicsError> {
    let body_type = desc
        .body_type()
        .ok_or_else(|| PhysicsError::invalid_argument(format!("unknown body type {}", desc.body_type)))?;
    let shape = desc
        .shape()
        .ok_or_else(|| PhysicsError::invalid_argument(format!("bad shape {} {:?}", desc.shape_type, desc.shape_size)))?;
    let state = desc.initial_state.to_state(ReferenceFrame::World)?;
    let definition = PhysicsBodyDefinition::new(body_type, shape, desc.mass_kg, state)?;
    let friction = (desc.friction >= 0.0).then_some(desc.friction);
    let restitution = (desc.restitution >= 0.0).then_some(desc.restitution);
    let checked = definition.with_material(friction.unwrap_or(0.0), restitution.unwrap_or(0.0))?;
    Ok(PhysicsBodyDefinition { friction, restitution, ..checked })
}

#[no_mangle]
pub extern "C" fn rs_physics_api_version() -> u32 {
    NATIVE_API_VERSION
}

/// Returns a world id, or 0 on failure.
///
/// # Safety
/// `config` must be null or point to a valid `RsWorldConfig`.
#[no_mangle]
pub unsafe extern "C" fn rs_physics_world_create(config: *const RsWorldConfig) -> u64 {
    let Some(config) = config.as_ref() else {
        return 0;
    };
    match configuration(config).and_then(RigidBodyWorld::new) {
        Ok(world) => {
            let id = NEXT_WORLD.fetch_add(1, Ordering::Relaxed);
            WORLDS.lock().insert(id, ShimWorld { world, bodies: BTreeMap::new() });
            debug!("shim created world {}", id);
            id
        }
        Err(err) => {
            warn!("shim rejected world configuration: {}", err);
            0
        }
    }
}

#[no_mangle]
pub extern "C" fn rs_physics_world_destroy(world: u64) -> i32 {
    match WORLDS.lock().remove(&world) {
        Some(mut shim) => {
            shim.world.close();
            NATIVE_STATUS_OK
        }
        None => NATIVE_STATUS_NOT_FOUND,
    }
}

/// Returns a body id, or 0 on failure.
///
/// # Safety
/// `desc` must be null or point to a valid `RsBodyDesc`.
#[no_mangle]
pub unsafe extern "C" fn rs_physics_body_create(world: u64, desc: *const RsBodyDesc) -> u64 {
    let Some(desc) = desc.as_ref() else {
        return 0;
    };
    let created = with_world(world, |shim| {
        let handle = shim.world.create_body(&definition(desc)?)?;
        shim.bodies.insert(handle.id(), handle);
        Ok(handle.id())
    });
    created.unwrap_or_else(|err| {
        warn!("shim rejected body in world {}: {}", world, err);
        0
    })
}

#[no_mangle]
pub extern "C" fn rs_physics_body_destroy(world: u64, body: u64) -> i32 {
    status(with_world(world, |shim| {
        let handle = shim.handle(body)?;
        shim.bodies.remove(&body);
        shim.world.remove_body(handle).map(|_| ())
    }))
}

/// # Safety
/// `out` must be null or point to writable memory for one `RsBodyState`.
#[no_mangle]
pub unsafe extern "C" fn rs_physics_body_get_state(world: u64, body: u64, out: *mut RsBodyState) -> i32 {
    let Some(out) = out.as_mut() else {
        return NATIVE_STATUS_BAD_ARGUMENTS;
    };
    status(with_world(world, |shim| {
        let state = shim.world.body_state(shim.handle(body)?)?;
        *out = RsBodyState::from(&state);
        Ok(())
    }))
}

/// # Safety
/// `state` must be null or point to a valid `RsBodyState`.
#[no_mangle]
pub unsafe extern "C" fn rs_physics_body_set_state(world: u64, body: u64, state: *const RsBodyState) -> i32 {
    let Some(state) = state.as_ref() else {
        return NATIVE_STATUS_BAD_ARGUMENTS;
    };
    status(with_world(world, |shim| {
        let handle = shim.handle(body)?;
        shim.world.set_body_state(handle, &state.to_state(ReferenceFrame::World)?)
    }))
}

#[no_mangle]
pub extern "C" fn rs_physics_world_step(world: u64, dt: f64) -> i32 {
    status(with_world(world, |shim| shim.world.step(dt)))
}

/// Writes the nearest hit to `out`; returns `NATIVE_STATUS_NOT_FOUND` on a miss.
///
/// # Safety
/// `request` must be null or valid, `out` null or writable for one `RsRaycastHit`.
#[no_mangle]
pub unsafe extern "C" fn rs_physics_world_raycast(
    world: u64,
    request: *const RsRaycastRequest,
    out: *mut RsRaycastHit,
) -> i32 {
    let (Some(request), Some(out)) = (request.as_ref(), out.as_mut()) else {
        return NATIVE_STATUS_BAD_ARGUMENTS;
    };
    let hit = with_world(world, |shim| {
        let ray = Ray3D::new(request.origin.into(), request.direction.into())?;
        shim.world.raycast(&ray, request.max_distance)
    });
    match hit {
        Ok(Some(hit)) => {
            *out = RsRaycastHit {
                body: hit.body.id(),
                distance: hit.distance,
                point: hit.point.into(),
                normal: hit.normal.into(),
            };
            NATIVE_STATUS_OK
        }
        Ok(None) => NATIVE_STATUS_NOT_FOUND,
        Err(err) => status_of(&err),
    }
}

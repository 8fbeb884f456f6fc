use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{const_mutex, Mutex};

use crate::assert_float_eq;
use crate::backends::*;
use crate::models::Ray3D;
use crate::utils::PhysicsError;

/// In-process engine speaking the native C ABI: gravity on dynamic bodies, linear motion
/// for every non-static body and sphere-proxy raycasts.
struct FakeWorld {
    gravity: RsVec3,
    next_body: u64,
    bodies: BTreeMap<u64, (RsBodyDesc, RsBodyState)>,
}

static FAKE_WORLDS: Mutex<BTreeMap<u64, FakeWorld>> = const_mutex(BTreeMap::new());
static NEXT_FAKE_WORLD: AtomicU64 = AtomicU64::new(1);

unsafe extern "C" fn fake_api_version() -> u32 {
    NATIVE_API_VERSION
}

unsafe extern "C" fn fake_old_api_version() -> u32 {
    0
}

unsafe extern "C" fn fake_world_create(config: *const RsWorldConfig) -> u64 {
    let Some(config) = config.as_ref() else {
        return 0;
    };
    if !(config.fixed_step_seconds > 0.0) {
        return 0;
    }
    let id = NEXT_FAKE_WORLD.fetch_add(1, Ordering::Relaxed);
    FAKE_WORLDS.lock().insert(id, FakeWorld { gravity: config.gravity, next_body: 1, bodies: BTreeMap::new() });
    id
}

unsafe extern "C" fn fake_world_destroy(world: u64) -> i32 {
    match FAKE_WORLDS.lock().remove(&world) {
        Some(_) => NATIVE_STATUS_OK,
        None => NATIVE_STATUS_NOT_FOUND,
    }
}

unsafe extern "C" fn fake_body_create(world: u64, desc: *const RsBodyDesc) -> u64 {
    let Some(desc) = desc.as_ref() else {
        return 0;
    };
    let mut worlds = FAKE_WORLDS.lock();
    let Some(world) = worlds.get_mut(&world) else {
        return 0;
    };
    let id = world.next_body;
    world.next_body += 1;
    world.bodies.insert(id, (*desc, desc.initial_state));
    id
}

unsafe extern "C" fn fake_body_destroy(world: u64, body: u64) -> i32 {
    let mut worlds = FAKE_WORLDS.lock();
    match worlds.get_mut(&world).and_then(|w| w.bodies.remove(&body)) {
        Some(_) => NATIVE_STATUS_OK,
        None => NATIVE_STATUS_NOT_FOUND,
    }
}

unsafe extern "C" fn fake_body_get_state(world: u64, body: u64, out: *mut RsBodyState) -> i32 {
    let Some(out) = out.as_mut() else {
        return NATIVE_STATUS_BAD_ARGUMENTS;
    };
    let worlds = FAKE_WORLDS.lock();
    match worlds.get(&world).and_then(|w| w.bodies.get(&body)) {
        Some((_, state)) => {
            *out = *state;
            NATIVE_STATUS_OK
        }
        None => NATIVE_STATUS_NOT_FOUND,
    }
}

unsafe extern "C" fn fake_body_set_state(world: u64, body: u64, state: *const RsBodyState) -> i32 {
    let Some(state) = state.as_ref() else {
        return NATIVE_STATUS_BAD_ARGUMENTS;
    };
    if !state.is_finite() {
        return NATIVE_STATUS_INVALID;
    }
    let mut worlds = FAKE_WORLDS.lock();
    match worlds.get_mut(&world).and_then(|w| w.bodies.get_mut(&body)) {
        Some((_, stored)) => {
            *stored = *state;
            NATIVE_STATUS_OK
        }
        None => NATIVE_STATUS_NOT_FOUND,
    }
}

unsafe extern "C" fn fake_world_step(world: u64, dt: f64) -> i32 {
    let mut worlds = FAKE_WORLDS.lock();
    let Some(world) = worlds.get_mut(&world) else {
        return NATIVE_STATUS_NOT_FOUND;
    };
    let g = world.gravity;
    for (desc, state) in world.bodies.values_mut() {
        if desc.body_type == NATIVE_BODY_STATIC {
            continue;
        }
        if desc.body_type == NATIVE_BODY_DYNAMIC {
            state.linear_velocity.x += g.x * dt;
            state.linear_velocity.y += g.y * dt;
            state.linear_velocity.z += g.z * dt;
        }
        state.position.x += state.linear_velocity.x * dt;
        state.position.y += state.linear_velocity.y * dt;
        state.position.z += state.linear_velocity.z * dt;
        state.timestamp += dt;
    }
    NATIVE_STATUS_OK
}

unsafe extern "C" fn fake_world_raycast(world: u64, request: *const RsRaycastRequest, out: *mut RsRaycastHit) -> i32 {
    let (Some(request), Some(out)) = (request.as_ref(), out.as_mut()) else {
        return NATIVE_STATUS_BAD_ARGUMENTS;
    };
    let worlds = FAKE_WORLDS.lock();
    let Some(world) = worlds.get(&world) else {
        return NATIVE_STATUS_NOT_FOUND;
    };
    let mut best: Option<RsRaycastHit> = None;
    for (&id, (desc, state)) in &world.bodies {
        let radius = desc.shape_size.x;
        let m = (
            request.origin.x - state.position.x,
            request.origin.y - state.position.y,
            request.origin.z - state.position.z,
        );
        let d = request.direction;
        let b = m.0 * d.x + m.1 * d.y + m.2 * d.z;
        let c = m.0 * m.0 + m.1 * m.1 + m.2 * m.2 - radius * radius;
        let discriminant = b * b - c;
        if discriminant < 0.0 {
            continue;
        }
        let t = -b - discriminant.sqrt();
        if t < 0.0 || t > request.max_distance || best.is_some_and(|hit| hit.distance <= t) {
            continue;
        }
        let point = RsVec3 { x: request.origin.x + d.x * t, y: request.origin.y + d.y * t, z: request.origin.z + d.z * t };
        let normal = RsVec3 {
            x: (point.x - state.position.x) / radius,
            y: (point.y - state.position.y) / radius,
            z: (point.z - state.position.z) / radius,
        };
        best = Some(RsRaycastHit { body: id, distance: t, point, normal });
    }
    match best {
        Some(hit) => {
            *out = hit;
            NATIVE_STATUS_OK
        }
        None => NATIVE_STATUS_NOT_FOUND,
    }
}

fn fake_api() -> NativeApi {
    NativeApi {
        api_version: fake_api_version,
        world_create: fake_world_create,
        world_destroy: fake_world_destroy,
        body_create: fake_body_create,
        body_destroy: fake_body_destroy,
        body_get_state: fake_body_get_state,
        body_set_state: fake_body_set_state,
        world_step: fake_world_step,
        world_raycast: fake_world_raycast,
    }
}

fn fake_runtime() -> Arc<NativeRuntime> {
    Arc::new(NativeRuntime::from_api("fake-engine", fake_api()).unwrap())
}

fn sphere_at(body_type: PhysicsBodyType, position: (f64, f64, f64)) -> PhysicsBodyDefinition {
    let state = PhysicsBodyState::at_rest(position, ReferenceFrame::World).unwrap();
    PhysicsBodyDefinition::new(body_type, PhysicsShape::Sphere { radius: 1.0 }, 2.0, state).unwrap()
}

#[test]
fn test_runtime_rejects_unknown_api_version() {
    let api = NativeApi { api_version: fake_old_api_version, ..fake_api() };
    let err = NativeRuntime::from_api("old-engine", api).unwrap_err();
    assert!(matches!(err, PhysicsError::NativeLibraryUnavailable { ref library, .. } if library == "old-engine"));
}

#[test]
fn test_native_world_steps_bodies_in_the_engine() {
    let mut world = NativeWorld::new(fake_runtime(), PhysicsWorldConfiguration::default()).unwrap();
    assert_eq!(world.backend_id(), NATIVE_BACKEND_ID);
    let ball = world.create_body(&sphere_at(PhysicsBodyType::Dynamic, (0.0, 10.0, 0.0))).unwrap();
    let anchor = world.create_body(&sphere_at(PhysicsBodyType::Static, (5.0, 0.0, 0.0))).unwrap();

    world.step(0.1).unwrap();

    let state = world.body_state(ball).unwrap();
    assert_float_eq(state.linear_velocity.1, -0.981, 1e-12, None);
    assert_float_eq(state.position.1, 10.0 - 0.0981, 1e-12, None);
    assert_eq!(state.reference_frame, ReferenceFrame::World);
    assert_eq!(world.body_state(anchor).unwrap().position, (5.0, 0.0, 0.0));
    assert_float_eq(world.simulation_time(), 0.1, 1e-15, None);
    assert_eq!(world.body_handles().unwrap(), vec![ball, anchor]);
}

#[test]
fn test_native_world_set_state_and_remove() {
    let mut world = NativeWorld::new(fake_runtime(), PhysicsWorldConfiguration::default()).unwrap();
    let ball = world.create_body(&sphere_at(PhysicsBodyType::Kinematic, (0.0, 0.0, 0.0))).unwrap();
    let moving = world.body_state(ball).unwrap().with_linear_velocity((2.0, 0.0, 0.0)).unwrap();
    world.set_body_state(ball, &moving).unwrap();
    world.step(0.5).unwrap();
    assert_float_eq(world.body_state(ball).unwrap().position.0, 1.0, 1e-12, None);

    assert!(world.remove_body(ball).unwrap());
    assert!(!world.remove_body(ball).unwrap());
    assert!(world.body_state(ball).unwrap_err().is_invalid_input());
}

#[test]
fn test_native_raycast_maps_engine_hits_to_handles() {
    let mut world = NativeWorld::new(fake_runtime(), PhysicsWorldConfiguration::default()).unwrap();
    let target = world.create_body(&sphere_at(PhysicsBodyType::Static, (6.0, 0.0, 0.0))).unwrap();
    let ray = Ray3D::new((0.0, 0.0, 0.0), (1.0, 0.0, 0.0)).unwrap();

    let hit = world.raycast(&ray, f64::INFINITY).unwrap().unwrap();
    assert_eq!(hit.body, target);
    assert_float_eq(hit.distance, 5.0, 1e-12, None);
    assert_eq!(hit.normal, (-1.0, 0.0, 0.0));
    assert!(world.raycast(&ray, 2.0).unwrap().is_none());
}

#[test]
fn test_native_world_reports_unsupported_operations() {
    let mut world = NativeWorld::new(fake_runtime(), PhysicsWorldConfiguration::default()).unwrap();
    let a = world.create_body(&sphere_at(PhysicsBodyType::Dynamic, (0.0, 0.0, 0.0))).unwrap();
    let joint = PhysicsConstraintDefinition::new(PhysicsConstraintType::Fixed, a, None, (0.0, 0.0, 0.0)).unwrap();

    assert!(matches!(world.create_constraint(&joint), Err(PhysicsError::Unsupported(_))));
    assert!(matches!(world.set_gravity((0.0, 0.0, 0.0)), Err(PhysicsError::Unsupported(_))));
    assert!(matches!(
        world.set_runtime_tuning(PhysicsRuntimeTuning::default()),
        Err(PhysicsError::Unsupported(_))
    ));
    assert!(world.constraint_handles().unwrap().is_empty());
    assert!(!world.capabilities().constraints);
}

#[test]
fn test_closing_a_native_world() {
    let mut world = NativeWorld::new(fake_runtime(), PhysicsWorldConfiguration::default()).unwrap();
    world.create_body(&sphere_at(PhysicsBodyType::Dynamic, (0.0, 0.0, 0.0))).unwrap();
    world.close();
    assert!(world.is_closed());
    assert_eq!(world.step(0.1), Err(PhysicsError::WorldClosed));
    assert!(world.create_body(&sphere_at(PhysicsBodyType::Dynamic, (0.0, 0.0, 0.0))).is_err());
}

#[test]
fn test_backend_uses_supplied_runtime() {
    let backend = NativeBackend::with_runtime(NativeBackendOptions::default(), fake_runtime());
    let world = backend.create_world(PhysicsWorldConfiguration::default()).unwrap();
    assert_eq!(world.backend_id(), NATIVE_BACKEND_ID);
    assert_eq!(backend.last_fallback_reason(), None);
}

#[test]
fn test_forced_failure_falls_back_to_rigid_body_engine() {
    let options = NativeBackendOptions { force_failure: true, ..NativeBackendOptions::default() };
    let backend = NativeBackend::with_runtime(options, fake_runtime());

    let mut world = backend.create_world(PhysicsWorldConfiguration::default()).unwrap();
    assert_eq!(world.backend_id(), RIGID_BODY_BACKEND_ID);
    let reason = backend.last_fallback_reason().expect("fallback reason recorded");
    assert!(reason.contains("forced-failure"), "reason was {}", reason);

    let handle = world.create_body(&sphere_at(PhysicsBodyType::Dynamic, (0.0, 1.0, 0.0))).unwrap();
    world.step(0.1).unwrap();
    assert!(world.body_state(handle).unwrap().position.1 < 1.0, "fallback world simulates");
}

#[test]
fn test_strict_mode_surfaces_native_failure() {
    let options = NativeBackendOptions { force_failure: true, strict: true, ..NativeBackendOptions::default() };
    let backend = NativeBackend::new(options);
    let err = backend.create_world(PhysicsWorldConfiguration::default()).err().expect("strict mode never falls back");
    assert!(matches!(err, PhysicsError::NativeLibraryUnavailable { .. }));
    assert_eq!(backend.last_fallback_reason(), None);
}

#[test]
fn test_invalid_configuration_is_not_a_fallback() {
    let backend = NativeBackend::with_runtime(NativeBackendOptions::default(), fake_runtime());
    let configuration = PhysicsWorldConfiguration { fixed_step_seconds: -1.0, ..PhysicsWorldConfiguration::default() };
    assert!(backend.create_world(configuration).is_err());
    assert_eq!(backend.last_fallback_reason(), None);
}

#[test]
fn test_body_desc_encoding() {
    let state = PhysicsBodyState::at_rest((1.0, 2.0, 3.0), ReferenceFrame::World).unwrap();
    let definition = PhysicsBodyDefinition::new(
        PhysicsBodyType::Kinematic,
        PhysicsShape::Capsule { radius: 0.5, half_height: 2.0 },
        3.0,
        state,
    )
    .unwrap();
    let desc = RsBodyDesc::from_definition(&definition, &state);
    assert_eq!(desc.body_type, NATIVE_BODY_KINEMATIC);
    assert_eq!(desc.shape_type, NATIVE_SHAPE_CAPSULE);
    assert_eq!(desc.shape(), Some(PhysicsShape::Capsule { radius: 0.5, half_height: 2.0 }));
    assert_eq!(desc.body_type(), Some(PhysicsBodyType::Kinematic));
    assert!(desc.friction < 0.0 && desc.restitution < 0.0, "unset materials use engine defaults");
    assert_eq!(desc.initial_state.position, RsVec3 { x: 1.0, y: 2.0, z: 3.0 });
}

#[cfg(feature = "native")]
#[test]
fn test_missing_library_is_reported_with_its_name() {
    NativeRuntime::teardown();
    let err = NativeRuntime::initialize(Some("/nonexistent/librs_physics_missing.so")).unwrap_err();
    match err {
        PhysicsError::NativeLibraryUnavailable { library, .. } => assert!(library.contains("rs_physics_missing")),
        other => panic!("unexpected error {:?}", other),
    }
    assert!(!NativeRuntime::is_available());
    NativeRuntime::teardown();
}

use std::collections::BTreeMap;

use log::{debug, info};

use crate::backends::{
    check_body_handle, check_constraint_handle, next_world_id, unknown_body, PhysicsBackend, PhysicsBodyDefinition,
    PhysicsBodyHandle, PhysicsBodyState, PhysicsBodyType, PhysicsCapabilities, PhysicsConstraintDefinition,
    PhysicsConstraintHandle, PhysicsRuntimeTuning, PhysicsShape, PhysicsWorld, PhysicsWorldConfiguration,
    RaycastHit, ReferenceFrameBridge, WorldId,
};
#[cfg(feature = "constraints")]
use crate::backends::PhysicsConstraintType;
#[cfg(feature = "constraints")]
use crate::constraints::{DistanceConstraint3D, PointConstraint3D};
use crate::broad_phase::SweepAndPrune3D;
use crate::interactions::{
    ray_aabb_distance, ray_sphere_distance, CollisionFilter, ContactGenerator3D, Gjk3D, RigidBodyAdapter3D,
};
use crate::models::{Aabb, BoundingSphere, Capsule, ContactManifold3D, ConvexSupport3D, OrientedBox, Ray3D};
use crate::utils::{
    add_scaled, dot_product, ensure_finite, ensure_finite_vector, ensure_time_step, magnitude_squared,
    normalize_or, scale_vector, subtract_vectors, PhysicsError, Vector3, ZERO_VECTOR,
};
use crate::world::{CollisionEvent, CollisionScene, CollisionWorld3D, CollisionWorldConfig};

pub const RIGID_BODY_BACKEND_ID: &str = "ode4j";

/// Mass given to dynamic bodies defined with a non-positive mass.
pub const DEFAULT_DYNAMIC_MASS_KG: f64 = 1.0;

/// Orientations this close to identity use the closed-form box contact.
const AXIS_ALIGNED_EPSILON: f64 = 1e-9;

/// Body geometry posed in world space.
#[derive(Debug, Clone, Copy)]
enum Collider {
    Sphere(BoundingSphere),
    Box(OrientedBox),
    Capsule(Capsule),
}

impl ConvexSupport3D for Collider {
    fn support(&self, direction: Vector3) -> Vector3 {
        match self {
            Collider::Sphere(sphere) => sphere.support(direction),
            Collider::Box(obb) => obb.support(direction),
            Collider::Capsule(capsule) => capsule.support(direction),
        }
    }

    fn center(&self) -> Vector3 {
        match self {
            Collider::Sphere(sphere) => sphere.center(),
            Collider::Box(obb) => obb.center,
            Collider::Capsule(capsule) => capsule.center,
        }
    }
}

impl Collider {
    fn bounds(&self) -> Aabb {
        match self {
            Collider::Sphere(sphere) => sphere.to_aabb(),
            Collider::Box(obb) => obb.bounds(),
            Collider::Capsule(capsule) => capsule.bounds(),
        }
    }
}

#[derive(Debug, Clone)]
struct RigidBody {
    body_type: PhysicsBodyType,
    shape: PhysicsShape,
    inverse_mass: f64,
    friction: Option<f64>,
    restitution: Option<f64>,
    filter: CollisionFilter,
    state: PhysicsBodyState,
}

impl RigidBody {
    fn collider(&self) -> Option<Collider> {
        let position = self.state.position;
        let orientation = self.state.orientation;
        match self.shape {
            PhysicsShape::Sphere { radius } => BoundingSphere::new(position, radius).ok().map(Collider::Sphere),
            PhysicsShape::Box { half_extents } => {
                OrientedBox::new(position, half_extents, orientation).ok().map(Collider::Box)
            }
            PhysicsShape::Capsule { radius, half_height } => {
                Capsule::new(position, radius, half_height, orientation).ok().map(Collider::Capsule)
            }
        }
    }

    /// Distance and outward normal of the nearest ray hit.
    fn ray_hit(&self, ray: &Ray3D) -> Option<(f64, Vector3)> {
        let position = self.state.position;
        match self.shape {
            PhysicsShape::Sphere { radius } => {
                let sphere = BoundingSphere::new(position, radius).ok()?;
                let distance = ray_sphere_distance(ray, &sphere)?;
                let normal = normalize_or(subtract_vectors(ray.point_at(distance), position), ray_back(ray), 1e-12);
                Some((distance, normal))
            }
            PhysicsShape::Box { half_extents } => {
                let to_local = self.state.orientation.normalized().conjugate();
                let local_ray = Ray3D::new(
                    to_local.rotate_point(subtract_vectors(ray.origin(), position)),
                    to_local.rotate_point(ray.direction()),
                )
                .ok()?;
                let local_box = Aabb::from_center_half_extents(ZERO_VECTOR, half_extents).ok()?;
                let distance = ray_aabb_distance(&local_ray, &local_box)?;
                let local_normal = box_face_normal(local_ray.point_at(distance), half_extents);
                let normal = self.state.orientation.normalized().rotate_point(local_normal);
                Some((distance, normalize_or(normal, ray_back(ray), 1e-12)))
            }
            PhysicsShape::Capsule { radius, half_height } => {
                let capsule = Capsule::new(position, radius, half_height, self.state.orientation).ok()?;
                ray_capsule(ray, &capsule)
            }
        }
    }
}

fn ray_back(ray: &Ray3D) -> Vector3 {
    scale_vector(ray.direction(), -1.0)
}

/// Outward normal of the box face closest to a local-space point on its surface.
fn box_face_normal(point: Vector3, half_extents: Vector3) -> Vector3 {
    let ratios = [
        point.0 / half_extents.0.max(f64::EPSILON),
        point.1 / half_extents.1.max(f64::EPSILON),
        point.2 / half_extents.2.max(f64::EPSILON),
    ];
    let mut axis = 0;
    for candidate in 1..3 {
        if ratios[candidate].abs() > ratios[axis].abs() {
            axis = candidate;
        }
    }
    let sign = if ratios[axis] >= 0.0 { 1.0 } else { -1.0 };
    match axis {
        0 => (sign, 0.0, 0.0),
        1 => (0.0, sign, 0.0),
        _ => (0.0, 0.0, sign),
    }
}

fn closest_on_segment(start: Vector3, end: Vector3, point: Vector3) -> Vector3 {
    let segment = subtract_vectors(end, start);
    let length_squared = magnitude_squared(segment);
    if length_squared <= f64::EPSILON {
        return start;
    }
    let t = (dot_product(subtract_vectors(point, start), segment) / length_squared).clamp(0.0, 1.0);
    add_scaled(start, segment, t)
}

/// Ray against the capsule's cylinder wall and both end caps.
fn ray_capsule(ray: &Ray3D, capsule: &Capsule) -> Option<(f64, Vector3)> {
    let axis = capsule.axis();
    let start = add_scaled(capsule.center, axis, -capsule.half_height);
    let end = add_scaled(capsule.center, axis, capsule.half_height);
    let radius = capsule.radius;

    let origin = ray.origin();
    if magnitude_squared(subtract_vectors(origin, closest_on_segment(start, end, origin))) <= radius * radius {
        return Some((0.0, ray_back(ray)));
    }

    let mut best: Option<f64> = None;
    let mut consider = |t: f64| {
        if t >= 0.0 && best.map_or(true, |current| t < current) {
            best = Some(t);
        }
    };

    let d = ray.direction();
    let m = subtract_vectors(origin, start);
    let d_perp = add_scaled(d, axis, -dot_product(d, axis));
    let m_perp = add_scaled(m, axis, -dot_product(m, axis));
    let a = magnitude_squared(d_perp);
    if a > 1e-12 {
        let b = 2.0 * dot_product(m_perp, d_perp);
        let c = magnitude_squared(m_perp) - radius * radius;
        let discriminant = b * b - 4.0 * a * c;
        if discriminant >= 0.0 {
            let t = (-b - discriminant.sqrt()) / (2.0 * a);
            let s = dot_product(add_scaled(m, d, t), axis);
            if (0.0..=2.0 * capsule.half_height).contains(&s) {
                consider(t);
            }
        }
    }
    for cap in [start, end] {
        if let Ok(sphere) = BoundingSphere::new(cap, radius) {
            if let Some(t) = ray_sphere_distance(ray, &sphere) {
                consider(t);
            }
        }
    }

    let distance = best?;
    let point = ray.point_at(distance);
    let normal = normalize_or(subtract_vectors(point, closest_on_segment(start, end, point)), ray_back(ray), 1e-12);
    Some((distance, normal))
}

/// Body storage seen by the collision pipeline as both scene and solver adapter.
#[derive(Debug, Clone)]
struct BodyStore {
    bodies: BTreeMap<u64, RigidBody>,
    tuning: PhysicsRuntimeTuning,
    gjk: Gjk3D,
}

impl CollisionScene<u64> for BodyStore {
    fn bounds(&self, item: &u64) -> Option<Aabb> {
        self.bodies.get(item)?.collider().map(|collider| collider.bounds())
    }

    fn filter(&self, item: &u64) -> Option<CollisionFilter> {
        self.bodies.get(item).map(|body| body.filter)
    }

    fn contact(&self, a: &u64, b: &u64) -> Option<ContactManifold3D> {
        let collider_a = self.bodies.get(a)?.collider()?;
        let collider_b = self.bodies.get(b)?.collider()?;
        match (collider_a, collider_b) {
            (Collider::Sphere(sa), Collider::Sphere(sb)) => ContactGenerator3D::generate(&sa, &sb),
            (Collider::Box(ba), Collider::Box(bb))
                if ba.orientation.is_near_identity(AXIS_ALIGNED_EPSILON)
                    && bb.orientation.is_near_identity(AXIS_ALIGNED_EPSILON) =>
            {
                ContactGenerator3D::generate(&ba.bounds(), &bb.bounds())
            }
            (ca, cb) => ContactGenerator3D::generate_convex(&self.gjk, &ca, &cb),
        }
    }
}

impl RigidBodyAdapter3D<u64> for BodyStore {
    fn position(&self, body: u64) -> Vector3 {
        self.bodies.get(&body).map_or(ZERO_VECTOR, |b| b.state.position)
    }

    fn set_position(&mut self, body: u64, position: Vector3) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.state.position = position;
        }
    }

    fn velocity(&self, body: u64) -> Vector3 {
        self.bodies.get(&body).map_or(ZERO_VECTOR, |b| b.state.linear_velocity)
    }

    fn set_velocity(&mut self, body: u64, velocity: Vector3) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.state.linear_velocity = velocity;
        }
    }

    fn inverse_mass(&self, body: u64) -> f64 {
        self.bodies.get(&body).map_or(0.0, |b| b.inverse_mass)
    }

    fn restitution(&self, body: u64) -> f64 {
        self.bodies
            .get(&body)
            .map_or(0.0, |b| b.restitution.unwrap_or(self.tuning.contact_bounce))
    }

    fn friction(&self, body: u64) -> f64 {
        self.bodies
            .get(&body)
            .map_or(0.0, |b| b.friction.unwrap_or(self.tuning.contact_friction))
    }
}

#[derive(Debug, Clone, Copy)]
struct ConstraintRecord {
    definition: PhysicsConstraintDefinition,
    /// Separation captured when a two-body joint was created.
    rest_distance: f64,
}

/// General-purpose rigid-body world built on the crate's own collision pipeline.
///
/// Contacts are resolved by the sequential-impulse solver without angular response, so
/// orientations change only through the angular velocity a caller sets. Fixed and ball
/// joints are approximated by distance constraints at their creation-time separation.
pub struct RigidBodyWorld {
    world_id: WorldId,
    configuration: PhysicsWorldConfiguration,
    collision: CollisionWorld3D<u64>,
    store: BodyStore,
    constraints: BTreeMap<u64, ConstraintRecord>,
    next_body_id: u64,
    next_constraint_id: u64,
    simulation_time: f64,
    last_events: Vec<CollisionEvent<u64>>,
    closed: bool,
}

impl RigidBodyWorld {
    /// # Errors
    /// `InvalidArgument` if the configuration fails validation.
    pub fn new(configuration: PhysicsWorldConfiguration) -> Result<Self, PhysicsError> {
        configuration.validate()?;
        let collision_config = CollisionWorldConfig::new(
            Some(configuration.runtime_tuning.solver_iterations),
            None,
            None,
            Some(configuration.gravity),
        )?;
        let collision = CollisionWorld3D::with_config(Box::new(SweepAndPrune3D::new()), collision_config)?;
        let world_id = next_world_id();
        debug!("created rigid-body world {}", world_id);
        Ok(Self {
            world_id,
            configuration,
            collision,
            store: BodyStore {
                bodies: BTreeMap::new(),
                tuning: configuration.runtime_tuning,
                gjk: Gjk3D::default(),
            },
            constraints: BTreeMap::new(),
            next_body_id: 1,
            next_constraint_id: 1,
            simulation_time: 0.0,
            last_events: Vec::new(),
            closed: false,
        })
    }

    pub fn world_id(&self) -> WorldId {
        self.world_id
    }

    /// Contact events produced by the most recent step.
    pub fn contact_events(&self) -> &[CollisionEvent<u64>] {
        &self.last_events
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
        if self.store.bodies.contains_key(&id) {
            Ok(id)
        } else {
            Err(unknown_body(handle))
        }
    }

    fn in_world_frame(&self, state: &PhysicsBodyState) -> Result<PhysicsBodyState, PhysicsError> {
        state.validate()?;
        let transformed =
            ReferenceFrameBridge::transform(state, self.configuration.reference_frame, self.simulation_time)?;
        Ok(PhysicsBodyState {
            orientation: transformed.orientation.normalized(),
            timestamp: self.simulation_time,
            ..transformed
        })
    }

    #[cfg(feature = "constraints")]
    fn rebuild_constraints(&mut self) -> Result<(), PhysicsError> {
        self.collision.clear_constraints();
        for record in self.constraints.values() {
            let definition = &record.definition;
            let a = definition.body_a.id();
            match definition.body_b {
                Some(b) => {
                    let constraint =
                        DistanceConstraint3D::new(a, b.id(), record.rest_distance, definition.stiffness)?;
                    self.collision.add_constraint(Box::new(constraint));
                }
                None => {
                    let constraint = PointConstraint3D::new(a, definition.anchor, definition.stiffness)?;
                    self.collision.add_constraint(Box::new(constraint));
                }
            }
        }
        Ok(())
    }

    #[cfg(not(feature = "constraints"))]
    fn rebuild_constraints(&mut self) -> Result<(), PhysicsError> {
        Ok(())
    }

    fn integrate_kinematics(&mut self, dt: f64) {
        for body in self.store.bodies.values_mut() {
            match body.body_type {
                PhysicsBodyType::Static => {}
                PhysicsBodyType::Kinematic => {
                    body.state.position = add_scaled(body.state.position, body.state.linear_velocity, dt);
                    body.state.orientation = body.state.orientation.integrate(body.state.angular_velocity, dt);
                }
                PhysicsBodyType::Dynamic => {
                    body.state.orientation = body.state.orientation.integrate(body.state.angular_velocity, dt);
                }
            }
            body.state.timestamp = self.simulation_time;
        }
    }
}

impl PhysicsWorld for RigidBodyWorld {
    fn backend_id(&self) -> &str {
        RIGID_BODY_BACKEND_ID
    }

    fn capabilities(&self) -> PhysicsCapabilities {
        RigidBodyBackend.capabilities()
    }

    fn configuration(&self) -> &PhysicsWorldConfiguration {
        &self.configuration
    }

    fn create_body(&mut self, definition: &PhysicsBodyDefinition) -> Result<PhysicsBodyHandle, PhysicsError> {
        self.ensure_open()?;
        definition.shape.validate()?;
        let state = self.in_world_frame(&definition.initial_state)?;
        let inverse_mass = match definition.body_type {
            PhysicsBodyType::Dynamic if definition.mass_kg > 0.0 => 1.0 / ensure_finite(definition.mass_kg, "mass")?,
            PhysicsBodyType::Dynamic => 1.0 / DEFAULT_DYNAMIC_MASS_KG,
            PhysicsBodyType::Static | PhysicsBodyType::Kinematic => 0.0,
        };
        let id = self.next_body_id;
        self.next_body_id += 1;
        self.store.bodies.insert(
            id,
            RigidBody {
                body_type: definition.body_type,
                shape: definition.shape,
                inverse_mass,
                friction: definition.friction,
                restitution: definition.restitution,
                filter: definition.filter,
                state,
            },
        );
        Ok(PhysicsBodyHandle::new(self.world_id, id))
    }

    fn remove_body(&mut self, handle: PhysicsBodyHandle) -> Result<bool, PhysicsError> {
        self.ensure_open()?;
        let id = check_body_handle(self.world_id, handle)?;
        if self.store.bodies.remove(&id).is_none() {
            return Ok(false);
        }
        let before = self.constraints.len();
        self.constraints.retain(|_, record| {
            record.definition.body_a.id() != id && record.definition.body_b.map(|b| b.id()) != Some(id)
        });
        if self.constraints.len() != before {
            debug!("removed {} constraints attached to body {}", before - self.constraints.len(), id);
            self.rebuild_constraints()?;
        }
        Ok(true)
    }

    fn body_handles(&self) -> Result<Vec<PhysicsBodyHandle>, PhysicsError> {
        self.ensure_open()?;
        Ok(self.store.bodies.keys().map(|&id| PhysicsBodyHandle::new(self.world_id, id)).collect())
    }

    fn body_state(&self, handle: PhysicsBodyHandle) -> Result<PhysicsBodyState, PhysicsError> {
        self.ensure_open()?;
        let id = self.body_id(handle)?;
        self.store.bodies.get(&id).map(|body| body.state).ok_or_else(|| unknown_body(handle))
    }

    fn set_body_state(&mut self, handle: PhysicsBodyHandle, state: &PhysicsBodyState) -> Result<(), PhysicsError> {
        self.ensure_open()?;
        let id = self.body_id(handle)?;
        let state = self.in_world_frame(state)?;
        let body = self.store.bodies.get_mut(&id).ok_or_else(|| unknown_body(handle))?;
        body.state = state;
        Ok(())
    }

    #[cfg(feature = "constraints")]
    fn create_constraint(
        &mut self,
        definition: &PhysicsConstraintDefinition,
    ) -> Result<PhysicsConstraintHandle, PhysicsError> {
        self.ensure_open()?;
        match definition.constraint_type {
            PhysicsConstraintType::Fixed | PhysicsConstraintType::Ball => {}
            other => {
                return Err(PhysicsError::unsupported(format!(
                    "{} does not support {:?} constraints",
                    RIGID_BODY_BACKEND_ID, other
                )))
            }
        }
        ensure_finite_vector(definition.anchor, "anchor")?;
        let a = self.body_id(definition.body_a)?;
        let rest_distance = match definition.body_b {
            Some(handle) => {
                let b = self.body_id(handle)?;
                let pa = self.store.position(a);
                let pb = self.store.position(b);
                magnitude_squared(subtract_vectors(pb, pa)).sqrt()
            }
            None => 0.0,
        };
        let id = self.next_constraint_id;
        self.next_constraint_id += 1;
        self.constraints.insert(id, ConstraintRecord { definition: *definition, rest_distance });
        if let Err(err) = self.rebuild_constraints() {
            self.constraints.remove(&id);
            self.rebuild_constraints()?;
            return Err(err);
        }
        Ok(PhysicsConstraintHandle::new(self.world_id, id))
    }

    #[cfg(not(feature = "constraints"))]
    fn create_constraint(
        &mut self,
        _definition: &PhysicsConstraintDefinition,
    ) -> Result<PhysicsConstraintHandle, PhysicsError> {
        self.ensure_open()?;
        Err(PhysicsError::unsupported("constraints are disabled in this build"))
    }

    fn remove_constraint(&mut self, handle: PhysicsConstraintHandle) -> Result<bool, PhysicsError> {
        self.ensure_open()?;
        let id = check_constraint_handle(self.world_id, handle)?;
        if self.constraints.remove(&id).is_none() {
            return Ok(false);
        }
        self.rebuild_constraints()?;
        Ok(true)
    }

    fn constraint_handles(&self) -> Result<Vec<PhysicsConstraintHandle>, PhysicsError> {
        self.ensure_open()?;
        Ok(self.constraints.keys().map(|&id| PhysicsConstraintHandle::new(self.world_id, id)).collect())
    }

    fn runtime_tuning(&self) -> Result<PhysicsRuntimeTuning, PhysicsError> {
        self.ensure_open()?;
        Ok(self.configuration.runtime_tuning)
    }

    fn set_runtime_tuning(&mut self, tuning: PhysicsRuntimeTuning) -> Result<(), PhysicsError> {
        self.ensure_open()?;
        tuning.validate()?;
        let collision_config = CollisionWorldConfig {
            solver_iterations: tuning.solver_iterations,
            ..*self.collision.config()
        };
        self.collision.set_config(collision_config)?;
        self.store.tuning = tuning;
        self.configuration.runtime_tuning = tuning;
        Ok(())
    }

    fn gravity(&self) -> Result<Vector3, PhysicsError> {
        self.ensure_open()?;
        Ok(self.configuration.gravity)
    }

    fn set_gravity(&mut self, gravity: Vector3) -> Result<(), PhysicsError> {
        self.ensure_open()?;
        self.collision.set_gravity(gravity)?;
        self.configuration.gravity = gravity;
        Ok(())
    }

    fn step(&mut self, dt: f64) -> Result<(), PhysicsError> {
        self.ensure_open()?;
        ensure_time_step(dt)?;
        let items: Vec<u64> = self.store.bodies.keys().copied().collect();
        self.last_events = self.collision.step(&items, &mut self.store, dt)?;
        self.simulation_time += dt;
        self.integrate_kinematics(dt);
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
        let mut nearest: Option<RaycastHit> = None;
        for (&id, body) in &self.store.bodies {
            let Some((distance, normal)) = body.ray_hit(ray) else {
                continue;
            };
            if distance > max_distance || nearest.as_ref().is_some_and(|hit| hit.distance <= distance) {
                continue;
            }
            nearest = Some(RaycastHit {
                body: PhysicsBodyHandle::new(self.world_id, id),
                distance,
                point: ray.point_at(distance),
                normal,
            });
        }
        Ok(nearest)
    }

    fn overlap_sphere(&self, center: Vector3, radius: f64) -> Result<Vec<PhysicsBodyHandle>, PhysicsError> {
        self.ensure_open()?;
        if !(ensure_finite(radius, "query radius")? > 0.0) {
            return Err(PhysicsError::invalid_argument("query radius must be > 0"));
        }
        let query = BoundingSphere::new(center, radius)?;
        let query_bounds = query.to_aabb();
        Ok(self
            .store
            .bodies
            .iter()
            .filter(|(_, body)| {
                body.collider().is_some_and(|collider| {
                    collider.bounds().intersects(&query_bounds) && self.store.gjk.intersects(&query, &collider)
                })
            })
            .map(|(&id, _)| PhysicsBodyHandle::new(self.world_id, id))
            .collect())
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.store.bodies.clear();
            self.constraints.clear();
            self.collision.reset();
            info!("closed rigid-body world {}", self.world_id);
        }
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

/// Backend id `"ode4j"`: the general-purpose rigid-body engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct RigidBodyBackend;

impl PhysicsBackend for RigidBodyBackend {
    fn id(&self) -> &str {
        RIGID_BODY_BACKEND_ID
    }

    fn capabilities(&self) -> PhysicsCapabilities {
        PhysicsCapabilities {
            rigid_bodies: true,
            n_body: false,
            constraints: cfg!(feature = "constraints"),
            queries: true,
            deterministic_stepping: true,
        }
    }

    fn create_world(&self, configuration: PhysicsWorldConfiguration) -> Result<Box<dyn PhysicsWorld>, PhysicsError> {
        Ok(Box::new(RigidBodyWorld::new(configuration)?))
    }
}

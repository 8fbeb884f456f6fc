use std::collections::HashMap;

use crate::broad_phase::SpatialHash3D;
use crate::interactions::{CollisionFilter, RigidBodyAdapter3D};
use crate::models::Aabb;
use crate::utils::{Vector3, ZERO_VECTOR};
use crate::world::*;

#[derive(Clone, Copy)]
struct Body {
    position: Vector3,
    half_extents: Vector3,
    velocity: Vector3,
    inverse_mass: f64,
    filter: CollisionFilter,
}

impl Body {
    fn new(position: Vector3, half_extents: Vector3, inverse_mass: f64) -> Self {
        Self { position, half_extents, velocity: ZERO_VECTOR, inverse_mass, filter: CollisionFilter::default() }
    }
}

#[derive(Default)]
struct Simulation {
    bodies: HashMap<u32, Body>,
}

impl CollisionScene<u32> for Simulation {
    fn bounds(&self, item: &u32) -> Option<Aabb> {
        let body = self.bodies.get(item)?;
        Aabb::from_center_half_extents(body.position, body.half_extents).ok()
    }

    fn filter(&self, item: &u32) -> Option<CollisionFilter> {
        self.bodies.get(item).map(|body| body.filter)
    }
}

impl RigidBodyAdapter3D<u32> for Simulation {
    fn position(&self, body: u32) -> Vector3 { self.bodies[&body].position }
    fn set_position(&mut self, body: u32, position: Vector3) { self.bodies.get_mut(&body).unwrap().position = position; }
    fn velocity(&self, body: u32) -> Vector3 { self.bodies[&body].velocity }
    fn set_velocity(&mut self, body: u32, velocity: Vector3) { self.bodies.get_mut(&body).unwrap().velocity = velocity; }
    fn inverse_mass(&self, body: u32) -> f64 { self.bodies[&body].inverse_mass }
    fn restitution(&self, _body: u32) -> f64 { 0.0 }
    fn friction(&self, _body: u32) -> f64 { 0.5 }
}

fn event_types(events: &[CollisionEvent<u32>]) -> Vec<CollisionEventType> {
    events.iter().map(|event| event.event_type).collect()
}

#[test]
fn test_enter_stay_exit_lifecycle() {
    let mut bounds: HashMap<u32, Aabb> = HashMap::from([
        (1, Aabb::from_bounds([0.0, 0.0, 0.0, 2.0, 2.0, 2.0]).unwrap()),
        (2, Aabb::from_bounds([1.0, 0.0, 0.0, 3.0, 2.0, 2.0]).unwrap()),
    ]);
    let items = [1u32, 2];
    let mut world = CollisionWorld3D::default();

    let mut lifecycle = Vec::new();
    for frame in 0..3 {
        if frame == 2 {
            bounds.insert(2, Aabb::from_bounds([10.0, 0.0, 0.0, 12.0, 2.0, 2.0]).unwrap());
        }
        let scene: AabbScene<_, fn(&u32) -> Option<CollisionFilter>> =
            AabbScene::with_default_filter(|id: &u32| bounds.get(id).copied());
        let events = world.update(&items, &scene);
        assert_eq!(events.len(), 1, "one pair, one event per frame");
        assert!(events[0].response_enabled);
        lifecycle.extend(event_types(&events));
    }

    assert_eq!(lifecycle, vec![CollisionEventType::Enter, CollisionEventType::Stay, CollisionEventType::Exit]);
    let after_exit = world.update(&items, &AabbScene::new(|id: &u32| bounds.get(id).copied(), |_: &u32| Some(CollisionFilter::default())));
    assert!(after_exit.is_empty(), "exit is reported once");
}

#[test]
fn test_exit_carries_last_manifold() {
    let mut sim = Simulation::default();
    sim.bodies.insert(1, Body::new((0.0, 0.0, 0.0), (1.0, 1.0, 1.0), 0.0));
    sim.bodies.insert(2, Body::new((1.5, 0.0, 0.0), (1.0, 1.0, 1.0), 0.0));
    let mut world = CollisionWorld3D::new(Box::new(SpatialHash3D::new(2.0).unwrap()));

    let enter = world.update(&[1, 2], &sim);
    sim.bodies.get_mut(&2).unwrap().position = (5.0, 0.0, 0.0);
    let exit = world.update(&[1, 2], &sim);

    assert_eq!(exit[0].event_type, CollisionEventType::Exit);
    assert_eq!(exit[0].manifold, enter[0].manifold);
}

#[test]
fn test_trigger_reports_without_response() {
    let mut sim = Simulation::default();
    sim.bodies.insert(1, Body::new((0.0, 0.0, 0.0), (1.0, 1.0, 1.0), 1.0));
    let mut sensor = Body::new((1.5, 0.0, 0.0), (1.0, 1.0, 1.0), 1.0);
    sensor.filter = CollisionFilter::trigger(1, CollisionFilter::ALL_LAYERS);
    sensor.velocity = (-1.0, 0.0, 0.0);
    sim.bodies.insert(2, sensor);

    let mut world = CollisionWorld3D::default();
    let items = [1u32, 2];
    let scene_view = Simulation { bodies: sim.bodies.clone() };
    let events = world.update_and_respond(&items, &scene_view, &mut sim);

    assert_eq!(event_types(&events), vec![CollisionEventType::Enter]);
    assert!(!events[0].response_enabled);
    assert_eq!(sim.position(1), (0.0, 0.0, 0.0));
    assert_eq!(sim.position(2), (1.5, 0.0, 0.0));
    assert_eq!(sim.velocity(2), (-1.0, 0.0, 0.0));
}

#[test]
fn test_masked_out_pairs_produce_no_events() {
    let mut sim = Simulation::default();
    let mut a = Body::new((0.0, 0.0, 0.0), (1.0, 1.0, 1.0), 1.0);
    let mut b = Body::new((0.5, 0.0, 0.0), (1.0, 1.0, 1.0), 1.0);
    a.filter = CollisionFilter::solid(0b01, 0b01);
    b.filter = CollisionFilter::solid(0b10, 0b10);
    sim.bodies.insert(1, a);
    sim.bodies.insert(2, b);

    let mut world = CollisionWorld3D::default();
    assert!(world.update(&[1, 2], &sim).is_empty());
    assert!(world.manifold_cache().is_empty());
}

#[test]
fn test_solid_contact_separates_and_stores_warm_start() {
    let mut sim = Simulation::default();
    let mut a = Body::new((0.0, 0.0, 0.0), (1.0, 1.0, 1.0), 1.0);
    let mut b = Body::new((1.9, 0.0, 0.0), (1.0, 1.0, 1.0), 1.0);
    a.velocity = (1.0, 0.0, 0.0);
    b.velocity = (-1.0, 0.0, 0.0);
    sim.bodies.insert(1, a);
    sim.bodies.insert(2, b);

    let mut world = CollisionWorld3D::default();
    let scene_view = Simulation { bodies: sim.bodies.clone() };
    let events = world.update_and_respond(&[1, 2], &scene_view, &mut sim);
    assert_eq!(event_types(&events), vec![CollisionEventType::Enter]);

    assert!(sim.velocity(1).0 <= 1e-9, "approach velocity removed");
    assert!(sim.velocity(2).0 >= -1e-9);
    assert!(sim.position(2).0 - sim.position(1).0 > 1.9, "position correction pushed the boxes apart");

    let pair = events[0].pair;
    assert!(world.manifold_cache().warm_start(&pair).normal_impulse > 0.0);
}

#[test]
fn test_step_lands_box_on_static_ground() {
    let mut sim = Simulation::default();
    sim.bodies.insert(1, Body::new((0.0, -1.0, 0.0), (10.0, 1.0, 10.0), 0.0));
    sim.bodies.insert(2, Body::new((0.0, 1.0, 0.0), (0.5, 0.5, 0.5), 1.0));
    let mut world = CollisionWorld3D::default();

    for _ in 0..180 {
        world.step(&[1, 2], &mut sim, 1.0 / 60.0).unwrap();
    }

    let resting = sim.position(2);
    assert!((resting.1 - 0.5).abs() < 0.05, "box should rest on the ground, got y = {}", resting.1);
    assert!(sim.velocity(2).1.abs() < 0.2);
    assert_eq!(sim.position(1), (0.0, -1.0, 0.0), "static ground never moves");
}

#[test]
fn test_step_rejects_bad_time_step() {
    let mut sim = Simulation::default();
    sim.bodies.insert(1, Body::new((0.0, 0.0, 0.0), (1.0, 1.0, 1.0), 1.0));
    let mut world = CollisionWorld3D::default();
    assert!(world.step(&[1], &mut sim, 0.0).is_err());
    assert!(world.step(&[1], &mut sim, f64::NAN).is_err());
}

#[cfg(feature = "constraints")]
#[test]
fn test_step_holds_distance_constraint_under_gravity() {
    use crate::constraints::DistanceConstraint3D;
    use crate::utils::distance_between;

    let mut sim = Simulation::default();
    sim.bodies.insert(1, Body::new((0.0, 2.0, 0.0), (0.25, 0.25, 0.25), 1.0));
    sim.bodies.insert(2, Body::new((0.0, 4.0, 0.0), (0.25, 0.25, 0.25), 1.0));
    let config = CollisionWorldConfig::new(None, Some(4), None, Some((0.0, -9.8, 0.0))).unwrap();
    let mut world = CollisionWorld3D::with_config(Box::new(crate::broad_phase::SweepAndPrune3D::new()), config).unwrap();
    world.add_constraint(Box::new(DistanceConstraint3D::new(1, 2, 2.0, 0.8).unwrap()));

    for _ in 0..30 {
        world.step(&[1, 2], &mut sim, 1.0 / 120.0).unwrap();
    }
    let distance = distance_between(sim.position(1), sim.position(2));
    assert!((distance - 2.0).abs() < 0.2, "distance drifted to {}", distance);
}

#[test]
fn test_reset_forgets_previous_contacts() {
    let mut sim = Simulation::default();
    sim.bodies.insert(1, Body::new((0.0, 0.0, 0.0), (1.0, 1.0, 1.0), 0.0));
    sim.bodies.insert(2, Body::new((1.0, 0.0, 0.0), (1.0, 1.0, 1.0), 0.0));
    let mut world = CollisionWorld3D::default();
    world.update(&[1, 2], &sim);
    world.reset();
    assert!(world.manifold_cache().is_empty());
    assert_eq!(event_types(&world.update(&[1, 2], &sim)), vec![CollisionEventType::Enter]);
}

#[test]
fn test_config_validation() {
    assert!(CollisionWorldConfig::new(Some(0), None, None, None).is_err());
    assert!(CollisionWorldConfig::new(None, Some(0), None, None).is_err());
    assert!(CollisionWorldConfig::new(None, None, None, Some((f64::NAN, 0.0, 0.0))).is_err());
    let config = CollisionWorldConfig::new(None, None, None, None).unwrap();
    assert_eq!(config, CollisionWorldConfig::default());
}

use std::collections::HashMap;

use crate::assert_float_eq;
use crate::constraints::*;
use crate::interactions::RigidBodyAdapter3D;
use crate::utils::{distance_between, Vector3};

struct Bodies {
    positions: HashMap<u8, Vector3>,
    inverse_masses: HashMap<u8, f64>,
}

impl Bodies {
    fn new(entries: &[(u8, Vector3, f64)]) -> Self {
        Self {
            positions: entries.iter().map(|&(id, p, _)| (id, p)).collect(),
            inverse_masses: entries.iter().map(|&(id, _, m)| (id, m)).collect(),
        }
    }
}

impl RigidBodyAdapter3D<u8> for Bodies {
    fn position(&self, body: u8) -> Vector3 { self.positions[&body] }
    fn set_position(&mut self, body: u8, position: Vector3) { self.positions.insert(body, position); }
    fn velocity(&self, _body: u8) -> Vector3 { (0.0, 0.0, 0.0) }
    fn set_velocity(&mut self, _body: u8, _velocity: Vector3) {}
    fn inverse_mass(&self, body: u8) -> f64 { self.inverse_masses[&body] }
    fn restitution(&self, _body: u8) -> f64 { 0.0 }
    fn friction(&self, _body: u8) -> f64 { 0.0 }
}

#[test]
fn test_distance_constraint_reaches_target_with_full_stiffness() {
    let mut bodies = Bodies::new(&[(1, (0.0, 0.0, 0.0), 1.0), (2, (4.0, 0.0, 0.0), 1.0)]);
    let constraint = DistanceConstraint3D::new(1, 2, 2.0, 1.0).unwrap();
    constraint.solve(&mut bodies, 0.016);

    assert_float_eq(distance_between(bodies.position(1), bodies.position(2)), 2.0, 1e-9, None);
    assert_float_eq(bodies.position(1).0, 1.0, 1e-9, Some("equal masses share the correction"));
}

#[test]
fn test_distance_constraint_moves_only_the_dynamic_body() {
    let mut bodies = Bodies::new(&[(1, (0.0, 0.0, 0.0), 0.0), (2, (0.0, 3.0, 0.0), 2.0)]);
    DistanceConstraint3D::new(1, 2, 1.0, 0.5).unwrap().solve(&mut bodies, 0.016);

    assert_eq!(bodies.position(1), (0.0, 0.0, 0.0));
    assert_float_eq(bodies.position(2).1, 2.0, 1e-9, Some("half of the 2 m error"));
}

#[test]
fn test_distance_constraint_skips_coincident_and_static_bodies() {
    let mut coincident = Bodies::new(&[(1, (1.0, 1.0, 1.0), 1.0), (2, (1.0, 1.0, 1.0), 1.0)]);
    DistanceConstraint3D::new(1, 2, 2.0, 1.0).unwrap().solve(&mut coincident, 0.016);
    assert_eq!(coincident.position(2), (1.0, 1.0, 1.0));

    let mut pinned = Bodies::new(&[(1, (0.0, 0.0, 0.0), 0.0), (2, (5.0, 0.0, 0.0), 0.0)]);
    DistanceConstraint3D::new(1, 2, 2.0, 1.0).unwrap().solve(&mut pinned, 0.016);
    assert_eq!(pinned.position(2), (5.0, 0.0, 0.0));
}

#[test]
fn test_point_constraint_pulls_body_to_anchor() {
    let mut bodies = Bodies::new(&[(1, (10.0, 0.0, 0.0), 1.0)]);
    PointConstraint3D::new(1, (1.0, 2.0, 3.0), 1.0).unwrap().solve(&mut bodies, 0.016);
    let p = bodies.position(1);
    assert_float_eq(p.0, 1.0, 1e-9, None);
    assert_float_eq(p.1, 2.0, 1e-9, None);
    assert_float_eq(p.2, 3.0, 1e-9, None);
}

#[test]
fn test_point_constraint_ignores_static_body() {
    let mut bodies = Bodies::new(&[(1, (10.0, 0.0, 0.0), 0.0)]);
    PointConstraint3D::new(1, (0.0, 0.0, 0.0), 1.0).unwrap().solve(&mut bodies, 0.016);
    assert_eq!(bodies.position(1), (10.0, 0.0, 0.0));
}

#[test]
fn test_constraint_parameters_are_validated() {
    assert!(DistanceConstraint3D::new(1u8, 2u8, -1.0, 0.5).is_err());
    assert!(DistanceConstraint3D::new(1u8, 2u8, 1.0, 1.5).is_err());
    assert!(DistanceConstraint3D::new(1u8, 2u8, f64::INFINITY, 0.5).is_err());
    assert!(PointConstraint3D::new(1u8, (f64::NAN, 0.0, 0.0), 0.5).is_err());
    assert!(PointConstraint3D::new(1u8, (0.0, 0.0, 0.0), -0.1).is_err());
}

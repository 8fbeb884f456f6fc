use crate::backends::*;
use crate::interactions::CollisionFilter;
use crate::models::Quaternion;
use crate::utils::PhysicsError;

#[test]
fn test_configuration_defaults() {
    let configuration = PhysicsWorldConfiguration::default();
    assert_eq!(configuration.reference_frame, ReferenceFrame::World);
    assert_eq!(configuration.gravity, (0.0, -9.81, 0.0));
    assert!((configuration.fixed_step_seconds - 1.0 / 60.0).abs() < 1e-15);

    let tuning = configuration.runtime_tuning;
    assert_eq!(tuning.solver_iterations, 20);
    assert!(tuning.contact_friction.is_infinite());
    assert_eq!(tuning.contact_bounce, 0.1);
    assert_eq!(tuning.contact_soft_cfm, 1e-5);
    assert_eq!(tuning.contact_bounce_velocity, 0.1);
    assert!(configuration.validate().is_ok());
}

#[test]
fn test_configuration_new_validates() {
    let custom = PhysicsWorldConfiguration::new(Some(ReferenceFrame::Ecef), Some((0.0, 0.0, 0.0)), Some(0.01), None)
        .unwrap();
    assert_eq!(custom.reference_frame, ReferenceFrame::Ecef);
    assert_eq!(custom.fixed_step_seconds, 0.01);

    assert!(matches!(
        PhysicsWorldConfiguration::new(None, None, Some(0.0), None),
        Err(PhysicsError::InvalidTimeStep(_))
    ));
    assert!(PhysicsWorldConfiguration::new(None, Some((f64::NAN, 0.0, 0.0)), None, None).is_err());
}

#[test]
fn test_runtime_tuning_ranges() {
    assert!(PhysicsRuntimeTuning::new(Some(0), None, None, None, None).is_err(), "zero iterations");
    assert!(PhysicsRuntimeTuning::new(None, Some(f64::NAN), None, None, None).is_err(), "NaN friction");
    assert!(PhysicsRuntimeTuning::new(None, Some(-1.0), None, None, None).is_err(), "negative friction");
    assert!(PhysicsRuntimeTuning::new(None, None, Some(1.5), None, None).is_err(), "bounce above one");
    assert!(PhysicsRuntimeTuning::new(None, None, None, Some(-1e-3), None).is_err(), "negative cfm");
    assert!(PhysicsRuntimeTuning::new(None, None, None, None, Some(f64::INFINITY)).is_err(), "infinite bounce velocity");

    let tuning = PhysicsRuntimeTuning::new(Some(8), Some(0.7), Some(0.0), None, None).unwrap();
    assert_eq!(tuning.solver_iterations, 8);
    assert_eq!(tuning.contact_friction, 0.7);
}

#[test]
fn test_shape_validation_and_bounding_radius() {
    assert!(PhysicsShape::Sphere { radius: 0.0 }.validate().is_err());
    assert!(PhysicsShape::Box { half_extents: (1.0, -1.0, 1.0) }.validate().is_err());
    assert!(PhysicsShape::Capsule { radius: 0.5, half_height: f64::NAN }.validate().is_err());
    assert!(PhysicsShape::Capsule { radius: 0.5, half_height: 0.0 }.validate().is_ok());

    assert_eq!(PhysicsShape::Sphere { radius: 2.0 }.bounding_radius(), 2.0);
    assert_eq!(PhysicsShape::Capsule { radius: 0.5, half_height: 1.0 }.bounding_radius(), 1.5);
    let box_radius = PhysicsShape::Box { half_extents: (1.0, 2.0, 2.0) }.bounding_radius();
    assert!((box_radius - 3.0).abs() < 1e-12);
}

#[test]
fn test_body_definition_builders() {
    let state = PhysicsBodyState::at_rest((0.0, 1.0, 0.0), ReferenceFrame::World).unwrap();
    let definition = PhysicsBodyDefinition::new(
        PhysicsBodyType::Dynamic,
        PhysicsShape::Sphere { radius: 0.5 },
        2.0,
        state,
    )
    .unwrap()
    .with_material(0.4, 0.2)
    .unwrap()
    .with_filter(CollisionFilter::trigger(2, 1));

    assert_eq!(definition.friction, Some(0.4));
    assert_eq!(definition.restitution, Some(0.2));
    assert!(definition.filter.is_trigger());

    let shape = PhysicsShape::Sphere { radius: 0.5 };
    assert!(PhysicsBodyDefinition::new(PhysicsBodyType::Dynamic, shape, -1.0, state).is_err());
    assert!(PhysicsBodyDefinition::new(PhysicsBodyType::Dynamic, shape, 1.0, state)
        .unwrap()
        .with_material(0.5, 2.0)
        .is_err());
}

#[test]
fn test_body_state_rejects_non_finite_values() {
    assert!(PhysicsBodyState::at_rest((f64::NAN, 0.0, 0.0), ReferenceFrame::World).is_err());
    let state = PhysicsBodyState::at_rest((0.0, 0.0, 0.0), ReferenceFrame::World).unwrap();
    assert!(state.with_linear_velocity((0.0, f64::INFINITY, 0.0)).is_err());
    assert!(state.with_orientation(Quaternion::new(f64::NAN, 0.0, 0.0, 0.0)).is_err());
    let moving = state.with_linear_velocity((1.0, 2.0, 3.0)).unwrap();
    assert_eq!(moving.linear_velocity, (1.0, 2.0, 3.0));
}

#[test]
fn test_constraint_definition_rejects_self_joint() {
    let a = PhysicsBodyHandle::new(1, 1);
    let b = PhysicsBodyHandle::new(1, 2);
    assert!(PhysicsConstraintDefinition::new(PhysicsConstraintType::Ball, a, Some(a), (0.0, 0.0, 0.0)).is_err());

    let joint = PhysicsConstraintDefinition::new(PhysicsConstraintType::Ball, a, Some(b), (0.0, 0.0, 0.0)).unwrap();
    assert_eq!(joint.stiffness, 1.0);
    assert!(joint.with_stiffness(1.5).is_err());
    assert_eq!(joint.with_stiffness(0.25).unwrap().stiffness, 0.25);
}

#[test]
fn test_handles_are_scoped_to_their_world() {
    let handle = PhysicsBodyHandle::new(7, 3);
    assert_eq!(check_body_handle(7, handle).unwrap(), 3);
    assert!(matches!(check_body_handle(8, handle), Err(PhysicsError::InvalidHandle(_))));

    let constraint = PhysicsConstraintHandle::new(7, 1);
    assert!(check_constraint_handle(9, constraint).unwrap_err().is_invalid_input());
}

#[test]
fn test_world_ids_are_unique() {
    let first = next_world_id();
    let second = next_world_id();
    assert_ne!(first, second);
}

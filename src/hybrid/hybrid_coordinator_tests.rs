use crate::assert_float_eq;
use crate::backends::*;
use crate::hybrid::*;
use crate::models::Quaternion;
use crate::utils::{PhysicsError, Vector3};

fn zero_gravity() -> PhysicsWorldConfiguration {
    PhysicsWorldConfiguration::new(None, Some((0.0, 0.0, 0.0)), None, None).unwrap()
}

fn body(body_type: PhysicsBodyType, position: Vector3, velocity: Vector3) -> PhysicsBodyDefinition {
    let state = PhysicsBodyState::at_rest(position, ReferenceFrame::World)
        .unwrap()
        .with_linear_velocity(velocity)
        .unwrap();
    PhysicsBodyDefinition::new(body_type, PhysicsShape::Sphere { radius: 0.5 }, 1.0, state).unwrap()
}

struct Scene {
    coordinator: HybridPhysicsCoordinator,
    general_body: PhysicsBodyHandle,
    orbital_body: PhysicsBodyHandle,
}

/// A resting rigid body far from a kinematic orbital body moving along +x.
fn scene(config: HybridCoordinatorConfig) -> Scene {
    let mut general = RigidBodyWorld::new(zero_gravity()).unwrap();
    let general_body =
        general.create_body(&body(PhysicsBodyType::Dynamic, (100.0, 0.0, 0.0), (0.0, 0.0, 0.0))).unwrap();
    let mut orbital = OrbitalWorld::new(zero_gravity()).unwrap();
    let orbital_body =
        orbital.create_body(&body(PhysicsBodyType::Kinematic, (0.0, 0.0, 0.0), (1.0, 0.0, 0.0))).unwrap();
    let coordinator = HybridPhysicsCoordinator::new(Box::new(general), Box::new(orbital), config).unwrap();
    Scene { coordinator, general_body, orbital_body }
}

#[test]
fn test_orbital_owner_drives_general_body() {
    let Scene { mut coordinator, general_body, orbital_body } = scene(HybridCoordinatorConfig::default());
    let link = HybridBodyLink::new(
        general_body,
        orbital_body,
        HybridOwnership::Orbital,
        StateHandoffMode::PositionVelocityOnly,
    );
    let id = coordinator.register_link(link).unwrap();

    let snapshot = coordinator.step(1.0).unwrap();
    let general = snapshot.general_states[&general_body];
    assert_float_eq(general.position.0, 1.0, 1e-12, Some("follower takes the owner's position"));
    assert_eq!(general.linear_velocity, (1.0, 0.0, 0.0));
    assert_eq!(snapshot.orbital_states[&orbital_body].position, (1.0, 0.0, 0.0));
    assert_float_eq(snapshot.simulation_time, 1.0, 1e-12, None);
    assert_eq!(snapshot.interpolation_alpha, 0.0);
    assert_eq!(snapshot.extrapolation_seconds, 1.0);

    let diagnostics = coordinator.diagnostics(id).unwrap();
    assert_float_eq(diagnostics.last_position_error, 99.0, 1e-9, None);
    assert_eq!(diagnostics.last_handoff_time, Some(1.0));
    assert_eq!(diagnostics.rejected_count, 0);

    coordinator.step(1.0).unwrap();
    let general = coordinator.general_world().body_state(general_body).unwrap();
    assert_float_eq(general.position.0, 2.0, 1e-12, None);
    assert_float_eq(coordinator.diagnostics(id).unwrap().last_position_error, 0.0, 1e-12, Some("worlds agree"));
}

#[test]
fn test_general_owner_drives_orbital_body() {
    let mut general = RigidBodyWorld::new(zero_gravity()).unwrap();
    let rocket = general.create_body(&body(PhysicsBodyType::Dynamic, (0.0, 0.0, 0.0), (0.0, 2.0, 0.0))).unwrap();
    let mut orbital = OrbitalWorld::new(zero_gravity()).unwrap();
    let tracked = orbital.create_body(&body(PhysicsBodyType::Static, (50.0, 0.0, 0.0), (0.0, 0.0, 0.0))).unwrap();
    let mut coordinator =
        HybridPhysicsCoordinator::new(Box::new(general), Box::new(orbital), HybridCoordinatorConfig::default()).unwrap();
    coordinator
        .register_link(HybridBodyLink::new(rocket, tracked, HybridOwnership::General, StateHandoffMode::FullState))
        .unwrap();

    coordinator.step(0.5).unwrap();
    let state = coordinator.orbital_world().body_state(tracked).unwrap();
    assert_float_eq(state.position.1, 1.0, 1e-12, None);
    assert_eq!(state.linear_velocity, (0.0, 2.0, 0.0));
    assert_eq!(state.reference_frame, ReferenceFrame::World);
}

#[test]
fn test_handoff_modes_differ_on_orientation() {
    for (mode, expect_rotated) in [(StateHandoffMode::FullState, true), (StateHandoffMode::PositionVelocityOnly, false)] {
        let Scene { mut coordinator, general_body, orbital_body } = scene(HybridCoordinatorConfig::default());
        let turned = Quaternion::from_axis_angle((0.0, 0.0, 1.0), 1.0);
        let owner = coordinator.orbital_world().body_state(orbital_body).unwrap().with_orientation(turned).unwrap();
        coordinator.orbital_world_mut().set_body_state(orbital_body, &owner).unwrap();
        coordinator
            .register_link(HybridBodyLink::new(general_body, orbital_body, HybridOwnership::Orbital, mode))
            .unwrap();

        coordinator.step(0.1).unwrap();
        let orientation = coordinator.general_world().body_state(general_body).unwrap().orientation;
        assert_eq!(orientation.angle_to(&turned) < 1e-6, expect_rotated, "mode {:?}", mode);
        assert_eq!(orientation.is_near_identity(1e-9), !expect_rotated, "mode {:?}", mode);
    }
}

#[test]
fn test_divergent_handoff_is_rejected() {
    let Scene { mut coordinator, general_body, orbital_body } = scene(HybridCoordinatorConfig::default());
    let link = HybridBodyLink::new(general_body, orbital_body, HybridOwnership::Orbital, StateHandoffMode::FullState)
        .with_conflict_policy(ConflictPolicy::RejectOnDivergence, Some(1.0), None, None)
        .unwrap();
    let id = coordinator.register_link(link).unwrap();

    coordinator.step(0.1).unwrap();
    let state = coordinator.general_world().body_state(general_body).unwrap();
    assert_eq!(state.position, (100.0, 0.0, 0.0), "follower left alone");

    let diagnostics = coordinator.diagnostics(id).unwrap();
    assert_eq!(diagnostics.rejected_count, 1);
    assert_eq!(diagnostics.last_handoff_time, None);
    let telemetry = coordinator.telemetry().unwrap();
    assert_eq!((telemetry.link_count, telemetry.handoff_count, telemetry.rejected_handoffs), (1, 1, 1));
}

#[test]
fn test_link_thresholds_are_validated() {
    let Scene { general_body, orbital_body, .. } = scene(HybridCoordinatorConfig::default());
    let link = HybridBodyLink::new(general_body, orbital_body, HybridOwnership::General, StateHandoffMode::FullState);
    assert!(link.with_conflict_policy(ConflictPolicy::RejectOnDivergence, Some(-1.0), None, None).is_err());
    assert!(link.with_conflict_policy(ConflictPolicy::RejectOnDivergence, None, Some(f64::NAN), None).is_err());
    let unbounded = link.with_conflict_policy(ConflictPolicy::Overwrite, None, None, Some(0.0)).unwrap();
    assert_eq!(unbounded.max_position_divergence, f64::INFINITY);
    assert_eq!(unbounded.max_angular_velocity_divergence, 0.0);
}

#[test]
fn test_link_management() {
    let Scene { mut coordinator, general_body, orbital_body } = scene(HybridCoordinatorConfig::default());
    let link = HybridBodyLink::new(general_body, orbital_body, HybridOwnership::Orbital, StateHandoffMode::FullState);

    let swapped = HybridBodyLink { general_body: orbital_body, orbital_body: general_body, ..link };
    assert!(matches!(coordinator.register_link(swapped), Err(PhysicsError::InvalidHandle(_))));

    let first = coordinator.register_link(link).unwrap();
    let second = coordinator.register_link(link).unwrap();
    assert_ne!(first, second);
    assert_eq!(coordinator.links().len(), 2);

    assert!(coordinator.set_link_enabled(first, false));
    assert!(!coordinator.is_link_enabled(first));
    assert!(!coordinator.set_link_enabled(99, true));
    coordinator.step(0.1).unwrap();
    assert_eq!(coordinator.telemetry().unwrap().handoff_count, 1, "disabled links are skipped");

    let replacement = HybridBodyLink { ownership: HybridOwnership::General, ..link };
    assert!(coordinator.update_link(second, replacement).unwrap());
    assert!(!coordinator.update_link(99, replacement).unwrap());
    assert_eq!(coordinator.diagnostics(second).unwrap().link.ownership, HybridOwnership::General);

    assert!(coordinator.remove_link(first));
    assert!(!coordinator.remove_link(first));
    assert_eq!(coordinator.remove_links_for_body(orbital_body), 1);
    assert!(coordinator.links().is_empty());

    coordinator.register_link(link).unwrap();
    coordinator.clear_links();
    assert!(coordinator.all_diagnostics().is_empty());
}

#[test]
fn test_capability_gate() {
    let strict = HybridCoordinatorConfig { capability_policy: CapabilityPolicy::Strict, ..HybridCoordinatorConfig::default() };
    let backwards = HybridPhysicsCoordinator::new(
        Box::new(OrbitalWorld::new(zero_gravity()).unwrap()),
        Box::new(RigidBodyWorld::new(zero_gravity()).unwrap()),
        strict,
    );
    assert!(matches!(backwards.err(), Some(PhysicsError::Unsupported(_))));

    let lenient = HybridPhysicsCoordinator::new(
        Box::new(OrbitalWorld::new(zero_gravity()).unwrap()),
        Box::new(RigidBodyWorld::new(zero_gravity()).unwrap()),
        HybridCoordinatorConfig::default(),
    )
    .unwrap();
    let report = lenient.capability_report();
    assert!(!report.passed);
    assert!(!report.general_rigid_bodies && !report.orbital_n_body);

    let Scene { coordinator, .. } = scene(strict);
    assert!(coordinator.capability_report().passed);
}

#[test]
fn test_advance_runs_fixed_ticks_and_stamps_alpha() {
    let config = HybridCoordinatorConfig::new(None, Some(0.1), Some(4), None).unwrap();
    let Scene { mut coordinator, orbital_body, .. } = scene(config);
    let reader = coordinator.snapshot_reader();
    assert!(reader.latest().is_none());

    let result = coordinator.advance(0.25).unwrap();
    assert_eq!(result.steps, 2);
    assert_float_eq(result.remainder, 0.05, 1e-9, None);

    let snapshot = reader.latest().unwrap();
    assert_float_eq(snapshot.simulation_time, 0.2, 1e-12, None);
    assert_float_eq(snapshot.interpolation_alpha, 0.5, 1e-9, None);
    assert_float_eq(snapshot.extrapolation_seconds, 0.05, 1e-9, None);
    assert_float_eq(snapshot.orbital_states[&orbital_body].position.0, 0.2, 1e-12, None);
    assert_eq!(coordinator.latest_snapshot(), Some(snapshot));

    coordinator.clock_mut().pause();
    assert_eq!(coordinator.advance(1.0).unwrap().steps, 0);
    coordinator.clock_mut().resume();
    coordinator.clock_mut().set_time_scale(2.0).unwrap();
    assert_eq!(coordinator.advance(0.1).unwrap().steps, 2);
    assert!(coordinator.advance(-0.1).is_err());
}

#[test]
fn test_render_metadata() {
    let Scene { mut coordinator, .. } = scene(HybridCoordinatorConfig::default());
    assert_eq!(coordinator.set_render_metadata(0.5, 0.0).unwrap(), None);

    coordinator.step(0.1).unwrap();
    let stamped = coordinator.set_render_metadata(0.25, 0.02).unwrap().unwrap();
    assert_eq!(stamped.interpolation_alpha, 0.25);
    assert_float_eq(stamped.simulation_time, 0.1, 1e-12, None);
    assert!(coordinator.set_render_metadata(1.5, 0.0).is_err());
    assert!(coordinator.set_render_metadata(0.5, -1.0).is_err());
    assert!(coordinator.step(0.0).is_err());
}

#[test]
fn test_config_validation() {
    assert!(HybridCoordinatorConfig::new(None, Some(0.0), None, None).is_err());
    assert!(HybridCoordinatorConfig::new(None, None, Some(0), None).is_err());
    assert!(HybridCoordinatorConfig::new(None, None, None, Some(-1.0)).is_err());
    assert_eq!(HybridCoordinatorConfig::default().capability_policy, CapabilityPolicy::Lenient);
}

#[test]
fn test_closing_closes_both_worlds() {
    let Scene { mut coordinator, .. } = scene(HybridCoordinatorConfig::default());
    coordinator.close();
    assert!(coordinator.general_world().is_closed());
    assert!(coordinator.orbital_world().is_closed());
    assert_eq!(coordinator.step(0.1).err(), Some(PhysicsError::WorldClosed));
}

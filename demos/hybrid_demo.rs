// demos/hybrid_demo.rs

use rs_physics_core::backends::{
    PhysicsBackendFactory, PhysicsBodyDefinition, PhysicsBodyState, PhysicsBodyType, PhysicsShape,
    PhysicsWorld, PhysicsWorldConfiguration, ReferenceFrame, GRAVITATIONAL_CONSTANT, ORBITAL_BACKEND_ID,
    RIGID_BODY_BACKEND_ID,
};
use rs_physics_core::hybrid::{
    HybridBodyLink, HybridCoordinatorConfig, HybridOwnership, HybridPhysicsCoordinator, StateHandoffMode,
};
use rs_physics_core::utils::{vector_magnitude, PhysicsError};

const EARTH_MASS_KG: f64 = 5.972e24;
const ORBIT_RADIUS_M: f64 = 6.778e6;

fn main() -> Result<(), PhysicsError> {
    env_logger::init();

    let factory = PhysicsBackendFactory::with_default_backends();
    println!("Available backends: {}", factory.backend_ids().join(", "));

    let no_gravity = PhysicsWorldConfiguration::new(None, Some((0.0, 0.0, 0.0)), Some(1.0), None)?;
    let mut general = factory.create_world(RIGID_BODY_BACKEND_ID, no_gravity)?;
    let mut orbital = factory.create_world(ORBITAL_BACKEND_ID, no_gravity)?;

    // Earth and a station on a circular orbit, propagated by the orbital engine
    let earth = PhysicsBodyState::at_rest((0.0, 0.0, 0.0), ReferenceFrame::World)?;
    orbital.create_body(&PhysicsBodyDefinition::new(
        PhysicsBodyType::Static,
        PhysicsShape::Sphere { radius: 6.371e6 },
        EARTH_MASS_KG,
        earth,
    )?)?;
    let orbital_speed = (GRAVITATIONAL_CONSTANT * EARTH_MASS_KG / ORBIT_RADIUS_M).sqrt();
    let station_state = PhysicsBodyState::at_rest((ORBIT_RADIUS_M, 0.0, 0.0), ReferenceFrame::World)?
        .with_linear_velocity((0.0, orbital_speed, 0.0))?;
    let station_shape = PhysicsShape::Box { half_extents: (50.0, 20.0, 20.0) };
    let station_orbit =
        orbital.create_body(&PhysicsBodyDefinition::new(PhysicsBodyType::Kinematic, station_shape, 4.2e5, station_state)?)?;

    // The same station as a rigid body, following the orbital engine
    let station_body =
        general.create_body(&PhysicsBodyDefinition::new(PhysicsBodyType::Dynamic, station_shape, 4.2e5, station_state)?)?;

    let config = HybridCoordinatorConfig::new(None, Some(1.0), Some(16), Some(60.0))?;
    let mut coordinator = HybridPhysicsCoordinator::new(general, orbital, config)?;
    println!("Capability gate: {}", coordinator.capability_report().message);
    let link = coordinator.register_link(HybridBodyLink::new(
        station_body,
        station_orbit,
        HybridOwnership::Orbital,
        StateHandoffMode::PositionVelocityOnly,
    ))?;

    // One simulated minute per real second, rendered at 60 frames per second
    for frame in 0..600 {
        let result = coordinator.advance(1.0 / 60.0)?;
        if frame % 120 == 0 {
            if let Some(snapshot) = coordinator.latest_snapshot() {
                let position = snapshot.general_states[&station_body].position;
                println!(
                    "t={:>6.0}s steps={} alpha={:.2} station radius={:.1} km",
                    snapshot.simulation_time,
                    result.steps,
                    snapshot.interpolation_alpha,
                    vector_magnitude(position) / 1000.0
                );
            }
        }
    }

    if let Some(diagnostics) = coordinator.diagnostics(link) {
        println!(
            "Link {}: last position error {:.3} m, rejected hand-offs {}",
            diagnostics.link_id, diagnostics.last_position_error, diagnostics.rejected_count
        );
    }
    if let Some(telemetry) = coordinator.telemetry() {
        println!(
            "Last tick: orbital {:?}, general {:?}, hand-off {:?}",
            telemetry.orbital_step, telemetry.general_step, telemetry.handoff
        );
    }
    coordinator.close();
    Ok(())
}

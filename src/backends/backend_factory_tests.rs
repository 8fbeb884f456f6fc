use std::sync::Arc;

use crate::backends::*;
use crate::utils::PhysicsError;

#[test]
fn test_default_backends() {
    let factory = PhysicsBackendFactory::with_default_backends();
    let ids = factory.backend_ids();
    assert!(ids.contains(&RIGID_BODY_BACKEND_ID.to_string()));
    assert!(ids.contains(&ORBITAL_BACKEND_ID.to_string()));
    assert_eq!(ids.contains(&"jolt".to_string()), cfg!(feature = "native"));
    assert!(factory.backend(ORBITAL_BACKEND_ID).unwrap().capabilities().n_body);
}

#[test]
fn test_create_world_by_id() {
    let factory = PhysicsBackendFactory::with_default_backends();
    let rigid = factory.create_world(RIGID_BODY_BACKEND_ID, PhysicsWorldConfiguration::default()).unwrap();
    assert_eq!(rigid.backend_id(), RIGID_BODY_BACKEND_ID);
    let orbital = factory.create_world(ORBITAL_BACKEND_ID, PhysicsWorldConfiguration::default()).unwrap();
    assert_eq!(orbital.backend_id(), ORBITAL_BACKEND_ID);
    assert_eq!(orbital.simulation_time(), 0.0);
}

#[test]
fn test_unknown_backend_lists_available_ids() {
    let factory = PhysicsBackendFactory::with_default_backends();
    match factory.create_world("bullet", PhysicsWorldConfiguration::default()) {
        Err(PhysicsError::Unsupported(message)) => {
            assert!(message.contains("bullet"));
            assert!(message.contains(RIGID_BODY_BACKEND_ID));
        }
        Err(other) => panic!("unexpected error {:?}", other),
        Ok(_) => panic!("unknown backend created a world"),
    }
    assert!(PhysicsBackendFactory::new().backend_ids().is_empty());
}

#[test]
fn test_invalid_configuration_is_rejected() {
    let factory = PhysicsBackendFactory::with_default_backends();
    let configuration = PhysicsWorldConfiguration { fixed_step_seconds: 0.0, ..PhysicsWorldConfiguration::default() };
    let result = factory.create_world(RIGID_BODY_BACKEND_ID, configuration);
    assert!(matches!(result, Err(PhysicsError::InvalidTimeStep(_))));
}

struct LabelledBackend(&'static str);

impl PhysicsBackend for LabelledBackend {
    fn id(&self) -> &str {
        ORBITAL_BACKEND_ID
    }

    fn capabilities(&self) -> PhysicsCapabilities {
        PhysicsCapabilities::default()
    }

    fn create_world(&self, _configuration: PhysicsWorldConfiguration) -> Result<Box<dyn PhysicsWorld>, PhysicsError> {
        Err(PhysicsError::unsupported(self.0))
    }
}

#[test]
fn test_register_replaces_existing_backend() {
    let mut factory = PhysicsBackendFactory::with_default_backends();
    let previous = factory.register(Arc::new(LabelledBackend("replacement")));
    assert!(previous.is_some_and(|backend| backend.capabilities().n_body));
    assert_eq!(
        factory.create_world(ORBITAL_BACKEND_ID, PhysicsWorldConfiguration::default()).err(),
        Some(PhysicsError::Unsupported("replacement".to_string()))
    );
}

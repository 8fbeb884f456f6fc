use std::collections::BTreeMap;
use std::sync::Arc;

use log::{debug, info};

#[cfg(feature = "native")]
use crate::backends::NativeBackend;
use crate::backends::{OrbitalBackend, PhysicsBackend, PhysicsWorld, PhysicsWorldConfiguration, RigidBodyBackend};
use crate::utils::PhysicsError;

/// Registry of backends keyed by id.
#[derive(Clone, Default)]
pub struct PhysicsBackendFactory {
    backends: BTreeMap<String, Arc<dyn PhysicsBackend>>,
}

impl PhysicsBackendFactory {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding `"ode4j"`, `"orekit"` and, with the `native` feature, `"jolt"`.
    pub fn with_default_backends() -> Self {
        let mut factory = Self::new();
        factory.register(Arc::new(RigidBodyBackend));
        factory.register(Arc::new(OrbitalBackend));
        #[cfg(feature = "native")]
        factory.register(Arc::new(NativeBackend::from_env()));
        factory
    }

    /// Adds a backend, replacing any previous one with the same id.
    pub fn register(&mut self, backend: Arc<dyn PhysicsBackend>) -> Option<Arc<dyn PhysicsBackend>> {
        let id = backend.id().to_string();
        debug!("registering physics backend '{}'", id);
        self.backends.insert(id, backend)
    }

    pub fn backend_ids(&self) -> Vec<String> {
        self.backends.keys().cloned().collect()
    }

    pub fn backend(&self, id: &str) -> Option<Arc<dyn PhysicsBackend>> {
        self.backends.get(id).cloned()
    }

    /// # Errors
    /// `Unsupported` for an unknown id; otherwise whatever the backend reports.
    pub fn create_world(
        &self,
        id: &str,
        configuration: PhysicsWorldConfiguration,
    ) -> Result<Box<dyn PhysicsWorld>, PhysicsError> {
        let backend = self.backends.get(id).ok_or_else(|| {
            PhysicsError::unsupported(format!(
                "unknown physics backend '{}', available: {}",
                id,
                self.backend_ids().join(", ")
            ))
        })?;
        configuration.validate()?;
        let world = backend.create_world(configuration)?;
        info!("created '{}' world through backend '{}'", world.backend_id(), id);
        Ok(world)
    }
}

use std::collections::BTreeMap;

use log::trace;

use crate::backends::{
    OrbitalWorld, PhysicsBodyHandle, PhysicsBodyState, PhysicsWorld, ReferenceFrame, ReferenceFrameBridge,
};
use crate::utils::{ensure_finite, PhysicsError};

/// Drives an orbital world by absolute target times and names bodies by object id.
///
/// Time only moves forward: a target earlier than the world's simulation time is
/// rejected for every object this adapter serves. Targets are absolute simulation
/// times, so the world's time scale does not apply to them.
pub struct OrbitalDynamicsAdapter {
    world: OrbitalWorld,
    handles: BTreeMap<String, PhysicsBodyHandle>,
}

impl OrbitalDynamicsAdapter {
    pub fn new(world: OrbitalWorld) -> Self {
        Self { world, handles: BTreeMap::new() }
    }

    pub fn world(&self) -> &OrbitalWorld {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut OrbitalWorld {
        &mut self.world
    }

    /// Last propagated simulation time in seconds.
    pub fn last_time(&self) -> f64 {
        self.world.simulation_time()
    }

    /// Maps `object_id` to a body of the wrapped world, replacing any previous mapping.
    ///
    /// # Errors
    /// `InvalidArgument` for a blank id, `InvalidHandle` for a handle the world does not know.
    pub fn register(&mut self, object_id: &str, handle: PhysicsBodyHandle) -> Result<(), PhysicsError> {
        validate_object_id(object_id)?;
        self.world.body_state(handle)?;
        self.handles.insert(object_id.to_string(), handle);
        Ok(())
    }

    pub fn unregister(&mut self, object_id: &str) -> Result<bool, PhysicsError> {
        validate_object_id(object_id)?;
        Ok(self.handles.remove(object_id).is_some())
    }

    pub fn object_ids(&self) -> Vec<String> {
        self.handles.keys().cloned().collect()
    }

    /// Steps the world up to `target_time` and returns the requested objects' states in
    /// `output_frame`. Unregistered ids are left out of the result.
    ///
    /// # Errors
    /// `NonMonotonicTime` when `target_time` is earlier than the last propagated time,
    /// `InvalidArgument` for a non-finite target or blank id.
    pub fn propagate_to(
        &mut self,
        object_ids: &[&str],
        target_time: f64,
        output_frame: ReferenceFrame,
    ) -> Result<BTreeMap<String, PhysicsBodyState>, PhysicsError> {
        ensure_finite(target_time, "target time")?;
        let last_time = self.last_time();
        if target_time < last_time {
            return Err(PhysicsError::NonMonotonicTime { requested: target_time, last: last_time });
        }
        for id in object_ids {
            validate_object_id(id)?;
        }
        if target_time > last_time {
            self.world.advance_to(target_time)?;
            trace!("propagated orbital world to {}s", target_time);
        }
        let epoch = self.world.simulation_time();

        let mut states = BTreeMap::new();
        for id in object_ids {
            let Some(&handle) = self.handles.get(*id) else {
                continue;
            };
            let state = self.world.body_state(handle)?;
            let converted = ReferenceFrameBridge::transform(&state, output_frame, epoch)?;
            states.insert(id.to_string(), PhysicsBodyState { timestamp: epoch, ..converted });
        }
        Ok(states)
    }

    pub fn close(&mut self) {
        self.world.close();
    }
}

fn validate_object_id(object_id: &str) -> Result<(), PhysicsError> {
    if object_id.trim().is_empty() {
        Err(PhysicsError::invalid_argument("object id must not be blank"))
    } else {
        Ok(())
    }
}

//! Backend-neutral physics worlds.
//!
//! `PhysicsWorld` is the contract every engine implements. Engines are selected by id
//! through `PhysicsBackendFactory`: `"ode4j"` runs the crate's own rigid-body pipeline,
//! `"jolt"` drives a native engine over a C ABI and `"orekit"` propagates point masses.

mod backend_factory;
mod native_bridge;
mod native_world;
mod orbital_dynamics;
mod orbital_world;
mod physics_world;
mod reference_frames;
mod rigid_body_world;

pub use backend_factory::*;
pub use native_bridge::*;
pub use native_world::*;
pub use orbital_dynamics::*;
pub use orbital_world::*;
pub use physics_world::*;
pub use reference_frames::*;
pub use rigid_body_world::*;

#[cfg(test)]
mod backend_factory_tests;
#[cfg(test)]
mod native_world_tests;
#[cfg(test)]
mod physics_world_tests;

mod collision_world;
mod fixed_step;
mod simulation_clock;
mod transform_store;

pub use collision_world::*;
pub use fixed_step::*;
pub use simulation_clock::*;
pub use transform_store::*;

#[cfg(test)]
mod collision_world_tests;

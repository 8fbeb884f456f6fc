mod collision_filter;
mod contact_generation;
mod contact_solver;
mod continuous_collision_detection;
mod gjk_collision_3d;
mod intersection_3d;
mod manifold_cache;

pub use collision_filter::*;
pub use contact_generation::*;
pub use contact_solver::*;
pub use continuous_collision_detection::*;
pub use gjk_collision_3d::*;
pub use intersection_3d::*;
pub use manifold_cache::*;

#[cfg(test)]
mod continuous_collision_detection_tests;

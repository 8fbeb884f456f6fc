use crate::interactions::RigidBodyAdapter3D;

#[cfg(feature = "constraints")]
mod distance_constraint;
#[cfg(feature = "constraints")]
mod point_constraint;
#[cfg(feature = "constraints")]
pub use distance_constraint::*;
#[cfg(feature = "constraints")]
pub use point_constraint::*;

#[cfg(feature = "constraints")]
#[cfg(test)]
mod constraints_tests;

/// Errors and distances at or below this are treated as already satisfied.
pub const CONSTRAINT_EPSILON: f64 = 1e-9;

/// A position-level corrector run before contact resolution each step.
pub trait Constraint3D<T>: Send {
    fn solve(&self, bodies: &mut dyn RigidBodyAdapter3D<T>, dt: f64);
}

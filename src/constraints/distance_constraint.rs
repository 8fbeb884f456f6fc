use crate::constraints::{Constraint3D, CONSTRAINT_EPSILON};
use crate::interactions::RigidBodyAdapter3D;
use crate::utils::{add_scaled, ensure_finite, scale_vector, subtract_vectors, vector_magnitude, PhysicsError};

/// Keeps two bodies at a target distance by moving them along the line between them.
///
/// The correction is `stiffness * (distance - target)`, shared in proportion to each
/// body's inverse mass, so a static body never moves and its partner takes the whole
/// correction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceConstraint3D<T> {
    body_a: T,
    body_b: T,
    target_distance: f64,
    stiffness: f64,
}

impl<T: Copy> DistanceConstraint3D<T> {
    /// # Errors
    /// `InvalidArgument` when `target_distance` is negative or non-finite, or `stiffness`
    /// lies outside `[0, 1]`.
    pub fn new(body_a: T, body_b: T, target_distance: f64, stiffness: f64) -> Result<Self, PhysicsError> {
        ensure_finite(target_distance, "target distance")?;
        ensure_finite(stiffness, "stiffness")?;
        if target_distance < 0.0 {
            return Err(PhysicsError::invalid_argument("target distance must be >= 0"));
        }
        if !(0.0..=1.0).contains(&stiffness) {
            return Err(PhysicsError::invalid_argument("stiffness must be in [0,1]"));
        }
        Ok(Self { body_a, body_b, target_distance, stiffness })
    }

    pub fn bodies(&self) -> (T, T) {
        (self.body_a, self.body_b)
    }

    pub fn target_distance(&self) -> f64 {
        self.target_distance
    }

    pub fn stiffness(&self) -> f64 {
        self.stiffness
    }
}

impl<T: Copy + Send> Constraint3D<T> for DistanceConstraint3D<T> {
    fn solve(&self, bodies: &mut dyn RigidBodyAdapter3D<T>, _dt: f64) {
        let pa = bodies.position(self.body_a);
        let pb = bodies.position(self.body_b);
        let delta = subtract_vectors(pb, pa);
        let distance = vector_magnitude(delta);
        if distance <= CONSTRAINT_EPSILON {
            return;
        }

        let inv_a = bodies.inverse_mass(self.body_a).max(0.0);
        let inv_b = bodies.inverse_mass(self.body_b).max(0.0);
        let inv_sum = inv_a + inv_b;
        if inv_sum <= 0.0 {
            return;
        }

        let error = distance - self.target_distance;
        if error.abs() <= CONSTRAINT_EPSILON {
            return;
        }

        let correction = scale_vector(delta, error * self.stiffness / distance);
        bodies.set_position(self.body_a, add_scaled(pa, correction, inv_a / inv_sum));
        bodies.set_position(self.body_b, add_scaled(pb, correction, -inv_b / inv_sum));
    }
}

use crate::constraints::{Constraint3D, CONSTRAINT_EPSILON};
use crate::interactions::RigidBodyAdapter3D;
use crate::utils::{add_scaled, ensure_finite, ensure_finite_vector, subtract_vectors, vector_magnitude, PhysicsError, Vector3};

/// Pulls one body toward a fixed world-space anchor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointConstraint3D<T> {
    body: T,
    anchor: Vector3,
    stiffness: f64,
}

impl<T: Copy> PointConstraint3D<T> {
    /// # Errors
    /// `InvalidArgument` for a non-finite anchor or a stiffness outside `[0, 1]`.
    pub fn new(body: T, anchor: Vector3, stiffness: f64) -> Result<Self, PhysicsError> {
        ensure_finite_vector(anchor, "anchor")?;
        ensure_finite(stiffness, "stiffness")?;
        if !(0.0..=1.0).contains(&stiffness) {
            return Err(PhysicsError::invalid_argument("stiffness must be in [0,1]"));
        }
        Ok(Self { body, anchor, stiffness })
    }

    pub fn body(&self) -> T {
        self.body
    }

    pub fn anchor(&self) -> Vector3 {
        self.anchor
    }

    pub fn stiffness(&self) -> f64 {
        self.stiffness
    }
}

impl<T: Copy + Send> Constraint3D<T> for PointConstraint3D<T> {
    fn solve(&self, bodies: &mut dyn RigidBodyAdapter3D<T>, _dt: f64) {
        if bodies.inverse_mass(self.body) <= 0.0 {
            return;
        }
        let position = bodies.position(self.body);
        let error = subtract_vectors(self.anchor, position);
        if vector_magnitude(error) <= CONSTRAINT_EPSILON {
            return;
        }
        bodies.set_position(self.body, add_scaled(position, error, self.stiffness));
    }
}

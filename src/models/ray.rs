use crate::utils::{add_scaled, ensure_finite_vector, normalize_vector, PhysicsError, Vector3};

/// A half-line with a unit-length direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray3D {
    origin: Vector3,
    direction: Vector3,
}

impl Ray3D {
    /// Creates a ray, normalizing `direction`.
    ///
    /// # Errors
    /// `InvalidArgument` for non-finite input or a zero direction.
    pub fn new(origin: Vector3, direction: Vector3) -> Result<Self, PhysicsError> {
        ensure_finite_vector(origin, "ray origin")?;
        ensure_finite_vector(direction, "ray direction")?;
        let direction = normalize_vector(direction)
            .map_err(|_| PhysicsError::invalid_argument("ray direction must be non-zero"))?;
        Ok(Self { origin, direction })
    }

    pub fn origin(&self) -> Vector3 {
        self.origin
    }

    pub fn direction(&self) -> Vector3 {
        self.direction
    }

    pub fn point_at(&self, distance: f64) -> Vector3 {
        add_scaled(self.origin, self.direction, distance)
    }
}

use crate::models::Aabb;
use crate::utils::{ensure_finite, ensure_finite_vector, magnitude_squared, subtract_vectors, PhysicsError, Vector3};

/// A sphere given by its center and a non-negative radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    center: Vector3,
    radius: f64,
}

impl BoundingSphere {
    pub fn new(center: Vector3, radius: f64) -> Result<Self, PhysicsError> {
        ensure_finite_vector(center, "sphere center")?;
        ensure_finite(radius, "sphere radius")?;
        if radius < 0.0 {
            return Err(PhysicsError::invalid_argument(format!("sphere radius must be non-negative, got {}", radius)));
        }
        Ok(Self { center, radius })
    }

    pub fn center(&self) -> Vector3 {
        self.center
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn to_aabb(&self) -> Aabb {
        let r = self.radius;
        Aabb::from_ordered(
            (self.center.0 - r, self.center.1 - r, self.center.2 - r),
            (self.center.0 + r, self.center.1 + r, self.center.2 + r),
        )
    }

    pub fn contains_point(&self, p: Vector3) -> bool {
        magnitude_squared(subtract_vectors(p, self.center)) <= self.radius * self.radius
    }

    pub fn translated(&self, offset: Vector3) -> BoundingSphere {
        BoundingSphere {
            center: (self.center.0 + offset.0, self.center.1 + offset.1, self.center.2 + offset.2),
            radius: self.radius,
        }
    }
}

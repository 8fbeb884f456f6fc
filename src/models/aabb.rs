use crate::utils::{PhysicsError, Vector3};

/// Axis-aligned bounding box with inclusive bounds.
///
/// Invariant: every component is finite and `min <= max` on each axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    min: Vector3,
    max: Vector3,
}

impl Aabb {
    /// Creates a box from its corners.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if any component is non-finite or `min > max` on some axis.
    pub fn new(min: Vector3, max: Vector3) -> Result<Self, PhysicsError> {
        let components = [min.0, min.1, min.2, max.0, max.1, max.2];
        if components.iter().any(|c| !c.is_finite()) {
            return Err(PhysicsError::invalid_argument(format!(
                "aabb bounds must be finite: min {:?}, max {:?}", min, max
            )));
        }
        if min.0 > max.0 || min.1 > max.1 || min.2 > max.2 {
            return Err(PhysicsError::invalid_argument(format!(
                "aabb min must not exceed max: min {:?}, max {:?}", min, max
            )));
        }
        Ok(Self { min, max })
    }

    /// Builds a box from corners already known to be finite and ordered.
    pub(crate) fn from_ordered(min: Vector3, max: Vector3) -> Self {
        debug_assert!(min.0 <= max.0 && min.1 <= max.1 && min.2 <= max.2);
        Self { min, max }
    }

    /// Convenience constructor taking `min_x, min_y, min_z, max_x, max_y, max_z`.
    pub fn from_bounds(bounds: [f64; 6]) -> Result<Self, PhysicsError> {
        Self::new((bounds[0], bounds[1], bounds[2]), (bounds[3], bounds[4], bounds[5]))
    }

    pub fn from_center_half_extents(center: Vector3, half_extents: Vector3) -> Result<Self, PhysicsError> {
        if half_extents.0 < 0.0 || half_extents.1 < 0.0 || half_extents.2 < 0.0 {
            return Err(PhysicsError::invalid_argument(format!(
                "half extents must be non-negative, got {:?}", half_extents
            )));
        }
        Self::new(
            (center.0 - half_extents.0, center.1 - half_extents.1, center.2 - half_extents.2),
            (center.0 + half_extents.0, center.1 + half_extents.1, center.2 + half_extents.2),
        )
    }

    pub fn min(&self) -> Vector3 {
        self.min
    }

    pub fn max(&self) -> Vector3 {
        self.max
    }

    pub fn min_x(&self) -> f64 { self.min.0 }
    pub fn min_y(&self) -> f64 { self.min.1 }
    pub fn min_z(&self) -> f64 { self.min.2 }
    pub fn max_x(&self) -> f64 { self.max.0 }
    pub fn max_y(&self) -> f64 { self.max.1 }
    pub fn max_z(&self) -> f64 { self.max.2 }

    pub fn center(&self) -> Vector3 {
        (
            (self.min.0 + self.max.0) * 0.5,
            (self.min.1 + self.max.1) * 0.5,
            (self.min.2 + self.max.2) * 0.5,
        )
    }

    /// Full size along each axis.
    pub fn extent(&self) -> Vector3 {
        (self.max.0 - self.min.0, self.max.1 - self.min.1, self.max.2 - self.min.2)
    }

    pub fn half_extents(&self) -> Vector3 {
        let e = self.extent();
        (e.0 * 0.5, e.1 * 0.5, e.2 * 0.5)
    }

    /// Inclusive overlap test: boxes sharing a face, edge or corner intersect.
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.0 <= other.max.0 && self.max.0 >= other.min.0
            && self.min.1 <= other.max.1 && self.max.1 >= other.min.1
            && self.min.2 <= other.max.2 && self.max.2 >= other.min.2
    }

    pub fn contains_point(&self, p: Vector3) -> bool {
        p.0 >= self.min.0 && p.0 <= self.max.0
            && p.1 >= self.min.1 && p.1 <= self.max.1
            && p.2 >= self.min.2 && p.2 <= self.max.2
    }

    /// Smallest box containing both boxes.
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: (self.min.0.min(other.min.0), self.min.1.min(other.min.1), self.min.2.min(other.min.2)),
            max: (self.max.0.max(other.max.0), self.max.1.max(other.max.1), self.max.2.max(other.max.2)),
        }
    }

    /// Grows the box by `margin` on every side.
    pub fn inflate(&self, margin: f64) -> Result<Aabb, PhysicsError> {
        Aabb::new(
            (self.min.0 - margin, self.min.1 - margin, self.min.2 - margin),
            (self.max.0 + margin, self.max.1 + margin, self.max.2 + margin),
        )
    }

    /// Grows the box by the given half sizes on each axis (Minkowski sum with a box).
    pub fn expanded_by(&self, half_sizes: Vector3) -> Aabb {
        Aabb {
            min: (self.min.0 - half_sizes.0, self.min.1 - half_sizes.1, self.min.2 - half_sizes.2),
            max: (self.max.0 + half_sizes.0, self.max.1 + half_sizes.1, self.max.2 + half_sizes.2),
        }
    }

    pub fn translated(&self, offset: Vector3) -> Aabb {
        Aabb {
            min: (self.min.0 + offset.0, self.min.1 + offset.1, self.min.2 + offset.2),
            max: (self.max.0 + offset.0, self.max.1 + offset.1, self.max.2 + offset.2),
        }
    }

    /// Point inside or on the box nearest to `p`.
    pub fn closest_point(&self, p: Vector3) -> Vector3 {
        (
            p.0.clamp(self.min.0, self.max.0),
            p.1.clamp(self.min.1, self.max.1),
            p.2.clamp(self.min.2, self.max.2),
        )
    }
}

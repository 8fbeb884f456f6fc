use crate::models::{Aabb, BoundingSphere, Quaternion};
use crate::utils::{
    add_vectors, dot_product, ensure_finite, ensure_finite_vector, normalize_or, scale_vector, PhysicsError,
    Vector3,
};

/// Support mapping of a convex shape: the farthest point of the shape along `direction`.
///
/// This is the only view of a shape the GJK, EPA and conservative-advancement routines need.
pub trait ConvexSupport3D {
    fn support(&self, direction: Vector3) -> Vector3;

    /// A point strictly inside (or on) the shape, used to seed search directions.
    fn center(&self) -> Vector3 {
        let px = self.support((1.0, 0.0, 0.0));
        let nx = self.support((-1.0, 0.0, 0.0));
        let py = self.support((0.0, 1.0, 0.0));
        let ny = self.support((0.0, -1.0, 0.0));
        let pz = self.support((0.0, 0.0, 1.0));
        let nz = self.support((0.0, 0.0, -1.0));
        ((px.0 + nx.0) * 0.5, (py.1 + ny.1) * 0.5, (pz.2 + nz.2) * 0.5)
    }
}

impl<S: ConvexSupport3D + ?Sized> ConvexSupport3D for &S {
    fn support(&self, direction: Vector3) -> Vector3 {
        (**self).support(direction)
    }

    fn center(&self) -> Vector3 {
        (**self).center()
    }
}

impl<S: ConvexSupport3D + ?Sized> ConvexSupport3D for Box<S> {
    fn support(&self, direction: Vector3) -> Vector3 {
        (**self).support(direction)
    }

    fn center(&self) -> Vector3 {
        (**self).center()
    }
}

impl ConvexSupport3D for Aabb {
    fn support(&self, d: Vector3) -> Vector3 {
        let (min, max) = (self.min(), self.max());
        (
            if d.0 >= 0.0 { max.0 } else { min.0 },
            if d.1 >= 0.0 { max.1 } else { min.1 },
            if d.2 >= 0.0 { max.2 } else { min.2 },
        )
    }

    fn center(&self) -> Vector3 {
        Aabb::center(self)
    }
}

impl ConvexSupport3D for BoundingSphere {
    fn support(&self, d: Vector3) -> Vector3 {
        let n = normalize_or(d, (1.0, 0.0, 0.0), 1e-12);
        add_vectors(BoundingSphere::center(self), scale_vector(n, self.radius()))
    }

    fn center(&self) -> Vector3 {
        BoundingSphere::center(self)
    }
}

/// Convex hull of a finite point set.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvexPointCloud {
    points: Vec<Vector3>,
}

impl ConvexPointCloud {
    pub fn new(points: Vec<Vector3>) -> Result<Self, PhysicsError> {
        if points.is_empty() {
            return Err(PhysicsError::invalid_argument("point cloud must contain at least one point"));
        }
        for p in &points {
            ensure_finite_vector(*p, "point cloud vertex")?;
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[Vector3] {
        &self.points
    }
}

impl ConvexSupport3D for ConvexPointCloud {
    fn support(&self, d: Vector3) -> Vector3 {
        let mut best = self.points[0];
        let mut best_dot = dot_product(best, d);
        for p in &self.points[1..] {
            let value = dot_product(*p, d);
            if value > best_dot {
                best_dot = value;
                best = *p;
            }
        }
        best
    }

    fn center(&self) -> Vector3 {
        let sum = self.points.iter().fold((0.0, 0.0, 0.0), |acc, p| add_vectors(acc, *p));
        scale_vector(sum, 1.0 / self.points.len() as f64)
    }
}

/// Box with arbitrary orientation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientedBox {
    pub center: Vector3,
    pub half_extents: Vector3,
    pub orientation: Quaternion,
}

impl OrientedBox {
    pub fn new(center: Vector3, half_extents: Vector3, orientation: Quaternion) -> Result<Self, PhysicsError> {
        ensure_finite_vector(center, "box center")?;
        ensure_finite_vector(half_extents, "box half extents")?;
        if half_extents.0 < 0.0 || half_extents.1 < 0.0 || half_extents.2 < 0.0 {
            return Err(PhysicsError::invalid_argument(format!(
                "box half extents must be non-negative, got {:?}", half_extents
            )));
        }
        if !orientation.is_finite() {
            return Err(PhysicsError::invalid_argument("box orientation must be finite"));
        }
        Ok(Self { center, half_extents, orientation: orientation.normalized() })
    }

    /// Tight world-space bounds of the rotated box.
    pub fn bounds(&self) -> Aabb {
        let m = self.orientation.rotation_matrix();
        let h = self.half_extents;
        let r = |row: [f64; 3]| row[0].abs() * h.0 + row[1].abs() * h.1 + row[2].abs() * h.2;
        let e = (r(m[0]), r(m[1]), r(m[2]));
        Aabb::from_ordered(
            (self.center.0 - e.0, self.center.1 - e.1, self.center.2 - e.2),
            (self.center.0 + e.0, self.center.1 + e.1, self.center.2 + e.2),
        )
    }
}

impl ConvexSupport3D for OrientedBox {
    fn support(&self, d: Vector3) -> Vector3 {
        let local = self.orientation.conjugate().rotate_point(d);
        let h = self.half_extents;
        let corner = (
            if local.0 >= 0.0 { h.0 } else { -h.0 },
            if local.1 >= 0.0 { h.1 } else { -h.1 },
            if local.2 >= 0.0 { h.2 } else { -h.2 },
        );
        add_vectors(self.center, self.orientation.rotate_point(corner))
    }

    fn center(&self) -> Vector3 {
        self.center
    }
}

/// Capsule: a segment of `half_height` either side of the center along the local Y axis,
/// swept by `radius`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Capsule {
    pub center: Vector3,
    pub radius: f64,
    pub half_height: f64,
    pub orientation: Quaternion,
}

impl Capsule {
    pub fn new(center: Vector3, radius: f64, half_height: f64, orientation: Quaternion) -> Result<Self, PhysicsError> {
        ensure_finite_vector(center, "capsule center")?;
        ensure_finite(radius, "capsule radius")?;
        ensure_finite(half_height, "capsule half height")?;
        if radius < 0.0 || half_height < 0.0 {
            return Err(PhysicsError::invalid_argument("capsule radius and half height must be non-negative"));
        }
        Ok(Self { center, radius, half_height, orientation: orientation.normalized() })
    }

    pub fn axis(&self) -> Vector3 {
        self.orientation.rotate_point((0.0, 1.0, 0.0))
    }

    pub fn bounds(&self) -> Aabb {
        let a = scale_vector(self.axis(), self.half_height);
        let e = (a.0.abs() + self.radius, a.1.abs() + self.radius, a.2.abs() + self.radius);
        Aabb::from_ordered(
            (self.center.0 - e.0, self.center.1 - e.1, self.center.2 - e.2),
            (self.center.0 + e.0, self.center.1 + e.1, self.center.2 + e.2),
        )
    }
}

impl ConvexSupport3D for Capsule {
    fn support(&self, d: Vector3) -> Vector3 {
        let axis = self.axis();
        let end = if dot_product(axis, d) >= 0.0 { self.half_height } else { -self.half_height };
        let n = normalize_or(d, (1.0, 0.0, 0.0), 1e-12);
        add_vectors(add_vectors(self.center, scale_vector(axis, end)), scale_vector(n, self.radius))
    }

    fn center(&self) -> Vector3 {
        self.center
    }
}

/// A shape displaced by a fixed offset.
#[derive(Debug, Clone, Copy)]
pub struct Translated<S> {
    pub shape: S,
    pub offset: Vector3,
}

impl<S: ConvexSupport3D> Translated<S> {
    pub fn new(shape: S, offset: Vector3) -> Self {
        Self { shape, offset }
    }
}

impl<S: ConvexSupport3D> ConvexSupport3D for Translated<S> {
    fn support(&self, d: Vector3) -> Vector3 {
        add_vectors(self.shape.support(d), self.offset)
    }

    fn center(&self) -> Vector3 {
        add_vectors(self.shape.center(), self.offset)
    }
}

/// Adapts a closure into a support mapping.
pub struct SupportFn<F> {
    support: F,
}

impl<F: Fn(Vector3) -> Vector3> SupportFn<F> {
    pub fn new(support: F) -> Self {
        Self { support }
    }
}

impl<F: Fn(Vector3) -> Vector3> ConvexSupport3D for SupportFn<F> {
    fn support(&self, d: Vector3) -> Vector3 {
        (self.support)(d)
    }
}

use crate::interactions::Gjk3D;
use crate::models::{Aabb, BoundingSphere, CollisionManifold3D, ContactManifold3D, ContactPoint3D, ConvexSupport3D};
use crate::utils::{
    add_scaled, component, lerp_vectors, negate_vector, scale_vector, subtract_vectors, vector_magnitude, Vector3,
};

/// Center distances at or below this are treated as coincident
const COINCIDENT_EPSILON: f64 = 1e-9;

/// Shapes with a dedicated closed-form contact routine.
pub trait ContactShape {
    fn generate_contact(&self, other: &Self) -> Option<ContactManifold3D>;
}

/// Builds contact manifolds for intersecting shape pairs. Normals point from A toward B.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContactGenerator3D;

impl ContactGenerator3D {
    /// Closed-form contact for two AABBs or two spheres; `None` when they do not touch.
    pub fn generate<S: ContactShape>(a: &S, b: &S) -> Option<ContactManifold3D> {
        a.generate_contact(b)
    }

    /// Contact for arbitrary convex shapes from the GJK/EPA penetration manifold.
    ///
    /// The single contact point is the midpoint of the two deepest support points.
    pub fn generate_convex<A, B>(gjk: &Gjk3D, a: &A, b: &B) -> Option<ContactManifold3D>
    where
        A: ConvexSupport3D + ?Sized,
        B: ConvexSupport3D + ?Sized,
    {
        let manifold = gjk.intersects_with_manifold(a, b)?;
        let on_a = a.support(manifold.normal());
        let on_b = b.support(negate_vector(manifold.normal()));
        let contact = ContactPoint3D::new(lerp_vectors(on_a, on_b, 0.5)).ok()?;
        ContactManifold3D::new(manifold, vec![contact]).ok()
    }
}

impl ContactShape for Aabb {
    /// Least-penetration axis (X, then Y, then Z on ties) with one contact at the
    /// centroid of the overlap region, placed mid-way between the touching faces.
    fn generate_contact(&self, other: &Aabb) -> Option<ContactManifold3D> {
        let (a_min, a_max) = (self.min(), self.max());
        let (b_min, b_max) = (other.min(), other.max());

        let mut overlap = [0.0; 3];
        for (axis, slot) in overlap.iter_mut().enumerate() {
            let lo = component(a_min, axis).max(component(b_min, axis));
            let hi = component(a_max, axis).min(component(b_max, axis));
            *slot = hi - lo;
            if *slot < 0.0 {
                return None;
            }
        }

        let mut axis = 0;
        for candidate in 1..3 {
            if overlap[candidate] < overlap[axis] {
                axis = candidate;
            }
        }

        let delta = subtract_vectors(other.center(), self.center());
        let sign = if component(delta, axis) >= 0.0 { 1.0 } else { -1.0 };
        let normal = match axis {
            0 => (sign, 0.0, 0.0),
            1 => (0.0, sign, 0.0),
            _ => (0.0, 0.0, sign),
        };

        let mut point = [0.0; 3];
        for (i, slot) in point.iter_mut().enumerate() {
            *slot = if i == axis {
                if sign > 0.0 {
                    (component(a_max, i) + component(b_min, i)) * 0.5
                } else {
                    (component(a_min, i) + component(b_max, i)) * 0.5
                }
            } else {
                let lo = component(a_min, i).max(component(b_min, i));
                let hi = component(a_max, i).min(component(b_max, i));
                (lo + hi) * 0.5
            };
        }

        let manifold = CollisionManifold3D::new(normal, overlap[axis]).ok()?;
        let contact = ContactPoint3D::new((point[0], point[1], point[2])).ok()?;
        ContactManifold3D::new(manifold, vec![contact]).ok()
    }
}

impl ContactShape for BoundingSphere {
    /// Normal along the center line (+X when centers coincide), contact at the midpoint
    /// of the two surface points.
    fn generate_contact(&self, other: &BoundingSphere) -> Option<ContactManifold3D> {
        let delta = subtract_vectors(other.center(), self.center());
        let distance = vector_magnitude(delta);
        let radius_sum = self.radius() + other.radius();
        if distance > radius_sum {
            return None;
        }

        let (normal, distance) = if distance <= COINCIDENT_EPSILON {
            ((1.0, 0.0, 0.0), 0.0)
        } else {
            (scale_vector(delta, 1.0 / distance), distance)
        };

        let surface_a: Vector3 = add_scaled(self.center(), normal, self.radius());
        let surface_b: Vector3 = add_scaled(other.center(), normal, -other.radius());
        let manifold = CollisionManifold3D::new(normal, radius_sum - distance).ok()?;
        let contact = ContactPoint3D::new(lerp_vectors(surface_a, surface_b, 0.5)).ok()?;
        ContactManifold3D::new(manifold, vec![contact]).ok()
    }
}

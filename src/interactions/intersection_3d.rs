use crate::models::{Aabb, BoundingSphere, Ray3D};
use crate::utils::{component, dot_product, magnitude_squared, subtract_vectors};

/// Direction components smaller than this are treated as parallel to a slab
const PARALLEL_EPSILON: f64 = 1e-12;

// All predicates below are inclusive: touching counts as intersecting.

pub fn aabb_intersects_aabb(a: &Aabb, b: &Aabb) -> bool {
    a.intersects(b)
}

pub fn sphere_intersects_sphere(a: &BoundingSphere, b: &BoundingSphere) -> bool {
    let radius_sum = a.radius() + b.radius();
    magnitude_squared(subtract_vectors(a.center(), b.center())) <= radius_sum * radius_sum
}

/// Tests the sphere against the point of the box closest to its center.
pub fn sphere_intersects_aabb(sphere: &BoundingSphere, aabb: &Aabb) -> bool {
    let closest = aabb.closest_point(sphere.center());
    magnitude_squared(subtract_vectors(closest, sphere.center())) <= sphere.radius() * sphere.radius()
}

/// Slab test.
///
/// # Returns
/// The nearest non-negative hit distance along the ray, `Some(0.0)` when the origin is
/// already inside the box, `None` on a miss.
pub fn ray_aabb_distance(ray: &Ray3D, aabb: &Aabb) -> Option<f64> {
    let origin = ray.origin();
    let direction = ray.direction();
    let mut t_min = 0.0_f64;
    let mut t_max = f64::INFINITY;

    for axis in 0..3 {
        let o = component(origin, axis);
        let d = component(direction, axis);
        let lo = component(aabb.min(), axis);
        let hi = component(aabb.max(), axis);

        if d.abs() < PARALLEL_EPSILON {
            if o < lo || o > hi {
                return None;
            }
            continue;
        }

        let inv = 1.0 / d;
        let (t1, t2) = ((lo - o) * inv, (hi - o) * inv);
        let (near, far) = if t1 <= t2 { (t1, t2) } else { (t2, t1) };
        t_min = t_min.max(near);
        t_max = t_max.min(far);
        if t_min > t_max {
            return None;
        }
    }
    Some(t_min)
}

/// Nearest non-negative hit distance against a sphere, `Some(0.0)` from inside.
pub fn ray_sphere_distance(ray: &Ray3D, sphere: &BoundingSphere) -> Option<f64> {
    let m = subtract_vectors(ray.origin(), sphere.center());
    let b = dot_product(m, ray.direction());
    let c = magnitude_squared(m) - sphere.radius() * sphere.radius();
    if c > 0.0 && b > 0.0 {
        return None;
    }
    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return None;
    }
    Some((-b - discriminant.sqrt()).max(0.0))
}

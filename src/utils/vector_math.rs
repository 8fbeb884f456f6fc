/// A 3D vector as an `(x, y, z)` tuple.
pub type Vector3 = (f64, f64, f64);

pub const ZERO_VECTOR: Vector3 = (0.0, 0.0, 0.0);

/// Calculates the cross product of two 3D vectors.
///
/// # Example
/// ```
/// use rs_physics_core::utils::cross_product;
///
/// let result = cross_product((1.0, 0.0, 0.0), (0.0, 1.0, 0.0));
/// assert_eq!(result, (0.0, 0.0, 1.0));
/// ```
pub fn cross_product(v1: Vector3, v2: Vector3) -> Vector3 {
    (
        v1.1 * v2.2 - v1.2 * v2.1,
        v1.2 * v2.0 - v1.0 * v2.2,
        v1.0 * v2.1 - v1.1 * v2.0
    )
}

/// Calculates the dot product of two 3D vectors.
///
/// # Example
/// ```
/// use rs_physics_core::utils::dot_product;
///
/// assert_eq!(dot_product((1.0, 2.0, 3.0), (4.0, 5.0, 6.0)), 32.0);
/// ```
pub fn dot_product(v1: Vector3, v2: Vector3) -> f64 {
    v1.0 * v2.0 + v1.1 * v2.1 + v1.2 * v2.2
}

/// Calculates the magnitude (length) of a 3D vector.
pub fn vector_magnitude(v: Vector3) -> f64 {
    (v.0 * v.0 + v.1 * v.1 + v.2 * v.2).sqrt()
}

pub fn magnitude_squared(v: Vector3) -> f64 {
    v.0 * v.0 + v.1 * v.1 + v.2 * v.2
}

/// Normalizes a 3D vector (makes it a unit vector).
///
/// # Errors
/// Returns an error if the input is a zero vector.
///
/// # Example
/// ```
/// use rs_physics_core::utils::normalize_vector;
///
/// let normalized = normalize_vector((3.0, 0.0, 4.0)).unwrap();
/// assert!((normalized.0 - 0.6).abs() < 1e-10);
/// assert!((normalized.2 - 0.8).abs() < 1e-10);
/// ```
pub fn normalize_vector(v: Vector3) -> Result<Vector3, &'static str> {
    let magnitude = vector_magnitude(v);

    if magnitude == 0.0 || !magnitude.is_finite() {
        return Err("Cannot normalize a zero vector");
    }

    Ok((v.0 / magnitude, v.1 / magnitude, v.2 / magnitude))
}

/// Normalizes `v`, returning `fallback` when `v` is shorter than `epsilon`.
pub fn normalize_or(v: Vector3, fallback: Vector3, epsilon: f64) -> Vector3 {
    let magnitude = vector_magnitude(v);
    if magnitude <= epsilon || !magnitude.is_finite() {
        fallback
    } else {
        (v.0 / magnitude, v.1 / magnitude, v.2 / magnitude)
    }
}

pub fn add_vectors(a: Vector3, b: Vector3) -> Vector3 {
    (a.0 + b.0, a.1 + b.1, a.2 + b.2)
}

pub fn subtract_vectors(a: Vector3, b: Vector3) -> Vector3 {
    (a.0 - b.0, a.1 - b.1, a.2 - b.2)
}

pub fn scale_vector(v: Vector3, s: f64) -> Vector3 {
    (v.0 * s, v.1 * s, v.2 * s)
}

pub fn negate_vector(v: Vector3) -> Vector3 {
    (-v.0, -v.1, -v.2)
}

/// Returns `a + b * s`.
pub fn add_scaled(a: Vector3, b: Vector3, s: f64) -> Vector3 {
    (a.0 + b.0 * s, a.1 + b.1 * s, a.2 + b.2 * s)
}

pub fn lerp_vectors(a: Vector3, b: Vector3, t: f64) -> Vector3 {
    (a.0 + (b.0 - a.0) * t, a.1 + (b.1 - a.1) * t, a.2 + (b.2 - a.2) * t)
}

pub fn distance_between(a: Vector3, b: Vector3) -> f64 {
    vector_magnitude(subtract_vectors(a, b))
}

pub fn is_finite_vector(v: Vector3) -> bool {
    v.0.is_finite() && v.1.is_finite() && v.2.is_finite()
}

/// Any unit vector perpendicular to `v`.
pub fn perpendicular_vector(v: Vector3) -> Vector3 {
    let axis = if v.0.abs() < 0.57735 {
        (1.0, 0.0, 0.0)
    } else if v.1.abs() < 0.57735 {
        (0.0, 1.0, 0.0)
    } else {
        (0.0, 0.0, 1.0)
    };
    normalize_or(cross_product(v, axis), (0.0, 0.0, 1.0), 1e-12)
}

/// Component by index, 0 = x, 1 = y, anything else = z.
pub fn component(v: Vector3, axis: usize) -> f64 {
    match axis {
        0 => v.0,
        1 => v.1,
        _ => v.2,
    }
}

use crate::utils::{add_vectors, cross_product, scale_vector, Vector3};

/// Unit quaternion for body orientation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Default for Quaternion {
    fn default() -> Self {
        Quaternion::identity()
    }
}

impl Quaternion {
    pub fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }

    /// Creates a new identity quaternion (no rotation)
    pub fn identity() -> Self {
        Self { w: 1.0, x: 0.0, y: 0.0, z: 0.0 }
    }

    pub fn is_near_identity(&self, epsilon: f64) -> bool {
        // q and -q encode the same rotation
        let sign = if self.w < 0.0 { -1.0 } else { 1.0 };
        (self.w * sign - 1.0).abs() < epsilon
            && self.x.abs() < epsilon
            && self.y.abs() < epsilon
            && self.z.abs() < epsilon
    }

    pub fn is_finite(&self) -> bool {
        self.w.is_finite() && self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Creates a quaternion from axis-angle representation
    pub fn from_axis_angle(axis: Vector3, angle: f64) -> Self {
        let (ax, ay, az) = axis;
        let magnitude = (ax * ax + ay * ay + az * az).sqrt();
        if magnitude < 1e-10 {
            return Quaternion::identity();
        }

        let half_angle = angle / 2.0;
        let s = half_angle.sin() / magnitude;
        Quaternion { w: half_angle.cos(), x: ax * s, y: ay * s, z: az * s }
    }

    pub fn magnitude(&self) -> f64 {
        (self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Returns a normalized copy, or identity for a degenerate quaternion.
    pub fn normalized(&self) -> Self {
        let mag = self.magnitude();
        if mag < 1e-10 || !mag.is_finite() {
            return Quaternion::identity();
        }
        Quaternion { w: self.w / mag, x: self.x / mag, y: self.y / mag, z: self.z / mag }
    }

    /// Hamilton product, `self` applied after `other`.
    pub fn multiply(&self, other: &Quaternion) -> Quaternion {
        Quaternion {
            w: self.w * other.w - self.x * other.x - self.y * other.y - self.z * other.z,
            x: self.w * other.x + self.x * other.w + self.y * other.z - self.z * other.y,
            y: self.w * other.y - self.x * other.z + self.y * other.w + self.z * other.x,
            z: self.w * other.z + self.x * other.y - self.y * other.x + self.z * other.w,
        }
    }

    pub fn conjugate(&self) -> Quaternion {
        Quaternion { w: self.w, x: -self.x, y: -self.y, z: -self.z }
    }

    pub fn inverse(&self) -> Quaternion {
        let mag_squared = self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z;
        if mag_squared < 1e-10 {
            return Quaternion::identity();
        }
        let conj = self.conjugate();
        Quaternion {
            w: conj.w / mag_squared,
            x: conj.x / mag_squared,
            y: conj.y / mag_squared,
            z: conj.z / mag_squared,
        }
    }

    /// Rotates a vector by this (normalized) quaternion.
    pub fn rotate_point(&self, point: Vector3) -> Vector3 {
        let q = self.normalized();
        let u = (q.x, q.y, q.z);
        // v' = v + 2w (u x v) + 2 u x (u x v)
        let t = scale_vector(cross_product(u, point), 2.0);
        add_vectors(add_vectors(point, scale_vector(t, q.w)), cross_product(u, t))
    }

    /// Row-major rotation matrix of the normalized quaternion.
    pub fn rotation_matrix(&self) -> [[f64; 3]; 3] {
        let q = self.normalized();
        let (w, x, y, z) = (q.w, q.x, q.y, q.z);
        [
            [1.0 - 2.0 * (y * y + z * z), 2.0 * (x * y - w * z), 2.0 * (x * z + w * y)],
            [2.0 * (x * y + w * z), 1.0 - 2.0 * (x * x + z * z), 2.0 * (y * z - w * x)],
            [2.0 * (x * z - w * y), 2.0 * (y * z + w * x), 1.0 - 2.0 * (x * x + y * y)],
        ]
    }

    /// Advances the orientation by a world-space angular velocity over `dt`.
    pub fn integrate(&self, angular_velocity: Vector3, dt: f64) -> Quaternion {
        let omega = Quaternion { w: 0.0, x: angular_velocity.0, y: angular_velocity.1, z: angular_velocity.2 };
        let dq = omega.multiply(self);
        Quaternion {
            w: self.w + 0.5 * dt * dq.w,
            x: self.x + 0.5 * dt * dq.x,
            y: self.y + 0.5 * dt * dq.y,
            z: self.z + 0.5 * dt * dq.z,
        }
        .normalized()
    }

    /// Angle in radians of the rotation taking `self` to `other`.
    pub fn angle_to(&self, other: &Quaternion) -> f64 {
        let a = self.normalized();
        let b = other.normalized();
        let dot = (a.w * b.w + a.x * b.x + a.y * b.y + a.z * b.z).abs().min(1.0);
        2.0 * dot.acos()
    }

    /// Spherical linear interpolation between two quaternions
    pub fn slerp(&self, other: &Quaternion, t: f64) -> Quaternion {
        let q1 = self.normalized();
        let mut q2 = other.normalized();

        let mut dot = q1.w * q2.w + q1.x * q2.x + q1.y * q2.y + q1.z * q2.z;

        // Take the shorter arc
        if dot < 0.0 {
            q2 = Quaternion { w: -q2.w, x: -q2.x, y: -q2.y, z: -q2.z };
            dot = -dot;
        }

        const DOT_THRESHOLD: f64 = 0.9995;
        if dot > DOT_THRESHOLD {
            return Quaternion {
                w: q1.w + t * (q2.w - q1.w),
                x: q1.x + t * (q2.x - q1.x),
                y: q1.y + t * (q2.y - q1.y),
                z: q1.z + t * (q2.z - q1.z),
            }
            .normalized();
        }

        let theta_0 = dot.acos();
        let theta = theta_0 * t;
        let sin_theta_0 = theta_0.sin();
        let s0 = ((1.0 - t) * theta_0).sin() / sin_theta_0;
        let s1 = theta.sin() / sin_theta_0;

        Quaternion {
            w: s0 * q1.w + s1 * q2.w,
            x: s0 * q1.x + s1 * q2.x,
            y: s0 * q1.y + s1 * q2.y,
            z: s0 * q1.z + s1 * q2.z,
        }
    }
}

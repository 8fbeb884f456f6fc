use crate::models::{ContactManifold3D, WarmStartImpulse};
use crate::utils::{
    add_scaled, dot_product, ensure_finite, normalize_or, perpendicular_vector, scale_vector, subtract_vectors,
    PhysicsError, Vector3,
};

pub const DEFAULT_POSITION_CORRECTION_PERCENT: f64 = 0.8;
pub const DEFAULT_POSITION_CORRECTION_SLOP: f64 = 0.001;

const TANGENT_EPSILON: f64 = 1e-9;
const IMPULSE_EPSILON: f64 = 1e-12;

/// The only view the solver has of caller-owned bodies.
pub trait RigidBodyAdapter3D<T> {
    fn position(&self, body: T) -> Vector3;
    fn set_position(&mut self, body: T, position: Vector3);
    fn velocity(&self, body: T) -> Vector3;
    fn set_velocity(&mut self, body: T, velocity: Vector3);
    /// Zero for static and kinematic bodies.
    fn inverse_mass(&self, body: T) -> f64;
    fn restitution(&self, body: T) -> f64;
    fn friction(&self, body: T) -> f64;
}

/// Sequential-impulse contact solver with Baumgarte-style position correction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactSolver3D {
    position_correction_percent: f64,
    position_correction_slop: f64,
}

impl Default for ContactSolver3D {
    fn default() -> Self {
        Self {
            position_correction_percent: DEFAULT_POSITION_CORRECTION_PERCENT,
            position_correction_slop: DEFAULT_POSITION_CORRECTION_SLOP,
        }
    }
}

impl ContactSolver3D {
    /// # Errors
    /// `InvalidArgument` unless `percent` is in `[0, 1]` and `slop >= 0`.
    pub fn new(position_correction_percent: f64, position_correction_slop: f64) -> Result<Self, PhysicsError> {
        ensure_finite(position_correction_percent, "position correction percent")?;
        ensure_finite(position_correction_slop, "position correction slop")?;
        if !(0.0..=1.0).contains(&position_correction_percent) {
            return Err(PhysicsError::invalid_argument("position correction percent must be in [0,1]"));
        }
        if position_correction_slop < 0.0 {
            return Err(PhysicsError::invalid_argument("position correction slop must be >= 0"));
        }
        Ok(Self { position_correction_percent, position_correction_slop })
    }

    pub fn position_correction_percent(&self) -> f64 {
        self.position_correction_percent
    }

    pub fn position_correction_slop(&self) -> f64 {
        self.position_correction_slop
    }

    /// Pushes the bodies apart along the normal by the penetration beyond the slop,
    /// split by inverse mass.
    pub fn solve_position<T: Copy>(
        &self,
        bodies: &mut dyn RigidBodyAdapter3D<T>,
        a: T,
        b: T,
        contact: &ContactManifold3D,
    ) {
        let Some((inv_a, inv_b, inv_sum)) = inverse_masses(bodies, a, b) else {
            return;
        };
        let magnitude = (contact.penetration_depth() - self.position_correction_slop).max(0.0)
            * self.position_correction_percent
            / inv_sum;
        if magnitude <= 0.0 {
            return;
        }
        let correction = scale_vector(contact.normal(), magnitude);
        let pa = bodies.position(a);
        let pb = bodies.position(b);
        bodies.set_position(a, add_scaled(pa, correction, -inv_a));
        bodies.set_position(b, add_scaled(pb, correction, inv_b));
    }

    /// Re-applies last frame's accumulated impulses before the first velocity pass.
    pub fn apply_warm_start<T: Copy>(
        &self,
        bodies: &mut dyn RigidBodyAdapter3D<T>,
        a: T,
        b: T,
        contact: &ContactManifold3D,
        warm_start: WarmStartImpulse,
    ) {
        if warm_start.normal_impulse == 0.0 && warm_start.tangent_impulse == 0.0 {
            return;
        }
        let Some((inv_a, inv_b, _)) = inverse_masses(bodies, a, b) else {
            return;
        };
        let normal = contact.normal();
        let va = bodies.velocity(a);
        let vb = bodies.velocity(b);
        let tangent = tangent_direction(subtract_vectors(vb, va), normal);
        let impulse = add_scaled(scale_vector(normal, warm_start.normal_impulse), tangent, warm_start.tangent_impulse);
        bodies.set_velocity(a, add_scaled(va, impulse, -inv_a));
        bodies.set_velocity(b, add_scaled(vb, impulse, inv_b));
    }

    /// One sequential-impulse pass for the contact.
    ///
    /// `accumulated` holds the impulses already applied this step; the returned value is
    /// the new total, with the normal impulse kept non-negative and the tangent impulse
    /// inside the Coulomb cone `|jt| <= mu * jn`.
    pub fn solve_velocity<T: Copy>(
        &self,
        bodies: &mut dyn RigidBodyAdapter3D<T>,
        a: T,
        b: T,
        contact: &ContactManifold3D,
        accumulated: WarmStartImpulse,
    ) -> WarmStartImpulse {
        let Some((inv_a, inv_b, inv_sum)) = inverse_masses(bodies, a, b) else {
            return WarmStartImpulse::ZERO;
        };
        let normal = contact.normal();
        let mut va = bodies.velocity(a);
        let mut vb = bodies.velocity(b);

        let velocity_along_normal = dot_product(subtract_vectors(vb, va), normal);
        if velocity_along_normal > 0.0 {
            return accumulated;
        }

        let restitution = bodies.restitution(a).clamp(0.0, 1.0).min(bodies.restitution(b).clamp(0.0, 1.0));
        let j = -(1.0 + restitution) * velocity_along_normal / inv_sum;
        let normal_total = (accumulated.normal_impulse + j).max(0.0);
        let normal_delta = normal_total - accumulated.normal_impulse;
        va = add_scaled(va, normal, -normal_delta * inv_a);
        vb = add_scaled(vb, normal, normal_delta * inv_b);

        let relative = subtract_vectors(vb, va);
        let tangent = tangent_direction(relative, normal);
        let jt = -dot_product(relative, tangent) / inv_sum;
        // an infinite coefficient means no slip; keep it finite so 0 * mu stays 0
        let mu = (bodies.friction(a).max(0.0) * bodies.friction(b).max(0.0)).sqrt().min(f64::MAX);
        let max_friction = normal_total * mu;
        let tangent_total = (accumulated.tangent_impulse + jt).clamp(-max_friction, max_friction);
        let tangent_delta = tangent_total - accumulated.tangent_impulse;
        if tangent_delta.abs() > IMPULSE_EPSILON {
            va = add_scaled(va, tangent, -tangent_delta * inv_a);
            vb = add_scaled(vb, tangent, tangent_delta * inv_b);
        }

        bodies.set_velocity(a, va);
        bodies.set_velocity(b, vb);
        WarmStartImpulse { normal_impulse: normal_total, tangent_impulse: tangent_total }
    }
}

fn inverse_masses<T: Copy>(bodies: &dyn RigidBodyAdapter3D<T>, a: T, b: T) -> Option<(f64, f64, f64)> {
    let inv_a = bodies.inverse_mass(a).max(0.0);
    let inv_b = bodies.inverse_mass(b).max(0.0);
    let inv_sum = inv_a + inv_b;
    if inv_sum > 0.0 && inv_sum.is_finite() {
        Some((inv_a, inv_b, inv_sum))
    } else {
        None
    }
}

/// Unit tangential component of the relative velocity, or any perpendicular of the normal.
fn tangent_direction(relative_velocity: Vector3, normal: Vector3) -> Vector3 {
    let along = dot_product(relative_velocity, normal);
    let tangential = add_scaled(relative_velocity, normal, -along);
    let fallback = perpendicular_vector(normal);
    normalize_or(tangential, fallback, TANGENT_EPSILON)
}

use crate::utils::{ensure_finite, ensure_finite_vector, vector_magnitude, PhysicsError, Vector3};

const NORMAL_TOLERANCE: f64 = 1e-6;

/// A single finite point of contact in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactPoint3D {
    pub position: Vector3,
}

impl ContactPoint3D {
    pub fn new(position: Vector3) -> Result<Self, PhysicsError> {
        ensure_finite_vector(position, "contact point")?;
        Ok(Self { position })
    }
}

/// Unit normal from body A toward body B and a non-negative penetration depth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionManifold3D {
    normal: Vector3,
    penetration_depth: f64,
}

impl CollisionManifold3D {
    pub fn new(normal: Vector3, penetration_depth: f64) -> Result<Self, PhysicsError> {
        ensure_finite_vector(normal, "manifold normal")?;
        ensure_finite(penetration_depth, "penetration depth")?;
        if (vector_magnitude(normal) - 1.0).abs() > NORMAL_TOLERANCE {
            return Err(PhysicsError::invalid_argument(format!("manifold normal must be unit length, got {:?}", normal)));
        }
        if penetration_depth < 0.0 {
            return Err(PhysicsError::invalid_argument(format!(
                "penetration depth must be non-negative, got {}", penetration_depth
            )));
        }
        Ok(Self { normal, penetration_depth })
    }

    pub fn normal(&self) -> Vector3 {
        self.normal
    }

    pub fn penetration_depth(&self) -> f64 {
        self.penetration_depth
    }
}

/// A collision manifold with one or more contact points.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactManifold3D {
    manifold: CollisionManifold3D,
    contacts: Vec<ContactPoint3D>,
}

impl ContactManifold3D {
    pub fn new(manifold: CollisionManifold3D, contacts: Vec<ContactPoint3D>) -> Result<Self, PhysicsError> {
        if contacts.is_empty() {
            return Err(PhysicsError::invalid_argument("contact manifold requires at least one contact point"));
        }
        Ok(Self { manifold, contacts })
    }

    pub fn manifold(&self) -> &CollisionManifold3D {
        &self.manifold
    }

    pub fn normal(&self) -> Vector3 {
        self.manifold.normal()
    }

    pub fn penetration_depth(&self) -> f64 {
        self.manifold.penetration_depth()
    }

    pub fn contacts(&self) -> &[ContactPoint3D] {
        &self.contacts
    }
}

/// Accumulated solver impulses carried between frames.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WarmStartImpulse {
    pub normal_impulse: f64,
    pub tangent_impulse: f64,
}

impl WarmStartImpulse {
    pub const ZERO: WarmStartImpulse = WarmStartImpulse { normal_impulse: 0.0, tangent_impulse: 0.0 };

    pub fn new(normal_impulse: f64, tangent_impulse: f64) -> Result<Self, PhysicsError> {
        ensure_finite(normal_impulse, "normal impulse")?;
        ensure_finite(tangent_impulse, "tangent impulse")?;
        Ok(Self { normal_impulse, tangent_impulse })
    }
}

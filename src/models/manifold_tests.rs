use crate::models::*;

#[test]
fn test_collision_pair_is_canonical() {
    let ab = CollisionPair::new(2u32, 1u32).unwrap();
    let ba = CollisionPair::new(1u32, 2u32).unwrap();
    assert_eq!(ab, ba, "Pairs should compare equal regardless of argument order");
    assert_eq!(ab.first(), 1);
    assert_eq!(ab.second(), 2);
    assert_eq!(ab.other(1), Some(2));
    assert_eq!(ab.other(7), None);
    assert!(CollisionPair::new(3u32, 3u32).is_none(), "An item cannot pair with itself");
}

#[test]
fn test_manifold_validation() {
    assert!(CollisionManifold3D::new((1.0, 0.0, 0.0), 0.2).is_ok());
    assert!(CollisionManifold3D::new((2.0, 0.0, 0.0), 0.2).is_err(), "Normal must be unit length");
    assert!(CollisionManifold3D::new((1.0, 0.0, 0.0), -0.1).is_err(), "Depth must be non-negative");
    assert!(ContactPoint3D::new((f64::NAN, 0.0, 0.0)).is_err());

    let manifold = CollisionManifold3D::new((0.0, 1.0, 0.0), 0.0).unwrap();
    assert!(ContactManifold3D::new(manifold, Vec::new()).is_err(), "At least one contact point is required");
}

#[test]
fn test_warm_start_zero() {
    assert_eq!(WarmStartImpulse::default(), WarmStartImpulse::ZERO);
    assert!(WarmStartImpulse::new(f64::INFINITY, 0.0).is_err());
}

use crate::interactions::*;
use crate::models::{Aabb, BoundingSphere};
use crate::assert_float_eq;

#[test]
fn test_segment_aabb_toi_hits_at_expected_fraction() {
    let aabb = Aabb::from_bounds([5.0, -1.0, -1.0, 6.0, 1.0, 1.0]).unwrap();
    let toi = segment_aabb_toi((0.0, 0.0, 0.0), (10.0, 0.0, 0.0), &aabb).expect("segment should hit");
    assert_float_eq(toi, 0.5, 1e-9, None);
}

#[test]
fn test_segment_aabb_toi_misses() {
    let aabb = Aabb::from_bounds([5.0, 5.0, 5.0, 6.0, 6.0, 6.0]).unwrap();
    assert!(segment_aabb_toi((0.0, 0.0, 0.0), (10.0, 0.0, 0.0), &aabb).is_none());
    let short = Aabb::from_bounds([5.0, -1.0, -1.0, 6.0, 1.0, 1.0]).unwrap();
    assert!(segment_aabb_toi((0.0, 0.0, 0.0), (1.0, 0.0, 0.0), &short).is_none(), "segment ends before the box");
}

#[test]
fn test_segment_starting_inside_reports_zero() {
    let aabb = Aabb::from_bounds([-1.0, -1.0, -1.0, 1.0, 1.0, 1.0]).unwrap();
    assert_eq!(segment_aabb_toi((0.0, 0.0, 0.0), (5.0, 0.0, 0.0), &aabb), Some(0.0));
}

#[test]
fn test_swept_aabb_toi_matches_expected_contact() {
    let moving = Aabb::from_bounds([0.0, 0.0, 0.0, 1.0, 1.0, 1.0]).unwrap();
    let target = Aabb::from_bounds([5.0, 0.0, 0.0, 6.0, 1.0, 1.0]).unwrap();
    let toi = swept_aabb_toi(&moving, (10.0, 0.0, 0.0), &target).expect("sweep should hit");
    assert_float_eq(toi, 0.4, 1e-9, None);
}

#[test]
fn test_swept_aabb_toi_is_zero_when_starting_overlapped() {
    let moving = Aabb::from_bounds([0.0, 0.0, 0.0, 2.0, 2.0, 2.0]).unwrap();
    let target = Aabb::from_bounds([1.0, 1.0, 1.0, 3.0, 3.0, 3.0]).unwrap();
    assert_eq!(swept_aabb_toi(&moving, (5.0, 0.0, 0.0), &target), Some(0.0));
}

#[test]
fn test_swept_convex_toi_detects_collision() {
    let a = Aabb::from_bounds([0.0, 0.0, 0.0, 1.0, 1.0, 1.0]).unwrap();
    let b = Aabb::from_bounds([3.0, 0.0, 0.0, 4.0, 1.0, 1.0]).unwrap();
    let toi = swept_convex_toi(&a, (4.0, 0.0, 0.0), &b, (0.0, 0.0, 0.0), 64, 24).expect("boxes should meet");
    assert_float_eq(toi, 0.5, 0.02, None);
}

#[test]
fn test_swept_convex_toi_both_moving() {
    let a = Aabb::from_bounds([0.0, 0.0, 0.0, 1.0, 1.0, 1.0]).unwrap();
    let b = Aabb::from_bounds([5.0, 0.0, 0.0, 6.0, 1.0, 1.0]).unwrap();
    let toi = swept_convex_toi(&a, (4.0, 0.0, 0.0), &b, (-4.0, 0.0, 0.0), 32, 24).expect("boxes should meet");
    assert_float_eq(toi, 0.5, 1e-6, Some("gap of 4 closed at relative speed 8"));
}

#[test]
fn test_swept_convex_toi_spheres_off_axis() {
    let a = BoundingSphere::new((0.0, 0.0, 0.0), 1.0).unwrap();
    let b = BoundingSphere::new((5.0, 0.5, 0.0), 1.0).unwrap();
    let toi = ConservativeAdvancement::default()
        .time_of_impact(&a, (10.0, 0.0, 0.0), &b, (0.0, 0.0, 0.0))
        .expect("spheres should meet");
    let expected = (5.0 - 3.75_f64.sqrt()) / 10.0;
    assert_float_eq(toi, expected, 1e-4, None);
}

#[test]
fn test_swept_convex_toi_returns_none_when_no_hit() {
    let a = Aabb::from_bounds([0.0, 0.0, 0.0, 1.0, 1.0, 1.0]).unwrap();
    let b = Aabb::from_bounds([10.0, 0.0, 0.0, 11.0, 1.0, 1.0]).unwrap();
    assert!(ConservativeAdvancement::default().time_of_impact(&a, (1.0, 0.0, 0.0), &b, (0.0, 0.0, 0.0)).is_none());

    let beside = Aabb::from_bounds([0.0, 3.0, 0.0, 1.0, 4.0, 1.0]).unwrap();
    assert!(
        ConservativeAdvancement::default().time_of_impact(&a, (10.0, 0.0, 0.0), &beside, (10.0, 0.0, 0.0)).is_none(),
        "parallel motion never closes the gap"
    );
}

#[test]
fn test_swept_convex_toi_is_zero_for_initial_overlap() {
    let a = Aabb::from_bounds([0.0, 0.0, 0.0, 2.0, 2.0, 2.0]).unwrap();
    let b = Aabb::from_bounds([1.0, 1.0, 1.0, 3.0, 3.0, 3.0]).unwrap();
    assert_eq!(swept_convex_toi(&a, (5.0, 0.0, 0.0), &b, (0.0, 0.0, 0.0), 32, 24), Some(0.0));
}

#[test]
fn test_conservative_advancement_clamps_budgets() {
    let tiny = ConservativeAdvancement::new(0, 0);
    assert_eq!(tiny.max_iterations(), 4);
    assert_eq!(tiny.max_substeps(), 1);
    let huge = ConservativeAdvancement::new(10_000, 10_000);
    assert_eq!(huge.max_iterations(), 256);
    assert_eq!(huge.max_substeps(), 1024);
    assert!(ConservativeAdvancement::default().with_tolerance(0.0).is_err());
    assert!(ConservativeAdvancement::default().with_tolerance(1e-3).is_ok());
}

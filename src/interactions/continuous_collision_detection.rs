use log::trace;

use crate::interactions::Gjk3D;
use crate::models::{Aabb, ConvexSupport3D, Translated};
use crate::utils::{component, dot_product, ensure_finite, scale_vector, subtract_vectors, PhysicsError, Vector3};

//==============================================================================
// CONSTANTS
//==============================================================================

pub const DEFAULT_CCD_MAX_ITERATIONS: usize = 32;
pub const DEFAULT_CCD_MAX_SUBSTEPS: usize = 24;
pub const DEFAULT_CCD_TOLERANCE: f64 = 1e-6;

const CCD_ITERATION_RANGE: (usize, usize) = (4, 256);
const CCD_SUBSTEP_RANGE: (usize, usize) = (1, 1024);

/// Closing speeds at or below this never bring the shapes together
const MIN_CLOSING_SPEED: f64 = 1e-12;

//==============================================================================
// SEGMENT AND SWEPT AABB
//==============================================================================

/// Entry fraction in `[0, 1]` of the segment `start -> end` into the box.
///
/// # Returns
/// `Some(0.0)` when `start` is inside the box, `None` when the segment misses.
pub fn segment_aabb_toi(start: Vector3, end: Vector3, aabb: &Aabb) -> Option<f64> {
    let direction = subtract_vectors(end, start);
    let mut t_min = 0.0_f64;
    let mut t_max = 1.0_f64;

    for axis in 0..3 {
        let (next_min, next_max) = clip_axis(
            component(start, axis),
            component(direction, axis),
            component(aabb.min(), axis),
            component(aabb.max(), axis),
            t_min,
            t_max,
        )?;
        t_min = next_min;
        t_max = next_max;
    }
    Some(t_min)
}

/// Clips the parametric interval against one slab; `None` when it becomes empty.
fn clip_axis(origin: f64, direction: f64, min: f64, max: f64, t_min: f64, t_max: f64) -> Option<(f64, f64)> {
    if direction == 0.0 {
        return if origin < min || origin > max { None } else { Some((t_min, t_max)) };
    }
    let inv = 1.0 / direction;
    let mut t0 = (min - origin) * inv;
    let mut t1 = (max - origin) * inv;
    if t0 > t1 {
        std::mem::swap(&mut t0, &mut t1);
    }
    let next_min = t_min.max(t0);
    let next_max = t_max.min(t1);
    if next_max < next_min {
        None
    } else {
        Some((next_min, next_max))
    }
}

/// Time of impact of `moving` translated by `delta` against a static `target`.
///
/// The target is grown by the mover's half sizes and the mover's center is traced as a
/// segment, so a box that starts overlapping reports `Some(0.0)`.
pub fn swept_aabb_toi(moving: &Aabb, delta: Vector3, target: &Aabb) -> Option<f64> {
    if moving.intersects(target) {
        return Some(0.0);
    }
    let expanded = target.expanded_by(moving.half_extents());
    let start = moving.center();
    let end = (start.0 + delta.0, start.1 + delta.1, start.2 + delta.2);
    segment_aabb_toi(start, end, &expanded)
}

//==============================================================================
// CONSERVATIVE ADVANCEMENT
//==============================================================================

/// Swept convex-vs-convex time of impact by conservative advancement.
///
/// Each substep queries the GJK distance between the shapes at the current time and
/// advances by `distance / closing_speed`, which can never step past first contact for
/// translating shapes. Budgets are clamped rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConservativeAdvancement {
    max_iterations: usize,
    max_substeps: usize,
    tolerance: f64,
}

impl Default for ConservativeAdvancement {
    fn default() -> Self {
        Self::new(DEFAULT_CCD_MAX_ITERATIONS, DEFAULT_CCD_MAX_SUBSTEPS)
    }
}

impl ConservativeAdvancement {
    /// `max_iterations` bounds each GJK query (clamped to 4..=256), `max_substeps` bounds the
    /// number of advancement steps (clamped to 1..=1024).
    pub fn new(max_iterations: usize, max_substeps: usize) -> Self {
        Self {
            max_iterations: max_iterations.clamp(CCD_ITERATION_RANGE.0, CCD_ITERATION_RANGE.1),
            max_substeps: max_substeps.clamp(CCD_SUBSTEP_RANGE.0, CCD_SUBSTEP_RANGE.1),
            tolerance: DEFAULT_CCD_TOLERANCE,
        }
    }

    /// # Errors
    /// `InvalidArgument` unless `tolerance` is finite and > 0.
    pub fn with_tolerance(mut self, tolerance: f64) -> Result<Self, PhysicsError> {
        ensure_finite(tolerance, "ccd tolerance")?;
        if tolerance <= 0.0 {
            return Err(PhysicsError::invalid_argument(format!("ccd tolerance must be > 0, got {}", tolerance)));
        }
        self.tolerance = tolerance;
        Ok(self)
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn max_substeps(&self) -> usize {
        self.max_substeps
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// First time in `[0, 1]` at which `a` moved by `delta_a` touches `b` moved by `delta_b`.
    ///
    /// # Returns
    /// `Some(0.0)` for shapes overlapping at the start, `None` when they never meet or the
    /// substep budget runs out first.
    pub fn time_of_impact<A, B>(&self, a: &A, delta_a: Vector3, b: &B, delta_b: Vector3) -> Option<f64>
    where
        A: ConvexSupport3D + ?Sized,
        B: ConvexSupport3D + ?Sized,
    {
        let gjk = Gjk3D::with_clamped_iterations(self.max_iterations);
        if gjk.intersects(a, b) {
            return Some(0.0);
        }

        // motion of A relative to B
        let relative = subtract_vectors(delta_a, delta_b);
        let mut t = 0.0_f64;
        for substep in 0..self.max_substeps {
            let moved_a = Translated::new(a, scale_vector(delta_a, t));
            let moved_b = Translated::new(b, scale_vector(delta_b, t));
            let Some(separation) = gjk.distance(&moved_a, &moved_b) else {
                return Some(t);
            };
            if separation.distance <= self.tolerance {
                return Some(t);
            }

            let closing_speed = dot_product(relative, separation.normal);
            if closing_speed <= MIN_CLOSING_SPEED {
                return None;
            }

            t += separation.distance / closing_speed;
            if t > 1.0 {
                return None;
            }
            trace!("conservative advancement substep {}: gap {:.3e}, t {:.6}", substep, separation.distance, t);
        }
        None
    }
}

/// Convenience wrapper over [`ConservativeAdvancement`] with explicit budgets.
pub fn swept_convex_toi<A, B>(
    a: &A,
    delta_a: Vector3,
    b: &B,
    delta_b: Vector3,
    max_iterations: usize,
    max_substeps: usize,
) -> Option<f64>
where
    A: ConvexSupport3D + ?Sized,
    B: ConvexSupport3D + ?Sized,
{
    ConservativeAdvancement::new(max_iterations, max_substeps).time_of_impact(a, delta_a, b, delta_b)
}

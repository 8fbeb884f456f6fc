//! Named reference frames and the explicit transforms between them.
//!
//! Every frame is related to the inertial base frame EME2000. World, local ENU and
//! unspecified states are treated as already expressed in that base frame.

use std::f64::consts::TAU;

use crate::backends::PhysicsBodyState;
use crate::models::Quaternion;
use crate::utils::{cross_product, ensure_finite, subtract_vectors, PhysicsError, Vector3};

/// Milliarcseconds to radians.
const MAS_TO_RAD: f64 = std::f64::consts::PI / (180.0 * 3600.0 * 1000.0);

/// IERS frame-bias offsets between ICRF and the J2000 dynamical frame.
const ICRF_BIAS_ETA0_MAS: f64 = -6.8192;
const ICRF_BIAS_XI0_MAS: f64 = -16.6170;
const ICRF_BIAS_DALPHA0_MAS: f64 = -14.6;

/// Earth rotation angle at the J2000 epoch, in turns.
const ERA_AT_EPOCH_TURNS: f64 = 0.779_057_273_264_0;
/// Earth rotation angle rate, in turns per UT1 day.
const ERA_RATE_TURNS_PER_DAY: f64 = 1.002_737_811_911_354_48;
const SECONDS_PER_DAY: f64 = 86_400.0;
/// Nominal Earth rotation rate in rad/s.
pub const EARTH_ROTATION_RATE: f64 = 7.292_115_146_706_979e-5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum ReferenceFrame {
    #[default]
    World,
    LocalEnu,
    Unspecified,
    Icrf,
    Eme2000,
    Ecef,
}

impl ReferenceFrame {
    /// Frames that share the inertial base frame's axes.
    pub fn is_base_alias(&self) -> bool {
        matches!(
            self,
            ReferenceFrame::World | ReferenceFrame::LocalEnu | ReferenceFrame::Unspecified | ReferenceFrame::Eme2000
        )
    }

    pub fn is_rotating(&self) -> bool {
        matches!(self, ReferenceFrame::Ecef)
    }
}

/// Rotation from a frame into the base frame, plus the frame's angular velocity.
struct FrameRotation {
    to_base: Quaternion,
    omega: Vector3,
}

impl FrameRotation {
    fn of(frame: ReferenceFrame, epoch_seconds: f64) -> Self {
        match frame {
            ReferenceFrame::Icrf => Self { to_base: icrf_bias(), omega: (0.0, 0.0, 0.0) },
            ReferenceFrame::Ecef => Self {
                to_base: Quaternion::from_axis_angle((0.0, 0.0, 1.0), earth_rotation_angle(epoch_seconds)),
                omega: (0.0, 0.0, EARTH_ROTATION_RATE),
            },
            _ => Self { to_base: Quaternion::identity(), omega: (0.0, 0.0, 0.0) },
        }
    }

    fn into_base(&self, state: &PhysicsBodyState) -> PhysicsBodyState {
        let q = self.to_base;
        let transport = cross_product(self.omega, state.position);
        let relative_velocity = (
            state.linear_velocity.0 + transport.0,
            state.linear_velocity.1 + transport.1,
            state.linear_velocity.2 + transport.2,
        );
        let spin = q.rotate_point(state.angular_velocity);
        PhysicsBodyState {
            position: q.rotate_point(state.position),
            orientation: q.multiply(&state.orientation).normalized(),
            linear_velocity: q.rotate_point(relative_velocity),
            angular_velocity: (spin.0 + self.omega.0, spin.1 + self.omega.1, spin.2 + self.omega.2),
            ..*state
        }
    }

    fn out_of_base(&self, state: &PhysicsBodyState) -> PhysicsBodyState {
        let q = self.to_base.inverse();
        let position = q.rotate_point(state.position);
        let velocity = subtract_vectors(q.rotate_point(state.linear_velocity), cross_product(self.omega, position));
        PhysicsBodyState {
            position,
            orientation: q.multiply(&state.orientation).normalized(),
            linear_velocity: velocity,
            angular_velocity: q.rotate_point(subtract_vectors(state.angular_velocity, self.omega)),
            ..*state
        }
    }
}

/// Constant frame-bias rotation taking ICRF vectors into EME2000.
fn icrf_bias() -> Quaternion {
    let rotation_vector = (
        ICRF_BIAS_ETA0_MAS * MAS_TO_RAD,
        -ICRF_BIAS_XI0_MAS * MAS_TO_RAD,
        -ICRF_BIAS_DALPHA0_MAS * MAS_TO_RAD,
    );
    let angle = (rotation_vector.0 * rotation_vector.0
        + rotation_vector.1 * rotation_vector.1
        + rotation_vector.2 * rotation_vector.2)
        .sqrt();
    Quaternion::from_axis_angle(rotation_vector, angle)
}

/// Earth rotation angle in radians, `epoch_seconds` counted from J2000.
pub fn earth_rotation_angle(epoch_seconds: f64) -> f64 {
    let turns = ERA_AT_EPOCH_TURNS + ERA_RATE_TURNS_PER_DAY * epoch_seconds / SECONDS_PER_DAY;
    TAU * turns.rem_euclid(1.0)
}

/// Re-expresses body states between named frames at an explicit epoch.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceFrameBridge;

impl ReferenceFrameBridge {
    /// Transforms `state` into `target`. Position, velocity, orientation and angular
    /// velocity are all rotated; rotating frames add the transport term `omega x r`.
    ///
    /// # Errors
    /// `InvalidArgument` if `epoch_seconds` is not finite.
    pub fn transform(
        state: &PhysicsBodyState,
        target: ReferenceFrame,
        epoch_seconds: f64,
    ) -> Result<PhysicsBodyState, PhysicsError> {
        ensure_finite(epoch_seconds, "epoch")?;
        let source = state.reference_frame;
        if source == target || (source.is_base_alias() && target.is_base_alias()) {
            return Ok(PhysicsBodyState { reference_frame: target, ..*state });
        }
        let base = FrameRotation::of(source, epoch_seconds).into_base(state);
        let transformed = FrameRotation::of(target, epoch_seconds).out_of_base(&base);
        Ok(PhysicsBodyState { reference_frame: target, ..transformed })
    }
}

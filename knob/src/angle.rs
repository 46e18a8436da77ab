//! Angle tracking: pointer coordinates to a continuous rotation.
//!
//! `atan2` reports angles in `(-π, π]`, so a cursor circling past the
//! negative x-axis jumps from `+179°` to `-179°` between two samples. The
//! tracker turns each pair of samples into a signed delta that keeps the
//! rotation direction continuous across that boundary.
//!
//! A single sample is assumed to cover less than half a turn of real motion.
//! Spins fast enough to skip more than `π` between two pointer events are
//! misread as rotation in the opposite direction.

#[cfg(test)]
#[path = "angle_test.rs"]
mod angle_test;

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use serde::{Deserialize, Serialize};

use crate::consts::FULL_TURN_DEGREES;

/// A point in client (CSS pixel) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Per-tick rotation telemetry.
///
/// `delta_*` is the signed displacement since the previous sample; `abs_*` is
/// the absolute pointer angle around the pivot (or, for value notifications,
/// the published knob radians).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AngleSample {
    pub delta_radians: f64,
    pub delta_degrees: f64,
    pub abs_radians: f64,
    pub abs_degrees: f64,
}

impl AngleSample {
    /// Build a sample from radians, deriving the degree fields.
    #[must_use]
    pub fn new(delta_radians: f64, abs_radians: f64) -> Self {
        Self {
            delta_radians,
            delta_degrees: radians_to_degrees(delta_radians),
            abs_radians,
            abs_degrees: radians_to_degrees(abs_radians),
        }
    }
}

/// Angle of `cursor` around `pivot`, in `[-π, π]`.
#[must_use]
pub fn pointer_radians(pivot: Point, cursor: Point) -> f64 {
    (cursor.y - pivot.y).atan2(cursor.x - pivot.x)
}

/// Sample the pointer angle and return `(next_radians, delta_radians)`.
///
/// `previous_radians` is the angle returned by the previous call (or by
/// [`pointer_radians`] at gesture start).
#[must_use]
pub fn sample_angle(pivot: Point, previous_radians: f64, cursor: Point) -> (f64, f64) {
    let next_radians = pointer_radians(pivot, cursor);
    (next_radians, wrapped_delta(previous_radians, next_radians))
}

/// Signed rotation from `previous` to `next`, corrected across the `±π` seam.
///
/// The pair is "inverted" when the previous angle sits in the left half-plane
/// and the sign flips: the pointer crossed the negative x-axis rather than
/// passing through zero.
#[must_use]
pub fn wrapped_delta(previous: f64, next: f64) -> f64 {
    let inverted = previous.abs() > FRAC_PI_2 && sign(next) != sign(previous);
    if inverted {
        sign(previous) * (TAU - next.abs() - previous.abs())
    } else {
        next - previous
    }
}

/// Three-way sign: `-1`, `0` or `1`. Unlike `f64::signum`, zero maps to zero.
fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

#[must_use]
pub fn degrees_to_radians(degrees: f64) -> f64 {
    degrees / 180.0 * PI
}

#[must_use]
pub fn radians_to_degrees(radians: f64) -> f64 {
    radians / PI * 180.0
}

/// Wrap an angle into `[0, 360)`.
#[must_use]
pub fn normalize_degrees_360(deg: f64) -> f64 {
    deg.rem_euclid(FULL_TURN_DEGREES)
}

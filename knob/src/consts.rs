//! Shared numeric constants for the knob crate.

// ── Math ────────────────────────────────────────────────────────

/// One full turn in radians; the step normalization range of an infinite knob.
pub const FULL_TURN_RADIANS: f64 = std::f64::consts::TAU;

/// Degrees in one full turn.
pub const FULL_TURN_DEGREES: f64 = 360.0;

/// Smallest change in rendered radians that counts as a change. Value
/// changes use this fraction of the value range.
/// Smaller differences are float noise from the value/radian round trip.
pub const CHANGE_EPSILON: f64 = 1e-12;

// ── Option defaults ─────────────────────────────────────────────

/// Initial value when the caller supplies none.
pub const DEFAULT_VALUE: f64 = 0.5;

/// Lower end of the value range when the caller supplies none.
pub const DEFAULT_MIN_VALUE: f64 = 0.0;

/// Upper end of the value range when the caller supplies none.
pub const DEFAULT_MAX_VALUE: f64 = 1.0;

/// Visual offset added to every published angle, in degrees.
pub const DEFAULT_START_ANGLE_DEG: f64 = 0.0;

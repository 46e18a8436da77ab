//! Step quantization and clamping.
//!
//! Two quantizers exist because the two step options work in different
//! domains: `step_value` snaps the *value* of a finite knob, `step_angle_deg`
//! snaps the *angle* of an infinite one. Both round to the nearest step, but
//! they break ties differently (see each function).

#[cfg(test)]
#[path = "step_test.rs"]
mod step_test;

/// Clamp `x` into `[lo, hi]`. Infinite bounds leave `x` unconstrained.
///
/// Unlike `f64::clamp` this never panics; a NaN `x` comes back as `lo`.
#[must_use]
pub fn clamp(x: f64, lo: f64, hi: f64) -> f64 {
    hi.min(lo.max(x))
}

/// Snap `value` to the nearest multiple of `step`.
///
/// The upper candidate is capped at `max_value`, so when the range is not a
/// whole number of steps the last partial step lands on `max_value` instead
/// of overshooting it. An exact midpoint resolves upwards.
#[must_use]
pub fn quantize_value(value: f64, step: f64, max_value: f64) -> f64 {
    let low = value - value % step;
    let high = (low + step).min(max_value);
    if (value - low).abs() < (value - high).abs() { low } else { high }
}

/// Snap `radians` to the nearest multiple of `step`.
///
/// Moves to the upper multiple only once strictly past the midpoint, so the
/// knob holds its current step for the first half of the interval.
#[must_use]
pub fn quantize_radians(radians: f64, step: f64) -> f64 {
    let low = (radians / step).floor();
    let fraction = ((step + radians % step) % step) / step;
    if fraction > 0.5 { (low + 1.0) * step } else { low * step }
}

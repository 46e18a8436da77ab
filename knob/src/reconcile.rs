//! Controlled/uncontrolled reconciliation.
//!
//! A knob tracks two positions. The *internal* radians (the session
//! accumulator) drive the committed value from user gestures. The
//! *integrated* radians are what gets rendered. Without a controlled value
//! the two agree after every tick. With one, the rendered angle follows the
//! controlled value, and user rotation only reaches the screen once the owner
//! pushes the new value back.

#[cfg(test)]
#[path = "reconcile_test.rs"]
mod reconcile_test;

use serde::{Deserialize, Serialize};

use crate::config::{KnobConfig, KnobKind};
use crate::session::RotationStatus;
use crate::step::quantize_radians;

/// Engine-owned positions.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct KnobRuntimeState {
    /// Authoritative rotation position (the session accumulator).
    pub internal_radians: f64,
    /// Rendered rotation position.
    pub integrated_radians: f64,
    /// Last committed value, internal space, within `[min_value, max_value]`.
    pub committed_value: f64,
}

/// The stepped and clamped projection of an internal position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    /// Radians after stepping and clamping; always inside the legal wedge.
    pub radians: f64,
    /// Internal value matching `radians`.
    pub value: f64,
}

/// Step, then clamp, an accumulator position.
///
/// The accumulator itself may run past the bounds mid-gesture; only this
/// projection is ever published.
#[must_use]
pub fn project(config: &KnobConfig, internal_radians: f64) -> Projection {
    match (config.kind(), config.step_value(), config.step_radians()) {
        (KnobKind::Finite, Some(_), _) => {
            let value = config.settle_value(config.radians_to_value(internal_radians));
            Projection { radians: config.clamp_radians(config.value_to_radians(value)), value }
        }
        (KnobKind::Finite, None, _) => {
            let radians = config.clamp_radians(internal_radians);
            Projection { radians, value: config.clamp_value(config.radians_to_value(radians)) }
        }
        (KnobKind::Infinite, _, step) => {
            let radians = step.map_or(internal_radians, |s| quantize_radians(internal_radians, s));
            Projection { radians, value: config.min_value() }
        }
    }
}

/// What the host should render for a given internal position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderState {
    /// Stepped and clamped internal position.
    pub clamped_radians: f64,
    /// Committed value, internal space.
    pub committed_value: f64,
    /// Rendered position.
    pub integrated_radians: f64,
}

/// Reconcile the internal position with an optional controlled value.
///
/// `controlled` is in reported space. When it cannot be mapped to a finite
/// angle, `previous_integrated` is kept so NaN never reaches the renderer.
#[must_use]
pub fn reconcile(
    config: &KnobConfig,
    internal_radians: f64,
    previous_integrated: f64,
    controlled: Option<f64>,
) -> RenderState {
    let projection = project(config, internal_radians);
    let integrated_radians = match controlled {
        Some(value) => external_radians(config, value).unwrap_or(previous_integrated),
        None => projection.radians,
    };
    RenderState { clamped_radians: projection.radians, committed_value: projection.value, integrated_radians }
}

/// Angle an externally supplied value (reported space) maps to, clamped into
/// the legal wedge.
///
/// `None` for infinite knobs, which have no value mapping, and for NaN or
/// infinite values.
#[must_use]
pub fn external_radians(config: &KnobConfig, value: f64) -> Option<f64> {
    if config.is_infinite() || !value.is_finite() {
        return None;
    }
    let radians = config.value_to_radians(config.clamp_value(config.internal_value(value)));
    radians.is_finite().then_some(radians)
}

/// Whether an external value push may realign the accumulator now.
///
/// A controlled knob with a step value defers mid-gesture pushes until the
/// gesture settles to `Idle`; realigning then would restart the step interval
/// the user is dragging through. Uncontrolled pushes always move the knob.
#[must_use]
pub fn may_realign(config: &KnobConfig, status: RotationStatus) -> bool {
    !config.is_controlled() || config.step_value().is_none() || !status.in_gesture()
}

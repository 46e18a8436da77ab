//! Knob options, validation and the versioned configuration.
//!
//! [`KnobOptions`] is the sparse, caller-facing option set: every field is
//! optional and it deserializes from JSON. [`KnobConfig::new`] validates a set
//! of options into an immutable configuration with everything converted to
//! radians. [`KnobConfig::apply_patch`] merges a sparse patch into the options
//! a configuration was built from and re-runs the same validation, producing
//! the next version.
//!
//! Values the caller supplies (`default_value`, `value`) and values the knob
//! reports are in *reported* space: for a reversed knob they run from
//! `max_value` down to `min_value`. Everything stored here is in internal
//! space except those two options.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::angle::degrees_to_radians;
use crate::consts::{DEFAULT_MAX_VALUE, DEFAULT_MIN_VALUE, DEFAULT_START_ANGLE_DEG, DEFAULT_VALUE, FULL_TURN_RADIANS};
use crate::step::{clamp, quantize_value};

/// Error returned when options cannot form a valid knob.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `min_value` is not strictly below `max_value`.
    #[error("min_value ({min}) must be less than max_value ({max})")]
    InvalidValueRange { min: f64, max: f64 },
    /// Finite angle bounds with `min_angle_deg >= max_angle_deg`.
    #[error("min_angle_deg ({min}) must be less than max_angle_deg ({max})")]
    InvalidAngleRange { min: f64, max: f64 },
    /// Exactly one of the angle bounds is finite.
    #[error("min_angle_deg and max_angle_deg must both be finite or both be unbounded")]
    HalfBoundedAngle,
    /// A step option is zero or negative.
    #[error("{option} must be greater than 0, got {step}")]
    NonPositiveStep { option: &'static str, step: f64 },
    /// A numeric option is NaN, or infinite where only finite numbers make sense.
    #[error("{option} must be a finite number")]
    NonFinite { option: &'static str },
    /// Options JSON could not be parsed.
    #[error("invalid knob options: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Whether the knob maps onto a bounded value range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KnobKind {
    /// Bounded rotation mapped onto `[min_value, max_value]`.
    Finite,
    /// Unbounded rotation; reports angle data rather than a mapped value.
    Infinite,
}

/// An option that was supplied but ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigWarning {
    /// Value-related option on an infinite knob.
    IgnoredOnInfinite(&'static str),
    /// Angle-step option on a finite knob.
    IgnoredOnFinite(&'static str),
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IgnoredOnInfinite(option) => write!(f, "infinite knob does not support {option}; ignored"),
            Self::IgnoredOnFinite(option) => write!(f, "finite knob does not support {option}; ignored"),
        }
    }
}

/// Sparse knob options. Absent fields take their defaults (or, when used as a
/// patch, keep their previous value).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KnobOptions {
    /// Initial value (finite knob only). Defaults to `0.5`, clamped into range.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<f64>,
    /// Lower rotation bound in degrees. Absent means unbounded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_angle_deg: Option<f64>,
    /// Upper rotation bound in degrees. Absent means unbounded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_angle_deg: Option<f64>,
    /// Lower end of the value range. Defaults to `0`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,
    /// Upper end of the value range. Defaults to `1`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,
    /// Visual offset added to the published angle, in degrees.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_angle_deg: Option<f64>,
    /// Angle quantization in degrees (infinite knob only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_angle_deg: Option<f64>,
    /// Value quantization (finite knob only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_value: Option<f64>,
    /// Invert the reported value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_reversed: Option<bool>,
    /// Controlled value. Presence switches the knob to controlled mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

impl KnobOptions {
    /// Parse options from a JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON or unknown fields.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Overlay `patch` on these options; fields present in the patch win.
    #[must_use]
    pub fn merge(&self, patch: &KnobOptions) -> KnobOptions {
        KnobOptions {
            default_value: patch.default_value.or(self.default_value),
            min_angle_deg: patch.min_angle_deg.or(self.min_angle_deg),
            max_angle_deg: patch.max_angle_deg.or(self.max_angle_deg),
            min_value: patch.min_value.or(self.min_value),
            max_value: patch.max_value.or(self.max_value),
            start_angle_deg: patch.start_angle_deg.or(self.start_angle_deg),
            step_angle_deg: patch.step_angle_deg.or(self.step_angle_deg),
            step_value: patch.step_value.or(self.step_value),
            is_reversed: patch.is_reversed.or(self.is_reversed),
            value: patch.value.or(self.value),
        }
    }

    // --- Builders ---

    #[must_use]
    pub fn with_angle_range(mut self, min_deg: f64, max_deg: f64) -> Self {
        self.min_angle_deg = Some(min_deg);
        self.max_angle_deg = Some(max_deg);
        self
    }

    #[must_use]
    pub fn with_value_range(mut self, min: f64, max: f64) -> Self {
        self.min_value = Some(min);
        self.max_value = Some(max);
        self
    }

    #[must_use]
    pub fn with_default_value(mut self, value: f64) -> Self {
        self.default_value = Some(value);
        self
    }

    #[must_use]
    pub fn with_start_angle(mut self, deg: f64) -> Self {
        self.start_angle_deg = Some(deg);
        self
    }

    #[must_use]
    pub fn with_step_value(mut self, step: f64) -> Self {
        self.step_value = Some(step);
        self
    }

    #[must_use]
    pub fn with_step_angle(mut self, deg: f64) -> Self {
        self.step_angle_deg = Some(deg);
        self
    }

    #[must_use]
    pub fn reversed(mut self, is_reversed: bool) -> Self {
        self.is_reversed = Some(is_reversed);
        self
    }

    #[must_use]
    pub fn controlled(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }
}

/// Validated knob configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct KnobConfig {
    kind: KnobKind,
    min_radians: f64,
    max_radians: f64,
    min_value: f64,
    max_value: f64,
    start_radians: f64,
    step_value: Option<f64>,
    step_radians: Option<f64>,
    is_reversed: bool,
    default_value: f64,
    controlled: Option<f64>,
    version: u64,
    warnings: Vec<ConfigWarning>,
    options: KnobOptions,
}

impl KnobConfig {
    /// Validate `options` into the first version of a configuration.
    ///
    /// Options that do not apply to the knob's kind are logged and ignored.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for NaN or misplaced infinite numbers, an
    /// empty or inverted value range, inverted or half-bounded angle bounds,
    /// and non-positive steps.
    pub fn new(options: KnobOptions) -> Result<Self, ConfigError> {
        Self::build(options, 1)
    }

    /// Merge `patch` into the options this configuration was built from and
    /// validate the result as the next version.
    ///
    /// # Errors
    ///
    /// Same as [`KnobConfig::new`]; on error `self` is untouched.
    pub fn apply_patch(&self, patch: &KnobOptions) -> Result<Self, ConfigError> {
        Self::build(self.options.merge(patch), self.version + 1)
    }

    fn build(options: KnobOptions, version: u64) -> Result<Self, ConfigError> {
        check_numbers(&options)?;

        let min_angle = options.min_angle_deg.unwrap_or(f64::NEG_INFINITY);
        let max_angle = options.max_angle_deg.unwrap_or(f64::INFINITY);
        let kind = match (min_angle.is_finite(), max_angle.is_finite()) {
            (true, true) if min_angle >= max_angle => {
                return Err(ConfigError::InvalidAngleRange { min: min_angle, max: max_angle });
            }
            (true, true) => KnobKind::Finite,
            (false, false) => KnobKind::Infinite,
            _ => return Err(ConfigError::HalfBoundedAngle),
        };

        for (option, step) in [("step_value", options.step_value), ("step_angle_deg", options.step_angle_deg)] {
            if let Some(step) = step.filter(|s| *s <= 0.0) {
                return Err(ConfigError::NonPositiveStep { option, step });
            }
        }

        let start_radians = degrees_to_radians(options.start_angle_deg.unwrap_or(DEFAULT_START_ANGLE_DEG));
        let is_reversed = options.is_reversed.unwrap_or(false);
        let mut warnings = Vec::new();

        let config = match kind {
            KnobKind::Finite => {
                let min_value = options.min_value.unwrap_or(DEFAULT_MIN_VALUE);
                let max_value = options.max_value.unwrap_or(DEFAULT_MAX_VALUE);
                if min_value >= max_value {
                    return Err(ConfigError::InvalidValueRange { min: min_value, max: max_value });
                }
                if options.step_angle_deg.is_some() {
                    warnings.push(ConfigWarning::IgnoredOnFinite("step_angle_deg"));
                }
                let min_radians = degrees_to_radians(min_angle);
                let max_radians = degrees_to_radians(max_angle);

                Self {
                    kind,
                    min_radians,
                    max_radians,
                    min_value,
                    max_value,
                    start_radians,
                    step_value: options.step_value,
                    step_radians: options
                        .step_value
                        .map(|step| step / (max_value - min_value) * (max_radians - min_radians)),
                    is_reversed,
                    default_value: clamp(options.default_value.unwrap_or(DEFAULT_VALUE), min_value, max_value),
                    controlled: options.value,
                    version,
                    warnings,
                    options,
                }
            }
            KnobKind::Infinite => {
                for (option, present) in [
                    ("min_value", options.min_value.is_some()),
                    ("max_value", options.max_value.is_some()),
                    ("default_value", options.default_value.is_some()),
                    ("step_value", options.step_value.is_some()),
                    ("value", options.value.is_some()),
                ] {
                    if present {
                        warnings.push(ConfigWarning::IgnoredOnInfinite(option));
                    }
                }

                Self {
                    kind,
                    min_radians: f64::NEG_INFINITY,
                    max_radians: f64::INFINITY,
                    min_value: DEFAULT_MIN_VALUE,
                    max_value: DEFAULT_MAX_VALUE,
                    start_radians,
                    step_value: None,
                    step_radians: options.step_angle_deg.map(degrees_to_radians),
                    is_reversed,
                    default_value: DEFAULT_MIN_VALUE,
                    controlled: None,
                    version,
                    warnings,
                    options,
                }
            }
        };

        for warning in &config.warnings {
            warn!(%warning, version, "knob option ignored");
        }
        Ok(config)
    }

    // --- Accessors ---

    #[must_use]
    pub fn kind(&self) -> KnobKind {
        self.kind
    }

    #[must_use]
    pub fn is_infinite(&self) -> bool {
        self.kind == KnobKind::Infinite
    }

    #[must_use]
    pub fn min_radians(&self) -> f64 {
        self.min_radians
    }

    #[must_use]
    pub fn max_radians(&self) -> f64 {
        self.max_radians
    }

    #[must_use]
    pub fn min_value(&self) -> f64 {
        self.min_value
    }

    #[must_use]
    pub fn max_value(&self) -> f64 {
        self.max_value
    }

    #[must_use]
    pub fn start_radians(&self) -> f64 {
        self.start_radians
    }

    #[must_use]
    pub fn step_value(&self) -> Option<f64> {
        self.step_value
    }

    /// Step size in radians: derived from `step_value` on a finite knob,
    /// from `step_angle_deg` on an infinite one.
    #[must_use]
    pub fn step_radians(&self) -> Option<f64> {
        self.step_radians
    }

    #[must_use]
    pub fn is_reversed(&self) -> bool {
        self.is_reversed
    }

    /// Initial value in reported space, already clamped into range.
    #[must_use]
    pub fn default_value(&self) -> f64 {
        self.default_value
    }

    /// Controlled value supplied with the options, in reported space.
    #[must_use]
    pub fn controlled_value(&self) -> Option<f64> {
        self.controlled
    }

    #[must_use]
    pub fn is_controlled(&self) -> bool {
        self.controlled.is_some()
    }

    /// Configuration version; 1 for a fresh knob, bumped by every patch.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Options that were supplied but ignored.
    #[must_use]
    pub fn warnings(&self) -> &[ConfigWarning] {
        &self.warnings
    }

    /// The merged options this configuration was built from.
    #[must_use]
    pub fn options(&self) -> &KnobOptions {
        &self.options
    }

    // --- Mapping ---

    /// Width of the rotation range; one full turn for an infinite knob.
    #[must_use]
    pub fn range_radians(&self) -> f64 {
        match self.kind {
            KnobKind::Finite => self.max_radians - self.min_radians,
            KnobKind::Infinite => FULL_TURN_RADIANS,
        }
    }

    #[must_use]
    pub fn range_value(&self) -> f64 {
        self.max_value - self.min_value
    }

    /// Where `min_value` sits on the dial: the lower bound, or zero when
    /// there is none.
    fn origin_radians(&self) -> f64 {
        match self.kind {
            KnobKind::Finite => self.min_radians,
            KnobKind::Infinite => 0.0,
        }
    }

    /// Linear map from an internal value to radians.
    #[must_use]
    pub fn value_to_radians(&self, value: f64) -> f64 {
        self.origin_radians() + (value - self.min_value) / self.range_value() * self.range_radians()
    }

    /// Linear map from radians to an internal value, unclamped.
    ///
    /// An infinite knob has no value range and always maps to `min_value`.
    #[must_use]
    pub fn radians_to_value(&self, radians: f64) -> f64 {
        match self.kind {
            KnobKind::Finite => {
                self.min_value + (radians - self.min_radians) / self.range_radians() * self.range_value()
            }
            KnobKind::Infinite => self.min_value,
        }
    }

    /// Internal value → value reported to the caller. Only finite knobs
    /// reverse; an infinite knob has no range to mirror.
    #[must_use]
    pub fn report_value(&self, value: f64) -> f64 {
        if self.is_reversed && self.kind == KnobKind::Finite { self.max_value - (value - self.min_value) } else { value }
    }

    /// Caller-supplied value → internal value. Reversal is its own inverse.
    #[must_use]
    pub fn internal_value(&self, reported: f64) -> f64 {
        self.report_value(reported)
    }

    #[must_use]
    pub fn clamp_radians(&self, radians: f64) -> f64 {
        clamp(radians, self.min_radians, self.max_radians)
    }

    #[must_use]
    pub fn clamp_value(&self, value: f64) -> f64 {
        clamp(value, self.min_value, self.max_value)
    }

    /// Step (when configured) and clamp an internal value.
    #[must_use]
    pub fn settle_value(&self, value: f64) -> f64 {
        let stepped = match self.step_value {
            Some(step) => quantize_value(value, step, self.max_value),
            None => value,
        };
        self.clamp_value(stepped)
    }

    /// Internal value the knob starts at: the controlled value when present,
    /// otherwise the default, stepped and clamped.
    #[must_use]
    pub fn initial_value(&self) -> f64 {
        match self.kind {
            KnobKind::Finite => self.settle_value(self.internal_value(self.controlled.unwrap_or(self.default_value))),
            KnobKind::Infinite => self.min_value,
        }
    }

    /// Accumulator position matching [`Self::initial_value`].
    #[must_use]
    pub fn initial_radians(&self) -> f64 {
        match self.kind {
            KnobKind::Finite => self.value_to_radians(self.initial_value()),
            KnobKind::Infinite => 0.0,
        }
    }
}

/// Reject NaN anywhere, and infinities outside the angle bounds.
fn check_numbers(options: &KnobOptions) -> Result<(), ConfigError> {
    for (option, value) in [("min_angle_deg", options.min_angle_deg), ("max_angle_deg", options.max_angle_deg)] {
        if value.is_some_and(f64::is_nan) {
            return Err(ConfigError::NonFinite { option });
        }
    }
    for (option, value) in [
        ("default_value", options.default_value),
        ("min_value", options.min_value),
        ("max_value", options.max_value),
        ("start_angle_deg", options.start_angle_deg),
        ("step_angle_deg", options.step_angle_deg),
        ("step_value", options.step_value),
        ("value", options.value),
    ] {
        if value.is_some_and(|v| !v.is_finite()) {
            return Err(ConfigError::NonFinite { option });
        }
    }
    Ok(())
}

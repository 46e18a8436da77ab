//! Rotation-tracking and value-mapping engine for pointer-driven rotary knobs.
//!
//! The crate turns circular drags around a target element into an accumulated
//! angle, maps that angle onto a bounded (or unbounded) value, and reconciles
//! user rotation with an externally controlled value. Painting the knob is the
//! host's job: it forwards pointer events to a [`engine::Knob`] and reads back
//! the published angle, value and status.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`angle`] | Pointer-to-angle conversion and wraparound correction |
//! | [`session`] | Pointer lifecycle, accumulator and the status machine |
//! | [`config`] | Options, validation and the versioned [`config::KnobConfig`] |
//! | [`step`] | Step quantization and clamping |
//! | [`reconcile`] | Controlled/uncontrolled render reconciliation |
//! | [`engine`] | The [`engine::Knob`] runtime and testable [`engine::KnobEngine`] core |
//! | [`observer`] | Observer registration for value/delta/status notifications |
//! | [`host`] | Host boundary: pointer events, listeners, target geometry |
//! | [`cursor`] | Process-wide "grabbing" cursor overlay service |
//! | [`consts`] | Shared numeric constants and option defaults |
//! | `web` | DOM adapter (feature `web`) |

pub mod angle;
pub mod config;
pub mod consts;
pub mod cursor;
pub mod engine;
pub mod host;
pub mod observer;
pub mod reconcile;
pub mod session;
pub mod step;
#[cfg(feature = "web")]
pub mod web;

pub use angle::{AngleSample, Point};
pub use config::{ConfigError, ConfigWarning, KnobConfig, KnobKind, KnobOptions};
pub use engine::{Knob, KnobEngine, KnobEvent, KnobSnapshot};
pub use host::{EventSurface, PointerEvent, PointerKind, Rect, TargetGeometry};
pub use observer::{KnobObservers, ObserverQueue};
pub use session::RotationStatus;

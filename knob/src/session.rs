//! Rotation session: binds angle sampling to one target's pointer lifecycle.
//!
//! The session owns the unbounded rotation accumulator and the gesture status
//! machine:
//!
//! ```text
//! Idle --down(target)--> Begin --move(document)--> Rotating --up(document)--> End --tick--> Idle
//! ```
//!
//! `Down` is heard only on the target; `Move` and `Up` are heard on the
//! document so a drag keeps working after the pointer leaves the knob. `End`
//! is never a resting state: the host calls [`RotationSession::tick`] on its
//! next turn to settle back to `Idle`, which guarantees observers see `End`
//! and `Idle` as separate steps.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::angle::{AngleSample, Point, pointer_radians, sample_angle};
use crate::host::{EventSurface, Listener, PointerEvent, PointerKind, TargetGeometry};

/// Gesture status reported to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationStatus {
    /// No gesture in progress.
    #[default]
    Idle,
    /// Pointer pressed on the knob; emitted once per gesture.
    Begin,
    /// Pointer moved while pressed; emitted on every tick.
    Rotating,
    /// Pointer released; emitted once per gesture, then settles to `Idle`.
    End,
}

impl RotationStatus {
    /// Whether a gesture is underway (including the unsettled `End` step).
    #[must_use]
    pub fn in_gesture(self) -> bool {
        !matches!(self, Self::Idle)
    }
}

/// What a handled pointer event did to the session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionEvent {
    /// A gesture started. `settled` is true when a pending `End → Idle`
    /// transition was flushed first.
    Began { settled: bool },
    /// One rotation tick.
    Rotated(AngleSample),
    /// The gesture finished; `Idle` follows on the next tick.
    Ended,
}

/// Pivot and reference angle captured at pointer-down.
#[derive(Debug, Clone, Copy)]
struct Gesture {
    pivot: Point,
    reference_radians: f64,
}

/// The listeners a session registers while attached.
const SESSION_LISTENERS: [Listener; 3] = [
    Listener { surface: EventSurface::Target, kind: PointerKind::Down },
    Listener { surface: EventSurface::Document, kind: PointerKind::Move },
    Listener { surface: EventSurface::Document, kind: PointerKind::Up },
];

pub struct RotationSession {
    target: Option<Box<dyn TargetGeometry>>,
    listeners: Vec<Listener>,
    gesture: Option<Gesture>,
    accumulated_radians: f64,
    status: RotationStatus,
    last_sample: AngleSample,
    idle_pending: bool,
}

impl fmt::Debug for RotationSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RotationSession")
            .field("attached", &self.is_attached())
            .field("gesture", &self.gesture)
            .field("accumulated_radians", &self.accumulated_radians)
            .field("status", &self.status)
            .field("last_sample", &self.last_sample)
            .field("idle_pending", &self.idle_pending)
            .finish_non_exhaustive()
    }
}

impl RotationSession {
    /// Create a detached session whose accumulator starts at `initial_radians`.
    #[must_use]
    pub fn new(initial_radians: f64) -> Self {
        Self {
            target: None,
            listeners: Vec::new(),
            gesture: None,
            accumulated_radians: initial_radians,
            status: RotationStatus::Idle,
            last_sample: AngleSample::default(),
            idle_pending: false,
        }
    }

    // --- Attachment ---

    /// Start listening on `target`. An already attached target is detached
    /// first and returned.
    pub fn attach(&mut self, target: Box<dyn TargetGeometry>) -> Option<Box<dyn TargetGeometry>> {
        let previous = self.detach();
        self.target = Some(target);
        self.listeners.extend_from_slice(&SESSION_LISTENERS);
        debug!(listeners = self.listeners.len(), "rotation session attached");
        previous
    }

    /// Remove the session's listeners and hand the target back.
    ///
    /// Idempotent: a detached session returns `None`. An in-flight gesture is
    /// abandoned without an `End`. A pending `End → Idle` survives and is
    /// still delivered by [`Self::tick`].
    pub fn detach(&mut self) -> Option<Box<dyn TargetGeometry>> {
        let target = self.target.take()?;
        let removed = self.listeners.len();
        self.listeners.clear();
        if self.gesture.take().is_some() {
            debug!("gesture abandoned by detach");
            self.status = RotationStatus::Idle;
        }
        debug!(removed, idle_pending = self.idle_pending, "rotation session detached");
        Some(target)
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.target.is_some()
    }

    /// Listeners currently registered with the host.
    #[must_use]
    pub fn listeners(&self) -> &[Listener] {
        &self.listeners
    }

    // --- Events ---

    /// Route a host pointer event through the registered listeners.
    ///
    /// Returns `None` when no listener hears the event or the event does not
    /// apply in the current state.
    pub fn handle(&mut self, event: &PointerEvent) -> Option<SessionEvent> {
        if !self.listeners.iter().any(|l| l.hears(event)) {
            return None;
        }
        match event.kind {
            PointerKind::Down => self.begin(event.point),
            PointerKind::Move => self.rotate(event.point),
            PointerKind::Up => self.end(),
        }
    }

    fn begin(&mut self, point: Point) -> Option<SessionEvent> {
        if self.gesture.is_some() {
            return None;
        }
        let pivot = self.target.as_ref()?.bounding_rect().center();
        let settled = self.tick();
        self.gesture = Some(Gesture { pivot, reference_radians: pointer_radians(pivot, point) });
        self.status = RotationStatus::Begin;
        debug!(pivot_x = pivot.x, pivot_y = pivot.y, "gesture began");
        Some(SessionEvent::Began { settled })
    }

    fn rotate(&mut self, point: Point) -> Option<SessionEvent> {
        let gesture = self.gesture.as_mut()?;
        let (next, delta) = sample_angle(gesture.pivot, gesture.reference_radians, point);
        gesture.reference_radians = next;
        self.accumulated_radians += delta;
        self.last_sample = AngleSample::new(delta, next);
        self.status = RotationStatus::Rotating;
        trace!(delta, accumulated = self.accumulated_radians, "rotation tick");
        Some(SessionEvent::Rotated(self.last_sample))
    }

    fn end(&mut self) -> Option<SessionEvent> {
        self.gesture.take()?;
        self.status = RotationStatus::End;
        self.idle_pending = true;
        debug!(accumulated = self.accumulated_radians, "gesture ended");
        Some(SessionEvent::Ended)
    }

    /// Perform the deferred `End → Idle` transition. Returns whether it ran.
    pub fn tick(&mut self) -> bool {
        if !self.idle_pending {
            return false;
        }
        self.idle_pending = false;
        self.status = RotationStatus::Idle;
        true
    }

    // --- Accumulator ---

    #[must_use]
    pub fn accumulated_radians(&self) -> f64 {
        self.accumulated_radians
    }

    /// Overwrite the accumulator. Used by the engine to clamp at gesture end
    /// and to realign with an external value.
    pub fn reset_accumulator(&mut self, radians: f64) {
        self.accumulated_radians = radians;
    }

    // --- Queries ---

    #[must_use]
    pub fn status(&self) -> RotationStatus {
        self.status
    }

    #[must_use]
    pub fn last_sample(&self) -> AngleSample {
        self.last_sample
    }

    /// Whether the pointer is currently held down on this knob.
    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.gesture.is_some()
    }

    /// Whether an `End → Idle` transition is waiting for [`Self::tick`].
    #[must_use]
    pub fn idle_pending(&self) -> bool {
        self.idle_pending
    }

    /// Pivot of the active gesture.
    #[must_use]
    pub fn pivot(&self) -> Option<Point> {
        self.gesture.map(|g| g.pivot)
    }
}

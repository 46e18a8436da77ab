//! Knob engine: value semantics on top of the rotation session.
//!
//! [`KnobEngine`] is the host-independent core. It turns session events into
//! [`KnobEvent`]s, applies stepping, clamping and reversal, and reconciles
//! the accumulator with a controlled value. Every handler returns the events
//! it produced, in delivery order.
//!
//! [`Knob`] wraps the core with observer delivery and the cursor overlay, and
//! is what hosts normally hold.
//!
//! The published angle is the rendered radians plus `start_angle_deg`, in
//! degrees. For a finite knob over `0..270` starting at `225` with value
//! `0.3`, that is `225 + 270 × 0.3 = 306`.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use std::fmt;

use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::angle::{AngleSample, Point, normalize_degrees_360, radians_to_degrees};
use crate::config::{ConfigError, KnobConfig, KnobOptions};
use crate::consts::CHANGE_EPSILON;
use crate::cursor::{CursorOverlay, CursorStyle, GlobalCursorLayer};
use crate::host::{Listener, PointerEvent, TargetGeometry};
use crate::observer::KnobObservers;
use crate::reconcile::{KnobRuntimeState, external_radians, may_realign, reconcile};
use crate::session::{RotationSession, RotationStatus, SessionEvent};

/// Notifications returned from engine handlers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum KnobEvent {
    /// The reported value or the rendered angle changed.
    ValueChanged { value: f64, rotation: AngleSample },
    /// One raw rotation tick.
    DeltaChanged { rotation: AngleSample },
    /// The gesture status changed.
    StatusChanged { status: RotationStatus },
}

impl KnobEvent {
    fn status(status: RotationStatus) -> Self {
        Self::StatusChanged { status }
    }
}

/// Everything the render layer reads back after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct KnobSnapshot {
    /// Published angle in degrees, start offset included.
    pub angle: f64,
    /// `angle` normalized to `[0, 360)`.
    pub normalized_angle: f64,
    /// Rendered radians, without the start offset.
    pub radians: f64,
    /// Reported value.
    pub value: f64,
    pub status: RotationStatus,
    #[serde(flatten)]
    pub runtime: KnobRuntimeState,
}

/// Host-independent knob core.
#[derive(Debug)]
pub struct KnobEngine {
    config: KnobConfig,
    session: RotationSession,
    integrated_radians: f64,
    clamped_radians: f64,
    /// Internal space.
    committed_value: f64,
    /// Reported space.
    controlled: Option<f64>,
    /// Accumulator position waiting for the gesture to settle.
    deferred_realign: Option<f64>,
}

impl KnobEngine {
    /// Build a detached engine at the configuration's initial position.
    #[must_use]
    pub fn new(config: KnobConfig) -> Self {
        let initial = config.initial_radians();
        let controlled = config.controlled_value();
        let render = reconcile(&config, initial, initial, controlled);
        Self {
            session: RotationSession::new(initial),
            integrated_radians: render.integrated_radians,
            clamped_radians: render.clamped_radians,
            committed_value: render.committed_value,
            controlled,
            deferred_realign: None,
            config,
        }
    }

    /// Validate `patch` against the current options and build the next
    /// engine. The new engine is detached; the caller moves the target over.
    ///
    /// Unless the patch supplies `default_value` or `value`, the current
    /// reported value (or, between infinite knobs, the current angle) is
    /// carried over.
    ///
    /// # Errors
    ///
    /// Returns the [`ConfigError`] from validating the merged options.
    pub fn reconfigure(&self, patch: &KnobOptions) -> Result<Self, ConfigError> {
        let config = self.config.apply_patch(patch)?;
        let mut next = Self::new(config);
        if patch.default_value.is_none() && patch.value.is_none() {
            next.carry_over(self);
        }
        Ok(next)
    }

    fn carry_over(&mut self, previous: &Self) {
        match (previous.config.is_infinite(), self.config.is_infinite()) {
            (true, true) => self.session.reset_accumulator(previous.session.accumulated_radians()),
            (false, false) => {
                if self.config.is_controlled() {
                    self.controlled = previous.controlled.or(self.controlled);
                }
                let Some(radians) = external_radians(&self.config, previous.value()) else {
                    return;
                };
                self.session.reset_accumulator(radians);
            }
            _ => return,
        }
        if let Some(KnobEvent::ValueChanged { value, .. }) = self.refresh() {
            trace!(value, "value carried over");
        }
    }

    // --- Attachment ---

    /// Attach to `target`, detaching (and returning) any previous target.
    pub fn attach(&mut self, target: Box<dyn TargetGeometry>) -> Option<Box<dyn TargetGeometry>> {
        let previous = self.detach();
        if self.session.attach(target).is_some() {
            warn!("session held a target the engine did not know about");
        }
        previous
    }

    /// Remove all listeners and return the target. Idempotent.
    ///
    /// A gesture in flight is abandoned without `End`: the accumulator is
    /// clamped and any deferred realignment applied, but no events are
    /// emitted. After `End`, the `Idle` transition (and its realignment)
    /// stays pending for [`Self::tick`].
    pub fn detach(&mut self) -> Option<Box<dyn TargetGeometry>> {
        let abandoned = self.session.is_dragging();
        let target = self.session.detach()?;
        if abandoned {
            let raw = self.session.accumulated_radians();
            self.session.reset_accumulator(self.config.clamp_radians(raw));
        }
        if !self.session.idle_pending()
            && let Some(radians) = self.deferred_realign.take()
        {
            self.session.reset_accumulator(radians);
        }
        if self.refresh().is_some() {
            debug!(abandoned, "render state resynced on detach");
        }
        Some(target)
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.session.is_attached()
    }

    #[must_use]
    pub fn listeners(&self) -> &[Listener] {
        self.session.listeners()
    }

    // --- Events ---

    /// Feed one host pointer event through the session.
    pub fn dispatch(&mut self, event: &PointerEvent) -> Vec<KnobEvent> {
        let Some(outcome) = self.session.handle(event) else {
            return Vec::new();
        };
        let mut events = Vec::new();
        match outcome {
            SessionEvent::Began { settled } => {
                if settled {
                    self.settle(&mut events);
                }
                events.push(KnobEvent::status(RotationStatus::Begin));
            }
            SessionEvent::Rotated(sample) => {
                events.extend(self.refresh());
                events.push(KnobEvent::DeltaChanged { rotation: sample });
                events.push(KnobEvent::status(RotationStatus::Rotating));
            }
            SessionEvent::Ended => {
                let raw = self.session.accumulated_radians();
                self.session.reset_accumulator(self.config.clamp_radians(raw));
                events.extend(self.refresh());
                events.push(KnobEvent::status(RotationStatus::End));
            }
        }
        events
    }

    /// Deliver the deferred `End → Idle` transition, if one is pending.
    pub fn tick(&mut self) -> Vec<KnobEvent> {
        let mut events = Vec::new();
        if self.session.tick() {
            self.settle(&mut events);
        }
        events
    }

    fn settle(&mut self, events: &mut Vec<KnobEvent>) {
        events.push(KnobEvent::status(RotationStatus::Idle));
        if let Some(radians) = self.deferred_realign.take() {
            debug!(radians, "deferred realign applied");
            self.session.reset_accumulator(radians);
            events.extend(self.refresh());
        }
    }

    /// Push a value from outside, in reported space.
    ///
    /// On a controlled knob this is the owner handing back the authoritative
    /// value; otherwise it moves the knob directly. Either way the value is
    /// clamped and (on the accumulator side) stepped. Ignored with a warning
    /// on an infinite knob and for NaN or infinite values.
    pub fn set_value(&mut self, value: f64) -> Vec<KnobEvent> {
        if self.config.is_infinite() {
            warn!(value, "infinite knob has no value; set_value ignored");
            return Vec::new();
        }
        let Some(radians) = external_radians(&self.config, value) else {
            warn!(value, "non-finite value skipped");
            return Vec::new();
        };
        if self.config.is_controlled() {
            self.controlled = Some(value);
        }
        if may_realign(&self.config, self.session.status()) {
            self.deferred_realign = None;
            self.session.reset_accumulator(radians);
        } else {
            trace!(radians, status = ?self.session.status(), "realign deferred until idle");
            self.deferred_realign = Some(radians);
        }
        self.refresh().into_iter().collect()
    }

    /// Reconcile and store the render state. Returns the value notification
    /// when the committed value or the rendered angle moved.
    fn refresh(&mut self) -> Option<KnobEvent> {
        let render = reconcile(
            &self.config,
            self.session.accumulated_radians(),
            self.integrated_radians,
            self.controlled,
        );
        let value_tolerance = CHANGE_EPSILON * self.config.range_value().abs();
        let changed = moved(render.committed_value, self.committed_value, value_tolerance)
            || moved(render.integrated_radians, self.integrated_radians, CHANGE_EPSILON);
        let rotation = AngleSample::new(render.clamped_radians - self.clamped_radians, render.clamped_radians);
        self.clamped_radians = render.clamped_radians;
        self.committed_value = render.committed_value;
        self.integrated_radians = render.integrated_radians;
        changed.then(|| KnobEvent::ValueChanged { value: self.value(), rotation })
    }

    // --- Queries ---

    #[must_use]
    pub fn config(&self) -> &KnobConfig {
        &self.config
    }

    #[must_use]
    pub fn status(&self) -> RotationStatus {
        self.session.status()
    }

    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.session.is_dragging()
    }

    /// Reported value.
    #[must_use]
    pub fn value(&self) -> f64 {
        self.config.report_value(self.committed_value)
    }

    /// Rendered radians, without the start offset.
    #[must_use]
    pub fn radians(&self) -> f64 {
        self.integrated_radians
    }

    /// Published angle in degrees.
    #[must_use]
    pub fn angle(&self) -> f64 {
        radians_to_degrees(self.integrated_radians + self.config.start_radians())
    }

    #[must_use]
    pub fn normalized_angle(&self) -> f64 {
        normalize_degrees_360(self.angle())
    }

    /// Most recent raw rotation tick.
    #[must_use]
    pub fn last_sample(&self) -> AngleSample {
        self.session.last_sample()
    }

    /// Whether an external value is waiting for the gesture to settle.
    #[must_use]
    pub fn has_deferred_realign(&self) -> bool {
        self.deferred_realign.is_some()
    }

    #[must_use]
    pub fn runtime(&self) -> KnobRuntimeState {
        KnobRuntimeState {
            internal_radians: self.session.accumulated_radians(),
            integrated_radians: self.integrated_radians,
            committed_value: self.committed_value,
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> KnobSnapshot {
        KnobSnapshot {
            angle: self.angle(),
            normalized_angle: self.normalized_angle(),
            radians: self.radians(),
            value: self.value(),
            status: self.status(),
            runtime: self.runtime(),
        }
    }
}

fn moved(next: f64, previous: f64, tolerance: f64) -> bool {
    (next - previous).abs() > tolerance
}

/// A knob bound to observers and the cursor overlay.
pub struct Knob {
    engine: KnobEngine,
    observers: KnobObservers,
    cursor: Box<dyn CursorOverlay>,
}

impl fmt::Debug for Knob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Knob")
            .field("engine", &self.engine)
            .field("observers", &self.observers)
            .finish_non_exhaustive()
    }
}

impl Knob {
    /// Validate `options` and build a detached knob that drives the
    /// process-wide cursor overlay.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for invalid options.
    pub fn new(options: KnobOptions) -> Result<Self, ConfigError> {
        Self::with_cursor(options, Box::new(GlobalCursorLayer))
    }

    /// Like [`Knob::new`] with a caller-supplied cursor overlay.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for invalid options.
    pub fn with_cursor(options: KnobOptions, cursor: Box<dyn CursorOverlay>) -> Result<Self, ConfigError> {
        let engine = KnobEngine::new(KnobConfig::new(options)?);
        debug!(kind = ?engine.config().kind(), value = engine.value(), "knob created");
        Ok(Self { engine, observers: KnobObservers::default(), cursor })
    }

    /// Replace the registered observers.
    pub fn observe(&mut self, observers: KnobObservers) {
        self.observers = observers;
    }

    #[must_use]
    pub fn engine(&self) -> &KnobEngine {
        &self.engine
    }

    /// Move the registered observers out, leaving none.
    #[cfg(feature = "web")]
    pub(crate) fn take_observers(&mut self) -> KnobObservers {
        std::mem::take(&mut self.observers)
    }

    // --- Attachment ---

    /// Attach to `target`, returning any previously attached target.
    pub fn attach(&mut self, target: Box<dyn TargetGeometry>) -> Option<Box<dyn TargetGeometry>> {
        let previous = self.detach();
        self.engine.attach(target);
        previous
    }

    /// Detach from the current target. Idempotent. A drag in progress is
    /// abandoned and the cursor overlay hidden.
    pub fn detach(&mut self) -> Option<Box<dyn TargetGeometry>> {
        let dragging = self.engine.is_dragging();
        let target = self.engine.detach();
        if dragging {
            self.cursor.hide();
        }
        target
    }

    // --- Events ---

    pub fn dispatch(&mut self, event: &PointerEvent) -> Vec<KnobEvent> {
        let events = self.engine.dispatch(event);
        self.deliver(&events);
        events
    }

    /// Pointer pressed on the target.
    pub fn pointer_down(&mut self, point: Point) -> Vec<KnobEvent> {
        self.dispatch(&PointerEvent::down(point))
    }

    /// Pointer moved anywhere in the document.
    pub fn pointer_move(&mut self, point: Point) -> Vec<KnobEvent> {
        self.dispatch(&PointerEvent::moved(point))
    }

    /// Pointer released anywhere in the document.
    pub fn pointer_up(&mut self, point: Point) -> Vec<KnobEvent> {
        self.dispatch(&PointerEvent::up(point))
    }

    /// Deliver the deferred `End → Idle` transition.
    pub fn tick(&mut self) -> Vec<KnobEvent> {
        let events = self.engine.tick();
        self.deliver(&events);
        events
    }

    /// See [`KnobEngine::set_value`].
    pub fn set_value(&mut self, value: f64) -> Vec<KnobEvent> {
        let events = self.engine.set_value(value);
        self.deliver(&events);
        events
    }

    fn deliver(&mut self, events: &[KnobEvent]) {
        for event in events {
            match event {
                KnobEvent::StatusChanged { status: RotationStatus::Begin } => self.cursor.show(CursorStyle::Grabbing),
                KnobEvent::StatusChanged { status: RotationStatus::End } => self.cursor.hide(),
                _ => {}
            }
            self.observers.notify(event);
        }
    }

    // --- Options ---

    /// Merge `patch` into the current options and rebuild, staying attached
    /// to the same target. Observers and the cursor overlay are kept.
    ///
    /// A pending `End → Idle` is delivered to observers before the rebuild.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for invalid merged options; the knob is left
    /// unchanged apart from the settled `Idle`.
    pub fn set_options(&mut self, patch: &KnobOptions) -> Result<(), ConfigError> {
        self.tick();
        let mut next = self.engine.reconfigure(patch)?;
        if let Some(target) = self.detach() {
            next.attach(target);
        }
        self.engine = next;
        debug!(version = self.engine.config().version(), "knob reconfigured");
        Ok(())
    }

    /// Like [`Knob::set_options`], attaching to `target` instead. Returns
    /// the previous target.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for invalid merged options; the knob is left
    /// unchanged apart from the settled `Idle`.
    pub fn set_options_with_target(
        &mut self,
        patch: &KnobOptions,
        target: Box<dyn TargetGeometry>,
    ) -> Result<Option<Box<dyn TargetGeometry>>, ConfigError> {
        self.tick();
        let mut next = self.engine.reconfigure(patch)?;
        let previous = self.detach();
        next.attach(target);
        self.engine = next;
        debug!(version = self.engine.config().version(), "knob reconfigured onto new target");
        Ok(previous)
    }

    // --- Queries ---

    #[must_use]
    pub fn config(&self) -> &KnobConfig {
        self.engine.config()
    }

    #[must_use]
    pub fn value(&self) -> f64 {
        self.engine.value()
    }

    #[must_use]
    pub fn angle(&self) -> f64 {
        self.engine.angle()
    }

    #[must_use]
    pub fn normalized_angle(&self) -> f64 {
        self.engine.normalized_angle()
    }

    #[must_use]
    pub fn radians(&self) -> f64 {
        self.engine.radians()
    }

    #[must_use]
    pub fn status(&self) -> RotationStatus {
        self.engine.status()
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.engine.is_attached()
    }

    #[must_use]
    pub fn snapshot(&self) -> KnobSnapshot {
        self.engine.snapshot()
    }
}

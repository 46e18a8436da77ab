//! Observer registration.
//!
//! Handlers run synchronously inside the call that produced the event, in
//! the order the engine emits them: value, then delta, then status.
//!
//! [`ObserverQueue`] is for hosts that share the knob behind a `RefCell`: it
//! runs the handlers after the knob borrow is released, so a handler may call
//! back into the knob.

#[cfg(test)]
#[path = "observer_test.rs"]
mod observer_test;

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;

use crate::angle::AngleSample;
use crate::engine::KnobEvent;
use crate::session::RotationStatus;

type ValueHandler = Box<dyn FnMut(f64, AngleSample)>;
type DeltaHandler = Box<dyn FnMut(AngleSample)>;
type StatusHandler = Box<dyn FnMut(RotationStatus)>;

/// Optional callbacks for knob notifications.
///
/// ```
/// use knob::KnobObservers;
///
/// let observers = KnobObservers::new()
///     .on_value_change(|value, _rotation| println!("value {value}"))
///     .on_status_change(|status| println!("status {status:?}"));
/// # drop(observers);
/// ```
#[derive(Default)]
pub struct KnobObservers {
    value: Option<ValueHandler>,
    delta: Option<DeltaHandler>,
    status: Option<StatusHandler>,
}

impl fmt::Debug for KnobObservers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KnobObservers")
            .field("on_value_change", &self.value.is_some())
            .field("on_delta_change", &self.delta.is_some())
            .field("on_status_change", &self.status.is_some())
            .finish()
    }
}

impl KnobObservers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Called with the reported value whenever it or the rendered angle
    /// changes.
    #[must_use]
    pub fn on_value_change(mut self, handler: impl FnMut(f64, AngleSample) + 'static) -> Self {
        self.value = Some(Box::new(handler));
        self
    }

    /// Called on every raw rotation tick.
    #[must_use]
    pub fn on_delta_change(mut self, handler: impl FnMut(AngleSample) + 'static) -> Self {
        self.delta = Some(Box::new(handler));
        self
    }

    /// Called on every status transition, `End → Idle` included.
    #[must_use]
    pub fn on_status_change(mut self, handler: impl FnMut(RotationStatus) + 'static) -> Self {
        self.status = Some(Box::new(handler));
        self
    }

    /// Deliver one event to the matching handler.
    pub fn notify(&mut self, event: &KnobEvent) {
        match *event {
            KnobEvent::ValueChanged { value, rotation } => {
                if let Some(handler) = self.value.as_mut() {
                    handler(value, rotation);
                }
            }
            KnobEvent::DeltaChanged { rotation } => {
                if let Some(handler) = self.delta.as_mut() {
                    handler(rotation);
                }
            }
            KnobEvent::StatusChanged { status } => {
                if let Some(handler) = self.status.as_mut() {
                    handler(status);
                }
            }
        }
    }
}

/// Observers held outside the knob, fed with the events each call returns.
///
/// Events delivered while a handler is running are queued and handed out
/// after it returns, in order.
#[derive(Debug, Default)]
pub struct ObserverQueue {
    observers: RefCell<KnobObservers>,
    pending: RefCell<VecDeque<KnobEvent>>,
    delivering: Cell<bool>,
}

impl ObserverQueue {
    #[must_use]
    pub fn new(observers: KnobObservers) -> Self {
        Self { observers: RefCell::new(observers), ..Self::default() }
    }

    /// Replace the handlers. Returns `false` (and keeps the old ones) when
    /// called from inside a handler.
    pub fn replace(&self, observers: KnobObservers) -> bool {
        match self.observers.try_borrow_mut() {
            Ok(mut slot) => {
                *slot = observers;
                true
            }
            Err(_) => false,
        }
    }

    /// Queue `events` and, unless a delivery is already running further up
    /// the stack, drain the queue through the handlers.
    pub fn deliver(&self, events: &[KnobEvent]) {
        self.pending.borrow_mut().extend(events.iter().copied());
        if self.delivering.replace(true) {
            return;
        }
        loop {
            let next = self.pending.borrow_mut().pop_front();
            let Some(event) = next else {
                break;
            };
            self.observers.borrow_mut().notify(&event);
        }
        self.delivering.set(false);
    }
}

//! Browser host adapter (feature `web`).
//!
//! - [`DomTarget`]: element geometry via `getBoundingClientRect`
//! - [`DomCursorLayer`]: the process-wide cursor overlay as a fixed `<div>`
//! - [`DomBinding`]: real `pointerdown` / `pointermove` / `pointerup`
//!   listeners driving a [`Knob`], with `End → Idle` delivered on a
//!   zero-delay timeout
//! - [`KnobHandle`]: borrow-safe access to a bound knob, usable from
//!   observers

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use gloo_timers::callback::Timeout;
use tracing::{debug, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use wasm_bindgen::closure::Closure;
use web_sys::{Document, Element, EventTarget, HtmlElement};

use crate::angle::Point;
use crate::cursor::{CursorOverlay, CursorStyle};
use crate::engine::{Knob, KnobEvent, KnobSnapshot};
use crate::host::{EventSurface, PointerEvent, PointerKind, Rect, TargetGeometry};
use crate::observer::{KnobObservers, ObserverQueue};
use crate::session::RotationStatus;

type PointerClosure = Closure<dyn FnMut(web_sys::PointerEvent)>;

// =============================================================
// Target geometry
// =============================================================

/// A DOM element as a knob target.
pub struct DomTarget {
    element: Element,
}

impl DomTarget {
    #[must_use]
    pub fn new(element: Element) -> Self {
        Self { element }
    }

    #[must_use]
    pub fn element(&self) -> &Element {
        &self.element
    }
}

impl TargetGeometry for DomTarget {
    fn bounding_rect(&self) -> Rect {
        let rect = self.element.get_bounding_client_rect();
        Rect::new(rect.left(), rect.top(), rect.width(), rect.height())
    }
}

// =============================================================
// Cursor overlay
// =============================================================

const OVERLAY_STYLE: [(&str, &str); 6] = [
    ("position", "fixed"),
    ("inset", "0"),
    ("z-index", "2147483647"),
    ("display", "none"),
    ("touch-action", "none"),
    ("user-select", "none"),
];

thread_local! {
    static OVERLAY: RefCell<Option<HtmlElement>> = const { RefCell::new(None) };
}

/// Handle onto the page's single cursor overlay element, created on first
/// use and appended to `<body>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DomCursorLayer;

impl DomCursorLayer {
    fn overlay() -> Option<HtmlElement> {
        OVERLAY.with(|cell| {
            let mut slot = cell.borrow_mut();
            if slot.is_none() {
                *slot = create_overlay();
            }
            slot.clone()
        })
    }

    fn set(property: &str, value: &str) {
        let Some(overlay) = Self::overlay() else {
            return;
        };
        if let Err(err) = overlay.style().set_property(property, value) {
            warn!(?err, property, "cursor overlay style update failed");
        }
    }
}

impl CursorOverlay for DomCursorLayer {
    fn show(&mut self, style: CursorStyle) {
        Self::set("cursor", style.as_css());
        Self::set("display", "block");
    }

    fn hide(&mut self) {
        Self::set("display", "none");
    }
}

fn create_overlay() -> Option<HtmlElement> {
    let document = document()?;
    let element = match document.create_element("div") {
        Ok(element) => element,
        Err(err) => {
            warn!(?err, "cursor overlay creation failed");
            return None;
        }
    };
    let Ok(overlay) = element.dyn_into::<HtmlElement>() else {
        warn!("cursor overlay is not an HtmlElement");
        return None;
    };
    let style = overlay.style();
    for (property, value) in OVERLAY_STYLE {
        if let Err(err) = style.set_property(property, value) {
            warn!(?err, property, "cursor overlay style failed");
        }
    }
    let body = document.body()?;
    if let Err(err) = body.append_child(&overlay) {
        warn!(?err, "cursor overlay append failed");
        return None;
    }
    debug!("cursor overlay created");
    Some(overlay)
}

fn document() -> Option<Document> {
    web_sys::window()?.document()
}

// =============================================================
// Binding
// =============================================================

/// Live DOM listeners for one knob. Dropping the binding removes them and
/// detaches the knob.
///
/// The knob's observers are moved into an [`ObserverQueue`] and run after
/// the knob borrow is released, so an observer may push a value back through
/// a [`KnobHandle`].
pub struct DomBinding {
    knob: Rc<RefCell<Knob>>,
    observers: Rc<ObserverQueue>,
    element: EventTarget,
    document: EventTarget,
    on_down: PointerClosure,
    on_move: PointerClosure,
    on_up: PointerClosure,
}

impl DomBinding {
    /// Attach `knob` to `element` and start listening.
    ///
    /// # Errors
    ///
    /// Returns the JS error when there is no document or a listener cannot
    /// be registered.
    pub fn bind(mut knob: Knob, element: Element) -> Result<Self, JsValue> {
        let document: EventTarget = document().ok_or_else(|| JsValue::from_str("no document"))?.into();
        let observers = Rc::new(ObserverQueue::new(knob.take_observers()));
        knob.attach(Box::new(DomTarget::new(element.clone())));
        let knob = Rc::new(RefCell::new(knob));
        let handle = KnobHandle { knob: Rc::downgrade(&knob), observers: Rc::downgrade(&observers) };

        let binding = Self {
            on_down: pointer_handler(handle.clone(), PointerKind::Down, EventSurface::Target),
            on_move: pointer_handler(handle.clone(), PointerKind::Move, EventSurface::Document),
            on_up: pointer_handler(handle, PointerKind::Up, EventSurface::Document),
            element: element.into(),
            document,
            knob,
            observers,
        };
        binding.element.add_event_listener_with_callback("pointerdown", binding.on_down.as_ref().unchecked_ref())?;
        binding.document.add_event_listener_with_callback("pointermove", binding.on_move.as_ref().unchecked_ref())?;
        binding.document.add_event_listener_with_callback("pointerup", binding.on_up.as_ref().unchecked_ref())?;
        debug!("dom binding attached");
        Ok(binding)
    }

    /// Handle for reading state and pushing values, safe to capture in an
    /// observer. It stops working once the binding is dropped.
    #[must_use]
    pub fn handle(&self) -> KnobHandle {
        KnobHandle { knob: Rc::downgrade(&self.knob), observers: Rc::downgrade(&self.observers) }
    }

    /// Replace the observers. Ignored with a warning from inside an observer.
    pub fn observe(&self, observers: KnobObservers) {
        if !self.observers.replace(observers) {
            warn!("observers replaced while delivering; kept the old ones");
        }
    }
}

impl Drop for DomBinding {
    fn drop(&mut self) {
        let listeners = [
            (&self.element, "pointerdown", &self.on_down),
            (&self.document, "pointermove", &self.on_move),
            (&self.document, "pointerup", &self.on_up),
        ];
        for (target, name, closure) in listeners {
            if let Err(err) = target.remove_event_listener_with_callback(name, closure.as_ref().unchecked_ref()) {
                warn!(?err, name, "listener removal failed");
            }
        }
        // Deliver a pending Idle before the observers go away.
        self.handle().run(Knob::tick);
        match self.knob.try_borrow_mut() {
            Ok(mut knob) => {
                if knob.detach().is_some() {
                    debug!("dom binding detached");
                }
            }
            Err(_) => warn!("knob busy during unbind; left attached"),
        }
    }
}

/// Weak handle onto a bound knob.
///
/// Every call borrows the knob only for its own duration and then delivers
/// the resulting events to the binding's observers.
#[derive(Debug, Clone)]
pub struct KnobHandle {
    knob: Weak<RefCell<Knob>>,
    observers: Weak<ObserverQueue>,
}

impl KnobHandle {
    /// See [`Knob::set_value`]. Returns no events once the binding is gone.
    pub fn set_value(&self, value: f64) -> Vec<KnobEvent> {
        self.run(|knob| knob.set_value(value))
    }

    #[must_use]
    pub fn value(&self) -> Option<f64> {
        self.read(Knob::value)
    }

    #[must_use]
    pub fn snapshot(&self) -> Option<KnobSnapshot> {
        self.read(Knob::snapshot)
    }

    fn read<T>(&self, query: impl FnOnce(&Knob) -> T) -> Option<T> {
        let knob = self.knob.upgrade()?;
        let Ok(knob) = knob.try_borrow() else {
            warn!("knob busy; read skipped");
            return None;
        };
        Some(query(&knob))
    }

    fn run(&self, call: impl FnOnce(&mut Knob) -> Vec<KnobEvent>) -> Vec<KnobEvent> {
        let (Some(knob), Some(observers)) = (self.knob.upgrade(), self.observers.upgrade()) else {
            return Vec::new();
        };
        let events = match knob.try_borrow_mut() {
            Ok(mut knob) => call(&mut knob),
            Err(_) => {
                warn!("knob busy; call dropped");
                return Vec::new();
            }
        };
        observers.deliver(&events);
        events
    }
}

fn pointer_handler(handle: KnobHandle, kind: PointerKind, surface: EventSurface) -> PointerClosure {
    Closure::wrap(Box::new(move |event: web_sys::PointerEvent| {
        if kind == PointerKind::Down {
            event.prevent_default();
        }
        let point = Point::new(f64::from(event.client_x()), f64::from(event.client_y()));
        let events = handle.run(|knob| knob.dispatch(&PointerEvent::new(kind, point, surface)));
        if events.contains(&KnobEvent::StatusChanged { status: RotationStatus::End }) {
            schedule_tick(handle.clone());
        }
    }) as Box<dyn FnMut(web_sys::PointerEvent)>)
}

/// Settle `End → Idle` on the next turn of the event loop.
fn schedule_tick(handle: KnobHandle) {
    Timeout::new(0, move || {
        handle.run(Knob::tick);
    })
    .forget();
}

//! Host environment boundary: pointer events, event surfaces and geometry.
//!
//! The engine never touches a DOM directly. A host (the `web` adapter, the
//! CLI replayer, or a test) translates its native events into
//! [`PointerEvent`]s and supplies the target's bounding rectangle through
//! [`TargetGeometry`].

#[cfg(test)]
#[path = "host_test.rs"]
mod host_test;

use serde::{Deserialize, Serialize};

use crate::angle::Point;

/// Axis-aligned rectangle in client coordinates, as returned by a
/// bounding-box query.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self { left, top, width, height }
    }

    /// Geometric center; the rotation pivot.
    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.left + self.width / 2.0, self.top + self.height / 2.0)
    }
}

/// Bounding-box query for the element a knob is attached to.
///
/// Queried once per gesture, at pointer-down.
pub trait TargetGeometry {
    fn bounding_rect(&self) -> Rect;
}

impl TargetGeometry for Rect {
    fn bounding_rect(&self) -> Rect {
        *self
    }
}

/// Pointer lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerKind {
    Down,
    Move,
    Up,
}

/// Where an event originated (or, for a listener, where it is registered).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSurface {
    /// The knob's own element.
    Target,
    /// The document; hears every event that bubbles up from any element.
    Document,
}

/// A pointer event delivered by the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub kind: PointerKind,
    /// Client coordinates of the pointer.
    pub point: Point,
    /// Element the event was dispatched on.
    pub surface: EventSurface,
}

impl PointerEvent {
    #[must_use]
    pub fn new(kind: PointerKind, point: Point, surface: EventSurface) -> Self {
        Self { kind, point, surface }
    }

    /// Pointer pressed on the knob element.
    #[must_use]
    pub fn down(point: Point) -> Self {
        Self::new(PointerKind::Down, point, EventSurface::Target)
    }

    /// Pointer moved anywhere in the document.
    #[must_use]
    pub fn moved(point: Point) -> Self {
        Self::new(PointerKind::Move, point, EventSurface::Document)
    }

    /// Pointer released anywhere in the document.
    #[must_use]
    pub fn up(point: Point) -> Self {
        Self::new(PointerKind::Up, point, EventSurface::Document)
    }
}

/// A registered pointer listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listener {
    pub surface: EventSurface,
    pub kind: PointerKind,
}

impl Listener {
    #[must_use]
    pub fn new(surface: EventSurface, kind: PointerKind) -> Self {
        Self { surface, kind }
    }

    /// Whether this listener receives `event`.
    ///
    /// Document listeners hear events from every surface because events
    /// bubble; target listeners hear only events dispatched on the target.
    #[must_use]
    pub fn hears(&self, event: &PointerEvent) -> bool {
        self.kind == event.kind && (self.surface == EventSurface::Document || event.surface == EventSurface::Target)
    }
}

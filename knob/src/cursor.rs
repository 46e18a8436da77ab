//! Cursor overlay service.
//!
//! While a knob is being dragged the pointer usually leaves the knob element,
//! so the host shows a full-viewport overlay carrying a "grabbing" cursor.
//! There is one overlay per process; whichever knob is dragging drives it and
//! the last `show`/`hide` wins.

#[cfg(test)]
#[path = "cursor_test.rs"]
mod cursor_test;

use std::sync::{Mutex, OnceLock, PoisonError};

use serde::{Deserialize, Serialize};

/// CSS cursor shown by the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CursorStyle {
    #[default]
    Default,
    Grab,
    Grabbing,
    Pointer,
    Move,
    NotAllowed,
}

impl CursorStyle {
    /// The CSS `cursor` property value.
    #[must_use]
    pub fn as_css(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Grab => "grab",
            Self::Grabbing => "grabbing",
            Self::Pointer => "pointer",
            Self::Move => "move",
            Self::NotAllowed => "not-allowed",
        }
    }
}

/// Show/hide interface for the drag cursor overlay.
pub trait CursorOverlay {
    fn show(&mut self, style: CursorStyle);
    fn hide(&mut self);
}

/// Overlay that does nothing. For hosts without a cursor and for tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCursor;

impl CursorOverlay for NoopCursor {
    fn show(&mut self, _style: CursorStyle) {}
    fn hide(&mut self) {}
}

/// Observable state of the process-wide overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CursorState {
    pub visible: bool,
    pub style: CursorStyle,
}

static LAYER: OnceLock<Mutex<CursorState>> = OnceLock::new();

/// Handle onto the process-wide overlay. Initialised on first use.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalCursorLayer;

impl GlobalCursorLayer {
    fn layer() -> &'static Mutex<CursorState> {
        LAYER.get_or_init(|| {
            tracing::debug!("cursor layer initialised");
            Mutex::new(CursorState::default())
        })
    }

    /// Current overlay state.
    #[must_use]
    pub fn state() -> CursorState {
        *Self::layer().lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CursorOverlay for GlobalCursorLayer {
    fn show(&mut self, style: CursorStyle) {
        let mut state = Self::layer().lock().unwrap_or_else(PoisonError::into_inner);
        state.visible = true;
        state.style = style;
        tracing::trace!(cursor = style.as_css(), "cursor layer shown");
    }

    fn hide(&mut self) {
        let mut state = Self::layer().lock().unwrap_or_else(PoisonError::into_inner);
        state.visible = false;
        tracing::trace!("cursor layer hidden");
    }
}

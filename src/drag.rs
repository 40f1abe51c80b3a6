//! Pointer-drag controller for the floating overlay.
//!
//! A gesture runs from an accepted pointer-down to the matching pointer-up.
//! Moves are not applied immediately: each one replaces the pending frame
//! update, and [`DragController::on_frame`] commits whatever is pending at the
//! frame boundary.

use crate::frame::{FrameHandle, FrameSlot};
use crate::model::Point;

/// `PointerEvent.button` value for the primary (usually left) button.
pub const PRIMARY_BUTTON: i16 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerType {
    Mouse,
    Touch,
    Pen,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub pointer_type: PointerType,
    pub button: i16,
    /// Client coordinates. Events without them are ignored.
    pub position: Option<Point>,
}

impl PointerEvent {
    pub fn new(pointer_type: PointerType, x: f64, y: f64) -> Self {
        Self {
            pointer_type,
            button: PRIMARY_BUTTON,
            position: Some(Point::new(x, y)),
        }
    }

    pub fn mouse(x: f64, y: f64) -> Self {
        Self::new(PointerType::Mouse, x, y)
    }

    pub fn touch(x: f64, y: f64) -> Self {
        Self::new(PointerType::Touch, x, y)
    }

    pub fn with_button(mut self, button: i16) -> Self {
        self.button = button;
        self
    }

    /// Whether this press may start a drag.
    fn starts_drag(&self) -> bool {
        self.pointer_type != PointerType::Mouse || self.button == PRIMARY_BUTTON
    }
}

/// Listener bookkeeping the host must perform after a drag call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    None,
    /// Start routing document-wide move/up events to the controller.
    AttachGlobalListeners,
    /// Stop routing them.
    DetachGlobalListeners,
}

#[derive(Debug, Default)]
pub struct DragController {
    tracking: bool,
    /// Grab point relative to the overlay's top-left, fixed per gesture.
    anchor: Point,
    position: Point,
    frame: FrameSlot<Point>,
    listeners_attached: bool,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_position(position: Point) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn is_tracking(&self) -> bool {
        self.tracking
    }

    pub fn anchor(&self) -> Point {
        self.anchor
    }

    /// Committed overlay offset, used directly as the render translation.
    pub fn position(&self) -> Point {
        self.position
    }

    pub fn pending_frame(&self) -> Option<FrameHandle> {
        self.frame.pending()
    }

    pub fn listeners_attached(&self) -> bool {
        self.listeners_attached
    }

    pub fn on_pointer_down(&mut self, event: &PointerEvent) -> Effect {
        if self.tracking || !event.starts_drag() {
            return Effect::None;
        }
        let Some(pointer) = event.position else {
            return Effect::None;
        };

        self.tracking = true;
        self.anchor = pointer - self.position;
        tracing::debug!(x = pointer.x, y = pointer.y, "drag started");

        if self.listeners_attached {
            Effect::None
        } else {
            self.listeners_attached = true;
            Effect::AttachGlobalListeners
        }
    }

    /// Schedules the derived position for the next frame, replacing any
    /// update still pending from this gesture.
    pub fn on_pointer_move(&mut self, event: &PointerEvent) -> Option<FrameHandle> {
        if !self.tracking {
            return None;
        }
        let pointer = event.position?;
        Some(self.frame.schedule(pointer - self.anchor))
    }

    pub fn on_pointer_up(&mut self, _event: &PointerEvent) -> Effect {
        if self.tracking {
            tracing::debug!(x = self.position.x, y = self.position.y, "drag ended");
        }
        self.release()
    }

    /// Frame boundary: commits the pending update, if any.
    pub fn on_frame(&mut self) -> Option<Point> {
        let next = self.frame.take()?;
        self.position = next;
        Some(next)
    }

    /// Callback for one specific scheduled frame. Does nothing if that frame
    /// was cancelled or superseded.
    pub fn fire(&mut self, handle: FrameHandle) -> Option<Point> {
        let next = self.frame.fire(handle)?;
        self.position = next;
        Some(next)
    }

    /// Ends any gesture in progress. Used for teardown and whenever the drag
    /// surface goes away.
    pub fn teardown(&mut self) -> Effect {
        self.release()
    }

    fn release(&mut self) -> Effect {
        self.tracking = false;
        self.frame.cancel();
        if self.listeners_attached {
            self.listeners_attached = false;
            Effect::DetachGlobalListeners
        } else {
            Effect::None
        }
    }
}

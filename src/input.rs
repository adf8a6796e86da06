//! Input model: pointer/wheel events and the drag state machine.
//!
//! The controller turns raw host events into viewport operations. Drags pan
//! by the incremental delta since the previous event, so the drawing tracks
//! the pointer without drift. Wheel events zoom by one fixed step in the
//! wheel's direction regardless of how far it turned.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use crate::viewport::{Point, Transform, ViewportTransform, ZoomDirection};

/// Wheel / trackpad scroll delta.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelDelta {
    /// Horizontal scroll amount in pixels.
    pub dx: f64,
    /// Vertical scroll amount in pixels (positive = down).
    pub dy: f64,
}

impl WheelDelta {
    /// Zoom direction for this scroll: up zooms in, down zooms out.
    #[must_use]
    pub fn direction(self) -> Option<ZoomDirection> {
        if self.dy < 0.0 {
            Some(ZoomDirection::In)
        } else if self.dy > 0.0 {
            Some(ZoomDirection::Out)
        } else {
            None
        }
    }
}

/// Drag tracking between pointer-down and pointer-up.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DragState {
    pub active: bool,
    /// Screen-space position of the previous pointer event.
    pub last_pointer: Point,
}

/// What the host should do after an event was handled.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Handled {
    /// Suppress the browser/toolkit default (page scroll for wheel events).
    pub prevent_default: bool,
    /// The new transform, if the event changed it.
    pub transform: Option<Transform>,
}

/// Translates pointer and wheel input into pan/zoom operations.
#[derive(Debug, Clone, Default)]
pub struct InteractionController {
    drag: DragState,
}

impl InteractionController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn drag(&self) -> DragState {
        self.drag
    }

    pub fn pointer_down(&mut self, at: Point) -> Handled {
        self.drag = DragState { active: true, last_pointer: at };
        Handled::default()
    }

    /// Pan by the movement since the last recorded position. Ignored unless
    /// a drag is active.
    pub fn pointer_move(&mut self, at: Point, viewport: &mut ViewportTransform) -> Handled {
        if !self.drag.active {
            return Handled::default();
        }
        let dx = at.x - self.drag.last_pointer.x;
        let dy = at.y - self.drag.last_pointer.y;
        self.drag.last_pointer = at;
        Handled { prevent_default: false, transform: viewport.pan_by(dx, dy) }
    }

    pub fn pointer_up(&mut self) -> Handled {
        self.end_drag()
    }

    /// Leaving the surface ends the drag exactly like a release.
    pub fn pointer_leave(&mut self) -> Handled {
        self.end_drag()
    }

    /// Wheel input is always consumed so the page does not scroll.
    pub fn wheel(&mut self, delta: WheelDelta, viewport: &mut ViewportTransform) -> Handled {
        let transform = delta.direction().and_then(|dir| viewport.zoom_at(dir));
        Handled { prevent_default: true, transform }
    }

    fn end_drag(&mut self) -> Handled {
        self.drag.active = false;
        Handled::default()
    }
}

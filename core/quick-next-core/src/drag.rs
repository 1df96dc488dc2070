//! Drag-to-reposition geometry.
//!
//! A press becomes a drag only after the pointer leaves a small square around
//! the press point; anything smaller is treated as a click. While dragging, the
//! element follows the pointer (minus the grab offset) and is clamped so its
//! bounding box stays inside the viewport.

use crate::types::{Point, Rect, Size};

/// Transient state for one press/move/release gesture.
#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    start: Point,
    /// Pointer position relative to the element's top-left at press time.
    pointer_offset: Point,
    element_size: Size,
    exceeded_threshold: bool,
    last_position: Option<Point>,
}

impl DragSession {
    pub fn begin(pointer: Point, element: Rect) -> Self {
        Self {
            start: pointer,
            pointer_offset: Point::new(pointer.x - element.left, pointer.y - element.top),
            element_size: element.size(),
            exceeded_threshold: false,
            last_position: None,
        }
    }

    pub fn pointer_offset(&self) -> Point {
        self.pointer_offset
    }

    pub fn has_exceeded_threshold(&self) -> bool {
        self.exceeded_threshold
    }

    /// Last clamped top-left applied during this gesture.
    pub fn last_position(&self) -> Option<Point> {
        self.last_position
    }

    /// Feeds a pointer move. Returns the clamped top-left to apply once the
    /// gesture has been classified as a drag, `None` while it is still a click.
    pub fn update(&mut self, pointer: Point, threshold: f64, viewport: Size) -> Option<Point> {
        if !self.exceeded_threshold {
            let dx = (pointer.x - self.start.x).abs();
            let dy = (pointer.y - self.start.y).abs();
            if dx <= threshold && dy <= threshold {
                return None;
            }
            self.exceeded_threshold = true;
        }

        let proposed = Point::new(
            pointer.x - self.pointer_offset.x,
            pointer.y - self.pointer_offset.y,
        );
        let clamped = clamp_to_viewport(proposed, self.element_size, viewport);
        self.last_position = Some(clamped);
        Some(clamped)
    }
}

/// Clamps a top-left so the element stays fully inside the viewport:
/// `0 <= left <= viewport.width - element.width`, same vertically.
/// An element larger than the viewport pins to 0.
pub fn clamp_to_viewport(proposed: Point, element: Size, viewport: Size) -> Point {
    Point::new(
        clamp_axis(proposed.x, viewport.width - element.width),
        clamp_axis(proposed.y, viewport.height - element.height),
    )
}

fn clamp_axis(value: f64, max: f64) -> f64 {
    value.clamp(0.0, max.max(0.0))
}

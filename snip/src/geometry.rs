//! Screen-space geometry for region selection.
//!
//! All coordinates are CSS pixels. A [`SelectionRect`] stores its origin in
//! viewport space together with the document scroll offset observed when the
//! gesture started, so the capture stage can translate it into whatever scroll
//! position the snapshot was taken at.

#[cfg(test)]
#[path = "geometry_test.rs"]
mod geometry_test;

/// A point in viewport or document space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Component-wise sum.
    #[must_use]
    pub fn offset_by(self, other: Point) -> Self {
        Self { x: self.x + other.x, y: self.y + other.y }
    }
}

/// Non-negative width and height.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

/// A normalized rectangle dragged out by the user.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SelectionRect {
    /// Top-left corner in viewport coordinates.
    pub origin: Point,
    /// Always non-negative; derived from min/max of the two corners.
    pub extent: Size,
    /// Document scroll offset at the moment the gesture started.
    pub scroll: Point,
}

impl SelectionRect {
    /// Build a rect from the gesture start and the current pointer position.
    ///
    /// The corners may arrive in any order; the result never has a negative
    /// extent.
    #[must_use]
    pub fn from_corners(start: Point, current: Point) -> Self {
        let left = start.x.min(current.x);
        let top = start.y.min(current.y);
        let right = start.x.max(current.x);
        let bottom = start.y.max(current.y);
        Self {
            origin: Point::new(left, top),
            extent: Size { width: right - left, height: bottom - top },
            scroll: Point::default(),
        }
    }

    /// Attach the gesture-time scroll offset.
    #[must_use]
    pub fn with_scroll(mut self, scroll: Point) -> Self {
        self.scroll = scroll;
        self
    }

    /// A rect with no area cannot be captured.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.extent.width <= 0.0 || self.extent.height <= 0.0
    }

    /// Top-left corner in document coordinates.
    #[must_use]
    pub fn document_origin(&self) -> Point {
        self.origin.offset_by(self.scroll)
    }
}

//! Points, sizes and rectangles

use serde::{Deserialize, Serialize};

/// 2D point
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Image size in pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Length of the shorter side
    pub fn min_side(&self) -> f64 {
        self.width.min(self.height)
    }
}

/// Axis-aligned rectangle
///
/// Width and height can become negative after a large [`Rect::inset`];
/// such rectangles are degenerate and contain nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge
    pub x: f64,
    /// Top edge
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle covering a whole image
    pub fn from_size(size: Size) -> Self {
        Self::new(0.0, 0.0, size.width, size.height)
    }

    /// Right edge
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// `true` when either dimension is zero or negative
    pub fn is_degenerate(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Move every edge inwards by the given amounts (negative values grow the rectangle)
    pub fn inset(&self, dx: f64, dy: f64) -> Rect {
        Rect::new(
            self.x + dx,
            self.y + dy,
            self.width - dx * 2.0,
            self.height - dy * 2.0,
        )
    }

    /// Whether this rectangle fully encloses `other`
    pub fn contains(&self, other: &Rect) -> bool {
        if self.is_degenerate() {
            return false;
        }
        self.x <= other.x
            && self.y <= other.y
            && self.right() >= other.right()
            && self.bottom() >= other.bottom()
    }

    /// Scale every coordinate by a horizontal and vertical factor
    pub fn scaled_by(&self, scale_x: f64, scale_y: f64) -> Rect {
        Rect::new(
            self.x * scale_x,
            self.y * scale_y,
            self.width * scale_x,
            self.height * scale_y,
        )
    }

    /// Uniform scale
    pub fn scaled(&self, scale: f64) -> Rect {
        self.scaled_by(scale, scale)
    }

    /// Flip horizontally within a plane of the given width
    pub fn mirrored(&self, plane_width: f64) -> Rect {
        Rect::new(
            plane_width - self.x - self.width,
            self.y,
            self.width,
            self.height,
        )
    }
}

#[cfg(test)]
#[path = "camera_test.rs"]
mod camera_test;

use std::ops::{Add, Div, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

/// A point in either screen or document space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A translation, e.g. a pan offset or a gesture's cumulative drag.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Offset {
    pub dx: f64,
    pub dy: f64,
}

impl Offset {
    pub const ZERO: Self = Self { dx: 0.0, dy: 0.0 };

    #[must_use]
    pub fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }

    #[must_use]
    pub fn is_zero(self) -> bool {
        self.dx == 0.0 && self.dy == 0.0
    }
}

/// Width/height of the canvas or of an image, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Both dimensions finite and strictly positive.
    #[must_use]
    pub fn is_positive(self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    /// Offset from the top-left corner to the center.
    #[must_use]
    pub fn half(self) -> Offset {
        Offset { dx: self.width / 2.0, dy: self.height / 2.0 }
    }
}

impl Add<Offset> for Point {
    type Output = Point;

    fn add(self, rhs: Offset) -> Point {
        Point { x: self.x + rhs.dx, y: self.y + rhs.dy }
    }
}

impl Sub<Offset> for Point {
    type Output = Point;

    fn sub(self, rhs: Offset) -> Point {
        Point { x: self.x - rhs.dx, y: self.y - rhs.dy }
    }
}

impl Mul<f64> for Point {
    type Output = Point;

    fn mul(self, rhs: f64) -> Point {
        Point { x: self.x * rhs, y: self.y * rhs }
    }
}

impl Div<f64> for Point {
    type Output = Point;

    fn div(self, rhs: f64) -> Point {
        Point { x: self.x / rhs, y: self.y / rhs }
    }
}

impl Add for Offset {
    type Output = Offset;

    fn add(self, rhs: Offset) -> Offset {
        Offset { dx: self.dx + rhs.dx, dy: self.dy + rhs.dy }
    }
}

impl Neg for Offset {
    type Output = Offset;

    fn neg(self) -> Offset {
        Offset { dx: -self.dx, dy: -self.dy }
    }
}

impl Mul<f64> for Offset {
    type Output = Offset;

    fn mul(self, rhs: f64) -> Offset {
        Offset { dx: self.dx * rhs, dy: self.dy * rhs }
    }
}

impl Div<f64> for Offset {
    type Output = Offset;

    fn div(self, rhs: f64) -> Offset {
        Offset { dx: self.dx / rhs, dy: self.dy / rhs }
    }
}

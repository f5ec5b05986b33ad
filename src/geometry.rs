//! Axis-aligned geometry used by physics and collision.
//!
//! Coordinates follow screen conventions: `x` grows to the right and `y`
//! grows downward, so "falling" means a positive vertical velocity and the
//! top edge of a rectangle is its smallest `y`.
//!
//! Two notions of rectangles meeting are used throughout the crate:
//!
//! - [`Rect::overlap`] – intersection with positive area (actual penetration)
//! - [`Rect::contact`] – closed intersection that is at least a segment,
//!   which also covers two boxes resting edge to edge
//!
//! Corner-to-corner touches count as neither.

use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// 2D float vector for positions and velocities.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

/// A position in world or actor-local space.
pub type Point = Vec2;

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn zero() -> Self {
        Self::ZERO
    }

    /// Component along `axis`.
    pub fn along(&self, axis: Axis) -> f32 {
        match axis {
            Axis::Horizontal => self.x,
            Axis::Vertical => self.y,
        }
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Vec2 {
    fn sub_assign(&mut self, rhs: Vec2) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;
    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

impl From<(f32, f32)> for Vec2 {
    fn from((x, y): (f32, f32)) -> Self {
        Vec2::new(x, y)
    }
}

/// One of the two world axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// Axis-aligned rectangle. `w` and `h` are never negative.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "RectRepr")]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

#[derive(Deserialize)]
struct RectRepr {
    x: f32,
    y: f32,
    w: f32,
    h: f32,
}

impl TryFrom<RectRepr> for Rect {
    type Error = SimError;
    fn try_from(r: RectRepr) -> Result<Self, Self::Error> {
        Rect::new(r.x, r.y, r.w, r.h)
    }
}

impl Rect {
    /// Build a rectangle, rejecting negative or non-finite sizes.
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Result<Self, SimError> {
        if !(w >= 0.0 && h >= 0.0) || !w.is_finite() || !h.is_finite() {
            return Err(SimError::InvalidRect { w, h });
        }
        Ok(Self { x, y, w, h })
    }

    /// Rectangle with its origin at (0,0).
    pub fn sized(w: f32, h: f32) -> Result<Self, SimError> {
        Self::new(0.0, 0.0, w, h)
    }

    /// The zero rectangle. As a hitbox it means "use the sprite bounds".
    pub const fn zero() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            w: 0.0,
            h: 0.0,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.w == 0.0 && self.h == 0.0
    }

    pub fn origin(&self) -> Point {
        Vec2::new(self.x, self.y)
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.w, self.h)
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn center(&self) -> Point {
        Vec2::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// Lower and upper bound along `axis`.
    pub fn span(&self, axis: Axis) -> (f32, f32) {
        match axis {
            Axis::Horizontal => (self.x, self.right()),
            Axis::Vertical => (self.y, self.bottom()),
        }
    }

    /// Same rectangle shifted by `offset`.
    pub fn translated(&self, offset: Vec2) -> Rect {
        Rect {
            x: self.x + offset.x,
            y: self.y + offset.y,
            ..*self
        }
    }

    /// Positive-area intersection test.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    /// Intersection rectangle, if it has positive area.
    pub fn overlap(&self, other: &Rect) -> Option<Rect> {
        if !self.intersects(other) {
            return None;
        }
        Some(self.clip(other))
    }

    /// Closed intersection of the two rectangles, if it is at least a
    /// segment of positive length. Includes edge-to-edge touches.
    pub fn contact(&self, other: &Rect) -> Option<Rect> {
        let x0 = self.x.max(other.x);
        let x1 = self.right().min(other.right());
        let y0 = self.y.max(other.y);
        let y1 = self.bottom().min(other.bottom());
        if x1 < x0 || y1 < y0 {
            return None;
        }
        if x1 - x0 <= 0.0 && y1 - y0 <= 0.0 {
            return None;
        }
        Some(Rect {
            x: x0,
            y: y0,
            w: x1 - x0,
            h: y1 - y0,
        })
    }

    /// True when the rectangles share an edge segment but do not overlap.
    pub fn touches(&self, other: &Rect) -> bool {
        !self.intersects(other) && self.contact(other).is_some()
    }

    pub fn contains_point(&self, point: Point) -> bool {
        point.x >= self.x && point.x <= self.right() && point.y >= self.y && point.y <= self.bottom()
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.right() <= self.right()
            && other.y >= self.y
            && other.bottom() <= self.bottom()
    }

    /// Penetration depth along `axis`; zero or negative means separated.
    pub fn penetration(&self, other: &Rect, axis: Axis) -> f32 {
        let (a0, a1) = self.span(axis);
        let (b0, b1) = other.span(axis);
        a1.min(b1) - a0.max(b0)
    }

    /// Grown by `margin` on every side.
    pub fn inflated(&self, margin: f32) -> Rect {
        Rect {
            x: self.x - margin,
            y: self.y - margin,
            w: self.w + 2.0 * margin,
            h: self.h + 2.0 * margin,
        }
    }

    /// Intersection clamped to zero size when the rectangles are apart.
    pub fn clip(&self, other: &Rect) -> Rect {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        Rect {
            x,
            y,
            w: (self.right().min(other.right()) - x).max(0.0),
            h: (self.bottom().min(other.bottom()) - y).max(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(x: f32, y: f32, w: f32, h: f32) -> Rect {
        Rect::new(x, y, w, h).unwrap()
    }

    #[test]
    fn negative_size_is_rejected() {
        assert!(Rect::new(0.0, 0.0, -1.0, 4.0).is_err());
        assert!(Rect::new(0.0, 0.0, 4.0, -0.5).is_err());
        assert!(Rect::new(0.0, 0.0, f32::NAN, 4.0).is_err());
        assert!(Rect::new(-10.0, -10.0, 0.0, 0.0).is_ok());
    }

    #[test]
    fn overlap_returns_shared_area() {
        let a = r(0.0, 0.0, 32.0, 32.0);
        let b = r(16.0, 24.0, 32.0, 32.0);
        assert_eq!(a.overlap(&b), Some(r(16.0, 24.0, 16.0, 8.0)));
        assert_eq!(b.overlap(&a), a.overlap(&b));
    }

    #[test]
    fn edge_touch_is_contact_but_not_overlap() {
        let floor = r(100.0, 100.0, 32.0, 32.0);
        let resting = r(100.0, 68.0, 32.0, 32.0);
        assert!(floor.overlap(&resting).is_none());
        assert!(floor.touches(&resting));
        let c = floor.contact(&resting).unwrap();
        assert_eq!((c.y, c.w, c.h), (100.0, 32.0, 0.0));
    }

    #[test]
    fn corner_touch_is_not_contact() {
        let a = r(0.0, 0.0, 10.0, 10.0);
        let b = r(10.0, 10.0, 10.0, 10.0);
        assert!(a.contact(&b).is_none());
        assert!(!a.touches(&b));
    }

    #[test]
    fn containment() {
        let outer = r(0.0, 0.0, 10.0, 10.0);
        assert!(outer.contains_point(Vec2::new(10.0, 0.0)));
        assert!(!outer.contains_point(Vec2::new(10.5, 0.0)));
        assert!(outer.contains_rect(&r(2.0, 2.0, 8.0, 8.0)));
        assert!(!outer.contains_rect(&r(2.0, 2.0, 9.0, 8.0)));
    }

    #[test]
    fn penetration_along_axes() {
        let a = r(0.0, 0.0, 32.0, 32.0);
        let b = r(30.0, 20.0, 32.0, 32.0);
        assert_eq!(a.penetration(&b, Axis::Horizontal), 2.0);
        assert_eq!(a.penetration(&b, Axis::Vertical), 12.0);
        assert!(a.penetration(&r(40.0, 0.0, 1.0, 1.0), Axis::Horizontal) < 0.0);
    }
}

//! Axis-aligned rectangles in world coordinates.

#[cfg(test)]
#[path = "bounds_test.rs"]
mod bounds_test;

use serde::{Deserialize, Serialize};

use crate::camera::Point;

/// Half-open axis-aligned rectangle `[min_x, max_x) x [min_y, max_y)`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Rect {
    #[must_use]
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    /// Rectangle from a top-left corner and a size.
    #[must_use]
    pub fn from_origin_size(origin: Point, width: f64, height: f64) -> Self {
        Self { min_x: origin.x, min_y: origin.y, max_x: origin.x + width, max_y: origin.y + height }
    }

    /// Smallest rectangle containing every point. Empty input yields the default (empty) rectangle.
    #[must_use]
    pub fn hull(points: &[Point]) -> Self {
        let Some((first, rest)) = points.split_first() else {
            return Self::default();
        };
        rest.iter().fold(Self::new(first.x, first.y, first.x, first.y), |r, p| Self {
            min_x: r.min_x.min(p.x),
            min_y: r.min_y.min(p.y),
            max_x: r.max_x.max(p.x),
            max_y: r.max_y.max(p.y),
        })
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        (self.max_x - self.min_x).max(0.0)
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        (self.max_y - self.min_y).max(0.0)
    }

    #[must_use]
    pub fn origin(&self) -> Point {
        Point::new(self.min_x, self.min_y)
    }

    /// Returns `true` if the rectangle covers no area.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !(self.min_x < self.max_x && self.min_y < self.max_y)
    }

    /// Overlap of two rectangles, or `None` when they share no area.
    #[must_use]
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let r = Rect {
            min_x: self.min_x.max(other.min_x),
            min_y: self.min_y.max(other.min_y),
            max_x: self.max_x.min(other.max_x),
            max_y: self.max_y.min(other.max_y),
        };
        if r.is_empty() { None } else { Some(r) }
    }

    /// Returns `true` if `other` lies entirely inside `self`.
    #[must_use]
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.min_x >= self.min_x && other.min_y >= self.min_y && other.max_x <= self.max_x && other.max_y <= self.max_y
    }

    /// Grow every edge outward by `amount`.
    #[must_use]
    pub fn inflate(&self, amount: f64) -> Rect {
        Rect {
            min_x: self.min_x - amount,
            min_y: self.min_y - amount,
            max_x: self.max_x + amount,
            max_y: self.max_y + amount,
        }
    }

    #[must_use]
    pub fn translate(&self, dx: f64, dy: f64) -> Rect {
        Rect { min_x: self.min_x + dx, min_y: self.min_y + dy, max_x: self.max_x + dx, max_y: self.max_y + dy }
    }
}

//! Camera context and coordinate conversions.
//!
//! Three coordinate spaces are in play. Pixels are what the rendering surface
//! reports. World coordinates index pixeloid cells, and one pixeloid spans
//! `scale` pixels on screen. Vertices are related to world coordinates by the
//! single affine mapping
//!
//! ```text
//! world = vertex * scale + offset
//! ```
//!
//! The surface's local transform is chosen so that pixel and world meet at
//! `world = offset + pixel / scale`, which makes it `vertex = pixel / scale²`.
//! The visible world area therefore shrinks as the scale grows: at scale `s`
//! an `800 x 600` viewport shows `800/s x 600/s` pixeloids.
//!
//! Nothing in here consults object state. The mapping is a pure function of
//! `(scale, offset)`, and results are never rounded; callers pick a rounding
//! policy (see [`cell_at`] for cell selection).

#[cfg(test)]
#[path = "camera_test.rs"]
mod camera_test;

use serde::{Deserialize, Serialize};

use crate::bounds::Rect;
use crate::consts::MAX_VIEWPORT_PX;
use crate::scale::Scale;

/// A point in pixel, vertex, or world space.
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

/// Integer index of a single pixeloid in the world grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Cell {
    pub x: i64,
    pub y: i64,
}

impl Cell {
    #[must_use]
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// World-space position of the cell's top-left corner.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn origin(self) -> Point {
        Point::new(self.x as f64, self.y as f64)
    }
}

/// Viewport dimensions in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ViewportSize {
    pub width: f64,
    pub height: f64,
}

impl ViewportSize {
    /// Negative and non-finite sizes become zero; sizes are capped at [`MAX_VIEWPORT_PX`].
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width: sanitize_px(width), height: sanitize_px(height) }
    }

    /// Returns `true` if either dimension is zero.
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

fn sanitize_px(v: f64) -> f64 {
    if v.is_finite() { v.clamp(0.0, MAX_VIEWPORT_PX) } else { 0.0 }
}

/// Snapshot of the shared camera state for one frame.
///
/// This is the only mutable state that describes where the camera is. Every
/// cache query takes it explicitly so classification within a frame is
/// consistent with a single `(scale, offset)` pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewContext {
    /// Active zoom level.
    pub scale: Scale,
    /// World coordinate that projects to vertex (0, 0).
    pub offset: Point,
    /// Viewport size in pixels.
    pub viewport: ViewportSize,
}

impl Default for ViewContext {
    fn default() -> Self {
        Self { scale: Scale::MIN, offset: Point::default(), viewport: ViewportSize::default() }
    }
}

impl ViewContext {
    #[must_use]
    pub fn new(scale: Scale, offset: Point, viewport: ViewportSize) -> Self {
        Self { scale, offset, viewport }
    }

    /// Convert a vertex coordinate to world space at `scale`.
    #[must_use]
    pub fn to_world(&self, vertex: Point, scale: Scale) -> Point {
        to_world(vertex, scale, self.offset)
    }

    /// Convert a world coordinate to vertex space at `scale`.
    #[must_use]
    pub fn to_vertex(&self, world: Point, scale: Scale) -> Point {
        to_vertex(world, scale, self.offset)
    }

    /// Convert a pixel coordinate all the way to world space at `scale`:
    /// `offset + pixel / scale`.
    #[must_use]
    pub fn pixel_to_world(&self, pixel: Point, scale: Scale) -> Point {
        self.to_world(pixel_to_vertex(pixel, scale), scale)
    }

    /// Convert a world coordinate to surface pixels at `scale`:
    /// `(world - offset) * scale`.
    #[must_use]
    pub fn world_to_pixel(&self, world: Point, scale: Scale) -> Point {
        vertex_to_pixel(self.to_vertex(world, scale), scale)
    }

    /// The visible screen area in world coordinates at `scale`.
    ///
    /// Built by mapping all four viewport corners through [`to_world`] and
    /// taking their axis-aligned hull. It spans `viewport / scale` world units.
    #[must_use]
    pub fn screen_rect(&self, scale: Scale) -> Rect {
        let far = pixel_to_vertex(Point::new(self.viewport.width, self.viewport.height), scale);
        let corners = [
            Point::new(0.0, 0.0),
            Point::new(far.x, 0.0),
            Point::new(0.0, far.y),
            Point::new(far.x, far.y),
        ]
        .map(|v| self.to_world(v, scale));
        Rect::hull(&corners)
    }
}

/// `world = vertex * scale + offset`.
#[must_use]
pub fn to_world(vertex: Point, scale: Scale, offset: Point) -> Point {
    let s = scale.as_f64();
    Point { x: vertex.x * s + offset.x, y: vertex.y * s + offset.y }
}

/// `vertex = (world - offset) / scale`.
#[must_use]
pub fn to_vertex(world: Point, scale: Scale, offset: Point) -> Point {
    let s = scale.as_f64();
    Point { x: (world.x - offset.x) / s, y: (world.y - offset.y) / s }
}

/// Surface-local transform: `vertex = pixel / scale²`.
///
/// Composed with [`to_world`] this gives `offset + pixel / scale`, so one
/// pixeloid covers `scale` pixels.
#[must_use]
pub fn pixel_to_vertex(pixel: Point, scale: Scale) -> Point {
    let s2 = scale.as_f64() * scale.as_f64();
    Point { x: pixel.x / s2, y: pixel.y / s2 }
}

/// Inverse of [`pixel_to_vertex`].
#[must_use]
pub fn vertex_to_pixel(vertex: Point, scale: Scale) -> Point {
    let s2 = scale.as_f64() * scale.as_f64();
    Point { x: vertex.x * s2, y: vertex.y * s2 }
}

/// The pixeloid containing `world`, using floor rounding on both axes.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn cell_at(world: Point) -> Cell {
    Cell { x: world.x.floor() as i64, y: world.y.floor() as i64 }
}

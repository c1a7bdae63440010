//! Document model: geometric objects, their shapes and styles, and the in-memory store.
//!
//! Every shape answers the same question, [`GeometricObject::bounds_at`], so
//! the visibility and bitmap caches never branch on shape kind. Positions and
//! sizes are whole pixeloid cells. Appearance changes (style, size) bump the
//! object's visual version; moves do not.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bounds::Rect;
use crate::camera::Cell;
use crate::scale::Scale;

/// Unique identifier for a geometric object.
pub type ObjectId = Uuid;

/// Shape geometry in pixeloid cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Shape {
    /// A single cell.
    Point { at: Cell },
    /// Segment between two cells, both inclusive.
    Line { a: Cell, b: Cell },
    /// Circle of `radius` cells around `center`.
    Circle { center: Cell, radius: i64 },
    /// Axis-aligned rectangle with its top-left cell at `origin`.
    Rectangle { origin: Cell, width: i64, height: i64 },
    /// Diamond inscribed in the `width` x `height` box at `origin`.
    Diamond { origin: Cell, width: i64, height: i64 },
}

impl Shape {
    /// World-space bounds of every cell the shape occupies, ignoring stroke.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn cell_bounds(&self) -> Rect {
        let (min_x, min_y, max_x, max_y) = match *self {
            Self::Point { at } => (at.x, at.y, at.x + 1, at.y + 1),
            Self::Line { a, b } => (a.x.min(b.x), a.y.min(b.y), a.x.max(b.x) + 1, a.y.max(b.y) + 1),
            Self::Circle { center, radius } => {
                let r = radius.max(0);
                (center.x - r, center.y - r, center.x + r + 1, center.y + r + 1)
            }
            Self::Rectangle { origin, width, height } | Self::Diamond { origin, width, height } => {
                (origin.x, origin.y, origin.x + width.max(1), origin.y + height.max(1))
            }
        };
        Rect::new(min_x as f64, min_y as f64, max_x as f64, max_y as f64)
    }

    /// Move every anchor by whole cells.
    pub fn translate(&mut self, dx: i64, dy: i64) {
        let shift = |c: &mut Cell| {
            c.x += dx;
            c.y += dy;
        };
        match self {
            Self::Point { at } => shift(at),
            Self::Line { a, b } => {
                shift(a);
                shift(b);
            }
            Self::Circle { center, .. } => shift(center),
            Self::Rectangle { origin, .. } | Self::Diamond { origin, .. } => shift(origin),
        }
    }

    /// Resize to a `width` x `height` cell box, keeping the anchor cell.
    ///
    /// Points ignore the request. Lines keep `a` and move `b`. Circles take
    /// the radius that fits the smaller side.
    pub fn resize(&mut self, width: i64, height: i64) {
        let width = width.max(1);
        let height = height.max(1);
        match self {
            Self::Point { .. } => {}
            Self::Line { a, b } => {
                b.x = a.x + width - 1;
                b.y = a.y + height - 1;
            }
            Self::Circle { radius, .. } => *radius = (width.min(height) - 1) / 2,
            Self::Rectangle { width: w, height: h, .. } | Self::Diamond { width: w, height: h, .. } => {
                *w = width;
                *h = height;
            }
        }
    }
}

/// Appearance-only properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Style {
    /// Fill color as a CSS color string.
    pub fill: String,
    /// Stroke color as a CSS color string.
    pub stroke: String,
    /// Stroke width in screen pixels.
    pub stroke_width: f64,
}

impl Default for Style {
    fn default() -> Self {
        Self { fill: "#D94B4B".into(), stroke: "#1F1A17".into(), stroke_width: 1.0 }
    }
}

/// An object on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometricObject {
    /// Stable identity.
    pub id: ObjectId,
    /// Geometry in pixeloid cells.
    pub shape: Shape,
    /// Appearance.
    pub style: Style,
    /// Stacking order; lower values are drawn beneath higher values.
    #[serde(default)]
    pub z_index: i64,
    /// Bumped on every appearance change. Moves leave it untouched.
    #[serde(default)]
    visual_version: u64,
}

impl GeometricObject {
    /// Create an object with a fresh id and visual version 0.
    #[must_use]
    pub fn new(shape: Shape, style: Style) -> Self {
        Self { id: Uuid::new_v4(), shape, style, z_index: 0, visual_version: 0 }
    }

    #[must_use]
    pub fn with_z_index(mut self, z_index: i64) -> Self {
        self.z_index = z_index;
        self
    }

    #[must_use]
    pub fn visual_version(&self) -> u64 {
        self.visual_version
    }

    /// World-space bounds at `scale`, including half the stroke on every side.
    ///
    /// Stroke width is in screen pixels, so the same stroke covers fewer world
    /// units the further in the user zooms.
    #[must_use]
    pub fn bounds_at(&self, scale: Scale) -> Rect {
        let half_stroke = self.style.stroke_width.max(0.0) / (2.0 * scale.as_f64());
        self.shape.cell_bounds().inflate(half_stroke)
    }

    /// Move by whole cells. Does not change the visual version.
    pub fn translate(&mut self, dx: i64, dy: i64) {
        self.shape.translate(dx, dy);
    }

    /// Replace the style and bump the visual version if anything changed.
    pub fn set_style(&mut self, style: Style) -> bool {
        if self.style == style {
            return false;
        }
        self.style = style;
        self.visual_version += 1;
        true
    }

    /// Resize the shape and bump the visual version if its geometry changed.
    pub fn resize(&mut self, width: i64, height: i64) -> bool {
        let before = self.shape.clone();
        self.shape.resize(width, height);
        if self.shape == before {
            return false;
        }
        self.visual_version += 1;
        true
    }
}

/// In-memory store of geometric objects.
#[derive(Debug, Default)]
pub struct DocStore {
    objects: HashMap<ObjectId, GeometricObject>,
}

impl DocStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self { objects: HashMap::new() }
    }

    /// Insert or replace an object. If an object with the same `id` already
    /// exists it is overwritten.
    pub fn insert(&mut self, obj: GeometricObject) {
        self.objects.insert(obj.id, obj);
    }

    /// Remove an object by id, returning it if it was present.
    pub fn remove(&mut self, id: &ObjectId) -> Option<GeometricObject> {
        self.objects.remove(id)
    }

    #[must_use]
    pub fn get(&self, id: &ObjectId) -> Option<&GeometricObject> {
        self.objects.get(id)
    }

    pub fn get_mut(&mut self, id: &ObjectId) -> Option<&mut GeometricObject> {
        self.objects.get_mut(id)
    }

    /// Replace all objects with a full snapshot.
    pub fn load_snapshot(&mut self, objects: Vec<GeometricObject>) {
        self.objects.clear();
        for obj in objects {
            self.objects.insert(obj.id, obj);
        }
    }

    /// Return all objects sorted by `(z_index, id)` for draw order.
    #[must_use]
    pub fn sorted_objects(&self) -> Vec<&GeometricObject> {
        let mut objs: Vec<&GeometricObject> = self.objects.values().collect();
        objs.sort_by(|a, b| a.z_index.cmp(&b.z_index).then_with(|| a.id.cmp(&b.id)));
        objs
    }

    pub fn ids(&self) -> impl Iterator<Item = &ObjectId> {
        self.objects.keys()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

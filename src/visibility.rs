//! Visibility cache: per-object, per-scale on-screen classification.
//!
//! DESIGN
//! ======
//! Entries are stored scale-first (`scale -> object -> entry`) so eviction can
//! drop a whole scale in one step. Each entry records the basis it was
//! computed from: the camera offset, the viewport size, and the object's
//! bounds at that scale. A query whose current basis differs recomputes
//! synchronously and replaces the entry; nothing is merged, and a stale entry
//! is never returned from [`VisibilityCache::classify`].
//!
//! A move recomputes the active scale immediately
//! ([`VisibilityCache::on_object_bounds_changed`]); every other scale notices
//! the changed bounds on its next query.

#[cfg(test)]
#[path = "visibility_test.rs"]
mod visibility_test;

use std::collections::HashMap;
use std::time::Instant;

use serde::Serialize;
use tracing::debug;

use crate::bounds::Rect;
use crate::camera::{Point, ViewContext, ViewportSize};
use crate::doc::{GeometricObject, ObjectId};
use crate::scale::{Scale, ScaleIndexed, ScaleSlots};

/// How much of an object is inside the screen rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    OnScreen,
    PartiallyOnScreen,
    OffScreen,
}

/// Inputs a classification was computed from.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Basis {
    offset: Point,
    viewport: ViewportSize,
    object_bounds: Rect,
}

/// Classification of one object at one scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibilityEntry {
    pub object_id: ObjectId,
    pub scale: Scale,
    pub visibility: Visibility,
    /// World-space bounds clipped to the screen. `None` when off-screen; the
    /// full object bounds when fully on-screen.
    pub on_screen_bounds: Option<Rect>,
    basis: Basis,
}

impl VisibilityEntry {
    /// Whether any part of the object is on screen.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visibility != Visibility::OffScreen
    }

    /// The object bounds this entry was computed against.
    #[must_use]
    pub fn object_bounds(&self) -> Rect {
        self.basis.object_bounds
    }

    fn is_current(&self, basis: &Basis) -> bool {
        self.basis == *basis
    }
}

/// Classify `bounds` against `screen`.
///
/// Returns the classification and, unless off-screen, the clipped bounds.
#[must_use]
pub fn classify_bounds(bounds: &Rect, screen: &Rect) -> (Visibility, Option<Rect>) {
    match bounds.intersect(screen) {
        None => (Visibility::OffScreen, None),
        Some(clipped) if clipped == *bounds => (Visibility::OnScreen, Some(clipped)),
        Some(clipped) => (Visibility::PartiallyOnScreen, Some(clipped)),
    }
}

/// Per-scale store of [`VisibilityEntry`] values.
#[derive(Debug, Default)]
pub struct VisibilityCache {
    slots: ScaleSlots<HashMap<ObjectId, VisibilityEntry>>,
    recomputes: u64,
}

impl VisibilityCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify `obj` at `scale` under the camera in `ctx`.
    pub fn classify(&mut self, obj: &GeometricObject, ctx: &ViewContext, scale: Scale) -> VisibilityEntry {
        self.classify_at(obj, ctx, scale, Instant::now())
    }

    /// [`Self::classify`] with an explicit access time.
    pub fn classify_at(&mut self, obj: &GeometricObject, ctx: &ViewContext, scale: Scale, now: Instant) -> VisibilityEntry {
        let basis = Basis { offset: ctx.offset, viewport: ctx.viewport, object_bounds: obj.bounds_at(scale) };
        let entries = self.slots.get_or_insert_with(scale, now, HashMap::new);
        if let Some(entry) = entries.get(&obj.id) {
            if entry.is_current(&basis) {
                return *entry;
            }
        }

        let (visibility, on_screen_bounds) = classify_bounds(&basis.object_bounds, &ctx.screen_rect(scale));
        let entry = VisibilityEntry { object_id: obj.id, scale, visibility, on_screen_bounds, basis };
        entries.insert(obj.id, entry);
        self.recomputes += 1;
        debug!(id = %obj.id, %scale, ?visibility, "visibility: recomputed");
        entry
    }

    /// Recompute the active-scale entry for an object whose bounds changed.
    ///
    /// Entries at other scales are left in place and recomputed on their next query.
    pub fn on_object_bounds_changed(&mut self, obj: &GeometricObject, ctx: &ViewContext, now: Instant) -> VisibilityEntry {
        self.classify_at(obj, ctx, ctx.scale, now)
    }

    /// Cached entry as stored, without validation. May be stale.
    #[must_use]
    pub fn peek(&self, id: &ObjectId, scale: Scale) -> Option<&VisibilityEntry> {
        self.slots.peek(scale).and_then(|m| m.get(id))
    }

    /// Drop every entry for an object that left the store.
    pub fn forget_object(&mut self, id: &ObjectId) {
        for entries in self.slots.values_mut() {
            entries.remove(id);
        }
    }

    /// Number of entries resident at `scale`.
    #[must_use]
    pub fn len_at(&self, scale: Scale) -> usize {
        self.slots.peek(scale).map_or(0, HashMap::len)
    }

    /// Total entries across all scales.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.values().map(HashMap::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of classifications computed (cache misses plus stale refreshes).
    #[must_use]
    pub fn recomputes(&self) -> u64 {
        self.recomputes
    }
}

impl ScaleIndexed for VisibilityCache {
    fn cache_name(&self) -> &'static str {
        "visibility"
    }

    fn resident_scales(&self) -> Vec<Scale> {
        self.slots.scales()
    }

    fn last_access(&self, scale: Scale) -> Option<Instant> {
        self.slots.last_access(scale)
    }

    fn evict_scale(&mut self, scale: Scale) -> bool {
        self.slots.remove(scale).is_some()
    }
}

//! Bitmap ("mirror") cache: rendered snapshots of objects per scale.
//!
//! DESIGN
//! ======
//! Texture content and screen placement are kept apart. Entries live in a
//! per-scale slot, so a bitmap is only ever looked up at the scale it was
//! rendered for; within that slot it is valid while the object's visual
//! version matches. Moving the object alone never re-renders. Placement is
//! recomputed every frame from the object's live bounds
//! ([`BitmapCache::current_placement`]), so a bitmap follows a drag without
//! ever being repainted.
//!
//! Render targets are sized from the visibility cache's clipped bounds at
//! `scale` pixels per world unit and clamped to the viewport, so no
//! allocation grows with an object's unclipped world size. An off-screen or
//! zero-area object produces no render and leaves any existing entry
//! untouched.

#[cfg(test)]
#[path = "bitmap_test.rs"]
mod bitmap_test;

use std::collections::HashMap;
use std::time::Instant;

use tracing::debug;

use crate::bounds::Rect;
use crate::camera::{Point, ViewContext};
use crate::doc::{GeometricObject, ObjectId};
use crate::scale::{Scale, ScaleIndexed, ScaleSlots};
use crate::visibility::VisibilityCache;

/// Plain RGBA8 bitmap, the default render product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl Bitmap {
    /// Transparent bitmap of the given size.
    #[must_use]
    pub fn blank(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize * 4;
        Self { width, height, rgba: vec![0; len] }
    }
}

/// What the render backend is asked to produce.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderTarget {
    pub object_id: ObjectId,
    pub scale: Scale,
    /// On-screen part of the object in world coordinates.
    pub clipped_bounds: Rect,
    /// Render-target width in pixels, never larger than the viewport.
    pub width: u32,
    /// Render-target height in pixels, never larger than the viewport.
    pub height: u32,
}

impl RenderTarget {
    /// Size a target from clipped bounds: `clipped * scale` pixels, capped at
    /// the viewport. `None` when the target would have no pixels.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_clipped(object_id: ObjectId, clipped_bounds: Rect, ctx: &ViewContext, scale: Scale) -> Option<Self> {
        let s = scale.as_f64();
        let width = (clipped_bounds.width() * s).ceil().clamp(0.0, ctx.viewport.width.ceil()) as u32;
        let height = (clipped_bounds.height() * s).ceil().clamp(0.0, ctx.viewport.height.ceil()) as u32;
        if width == 0 || height == 0 {
            return None;
        }
        Some(Self { object_id, scale, clipped_bounds, width, height })
    }
}

/// A cached render and the inputs that produced it.
#[derive(Debug, Clone)]
pub struct BitmapEntry<B> {
    pub bitmap: B,
    pub visual_version: u64,
    /// Offset of the rendered region from the object's bounds origin, in world units.
    pub local_origin: Point,
    pub width: u32,
    pub height: u32,
}

/// Where to draw an object's bitmap this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Live object bounds at the queried scale.
    pub object_bounds: Rect,
    /// World position of the bitmap's top-left corner.
    pub world_origin: Point,
    /// Surface pixel position of the bitmap's top-left corner.
    pub pixel_origin: Point,
}

/// Per-scale store of [`BitmapEntry`] values.
#[derive(Debug)]
pub struct BitmapCache<B = Bitmap> {
    slots: ScaleSlots<HashMap<ObjectId, BitmapEntry<B>>>,
    renders: u64,
}

impl<B> Default for BitmapCache<B> {
    fn default() -> Self {
        Self { slots: ScaleSlots::new(), renders: 0 }
    }
}

impl<B> BitmapCache<B> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached bitmap for `obj` at `scale`, rendering it first if missing or stale.
    ///
    /// Returns `None` when the object has no on-screen area at `scale`.
    pub fn get_or_render<F>(
        &mut self,
        visibility: &mut VisibilityCache,
        obj: &GeometricObject,
        ctx: &ViewContext,
        scale: Scale,
        render_fn: F,
    ) -> Option<&B>
    where
        F: FnOnce(&GeometricObject, &RenderTarget) -> B,
    {
        self.get_or_render_at(visibility, obj, ctx, scale, render_fn, Instant::now())
    }

    /// [`Self::get_or_render`] with an explicit access time.
    pub fn get_or_render_at<F>(
        &mut self,
        visibility: &mut VisibilityCache,
        obj: &GeometricObject,
        ctx: &ViewContext,
        scale: Scale,
        render_fn: F,
        now: Instant,
    ) -> Option<&B>
    where
        F: FnOnce(&GeometricObject, &RenderTarget) -> B,
    {
        let vis = visibility.classify_at(obj, ctx, scale, now);
        let clipped = vis.on_screen_bounds?;
        let target = RenderTarget::from_clipped(obj.id, clipped, ctx, scale)?;

        let version = obj.visual_version();
        let entries = self.slots.get_or_insert_with(scale, now, HashMap::new);
        let stale = entries.get(&obj.id).is_none_or(|e| e.visual_version != version);
        if stale {
            let bounds = vis.object_bounds();
            let bitmap = render_fn(obj, &target);
            entries.insert(
                obj.id,
                BitmapEntry {
                    bitmap,
                    visual_version: version,
                    local_origin: Point::new(clipped.min_x - bounds.min_x, clipped.min_y - bounds.min_y),
                    width: target.width,
                    height: target.height,
                },
            );
            self.renders += 1;
            debug!(id = %obj.id, %scale, version, width = target.width, height = target.height, "bitmap: rendered");
        }
        entries.get(&obj.id).map(|e| &e.bitmap)
    }

    /// Placement of the object's bitmap at `scale`, from its live bounds.
    ///
    /// The cached entry only contributes the object-local offset of the
    /// rendered region; position always comes from `obj`.
    #[must_use]
    pub fn current_placement(&self, obj: &GeometricObject, ctx: &ViewContext, scale: Scale) -> Placement {
        let object_bounds = obj.bounds_at(scale);
        let local = self.peek(&obj.id, scale).map_or(Point::default(), |e| e.local_origin);
        let world_origin = Point::new(object_bounds.min_x + local.x, object_bounds.min_y + local.y);
        Placement { object_bounds, world_origin, pixel_origin: ctx.world_to_pixel(world_origin, scale) }
    }

    /// Cached entry as stored, without validation.
    #[must_use]
    pub fn peek(&self, id: &ObjectId, scale: Scale) -> Option<&BitmapEntry<B>> {
        self.slots.peek(scale).and_then(|m| m.get(id))
    }

    /// Drop every bitmap for an object that left the store.
    pub fn forget_object(&mut self, id: &ObjectId) {
        for entries in self.slots.values_mut() {
            entries.remove(id);
        }
    }

    #[must_use]
    pub fn len_at(&self, scale: Scale) -> usize {
        self.slots.peek(scale).map_or(0, HashMap::len)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.values().map(HashMap::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of `render_fn` invocations since creation.
    #[must_use]
    pub fn renders(&self) -> u64 {
        self.renders
    }
}

impl<B> ScaleIndexed for BitmapCache<B> {
    fn cache_name(&self) -> &'static str {
        "bitmap"
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

//! Engine core: camera state, the object store, and every cache, driven by frames.
//!
//! DESIGN
//! ======
//! Camera mutations (`set_scale`, `zoom_by`, `pan_by`, `pan_to`,
//! `set_viewport`) are staged and only committed by [`EngineCore::begin_frame`],
//! before any query of that frame, so every classification in a frame sees
//! one `(scale, offset, viewport)` snapshot. Committing a change runs the
//! immediate eviction pass and reclassifies all objects at the new active
//! scale. The periodic sweep runs from [`EngineCore::end_frame`], between
//! frames.
//!
//! Object mutations go through the engine so each one routes its
//! invalidation explicitly: moves and resizes recompute active-scale
//! visibility, style changes bump the visual version that bitmap entries are
//! checked against, and removals drop the object from every cache.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::bitmap::{Bitmap, BitmapCache, Placement, RenderTarget};
use crate::camera::{Cell, Point, ViewContext, ViewportSize, cell_at};
use crate::config::CacheConfig;
use crate::doc::{DocStore, GeometricObject, ObjectId, Style};
use crate::eviction::{CacheSet, EvictionCoordinator, EvictionReport};
use crate::grid::{GridEntry, ResolutionGridCache};
use crate::scale::{Scale, ScaleError, ScaleIndexed};
use crate::visibility::{VisibilityCache, VisibilityEntry};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Scale(#[from] ScaleError),
    #[error("object not found: {0}")]
    UnknownObject(ObjectId),
}

/// Residency and counters for a debug panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub frame: u64,
    pub active_scale: Scale,
    pub offset: Point,
    pub objects: usize,
    pub grid_scales: Vec<Scale>,
    pub grid_bytes: usize,
    pub grid_builds: u64,
    pub visibility_scales: Vec<Scale>,
    pub visibility_entries: usize,
    pub visibility_recomputes: u64,
    pub bitmap_scales: Vec<Scale>,
    pub bitmap_entries: usize,
    pub bitmap_renders: u64,
    pub eviction_passes: u64,
}

#[derive(Debug, Clone, Copy)]
struct FrameState {
    index: u64,
    now: Instant,
    in_frame: bool,
}

/// Frame-driven owner of the camera, the object store, and all caches.
pub struct EngineCore<B = Bitmap> {
    doc: DocStore,
    view: ViewContext,
    pending: ViewContext,
    grid: ResolutionGridCache,
    visibility: VisibilityCache,
    bitmaps: BitmapCache<B>,
    eviction: EvictionCoordinator,
    frame: FrameState,
}

impl<B> Default for EngineCore<B> {
    fn default() -> Self {
        Self::new(CacheConfig::default(), ViewportSize::default())
    }
}

impl<B> EngineCore<B> {
    #[must_use]
    pub fn new(config: CacheConfig, viewport: ViewportSize) -> Self {
        let config = config.normalized();
        let view = ViewContext { viewport, ..ViewContext::default() };
        let now = Instant::now();
        Self {
            doc: DocStore::new(),
            view,
            pending: view,
            grid: ResolutionGridCache::new(viewport, config.grid_margin),
            visibility: VisibilityCache::new(),
            bitmaps: BitmapCache::new(),
            eviction: EvictionCoordinator::from_config(&config),
            frame: FrameState { index: 0, now, in_frame: false },
        }
    }

    // --- Camera (staged until the next frame) ---

    /// Stage a new active scale. The offset is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Scale`] when `raw` is outside `1..=100`; nothing is staged.
    pub fn set_scale(&mut self, raw: u32) -> Result<Scale, EngineError> {
        let scale = Scale::new(raw).inspect_err(|e| warn!(error = %e, "engine: rejected scale"))?;
        self.pending.scale = scale;
        Ok(scale)
    }

    /// Stage a zoom of `delta` levels relative to the staged scale.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Scale`] when the result leaves `1..=100`; nothing is staged.
    pub fn zoom_by(&mut self, delta: i64) -> Result<Scale, EngineError> {
        let scale = self
            .pending
            .scale
            .offset_by(delta)
            .inspect_err(|e| warn!(error = %e, delta, "engine: rejected zoom"))?;
        self.pending.scale = scale;
        Ok(scale)
    }

    /// Stage a pan by a world-space delta.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.pending.offset = Point::new(self.pending.offset.x + dx, self.pending.offset.y + dy);
    }

    /// Stage an absolute viewport offset.
    pub fn pan_to(&mut self, offset: Point) {
        self.pending.offset = offset;
    }

    /// Stage a new viewport size in pixels.
    pub fn set_viewport(&mut self, viewport: ViewportSize) {
        self.pending.viewport = viewport;
    }

    // --- Frame lifecycle ---

    /// Start a frame: commit staged camera changes and run the immediate eviction pass.
    ///
    /// Returns the eviction report when a change was committed.
    pub fn begin_frame(&mut self, now: Instant) -> Option<EvictionReport> {
        self.frame.index += 1;
        self.frame.now = now;
        self.frame.in_frame = true;

        if self.pending == self.view {
            return None;
        }
        let previous = self.view;
        self.view = self.pending;
        debug!(
            frame = self.frame.index,
            from = %previous.scale,
            to = %self.view.scale,
            offset_x = self.view.offset.x,
            offset_y = self.view.offset.y,
            "engine: camera committed"
        );
        if self.grid.set_viewport(self.view.viewport) {
            info!(width = self.view.viewport.width, height = self.view.viewport.height, "engine: viewport resized");
        }

        let report = self.eviction.on_scale_or_viewport_change_at(
            self.view.scale,
            CacheSet { grid: &mut self.grid, visibility: &mut self.visibility, bitmaps: &mut self.bitmaps },
            now,
        );
        for obj in self.doc.sorted_objects() {
            self.visibility.classify_at(obj, &self.view, self.view.scale, now);
        }
        Some(report)
    }

    /// Finish a frame and run the periodic sweep if it is due.
    pub fn end_frame(&mut self, now: Instant) -> Option<EvictionReport> {
        self.frame.in_frame = false;
        self.frame.now = now;
        self.eviction.sweep_if_due(
            CacheSet { grid: &mut self.grid, visibility: &mut self.visibility, bitmaps: &mut self.bitmaps },
            now,
        )
    }

    /// Start the periodic sweep. Calling it while running has no effect.
    pub fn start_sweeps(&mut self, now: Instant) {
        self.eviction.timer_mut().start(now);
    }

    /// Stop the periodic sweep. Calling it while stopped has no effect.
    pub fn stop_sweeps(&mut self) {
        self.eviction.timer_mut().stop();
    }

    #[must_use]
    pub fn in_frame(&self) -> bool {
        self.frame.in_frame
    }

    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.frame.index
    }

    // --- Objects ---

    /// Insert or replace an object. A replacement drops everything cached for the old one.
    pub fn insert_object(&mut self, obj: GeometricObject) -> ObjectId {
        let id = obj.id;
        if self.doc.get(&id).is_some() {
            self.forget(&id);
        }
        self.visibility.on_object_bounds_changed(&obj, &self.view, self.frame.now);
        self.doc.insert(obj);
        id
    }

    /// Replace the whole store, dropping caches for every previous object.
    pub fn load_snapshot(&mut self, objects: Vec<GeometricObject>) {
        let previous: Vec<ObjectId> = self.doc.ids().copied().collect();
        for id in &previous {
            self.forget(id);
        }
        self.doc.load_snapshot(objects);
    }

    /// Remove an object and everything cached for it.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownObject`] if the id is not in the store.
    pub fn remove_object(&mut self, id: &ObjectId) -> Result<GeometricObject, EngineError> {
        let obj = self.doc.remove(id).ok_or(EngineError::UnknownObject(*id))?;
        self.forget(id);
        Ok(obj)
    }

    /// Move an object by whole cells and recompute its active-scale visibility.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownObject`] if the id is not in the store.
    pub fn move_object(&mut self, id: &ObjectId, dx: i64, dy: i64) -> Result<VisibilityEntry, EngineError> {
        let obj = self.doc.get_mut(id).ok_or(EngineError::UnknownObject(*id))?;
        obj.translate(dx, dy);
        Ok(self.visibility.on_object_bounds_changed(obj, &self.view, self.frame.now))
    }

    /// Resize an object and recompute its active-scale visibility.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownObject`] if the id is not in the store.
    pub fn resize_object(&mut self, id: &ObjectId, width: i64, height: i64) -> Result<VisibilityEntry, EngineError> {
        let obj = self.doc.get_mut(id).ok_or(EngineError::UnknownObject(*id))?;
        obj.resize(width, height);
        Ok(self.visibility.on_object_bounds_changed(obj, &self.view, self.frame.now))
    }

    /// Replace an object's style. Returns `true` if the visual version changed.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownObject`] if the id is not in the store.
    pub fn restyle_object(&mut self, id: &ObjectId, style: Style) -> Result<bool, EngineError> {
        let obj = self.doc.get_mut(id).ok_or(EngineError::UnknownObject(*id))?;
        let changed = obj.set_style(style);
        if changed {
            // Stroke width feeds into bounds.
            self.visibility.on_object_bounds_changed(obj, &self.view, self.frame.now);
        }
        Ok(changed)
    }

    fn forget(&mut self, id: &ObjectId) {
        self.visibility.forget_object(id);
        self.bitmaps.forget_object(id);
    }

    // --- Queries ---

    /// Committed camera state for the current frame.
    #[must_use]
    pub fn view(&self) -> ViewContext {
        self.view
    }

    /// Camera state that the next frame will commit.
    #[must_use]
    pub fn pending_view(&self) -> ViewContext {
        self.pending
    }

    #[must_use]
    pub fn active_scale(&self) -> Scale {
        self.view.scale
    }

    #[must_use]
    pub fn object(&self, id: &ObjectId) -> Option<&GeometricObject> {
        self.doc.get(id)
    }

    #[must_use]
    pub fn doc(&self) -> &DocStore {
        &self.doc
    }

    /// World coordinate under a surface pixel.
    #[must_use]
    pub fn pixel_to_world(&self, pixel: Point) -> Point {
        self.view.pixel_to_world(pixel, self.view.scale)
    }

    /// Pixeloid under a surface pixel.
    #[must_use]
    pub fn cell_under(&self, pixel: Point) -> Cell {
        cell_at(self.pixel_to_world(pixel))
    }

    /// Visibility of an object at the active scale.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownObject`] if the id is not in the store.
    pub fn classify(&mut self, id: &ObjectId) -> Result<VisibilityEntry, EngineError> {
        self.classify_at_scale(id, self.view.scale)
    }

    /// Visibility of an object at any scale, under the committed offset and viewport.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownObject`] if the id is not in the store.
    pub fn classify_at_scale(&mut self, id: &ObjectId, scale: Scale) -> Result<VisibilityEntry, EngineError> {
        let obj = self.doc.get(id).ok_or(EngineError::UnknownObject(*id))?;
        Ok(self.visibility.classify_at(obj, &self.view, scale, self.frame.now))
    }

    /// Entries for every object with on-screen area at the active scale, in draw order.
    pub fn visible_objects(&mut self) -> Vec<VisibilityEntry> {
        let scale = self.view.scale;
        self.doc
            .sorted_objects()
            .into_iter()
            .map(|obj| self.visibility.classify_at(obj, &self.view, scale, self.frame.now))
            .filter(VisibilityEntry::is_visible)
            .collect()
    }

    /// Grid geometry for the active scale.
    pub fn grid(&mut self) -> &GridEntry {
        self.grid.ensure(self.view.scale, self.frame.now)
    }

    /// Grid geometry for a raw scale.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Scale`] when `raw` is outside `1..=100`.
    pub fn grid_at(&mut self, raw: u32) -> Result<&GridEntry, EngineError> {
        Ok(self.grid.get_or_create_at(raw, self.frame.now)?)
    }

    /// Bitmap for an object at the active scale, rendering if missing or stale.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownObject`] if the id is not in the store.
    pub fn mirror<F>(&mut self, id: &ObjectId, render_fn: F) -> Result<Option<&B>, EngineError>
    where
        F: FnOnce(&GeometricObject, &RenderTarget) -> B,
    {
        self.mirror_at_scale(id, self.view.scale, render_fn)
    }

    /// Bitmap for an object at any scale.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownObject`] if the id is not in the store.
    pub fn mirror_at_scale<F>(&mut self, id: &ObjectId, scale: Scale, render_fn: F) -> Result<Option<&B>, EngineError>
    where
        F: FnOnce(&GeometricObject, &RenderTarget) -> B,
    {
        let obj = self.doc.get(id).ok_or(EngineError::UnknownObject(*id))?;
        Ok(self.bitmaps.get_or_render_at(&mut self.visibility, obj, &self.view, scale, render_fn, self.frame.now))
    }

    /// Live placement of an object's bitmap at the active scale.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownObject`] if the id is not in the store.
    pub fn placement(&self, id: &ObjectId) -> Result<Placement, EngineError> {
        let obj = self.doc.get(id).ok_or(EngineError::UnknownObject(*id))?;
        Ok(self.bitmaps.current_placement(obj, &self.view, self.view.scale))
    }

    /// Read-only access to the caches, for inspection.
    #[must_use]
    pub fn grid_cache(&self) -> &ResolutionGridCache {
        &self.grid
    }

    #[must_use]
    pub fn visibility_cache(&self) -> &VisibilityCache {
        &self.visibility
    }

    #[must_use]
    pub fn bitmap_cache(&self) -> &BitmapCache<B> {
        &self.bitmaps
    }

    #[must_use]
    pub fn eviction(&self) -> &EvictionCoordinator {
        &self.eviction
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            frame: self.frame.index,
            active_scale: self.view.scale,
            offset: self.view.offset,
            objects: self.doc.len(),
            grid_scales: self.grid.resident_scales(),
            grid_bytes: self.grid.byte_size(),
            grid_builds: self.grid.builds(),
            visibility_scales: self.visibility.resident_scales(),
            visibility_entries: self.visibility.len(),
            visibility_recomputes: self.visibility.recomputes(),
            bitmap_scales: self.bitmaps.resident_scales(),
            bitmap_entries: self.bitmaps.len(),
            bitmap_renders: self.bitmaps.renders(),
            eviction_passes: self.eviction.passes(),
        }
    }
}

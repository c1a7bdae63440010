//! Resolution grid cache: per-scale grid line geometry.
//!
//! DESIGN
//! ======
//! At scale `s` the viewport spans `width / s` by `height / s` pixeloid cells.
//! Each entry holds line-list geometry (two vertices per grid line, `u32`
//! indices) for that span plus a margin on every side, so a pan smaller than
//! the margin only shifts the draw transform and never regenerates buffers.
//! Line endpoints are in cell units with the viewport's top-left cell at the
//! origin. Cell counts are capped per axis, so no viewport size can make a
//! build overflow or allocate without bound.
//!
//! Entries are regenerated wholesale, never patched: a viewport resize makes
//! every entry stale, and the next access to a stale scale rebuilds it.

#[cfg(test)]
#[path = "grid_test.rs"]
mod grid_test;

use std::time::Instant;

use tracing::debug;

use crate::camera::{Point, ViewportSize};
use crate::consts::MAX_GRID_CELLS;
use crate::scale::{Scale, ScaleError, ScaleIndexed, ScaleSlots};

/// Grid geometry for one scale.
#[derive(Debug, Clone, PartialEq)]
pub struct GridEntry {
    /// Scale the geometry was built for.
    pub scale: Scale,
    /// Viewport the geometry was sized to.
    pub viewport: ViewportSize,
    /// Vertex cells covering the viewport horizontally.
    pub visible_cols: u32,
    /// Vertex cells covering the viewport vertically.
    pub visible_rows: u32,
    /// Extra cells on the left and right edges.
    pub pad_cols: u32,
    /// Extra cells on the top and bottom edges.
    pub pad_rows: u32,
    /// Line endpoints in vertex space.
    pub vertices: Vec<[f32; 2]>,
    /// Line-list indices into `vertices`.
    pub indices: Vec<u32>,
}

impl GridEntry {
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn build(scale: Scale, viewport: ViewportSize, margin: f64) -> Self {
        let s = scale.as_f64();
        let visible_cols = cells(viewport.width / s);
        let visible_rows = cells(viewport.height / s);
        // Margin is split evenly between opposite edges.
        let pad_cols = cells(f64::from(visible_cols) * margin / 2.0);
        let pad_rows = cells(f64::from(visible_rows) * margin / 2.0);
        let total_cols = visible_cols.saturating_add(pad_cols.saturating_mul(2));
        let total_rows = visible_rows.saturating_add(pad_rows.saturating_mul(2));

        let left = -f64::from(pad_cols) as f32;
        let right = f64::from(visible_cols.saturating_add(pad_cols)) as f32;
        let top = -f64::from(pad_rows) as f32;
        let bottom = f64::from(visible_rows.saturating_add(pad_rows)) as f32;

        let line_count = total_cols as usize + 1 + total_rows as usize + 1;
        let mut vertices = Vec::with_capacity(line_count * 2);
        for i in 0..=total_cols {
            let x = left + i as f32;
            vertices.push([x, top]);
            vertices.push([x, bottom]);
        }
        for j in 0..=total_rows {
            let y = top + j as f32;
            vertices.push([left, y]);
            vertices.push([right, y]);
        }
        let indices = (0..u32::try_from(vertices.len()).unwrap_or(u32::MAX)).collect();

        Self { scale, viewport, visible_cols, visible_rows, pad_cols, pad_rows, vertices, indices }
    }

    /// Columns including the margin on both sides.
    #[must_use]
    pub fn total_cols(&self) -> u32 {
        self.visible_cols.saturating_add(self.pad_cols.saturating_mul(2))
    }

    /// Rows including the margin on both sides.
    #[must_use]
    pub fn total_rows(&self) -> u32 {
        self.visible_rows.saturating_add(self.pad_rows.saturating_mul(2))
    }

    /// Whether a pan of `delta` vertex units stays inside the margin.
    #[must_use]
    pub fn covers_pan(&self, delta: Point) -> bool {
        delta.x.abs() <= f64::from(self.pad_cols) && delta.y.abs() <= f64::from(self.pad_rows)
    }

    /// Approximate buffer footprint in bytes.
    #[must_use]
    pub fn byte_size(&self) -> usize {
        self.vertices.len() * std::mem::size_of::<[f32; 2]>() + self.indices.len() * std::mem::size_of::<u32>()
    }
}

/// Whole cells covering `span`, capped at [`MAX_GRID_CELLS`]. Non-finite spans count as zero.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn cells(span: f64) -> u32 {
    if !span.is_finite() || span <= 0.0 {
        return 0;
    }
    span.ceil().min(f64::from(MAX_GRID_CELLS)) as u32
}

/// Per-scale cache of [`GridEntry`] geometry.
#[derive(Debug)]
pub struct ResolutionGridCache {
    slots: ScaleSlots<GridEntry>,
    viewport: ViewportSize,
    margin: f64,
    builds: u64,
}

impl ResolutionGridCache {
    /// `margin` is the fraction by which entries are oversized, clamped to `[0, 1]`.
    #[must_use]
    pub fn new(viewport: ViewportSize, margin: f64) -> Self {
        Self { slots: ScaleSlots::new(), viewport, margin: margin.clamp(0.0, 1.0), builds: 0 }
    }

    #[must_use]
    pub fn viewport(&self) -> ViewportSize {
        self.viewport
    }

    /// Record a new viewport size. Returns `true` if it differs from the old one.
    ///
    /// Existing entries are kept but become stale; each is rebuilt on its next access.
    pub fn set_viewport(&mut self, viewport: ViewportSize) -> bool {
        if self.viewport == viewport {
            return false;
        }
        debug!(width = viewport.width, height = viewport.height, "grid: viewport changed");
        self.viewport = viewport;
        true
    }

    /// Fetch the entry for a raw scale, building it on a miss.
    ///
    /// # Errors
    ///
    /// Returns [`ScaleError::OutOfRange`] when `scale` is outside `1..=100`.
    pub fn get_or_create(&mut self, scale: u32) -> Result<&GridEntry, ScaleError> {
        self.get_or_create_at(scale, Instant::now())
    }

    /// [`Self::get_or_create`] with an explicit access time.
    ///
    /// # Errors
    ///
    /// Returns [`ScaleError::OutOfRange`] when `scale` is outside `1..=100`.
    pub fn get_or_create_at(&mut self, scale: u32, now: Instant) -> Result<&GridEntry, ScaleError> {
        let scale = Scale::new(scale)?;
        Ok(self.ensure(scale, now))
    }

    /// Fetch the entry for a validated scale, building or rebuilding it as needed.
    pub fn ensure(&mut self, scale: Scale, now: Instant) -> &GridEntry {
        let fresh = self.slots.peek(scale).is_some_and(|e| e.viewport == self.viewport);
        if !fresh {
            let entry = GridEntry::build(scale, self.viewport, self.margin);
            debug!(
                %scale,
                cols = entry.total_cols(),
                rows = entry.total_rows(),
                bytes = entry.byte_size(),
                "grid: built entry"
            );
            self.builds += 1;
            self.slots.insert(scale, entry, now);
        }
        self.slots.get_or_insert_with(scale, now, || GridEntry::build(scale, self.viewport, self.margin))
    }

    /// Read an entry without building or touching it.
    #[must_use]
    pub fn peek(&self, scale: Scale) -> Option<&GridEntry> {
        self.slots.peek(scale)
    }

    #[must_use]
    pub fn contains(&self, scale: Scale) -> bool {
        self.slots.contains(scale)
    }

    /// Total number of entry builds since creation.
    #[must_use]
    pub fn builds(&self) -> u64 {
        self.builds
    }

    /// Summed buffer footprint of all resident entries.
    #[must_use]
    pub fn byte_size(&self) -> usize {
        self.slots.values().map(GridEntry::byte_size).sum()
    }
}

impl ScaleIndexed for ResolutionGridCache {
    fn cache_name(&self) -> &'static str {
        "grid"
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

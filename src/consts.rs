//! Shared numeric constants for the pixeloid crate.

// ── Scale ───────────────────────────────────────────────────────

/// Smallest valid zoom level (one pixel per world unit).
pub const MIN_SCALE: u32 = 1;

/// Largest valid zoom level.
pub const MAX_SCALE: u32 = 100;

/// Scales that are never evicted from any cache.
pub const CRITICAL_SCALES: [u32; 2] = [1, 2];

// ── Eviction ────────────────────────────────────────────────────

/// Scales further than this from the active scale are evicted immediately.
pub const DEFAULT_EVICT_DISTANCE: u32 = 4;

/// Scales within this distance of the active scale are exempt from idle eviction.
pub const DEFAULT_KEEP_WINDOW: u32 = 1;

/// Idle time after which a scale outside the keep window is evicted, in seconds.
pub const DEFAULT_IDLE_TTL_SECS: u64 = 60;

/// Interval between periodic sweeps, in milliseconds.
pub const DEFAULT_SWEEP_INTERVAL_MS: u64 = 5_000;

// ── Grid ────────────────────────────────────────────────────────

/// Fraction by which grid geometry is oversized relative to the viewport.
pub const DEFAULT_GRID_MARGIN: f64 = 0.2;

/// Upper bound on visible grid cells per axis, whatever the viewport reports.
pub const MAX_GRID_CELLS: u32 = 16_384;

// ── Viewport ────────────────────────────────────────────────────

/// Largest viewport dimension accepted, in pixels.
pub const MAX_VIEWPORT_PX: f64 = 16_384.0;

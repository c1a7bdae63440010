//! Coordinate mapping and scale-indexed caches for a zoomable pixeloid canvas.
//!
//! The world is an integer grid of cells (pixeloids). At any moment exactly one
//! integer scale in `1..=100` is active, and a single viewport offset ties the
//! world to the rendering grid. This crate owns the mapping between pixel,
//! vertex, and world coordinates, and keeps three derived caches correct and
//! memory-bounded while the user zooms and pans: per-scale grid geometry,
//! per-object visibility, and per-object rendered bitmaps. Drawing, input
//! devices, and UI live outside; they consume the query APIs exposed here.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Frame-driven [`engine::EngineCore`] that owns camera state and all caches |
//! | [`camera`] | Points, cells, viewport context, and coordinate conversions |
//! | [`bounds`] | Axis-aligned world rectangles |
//! | [`scale`] | Validated [`scale::Scale`] and the per-scale slot arena |
//! | [`doc`] | Geometric objects, shapes, styles, and the in-memory store |
//! | [`grid`] | Per-scale grid geometry cache |
//! | [`visibility`] | Per-object, per-scale on-screen classification and clipping |
//! | [`bitmap`] | Per-object, per-scale rendered bitmap ("mirror") cache |
//! | [`eviction`] | Eviction policy, sweep timer, and the coordinator that applies them |
//! | [`config`] | Tunable cache configuration loaded from the environment |
//! | [`consts`] | Shared numeric constants (scale limits, policy defaults) |

pub mod bitmap;
pub mod bounds;
pub mod camera;
pub mod config;
pub mod consts;
pub mod doc;
pub mod engine;
pub mod eviction;
pub mod grid;
pub mod scale;
pub mod visibility;

//! Validated zoom levels and the per-scale slot arena every cache is built on.
//!
//! DESIGN
//! ======
//! `Scale` can only be constructed inside `MIN_SCALE..=MAX_SCALE`, so an
//! out-of-range zoom is rejected once at the API boundary and cannot reach a
//! cache. `ScaleSlots<T>` stores one value per resident scale together with
//! its creation and last-access instants; eviction reads those instants and
//! removes whole scales at a time.

#[cfg(test)]
#[path = "scale_test.rs"]
mod scale_test;

use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

use serde::Serialize;

use crate::consts::{CRITICAL_SCALES, MAX_SCALE, MIN_SCALE};

// =============================================================================
// SCALE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ScaleError {
    #[error("invalid scale {scale}: expected 1..=100")]
    OutOfRange { scale: i64 },
}

/// A zoom level: screen pixels per world unit and per grid vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Scale(u32);

impl Scale {
    pub const MIN: Scale = Scale(MIN_SCALE);
    pub const MAX: Scale = Scale(MAX_SCALE);

    /// Validate a raw zoom level.
    ///
    /// # Errors
    ///
    /// Returns [`ScaleError::OutOfRange`] when `raw` is outside `1..=100`.
    pub fn new(raw: u32) -> Result<Self, ScaleError> {
        if (MIN_SCALE..=MAX_SCALE).contains(&raw) {
            Ok(Self(raw))
        } else {
            Err(ScaleError::OutOfRange { scale: i64::from(raw) })
        }
    }

    /// Clamp any integer into the valid range.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn clamped(raw: i64) -> Self {
        Self(raw.clamp(i64::from(MIN_SCALE), i64::from(MAX_SCALE)) as u32)
    }

    /// Step by `delta` levels, rejecting results outside the valid range.
    ///
    /// # Errors
    ///
    /// Returns [`ScaleError::OutOfRange`] when the stepped value is invalid.
    pub fn offset_by(self, delta: i64) -> Result<Self, ScaleError> {
        let target = i64::from(self.0) + delta;
        u32::try_from(target)
            .map_err(|_| ScaleError::OutOfRange { scale: target })
            .and_then(Self::new)
    }

    #[must_use]
    pub fn get(self) -> u32 {
        self.0
    }

    #[must_use]
    pub fn as_f64(self) -> f64 {
        f64::from(self.0)
    }

    /// Absolute distance in zoom levels.
    #[must_use]
    pub fn distance(self, other: Scale) -> u32 {
        self.0.abs_diff(other.0)
    }

    /// Whether this scale is exempt from eviction regardless of policy.
    #[must_use]
    pub fn is_critical(self) -> bool {
        CRITICAL_SCALES.contains(&self.0)
    }

    /// The critical scales as validated values.
    #[must_use]
    pub fn critical() -> [Scale; 2] {
        CRITICAL_SCALES.map(Scale)
    }
}

impl TryFrom<u32> for Scale {
    type Error = ScaleError;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.0)
    }
}

// =============================================================================
// SLOTS
// =============================================================================

#[derive(Debug, Clone)]
struct Slot<T> {
    value: T,
    created_at: Instant,
    last_access: Instant,
}

/// One value per resident scale, with access bookkeeping for eviction.
#[derive(Debug, Clone)]
pub struct ScaleSlots<T> {
    slots: BTreeMap<Scale, Slot<T>>,
}

impl<T> Default for ScaleSlots<T> {
    fn default() -> Self {
        Self { slots: BTreeMap::new() }
    }
}

impl<T> ScaleSlots<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read without touching the access time.
    #[must_use]
    pub fn peek(&self, scale: Scale) -> Option<&T> {
        self.slots.get(&scale).map(|s| &s.value)
    }

    /// Mutable access that records `now` as the last access.
    pub fn touch(&mut self, scale: Scale, now: Instant) -> Option<&mut T> {
        self.slots.get_mut(&scale).map(|s| {
            s.last_access = now;
            &mut s.value
        })
    }

    /// Fetch the slot for `scale`, creating it with `make` on a miss.
    pub fn get_or_insert_with(&mut self, scale: Scale, now: Instant, make: impl FnOnce() -> T) -> &mut T {
        let slot = self
            .slots
            .entry(scale)
            .or_insert_with(|| Slot { value: make(), created_at: now, last_access: now });
        slot.last_access = now;
        &mut slot.value
    }

    /// Insert or replace the value for `scale`. A replacement keeps the original creation time.
    pub fn insert(&mut self, scale: Scale, value: T, now: Instant) {
        let created_at = self.slots.get(&scale).map_or(now, |s| s.created_at);
        self.slots.insert(scale, Slot { value, created_at, last_access: now });
    }

    pub fn remove(&mut self, scale: Scale) -> Option<T> {
        self.slots.remove(&scale).map(|s| s.value)
    }

    #[must_use]
    pub fn contains(&self, scale: Scale) -> bool {
        self.slots.contains_key(&scale)
    }

    /// Resident scales in ascending order.
    #[must_use]
    pub fn scales(&self) -> Vec<Scale> {
        self.slots.keys().copied().collect()
    }

    #[must_use]
    pub fn last_access(&self, scale: Scale) -> Option<Instant> {
        self.slots.get(&scale).map(|s| s.last_access)
    }

    #[must_use]
    pub fn created_at(&self, scale: Scale) -> Option<Instant> {
        self.slots.get(&scale).map(|s| s.created_at)
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.slots.values().map(|s| &s.value)
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.slots.values_mut().map(|s| &mut s.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Scale, &T)> {
        self.slots.iter().map(|(k, s)| (*k, &s.value))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }
}

// =============================================================================
// EVICTION SEAM
// =============================================================================

/// A cache whose contents are partitioned by scale and can be evicted one scale at a time.
pub trait ScaleIndexed {
    /// Short name used in logs and reports.
    fn cache_name(&self) -> &'static str;

    /// Scales currently holding data, ascending.
    fn resident_scales(&self) -> Vec<Scale>;

    /// When any entry at `scale` was last read or written.
    fn last_access(&self, scale: Scale) -> Option<Instant>;

    /// Drop everything cached at `scale`. Returns `true` if anything was removed.
    fn evict_scale(&mut self, scale: Scale) -> bool;
}

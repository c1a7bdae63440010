//! Cache tuning parsed from environment variables.
//!
//! The distance and time constants of the eviction policy are tunable, not
//! contract. Defaults live in [`crate::consts`]; any variable that is missing
//! or fails to parse falls back to its default.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::time::Duration;

use crate::consts::{
    DEFAULT_EVICT_DISTANCE, DEFAULT_GRID_MARGIN, DEFAULT_IDLE_TTL_SECS, DEFAULT_KEEP_WINDOW, DEFAULT_SWEEP_INTERVAL_MS,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheConfig {
    /// Scales further than this from the active scale are evicted immediately.
    pub distance_threshold: u32,
    /// Scales this close to the active scale are exempt from idle eviction.
    pub keep_window: u32,
    /// Idle time after which a scale outside the keep window is evicted.
    pub idle_ttl: Duration,
    /// Time between periodic sweeps.
    pub sweep_interval: Duration,
    /// Fraction by which grid geometry is oversized, in `[0, 1]`.
    pub grid_margin: f64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            distance_threshold: DEFAULT_EVICT_DISTANCE,
            keep_window: DEFAULT_KEEP_WINDOW,
            idle_ttl: Duration::from_secs(DEFAULT_IDLE_TTL_SECS),
            sweep_interval: Duration::from_millis(DEFAULT_SWEEP_INTERVAL_MS),
            grid_margin: DEFAULT_GRID_MARGIN,
        }
    }
}

impl CacheConfig {
    /// Build config from environment variables.
    ///
    /// Optional:
    /// - `PIXELOID_EVICT_DISTANCE`: default 4
    /// - `PIXELOID_EVICT_KEEP_WINDOW`: default 1
    /// - `PIXELOID_EVICT_IDLE_SECS`: default 60
    /// - `PIXELOID_SWEEP_INTERVAL_MS`: default 5000
    /// - `PIXELOID_GRID_MARGIN`: default 0.2
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            distance_threshold: env_parse("PIXELOID_EVICT_DISTANCE", DEFAULT_EVICT_DISTANCE),
            keep_window: env_parse("PIXELOID_EVICT_KEEP_WINDOW", DEFAULT_KEEP_WINDOW),
            idle_ttl: Duration::from_secs(env_parse("PIXELOID_EVICT_IDLE_SECS", DEFAULT_IDLE_TTL_SECS)),
            sweep_interval: Duration::from_millis(env_parse("PIXELOID_SWEEP_INTERVAL_MS", DEFAULT_SWEEP_INTERVAL_MS)),
            grid_margin: env_parse("PIXELOID_GRID_MARGIN", DEFAULT_GRID_MARGIN),
        }
        .normalized()
    }

    /// Clamp fields into their usable ranges.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.grid_margin = if self.grid_margin.is_finite() { self.grid_margin.clamp(0.0, 1.0) } else { DEFAULT_GRID_MARGIN };
        self.distance_threshold = self.distance_threshold.max(self.keep_window);
        self
    }
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}

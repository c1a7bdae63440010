//! Eviction: the policy that bounds every per-scale cache, and the coordinator that applies it.
//!
//! DESIGN
//! ======
//! One policy is shared by the grid, visibility, and bitmap caches and is
//! applied to each of them independently:
//! - Scales 1 and 2 and the active scale are never evicted.
//! - A scale further than `distance_threshold` from the active scale is
//!   evicted on the pass that follows the scale change, so a large zoom jump
//!   releases memory in one step.
//! - A scale within the threshold but outside the keep window (active ± 1)
//!   is evicted once idle for longer than `idle_ttl`. Only the periodic sweep
//!   checks idleness.
//!
//! The verdict is a pure function of `(scale, active, idle time)` so it can be
//! tested without any cache.
//!
//! The sweep runs at frame boundaries only, never mid-frame, so it cannot
//! remove an entry the current render pass still holds.

#[cfg(test)]
#[path = "eviction_test.rs"]
mod eviction_test;

use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info};

use crate::bitmap::BitmapCache;
use crate::config::CacheConfig;
use crate::grid::ResolutionGridCache;
use crate::scale::{Scale, ScaleIndexed};
use crate::visibility::VisibilityCache;

// =============================================================================
// POLICY
// =============================================================================

/// Which checks a pass applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    /// Triggered by a scale, pan, or resize change. Distance only.
    Immediate,
    /// Periodic cleanup. Distance and idle time.
    Sweep,
}

/// Outcome of the policy for one resident scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Scale 1, scale 2, or the active scale.
    Protected,
    /// Within the keep window, or not idle long enough.
    Keep,
    /// Further than the distance threshold from the active scale.
    EvictDistance,
    /// Outside the keep window and idle past the time limit.
    EvictIdle,
}

impl Verdict {
    #[must_use]
    pub fn evicts(self) -> bool {
        matches!(self, Self::EvictDistance | Self::EvictIdle)
    }
}

/// Combined distance and time policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvictionPolicy {
    pub distance_threshold: u32,
    pub keep_window: u32,
    pub idle_ttl: Duration,
}

impl Default for EvictionPolicy {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

impl EvictionPolicy {
    #[must_use]
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            distance_threshold: config.distance_threshold,
            keep_window: config.keep_window,
            idle_ttl: config.idle_ttl,
        }
    }

    /// Decide the fate of `scale` while `active` is the active scale.
    ///
    /// `idle_for` is how long the scale has gone unused; it is only consulted
    /// by [`PassKind::Sweep`].
    #[must_use]
    pub fn verdict(&self, scale: Scale, active: Scale, idle_for: Duration, kind: PassKind) -> Verdict {
        if scale.is_critical() || scale == active {
            return Verdict::Protected;
        }
        let distance = scale.distance(active);
        if distance > self.distance_threshold {
            return Verdict::EvictDistance;
        }
        if kind == PassKind::Sweep && distance > self.keep_window && idle_for > self.idle_ttl {
            return Verdict::EvictIdle;
        }
        Verdict::Keep
    }
}

// =============================================================================
// SWEEP TIMER
// =============================================================================

/// Periodic trigger for the slow cleanup sweep. Start and stop are idempotent.
#[derive(Debug, Clone)]
pub struct SweepTimer {
    interval: Duration,
    running: bool,
    last_run: Option<Instant>,
}

impl SweepTimer {
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self { interval, running: false, last_run: None }
    }

    /// Begin scheduling sweeps. The first one is due one interval after `now`.
    pub fn start(&mut self, now: Instant) {
        if self.running {
            return;
        }
        self.running = true;
        self.last_run = Some(now);
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether a sweep should run at `now`.
    #[must_use]
    pub fn is_due(&self, now: Instant) -> bool {
        self.running && self.last_run.is_none_or(|last| now.saturating_duration_since(last) >= self.interval)
    }

    fn mark_run(&mut self, now: Instant) {
        self.last_run = Some(now);
    }
}

// =============================================================================
// COORDINATOR
// =============================================================================

/// Mutable view of the three caches a pass walks.
pub struct CacheSet<'a, B> {
    pub grid: &'a mut ResolutionGridCache,
    pub visibility: &'a mut VisibilityCache,
    pub bitmaps: &'a mut BitmapCache<B>,
}

/// One scale removed from one cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Eviction {
    pub cache: &'static str,
    pub scale: Scale,
    pub verdict: Verdict,
}

/// Everything a single pass removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EvictionReport {
    pub evicted: Vec<Eviction>,
}

impl EvictionReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.evicted.is_empty()
    }

    /// Scales removed from the named cache, ascending.
    #[must_use]
    pub fn scales_for(&self, cache: &str) -> Vec<Scale> {
        let mut scales: Vec<Scale> = self.evicted.iter().filter(|e| e.cache == cache).map(|e| e.scale).collect();
        scales.sort_unstable();
        scales
    }
}

/// Applies [`EvictionPolicy`] to every cache on camera changes and on the sweep timer.
#[derive(Debug, Clone)]
pub struct EvictionCoordinator {
    policy: EvictionPolicy,
    timer: SweepTimer,
    active: Scale,
    passes: u64,
}

impl EvictionCoordinator {
    #[must_use]
    pub fn new(policy: EvictionPolicy, sweep_interval: Duration) -> Self {
        Self { policy, timer: SweepTimer::new(sweep_interval), active: Scale::MIN, passes: 0 }
    }

    #[must_use]
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(EvictionPolicy::from_config(config), config.sweep_interval)
    }

    #[must_use]
    pub fn policy(&self) -> &EvictionPolicy {
        &self.policy
    }

    #[must_use]
    pub fn active(&self) -> Scale {
        self.active
    }

    #[must_use]
    pub fn passes(&self) -> u64 {
        self.passes
    }

    pub fn timer_mut(&mut self) -> &mut SweepTimer {
        &mut self.timer
    }

    #[must_use]
    pub fn timer(&self) -> &SweepTimer {
        &self.timer
    }

    /// Run the immediate pass after the active scale, offset, or viewport changed.
    ///
    /// Afterwards the grid cache holds entries for scales 1, 2, and `new_scale`.
    pub fn on_scale_or_viewport_change<B>(&mut self, new_scale: Scale, caches: CacheSet<'_, B>) -> EvictionReport {
        self.on_scale_or_viewport_change_at(new_scale, caches, Instant::now())
    }

    /// [`Self::on_scale_or_viewport_change`] with an explicit time.
    pub fn on_scale_or_viewport_change_at<B>(
        &mut self,
        new_scale: Scale,
        caches: CacheSet<'_, B>,
        now: Instant,
    ) -> EvictionReport {
        self.active = new_scale;
        self.run(PassKind::Immediate, caches, now)
    }

    /// Run the periodic sweep if the timer says one is due.
    pub fn sweep_if_due<B>(&mut self, caches: CacheSet<'_, B>, now: Instant) -> Option<EvictionReport> {
        if !self.timer.is_due(now) {
            return None;
        }
        self.timer.mark_run(now);
        Some(self.run(PassKind::Sweep, caches, now))
    }

    /// Run a sweep unconditionally.
    pub fn sweep_at<B>(&mut self, caches: CacheSet<'_, B>, now: Instant) -> EvictionReport {
        self.run(PassKind::Sweep, caches, now)
    }

    fn run<B>(&mut self, kind: PassKind, caches: CacheSet<'_, B>, now: Instant) -> EvictionReport {
        let CacheSet { grid, visibility, bitmaps } = caches;
        let mut report = EvictionReport::default();
        {
            let targets: [&mut dyn ScaleIndexed; 3] = [&mut *grid, visibility, bitmaps];
            for cache in targets {
                self.apply(kind, cache, now, &mut report);
            }
        }

        for scale in Scale::critical().into_iter().chain([self.active]) {
            grid.ensure(scale, now);
        }

        self.passes += 1;
        if report.is_empty() {
            debug!(?kind, active = %self.active, "eviction: pass removed nothing");
        } else {
            info!(?kind, active = %self.active, evicted = report.evicted.len(), "eviction: pass complete");
        }
        report
    }

    fn apply(&self, kind: PassKind, cache: &mut dyn ScaleIndexed, now: Instant, report: &mut EvictionReport) {
        for scale in cache.resident_scales() {
            let idle_for = cache
                .last_access(scale)
                .map_or(Duration::ZERO, |t| now.saturating_duration_since(t));
            let verdict = self.policy.verdict(scale, self.active, idle_for, kind);
            if verdict.evicts() && cache.evict_scale(scale) {
                debug!(cache = cache.cache_name(), %scale, ?verdict, "eviction: removed scale");
                report.evicted.push(Eviction { cache: cache.cache_name(), scale, verdict });
            }
        }
    }
}

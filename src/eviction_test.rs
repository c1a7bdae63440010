use crate::bitmap::{Bitmap, RenderTarget};
use crate::camera::{Cell, Point, ViewContext, ViewportSize};
use crate::doc::{GeometricObject, Shape, Style};

use super::*;

fn scale(raw: u32) -> Scale {
    Scale::new(raw).unwrap()
}

fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

fn render(_: &GeometricObject, t: &RenderTarget) -> Bitmap {
    Bitmap::blank(t.width, t.height)
}

struct Caches {
    grid: ResolutionGridCache,
    visibility: VisibilityCache,
    bitmaps: BitmapCache,
    obj: GeometricObject,
    ctx: ViewContext,
}

impl Caches {
    fn new() -> Self {
        let viewport = ViewportSize::new(800.0, 600.0);
        Self {
            grid: ResolutionGridCache::new(viewport, 0.2),
            visibility: VisibilityCache::new(),
            bitmaps: BitmapCache::new(),
            obj: GeometricObject::new(
                Shape::Rectangle { origin: Cell::new(10, 10), width: 4, height: 4 },
                Style::default(),
            ),
            ctx: ViewContext::new(Scale::MIN, Point::default(), viewport),
        }
    }

    /// Touch every cache at each of `scales` at time `now`.
    fn fill(&mut self, scales: &[u32], now: Instant) {
        for &raw in scales {
            let s = scale(raw);
            self.grid.ensure(s, now);
            self.bitmaps.get_or_render_at(&mut self.visibility, &self.obj, &self.ctx, s, render, now);
        }
    }

    fn set(&mut self) -> CacheSet<'_, Bitmap> {
        CacheSet { grid: &mut self.grid, visibility: &mut self.visibility, bitmaps: &mut self.bitmaps }
    }

    fn resident(&self) -> [Vec<u32>; 3] {
        let raw = |v: Vec<Scale>| v.into_iter().map(Scale::get).collect::<Vec<_>>();
        [
            raw(self.grid.resident_scales()),
            raw(self.visibility.resident_scales()),
            raw(self.bitmaps.resident_scales()),
        ]
    }
}

fn coordinator() -> EvictionCoordinator {
    EvictionCoordinator::from_config(&CacheConfig::default())
}

// =============================================================
// Policy
// =============================================================

#[test]
fn critical_and_active_are_protected() {
    let p = EvictionPolicy::default();
    let active = scale(60);
    for raw in [1, 2, 60] {
        for kind in [PassKind::Immediate, PassKind::Sweep] {
            assert_eq!(p.verdict(scale(raw), active, secs(3_600), kind), Verdict::Protected);
        }
    }
}

#[test]
fn beyond_threshold_is_evicted_on_any_pass() {
    let p = EvictionPolicy::default();
    let active = scale(10);
    assert_eq!(p.verdict(scale(15), active, Duration::ZERO, PassKind::Immediate), Verdict::EvictDistance);
    assert_eq!(p.verdict(scale(5), active, Duration::ZERO, PassKind::Sweep), Verdict::EvictDistance);
}

#[test]
fn at_threshold_is_kept() {
    let p = EvictionPolicy::default();
    assert_eq!(p.verdict(scale(14), scale(10), Duration::ZERO, PassKind::Immediate), Verdict::Keep);
}

#[test]
fn idle_only_counts_on_sweeps() {
    let p = EvictionPolicy::default();
    let active = scale(10);
    assert_eq!(p.verdict(scale(12), active, secs(61), PassKind::Immediate), Verdict::Keep);
    assert_eq!(p.verdict(scale(12), active, secs(61), PassKind::Sweep), Verdict::EvictIdle);
    assert_eq!(p.verdict(scale(12), active, secs(59), PassKind::Sweep), Verdict::Keep);
}

#[test]
fn keep_window_is_exempt_from_idle() {
    let p = EvictionPolicy::default();
    assert_eq!(p.verdict(scale(11), scale(10), secs(10_000), PassKind::Sweep), Verdict::Keep);
    assert_eq!(p.verdict(scale(9), scale(10), secs(10_000), PassKind::Sweep), Verdict::Keep);
}

#[test]
fn verdict_evicts_flag() {
    assert!(Verdict::EvictDistance.evicts());
    assert!(Verdict::EvictIdle.evicts());
    assert!(!Verdict::Keep.evicts());
    assert!(!Verdict::Protected.evicts());
}

// =============================================================
// SweepTimer
// =============================================================

#[test]
fn timer_not_due_until_started() {
    let timer = SweepTimer::new(secs(5));
    assert!(!timer.is_running());
    assert!(!timer.is_due(Instant::now()));
}

#[test]
fn timer_due_after_interval() {
    let t0 = Instant::now();
    let mut timer = SweepTimer::new(secs(5));
    timer.start(t0);
    assert!(!timer.is_due(t0 + secs(4)));
    assert!(timer.is_due(t0 + secs(5)));
}

#[test]
fn timer_start_is_idempotent() {
    let t0 = Instant::now();
    let mut timer = SweepTimer::new(secs(5));
    timer.start(t0);
    timer.start(t0 + secs(4));
    // Second start did not push the schedule back.
    assert!(timer.is_due(t0 + secs(5)));
}

#[test]
fn timer_stop_is_idempotent() {
    let t0 = Instant::now();
    let mut timer = SweepTimer::new(secs(5));
    timer.stop();
    timer.start(t0);
    timer.stop();
    timer.stop();
    assert!(!timer.is_running());
    assert!(!timer.is_due(t0 + secs(60)));
}

// =============================================================
// Coordinator
// =============================================================

#[test]
fn large_zoom_jump_evicts_in_one_pass() {
    let t0 = Instant::now();
    let mut caches = Caches::new();
    let mut coord = coordinator();
    coord.on_scale_or_viewport_change_at(scale(10), caches.set(), t0);
    caches.fill(&[1, 2, 8, 9, 10, 11, 12, 14], t0);

    let report = coord.on_scale_or_viewport_change_at(scale(50), caches.set(), t0 + secs(1));
    let gone = [8, 9, 10, 11, 12, 14].map(scale).to_vec();
    assert_eq!(report.scales_for("grid"), gone);
    assert_eq!(report.scales_for("visibility"), gone);
    assert_eq!(report.scales_for("bitmap"), gone);
    assert!(report.evicted.iter().all(|e| e.verdict == Verdict::EvictDistance));

    let [grid, vis, bmp] = caches.resident();
    assert_eq!(grid, vec![1, 2, 50]);
    assert_eq!(vis, vec![1, 2]);
    assert_eq!(bmp, vec![1, 2]);
    assert_eq!(coord.active(), scale(50));
}

#[test]
fn immediate_pass_ignores_idle_time() {
    let t0 = Instant::now();
    let mut caches = Caches::new();
    let mut coord = coordinator();
    caches.fill(&[7, 8, 14, 15], t0);

    let report = coord.on_scale_or_viewport_change_at(scale(10), caches.set(), t0 + secs(3_600));
    assert_eq!(report.scales_for("bitmap"), vec![scale(15)]);
    let [_, vis, _] = caches.resident();
    assert_eq!(vis, vec![7, 8, 14]);
}

#[test]
fn pass_warms_protected_grid_entries() {
    let mut caches = Caches::new();
    let mut coord = coordinator();
    assert!(caches.grid.resident_scales().is_empty());
    coord.on_scale_or_viewport_change_at(scale(33), caches.set(), Instant::now());
    let [grid, _, _] = caches.resident();
    assert_eq!(grid, vec![1, 2, 33]);
    assert_eq!(coord.passes(), 1);
}

#[test]
fn sweep_evicts_idle_scales_outside_keep_window() {
    let t0 = Instant::now();
    let mut caches = Caches::new();
    let mut coord = coordinator();
    coord.on_scale_or_viewport_change_at(scale(10), caches.set(), t0);
    caches.fill(&[8, 9, 11], t0);
    caches.fill(&[12], t0 + secs(31));

    let report = coord.sweep_at(caches.set(), t0 + secs(62));
    assert_eq!(report.scales_for("visibility"), vec![scale(8)]);
    assert!(report.evicted.iter().all(|e| e.verdict == Verdict::EvictIdle));
    let [_, vis, bmp] = caches.resident();
    assert_eq!(vis, vec![9, 11, 12]);
    assert_eq!(bmp, vec![9, 11, 12]);
}

#[test]
fn sweep_never_touches_protected_scales() {
    let t0 = Instant::now();
    let mut caches = Caches::new();
    let mut coord = coordinator();
    caches.fill(&[1, 2, 20], t0);
    coord.on_scale_or_viewport_change_at(scale(20), caches.set(), t0);

    let report = coord.sweep_at(caches.set(), t0 + secs(10_000));
    assert!(report.is_empty());
    let [grid, vis, bmp] = caches.resident();
    assert_eq!(grid, vec![1, 2, 20]);
    assert_eq!(vis, vec![1, 2, 20]);
    assert_eq!(bmp, vec![1, 2, 20]);
}

#[test]
fn sweep_if_due_follows_timer() {
    let t0 = Instant::now();
    let mut caches = Caches::new();
    let mut coord = coordinator();
    assert!(coord.sweep_if_due(caches.set(), t0).is_none());

    coord.timer_mut().start(t0);
    assert!(coord.sweep_if_due(caches.set(), t0 + secs(1)).is_none());
    assert!(coord.sweep_if_due(caches.set(), t0 + secs(5)).is_some());
    assert!(coord.sweep_if_due(caches.set(), t0 + secs(6)).is_none());
    assert!(coord.sweep_if_due(caches.set(), t0 + secs(10)).is_some());
    assert_eq!(coord.passes(), 2);
}

#[test]
fn policy_comes_from_config() {
    let config = CacheConfig { distance_threshold: 8, keep_window: 2, ..CacheConfig::default() };
    let coord = EvictionCoordinator::from_config(&config);
    assert_eq!(coord.policy().distance_threshold, 8);
    assert_eq!(coord.policy().keep_window, 2);
    assert_eq!(coord.timer().interval(), config.sweep_interval);
}

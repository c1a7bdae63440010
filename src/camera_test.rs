#![allow(clippy::float_cmp)]

use super::*;

const EPSILON: f64 = 1e-9;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

fn point_approx_eq(a: Point, b: Point) -> bool {
    approx_eq(a.x, b.x) && approx_eq(a.y, b.y)
}

fn scale(raw: u32) -> Scale {
    Scale::new(raw).unwrap()
}

fn ctx(s: u32, ox: f64, oy: f64, w: f64, h: f64) -> ViewContext {
    ViewContext::new(scale(s), Point::new(ox, oy), ViewportSize::new(w, h))
}

// --- Point / Cell ---

#[test]
fn point_new() {
    let p = Point::new(3.0, 4.0);
    assert_eq!(p.x, 3.0);
    assert_eq!(p.y, 4.0);
}

#[test]
fn cell_origin_is_top_left_corner() {
    assert_eq!(Cell::new(-3, 7).origin(), Point::new(-3.0, 7.0));
}

#[test]
fn viewport_new_clamps_negative_sizes() {
    let v = ViewportSize::new(-10.0, 20.0);
    assert_eq!(v.width, 0.0);
    assert!(v.is_empty());
}

#[test]
fn viewport_new_zeroes_non_finite_sizes() {
    let v = ViewportSize::new(f64::INFINITY, f64::NAN);
    assert_eq!((v.width, v.height), (0.0, 0.0));
    assert_eq!(ViewportSize::new(f64::NEG_INFINITY, 10.0).width, 0.0);
}

#[test]
fn viewport_new_caps_huge_sizes() {
    let v = ViewportSize::new(1e15, 600.0);
    assert_eq!(v.width, MAX_VIEWPORT_PX);
    assert_eq!(v.height, 600.0);
}

// --- to_world / to_vertex ---

#[test]
fn to_world_identity_at_scale_one_zero_offset() {
    let w = to_world(Point::new(12.5, -3.0), Scale::MIN, Point::default());
    assert!(point_approx_eq(w, Point::new(12.5, -3.0)));
}

#[test]
fn to_world_applies_scale_then_offset() {
    let w = to_world(Point::new(2.0, 3.0), scale(10), Point::new(100.0, -50.0));
    assert!(point_approx_eq(w, Point::new(120.0, -20.0)));
}

#[test]
fn to_vertex_inverts_to_world() {
    let v = to_vertex(Point::new(120.0, -20.0), scale(10), Point::new(100.0, -50.0));
    assert!(point_approx_eq(v, Point::new(2.0, 3.0)));
}

#[test]
fn round_trip_across_scales_and_offsets() {
    let offsets = [Point::new(0.0, 0.0), Point::new(-1e6, 4096.5), Point::new(1e9, -1e9), Point::new(0.25, 0.75)];
    let vertices = [Point::new(0.0, 0.0), Point::new(13.7, -2.1), Point::new(-999.5, 1e4)];
    for raw in [1, 2, 3, 7, 50, 99, 100] {
        for offset in offsets {
            for v in vertices {
                let back = to_vertex(to_world(v, scale(raw), offset), scale(raw), offset);
                let tol = 1e-6 * (1.0 + offset.x.abs().max(offset.y.abs()));
                assert!((back.x - v.x).abs() < tol && (back.y - v.y).abs() < tol, "scale {raw} offset {offset:?} v {v:?}");
            }
        }
    }
}

#[test]
fn results_are_not_rounded() {
    let w = to_world(Point::new(0.3, 0.7), scale(3), Point::default());
    assert!(approx_eq(w.x, 0.9));
    assert!(approx_eq(w.y, 2.1));
}

// --- Surface transform ---

#[test]
fn pixel_to_vertex_divides_by_scale_squared() {
    let v = pixel_to_vertex(Point::new(160.0, 320.0), scale(4));
    assert!(point_approx_eq(v, Point::new(10.0, 20.0)));
    assert!(point_approx_eq(vertex_to_pixel(v, scale(4)), Point::new(160.0, 320.0)));
}

#[test]
fn pixel_to_world_composes_surface_and_mapper() {
    let c = ctx(5, 1000.0, 2000.0, 800.0, 600.0);
    let w = c.pixel_to_world(Point::new(50.0, 25.0), c.scale);
    assert!(point_approx_eq(w, Point::new(1010.0, 2005.0)));
    assert!(point_approx_eq(c.world_to_pixel(w, c.scale), Point::new(50.0, 25.0)));
    assert!(point_approx_eq(w, c.to_world(pixel_to_vertex(Point::new(50.0, 25.0), c.scale), c.scale)));
}

#[test]
fn one_world_unit_spans_scale_pixels() {
    for raw in [1, 2, 7, 50, 100] {
        let c = ctx(raw, 0.0, 0.0, 800.0, 600.0);
        let p = c.world_to_pixel(Point::new(1.0, 0.0), c.scale);
        assert!(point_approx_eq(p, Point::new(f64::from(raw), 0.0)), "scale {raw}: {p:?}");
    }
}

#[test]
fn cell_under_pixel_at_max_zoom() {
    let c = ctx(100, 40.0, -7.0, 800.0, 600.0);
    assert_eq!(cell_at(c.pixel_to_world(Point::new(0.0, 0.0), c.scale)), Cell::new(40, -7));
    assert_eq!(cell_at(c.pixel_to_world(Point::new(99.0, 99.0), c.scale)), Cell::new(40, -7));
    assert_eq!(cell_at(c.pixel_to_world(Point::new(150.0, 250.0), c.scale)), Cell::new(41, -5));
    assert_eq!(cell_at(c.pixel_to_world(Point::new(799.0, 599.0), c.scale)), Cell::new(47, -2));
}

// --- cell_at ---

#[test]
fn cell_at_floors_positive_and_negative() {
    assert_eq!(cell_at(Point::new(2.9, 0.0)), Cell::new(2, 0));
    assert_eq!(cell_at(Point::new(-0.1, -1.0)), Cell::new(-1, -1));
    assert_eq!(cell_at(Point::new(-1.5, 3.999)), Cell::new(-2, 3));
}

// --- screen_rect ---

#[test]
fn screen_rect_at_origin() {
    let c = ctx(1, 0.0, 0.0, 800.0, 600.0);
    assert_eq!(c.screen_rect(c.scale), Rect::new(0.0, 0.0, 800.0, 600.0));
}

#[test]
fn screen_rect_follows_offset() {
    let c = ctx(100, -400.0, 250.0, 800.0, 600.0);
    let r = c.screen_rect(c.scale);
    assert!(approx_eq(r.min_x, -400.0));
    assert!(approx_eq(r.min_y, 250.0));
    assert!(approx_eq(r.width(), 8.0));
    assert!(approx_eq(r.height(), 6.0));
}

#[test]
fn screen_rect_shrinks_as_scale_grows() {
    let c = ctx(1, 12.0, -3.0, 800.0, 600.0);
    for raw in [1, 2, 3, 8, 25, 64, 100] {
        let r = c.screen_rect(scale(raw));
        let s = f64::from(raw);
        assert!(approx_eq(r.width(), 800.0 / s), "scale {raw}: {r:?}");
        assert!(approx_eq(r.height(), 600.0 / s), "scale {raw}: {r:?}");
        assert!(approx_eq(r.min_x, 12.0) && approx_eq(r.min_y, -3.0));
    }
}

#[test]
fn screen_rect_empty_viewport_has_no_area() {
    let c = ctx(3, 10.0, 10.0, 0.0, 0.0);
    assert!(c.screen_rect(c.scale).is_empty());
}

#[test]
fn mapper_ignores_viewport_size() {
    let a = ctx(7, 3.0, 4.0, 800.0, 600.0);
    let b = ctx(7, 3.0, 4.0, 10.0, 10.0);
    let v = Point::new(5.0, 6.0);
    assert_eq!(a.to_world(v, a.scale), b.to_world(v, b.scale));
}

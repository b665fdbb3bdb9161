//! Per-tick frame processing benchmarks
//!
//! Measures the CPU work a tick does after sampling: cursor compositing and
//! normalization into the even-dimensioned output surface. Both run on the
//! capture thread inside the tick budget, so they bound the smallest
//! interval a region size can sustain.

use std::hint::black_box;
use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};
use image::{Rgba, RgbaImage};
use regioncast_core::capture::mock::test_pattern;
use regioncast_core::frame::compositor::blend_over;
use regioncast_core::frame::{CursorCompositor, OutputSurface};
use regioncast_core::model::{
    BorderInsets, CaptureRegion, CursorGlyph, CursorSnapshot, ScreenPoint,
};

fn sampled_surface(width: u32, height: u32) -> RgbaImage {
    let mut surface = RgbaImage::new(width, height);
    test_pattern(ScreenPoint::new(0, 0), &mut surface);
    surface
}

/// 32x32 glyph with a soft edge, similar to a themed arrow cursor
fn cursor_glyph() -> RgbaImage {
    RgbaImage::from_fn(32, 32, |x, y| {
        if x + y < 24 {
            Rgba([255, 255, 255, 255])
        } else if x + y < 28 {
            Rgba([0, 0, 0, 128])
        } else {
            Rgba([0, 0, 0, 0])
        }
    })
}

fn bench_blend_cursor(c: &mut Criterion) {
    let mut surface = sampled_surface(1280, 720);
    let glyph = cursor_glyph();

    c.bench_function("blend_cursor_32x32", |b| {
        b.iter(|| {
            blend_over(black_box(&mut surface), black_box(&glyph), 640, 360);
        });
    });
}

fn bench_composite_snapshot(c: &mut Criterion) {
    let mut surface = sampled_surface(1280, 720);
    let compositor = CursorCompositor::new(BorderInsets::uniform(4), ScreenPoint::new(4, 0));
    let region = CaptureRegion::new(100, 100, 1280, 720);
    let snapshot = CursorSnapshot::visible(
        700,
        460,
        Arc::new(CursorGlyph {
            handle: 1,
            image:  cursor_glyph(),
        }),
    );

    c.bench_function("composite_cursor_snapshot", |b| {
        b.iter(|| {
            compositor.composite(black_box(&mut surface), &region, black_box(&snapshot));
        });
    });
}

fn bench_normalize_even(c: &mut Criterion) {
    let sampled = sampled_surface(1920, 1080);
    let mut output = OutputSurface::new(1920, 1080);

    c.bench_function("normalize_1080p_in_place", |b| {
        b.iter(|| {
            black_box(output.normalize(black_box(&sampled)));
        });
    });
}

fn bench_normalize_odd_held(c: &mut Criterion) {
    // The encoder still holds each frame, forcing a copy per tick.
    let sampled = sampled_surface(1919, 1079);
    let mut output = OutputSurface::new(1919, 1079);

    let mut held = output.last_frame();

    c.bench_function("normalize_1080p_odd_copy_on_write", |b| {
        b.iter(|| {
            held = output.normalize(black_box(&sampled));
        });
    });
    black_box(held);
}

criterion_group!(
    benches,
    bench_blend_cursor,
    bench_composite_snapshot,
    bench_normalize_even,
    bench_normalize_odd_held
);
criterion_main!(benches);

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the scanwerk-document crate: one detector tick on
// a synthetic NV21 preview frame, and rectification of a captured frame.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;

use scanwerk_core::config::{DetectionConfig, OutputConfig};
use scanwerk_core::types::{OutputMode, PixelFormat, Rotation};
use scanwerk_document::frame::convert::encode_frame;
use scanwerk_document::geometry::order_corners;
use scanwerk_document::{ContourDetector, Rectifier};

/// A 1280x720 scene: grey background with a bright, slightly skewed sheet.
fn synthetic_scene() -> (RgbImage, [Point<i32>; 4]) {
    let mut image = RgbImage::from_pixel(1280, 720, Rgb([60, 60, 60]));
    let corners = [
        Point::new(260, 90),
        Point::new(1010, 120),
        Point::new(1040, 650),
        Point::new(230, 620),
    ];
    draw_polygon_mut(&mut image, &corners, Rgb([230, 230, 225]));
    (image, corners)
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Full preview tick: NV21 luma extraction, downscale, blur, Canny, rotation,
/// closing, contour tracing and best-quad selection.
fn bench_detector_tick(c: &mut Criterion) {
    let (scene, _) = synthetic_scene();
    let frame = encode_frame(&scene, PixelFormat::Nv21, 0).expect("synthetic frame");
    let detector = ContourDetector::new(DetectionConfig::default());

    c.bench_function("detector_tick (1280x720 nv21)", |b| {
        b.iter(|| {
            let report = detector
                .detect(black_box(&frame), Rotation::Deg90)
                .expect("detection");
            black_box(report.best);
        });
    });
}

/// Four-point warp and PNG encoding in both output modes.
fn bench_rectify(c: &mut Criterion) {
    let (scene, corners) = synthetic_scene();
    let quad = order_corners(corners.map(|p| Point::new(p.x as f32, p.y as f32)));

    for mode in [OutputMode::Photo, OutputMode::Document] {
        let rectifier = Rectifier::new(OutputConfig {
            mode,
            ..OutputConfig::default()
        });
        c.bench_function(&format!("rectify {mode:?} (1280x720)"), |b| {
            b.iter(|| {
                let result = rectifier
                    .rectify(black_box(&scene), black_box(&quad))
                    .expect("rectification");
                black_box(result.png.len());
            });
        });
    }
}

criterion_group!(benches, bench_detector_tick, bench_rectify);
criterion_main!(benches);

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Live overlay raster for the preview layer.

use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_line_segment_mut;
use imageproc::point::Point;

use super::contours::DetectionReport;

const WINNER: Rgba<u8> = Rgba([0, 255, 0, 255]);
const RAW_CONTOUR: Rgba<u8> = Rgba([255, 0, 0, 255]);
const CANDIDATE: Rgba<u8> = Rgba([0, 0, 255, 255]);

/// Draw a tick's result on a transparent canvas of the working size.
///
/// Returns `None` when there is nothing to show: no winner, and either debug
/// drawing is off or the tick traced nothing.
pub fn render_overlay(report: &DetectionReport, debug: bool) -> Option<RgbaImage> {
    let show_debug = debug && !report.raw_contours.is_empty();
    if report.best.is_none() && !show_debug {
        return None;
    }

    let size = report.working_size;
    let mut canvas = RgbaImage::new(size.width, size.height);

    if debug {
        for contour in &report.raw_contours {
            draw_closed(&mut canvas, contour, 3, RAW_CONTOUR);
        }
        for candidate in &report.candidates {
            draw_closed(&mut canvas, &candidate.polygon, 3, CANDIDATE);
        }
    }

    if let Some(best) = &report.best {
        draw_closed(&mut canvas, &best.contour, 3, WINNER);
    }
    Some(canvas)
}

/// Closed polyline `thickness` pixels wide (odd widths centre on the line).
fn draw_closed(canvas: &mut RgbaImage, polygon: &[Point<i32>], thickness: i32, color: Rgba<u8>) {
    if polygon.is_empty() {
        return;
    }
    let reach = thickness / 2;
    for (i, a) in polygon.iter().enumerate() {
        let b = polygon[(i + 1) % polygon.len()];
        for dy in -reach..=reach {
            for dx in -reach..=reach {
                draw_line_segment_mut(
                    canvas,
                    ((a.x + dx) as f32, (a.y + dy) as f32),
                    ((b.x + dx) as f32, (b.y + dy) as f32),
                    color,
                );
            }
        }
    }
}

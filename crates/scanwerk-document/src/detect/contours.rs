// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-tick document boundary detection.

use image::GrayImage;
use image::imageops::{self, FilterType};
use imageproc::contours::find_contours;
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology::close;
use imageproc::point::Point;
use scanwerk_core::config::DetectionConfig;
use scanwerk_core::error::Result;
use scanwerk_core::types::{RawFrame, Rotation, Size};
use tracing::{debug, instrument, trace};

use crate::frame::convert::to_luma;
use crate::frame::sizing::working_size;
use crate::geometry::polygon::{approximate_polygon, arc_length, is_rectangle_like, polygon_area};
use crate::geometry::quad::ScaledQuad;

/// A 4-vertex approximation that passed the angle test.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub polygon: Vec<Point<i32>>,
    pub area: f64,
}

/// The winning contour of a tick, in working-resolution coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub contour: Vec<Point<i32>>,
    pub area: f64,
    /// Size of the rotated working raster the contour was traced in.
    pub frame_size: Size,
}

impl Detection {
    /// Corner-ordered quad rescaled to a raster of `target` pixels.
    pub fn quad_for(&self, target: Size) -> Result<ScaledQuad> {
        Ok(ScaledQuad::from_contour(&self.contour)?.rescale(self.frame_size, target))
    }
}

/// Everything one tick produced. Raw contours are only kept when the debug
/// overlay is enabled.
#[derive(Debug, Clone, Default)]
pub struct DetectionReport {
    pub best: Option<Detection>,
    pub candidates: Vec<Candidate>,
    pub raw_contours: Vec<Vec<Point<i32>>>,
    pub working_size: Size,
}

/// Finds the most document-like quadrilateral in preview frames.
#[derive(Debug, Clone)]
pub struct ContourDetector {
    config: DetectionConfig,
}

impl ContourDetector {
    pub fn new(config: DetectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Run the full detection pass on one preview frame.
    #[instrument(skip_all, fields(seq = frame.sequence(), width = frame.width(), height = frame.height()))]
    pub fn detect(&self, frame: &RawFrame, rotation: Rotation) -> Result<DetectionReport> {
        let edges = self.edge_map(frame, rotation)?;
        Ok(self.analyze_edges(&edges))
    }

    /// Binary edge map at working resolution, rotated upright and closed.
    pub fn edge_map(&self, frame: &RawFrame, rotation: Rotation) -> Result<GrayImage> {
        let cfg = &self.config;
        let luma = to_luma(frame)?;

        let working = working_size(frame.size(), cfg.target_pixel_area);
        let small = if working == frame.size() {
            luma
        } else {
            imageops::resize(&luma, working.width, working.height, FilterType::Triangle)
        };
        trace!(%working, "Frame downscaled");

        let blurred = gaussian_blur_f32(&small, cfg.blur_sigma);
        let edges = canny(&blurred, cfg.canny_low, cfg.canny_high);

        // Only the small binary map is rotated, never the full frame.
        let upright = match rotation {
            Rotation::Deg0 => edges,
            Rotation::Deg90 => imageops::rotate90(&edges),
            Rotation::Deg180 => imageops::rotate180(&edges),
            Rotation::Deg270 => imageops::rotate270(&edges),
        };

        Ok(if cfg.close_radius > 0 {
            close(&upright, Norm::LInf, cfg.close_radius)
        } else {
            upright
        })
    }

    /// Trace, approximate and score every contour in a binary map.
    pub fn analyze_edges(&self, edges: &GrayImage) -> DetectionReport {
        let cfg = &self.config;
        let contours = find_contours::<i32>(edges);
        let traced = contours.len();

        let mut candidates = Vec::new();
        let mut raw_contours = Vec::new();
        for contour in contours {
            let epsilon = cfg.approx_tolerance * arc_length(&contour.points);
            let polygon = approximate_polygon(&contour.points, epsilon);
            if polygon.len() == 4 && is_rectangle_like(&polygon, cfg.angle_band) {
                candidates.push(Candidate {
                    area: polygon_area(&polygon),
                    polygon,
                });
            }
            if cfg.debug_overlay {
                raw_contours.push(contour.points);
            }
        }

        // Stable: equal areas keep tracing order.
        candidates.sort_by(|a, b| b.area.total_cmp(&a.area));

        let working_size = Size::new(edges.width(), edges.height());
        let best = candidates.first().map(|c| Detection {
            contour: c.polygon.clone(),
            area: c.area,
            frame_size: working_size,
        });

        debug!(
            contours = traced,
            candidates = candidates.len(),
            best_area = best.as_ref().map(|d| d.area),
            "Contour analysis complete"
        );

        DetectionReport {
            best,
            candidates,
            raw_contours,
            working_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::convert::encode_frame;
    use image::{Luma, Rgb, RgbImage};
    use imageproc::drawing::{draw_filled_rect_mut, draw_line_segment_mut, draw_polygon_mut};
    use imageproc::rect::Rect;
    use scanwerk_core::types::{AngleBand, PixelFormat};

    fn outline(image: &mut GrayImage, corners: &[(f32, f32)]) {
        for (i, &start) in corners.iter().enumerate() {
            let end = corners[(i + 1) % corners.len()];
            draw_line_segment_mut(image, start, end, Luma([255]));
        }
    }

    fn synthetic_edges() -> GrayImage {
        let mut edges = GrayImage::new(320, 200);
        // The document.
        outline(&mut edges, &[(20.0, 20.0), (120.0, 20.0), (120.0, 80.0), (20.0, 80.0)]);
        // A smaller rectangle.
        outline(&mut edges, &[(150.0, 120.0), (190.0, 120.0), (190.0, 150.0), (150.0, 150.0)]);
        // A triangle, and a parallelogram leaning about 50 degrees off square.
        outline(&mut edges, &[(150.0, 20.0), (200.0, 90.0), (140.0, 90.0)]);
        outline(&mut edges, &[(20.0, 110.0), (60.0, 110.0), (130.0, 170.0), (90.0, 170.0)]);
        // Specks.
        edges.put_pixel(5, 5, Luma([255]));
        edges.put_pixel(300, 190, Luma([255]));
        edges
    }

    #[test]
    fn largest_rectangle_wins_over_noise() {
        let detector = ContourDetector::new(DetectionConfig::default());
        let report = detector.analyze_edges(&synthetic_edges());

        let best = report.best.expect("document should be found");
        assert_eq!(best.area, 6000.0);
        assert_eq!(best.frame_size, Size::new(320, 200));
        for corner in [(20, 20), (120, 20), (120, 80), (20, 80)] {
            assert!(
                best.contour.contains(&Point::new(corner.0, corner.1)),
                "{corner:?} not in {:?}",
                best.contour
            );
        }

        assert!(report.candidates.len() >= 2);
        assert!(report.candidates.windows(2).all(|w| w[0].area >= w[1].area));
        assert!(report.candidates.iter().all(|c| c.polygon.len() == 4));
        assert!(report.raw_contours.is_empty());
    }

    #[test]
    fn empty_map_reports_nothing() {
        let detector = ContourDetector::new(DetectionConfig::default());
        let report = detector.analyze_edges(&GrayImage::new(64, 48));
        assert!(report.best.is_none());
        assert!(report.candidates.is_empty());
        assert_eq!(report.working_size, Size::new(64, 48));
    }

    #[test]
    fn debug_mode_keeps_raw_contours() {
        let config = DetectionConfig {
            debug_overlay: true,
            ..DetectionConfig::default()
        };
        let report = ContourDetector::new(config).analyze_edges(&synthetic_edges());
        assert!(report.raw_contours.len() > report.candidates.len());
    }

    fn bright_document_frame(format: PixelFormat) -> RawFrame {
        let mut image = RgbImage::from_pixel(320, 240, Rgb([40, 40, 40]));
        draw_filled_rect_mut(&mut image, Rect::at(60, 50).of_size(200, 140), Rgb([220, 220, 220]));
        encode_frame(&image, format, 1).unwrap()
    }

    #[test]
    fn finds_document_in_preview_frame() {
        for format in [PixelFormat::Gray8, PixelFormat::Nv21] {
            let frame = bright_document_frame(format);
            let detector = ContourDetector::new(DetectionConfig::default());
            let report = detector.detect(&frame, Rotation::Deg0).unwrap();
            let best = report.best.expect("document should be found");

            let quad = best.quad_for(frame.size()).unwrap();
            let expected = [(60.0, 50.0), (260.0, 50.0), (260.0, 190.0), (60.0, 190.0)];
            for (corner, (ex, ey)) in quad.corners().iter().zip(expected) {
                assert!(
                    (corner.x - ex).abs() <= 4.0 && (corner.y - ey).abs() <= 4.0,
                    "{format:?}: corner {corner:?} far from ({ex}, {ey})"
                );
            }
        }
    }

    #[test]
    fn rotation_transposes_working_raster() {
        let frame = bright_document_frame(PixelFormat::Gray8);
        let detector = ContourDetector::new(DetectionConfig::default());
        let upright = detector.detect(&frame, Rotation::Deg0).unwrap();
        let turned = detector.detect(&frame, Rotation::Deg90).unwrap();
        assert_eq!(turned.working_size, upright.working_size.transposed());

        let best = turned.best.expect("document should be found");
        assert_eq!(best.frame_size, turned.working_size);
    }

    fn tilted_page_frame() -> RawFrame {
        let mut image = RgbImage::from_pixel(320, 240, Rgb([40, 40, 40]));
        // A page shot from below: sides lean about 22 degrees off vertical.
        draw_polygon_mut(
            &mut image,
            &[
                Point::new(100, 50),
                Point::new(220, 50),
                Point::new(280, 200),
                Point::new(40, 200),
            ],
            Rgb([220, 220, 220]),
        );
        encode_frame(&image, PixelFormat::Nv21, 1).unwrap()
    }

    #[test]
    fn default_band_accepts_a_page_in_perspective() {
        let frame = tilted_page_frame();
        let report = ContourDetector::new(DetectionConfig::default())
            .detect(&frame, Rotation::Deg0)
            .unwrap();
        let best = report.best.expect("tilted page should be found");

        let quad = best.quad_for(frame.size()).unwrap();
        let expected = [(100.0, 50.0), (220.0, 50.0), (280.0, 200.0), (40.0, 200.0)];
        for (corner, (ex, ey)) in quad.corners().iter().zip(expected) {
            assert!(
                (corner.x - ex).abs() <= 5.0 && (corner.y - ey).abs() <= 5.0,
                "corner {corner:?} far from ({ex}, {ey})"
            );
        }
    }

    #[test]
    fn strict_band_rejects_a_page_in_perspective() {
        let config = DetectionConfig {
            angle_band: AngleBand::strict(),
            ..DetectionConfig::default()
        };
        let report = ContourDetector::new(config)
            .detect(&tilted_page_frame(), Rotation::Deg0)
            .unwrap();
        assert!(report.best.is_none());
    }
}

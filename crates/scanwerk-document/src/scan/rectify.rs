// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rectification: flatten the detected document out of a captured frame and
// finish it for the chosen output mode.

use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgb, RgbImage};
use scanwerk_core::config::OutputConfig;
use scanwerk_core::error::Result;
use scanwerk_core::types::{OutputMode, Size};
use tracing::{debug, info, instrument};

use crate::geometry::perspective::{perspective_transform, warp};
use crate::geometry::quad::ScaledQuad;
use crate::image::processor::encode_to_format;

/// Border colour for reads outside the captured image.
const PAPER_WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// The finished crop handed to the output collaborator.
#[derive(Debug, Clone)]
pub struct RectifiedImage {
    pub image: DynamicImage,
    pub mode: OutputMode,
    /// PNG encoding of `image`.
    pub png: Vec<u8>,
}

impl RectifiedImage {
    pub fn size(&self) -> Size {
        Size::new(self.image.width(), self.image.height())
    }
}

/// Four-point crop plus optional document-mode cleanup.
#[derive(Debug, Clone, Default)]
pub struct Rectifier {
    output: OutputConfig,
}

impl Rectifier {
    pub fn new(output: OutputConfig) -> Self {
        Self { output }
    }

    pub fn output(&self) -> &OutputConfig {
        &self.output
    }

    /// Warp the region inside `quad` onto an upright rectangle.
    ///
    /// Either the full result (pixels and PNG) is produced or an error is
    /// returned; nothing partial escapes.
    #[instrument(skip_all, fields(width = image.width(), height = image.height(), mode = ?self.output.mode))]
    pub fn rectify(&self, image: &RgbImage, quad: &ScaledQuad) -> Result<RectifiedImage> {
        let (size, transform) = perspective_transform(quad)?;
        let warped = warp(image, &transform, size, PAPER_WHITE)?;

        let finished = match self.output.mode {
            OutputMode::Photo => DynamicImage::ImageRgb8(warped),
            OutputMode::Document => {
                let gray = DynamicImage::ImageRgb8(warped).into_luma8();
                DynamicImage::ImageLuma8(binarize(
                    &gray,
                    self.output.binarize_block_radius,
                    self.output.binarize_offset,
                ))
            }
        };

        let png = encode_to_format(&finished, ImageFormat::Png)?;
        info!(%size, png_bytes = png.len(), "Document rectified");
        Ok(RectifiedImage {
            image: finished,
            mode: self.output.mode,
            png,
        })
    }
}

/// Adaptive threshold against the local mean.
///
/// For each pixel the threshold is the mean intensity of the
/// `(2 * block_radius + 1)`-square window around it (clipped at the image
/// edges) minus `c`. Pixels above the threshold become white, the rest black.
pub fn binarize(gray: &GrayImage, block_radius: u32, c: i32) -> GrayImage {
    let (width, height) = gray.dimensions();
    let integral = compute_integral_image(gray);

    let output = GrayImage::from_fn(width, height, |x, y| {
        let local_mean = region_mean(&integral, width, height, x, y, block_radius);
        let threshold = local_mean - c as f64;
        let value = gray.get_pixel(x, y).0[0] as f64;
        Luma([if value > threshold { 255 } else { 0 }])
    });
    debug!(block_radius, c, "Binarization complete");
    output
}

// -- Integral image helpers ---------------------------------------------------

/// Summed-area table with a zero row and column in front:
/// `table[y * (w + 1) + x]` holds the sum over `[0, x) x [0, y)`.
fn compute_integral_image(gray: &GrayImage) -> Vec<u64> {
    let (w, h) = gray.dimensions();
    let stride = (w + 1) as usize;
    let mut table = vec![0u64; stride * (h + 1) as usize];

    for y in 0..h {
        let mut row_sum: u64 = 0;
        for x in 0..w {
            row_sum += gray.get_pixel(x, y).0[0] as u64;
            let idx = (y + 1) as usize * stride + (x + 1) as usize;
            let above = y as usize * stride + (x + 1) as usize;
            table[idx] = row_sum + table[above];
        }
    }

    table
}

/// Mean over the window of `radius` around `(cx, cy)`, clipped to the image.
fn region_mean(integral: &[u64], img_width: u32, img_height: u32, cx: u32, cy: u32, radius: u32) -> f64 {
    let stride = (img_width + 1) as usize;

    let x1 = cx.saturating_sub(radius) as usize;
    let y1 = cy.saturating_sub(radius) as usize;
    let x2 = (cx as usize + radius as usize + 1).min(img_width as usize);
    let y2 = (cy as usize + radius as usize + 1).min(img_height as usize);

    let area = ((x2 - x1) * (y2 - y1)) as f64;
    let sum = integral[y2 * stride + x2] as f64 - integral[y1 * stride + x2] as f64
        - integral[y2 * stride + x1] as f64
        + integral[y1 * stride + x1] as f64;

    sum / area
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::quad::order_corners;
    use imageproc::drawing::{draw_filled_rect_mut, draw_polygon_mut};
    use imageproc::point::Point;
    use imageproc::rect::Rect;
    use scanwerk_core::error::ScanwerkError;

    fn quad(points: [(f32, f32); 4]) -> ScaledQuad {
        order_corners(points.map(|(x, y)| Point::new(x, y)))
    }

    /// Grey table, white skewed sheet, a dark stroke of "text" on the sheet.
    fn photographed_sheet() -> (RgbImage, ScaledQuad) {
        let mut image = RgbImage::from_pixel(240, 200, Rgb([90, 90, 90]));
        let corners = [
            Point::new(30, 20),
            Point::new(200, 35),
            Point::new(210, 180),
            Point::new(20, 170),
        ];
        draw_polygon_mut(&mut image, &corners, Rgb([235, 235, 235]));
        draw_filled_rect_mut(&mut image, Rect::at(80, 90).of_size(70, 4), Rgb([20, 20, 20]));
        let q = quad(corners.map(|p| (p.x as f32, p.y as f32)));
        (image, q)
    }

    #[test]
    fn photo_mode_keeps_colour_crop() {
        let (image, q) = photographed_sheet();
        let result = Rectifier::default().rectify(&image, &q).unwrap();
        assert_eq!(result.mode, OutputMode::Photo);
        // Longest horizontal edge is the bottom one: |(210,180)-(20,170)|.
        assert_eq!(result.size(), Size::new(190, 150));

        let rgb = result.image.to_rgb8();
        let paper = rgb.pixels().filter(|p| p.0[0] > 200).count();
        assert!(paper * 100 >= rgb.pixels().count() * 85);

        let decoded = image::load_from_memory(&result.png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (190, 150));
    }

    #[test]
    fn document_mode_binarizes() {
        let (image, q) = photographed_sheet();
        let rectifier = Rectifier::new(OutputConfig {
            mode: OutputMode::Document,
            ..OutputConfig::default()
        });
        let result = rectifier.rectify(&image, &q).unwrap();
        assert_eq!(result.mode, OutputMode::Document);

        let gray = result.image.as_luma8().expect("document output is luma");
        assert!(gray.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
        let black = gray.pixels().filter(|p| p.0[0] == 0).count();
        // The stroke survives, the paper does not turn black.
        assert!(black > 50, "stroke lost: {black} black pixels");
        assert!(black * 10 < gray.pixels().count());
    }

    #[test]
    fn degenerate_quad_produces_nothing() {
        let image = RgbImage::new(50, 50);
        let flat = quad([(10.0, 10.0), (40.0, 10.0), (40.0, 10.5), (10.0, 10.5)]);
        assert!(matches!(
            Rectifier::default().rectify(&image, &flat),
            Err(ScanwerkError::DegenerateQuad(_))
        ));
    }

    #[test]
    fn binarize_uniform_is_white() {
        let gray = GrayImage::from_pixel(20, 20, Luma([128]));
        assert!(binarize(&gray, 5, 2).pixels().all(|p| p.0[0] == 255));
    }

    #[test]
    fn region_mean_clips_at_corners() {
        let mut gray = GrayImage::from_pixel(4, 4, Luma([0]));
        gray.put_pixel(0, 0, Luma([40]));
        let integral = compute_integral_image(&gray);
        // Window at (0,0) with radius 1 covers 2x2 pixels.
        assert_eq!(region_mean(&integral, 4, 4, 0, 0, 1), 10.0);
    }
}

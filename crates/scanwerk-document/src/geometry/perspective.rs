// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Four-point homography and perspective warp.

use image::{ImageBuffer, Pixel};
use imageproc::definitions::Clamp;
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use imageproc::point::Point;
use nalgebra::{Matrix3, SMatrix, SVector, Vector3};
use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::types::Size;
use tracing::debug;

use super::quad::ScaledQuad;

/// Projective mapping `dst ~ H * src` in homogeneous pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveTransform {
    matrix: Matrix3<f64>,
}

impl PerspectiveTransform {
    pub fn new(matrix: Matrix3<f64>) -> Self {
        Self { matrix }
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    /// Map a point. Points on the line at infinity come back non-finite.
    pub fn apply(&self, p: Point<f32>) -> Point<f32> {
        let v = self.matrix * Vector3::new(p.x as f64, p.y as f64, 1.0);
        Point::new((v[0] / v[2]) as f32, (v[1] / v[2]) as f32)
    }

    pub fn inverse(&self) -> Option<Self> {
        self.matrix.try_inverse().map(Self::new)
    }

    /// Row-major `f32` projection for `imageproc`; `None` when singular.
    fn to_projection(self) -> Option<Projection> {
        let m = &self.matrix;
        Projection::from_matrix([
            m[(0, 0)] as f32,
            m[(0, 1)] as f32,
            m[(0, 2)] as f32,
            m[(1, 0)] as f32,
            m[(1, 1)] as f32,
            m[(1, 2)] as f32,
            m[(2, 0)] as f32,
            m[(2, 1)] as f32,
            m[(2, 2)] as f32,
        ])
    }
}

/// Output size and the transform flattening `quad` onto it.
///
/// Width is the longer of the top and bottom edges, height the longer of the
/// left and right edges, both truncated. The destination corners are
/// `(0,0)`, `(w-1,0)`, `(w-1,h-1)`, `(0,h-1)`.
pub fn perspective_transform(quad: &ScaledQuad) -> Result<(Size, PerspectiveTransform)> {
    let [tl, tr, br, bl] = quad.corners();
    let width = distance(br, bl).max(distance(tr, tl));
    let height = distance(tr, br).max(distance(tl, bl));

    if !(width.is_finite() && height.is_finite()) {
        return Err(ScanwerkError::DegenerateQuad(format!(
            "non-finite corners {:?}",
            quad.corners()
        )));
    }
    let size = Size::new(width as u32, height as u32);
    // A one-pixel side collapses two destination corners.
    if size.width < 2 || size.height < 2 {
        return Err(ScanwerkError::DegenerateQuad(format!(
            "output {} too small",
            size
        )));
    }

    let (w, h) = ((size.width - 1) as f32, (size.height - 1) as f32);
    let dst = [
        Point::new(0.0, 0.0),
        Point::new(w, 0.0),
        Point::new(w, h),
        Point::new(0.0, h),
    ];

    let transform = homography_from_4pt(&quad.corners(), &dst).ok_or_else(|| {
        ScanwerkError::DegenerateQuad(format!("singular system for {:?}", quad.corners()))
    })?;
    debug!(%size, "Perspective transform solved");
    Ok((size, transform))
}

/// Resample `image` into a `size` raster through `transform`.
///
/// Each output pixel is mapped back through the inverse transform and
/// sampled bilinearly; reads outside the source produce `border`.
pub fn warp<P>(
    image: &ImageBuffer<P, Vec<P::Subpixel>>,
    transform: &PerspectiveTransform,
    size: Size,
    border: P,
) -> Result<ImageBuffer<P, Vec<P::Subpixel>>>
where
    P: Pixel + Send + Sync,
    P::Subpixel: Send + Sync + Into<f32> + Clamp<f32>,
{
    let projection = transform.to_projection().ok_or_else(|| {
        ScanwerkError::DegenerateQuad("transform is not invertible".to_string())
    })?;
    let mut output = ImageBuffer::from_pixel(size.width, size.height, border);
    warp_into(image, &projection, Interpolation::Bilinear, border, &mut output);
    Ok(output)
}

/// Solve `dst ~ H * src` from four correspondences with `h33 = 1`.
///
/// Both point sets are Hartley-normalised before the 8x8 solve.
pub fn homography_from_4pt(
    src: &[Point<f32>; 4],
    dst: &[Point<f32>; 4],
) -> Option<PerspectiveTransform> {
    let (src_n, t_src) = normalize_points(src);
    let (dst_n, t_dst) = normalize_points(dst);

    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();

    for k in 0..4 {
        let (x, y) = src_n[k];
        let (u, v) = dst_n[k];

        let r0 = 2 * k;
        a[(r0, 0)] = x;
        a[(r0, 1)] = y;
        a[(r0, 2)] = 1.0;
        a[(r0, 6)] = -u * x;
        a[(r0, 7)] = -u * y;
        b[r0] = u;

        let r1 = 2 * k + 1;
        a[(r1, 3)] = x;
        a[(r1, 4)] = y;
        a[(r1, 5)] = 1.0;
        a[(r1, 6)] = -v * x;
        a[(r1, 7)] = -v * y;
        b[r1] = v;
    }

    let h = a.lu().solve(&b)?;
    let hn = Matrix3::new(
        h[0], h[1], h[2], //
        h[3], h[4], h[5], //
        h[6], h[7], 1.0,
    );

    let matrix = t_dst.try_inverse()? * hn * t_src;
    let scale = matrix[(2, 2)];
    if scale.abs() < 1e-12 {
        return None;
    }
    let matrix = matrix / scale;
    if matrix.iter().any(|v| !v.is_finite()) {
        return None;
    }
    Some(PerspectiveTransform::new(matrix))
}

/// Translate to the centroid and scale so the mean distance is sqrt(2).
fn normalize_points(points: &[Point<f32>; 4]) -> ([(f64, f64); 4], Matrix3<f64>) {
    let cx = points.iter().map(|p| p.x as f64).sum::<f64>() / 4.0;
    let cy = points.iter().map(|p| p.y as f64).sum::<f64>() / 4.0;
    let mean_dist = points
        .iter()
        .map(|p| (p.x as f64 - cx).hypot(p.y as f64 - cy))
        .sum::<f64>()
        / 4.0;
    let s = if mean_dist > 1e-12 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };

    let t = Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0);
    let normalized = points.map(|p| (s * (p.x as f64 - cx), s * (p.y as f64 - cy)));
    (normalized, t)
}

fn distance(a: Point<f32>, b: Point<f32>) -> f32 {
    (b.x - a.x).hypot(b.y - a.y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::quad::order_corners;
    use approx::assert_relative_eq;
    use image::{GrayImage, Luma, Rgb, RgbImage};
    use imageproc::drawing::draw_polygon_mut;

    fn p(x: f32, y: f32) -> Point<f32> {
        Point::new(x, y)
    }

    fn assert_maps(t: &PerspectiveTransform, from: Point<f32>, to: Point<f32>) {
        let got = t.apply(from);
        assert_relative_eq!(got.x, to.x, epsilon = 1e-3);
        assert_relative_eq!(got.y, to.y, epsilon = 1e-3);
    }

    #[test]
    fn square_quad_is_identity_equivalent() {
        let quad = order_corners([p(0.0, 0.0), p(0.0, 10.0), p(10.0, 10.0), p(10.0, 0.0)]);
        let (size, transform) = perspective_transform(&quad).unwrap();
        assert_eq!(size, Size::new(10, 10));

        // A pure 0.9 scale: no shear, rotation or projective terms.
        let m = transform.matrix();
        assert_relative_eq!(m[(0, 0)], 0.9, epsilon = 1e-9);
        assert_relative_eq!(m[(1, 1)], 0.9, epsilon = 1e-9);
        for (r, c) in [(0, 1), (0, 2), (1, 0), (1, 2), (2, 0), (2, 1)] {
            assert_relative_eq!(m[(r, c)], 0.0, epsilon = 1e-9);
        }

        let image = GrayImage::from_pixel(11, 11, Luma([173]));
        let warped = warp(&image, &transform, size, Luma([255])).unwrap();
        assert_eq!(warped.dimensions(), (10, 10));
        // The outermost ring may sample the border.
        for y in 1..9 {
            for x in 1..9 {
                assert_eq!(warped.get_pixel(x, y).0[0], 173, "({x},{y})");
            }
        }
    }

    #[test]
    fn corners_land_on_destination_rectangle() {
        let quad = order_corners([p(40.0, 30.0), p(160.0, 50.0), p(170.0, 170.0), p(30.0, 150.0)]);
        let (size, transform) = perspective_transform(&quad).unwrap();
        let (w, h) = ((size.width - 1) as f32, (size.height - 1) as f32);
        assert_maps(&transform, quad.top_left, p(0.0, 0.0));
        assert_maps(&transform, quad.top_right, p(w, 0.0));
        assert_maps(&transform, quad.bottom_right, p(w, h));
        assert_maps(&transform, quad.bottom_left, p(0.0, h));
    }

    #[test]
    fn output_size_truncates_longest_edges() {
        let quad = order_corners([p(0.0, 0.0), p(30.7, 0.0), p(30.7, 20.9), p(0.0, 20.9)]);
        let (size, _) = perspective_transform(&quad).unwrap();
        assert_eq!(size, Size::new(30, 20));
    }

    #[test]
    fn inverse_round_trips_points() {
        let quad = order_corners([p(12.0, 8.0), p(90.0, 15.0), p(95.0, 70.0), p(5.0, 66.0)]);
        let (_, transform) = perspective_transform(&quad).unwrap();
        let inverse = transform.inverse().unwrap();
        for point in [p(0.0, 0.0), p(50.0, 20.0), p(33.3, 61.0)] {
            assert_maps(&inverse, transform.apply(point), point);
        }
    }

    #[test]
    fn collapsed_quad_is_rejected() {
        let quad = order_corners([p(5.0, 5.0), p(5.0, 5.0), p(5.0, 5.0), p(5.0, 5.0)]);
        assert!(matches!(
            perspective_transform(&quad),
            Err(ScanwerkError::DegenerateQuad(_))
        ));
    }

    #[test]
    fn skewed_document_fills_the_output() {
        let mut image = RgbImage::from_pixel(200, 200, Rgb([0, 0, 0]));
        let corners = [
            Point::new(40, 30),
            Point::new(160, 50),
            Point::new(170, 170),
            Point::new(30, 150),
        ];
        draw_polygon_mut(&mut image, &corners, Rgb([255, 255, 255]));

        let quad = order_corners(corners.map(|c| p(c.x as f32, c.y as f32)));
        let (size, transform) = perspective_transform(&quad).unwrap();
        let warped = warp(&image, &transform, size, Rgb([255, 255, 255])).unwrap();

        let total = warped.pixels().count();
        let bright = warped.pixels().filter(|px| px.0[0] > 200).count();
        assert!(
            bright * 100 >= total * 90,
            "only {bright} of {total} pixels came from the document"
        );
    }
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Canonical four-corner quads and resolution rescaling.

use imageproc::point::Point;
use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::types::Size;

/// Four points in canonical order: top-left, top-right, bottom-right,
/// bottom-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaledQuad {
    pub top_left: Point<f32>,
    pub top_right: Point<f32>,
    pub bottom_right: Point<f32>,
    pub bottom_left: Point<f32>,
}

impl ScaledQuad {
    /// Order an approximated 4-vertex contour.
    pub fn from_contour(contour: &[Point<i32>]) -> Result<Self> {
        let points: [Point<i32>; 4] = contour
            .try_into()
            .map_err(|_| ScanwerkError::NotAQuad(contour.len()))?;
        Ok(order_corners(
            points.map(|p| Point::new(p.x as f32, p.y as f32)),
        ))
    }

    /// Corners as `[TL, TR, BR, BL]`.
    pub fn corners(&self) -> [Point<f32>; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
    }

    /// Scale from a raster of `from` pixels to one of `to` pixels. Each axis
    /// is scaled independently.
    pub fn rescale(&self, from: Size, to: Size) -> Self {
        let sx = to.width as f32 / from.width as f32;
        let sy = to.height as f32 / from.height as f32;
        let scale = |p: Point<f32>| Point::new(p.x * sx, p.y * sy);
        Self {
            top_left: scale(self.top_left),
            top_right: scale(self.top_right),
            bottom_right: scale(self.bottom_right),
            bottom_left: scale(self.bottom_left),
        }
    }
}

/// Label four points as TL/TR/BR/BL.
///
/// The two smallest-x points form the left pair and the other two the right
/// pair; within a pair the smaller y is on top. Ties in x are broken by y, so
/// the labelling depends only on the point set. This assumes a roughly
/// upright document; a quad turned about 45° can be mislabelled.
pub fn order_corners(points: [Point<f32>; 4]) -> ScaledQuad {
    let mut sorted = points;
    sorted.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));

    let (top_left, bottom_left) = split_pair(sorted[0], sorted[1]);
    let (top_right, bottom_right) = split_pair(sorted[2], sorted[3]);

    ScaledQuad {
        top_left,
        top_right,
        bottom_right,
        bottom_left,
    }
}

/// `(top, bottom)` of a pair; equal y keeps the first as top.
fn split_pair(a: Point<f32>, b: Point<f32>) -> (Point<f32>, Point<f32>) {
    if b.y < a.y { (b, a) } else { (a, b) }
}

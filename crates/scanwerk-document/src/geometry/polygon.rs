// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Closed-polygon helpers: perimeter, area, Douglas-Peucker simplification,
// and the exterior-angle rectangle test.

use imageproc::point::Point;
use scanwerk_core::types::AngleBand;

/// Perimeter of the closed polygon through `points`.
pub fn arc_length(points: &[Point<i32>]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| distance(*a, *b))
        .sum()
}

/// Enclosed area by the shoelace formula. Orientation is ignored.
pub fn polygon_area<T>(points: &[Point<T>]) -> f64
where
    T: Into<f64> + Copy,
{
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut twice_area = 0.0f64;
    for i in 0..n {
        let j = (i + 1) % n;
        let (xi, yi) = (points[i].x.into(), points[i].y.into());
        let (xj, yj) = (points[j].x.into(), points[j].y.into());
        twice_area += xi * yj - xj * yi;
    }
    twice_area.abs() / 2.0
}

/// Douglas-Peucker simplification of a closed contour.
///
/// The ring is split at its first point and the point farthest from it, each
/// half is simplified as an open chain, and a final sweep drops vertices
/// lying within `epsilon` of the line through their neighbours (the split
/// point is arbitrary and may sit mid-edge).
pub fn approximate_polygon(contour: &[Point<i32>], epsilon: f64) -> Vec<Point<i32>> {
    let n = contour.len();
    if n < 3 {
        return contour.to_vec();
    }

    let origin = contour[0];
    let (far, far_dist) = contour
        .iter()
        .enumerate()
        .map(|(i, p)| (i, distance(origin, *p)))
        .fold((0, 0.0), |best, cur| if cur.1 > best.1 { cur } else { best });
    if far_dist == 0.0 {
        return vec![origin];
    }

    // Index `n` stands for the start point closing the ring.
    let at = |i: usize| contour[i % n];
    let mut keep = vec![false; n + 1];
    mark_chain(&at, 0, far, epsilon, &mut keep);
    mark_chain(&at, far, n, epsilon, &mut keep);

    let mut polygon: Vec<Point<i32>> = (0..n).filter(|&i| keep[i]).map(at).collect();
    drop_collinear(&mut polygon, epsilon);
    polygon
}

/// Open-chain Douglas-Peucker over indices `first..=last`, marking kept
/// vertices.
fn mark_chain(
    at: &impl Fn(usize) -> Point<i32>,
    first: usize,
    last: usize,
    epsilon: f64,
    keep: &mut [bool],
) {
    let mut stack = vec![(first, last)];
    while let Some((a, b)) = stack.pop() {
        keep[a] = true;
        keep[b] = true;
        if b <= a + 1 {
            continue;
        }
        let (start, end) = (at(a), at(b));
        let mut split = a;
        let mut max_dist = 0.0;
        for i in a + 1..b {
            let d = segment_distance(at(i), start, end);
            if d > max_dist {
                max_dist = d;
                split = i;
            }
        }
        if max_dist > epsilon {
            stack.push((split, b));
            stack.push((a, split));
        }
    }
}

fn drop_collinear(polygon: &mut Vec<Point<i32>>, epsilon: f64) {
    let mut i = 0;
    while polygon.len() > 3 && i < polygon.len() {
        let n = polygon.len();
        let prev = polygon[(i + n - 1) % n];
        let next = polygon[(i + 1) % n];
        if segment_distance(polygon[i], prev, next) <= epsilon {
            polygon.remove(i);
        } else {
            i += 1;
        }
    }
}

/// Exterior angle at every vertex, in degrees within `0..=180`.
///
/// Entry `i` is the turn from edge `i` (vertex `i` to `i + 1`) to edge
/// `i + 1`, wrapping around the closed polygon.
pub fn exterior_angles(polygon: &[Point<i32>]) -> Vec<f64> {
    let n = polygon.len();
    if n < 3 {
        return Vec::new();
    }
    let edge = |i: usize| {
        let a = polygon[i % n];
        let b = polygon[(i + 1) % n];
        ((b.x - a.x) as f64, (b.y - a.y) as f64)
    };
    (0..n)
        .map(|i| {
            let (x1, y1) = edge(i);
            let (x2, y2) = edge(i + 1);
            let cross = x1 * y2 - y1 * x2;
            let dot = x1 * x2 + y1 * y2;
            cross.atan2(dot).to_degrees().abs()
        })
        .collect()
}

/// Every angle inside the band.
pub fn accepts_angles(angles: &[f64], band: AngleBand) -> bool {
    angles.iter().all(|&angle| band.contains(angle))
}

/// Rectangle-likeness: at least three vertices and every exterior angle in
/// the band.
pub fn is_rectangle_like(polygon: &[Point<i32>], band: AngleBand) -> bool {
    polygon.len() >= 3 && accepts_angles(&exterior_angles(polygon), band)
}

fn distance(a: Point<i32>, b: Point<i32>) -> f64 {
    let dx = (b.x - a.x) as f64;
    let dy = (b.y - a.y) as f64;
    dx.hypot(dy)
}

/// Distance from `p` to the infinite line through `a` and `b`, or to `a`
/// when the two coincide.
fn segment_distance(p: Point<i32>, a: Point<i32>, b: Point<i32>) -> f64 {
    let len = distance(a, b);
    if len == 0.0 {
        return distance(a, p);
    }
    let cross = (b.x - a.x) as f64 * (p.y - a.y) as f64 - (b.y - a.y) as f64 * (p.x - a.x) as f64;
    cross.abs() / len
}

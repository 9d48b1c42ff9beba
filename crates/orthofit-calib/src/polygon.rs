//! Closed-contour polygon approximation.

use imageproc::geometry::approximate_polygon_dp;
use imageproc::point::Point;

fn dist2(a: Point<i32>, b: Point<i32>) -> i64 {
    let dx = i64::from(a.x - b.x);
    let dy = i64::from(a.y - b.y);
    dx * dx + dy * dy
}

fn farthest_from(points: &[Point<i32>], from: Point<i32>) -> usize {
    points
        .iter()
        .enumerate()
        .max_by_key(|(_, p)| dist2(**p, from))
        .map_or(0, |(i, _)| i)
}

/// Douglas-Peucker approximation of a closed contour.
///
/// The contour is split at two mutually distant points (both lie on the
/// convex hull, so both survive as vertices) and each half is simplified
/// as an open curve. The returned polygon does not repeat its first vertex.
pub fn approximate_closed_polygon(contour: &[Point<i32>], epsilon: f64) -> Vec<Point<i32>> {
    if contour.len() < 3 || epsilon <= 0.0 {
        return contour.to_vec();
    }

    let a = farthest_from(contour, contour[0]);
    let mut ring: Vec<Point<i32>> = contour[a..].iter().chain(&contour[..a]).copied().collect();
    let b = farthest_from(&ring, ring[0]);
    if b == 0 {
        return vec![ring[0]];
    }
    ring.push(ring[0]);

    let mut first = approximate_polygon_dp(&ring[..=b], epsilon, false);
    let second = approximate_polygon_dp(&ring[b..], epsilon, false);

    first.pop();
    first.extend_from_slice(&second[..second.len().saturating_sub(1)]);
    first.dedup();
    first
}

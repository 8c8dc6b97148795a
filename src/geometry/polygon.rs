//! Planar convex polygon helpers for hull footprints.
//!
//! Polygons are plain `Vec<Vector2<f64>>` in counter-clockwise order without
//! a repeated closing vertex.

use std::cmp::Ordering;

use nalgebra::Vector2;

/// Points closer than this are merged while building a hull.
const DEDUP_EPS: f64 = 1e-9;

/// Tolerance for on-edge containment tests.
const ON_EDGE_EPS: f64 = 1e-9;

#[inline]
fn cross(o: &Vector2<f64>, a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// Convex hull of a point set (Andrew's monotone chain).
///
/// Output is counter-clockwise, with collinear and duplicate points removed.
/// Degenerate inputs (fewer than three non-collinear points) return fewer
/// than three vertices. Non-finite points are ignored.
pub fn convex_hull(points: &[Vector2<f64>]) -> Vec<Vector2<f64>> {
    let mut pts: Vec<Vector2<f64>> = points
        .iter()
        .filter(|p| p.x.is_finite() && p.y.is_finite())
        .copied()
        .collect();

    pts.sort_by(|a, b| {
        a.x.partial_cmp(&b.x)
            .unwrap_or(Ordering::Equal)
            .then(a.y.partial_cmp(&b.y).unwrap_or(Ordering::Equal))
    });
    pts.dedup_by(|a, b| (*a - *b).norm() < DEDUP_EPS);

    if pts.len() < 3 {
        return pts;
    }

    let mut lower: Vec<Vector2<f64>> = Vec::with_capacity(pts.len());
    for p in &pts {
        while lower.len() >= 2
            && cross(&lower[lower.len() - 2], &lower[lower.len() - 1], p) <= 0.0
        {
            lower.pop();
        }
        lower.push(*p);
    }

    let mut upper: Vec<Vector2<f64>> = Vec::with_capacity(pts.len());
    for p in pts.iter().rev() {
        while upper.len() >= 2
            && cross(&upper[upper.len() - 2], &upper[upper.len() - 1], p) <= 0.0
        {
            upper.pop();
        }
        upper.push(*p);
    }

    // Last point of each chain is the first point of the other
    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Signed shoelace area (positive for counter-clockwise).
pub fn signed_area(poly: &[Vector2<f64>]) -> f64 {
    if poly.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..poly.len() {
        let a = poly[i];
        let b = poly[(i + 1) % poly.len()];
        sum += a.x * b.y - b.x * a.y;
    }
    0.5 * sum
}

pub fn area(poly: &[Vector2<f64>]) -> f64 {
    signed_area(poly).abs()
}

/// Vertex average. Zero for an empty polygon.
pub fn centroid(poly: &[Vector2<f64>]) -> Vector2<f64> {
    if poly.is_empty() {
        return Vector2::zeros();
    }
    poly.iter().fold(Vector2::zeros(), |acc, p| acc + p) / poly.len() as f64
}

/// Point-in-convex-polygon test; points on the boundary are inside.
pub fn contains(poly: &[Vector2<f64>], p: &Vector2<f64>) -> bool {
    if poly.len() < 3 {
        return false;
    }
    (0..poly.len()).all(|i| {
        let a = &poly[i];
        let b = &poly[(i + 1) % poly.len()];
        cross(a, b, p) >= -ON_EDGE_EPS
    })
}

fn segment_distance(p: &Vector2<f64>, a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq < DEDUP_EPS * DEDUP_EPS {
        return (p - a).norm();
    }
    let t = ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    (p - (a + ab * t)).norm()
}

/// Distance from `p` to the polygon; zero when inside.
///
/// Degenerate polygons are treated as their point or segment set. An empty
/// polygon is infinitely far away.
pub fn distance(poly: &[Vector2<f64>], p: &Vector2<f64>) -> f64 {
    match poly.len() {
        0 => f64::INFINITY,
        1 => (p - poly[0]).norm(),
        2 => segment_distance(p, &poly[0], &poly[1]),
        n => {
            if contains(poly, p) {
                return 0.0;
            }
            (0..n)
                .map(|i| segment_distance(p, &poly[i], &poly[(i + 1) % n]))
                .fold(f64::INFINITY, f64::min)
        }
    }
}

fn project(poly: &[Vector2<f64>], axis: &Vector2<f64>) -> (f64, f64) {
    poly.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
        let d = p.dot(axis);
        (lo.min(d), hi.max(d))
    })
}

fn separated_along_edges(a: &[Vector2<f64>], b: &[Vector2<f64>], padding: f64) -> bool {
    for i in 0..a.len() {
        let edge = a[(i + 1) % a.len()] - a[i];
        let len = edge.norm();
        if len < DEDUP_EPS {
            continue;
        }
        let normal = Vector2::new(edge.y, -edge.x) / len;
        let (a_lo, a_hi) = project(a, &normal);
        let (b_lo, b_hi) = project(b, &normal);
        if a_hi + padding < b_lo || b_hi + padding < a_lo {
            return true;
        }
    }
    false
}

/// Separating-axis overlap test for two convex polygons.
///
/// `padding` widens the test: polygons closer than `padding` along every
/// axis count as overlapping. Touching polygons overlap.
pub fn convex_overlap(a: &[Vector2<f64>], b: &[Vector2<f64>], padding: f64) -> bool {
    if a.len() < 3 || b.len() < 3 {
        return false;
    }
    !separated_along_edges(a, b, padding) && !separated_along_edges(b, a, padding)
}

/// Area of the intersection of two convex CCW polygons (Sutherland-Hodgman).
pub fn convex_intersection_area(subject: &[Vector2<f64>], clip: &[Vector2<f64>]) -> f64 {
    if subject.len() < 3 || clip.len() < 3 {
        return 0.0;
    }

    let mut output: Vec<Vector2<f64>> = subject.to_vec();
    for i in 0..clip.len() {
        if output.is_empty() {
            break;
        }
        let a = clip[i];
        let b = clip[(i + 1) % clip.len()];
        let input = std::mem::take(&mut output);

        for j in 0..input.len() {
            let cur = input[j];
            let prev = input[(j + input.len() - 1) % input.len()];
            let cur_in = cross(&a, &b, &cur) >= 0.0;
            let prev_in = cross(&a, &b, &prev) >= 0.0;

            if cur_in {
                if !prev_in {
                    output.push(line_intersection(&prev, &cur, &a, &b));
                }
                output.push(cur);
            } else if prev_in {
                output.push(line_intersection(&prev, &cur, &a, &b));
            }
        }
    }
    area(&output)
}

fn line_intersection(
    p1: &Vector2<f64>,
    p2: &Vector2<f64>,
    a: &Vector2<f64>,
    b: &Vector2<f64>,
) -> Vector2<f64> {
    let d1 = cross(a, b, p1);
    let d2 = cross(a, b, p2);
    let denom = d1 - d2;
    if denom.abs() < f64::EPSILON {
        return *p1;
    }
    p1 + (p2 - p1) * (d1 / denom)
}

/// Axis-aligned square centred on `(cx, cy)`, counter-clockwise.
pub fn square(cx: f64, cy: f64, half: f64) -> Vec<Vector2<f64>> {
    vec![
        Vector2::new(cx - half, cy - half),
        Vector2::new(cx + half, cy - half),
        Vector2::new(cx + half, cy + half),
        Vector2::new(cx - half, cy + half),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_convex_hull_drops_interior_and_collinear() {
        let pts = vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(1.0, 0.0),
            Vector2::new(2.0, 0.0),
            Vector2::new(2.0, 2.0),
            Vector2::new(0.0, 2.0),
            Vector2::new(1.0, 1.0),
            Vector2::new(0.0, 0.0),
        ];
        let hull = convex_hull(&pts);

        assert_eq!(hull.len(), 4);
        assert!(signed_area(&hull) > 0.0);
        assert_relative_eq!(area(&hull), 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_convex_hull_of_collinear_points_is_degenerate() {
        let pts: Vec<_> = (0..5).map(|i| Vector2::new(i as f64, 2.0 * i as f64)).collect();
        assert!(convex_hull(&pts).len() < 3);
    }

    #[test]
    fn test_contains_and_distance() {
        let sq = square(0.0, 0.0, 1.0);

        assert!(contains(&sq, &Vector2::new(0.5, -0.5)));
        assert!(contains(&sq, &Vector2::new(1.0, 0.0)));
        assert!(!contains(&sq, &Vector2::new(1.5, 0.0)));

        assert_relative_eq!(distance(&sq, &Vector2::new(0.2, 0.2)), 0.0);
        assert_relative_eq!(distance(&sq, &Vector2::new(3.0, 0.0)), 2.0, epsilon = 1e-12);
        assert_relative_eq!(
            distance(&sq, &Vector2::new(2.0, 2.0)),
            2.0_f64.sqrt(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_overlap_with_padding() {
        let a = square(0.0, 0.0, 0.5);
        let b = square(1.2, 0.0, 0.5);

        assert!(!convex_overlap(&a, &b, 0.0));
        assert!(convex_overlap(&a, &b, 0.25));
        assert!(convex_overlap(&a, &square(0.9, 0.9, 0.5), 0.0));
    }

    #[test]
    fn test_overlap_rejects_diagonal_separation() {
        // Bounding boxes intersect but the rotated square does not touch
        let diamond = vec![
            Vector2::new(1.0, 0.0),
            Vector2::new(2.0, 1.0),
            Vector2::new(1.0, 2.0),
            Vector2::new(0.0, 1.0),
        ];
        let corner = square(0.1, 0.1, 0.2);
        assert!(!convex_overlap(&diamond, &corner, 0.0));
    }

    #[test]
    fn test_intersection_area() {
        let a = square(0.0, 0.0, 1.0);
        let b = square(1.0, 1.0, 1.0);
        assert_relative_eq!(convex_intersection_area(&a, &b), 1.0, epsilon = 1e-12);
        assert_relative_eq!(convex_intersection_area(&a, &square(5.0, 0.0, 1.0)), 0.0);
    }
}

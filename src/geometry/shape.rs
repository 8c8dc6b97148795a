//! Triangle-mesh shapes, the `Volume` abstraction, and YAML shape specs.
//!
//! Static entity geometry, ROI include volumes and named entity areas are all
//! stored as a `Shape`: a closed triangle mesh in the owner's local frame.

use anyhow::{Result, bail};
use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};

use super::{SE3, polygon};

/// Rays closer than this to a triangle plane are treated as parallel.
const RAY_EPS: f64 = 1e-12;

/// Three skewed, non axis-aligned directions used for parity voting.
///
/// Using odd directions keeps the rays away from the shared edges and
/// vertices of box-like meshes.
const PARITY_RAYS: [[f64; 3]; 3] = [
    [0.5773, 0.5931, 0.5613],
    [-0.6113, 0.5092, 0.6061],
    [0.4987, -0.6311, -0.5942],
];

/// A region of space that can answer point queries in its own local frame.
pub trait Volume {
    /// Whether `p` (local frame) lies inside the volume.
    fn contains(&self, p: &Vector3<f64>) -> bool;

    /// Euclidean distance from `p` to the volume; zero inside.
    fn distance(&self, p: &Vector3<f64>) -> f64;

    /// Whether `p` lies inside or within `padding` of the volume.
    fn within(&self, p: &Vector3<f64>, padding: f64) -> bool {
        if padding <= 0.0 {
            self.contains(p)
        } else {
            self.distance(p) <= padding
        }
    }
}

impl<V: Volume + ?Sized> Volume for &V {
    fn contains(&self, p: &Vector3<f64>) -> bool {
        (**self).contains(p)
    }

    fn distance(&self, p: &Vector3<f64>) -> f64 {
        (**self).distance(p)
    }

    fn within(&self, p: &Vector3<f64>, padding: f64) -> bool {
        (**self).within(p, padding)
    }
}

/// Closed triangle mesh with cached axis-aligned bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    vertices: Vec<Vector3<f64>>,
    triangles: Vec<[usize; 3]>,
    min: Vector3<f64>,
    max: Vector3<f64>,
}

impl Shape {
    /// Mesh with no triangles.
    pub fn empty() -> Self {
        Self {
            vertices: Vec::new(),
            triangles: Vec::new(),
            min: Vector3::zeros(),
            max: Vector3::zeros(),
        }
    }

    /// Build from raw vertices and index triples.
    ///
    /// Fails if any triangle references a vertex that does not exist.
    pub fn from_mesh(vertices: Vec<Vector3<f64>>, triangles: Vec<[usize; 3]>) -> Result<Self> {
        for (t_idx, tri) in triangles.iter().enumerate() {
            if let Some(bad) = tri.iter().find(|&&i| i >= vertices.len()) {
                bail!(
                    "Triangle {} references vertex {} but the mesh has {} vertices",
                    t_idx,
                    bad,
                    vertices.len()
                );
            }
        }
        Ok(Self::from_parts(vertices, triangles))
    }

    fn from_parts(vertices: Vec<Vector3<f64>>, triangles: Vec<[usize; 3]>) -> Self {
        if vertices.is_empty() {
            return Self::empty();
        }
        let mut min = Vector3::repeat(f64::INFINITY);
        let mut max = Vector3::repeat(f64::NEG_INFINITY);
        for v in &vertices {
            min = min.inf(v);
            max = max.sup(v);
        }
        Self {
            vertices,
            triangles,
            min,
            max,
        }
    }

    /// Axis-aligned box between two corners.
    pub fn from_box(min: Vector3<f64>, max: Vector3<f64>) -> Self {
        let lo = min.inf(&max);
        let hi = min.sup(&max);
        let rect = vec![
            Vector2::new(lo.x, lo.y),
            Vector2::new(hi.x, lo.y),
            Vector2::new(hi.x, hi.y),
            Vector2::new(lo.x, hi.y),
        ];
        Self::extruded_polygon(&rect, lo.z, hi.z)
    }

    /// Vertical prism over the convex hull of `points`.
    ///
    /// Returns an empty shape when the points do not span an area.
    pub fn extruded_polygon(points: &[Vector2<f64>], z_min: f64, z_max: f64) -> Self {
        let poly = polygon::convex_hull(points);
        let n = poly.len();
        if n < 3 {
            return Self::empty();
        }

        let mut vertices = Vec::with_capacity(2 * n);
        vertices.extend(poly.iter().map(|p| Vector3::new(p.x, p.y, z_min)));
        vertices.extend(poly.iter().map(|p| Vector3::new(p.x, p.y, z_max)));

        let mut triangles = Vec::with_capacity(4 * n);
        for i in 1..n - 1 {
            triangles.push([0, i + 1, i]);
            triangles.push([n, n + i, n + i + 1]);
        }
        for i in 0..n {
            let j = (i + 1) % n;
            triangles.push([i, j, n + j]);
            triangles.push([i, n + j, n + i]);
        }
        Self::from_parts(vertices, triangles)
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn vertices(&self) -> &[Vector3<f64>] {
        &self.vertices
    }

    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    /// Axis-aligned bounds `(min, max)`.
    pub fn bounds(&self) -> (Vector3<f64>, Vector3<f64>) {
        (self.min, self.max)
    }

    /// Copy of the mesh with every vertex mapped through `pose`.
    pub fn transformed(&self, pose: &SE3) -> Shape {
        let vertices = self.vertices.iter().map(|v| pose.transform_point(v)).collect();
        Self::from_parts(vertices, self.triangles.clone())
    }

    fn in_bounds(&self, p: &Vector3<f64>, margin: f64) -> bool {
        p.x >= self.min.x - margin
            && p.y >= self.min.y - margin
            && p.z >= self.min.z - margin
            && p.x <= self.max.x + margin
            && p.y <= self.max.y + margin
            && p.z <= self.max.z + margin
    }

    fn corners(&self, tri: &[usize; 3]) -> (Vector3<f64>, Vector3<f64>, Vector3<f64>) {
        (
            self.vertices[tri[0]],
            self.vertices[tri[1]],
            self.vertices[tri[2]],
        )
    }

    /// Nearest intersection distance along the ray `origin + t * dir`, `t > 0`.
    pub fn ray_intersection(&self, origin: &Vector3<f64>, dir: &Vector3<f64>) -> Option<f64> {
        self.triangles
            .iter()
            .filter_map(|tri| {
                let (a, b, c) = self.corners(tri);
                ray_triangle(origin, dir, &a, &b, &c)
            })
            .min_by(|x, y| x.total_cmp(y))
    }

    fn crossing_count(&self, origin: &Vector3<f64>, dir: &Vector3<f64>) -> usize {
        self.triangles
            .iter()
            .filter(|tri| {
                let (a, b, c) = self.corners(tri);
                ray_triangle(origin, dir, &a, &b, &c).is_some()
            })
            .count()
    }
}

impl Default for Shape {
    fn default() -> Self {
        Self::empty()
    }
}

impl Volume for Shape {
    /// Ray-parity test voted over three skewed rays.
    fn contains(&self, p: &Vector3<f64>) -> bool {
        if self.is_empty() || !self.in_bounds(p, 0.0) {
            return false;
        }
        let inside_votes = PARITY_RAYS
            .iter()
            .filter(|d| {
                let dir = Vector3::new(d[0], d[1], d[2]);
                self.crossing_count(p, &dir) % 2 == 1
            })
            .count();
        inside_votes >= 2
    }

    fn distance(&self, p: &Vector3<f64>) -> f64 {
        if self.is_empty() {
            return f64::INFINITY;
        }
        if self.contains(p) {
            return 0.0;
        }
        self.triangles
            .iter()
            .map(|tri| {
                let (a, b, c) = self.corners(tri);
                (p - closest_point_on_triangle(p, &a, &b, &c)).norm()
            })
            .fold(f64::INFINITY, f64::min)
    }

    fn within(&self, p: &Vector3<f64>, padding: f64) -> bool {
        if self.is_empty() || !self.in_bounds(p, padding.max(0.0)) {
            return false;
        }
        if padding <= 0.0 {
            self.contains(p)
        } else {
            self.distance(p) <= padding
        }
    }
}

/// Möller-Trumbore ray/triangle intersection, returning `t > 0` on hit.
fn ray_triangle(
    origin: &Vector3<f64>,
    dir: &Vector3<f64>,
    a: &Vector3<f64>,
    b: &Vector3<f64>,
    c: &Vector3<f64>,
) -> Option<f64> {
    let e1 = b - a;
    let e2 = c - a;
    let h = dir.cross(&e2);
    let det = e1.dot(&h);
    if det.abs() < RAY_EPS {
        return None;
    }
    let inv = 1.0 / det;
    let s = origin - a;
    let u = inv * s.dot(&h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(&e1);
    let v = inv * dir.dot(&q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = inv * e2.dot(&q);
    (t > RAY_EPS).then_some(t)
}

/// Closest point on triangle `abc` to `p` (Voronoi region walk).
fn closest_point_on_triangle(
    p: &Vector3<f64>,
    a: &Vector3<f64>,
    b: &Vector3<f64>,
    c: &Vector3<f64>,
) -> Vector3<f64> {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;
    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return *a;
    }

    let bp = p - b;
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);
    if d3 >= 0.0 && d4 <= d3 {
        return *b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return a + ab * v;
    }

    let cp = p - c;
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);
    if d6 >= 0.0 && d5 <= d6 {
        return *c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return a + ac * w;
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return b + (c - b) * w;
    }

    let denom = va + vb + vc;
    if denom.abs() < RAY_EPS {
        // Degenerate (zero-area) triangle
        return *a;
    }
    let v = vb / denom;
    let w = vc / denom;
    a + ab * v + ac * w
}

// ────────────────────────────────────────────────────────────────────────────
// YAML shape description
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct XyzSpec {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl From<XyzSpec> for Vector3<f64> {
    fn from(v: XyzSpec) -> Self {
        Vector3::new(v.x, v.y, v.z)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct XySpec {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BoxSpec {
    pub min: XyzSpec,
    pub max: XyzSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PolygonSpec {
    pub points: Vec<XySpec>,
    pub z_min: f64,
    pub z_max: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MeshSpec {
    pub vertices: Vec<[f64; 3]>,
    pub triangles: Vec<[usize; 3]>,
}

/// Shape as written in scene files and entity data blobs.
///
/// Exactly one of the three forms must be present:
/// ```yaml
/// box: { min: { x: -0.4, y: -0.4, z: 0.7 }, max: { x: 0.4, y: 0.4, z: 0.75 } }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ShapeSpec {
    #[serde(rename = "box", default, skip_serializing_if = "Option::is_none")]
    pub box_: Option<BoxSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polygon: Option<PolygonSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesh: Option<MeshSpec>,
}

impl ShapeSpec {
    pub fn to_shape(&self) -> Result<Shape> {
        match (&self.box_, &self.polygon, &self.mesh) {
            (Some(b), None, None) => Ok(Shape::from_box(b.min.into(), b.max.into())),
            (None, Some(p), None) => {
                let pts: Vec<Vector2<f64>> =
                    p.points.iter().map(|q| Vector2::new(q.x, q.y)).collect();
                Ok(Shape::extruded_polygon(&pts, p.z_min, p.z_max))
            }
            (None, None, Some(m)) => {
                let vertices = m
                    .vertices
                    .iter()
                    .map(|v| Vector3::new(v[0], v[1], v[2]))
                    .collect();
                Shape::from_mesh(vertices, m.triangles.clone())
            }
            (None, None, None) => bail!("Shape has none of 'box', 'polygon' or 'mesh'"),
            _ => bail!("Shape must have exactly one of 'box', 'polygon' or 'mesh'"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_box() -> Shape {
        Shape::from_box(Vector3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 1.0, 1.0))
    }

    #[test]
    fn test_box_is_closed_mesh() {
        let b = unit_box();
        assert_eq!(b.vertices().len(), 8);
        assert_eq!(b.triangles().len(), 12);
        assert!(!b.is_empty());
    }

    #[test]
    fn test_box_contains() {
        let b = unit_box();
        assert!(b.contains(&Vector3::new(0.5, 0.5, 0.5)));
        assert!(b.contains(&Vector3::new(0.01, 0.99, 0.2)));
        assert!(!b.contains(&Vector3::new(1.5, 0.5, 0.5)));
        assert!(!b.contains(&Vector3::new(0.5, 0.5, -0.01)));
    }

    #[test]
    fn test_box_distance() {
        let b = unit_box();
        assert_relative_eq!(b.distance(&Vector3::new(0.5, 0.5, 0.5)), 0.0);
        assert_relative_eq!(b.distance(&Vector3::new(0.5, 0.5, 1.3)), 0.3, epsilon = 1e-12);
        assert_relative_eq!(
            b.distance(&Vector3::new(2.0, 2.0, 0.5)),
            2.0_f64.sqrt(),
            epsilon = 1e-12
        );
        assert!(b.within(&Vector3::new(1.05, 0.5, 0.5), 0.1));
        assert!(!b.within(&Vector3::new(1.2, 0.5, 0.5), 0.1));
    }

    #[test]
    fn test_ray_intersection_nearest_face() {
        let b = unit_box();
        let t = b
            .ray_intersection(&Vector3::new(-1.0, 0.5, 0.5), &Vector3::new(1.0, 0.0, 0.0))
            .unwrap();
        assert_relative_eq!(t, 1.0, epsilon = 1e-12);
        assert!(
            b.ray_intersection(&Vector3::new(-1.0, 0.5, 0.5), &Vector3::new(-1.0, 0.0, 0.0))
                .is_none()
        );
    }

    #[test]
    fn test_transformed_moves_bounds() {
        let moved = unit_box().transformed(&SE3::from_xyz_yaw(2.0, 0.0, 1.0, 0.0));
        let (min, max) = moved.bounds();
        assert_relative_eq!(min, Vector3::new(2.0, 0.0, 1.0), epsilon = 1e-12);
        assert_relative_eq!(max, Vector3::new(3.0, 1.0, 2.0), epsilon = 1e-12);
        assert!(moved.contains(&Vector3::new(2.5, 0.5, 1.5)));
    }

    #[test]
    fn test_mesh_rejects_bad_index() {
        let verts = vec![Vector3::zeros(), Vector3::x(), Vector3::y()];
        assert!(Shape::from_mesh(verts.clone(), vec![[0, 1, 2]]).is_ok());
        assert!(Shape::from_mesh(verts, vec![[0, 1, 3]]).is_err());
    }

    #[test]
    fn test_degenerate_polygon_gives_empty_shape() {
        let line = vec![Vector2::new(0.0, 0.0), Vector2::new(1.0, 1.0)];
        let s = Shape::extruded_polygon(&line, 0.0, 1.0);
        assert!(s.is_empty());
        assert!(!s.contains(&Vector3::new(0.5, 0.5, 0.5)));
    }

    #[test]
    fn test_shape_spec_from_yaml() {
        let spec: ShapeSpec = serde_yaml::from_str(
            "box: { min: { x: 0, y: 0, z: 0 }, max: { x: 1, y: 2, z: 3 } }",
        )
        .unwrap();
        let shape = spec.to_shape().unwrap();
        assert_relative_eq!(shape.bounds().1, Vector3::new(1.0, 2.0, 3.0));

        let none = ShapeSpec::default();
        assert!(none.to_shape().is_err());

        let yaml = "mesh: { vertices: [[0, 0, 0]], triangles: [[0, 0, 1]] }";
        let bad: ShapeSpec = serde_yaml::from_str(yaml).unwrap();
        assert!(bad.to_shape().is_err());
    }
}

//! Convex-hull prisms: the footprint + height extent of dynamic entities.

use nalgebra::{Vector2, Vector3};

use super::shape::Volume;
use super::{SE3, polygon};

/// A vertical prism expressed relative to a paired pose.
///
/// `points` is the CCW footprint in the pose frame's XY plane; `z_min` and
/// `z_max` are heights relative to the pose origin. A hull with fewer than
/// three points is empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hull {
    pub points: Vec<Vector2<f64>>,
    pub z_min: f64,
    pub z_max: f64,
}

impl Hull {
    pub fn new(points: Vec<Vector2<f64>>, z_min: f64, z_max: f64) -> Self {
        Self {
            points,
            z_min: z_min.min(z_max),
            z_max: z_max.max(z_min),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.points.len() >= 3
    }

    pub fn height(&self) -> f64 {
        self.z_max - self.z_min
    }

    pub fn area(&self) -> f64 {
        polygon::area(&self.points)
    }

    /// Build a hull from world-frame footprint points and a world z range.
    ///
    /// The returned pose sits at the footprint centroid with its z at the
    /// middle of the range, so the hull is symmetric in height about it.
    pub fn from_world_points(xy: &[Vector2<f64>], z_min: f64, z_max: f64) -> (Hull, SE3) {
        let footprint = polygon::convex_hull(xy);
        let c = polygon::centroid(&footprint);
        let (lo, hi) = (z_min.min(z_max), z_max.max(z_min));
        let mid = 0.5 * (lo + hi);
        let half = 0.5 * (hi - lo);

        let hull = Hull {
            points: footprint.iter().map(|p| p - c).collect(),
            z_min: -half,
            z_max: half,
        };
        (hull, SE3::from_translation(Vector3::new(c.x, c.y, mid)))
    }

    /// Footprint in world XY.
    pub fn world_footprint(&self, pose: &SE3) -> Vec<Vector2<f64>> {
        self.points
            .iter()
            .map(|p| {
                let w = pose.transform_point(&Vector3::new(p.x, p.y, 0.0));
                Vector2::new(w.x, w.y)
            })
            .collect()
    }

    /// World `(z_min, z_max)`.
    pub fn world_z_range(&self, pose: &SE3) -> (f64, f64) {
        let z = pose.translation.z;
        (z + self.z_min, z + self.z_max)
    }

    /// Whether two posed prisms touch.
    ///
    /// Footprints must overlap (widened by `xy_padding`) and the world height
    /// intervals must overlap or lie within `z_tolerance` of each other.
    pub fn collides(
        &self,
        pose: &SE3,
        other: &Hull,
        other_pose: &SE3,
        xy_padding: f64,
        z_tolerance: f64,
    ) -> bool {
        if !self.is_valid() || !other.is_valid() {
            return false;
        }
        let (a0, a1) = self.world_z_range(pose);
        let (b0, b1) = other.world_z_range(other_pose);
        if a1 + z_tolerance < b0 || b1 + z_tolerance < a0 {
            return false;
        }
        polygon::convex_overlap(
            &self.world_footprint(pose),
            &other.world_footprint(other_pose),
            xy_padding,
        )
    }

    /// The prism as a `Volume` in the hull's pose frame.
    pub fn prism(&self) -> HullPrism<'_> {
        HullPrism { hull: self }
    }
}

/// Borrowed view of a hull answering point queries in its pose frame.
#[derive(Debug, Clone, Copy)]
pub struct HullPrism<'a> {
    hull: &'a Hull,
}

impl Volume for HullPrism<'_> {
    fn contains(&self, p: &Vector3<f64>) -> bool {
        self.hull.is_valid()
            && p.z >= self.hull.z_min
            && p.z <= self.hull.z_max
            && polygon::contains(&self.hull.points, &Vector2::new(p.x, p.y))
    }

    fn distance(&self, p: &Vector3<f64>) -> f64 {
        if !self.hull.is_valid() {
            return f64::INFINITY;
        }
        let dxy = polygon::distance(&self.hull.points, &Vector2::new(p.x, p.y));
        let dz = (self.hull.z_min - p.z).max(p.z - self.hull.z_max).max(0.0);
        (dxy * dxy + dz * dz).sqrt()
    }
}

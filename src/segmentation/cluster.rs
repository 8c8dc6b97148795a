//! Depth-image clustering into hull proposals.
//!
//! Breadth-first flood fill over valid pixels. The neighbourhood includes the
//! pixels two steps away along each axis so a one-pixel gap left by masking
//! does not split an object in two.

use std::collections::VecDeque;

use nalgebra::Vector2;
use tracing::debug;

use super::proposal::Proposal;
use crate::geometry::{Hull, SE3};
use crate::sensor::{CameraModel, DepthImage, is_valid_depth};

/// Neighbour offsets `(dx, dy)` visited during the flood fill.
const NEIGHBOURS: [(isize, isize); 8] = [
    (-1, 0),
    (1, 0),
    (0, -1),
    (0, 1),
    (-2, 0),
    (2, 0),
    (0, -2),
    (0, 2),
];

#[derive(Debug, Clone)]
pub struct Clusterer {
    /// Max depth difference (m) between connected pixels.
    pub depth_tolerance: f32,
    /// Clusters with fewer pixels are dropped.
    pub min_cluster_size: usize,
}

impl Clusterer {
    pub fn new(depth_tolerance: f32, min_cluster_size: usize) -> Self {
        Self {
            depth_tolerance,
            min_cluster_size,
        }
    }

    /// Flood-fill pixel clusters, in row-major order of their seed pixel.
    pub fn pixel_clusters(&self, depth: &DepthImage) -> Vec<Vec<usize>> {
        let (w, h) = (depth.width() as isize, depth.height() as isize);
        let mut visited = vec![false; depth.len()];
        let mut clusters = Vec::new();
        let mut queue = VecDeque::new();

        for seed in 0..depth.len() {
            if visited[seed] || !is_valid_depth(depth.get(seed)) {
                continue;
            }

            let mut members = Vec::new();
            visited[seed] = true;
            queue.push_back(seed);

            while let Some(idx) = queue.pop_front() {
                members.push(idx);
                let d = depth.get(idx);
                let (x, y) = depth.coords(idx);

                for (dx, dy) in NEIGHBOURS {
                    let nx = x as isize + dx;
                    let ny = y as isize + dy;
                    if nx < 0 || ny < 0 || nx >= w || ny >= h {
                        continue;
                    }
                    let n_idx = depth.index(nx as usize, ny as usize);
                    if visited[n_idx] {
                        continue;
                    }
                    let nd = depth.get(n_idx);
                    if is_valid_depth(nd) && (nd - d).abs() < self.depth_tolerance {
                        visited[n_idx] = true;
                        queue.push_back(n_idx);
                    }
                }
            }

            if members.len() >= self.min_cluster_size {
                members.sort_unstable();
                clusters.push(members);
            }
        }
        clusters
    }

    /// Cluster `depth` and turn each surviving cluster into a proposal.
    ///
    /// The footprint is the convex hull of the members' world XY, the height
    /// range their world Z range.
    pub fn cluster(
        &self,
        depth: &DepthImage,
        camera: &CameraModel,
        sensor_pose: &SE3,
    ) -> Vec<Proposal> {
        let clusters = self.pixel_clusters(depth);

        let proposals: Vec<Proposal> = clusters
            .into_iter()
            .map(|members| {
                let mut points = Vec::with_capacity(members.len());
                let mut xy = Vec::with_capacity(members.len());
                let mut z_min = f64::INFINITY;
                let mut z_max = f64::NEG_INFINITY;

                for &idx in &members {
                    let p = depth.point_at(camera, idx, depth.get(idx));
                    let p_world = sensor_pose.transform_point(&p);
                    z_min = z_min.min(p_world.z);
                    z_max = z_max.max(p_world.z);
                    xy.push(Vector2::new(p_world.x, p_world.y));
                    points.push(p);
                }

                let (hull, pose) = Hull::from_world_points(&xy, z_min, z_max);
                Proposal {
                    id: None,
                    hull,
                    pose,
                    points,
                    pixel_indices: members,
                }
            })
            .collect();

        debug!("Clustering: {} proposals", proposals.len());
        proposals
    }
}

impl Default for Clusterer {
    fn default() -> Self {
        Self::new(0.05, 100)
    }
}

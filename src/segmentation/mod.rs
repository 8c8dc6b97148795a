//! Depth segmentation: foreground extraction, clustering, hull refit and
//! proposal merging.

pub mod cluster;
pub mod foreground;
pub mod merge;
pub mod proposal;
pub mod refit;

use serde::{Deserialize, Serialize};

pub use cluster::Clusterer;
pub use foreground::{extract_within, remove_known_background};
pub use merge::merge_overlapping;
pub use proposal::Proposal;
pub use refit::{refit, refit_against_support};

/// Configuration for segmentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Max depth jump (m) between neighbouring pixels of one cluster.
    pub cluster_depth_tolerance: f32,
    /// Clusters with fewer pixels are dropped.
    pub min_cluster_size: usize,
    /// How far `z_min` is lowered before the first refit (m).
    pub support_grow_margin: f64,
    /// How far `z_min` is raised again before the second refit (m).
    pub support_shrink_margin: f64,
    /// Vertical gap (m) still treated as touching when merging proposals.
    pub merge_z_tolerance: f64,
    /// Footprint padding (m) for the merge collision test.
    pub merge_xy_padding: f64,
    /// Also mask pixels explained by tracked hulls, not only static shapes.
    pub subtract_tracked_hulls: bool,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            cluster_depth_tolerance: 0.05,
            min_cluster_size: 100,
            support_grow_margin: 0.04,
            support_shrink_margin: 0.01,
            merge_z_tolerance: 0.3,
            merge_xy_padding: 0.0,
            subtract_tracked_hulls: true,
        }
    }
}

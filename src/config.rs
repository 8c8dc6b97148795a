//! Top-level pipeline configuration.
//!
//! ```yaml
//! segmentation:
//!   min_cluster_size: 150
//!   subtract_tracked_hulls: false
//! association:
//!   strategy: hull_overlap
//! fitter:
//!   search_window: 0.3
//! ```
//!
//! Every field is optional; missing ones take their defaults.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::association::AssociationConfig;
use crate::fitting::FitterConfig;
use crate::segmentation::SegmentationConfig;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdaterConfig {
    pub segmentation: SegmentationConfig,
    pub association: AssociationConfig,
    pub fitter: FitterConfig,
}

impl UpdaterConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: UpdaterConfig =
            serde_yaml::from_str(yaml).context("Failed to parse updater config")?;
        config.check();
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
        let config: UpdaterConfig =
            serde_yaml::from_reader(file).with_context(|| format!("Failed to parse {:?}", path))?;
        config.check();
        Ok(config)
    }

    /// Warn about settings that are legal but almost certainly unintended.
    fn check(&self) {
        if self.fitter.linear_resolution <= 0.0 {
            warn!("fitter.linear_resolution <= 0, the fitter will only try the expected position");
        }
        if self.fitter.angular_resolution <= 0.0 {
            warn!("fitter.angular_resolution <= 0, the fitter will keep the expected yaw");
        }
        if self.segmentation.support_shrink_margin > self.segmentation.support_grow_margin {
            warn!(
                "support_shrink_margin ({}) exceeds support_grow_margin ({})",
                self.segmentation.support_shrink_margin, self.segmentation.support_grow_margin
            );
        }
        if self.segmentation.min_cluster_size == 0 {
            warn!("segmentation.min_cluster_size is 0, single pixels become proposals");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::association::AssociationStrategy;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = UpdaterConfig::default();
        assert_eq!(config.segmentation.min_cluster_size, 100);
        assert_eq!(config.segmentation.support_grow_margin, 0.04);
        assert_eq!(config.segmentation.support_shrink_margin, 0.01);
        assert!(config.segmentation.subtract_tracked_hulls);
        assert_eq!(config.association.strategy, AssociationStrategy::Proximity);
        assert_eq!(config.fitter.search_window, 0.2);
    }

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let config = UpdaterConfig::from_yaml_str(
            "segmentation:\n  min_cluster_size: 150\nassociation:\n  strategy: hull_overlap\n",
        )
        .unwrap();

        assert_eq!(config.segmentation.min_cluster_size, 150);
        assert_eq!(config.segmentation.cluster_depth_tolerance, 0.05);
        assert_eq!(config.association.strategy, AssociationStrategy::HullOverlap);
        assert_eq!(config.fitter, FitterConfig::default());
    }

    #[test]
    fn test_empty_yaml_is_default() {
        // serde_yaml reads an empty document as unit, not as an empty map
        let config = UpdaterConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, UpdaterConfig::default());
    }

    #[test]
    fn test_bad_yaml_is_an_error() {
        assert!(UpdaterConfig::from_yaml_str("association:\n  strategy: nearest\n").is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "fitter:\n  min_points: 5").unwrap();

        let config = UpdaterConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.fitter.min_points, 5);
        assert!(UpdaterConfig::from_yaml_file("/nonexistent/config.yaml").is_err());
    }
}

//! Supporting-entity pose fitting.
//!
//! A [`PoseFitter`] re-estimates the planar pose (x, y, yaw) of an entity
//! from a depth frame. The update pipeline calls it for the entity named in
//! a region-label request before segmenting on top of it.

pub mod correlative;

use nalgebra::Vector3;

use crate::geometry::{SE3, Shape, Volume};
use crate::sensor::DepthFrame;
use crate::world::Entity;

pub use correlative::{CorrelativeFitter, FitterConfig};

/// ROI restriction for [`PoseFitter::process_sensor_data`].
#[derive(Debug, Clone, Copy)]
pub struct RoiWindow<'a> {
    /// Inclusion volume in the entity frame.
    pub include: &'a Shape,
    /// Pose placing `include` in the world.
    pub entity_pose: SE3,
    /// World height window.
    pub z_min: f64,
    pub z_max: f64,
}

impl RoiWindow<'_> {
    /// Whether a world point passes the height window and inclusion mask.
    pub fn accepts(&self, p_world: &Vector3<f64>) -> bool {
        if p_world.z < self.z_min || p_world.z > self.z_max {
            return false;
        }
        if self.include.is_empty() {
            return true;
        }
        let p_local = self.entity_pose.inverse().transform_point(p_world);
        self.include.contains(&p_local)
    }
}

/// World-frame points prepared for fitting.
#[derive(Debug, Clone, Default)]
pub struct FitterData {
    pub points: Vec<Vector3<f64>>,
    pub sensor_pose: SE3,
}

/// Pose-fitting strategy.
pub trait PoseFitter {
    /// Collect the frame's points, optionally limited to an ROI.
    fn process_sensor_data(&self, frame: &DepthFrame, roi: Option<&RoiWindow<'_>>) -> FitterData;

    /// Estimate the entity's pose near `expected_pose`.
    ///
    /// `max_yaw_change` bounds the yaw search (radians, `0` keeps the yaw).
    /// Returns `None` when the data does not support a confident fit.
    fn estimate_entity_pose(
        &self,
        data: &FitterData,
        entity: &Entity,
        expected_pose: &SE3,
        max_yaw_change: f64,
    ) -> Option<SE3>;
}

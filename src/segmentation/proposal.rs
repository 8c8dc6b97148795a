use nalgebra::Vector3;

use crate::geometry::{Hull, SE3};
use crate::world::EntityId;

/// Candidate entity update built from one depth cluster.
///
/// Lives for a single update call: created by the clusterer, reshaped by the
/// merger and refitter, and finally bound to an id by association.
#[derive(Debug, Clone, PartialEq)]
pub struct Proposal {
    /// Existing or freshly generated id, set during association.
    pub id: Option<EntityId>,
    pub hull: Hull,
    /// World pose of the hull origin.
    pub pose: SE3,
    /// Sensor-frame points, parallel to `pixel_indices`.
    pub points: Vec<Vector3<f64>>,
    pub pixel_indices: Vec<usize>,
}

impl Proposal {
    pub fn new(hull: Hull, pose: SE3) -> Self {
        Self {
            id: None,
            hull,
            pose,
            points: Vec::new(),
            pixel_indices: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// World `(z_min, z_max)` of the hull.
    pub fn world_z_range(&self) -> (f64, f64) {
        self.hull.world_z_range(&self.pose)
    }
}

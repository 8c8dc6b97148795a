//! Ordered batch of world-model edits produced by one update call.

use std::collections::BTreeSet;

use nalgebra::Vector3;

use crate::geometry::{Hull, SE3};

use super::types::EntityId;

/// Depth evidence attached to an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    /// Flat indices into the depth image.
    pub pixel_indices: Vec<usize>,
    /// Sensor-frame points, parallel to `pixel_indices`.
    pub points: Vec<Vector3<f64>>,
    pub sensor_pose: SE3,
    pub timestamp_ns: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpdateCommand {
    SetPose { id: EntityId, pose: SE3 },
    SetHull { id: EntityId, hull: Hull },
    AddMeasurement { id: EntityId, measurement: Measurement },
    SetExistenceProbability { id: EntityId, probability: f64 },
    RemoveEntity { id: EntityId },
}

impl UpdateCommand {
    pub fn id(&self) -> &EntityId {
        match self {
            UpdateCommand::SetPose { id, .. }
            | UpdateCommand::SetHull { id, .. }
            | UpdateCommand::AddMeasurement { id, .. }
            | UpdateCommand::SetExistenceProbability { id, .. }
            | UpdateCommand::RemoveEntity { id } => id,
        }
    }
}

impl std::fmt::Display for UpdateCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpdateCommand::SetPose { id, pose } => write!(f, "set_pose {} {}", id, pose),
            UpdateCommand::SetHull { id, hull } => write!(
                f,
                "set_hull {} ({} points, z [{:.3}, {:.3}])",
                id,
                hull.points.len(),
                hull.z_min,
                hull.z_max
            ),
            UpdateCommand::AddMeasurement { id, measurement } => write!(
                f,
                "add_measurement {} ({} points)",
                id,
                measurement.points.len()
            ),
            UpdateCommand::SetExistenceProbability { id, probability } => {
                write!(f, "set_existence_probability {} {:.2}", id, probability)
            }
            UpdateCommand::RemoveEntity { id } => write!(f, "remove {}", id),
        }
    }
}

/// Commands in issue order plus the ids that received an update.
///
/// Removal does not count as an update.
#[derive(Debug, Clone, Default)]
pub struct UpdateBatch {
    commands: Vec<UpdateCommand>,
    updated: BTreeSet<EntityId>,
}

impl UpdateBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[UpdateCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn updated_entities(&self) -> &BTreeSet<EntityId> {
        &self.updated
    }

    pub fn is_updated(&self, id: &EntityId) -> bool {
        self.updated.contains(id)
    }

    pub fn set_pose(&mut self, id: EntityId, pose: SE3) {
        self.updated.insert(id.clone());
        self.commands.push(UpdateCommand::SetPose { id, pose });
    }

    pub fn set_hull(&mut self, id: EntityId, hull: Hull) {
        self.updated.insert(id.clone());
        self.commands.push(UpdateCommand::SetHull { id, hull });
    }

    pub fn add_measurement(&mut self, id: EntityId, measurement: Measurement) {
        self.updated.insert(id.clone());
        self.commands
            .push(UpdateCommand::AddMeasurement { id, measurement });
    }

    pub fn set_existence_probability(&mut self, id: EntityId, probability: f64) {
        self.updated.insert(id.clone());
        self.commands
            .push(UpdateCommand::SetExistenceProbability { id, probability });
    }

    pub fn remove_entity(&mut self, id: EntityId) {
        self.commands.push(UpdateCommand::RemoveEntity { id });
    }

    /// Latest pose set for `id` in this batch.
    pub fn pose_of(&self, id: &EntityId) -> Option<&SE3> {
        self.commands.iter().rev().find_map(|c| match c {
            UpdateCommand::SetPose { id: cid, pose } if cid == id => Some(pose),
            _ => None,
        })
    }

    pub fn is_removed(&self, id: &EntityId) -> bool {
        self.commands
            .iter()
            .any(|c| matches!(c, UpdateCommand::RemoveEntity { id: cid } if cid == id))
    }

    /// Ids removed in this batch, in issue order.
    pub fn removed(&self) -> Vec<&EntityId> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                UpdateCommand::RemoveEntity { id } => Some(id),
                _ => None,
            })
            .collect()
    }
}

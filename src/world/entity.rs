//! Entity - one tracked object in the world model.
//!
//! An entity is either *static* (it carries a fixed mesh shape and is never
//! re-segmented) or *dynamic* (tracked through a hull that is refitted from
//! depth data every time it is observed).

use std::sync::Arc;

use anyhow::{Context, Result};
use nalgebra::Vector2;
use serde::Deserialize;

use crate::geometry::{Hull, SE3, Shape, ShapeSpec};

use super::types::EntityId;

/// Region of interest used to restrict supporting-entity fitting.
#[derive(Debug, Clone)]
pub struct Roi {
    /// Inclusion volume in the entity frame.
    pub include: Arc<Shape>,
    /// Height window relative to the entity origin.
    pub min: f64,
    pub max: f64,
}

/// Limits on how a fitted pose may differ from the previous one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveRestrictions {
    pub can_move: bool,
    /// Allowed translation axis in the entity frame (XY plane).
    pub move_direction: Vector2<f64>,
    pub can_rotate: bool,
}

/// Membership of a named group of entities that move rigidly together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateUpdateGroup {
    pub name: String,
    /// The main member drives the motion of the whole group.
    pub is_main: bool,
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub pose: Option<SE3>,
    /// Fixed mesh in the entity frame. Presence marks the entity as static.
    pub shape: Option<Arc<Shape>>,
    /// Tracked footprint in the pose frame. Empty for static entities.
    pub hull: Hull,
    pub roi: Option<Roi>,
    pub move_restrictions: Option<MoveRestrictions>,
    pub state_update_group: Option<StateUpdateGroup>,
    pub existence_probability: f64,
    /// Number of measurements attached so far.
    pub measurement_count: usize,
    /// Free-form structured data (areas, labels, ...).
    pub data: serde_yaml::Value,
}

#[derive(Debug, Deserialize)]
struct AreaEntry {
    name: String,
    shape: ShapeSpec,
}

impl Entity {
    pub fn new(id: impl Into<EntityId>) -> Self {
        Self {
            id: id.into(),
            pose: None,
            shape: None,
            hull: Hull::default(),
            roi: None,
            move_restrictions: None,
            state_update_group: None,
            existence_probability: 1.0,
            measurement_count: 0,
            data: serde_yaml::Value::Null,
        }
    }

    pub fn with_pose(mut self, pose: SE3) -> Self {
        self.pose = Some(pose);
        self
    }

    pub fn with_shape(mut self, shape: Shape) -> Self {
        self.shape = Some(Arc::new(shape));
        self
    }

    pub fn with_hull(mut self, hull: Hull) -> Self {
        self.hull = hull;
        self
    }

    pub fn with_roi(mut self, roi: Roi) -> Self {
        self.roi = Some(roi);
        self
    }

    pub fn with_move_restrictions(mut self, restrictions: MoveRestrictions) -> Self {
        self.move_restrictions = Some(restrictions);
        self
    }

    pub fn with_state_update_group(mut self, name: impl Into<String>, is_main: bool) -> Self {
        self.state_update_group = Some(StateUpdateGroup {
            name: name.into(),
            is_main,
        });
        self
    }

    pub fn with_data(mut self, data: serde_yaml::Value) -> Self {
        self.data = data;
        self
    }

    pub fn is_static(&self) -> bool {
        self.shape.is_some()
    }

    /// Dynamic, posed and with a non-empty hull: eligible for association
    /// and removal.
    pub fn is_associable(&self) -> bool {
        !self.is_static() && self.pose.is_some() && !self.hull.points.is_empty()
    }

    pub fn is_group_main(&self) -> bool {
        self.state_update_group.as_ref().is_some_and(|g| g.is_main)
    }

    /// Look up the named area in `data.areas` and resolve its shape.
    ///
    /// Returns `Ok(None)` when no area with that name exists and an error
    /// when the area exists but its shape description is malformed.
    pub fn area_shape(&self, name: &str) -> Result<Option<Shape>> {
        let Some(areas) = self.data.get("areas").and_then(|a| a.as_sequence()) else {
            return Ok(None);
        };

        for item in areas {
            if item.get("name").and_then(|n| n.as_str()) != Some(name) {
                continue;
            }
            let entry: AreaEntry = serde_yaml::from_value(item.clone())
                .with_context(|| format!("Malformed area '{}' on entity '{}'", name, self.id))?;
            let shape = entry
                .shape
                .to_shape()
                .with_context(|| {
                    format!("Bad shape for area '{}' on entity '{}'", entry.name, self.id)
                })?;
            return Ok(Some(shape));
        }
        Ok(None)
    }
}

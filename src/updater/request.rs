//! Update request and target parsing.

use crate::world::EntityId;

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateRequest {
    /// `<entity-id>`, `<area-name> <entity-id>`, a previously returned
    /// entity id, or empty for a whole-frame update.
    pub area_description: String,
    /// Pixels within this distance of known geometry are background (m).
    pub background_padding: f64,
    /// Yaw search bound for the supporting-entity fit (radians).
    pub max_yaw_change: f64,
    /// Restrict the supporting-entity fit to its ROI, when it has one.
    pub apply_roi: bool,
}

impl Default for UpdateRequest {
    fn default() -> Self {
        Self {
            area_description: String::new(),
            background_padding: 0.02,
            max_yaw_change: 0.0,
            apply_roi: false,
        }
    }
}

impl UpdateRequest {
    pub fn new(area_description: impl Into<String>) -> Self {
        Self {
            area_description: area_description.into(),
            ..Default::default()
        }
    }

    pub fn with_max_yaw_change(mut self, radians: f64) -> Self {
        self.max_yaw_change = radians;
        self
    }

    pub fn with_background_padding(mut self, meters: f64) -> Self {
        self.background_padding = meters;
        self
    }

    pub fn with_roi(mut self, apply_roi: bool) -> Self {
        self.apply_roi = apply_roi;
        self
    }
}

/// Parsed form of an area description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateTarget {
    pub area: Option<String>,
    pub entity_id: EntityId,
}

impl UpdateTarget {
    /// Split on the first space: `"on_top_of table"` names area `on_top_of`
    /// of entity `table`, `"table"` names the entity alone. Anything after
    /// the first space, spaces included, is the entity id.
    pub fn parse(description: &str) -> Self {
        match description.split_once(' ') {
            Some((area, id)) => Self {
                area: Some(area.to_string()),
                entity_id: EntityId::from(id),
            },
            None => Self {
                area: None,
                entity_id: EntityId::from(description),
            },
        }
    }
}

//! Error type for the update pipeline.

use thiserror::Error;

use crate::world::EntityId;

/// Reasons an update request is rejected. No commands are produced.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UpdateError {
    #[error("No such entity: '{0}'.")]
    NoSuchEntity(EntityId),

    #[error("Entity: '{0}' has no pose.")]
    NoPose(EntityId),

    #[error("No area '{area}' for entity '{entity}'.")]
    NoSuchArea { area: String, entity: EntityId },

    #[error("Could not load shape of area '{area}' for entity '{entity}'.")]
    AreaShapeUnresolved { area: String, entity: EntityId },
}

pub type Result<T> = std::result::Result<T, UpdateError>;

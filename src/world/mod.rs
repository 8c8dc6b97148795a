//! World model: entities, ids and the command batch that edits them.

pub mod entity;
pub mod types;
pub mod update_batch;
pub mod world_model;

pub use entity::{Entity, MoveRestrictions, Roi, StateUpdateGroup};
pub use types::{EntityId, EntityIdGenerator};
pub use update_batch::{Measurement, UpdateBatch, UpdateCommand};
pub use world_model::WorldModel;

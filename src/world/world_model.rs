//! WorldModel - read-mostly snapshot of all tracked entities.
//!
//! The update pipeline never mutates the snapshot it is given; it emits an
//! [`UpdateBatch`]. [`WorldModel::with_updates`] builds the disposable
//! "as-if-updated" copy used for background subtraction.

use std::collections::BTreeMap;

use tracing::debug;

use super::entity::Entity;
use super::types::EntityId;
use super::update_batch::{UpdateBatch, UpdateCommand};

#[derive(Debug, Clone, Default)]
pub struct WorldModel {
    entities: BTreeMap<EntityId, Entity>,
}

impl WorldModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn insert(&mut self, entity: Entity) -> Option<Entity> {
        self.entities.insert(entity.id.clone(), entity)
    }

    pub fn get(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.entities.contains_key(id)
    }

    /// Entities in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Apply every command of `batch` in order.
    ///
    /// Pose and hull commands for unknown ids create the entity.
    pub fn apply(&mut self, batch: &UpdateBatch) {
        for cmd in batch.commands() {
            match cmd {
                UpdateCommand::SetPose { id, pose } => {
                    self.entry(id).pose = Some(*pose);
                }
                UpdateCommand::SetHull { id, hull } => {
                    self.entry(id).hull = hull.clone();
                }
                UpdateCommand::AddMeasurement { id, .. } => {
                    if let Some(e) = self.entities.get_mut(id) {
                        e.measurement_count += 1;
                    }
                }
                UpdateCommand::SetExistenceProbability { id, probability } => {
                    if let Some(e) = self.entities.get_mut(id) {
                        e.existence_probability = *probability;
                    }
                }
                UpdateCommand::RemoveEntity { id } => {
                    self.entities.remove(id);
                }
            }
        }
        debug!(
            "Applied {} commands, world has {} entities",
            batch.len(),
            self.entities.len()
        );
    }

    /// Copy of the snapshot with `batch` applied.
    ///
    /// Static meshes are shared, so the copy stays cheap.
    pub fn with_updates(&self, batch: &UpdateBatch) -> WorldModel {
        let mut copy = self.clone();
        copy.apply(batch);
        copy
    }

    fn entry(&mut self, id: &EntityId) -> &mut Entity {
        self.entities
            .entry(id.clone())
            .or_insert_with(|| Entity::new(id.clone()))
    }
}

impl FromIterator<Entity> for WorldModel {
    fn from_iter<T: IntoIterator<Item = Entity>>(iter: T) -> Self {
        let mut world = WorldModel::new();
        for e in iter {
            world.insert(e);
        }
        world
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Hull, SE3, polygon};
    use std::sync::Arc;

    #[test]
    fn test_with_updates_leaves_original_untouched() {
        let world: WorldModel = [Entity::new("a").with_pose(SE3::identity())].into_iter().collect();
        let mut batch = UpdateBatch::new();
        batch.set_pose(EntityId::from("a"), SE3::from_xyz_yaw(1.0, 0.0, 0.0, 0.0));

        let updated = world.with_updates(&batch);

        let a = EntityId::from("a");
        assert_eq!(world.get(&a).unwrap().pose, Some(SE3::identity()));
        assert_eq!(updated.get(&a).unwrap().pose.unwrap().translation.x, 1.0);
    }

    #[test]
    fn test_apply_creates_and_removes() {
        let mut world: WorldModel =
            [Entity::new("old").with_pose(SE3::identity())].into_iter().collect();
        let mut batch = UpdateBatch::new();
        let hull = Hull::new(polygon::square(0.0, 0.0, 0.1), -0.1, 0.1);
        batch.set_pose(EntityId::from("new"), SE3::identity());
        batch.set_hull(EntityId::from("new"), hull.clone());
        batch.set_existence_probability(EntityId::from("new"), 1.0);
        batch.remove_entity(EntityId::from("old"));

        world.apply(&batch);

        assert!(!world.contains(&EntityId::from("old")));
        let new = world.get(&EntityId::from("new")).unwrap();
        assert_eq!(new.hull, hull);
        assert!(new.is_associable());
    }

    #[test]
    fn test_copy_shares_static_shapes() {
        let shape = crate::geometry::Shape::from_box(
            nalgebra::Vector3::zeros(),
            nalgebra::Vector3::repeat(1.0),
        );
        let world: WorldModel = [Entity::new("wall").with_shape(shape)].into_iter().collect();
        let copy = world.with_updates(&UpdateBatch::new());

        let id = EntityId::from("wall");
        let a = world.get(&id).unwrap().shape.as_ref().unwrap();
        let b = copy.get(&id).unwrap().shape.as_ref().unwrap();
        assert!(Arc::ptr_eq(a, b));
    }
}

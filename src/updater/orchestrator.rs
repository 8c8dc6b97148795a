//! The update pipeline.
//!
//! # Sequence
//!
//! 1. Resolve the area description (memory first, then `<area> <id>`)
//! 2. Fit the supporting entity and propagate its pose
//! 3. Restrict the depth image to the area volume
//! 4. Remove everything the (as-if-updated) world already explains
//! 5. Cluster, merge and refit the remainder
//! 6. Associate, update and remove
//! 7. Remember the area description for the resulting entities

use tracing::{debug, info};

use super::error::{Result, UpdateError};
use super::memory::AreaDescriptionMemory;
use super::motion::{restrict_motion, update_state_group_pose};
use super::request::{UpdateRequest, UpdateTarget};
use super::result::UpdateResult;
use crate::association::{Associator, associate_and_update, remove_unassociated};
use crate::config::UpdaterConfig;
use crate::fitting::{CorrelativeFitter, PoseFitter, RoiWindow};
use crate::geometry::{SE3, Shape};
use crate::segmentation::{
    Clusterer, extract_within, merge_overlapping, refit_against_support, remove_known_background,
};
use crate::sensor::DepthFrame;
use crate::world::{Entity, EntityIdGenerator, UpdateBatch, WorldModel};

pub struct Updater {
    config: UpdaterConfig,
    clusterer: Clusterer,
    fitter: Box<dyn PoseFitter>,
    associator: Box<dyn Associator>,
    area_memory: AreaDescriptionMemory,
    id_generator: EntityIdGenerator,
}

impl Updater {
    pub fn new(config: UpdaterConfig) -> Self {
        let clusterer = Clusterer::new(
            config.segmentation.cluster_depth_tolerance,
            config.segmentation.min_cluster_size,
        );
        let fitter: Box<dyn PoseFitter> = Box::new(CorrelativeFitter::new(config.fitter.clone()));
        let associator = config.association.build();
        Self {
            config,
            clusterer,
            fitter,
            associator,
            area_memory: AreaDescriptionMemory::new(),
            id_generator: EntityIdGenerator::default(),
        }
    }

    /// Replace the supporting-entity fitter.
    pub fn with_fitter(mut self, fitter: Box<dyn PoseFitter>) -> Self {
        self.fitter = fitter;
        self
    }

    /// Replace the association strategy.
    pub fn with_associator(mut self, associator: Box<dyn Associator>) -> Self {
        self.associator = associator;
        self
    }

    pub fn config(&self) -> &UpdaterConfig {
        &self.config
    }

    pub fn area_memory(&self) -> &AreaDescriptionMemory {
        &self.area_memory
    }

    /// Run the pipeline on one frame.
    ///
    /// `world` is never modified. On error no commands are returned and the
    /// area memory is unchanged.
    pub fn update(
        &mut self,
        world: &WorldModel,
        frame: &DepthFrame,
        req: &UpdateRequest,
    ) -> Result<UpdateResult> {
        let mut batch = UpdateBatch::new();
        let mut area_description = None;

        let filtered = if req.area_description.is_empty() {
            frame.depth.clone()
        } else {
            let (description, fit_support) = match self.area_memory.lookup(&req.area_description) {
                Some(remembered) => {
                    debug!(
                        "'{}' was segmented from '{}', skipping support fit",
                        req.area_description, remembered
                    );
                    (remembered.to_string(), false)
                }
                None => (req.area_description.clone(), true),
            };

            let target = UpdateTarget::parse(&description);
            let entity = world
                .get(&target.entity_id)
                .ok_or_else(|| UpdateError::NoSuchEntity(target.entity_id.clone()))?;
            let pose = entity
                .pose
                .ok_or_else(|| UpdateError::NoPose(target.entity_id.clone()))?;
            let area = match &target.area {
                Some(name) => Some(Self::resolve_area(entity, name)?),
                None => None,
            };

            let new_pose = if fit_support {
                self.fit_supporting_entity(world, frame, entity, &pose, req, &mut batch)
            } else {
                pose
            };

            area_description = Some(description);
            match &area {
                Some(shape) => extract_within(frame, shape, &new_pose),
                None => frame.depth.clone(),
            }
        };

        // The fitted support pose only lives in the batch so far
        let world_updated = world.with_updates(&batch);
        let foreground = remove_known_background(
            &filtered,
            &world_updated,
            &frame.camera,
            &frame.sensor_pose,
            req.background_padding,
            self.config.segmentation.subtract_tracked_hulls,
        );

        let candidates: Vec<&Entity> = world.iter().filter(|e| e.is_associable()).collect();

        let clusters = self
            .clusterer
            .cluster(&foreground, &frame.camera, &frame.sensor_pose);
        let mut proposals = merge_overlapping(frame, clusters, &self.config.segmentation);
        for p in proposals.iter_mut() {
            refit_against_support(
                frame,
                p,
                self.config.segmentation.support_grow_margin,
                self.config.segmentation.support_shrink_margin,
            );
        }

        associate_and_update(
            self.associator.as_ref(),
            &candidates,
            frame,
            &mut proposals,
            &mut self.id_generator,
            world,
            &mut batch,
        );
        remove_unassociated(&candidates, frame, &mut batch);

        proposals.retain(|p| p.id.is_some());
        if let Some(description) = &area_description {
            for id in proposals.iter().filter_map(|p| p.id.as_ref()) {
                self.area_memory.remember(id.clone(), description);
            }
        }

        info!(
            "Update '{}': {} entity updates, {} removals, {} commands",
            req.area_description,
            proposals.len(),
            batch.removed().len(),
            batch.len()
        );

        Ok(UpdateResult {
            batch,
            entity_updates: proposals,
            area_description,
        })
    }

    fn resolve_area(entity: &Entity, name: &str) -> Result<Shape> {
        let unresolved = || UpdateError::AreaShapeUnresolved {
            area: name.to_string(),
            entity: entity.id.clone(),
        };
        match entity.area_shape(name) {
            Ok(Some(shape)) if !shape.is_empty() => Ok(shape),
            Ok(Some(_)) => Err(unresolved()),
            Ok(None) => Err(UpdateError::NoSuchArea {
                area: name.to_string(),
                entity: entity.id.clone(),
            }),
            Err(e) => {
                debug!("{:#}", e);
                Err(unresolved())
            }
        }
    }

    /// Re-estimate the support's pose and write it (and its group) into
    /// `batch`. Returns the pose to segment the area at.
    fn fit_supporting_entity(
        &self,
        world: &WorldModel,
        frame: &DepthFrame,
        entity: &Entity,
        pose: &SE3,
        req: &UpdateRequest,
        batch: &mut UpdateBatch,
    ) -> SE3 {
        let roi_window = entity.roi.as_ref().filter(|_| req.apply_roi).map(|roi| RoiWindow {
            include: roi.include.as_ref(),
            entity_pose: *pose,
            z_min: pose.translation.z + roi.min,
            z_max: pose.translation.z + roi.max,
        });

        let data = self.fitter.process_sensor_data(frame, roi_window.as_ref());
        let Some(fitted) = self
            .fitter
            .estimate_entity_pose(&data, entity, pose, req.max_yaw_change)
        else {
            debug!("Could not fit {}, keeping its pose", entity.id);
            return *pose;
        };

        if entity.is_group_main() {
            update_state_group_pose(world, entity, &fitted, batch);
            batch.pose_of(&entity.id).copied().unwrap_or(fitted)
        } else if let Some(restrictions) = &entity.move_restrictions {
            let restricted = restrict_motion(entity, pose, &fitted, restrictions);
            batch.set_pose(entity.id.clone(), restricted);
            restricted
        } else {
            batch.set_pose(entity.id.clone(), fitted);
            fitted
        }
    }
}

impl Default for Updater {
    fn default() -> Self {
        Self::new(UpdaterConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Hull, polygon};
    use crate::test_support::*;
    use crate::world::{EntityId, MoveRestrictions, Roi, UpdateCommand};
    use approx::assert_relative_eq;
    use nalgebra::{Vector2, Vector3};
    use std::sync::Arc;

    fn config_without_hull_subtraction() -> UpdaterConfig {
        let mut config = UpdaterConfig::default();
        config.segmentation.subtract_tracked_hulls = false;
        config
    }

    fn pose_set_for(batch: &UpdateBatch, id: &str) -> Option<SE3> {
        batch.pose_of(&EntityId::from(id)).copied()
    }

    fn ghost(id: &str, x: f64, y: f64, z: f64) -> Entity {
        let (hull, pose) =
            Hull::from_world_points(&polygon::square(x, y, 0.05), z - 0.05, z + 0.05);
        Entity::new(id).with_pose(pose).with_hull(hull)
    }

    /// Frame in which the table stands at `table_at`, without the object.
    fn frame_with_table_at(table_at: &SE3) -> DepthFrame {
        scene_frame(&[floor_shape(), table_local_shape().transformed(table_at)])
    }

    #[test]
    fn test_whole_frame_update_detects_object() {
        let mut updater = Updater::default();
        let res = updater
            .update(&static_world(), &standard_frame(), &UpdateRequest::default())
            .unwrap();

        assert_eq!(res.entity_updates.len(), 1);
        assert_eq!(res.area_description, None);
        assert!(updater.area_memory().is_empty());

        let id = res.entity_updates[0].id.clone().unwrap();
        assert_eq!(id.as_str(), "obj-0000");
        let pose = pose_set_for(&res.batch, "obj-0000").unwrap();
        assert_relative_eq!(pose.translation.x, 2.0, epsilon = 0.05);
        assert_relative_eq!(pose.translation.y, 0.1, epsilon = 0.05);
        assert!(res.batch.removed().is_empty());
    }

    #[test]
    fn test_area_update_fits_support_and_remembers() {
        let mut updater = Updater::default();
        let res = updater
            .update(&static_world(), &standard_frame(), &UpdateRequest::new("on_top_of table"))
            .unwrap();

        let table = pose_set_for(&res.batch, "table").unwrap();
        assert_relative_eq!(table.translation, table_pose().translation, epsilon = 0.021);

        assert_eq!(res.entity_updates.len(), 1);
        assert_eq!(res.area_description.as_deref(), Some("on_top_of table"));
        assert_eq!(updater.area_memory().lookup("obj-0000"), Some("on_top_of table"));
    }

    #[test]
    fn test_remembered_id_reuses_area_without_fitting() {
        let mut updater = Updater::default();
        let frame = standard_frame();
        let first = updater
            .update(&static_world(), &frame, &UpdateRequest::new("on_top_of table"))
            .unwrap();
        let world = static_world().with_updates(&first.batch);

        let second = updater
            .update(&world, &frame, &UpdateRequest::new("obj-0000"))
            .unwrap();

        assert_eq!(second.area_description.as_deref(), Some("on_top_of table"));
        assert!(pose_set_for(&second.batch, "table").is_none());
        assert!(!second.batch.is_removed(&EntityId::from("obj-0000")));
    }

    #[test]
    fn test_second_frame_reassociates_without_hull_subtraction() {
        let mut updater = Updater::new(config_without_hull_subtraction());
        let frame = standard_frame();
        let first = updater
            .update(&static_world(), &frame, &UpdateRequest::default())
            .unwrap();
        let world = static_world().with_updates(&first.batch);

        let second = updater.update(&world, &frame, &UpdateRequest::default()).unwrap();

        let ids: Vec<&str> = second
            .entity_updates
            .iter()
            .filter_map(|p| p.id.as_ref().map(|id| id.as_str()))
            .collect();
        assert_eq!(ids, vec!["obj-0000"]);
        assert!(second.batch.is_updated(&EntityId::from("obj-0000")));
        assert!(second.batch.removed().is_empty());

        // Same frame, same pose
        let before = pose_set_for(&first.batch, "obj-0000").unwrap();
        let after = pose_set_for(&second.batch, "obj-0000").unwrap();
        assert_relative_eq!(after.translation, before.translation, epsilon = 1e-6);
        assert_relative_eq!(after.yaw(), before.yaw(), epsilon = 1e-6);
    }

    #[test]
    fn test_second_frame_keeps_masked_entity() {
        let mut updater = Updater::default();
        let frame = standard_frame();
        let first = updater
            .update(&static_world(), &frame, &UpdateRequest::default())
            .unwrap();
        let world = static_world().with_updates(&first.batch);

        let second = updater.update(&world, &frame, &UpdateRequest::default()).unwrap();

        // The tracked hull explains its own pixels: nothing new, nothing gone
        assert!(second.entity_updates.is_empty());
        assert!(second.batch.is_empty());
    }

    #[test]
    fn test_ghost_in_view_is_removed() {
        let mut world = static_world();
        world.insert(ghost("ghost", 2.0, -0.25, 0.85));
        world.insert(ghost("behind", -2.0, 0.0, 0.8));
        let mut updater = Updater::default();

        let res = updater
            .update(&world, &standard_frame(), &UpdateRequest::default())
            .unwrap();

        assert_eq!(res.batch.removed(), vec![&EntityId::from("ghost")]);
        assert_eq!(res.entity_updates.len(), 1);
    }

    #[test]
    fn test_request_errors() {
        let mut world = static_world();
        world.insert(Entity::new("floating"));
        let frame = standard_frame();
        let mut updater = Updater::default();

        let cases = [
            ("on_top_of nobody", UpdateError::NoSuchEntity(EntityId::from("nobody"))),
            ("floating", UpdateError::NoPose(EntityId::from("floating"))),
            (
                "underneath table",
                UpdateError::NoSuchArea {
                    area: "underneath".into(),
                    entity: EntityId::from("table"),
                },
            ),
            (
                "empty table",
                UpdateError::AreaShapeUnresolved {
                    area: "empty".into(),
                    entity: EntityId::from("table"),
                },
            ),
        ];
        for (target, expected) in cases {
            let err = updater
                .update(&world, &frame, &UpdateRequest::new(target))
                .unwrap_err();
            assert_eq!(err, expected, "target '{}'", target);
        }
        assert!(updater.area_memory().is_empty());
    }

    #[test]
    fn test_group_main_moves_members() {
        let moved = SE3::from_xyz_yaw(2.0, 0.06, 0.0, 0.0);
        let frame = frame_with_table_at(&moved);
        let world: WorldModel = [
            table_entity().with_state_update_group("furniture", true),
            Entity::new("lamp")
                .with_pose(SE3::from_xyz_yaw(2.0, 0.3, 0.75, 0.0))
                .with_state_update_group("furniture", false),
        ]
        .into_iter()
        .collect();
        let mut updater = Updater::default();

        let res = updater.update(&world, &frame, &UpdateRequest::new("table")).unwrap();

        let table = pose_set_for(&res.batch, "table").unwrap();
        let lamp = pose_set_for(&res.batch, "lamp").unwrap();
        assert_relative_eq!(table.translation.y, 0.06, epsilon = 0.021);
        assert_relative_eq!(
            lamp.translation - table.translation,
            Vector3::new(0.0, 0.3, 0.75),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_restricted_support_keeps_origin() {
        let moved = SE3::from_xyz_yaw(2.0, 0.06, 0.0, 0.0);
        let frame = frame_with_table_at(&moved);
        let world: WorldModel = [table_entity().with_move_restrictions(MoveRestrictions {
            can_move: false,
            move_direction: Vector2::zeros(),
            can_rotate: true,
        })]
        .into_iter()
        .collect();
        let mut updater = Updater::default();

        let res = updater.update(&world, &frame, &UpdateRequest::new("table")).unwrap();

        let table = pose_set_for(&res.batch, "table").unwrap();
        assert_relative_eq!(table.translation, table_pose().translation, epsilon = 1e-12);
    }

    #[test]
    fn test_roi_without_points_keeps_pose() {
        let frame = frame_with_table_at(&SE3::from_xyz_yaw(2.0, 0.06, 0.0, 0.0));
        let far_away = Shape::from_box(Vector3::new(5.0, 5.0, 0.0), Vector3::new(6.0, 6.0, 1.0));
        let table = table_entity().with_roi(Roi {
            include: Arc::new(far_away),
            min: 0.0,
            max: 1.0,
        });
        let world: WorldModel = [table].into_iter().collect();
        let mut updater = Updater::default();

        let without_roi = updater
            .update(&world, &frame, &UpdateRequest::new("table"))
            .unwrap();
        assert!(pose_set_for(&without_roi.batch, "table").is_some());

        let with_roi = updater
            .update(&world, &frame, &UpdateRequest::new("table").with_roi(true))
            .unwrap();
        assert!(pose_set_for(&with_roi.batch, "table").is_none());
    }

    #[test]
    fn test_empty_frame_gives_empty_result() {
        let frame = standard_frame().with_depth(crate::sensor::DepthImage::zeros(WIDTH, HEIGHT));
        let mut updater = Updater::default();

        let res = updater
            .update(&static_world(), &frame, &UpdateRequest::default())
            .unwrap();
        assert!(res.entity_updates.is_empty());
        assert!(res.batch.is_empty());
    }

    #[test]
    fn test_hull_overlap_strategy_is_selectable() {
        let mut config = config_without_hull_subtraction();
        config.association.strategy = crate::association::AssociationStrategy::HullOverlap;
        let mut updater = Updater::new(config);
        let frame = standard_frame();
        let first = updater
            .update(&static_world(), &frame, &UpdateRequest::default())
            .unwrap();
        let world = static_world().with_updates(&first.batch);

        let second = updater.update(&world, &frame, &UpdateRequest::default()).unwrap();
        assert!(second.batch.is_updated(&EntityId::from("obj-0000")));
        let removes = |c: &UpdateCommand| matches!(c, UpdateCommand::RemoveEntity { .. });
        assert!(!second.batch.commands().iter().any(removes));
    }
}

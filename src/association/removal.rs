//! Removal of tracked entities that the frame shows to be gone.

use tracing::debug;

use crate::sensor::{DepthFrame, is_valid_depth};
use crate::world::{Entity, UpdateBatch};

/// Remove every candidate that was not updated this frame although the
/// camera looked straight through its origin.
///
/// An entity is removed when its origin projects into the image and the
/// depth reading at that pixel is valid and lies behind the entity. Entities
/// outside the view, occluded by something nearer or over an invalid pixel
/// are kept.
pub fn remove_unassociated(candidates: &[&Entity], frame: &DepthFrame, batch: &mut UpdateBatch) {
    let t_sensor_world = frame.sensor_pose.inverse();
    let (w, h) = (frame.depth.width(), frame.depth.height());

    let mut removed = 0usize;
    for entity in candidates {
        if batch.is_updated(&entity.id) {
            continue;
        }
        let Some(pose) = entity.pose else {
            continue;
        };
        let p = t_sensor_world.transform_point(&pose.translation);
        let Some((x, y)) = frame.camera.pixel_of(&p, w, h) else {
            continue;
        };
        let d = frame.depth.at(x, y);
        if is_valid_depth(d) && p.z < f64::from(d) {
            debug!(
                "Removing {}: depth {:.3} behind entity at {:.3}",
                entity.id, d, p.z
            );
            batch.remove_entity(entity.id.clone());
            removed += 1;
        }
    }
    debug!("Removal: {} of {} candidates removed", removed, candidates.len());
}

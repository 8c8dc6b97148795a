//! Propagation of a fitted supporting-entity pose.
//!
//! A fitted pose is not always written as-is: the main member of a state
//! update group drags the whole group along, and entities with move
//! restrictions only accept the part of the motion they are allowed.

use nalgebra::Vector3;
use tracing::{debug, warn};

use crate::geometry::SE3;
use crate::geometry::so3::{yaw_between, yaw_rotation};
use crate::world::{Entity, MoveRestrictions, UpdateBatch, WorldModel};

/// Shorter move directions count as unrestricted.
const MIN_DIRECTION_NORM: f64 = 1e-9;

/// Move every member of `main`'s group rigidly with `main`.
///
/// The yaw between the old and new main orientation rotates each member's
/// offset from the old main origin; the main's origin delta then shifts it.
/// Member orientations are pre-multiplied by the same yaw. Members without a
/// pose are skipped.
pub fn update_state_group_pose(
    world: &WorldModel,
    main: &Entity,
    new_pose: &SE3,
    batch: &mut UpdateBatch,
) {
    let (Some(old), Some(group)) = (main.pose, main.state_update_group.as_ref()) else {
        batch.set_pose(main.id.clone(), *new_pose);
        return;
    };

    let yaw = yaw_between(&old.rotation, &new_pose.rotation);
    let q_yaw = yaw_rotation(yaw);
    let origin_delta = new_pose.translation - old.translation;

    let mut moved = 0usize;
    for e in world.iter() {
        if e.state_update_group.as_ref().is_none_or(|g| g.name != group.name) {
            continue;
        }
        let Some(pose) = e.pose else {
            continue;
        };
        let offset = q_yaw * (pose.translation - old.translation);
        let member_pose = SE3::new(q_yaw * pose.rotation, old.translation + offset + origin_delta);
        batch.set_pose(e.id.clone(), member_pose);
        moved += 1;
    }
    debug!(
        "Group '{}' moved with {}: yaw {:.3}, {} members",
        group.name, main.id, yaw, moved
    );
}

/// Clamp `new` to what `restrictions` allow starting from `old`.
///
/// With `can_move` the translation is projected onto the move direction,
/// rotated into the world by the current orientation; without it the origin
/// stays put. Without `can_rotate` the orientation stays put.
pub fn restrict_motion(
    entity: &Entity,
    old: &SE3,
    new: &SE3,
    restrictions: &MoveRestrictions,
) -> SE3 {
    if !restrictions.can_move && !restrictions.can_rotate {
        warn!(
            "Entity {} can neither move nor rotate, keeping its pose",
            entity.id
        );
        return *old;
    }

    let mut out = *new;
    if restrictions.can_move {
        let dir = Vector3::new(restrictions.move_direction.x, restrictions.move_direction.y, 0.0);
        let norm = dir.norm();
        if norm > MIN_DIRECTION_NORM {
            let dir_world = old.rotation * (dir / norm);
            let delta = new.translation - old.translation;
            out.translation = old.translation + dir_world * delta.dot(&dir_world);
        }
    } else {
        out.translation = old.translation;
    }
    if !restrictions.can_rotate {
        out.rotation = old.rotation;
    }
    out
}

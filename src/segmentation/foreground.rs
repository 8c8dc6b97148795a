//! Foreground extraction: volume masking and known-background removal.

use tracing::debug;

use crate::geometry::{SE3, Volume};
use crate::sensor::{CameraModel, DepthFrame, DepthImage, is_valid_depth};
use crate::world::WorldModel;

/// Keep only the pixels whose point lies inside `volume` placed at
/// `volume_pose` (world). Every other pixel becomes `0`.
pub fn extract_within<V: Volume + ?Sized>(
    frame: &DepthFrame,
    volume: &V,
    volume_pose: &SE3,
) -> DepthImage {
    let depth = &frame.depth;
    let mut out = DepthImage::zeros(depth.width(), depth.height());

    // Sensor frame → volume frame in one transform
    let t_local_sensor = volume_pose.inverse().compose(&frame.sensor_pose);

    for idx in depth.valid_indices() {
        let d = depth.get(idx);
        let p_local = t_local_sensor.transform_point(&depth.point_at(&frame.camera, idx, d));
        if volume.contains(&p_local) {
            out.set(idx, d);
        }
    }
    out
}

/// Zero every pixel that lies within `padding` of geometry the world model
/// already explains.
///
/// Static meshes are always subtracted; tracked hull prisms only when
/// `subtract_tracked_hulls` is set. Entities without a pose are skipped.
pub fn remove_known_background(
    depth: &DepthImage,
    world: &WorldModel,
    camera: &CameraModel,
    sensor_pose: &SE3,
    padding: f64,
    subtract_tracked_hulls: bool,
) -> DepthImage {
    // (T_local_sensor, volume) for every entity that can explain pixels
    let mut volumes: Vec<(SE3, Box<dyn Volume + '_>)> = Vec::new();
    for e in world.iter() {
        let Some(pose) = e.pose else {
            continue;
        };
        let t_local_sensor = pose.inverse().compose(sensor_pose);
        if let Some(shape) = &e.shape {
            if !shape.is_empty() {
                let volume: Box<dyn Volume + '_> = Box::new(&**shape);
                volumes.push((t_local_sensor, volume));
            }
        } else if subtract_tracked_hulls && e.hull.is_valid() {
            let volume: Box<dyn Volume + '_> = Box::new(e.hull.prism());
            volumes.push((t_local_sensor, volume));
        }
    }

    let mut out = depth.clone();
    let mut removed = 0usize;
    for idx in 0..depth.len() {
        let d = depth.get(idx);
        if !is_valid_depth(d) {
            continue;
        }
        let p_sensor = depth.point_at(camera, idx, d);
        let explained = volumes
            .iter()
            .any(|(t, v)| v.within(&t.transform_point(&p_sensor), padding));
        if explained {
            out.set(idx, 0.0);
            removed += 1;
        }
    }

    debug!(
        "Background removal: {} volumes, {} of {} pixels removed",
        volumes.len(),
        removed,
        depth.valid_count()
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Hull, Shape, polygon};
    use crate::test_support::*;
    use crate::world::Entity;
    use nalgebra::Vector3;

    #[test]
    fn test_extract_within_keeps_only_volume_pixels() {
        let frame = scene_frame(&[floor_shape(), table_world_shape(), object_shape()]);
        let area = area_shape_local();

        let filtered = extract_within(&frame, &area, &table_pose());

        assert!(filtered.valid_count() > 100);
        assert!(filtered.valid_count() < frame.depth.valid_count());
        for idx in filtered.valid_indices() {
            let p = frame.point_world(idx).unwrap();
            assert!(p.z >= 0.749 && p.z <= 1.251, "point {:?} outside area", p);
        }
    }

    #[test]
    fn test_extract_within_does_not_touch_input() {
        let frame = scene_frame(&[floor_shape()]);
        let before = frame.depth.clone();
        let empty = Shape::empty();

        let filtered = extract_within(&frame, &empty, &SE3::identity());

        assert_eq!(filtered.valid_count(), 0);
        assert_eq!(frame.depth, before);
    }

    #[test]
    fn test_background_removal_leaves_only_unknown_object() {
        let frame = scene_frame(&[floor_shape(), table_world_shape(), object_shape()]);
        let world = static_world();

        let fg = remove_known_background(
            &frame.depth,
            &world,
            &frame.camera,
            &frame.sensor_pose,
            0.02,
            true,
        );

        assert!(fg.valid_count() > 100);
        for idx in fg.valid_indices() {
            let p = frame.point_world(idx).unwrap();
            assert!(p.x > 1.9 && p.x < 2.1 && p.y > 0.0 && p.y < 0.2, "leftover {:?}", p);
        }
    }

    #[test]
    fn test_tracked_hull_subtraction_is_optional() {
        let frame = scene_frame(&[floor_shape(), table_world_shape(), object_shape()]);
        let mut world = static_world();
        let (hull, pose) = Hull::from_world_points(&polygon::square(2.0, 0.1, 0.09), 0.74, 0.97);
        world.insert(Entity::new("cup").with_pose(pose).with_hull(hull));

        let foreground = |subtract: bool| {
            remove_known_background(
                &frame.depth,
                &world,
                &frame.camera,
                &frame.sensor_pose,
                0.02,
                subtract,
            )
        };
        let with_hulls = foreground(true);
        let without_hulls = foreground(false);

        assert_eq!(with_hulls.valid_count(), 0);
        assert!(without_hulls.valid_count() > 100);
    }

    #[test]
    fn test_unposed_entities_are_ignored() {
        let frame = scene_frame(&[floor_shape()]);
        let mut world = WorldModel::new();
        world.insert(Entity::new("floor").with_shape(Shape::from_box(
            Vector3::new(-5.0, -5.0, -0.1),
            Vector3::new(10.0, 5.0, 0.0),
        )));

        let (camera, pose) = (&frame.camera, &frame.sensor_pose);
        let fg = remove_known_background(&frame.depth, &world, camera, pose, 0.02, true);
        assert_eq!(fg.valid_count(), frame.depth.valid_count());
    }
}

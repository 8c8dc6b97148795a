//! Ray-cast depth rendering of world-frame meshes.
//!
//! Used to synthesise frames for scene files without recorded depth and by
//! the scenario tests.

use nalgebra::Vector3;

use super::{CameraModel, DepthImage};
use crate::geometry::{SE3, Shape};

/// Ray/AABB slab test so shapes the ray cannot reach are skipped.
fn ray_hits_bounds(origin: &Vector3<f64>, dir: &Vector3<f64>, shape: &Shape) -> bool {
    let (min, max) = shape.bounds();
    let mut t_near = f64::NEG_INFINITY;
    let mut t_far = f64::INFINITY;
    for axis in 0..3 {
        if dir[axis].abs() < 1e-15 {
            if origin[axis] < min[axis] || origin[axis] > max[axis] {
                return false;
            }
            continue;
        }
        let inv = 1.0 / dir[axis];
        let (t0, t1) = {
            let a = (min[axis] - origin[axis]) * inv;
            let b = (max[axis] - origin[axis]) * inv;
            (a.min(b), a.max(b))
        };
        t_near = t_near.max(t0);
        t_far = t_far.min(t1);
        if t_near > t_far {
            return false;
        }
    }
    t_far > 0.0
}

/// Render the depth image a camera at `sensor_pose` would see of `shapes`.
///
/// Pixels whose ray hits nothing are `0` (invalid).
pub fn render_depth(
    camera: &CameraModel,
    sensor_pose: &SE3,
    width: usize,
    height: usize,
    shapes: &[Shape],
) -> DepthImage {
    let mut image = DepthImage::zeros(width, height);
    let origin = sensor_pose.translation;

    for y in 0..height {
        for x in 0..width {
            // Ray has z = 1 in the sensor frame, so t along it is the depth
            let ray = camera.project_2d_to_3d(x as f64, y as f64);
            let dir = sensor_pose.transform_vector(&ray);

            let nearest = shapes
                .iter()
                .filter(|s| !s.is_empty() && ray_hits_bounds(&origin, &dir, s))
                .filter_map(|s| s.ray_intersection(&origin, &dir))
                .min_by(|a, b| a.total_cmp(b));

            if let Some(t) = nearest {
                let idx = image.index(x, y);
                image.set(idx, t as f32);
            }
        }
    }
    image
}

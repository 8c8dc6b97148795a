//! Coordinate frame conventions for depth sensing against a Z-up world.
//!
//! # Frame Conventions
//!
//! ## Camera / Sensor Frame (RDF - computer vision convention)
//! ```text
//!        +Y (down)
//!         |
//!         |
//!         +------ +X (right)
//!        /
//!       /
//!      +Z (forward, optical axis)
//! ```
//! Depth values are the Z coordinate of the observed point in this frame, so
//! a pixel `(u, v)` with depth `d` back-projects to `d * ray(u, v)` where the
//! ray has `z = 1`.
//!
//! ## World Frame (FLU - Z up)
//! ```text
//!        +Z (up)
//!         |
//!         |
//!         +------ +Y (left)
//!        /
//!       /
//!      +X (forward)
//! ```
//! Entity poses live here. Hull heights (`z_min`, `z_max`) are measured
//! along world +Z, and yaw is a rotation about world +Z.
//!
//! # Transformation Naming Convention
//!
//! We use `T_target_source`: the sensor pose stored in a depth frame is
//! `T_world_sensor`, so
//! ```text
//! p_world = T_world_sensor * p_sensor
//! ```

use nalgebra::{Matrix3, Vector3};

use super::SE3;

/// Below this the forward direction is treated as parallel to world up.
const PARALLEL_EPS: f64 = 1e-9;

// ============================================================================
// Fixed Rotations
// ============================================================================

/// Rotation taking camera-frame (RDF) vectors into world (FLU) vectors for a
/// level camera looking along world +X.
///
/// Maps:
/// - Camera +Z (forward) → World +X
/// - Camera +X (right)   → World -Y
/// - Camera +Y (down)    → World -Z
#[rustfmt::skip]
pub fn rotation_world_cam() -> Matrix3<f64> {
    Matrix3::new(
        0.0,  0.0, 1.0,  // World X = Camera Z
       -1.0,  0.0, 0.0,  // World Y = -Camera X
        0.0, -1.0, 0.0,  // World Z = -Camera Y
    )
}

/// Inverse of [`rotation_world_cam`].
pub fn rotation_cam_world() -> Matrix3<f64> {
    rotation_world_cam().transpose()
}

// ============================================================================
// Sensor Pose Construction
// ============================================================================

/// Sensor pose `T_world_sensor` for a camera at `eye` looking at `target`,
/// with image "down" pointing as close to world -Z as possible.
///
/// When the viewing direction is vertical the image "right" axis falls back
/// to world -Y.
pub fn camera_look_at(eye: &Vector3<f64>, target: &Vector3<f64>) -> SE3 {
    let diff = target - eye;
    let forward = if diff.norm() > PARALLEL_EPS {
        diff.normalize()
    } else {
        Vector3::x()
    };

    let up = Vector3::z();
    let right_raw = forward.cross(&up);
    let right = if right_raw.norm() > PARALLEL_EPS {
        right_raw.normalize()
    } else {
        -Vector3::y()
    };
    let down = forward.cross(&right);

    let rotation = Matrix3::from_columns(&[right, down, forward]);
    SE3::from_rt(rotation, *eye)
}

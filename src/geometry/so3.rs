//! SO(3) helpers for planar (yaw-only) motion.
//!
//! Yaw is extracted with a swing-twist decomposition of the quaternion about
//! the world Z axis instead of Euler angles, which stays well defined near
//! pitch = ±90° where the Euler yaw flips.

use std::f64::consts::PI;

use nalgebra::{UnitQuaternion, Vector3};

/// Below this the twist about Z is undefined (pure half-turn about a
/// horizontal axis).
const SMALL_TWIST_THRESHOLD: f64 = 1e-12;

/// Rotation about world Z by `yaw` radians.
#[inline]
pub fn yaw_rotation(yaw: f64) -> UnitQuaternion<f64> {
    UnitQuaternion::from_axis_angle(&Vector3::z_axis(), yaw)
}

/// Wrap an angle into (-π, π].
pub fn normalize_angle(angle: f64) -> f64 {
    let mut a = angle % (2.0 * PI);
    if a <= -PI {
        a += 2.0 * PI;
    } else if a > PI {
        a -= 2.0 * PI;
    }
    a
}

/// Twist angle of `q` about world Z.
///
/// ```text
/// q = (w, x, y, z)  →  twist = 2 · atan2(z, w)
/// ```
pub fn yaw_of(q: &UnitQuaternion<f64>) -> f64 {
    let q = q.quaternion();
    if q.w.abs() < SMALL_TWIST_THRESHOLD && q.k.abs() < SMALL_TWIST_THRESHOLD {
        return 0.0;
    }
    normalize_angle(2.0 * q.k.atan2(q.w))
}

/// Signed yaw that rotates `from` onto `to`, measured in the world frame.
///
/// Computed from the relative quaternion `to · from⁻¹`, so for an upright
/// pair `to = yaw_rotation(θ) · from` this returns θ.
pub fn yaw_between(from: &UnitQuaternion<f64>, to: &UnitQuaternion<f64>) -> f64 {
    yaw_of(&(to * from.inverse()))
}

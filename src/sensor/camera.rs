use nalgebra::{Matrix3, Vector2, Vector3};
use serde::{Deserialize, Serialize};

/// Pinhole intrinsics for a rectified depth camera (RDF sensor frame).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraModel {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

impl CameraModel {
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self { fx, fy, cx, cy }
    }

    /// From a 3x3 intrinsic matrix `K`.
    pub fn from_k(k: &Matrix3<f64>) -> Self {
        Self {
            fx: k[(0, 0)],
            fy: k[(1, 1)],
            cx: k[(0, 2)],
            cy: k[(1, 2)],
        }
    }

    /// Viewing ray through pixel `(u, v)`, scaled so that `z = 1`.
    ///
    /// Multiplying by a depth reading gives the sensor-frame point.
    #[inline]
    pub fn project_2d_to_3d(&self, u: f64, v: f64) -> Vector3<f64> {
        Vector3::new((u - self.cx) / self.fx, (v - self.cy) / self.fy, 1.0)
    }

    /// Pixel coordinates of a sensor-frame point, `None` behind the camera.
    #[inline]
    pub fn project_3d_to_2d(&self, p: &Vector3<f64>) -> Option<Vector2<f64>> {
        if p.z <= 0.0 {
            return None;
        }
        let z_inv = 1.0 / p.z;
        Some(Vector2::new(
            self.fx * p.x * z_inv + self.cx,
            self.fy * p.y * z_inv + self.cy,
        ))
    }

    /// Integer pixel `(x, y)` of a sensor-frame point if it lands inside a
    /// `width × height` image.
    pub fn pixel_of(
        &self,
        p: &Vector3<f64>,
        width: usize,
        height: usize,
    ) -> Option<(usize, usize)> {
        let uv = self.project_3d_to_2d(p)?;
        let x = (uv.x + 0.5).floor();
        let y = (uv.y + 0.5).floor();
        if x < 0.0 || y < 0.0 || x >= width as f64 || y >= height as f64 {
            return None;
        }
        Some((x as usize, y as usize))
    }
}

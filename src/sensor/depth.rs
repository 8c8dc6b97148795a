//! Depth images and the frame bundle handed to the update pipeline.

use anyhow::{Result, ensure};
use nalgebra::Vector3;

use super::CameraModel;
use crate::geometry::SE3;

/// A depth reading is usable when it is positive and finite.
#[inline]
pub fn is_valid_depth(d: f32) -> bool {
    d.is_finite() && d > 0.0
}

/// Row-major range image in metres. `0` and non-finite values are invalid.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthImage {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl DepthImage {
    pub fn new(width: usize, height: usize, data: Vec<f32>) -> Result<Self> {
        ensure!(
            data.len() == width * height,
            "Depth buffer has {} values but a {}x{} image needs {}",
            data.len(),
            width,
            height,
            width * height
        );
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Image with every pixel invalid.
    pub fn zeros(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    /// `(x, y)` of a flat index.
    #[inline]
    pub fn coords(&self, idx: usize) -> (usize, usize) {
        (idx % self.width, idx / self.width)
    }

    #[inline]
    pub fn get(&self, idx: usize) -> f32 {
        self.data.get(idx).copied().unwrap_or(0.0)
    }

    #[inline]
    pub fn at(&self, x: usize, y: usize) -> f32 {
        if x >= self.width || y >= self.height {
            return 0.0;
        }
        self.data[self.index(x, y)]
    }

    #[inline]
    pub fn set(&mut self, idx: usize, value: f32) {
        if let Some(slot) = self.data.get_mut(idx) {
            *slot = value;
        }
    }

    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|d| is_valid_depth(**d)).count()
    }

    /// Indices of all valid pixels in row-major order.
    pub fn valid_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.data
            .iter()
            .enumerate()
            .filter(|(_, d)| is_valid_depth(**d))
            .map(|(i, _)| i)
    }

    /// Sensor-frame point of a pixel for an explicit depth value.
    pub fn point_at(&self, camera: &CameraModel, idx: usize, depth: f32) -> Vector3<f64> {
        let (x, y) = self.coords(idx);
        camera.project_2d_to_3d(x as f64, y as f64) * depth as f64
    }
}

/// One depth capture with intrinsics, sensor pose and capture time.
#[derive(Debug, Clone)]
pub struct DepthFrame {
    pub depth: DepthImage,
    pub camera: CameraModel,
    /// `T_world_sensor`.
    pub sensor_pose: SE3,
    pub timestamp_ns: u64,
}

impl DepthFrame {
    pub fn new(
        depth: DepthImage,
        camera: CameraModel,
        sensor_pose: SE3,
        timestamp_ns: u64,
    ) -> Self {
        Self {
            depth,
            camera,
            sensor_pose,
            timestamp_ns,
        }
    }

    /// Sensor-frame point of a pixel, `None` for invalid depth.
    pub fn point_sensor(&self, idx: usize) -> Option<Vector3<f64>> {
        let d = self.depth.get(idx);
        is_valid_depth(d).then(|| self.depth.point_at(&self.camera, idx, d))
    }

    /// World-frame point of a pixel, `None` for invalid depth.
    pub fn point_world(&self, idx: usize) -> Option<Vector3<f64>> {
        self.point_sensor(idx)
            .map(|p| self.sensor_pose.transform_point(&p))
    }

    /// Same frame with a different depth image.
    pub fn with_depth(&self, depth: DepthImage) -> DepthFrame {
        DepthFrame {
            depth,
            camera: self.camera,
            sensor_pose: self.sensor_pose,
            timestamp_ns: self.timestamp_ns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_new_checks_buffer_size() {
        assert!(DepthImage::new(2, 2, vec![1.0; 4]).is_ok());
        assert!(DepthImage::new(2, 2, vec![1.0; 3]).is_err());
    }

    #[test]
    fn test_invalid_values() {
        let img = DepthImage::new(4, 1, vec![0.0, f32::NAN, f32::INFINITY, 1.2]).unwrap();
        assert_eq!(img.valid_count(), 1);
        assert_eq!(img.valid_indices().collect::<Vec<_>>(), vec![3]);
        assert!(!is_valid_depth(-1.0));
    }

    #[test]
    fn test_point_world_uses_sensor_pose() {
        let mut img = DepthImage::zeros(3, 3);
        img.set(img.index(1, 1), 2.0);
        let cam = CameraModel::new(1.0, 1.0, 1.0, 1.0);
        let frame = DepthFrame::new(img, cam, SE3::from_xyz_yaw(0.0, 0.0, 1.0, 0.0), 0);

        let p = frame.point_world(4).unwrap();
        assert_relative_eq!(p, Vector3::new(0.0, 0.0, 3.0), epsilon = 1e-12);
        assert!(frame.point_world(0).is_none());
    }
}

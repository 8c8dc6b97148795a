//! Correlative footprint fitter.
//!
//! Exhaustive search over a discretized (x, y, θ) window around the expected
//! pose. Each candidate places the entity's 2D footprint and counts the
//! observed points that land on it.
//!
//! # Algorithm
//!
//! 1. Keep points inside the entity's height band and near its origin
//! 2. Sub-sample to a bounded point budget
//! 3. For every candidate (dx, dy, dθ): count points within `hit_tolerance`
//!    of the moved footprint
//! 4. Highest count wins; ties go to the smallest motion

use std::f64::consts::PI;

use nalgebra::{Rotation2, Vector2};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{FitterData, PoseFitter, RoiWindow};
use crate::geometry::so3::yaw_rotation;
use crate::geometry::{SE3, polygon};
use crate::sensor::DepthFrame;
use crate::world::Entity;

/// Configuration for the correlative fitter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitterConfig {
    /// Search window half-width in X and Y (meters).
    pub search_window: f64,
    /// Linear search resolution (meters).
    pub linear_resolution: f64,
    /// Angular search resolution (radians).
    pub angular_resolution: f64,
    /// Points within this distance of the footprint count as hits (meters).
    pub hit_tolerance: f64,
    /// Minimum fraction of points that must hit.
    pub min_score: f64,
    /// Fewer usable points than this and the fit is refused.
    pub min_points: usize,
    /// Point budget for scoring.
    pub max_points: usize,
    /// Points below this world height are ignored (floor).
    pub floor_clearance: f64,
    /// Slack on the entity's height band (meters).
    pub height_tolerance: f64,
}

impl Default for FitterConfig {
    fn default() -> Self {
        Self {
            search_window: 0.2,       // ±20cm
            linear_resolution: 0.02,  // 2cm steps
            angular_resolution: 0.02, // ~1.1° steps
            hit_tolerance: 0.01,
            min_score: 0.5,
            min_points: 20,
            max_points: 600,
            floor_clearance: 0.05,
            height_tolerance: 0.02,
        }
    }
}

impl FitterConfig {
    /// Half-widths of the linear and angular search grids, in steps.
    ///
    /// A non-positive resolution or window collapses that axis to the
    /// expected value. The yaw search never exceeds half a turn either way.
    fn search_steps(&self, max_yaw_change: f64) -> (i64, i64) {
        let n_lin = if self.linear_resolution > 0.0 && self.search_window > 0.0 {
            (self.search_window / self.linear_resolution).round()
        } else {
            0.0
        };
        let n_ang = if self.angular_resolution > 0.0 && max_yaw_change > 0.0 {
            let half_turn = (PI / self.angular_resolution).ceil();
            (max_yaw_change / self.angular_resolution).floor().min(half_turn)
        } else {
            0.0
        };
        (finite_steps(n_lin), finite_steps(n_ang))
    }
}

/// Grid half-width bound so the search always terminates.
const MAX_STEPS: f64 = 200.0;

fn finite_steps(n: f64) -> i64 {
    if n.is_finite() { n.clamp(0.0, MAX_STEPS) as i64 } else { 0 }
}

/// Candidate offset and its score.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    dx: f64,
    dy: f64,
    dtheta: f64,
    hits: usize,
}

impl Candidate {
    fn motion(&self) -> f64 {
        self.dx * self.dx + self.dy * self.dy + self.dtheta * self.dtheta
    }

    fn beats(&self, other: &Candidate) -> bool {
        self.hits > other.hits || (self.hits == other.hits && self.motion() < other.motion())
    }
}

#[derive(Debug, Clone, Default)]
pub struct CorrelativeFitter {
    pub config: FitterConfig,
}

impl CorrelativeFitter {
    pub fn new(config: FitterConfig) -> Self {
        Self { config }
    }

    /// Entity footprint and height range in the entity frame.
    fn local_model(entity: &Entity) -> Option<(Vec<Vector2<f64>>, f64, f64)> {
        if let Some(shape) = entity.shape.as_ref().filter(|s| !s.is_empty()) {
            let xy: Vec<Vector2<f64>> =
                shape.vertices().iter().map(|v| Vector2::new(v.x, v.y)).collect();
            let (min, max) = shape.bounds();
            return Some((polygon::convex_hull(&xy), min.z, max.z));
        }
        if entity.hull.is_valid() {
            return Some((entity.hull.points.clone(), entity.hull.z_min, entity.hull.z_max));
        }
        None
    }

    fn score(&self, footprint: &[Vector2<f64>], points: &[Vector2<f64>], c: &mut Candidate) {
        // Move the points into the candidate's frame instead of the footprint
        let rot_inv = Rotation2::new(-c.dtheta);
        let shift = Vector2::new(c.dx, c.dy);
        c.hits = points
            .iter()
            .filter(|q| {
                let local = rot_inv * (*q - shift);
                polygon::distance(footprint, &local) <= self.config.hit_tolerance
            })
            .count();
    }
}

impl PoseFitter for CorrelativeFitter {
    fn process_sensor_data(&self, frame: &DepthFrame, roi: Option<&RoiWindow<'_>>) -> FitterData {
        let points = frame
            .depth
            .valid_indices()
            .filter_map(|idx| frame.point_world(idx))
            .filter(|p| roi.is_none_or(|r| r.accepts(p)))
            .collect();
        FitterData {
            points,
            sensor_pose: frame.sensor_pose,
        }
    }

    fn estimate_entity_pose(
        &self,
        data: &FitterData,
        entity: &Entity,
        expected_pose: &SE3,
        max_yaw_change: f64,
    ) -> Option<SE3> {
        let cfg = &self.config;
        let (local_fp, z_lo, z_hi) = Self::local_model(entity)?;
        if local_fp.len() < 3 {
            return None;
        }

        // Footprint in world orientation, centred on the expected origin
        let yaw_rot = Rotation2::new(expected_pose.yaw());
        let footprint: Vec<Vector2<f64>> = local_fp.iter().map(|p| yaw_rot * p).collect();
        let reach = footprint.iter().map(|p| p.norm()).fold(0.0, f64::max)
            + cfg.search_window
            + cfg.hit_tolerance;

        let origin = expected_pose.translation;
        let band_lo = (origin.z + z_lo - cfg.height_tolerance).max(cfg.floor_clearance);
        let band_hi = origin.z + z_hi + cfg.height_tolerance;

        let relevant: Vec<Vector2<f64>> = data
            .points
            .iter()
            .filter(|p| p.z >= band_lo && p.z <= band_hi)
            .map(|p| Vector2::new(p.x - origin.x, p.y - origin.y))
            .filter(|q| q.norm() <= reach)
            .collect();

        if relevant.len() < cfg.min_points {
            debug!(
                "Fit of {} refused: {} points in band (need {})",
                entity.id,
                relevant.len(),
                cfg.min_points
            );
            return None;
        }

        let stride = relevant.len().div_ceil(cfg.max_points.max(1));
        let points: Vec<Vector2<f64>> = relevant.iter().step_by(stride).copied().collect();

        let (n_lin, n_ang) = cfg.search_steps(max_yaw_change);
        let lin_step = if n_lin > 0 { cfg.linear_resolution } else { 0.0 };
        let ang_step = if n_ang > 0 { cfg.angular_resolution } else { 0.0 };

        let mut best: Option<Candidate> = None;
        for it in -n_ang..=n_ang {
            for ix in -n_lin..=n_lin {
                for iy in -n_lin..=n_lin {
                    let mut c = Candidate {
                        dx: ix as f64 * lin_step,
                        dy: iy as f64 * lin_step,
                        dtheta: it as f64 * ang_step,
                        hits: 0,
                    };
                    self.score(&footprint, &points, &mut c);
                    if best.is_none_or(|b| c.beats(&b)) {
                        best = Some(c);
                    }
                }
            }
        }

        let best = best?;
        let ratio = best.hits as f64 / points.len() as f64;
        if ratio < cfg.min_score {
            debug!("Fit of {} refused: score {:.2} < {:.2}", entity.id, ratio, cfg.min_score);
            return None;
        }

        debug!(
            "Fit of {}: dx {:.3} dy {:.3} dθ {:.3} (score {:.2})",
            entity.id, best.dx, best.dy, best.dtheta, ratio
        );

        let mut fitted = *expected_pose;
        fitted.rotation = yaw_rotation(best.dtheta) * expected_pose.rotation;
        fitted.translation.x += best.dx;
        fitted.translation.y += best.dy;
        Some(fitted)
    }
}

//! YAML scene files: a world snapshot plus one depth frame.
//!
//! ```yaml
//! camera: { fx: 180, fy: 180, cx: 120, cy: 90, width: 240, height: 180 }
//! sensor_pose:
//!   position: { x: 0, y: 0, z: 1.5 }
//!   look_at: { x: 2, y: 0, z: 0.8 }
//! timestamp_ns: 1000
//! entities:
//!   - id: table
//!     pose: { x: 2, y: 0, z: 0, yaw: 0 }
//!     shape:
//!       box: { min: { x: -0.4, y: -0.4, z: 0.7 }, max: { x: 0.4, y: 0.4, z: 0.75 } }
//! depth_csv: depth.csv   # or `observed:` world shapes to render
//! ```
//!
//! `sensor_pose` may instead be given as `data: [16 values]`, a row-major
//! 4x4 world-from-sensor matrix.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use csv::ReaderBuilder;
use nalgebra::{Matrix4, Vector2, Vector3};
use serde::Deserialize;
use tracing::{debug, info};

use crate::geometry::frames::camera_look_at;
use crate::geometry::shape::{XySpec, XyzSpec};
use crate::geometry::{Hull, SE3, ShapeSpec};
use crate::sensor::{CameraModel, DepthFrame, DepthImage, render_depth};
use crate::world::{Entity, MoveRestrictions, Roi, WorldModel};

/// A loaded scene.
#[derive(Debug, Clone)]
pub struct Scene {
    pub world: WorldModel,
    pub frame: DepthFrame,
}

#[derive(Debug, Deserialize)]
struct CameraYaml {
    fx: f64,
    fy: f64,
    cx: f64,
    cy: f64,
    width: usize,
    height: usize,
}

#[derive(Debug, Deserialize)]
struct SensorPoseYaml {
    #[serde(default)]
    data: Option<Vec<f64>>,
    #[serde(default)]
    position: Option<XyzSpec>,
    #[serde(default)]
    look_at: Option<XyzSpec>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PoseYaml {
    x: f64,
    y: f64,
    z: f64,
    yaw: f64,
}

#[derive(Debug, Deserialize)]
struct HullYaml {
    points: Vec<XySpec>,
    z_min: f64,
    z_max: f64,
}

#[derive(Debug, Deserialize)]
struct RoiYaml {
    include: ShapeSpec,
    min: f64,
    max: f64,
}

#[derive(Debug, Deserialize)]
struct MoveRestrictionsYaml {
    can_move: bool,
    #[serde(default)]
    move_direction: Option<XySpec>,
    can_rotate: bool,
}

#[derive(Debug, Deserialize)]
struct GroupYaml {
    name: String,
    #[serde(default)]
    is_main: bool,
}

#[derive(Debug, Deserialize)]
struct EntityYaml {
    id: String,
    #[serde(default)]
    pose: Option<PoseYaml>,
    #[serde(default)]
    shape: Option<ShapeSpec>,
    #[serde(default)]
    hull: Option<HullYaml>,
    #[serde(default)]
    roi: Option<RoiYaml>,
    #[serde(default)]
    move_restrictions: Option<MoveRestrictionsYaml>,
    #[serde(default)]
    state_update_group: Option<GroupYaml>,
    #[serde(default)]
    existence_probability: Option<f64>,
    #[serde(default)]
    data: serde_yaml::Value,
}

#[derive(Debug, Deserialize)]
struct SceneYaml {
    camera: CameraYaml,
    sensor_pose: SensorPoseYaml,
    #[serde(default)]
    timestamp_ns: u64,
    #[serde(default)]
    entities: Vec<EntityYaml>,
    #[serde(default)]
    depth_csv: Option<PathBuf>,
    #[serde(default)]
    observed: Vec<ShapeSpec>,
}

/// Load a scene file. `depth_csv` is resolved relative to the file.
pub fn load_scene(path: impl AsRef<Path>) -> Result<Scene> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let yaml: SceneYaml =
        serde_yaml::from_reader(file).with_context(|| format!("Failed to parse {:?}", path))?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    build_scene(yaml, base_dir)
}

/// Parse a scene from a string; relative paths resolve against `base_dir`.
pub fn parse_scene(yaml: &str, base_dir: &Path) -> Result<Scene> {
    let yaml: SceneYaml = serde_yaml::from_str(yaml).context("Failed to parse scene")?;
    build_scene(yaml, base_dir)
}

fn build_scene(yaml: SceneYaml, base_dir: &Path) -> Result<Scene> {
    let camera = CameraModel::new(yaml.camera.fx, yaml.camera.fy, yaml.camera.cx, yaml.camera.cy);
    let (width, height) = (yaml.camera.width, yaml.camera.height);
    let sensor_pose = sensor_pose_from(&yaml.sensor_pose)?;

    let mut world = WorldModel::new();
    for e in yaml.entities {
        let entity = entity_from(e)?;
        if world.insert(entity).is_some() {
            bail!("Duplicate entity id in scene");
        }
    }

    let depth = match &yaml.depth_csv {
        Some(rel) => load_depth_csv(base_dir.join(rel), width, height)?,
        None => {
            let shapes = yaml
                .observed
                .iter()
                .enumerate()
                .map(|(i, s)| s.to_shape().with_context(|| format!("Bad observed shape {}", i)))
                .collect::<Result<Vec<_>>>()?;
            debug!("Rendering {} observed shapes", shapes.len());
            render_depth(&camera, &sensor_pose, width, height, &shapes)
        }
    };

    info!(
        "Scene: {} entities, {}x{} depth with {} valid pixels",
        world.len(),
        width,
        height,
        depth.valid_count()
    );

    Ok(Scene {
        world,
        frame: DepthFrame::new(depth, camera, sensor_pose, yaml.timestamp_ns),
    })
}

fn sensor_pose_from(spec: &SensorPoseYaml) -> Result<SE3> {
    match (&spec.data, &spec.position, &spec.look_at) {
        (Some(data), None, None) => transform_from(data),
        (None, Some(position), Some(target)) => {
            let eye: Vector3<f64> = (*position).into();
            let target: Vector3<f64> = (*target).into();
            if (target - eye).norm() < 1e-9 {
                bail!("sensor_pose look_at coincides with position");
            }
            Ok(camera_look_at(&eye, &target))
        }
        _ => bail!("sensor_pose needs either 'data' or both 'position' and 'look_at'"),
    }
}

fn transform_from(data: &[f64]) -> Result<SE3> {
    if data.len() != 16 {
        bail!("Expected 16 elements for transform, got {}", data.len());
    }
    Ok(SE3::from_matrix(Matrix4::from_row_slice(data)))
}

fn entity_from(e: EntityYaml) -> Result<Entity> {
    let mut entity = Entity::new(e.id.as_str()).with_data(e.data);

    if let Some(p) = e.pose {
        entity = entity.with_pose(SE3::from_xyz_yaw(p.x, p.y, p.z, p.yaw));
    }
    if let Some(spec) = e.shape {
        let shape = spec
            .to_shape()
            .with_context(|| format!("Bad shape for entity '{}'", e.id))?;
        entity = entity.with_shape(shape);
    }
    if let Some(h) = e.hull {
        let points = h.points.iter().map(|p| Vector2::new(p.x, p.y)).collect();
        entity = entity.with_hull(Hull::new(points, h.z_min, h.z_max));
    }
    if let Some(roi) = e.roi {
        let include = roi
            .include
            .to_shape()
            .with_context(|| format!("Bad ROI shape for entity '{}'", e.id))?;
        entity = entity.with_roi(Roi {
            include: Arc::new(include),
            min: roi.min,
            max: roi.max,
        });
    }
    if let Some(m) = e.move_restrictions {
        let dir = m.move_direction.map_or(Vector2::zeros(), |d| Vector2::new(d.x, d.y));
        entity = entity.with_move_restrictions(MoveRestrictions {
            can_move: m.can_move,
            move_direction: dir,
            can_rotate: m.can_rotate,
        });
    }
    if let Some(g) = e.state_update_group {
        entity = entity.with_state_update_group(g.name, g.is_main);
    }
    if let Some(p) = e.existence_probability {
        entity.existence_probability = p.clamp(0.0, 1.0);
    }
    Ok(entity)
}

/// Read a `width × height` depth image from CSV, one image row per record.
///
/// Empty fields read as invalid (`0`); `nan` and `inf` are accepted.
pub fn load_depth_csv(path: impl AsRef<Path>, width: usize, height: usize) -> Result<DepthImage> {
    let path = path.as_ref();
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let mut data = Vec::with_capacity(width * height);
    let mut rows = 0usize;
    for (row, rec) in rdr.records().enumerate() {
        let rec = rec.with_context(|| format!("Failed to read row {} of {}", row, path.display()))?;
        if rec.len() != width {
            bail!(
                "Row {} of {} has {} values, expected {}",
                row,
                path.display(),
                rec.len(),
                width
            );
        }
        for (col, field) in rec.iter().enumerate() {
            let d: f32 = if field.is_empty() {
                0.0
            } else {
                field.parse().with_context(|| {
                    format!("Bad depth '{}' at row {}, column {}", field, row, col)
                })?
            };
            data.push(d);
        }
        rows += 1;
    }
    if rows != height {
        bail!("{} has {} rows, expected {}", path.display(), rows, height);
    }
    DepthImage::new(width, height, data)
}

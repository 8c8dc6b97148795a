//! Shared synthetic scene for unit tests: a floor, a table slab at
//! (2, 0) with an `on_top_of` area, and a small box standing on the table,
//! seen by a 240x180 depth camera 1.5 m above the floor.

use nalgebra::Vector3;

use crate::geometry::frames::camera_look_at;
use crate::geometry::{SE3, Shape};
use crate::sensor::{CameraModel, DepthFrame, render_depth};
use crate::world::{Entity, WorldModel};

pub const WIDTH: usize = 240;
pub const HEIGHT: usize = 180;

pub fn camera() -> CameraModel {
    CameraModel::new(180.0, 180.0, 120.0, 90.0)
}

pub fn sensor_pose() -> SE3 {
    camera_look_at(&Vector3::new(0.0, 0.0, 1.5), &Vector3::new(2.0, 0.0, 0.8))
}

pub fn floor_shape() -> Shape {
    Shape::from_box(Vector3::new(-5.0, -5.0, -0.1), Vector3::new(10.0, 5.0, 0.0))
}

pub fn table_pose() -> SE3 {
    SE3::from_xyz_yaw(2.0, 0.0, 0.0, 0.0)
}

/// Table top slab in the table frame.
pub fn table_local_shape() -> Shape {
    Shape::from_box(Vector3::new(-0.4, -0.4, 0.7), Vector3::new(0.4, 0.4, 0.75))
}

pub fn table_world_shape() -> Shape {
    table_local_shape().transformed(&table_pose())
}

/// The `on_top_of` area in the table frame.
pub fn area_shape_local() -> Shape {
    Shape::from_box(Vector3::new(-0.4, -0.4, 0.75), Vector3::new(0.4, 0.4, 1.25))
}

/// Unknown object standing on the table (world frame).
pub fn object_shape() -> Shape {
    Shape::from_box(Vector3::new(1.92, 0.02, 0.75), Vector3::new(2.08, 0.18, 0.95))
}

pub fn scene_frame(shapes: &[Shape]) -> DepthFrame {
    let pose = sensor_pose();
    let depth = render_depth(&camera(), &pose, WIDTH, HEIGHT, shapes);
    DepthFrame::new(depth, camera(), pose, 1_000)
}

/// Frame with floor, table and object.
pub fn standard_frame() -> DepthFrame {
    scene_frame(&[floor_shape(), table_world_shape(), object_shape()])
}

pub fn table_data() -> serde_yaml::Value {
    serde_yaml::from_str(
        r#"
areas:
  - name: on_top_of
    shape:
      box: { min: { x: -0.4, y: -0.4, z: 0.75 }, max: { x: 0.4, y: 0.4, z: 1.25 } }
  - name: empty
    shape:
      mesh: { vertices: [], triangles: [] }
"#,
    )
    .unwrap_or(serde_yaml::Value::Null)
}

pub fn table_entity() -> Entity {
    Entity::new("table")
        .with_pose(table_pose())
        .with_shape(table_local_shape())
        .with_data(table_data())
}

/// Floor and table, both static.
pub fn static_world() -> WorldModel {
    [
        Entity::new("floor")
            .with_pose(SE3::identity())
            .with_shape(floor_shape()),
        table_entity(),
    ]
    .into_iter()
    .collect()
}

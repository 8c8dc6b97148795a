//! Geometry kernel: rigid transforms, yaw helpers, polygons, hull prisms and
//! triangle meshes.

pub mod frames;
pub mod hull;
pub mod polygon;
pub mod se3;
pub mod shape;
pub mod so3;

pub use hull::{Hull, HullPrism};
pub use se3::SE3;
pub use shape::{Shape, ShapeSpec, Volume};

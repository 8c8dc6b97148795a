//! Depth sensing: pinhole camera model, depth images/frames and a mesh
//! ray-caster for synthetic frames.

pub mod camera;
pub mod depth;
pub mod render;

pub use camera::CameraModel;
pub use depth::{DepthFrame, DepthImage, is_valid_depth};
pub use render::render_depth;

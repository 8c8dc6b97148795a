//! Scene and depth-image loading.

pub mod scene;

pub use scene::{Scene, load_depth_csv, load_scene, parse_scene};

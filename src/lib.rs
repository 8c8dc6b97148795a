pub mod association;
pub mod config;
pub mod fitting;
pub mod geometry;
pub mod io;
pub mod segmentation;
pub mod sensor;
pub mod updater;
pub mod world;

#[cfg(test)]
mod test_support;

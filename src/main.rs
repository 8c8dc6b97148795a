use anyhow::{Result, bail};
use tracing::info;

use rust_depth_update::config::UpdaterConfig;
use rust_depth_update::io::load_scene;
use rust_depth_update::updater::{UpdateRequest, Updater};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("rust_depth_update=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let Some(scene_path) = args.get(1) else {
        bail!("Usage: rust_depth_update <scene.yaml> [target] [config.yaml]");
    };
    let target = args.get(2).cloned().unwrap_or_default();

    let config = match args.get(3) {
        Some(path) => {
            info!("Loading configuration from {}", path);
            UpdaterConfig::from_yaml_file(path)?
        }
        None => UpdaterConfig::default(),
    };

    println!("Loading scene from: {}", scene_path);
    let scene = load_scene(scene_path)?;

    let mut updater = Updater::new(config);
    let request = UpdateRequest::new(target);
    let result = updater.update(&scene.world, &scene.frame, &request)?;

    if let Some(area) = &result.area_description {
        println!("Area: {}", area);
    }
    println!(
        "{} entity updates, {} commands",
        result.entity_updates.len(),
        result.batch.len()
    );
    for cmd in result.batch.commands() {
        println!("  {}", cmd);
    }
    Ok(())
}

//! Command-line front end: imports a folder of panoramas as a tour.

use std::path::{Path, PathBuf};

use pano_tour::loader::list_images;
use pano_tour::{AppConfig, LoadOptions, TourEditor};

/// Main entry point for native builds
fn main() {
    let config = AppConfig::load_from_default_path().unwrap_or_default();
    env_logger::Builder::new()
        .filter_level(config.preferences.log_level.to_level_filter())
        .parse_default_env()
        .init();

    let Some(folder) = std::env::args_os().nth(1).map(PathBuf::from) else {
        eprintln!("Usage: pano-tour <folder>");
        std::process::exit(2);
    };

    if let Err(e) = pollster::block_on(run(&config, &folder)) {
        eprintln!("Application error: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: &AppConfig, folder: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let images = list_images(folder)?;
    if images.is_empty() {
        log::warn!("No images found in {:?}", folder);
        return Ok(());
    }
    log::info!("Importing {} images from {:?}", images.len(), folder);

    let mut editor = TourEditor::new(config);
    for path in &images {
        let reference = path.to_string_lossy();
        let options = LoadOptions::new().on_thumbnail_ready(|thumb| {
            log::debug!("Thumbnail ready ({}x{})", thumb.width, thumb.height);
        });
        if let Err(e) = editor.import_image(&reference, options).await {
            log::warn!("Skipping {:?}: {}", path, e);
        }
    }

    // Visit every scene once so residency is capped along the way
    for _ in 0..editor.scenes().len() {
        if let Some(scene) = editor.next_scene().await? {
            log::info!(
                "Viewing '{}' ({} of {} resident)",
                scene.name,
                editor.scenes().loaded_count(),
                editor.scenes().len()
            );
        }
    }

    let cache = editor.loader().cache_stats();
    let loads = editor.loader().load_stats();
    println!("Scenes:         {}", editor.scenes().len());
    println!(
        "Resident:       {} (max {})",
        editor.scenes().loaded_count(),
        editor.scenes().max_loaded_scenes()
    );
    println!("Decode cache:   {}/{}", cache.size, cache.max_size);
    println!(
        "Load time (ms): avg {:.1}, min {:.1}, max {:.1} over {} loads",
        loads.average_ms, loads.min_ms, loads.max_ms, loads.count
    );

    let tour_path = folder.join("tour.json");
    editor.export_tour().save(&tour_path)?;
    println!("Tour written to {}", tour_path.display());
    Ok(())
}

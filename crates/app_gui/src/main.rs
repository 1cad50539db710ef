#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod app;

use annotator_core::AnnotatorConfig;
use directories_next::ProjectDirs;
use eframe::{NativeOptions, egui};
use std::path::PathBuf;

fn config_path() -> Option<PathBuf> {
    ProjectDirs::from("org", "skintone", "SkinToneAnnotator")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

fn main() {
    let config_path = config_path();
    let config = config_path
        .as_ref()
        .map(|path| AnnotatorConfig::load_or_default(path))
        .unwrap_or_default();

    tracing_subscriber::fmt()
        .with_max_level(config.log_level.to_tracing_level())
        .init();
    match &config_path {
        Some(path) => tracing::info!("config file: {}", path.display()),
        None => tracing::warn!("no config directory, using defaults"),
    }

    let options = NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_maximized(true)
            .with_min_inner_size([800.0, 600.0]),
        ..Default::default()
    };
    let title = format!("Skin Tone Annotator {}", env!("ANNOTATOR_VERSION"));
    if let Err(e) = eframe::run_native(
        &title,
        options,
        Box::new(move |_cc| {
            Ok::<_, Box<dyn std::error::Error + Send + Sync>>(Box::new(app::UiApp::new(
                config,
                config_path,
            )))
        }),
    ) {
        eprintln!("Application stopped with error: {e}");
    }
}

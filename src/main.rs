mod annotation;
mod app;
mod canvas;
mod chat;
mod clipboard;
mod color;
mod compositor;
mod config;
mod generation;
mod geometry;
mod history;
mod prompt_bar;
mod raster;
mod render;
mod state;
mod theme;
mod toolbar;
mod ui_controls;
mod worker;

use eframe::egui;

fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = config::AppConfig::load_or_default();

    let viewport = egui::ViewportBuilder::default()
        .with_title("PolyPrompt")
        .with_inner_size([1280.0, 800.0])
        .with_min_inner_size([640.0, 480.0]);

    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    eframe::run_native(
        "PolyPrompt",
        options,
        Box::new(move |cc| Box::new(app::PolyPromptApp::new(cc, config))),
    )
}

use anyhow::{Context, Result};
use pokecostume::integration::{AppConfig, Controller};
use pokecostume::ui::CostumeApp;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pokecostume=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Pokémon costume booth");

    let config = AppConfig::load().context("failed to load configuration")?;
    info!(
        "[CONFIG] Camera {:?}, model {}",
        config.camera.backend, config.generation.model
    );

    let controller = Controller::from_config(&config).context("failed to start")?;

    let window = &config.window;
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(window.title.clone())
            .with_inner_size([window.width, window.height])
            .with_min_inner_size([window.min_width, window.min_height]),
        ..Default::default()
    };

    eframe::run_native(
        &window.title,
        options,
        Box::new(move |cc| Ok(Box::new(CostumeApp::new(cc, controller)))),
    )
    .map_err(|e| anyhow::anyhow!("GUI error: {}", e))?;

    info!("Shut down cleanly");
    Ok(())
}

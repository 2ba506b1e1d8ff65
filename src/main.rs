//! Cube Viewport - Main Entry Point
//!
//! Usage: `cube-viewport [basic|wireframe|webcam|--list-cameras]`
//!
//! Set `VIEWPORT_CONFIG` to a JSON file to override the preset.

use std::path::PathBuf;

use anyhow::Context;
use cube_viewport::capture::NokhwaDevices;
use cube_viewport::config::{Variant, ViewportConfig};
use cube_viewport::ViewportApp;
use winit::event_loop::{ControlFlow, EventLoop};

const CONFIG_ENV: &str = "VIEWPORT_CONFIG";

fn main() -> anyhow::Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    log::info!("Cube Viewport v{}", env!("CARGO_PKG_VERSION"));

    let arg = std::env::args().nth(1);
    if arg.as_deref() == Some("--list-cameras") {
        for camera in NokhwaDevices::list_cameras() {
            println!("{}: {}", camera.index, camera.name);
        }
        return Ok(());
    }

    let config = load_config(arg.as_deref())?;
    log::info!("Variant: {}", config.variant.name());

    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = ViewportApp::new(config);
    event_loop.run_app(&mut app).context("Event loop error")?;

    log::info!("Cube Viewport exiting");
    Ok(())
}

/// Config file when `VIEWPORT_CONFIG` is set, otherwise the preset named on the command line
fn load_config(variant_arg: Option<&str>) -> anyhow::Result<ViewportConfig> {
    let variant = variant_arg
        .map(str::parse::<Variant>)
        .transpose()
        .context("Invalid variant argument")?;

    match std::env::var_os(CONFIG_ENV) {
        Some(path) => {
            let path = PathBuf::from(path);
            let config = ViewportConfig::load(&path)?;
            log::info!("Loaded config from {}", path.display());
            if let Some(variant) = variant.filter(|v| *v != config.variant) {
                log::warn!(
                    "Ignoring variant '{}', config file selects '{}'",
                    variant.name(),
                    config.variant.name()
                );
            }
            Ok(config)
        }
        None => Ok(ViewportConfig::for_variant(variant.unwrap_or_default())),
    }
}

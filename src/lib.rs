//! Area Restore
//!
//! Smooth un-maximize for the Area desktop: restored windows land centered at
//! a configurable fraction of the work area behind an overlay, undersized new
//! windows are nudged up to a minimum open size, and a panel shows custom
//! window buttons while the focused window is maximized.

pub mod compositor;
pub mod config;
pub mod runtime;
pub mod shared;
pub mod wm;

#[cfg(test)]
mod testing;

pub use compositor::{Compositor, CompositorEvent, Signal};
pub use config::{Config, Settings};
pub use runtime::{HostMessage, run};
pub use wm::Engine;
pub use wm::decorations::{DecorationHook, NoDecorations, SystemDecorations};
pub use wm::panel::{PanelButton, PanelUpdate};

use std::path::Path;

use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber. `RUST_LOG` overrides the default
/// filter. Does nothing if a subscriber is already installed.
pub fn init_logging() {
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "area_restore=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Engine with settings from `~/.config/area/restore.toml` and whichever
/// decoration backends are available. Logging is initialized first.
pub fn launch<C: Compositor>(comp: C) -> Engine<C> {
    init_logging();
    let settings = match Config::config_path() {
        Ok(path) => load_settings(&path),
        Err(e) => {
            warn!("No config path, using defaults: {}", e);
            Settings::default()
        }
    };
    Engine::new(comp, settings, Box::new(SystemDecorations::detect()))
}

/// Engine with settings read from `config_path`
pub fn engine_from_config<C: Compositor>(
    comp: C,
    config_path: &Path,
    decorations: Box<dyn DecorationHook>,
) -> Engine<C> {
    Engine::new(comp, load_settings(config_path), decorations)
}

fn load_settings(config_path: &Path) -> Settings {
    match Config::load_from(config_path) {
        Ok(config) => config.restore,
        Err(e) => {
            warn!("Failed to load config, using defaults: {:#}", e);
            Settings::default()
        }
    }
}

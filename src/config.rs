//! Configuration for the restore engine
//!
//! Loads configuration from TOML file at `~/.config/area/restore.toml`
//! Auto-generates default config file on first run if missing.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Restored size used when the configured percentage is 0
pub const DEFAULT_WINDOW_SIZE_PERCENT: u32 = 80;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub restore: Settings,
}

impl Config {
    /// Load configuration from file, or use defaults if file doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            info!("Config file not found at {:?}, using defaults", config_path);
            if let Err(e) = Self::save_default(config_path) {
                warn!("Failed to create default config file: {}", e);
            }
            return Ok(Self::default());
        }

        let content = fs::read_to_string(config_path)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&content)
            .context("Failed to parse config file")?;

        info!("Configuration loaded from {:?}", config_path);
        debug!("Config: {:?}", config);

        Ok(config)
    }

    /// Get the path to the config file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("area");

        Ok(config_dir.join("restore.toml"))
    }

    /// Save default configuration to file
    fn save_default(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let toml_string = toml::to_string_pretty(&Self::default())
            .context("Failed to serialize default config")?;

        fs::write(path, toml_string)
            .context("Failed to write default config file")?;

        info!("Created default config file at {:?}", path);
        Ok(())
    }
}

/// Settings the engine reads on every use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Size of a restored window, percent of the work area (0 = default)
    pub window_size_percent: u32,
    /// Minimum size of newly opened windows, percent of the work area (0 = off)
    pub min_open_size_percent: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            window_size_percent: DEFAULT_WINDOW_SIZE_PERCENT,
            min_open_size_percent: 0,
        }
    }
}

impl Settings {
    /// Restored size percentage in 1..=100
    pub fn restore_percent(&self) -> u32 {
        match self.window_size_percent {
            0 => DEFAULT_WINDOW_SIZE_PERCENT,
            pct => pct.min(100),
        }
    }

    /// Minimum open size percentage, `None` when enforcement is off
    pub fn min_open_percent(&self) -> Option<u32> {
        match self.min_open_size_percent {
            0 => None,
            pct => Some(pct.min(100)),
        }
    }
}

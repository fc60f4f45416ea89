//! # Persistence Module
//!
//! All settings of the bridge live in one TOML file, by default
//! `~/.config/mascon-bridge/settings.toml`. Every section falls back to its
//! defaults, so a partial or missing file still gives a working setup.
//!
//! ## Sections
//! - `[controller]`: tick rate, button code base, chatter filter
//! - `[session]`: the configuration the bridge starts with, written back
//!   whenever a configuration change is applied
//! - `[timing]`: press, release, settle and guard delays
//! - `[keys]`: key bindings per role
//! - `[output]`: virtual keyboard name and dry-run switch
//!
//! ## Error Handling Strategy
//! File operations return `color_eyre` reports with the failing step in the
//! message. A file that exists but does not parse is logged and replaced by
//! defaults in memory; it is not overwritten until the next session save.

use crate::config::ConfigurationContext;
use crate::controller::ControllerSettings;
use crate::mapping::{KeyBindings, Timing};
use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const CONFIG_DIR: &str = ".config/mascon-bridge";
const SETTINGS_FILE: &str = "settings.toml";

/// Where key events go.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct OutputSettings {
    /// Log key events instead of emitting them
    pub dry_run: bool,
    /// Name of the uinput device
    pub device_name: String,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            dry_run: false,
            device_name: "mascon-bridge virtual keyboard".to_string(),
        }
    }
}

/// Complete settings file.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct BridgeSettings {
    pub controller: ControllerSettings,
    pub session: ConfigurationContext,
    pub timing: Timing,
    pub keys: KeyBindings,
    pub output: OutputSettings,
}

/// Reads and writes the settings file.
#[derive(Clone, Debug)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `~/.config/mascon-bridge/settings.toml`
    pub fn default_path() -> Result<PathBuf> {
        let mut path =
            dirs::home_dir().ok_or_else(|| eyre!("Could not determine home directory"))?;
        path.push(CONFIG_DIR);
        path.push(SETTINGS_FILE);
        Ok(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes default settings if no file exists yet.
    pub async fn ensure_default_settings(&self) -> Result<()> {
        if tokio::fs::try_exists(&self.path)
            .await
            .map_err(|e| eyre!("Failed to check if settings file exists: {}", e))?
        {
            debug!("Settings file found at {}", self.path.display());
            return Ok(());
        }

        info!("Creating default settings at {}", self.path.display());
        self.save(&BridgeSettings::default()).await
    }

    /// Loads the settings file. A missing file yields defaults, so does one
    /// that fails to parse.
    pub async fn load(&self) -> Result<BridgeSettings> {
        if !tokio::fs::try_exists(&self.path)
            .await
            .map_err(|e| eyre!("Failed to check if settings file exists: {}", e))?
        {
            warn!(
                "Settings file {} does not exist, using defaults",
                self.path.display()
            );
            return Ok(BridgeSettings::default());
        }

        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| eyre!("Failed to read settings file: {}", e))?;

        match toml::from_str::<BridgeSettings>(&content) {
            Ok(settings) => {
                info!("Settings loaded from {}", self.path.display());
                Ok(settings)
            }
            Err(e) => {
                warn!(
                    "Failed to parse settings file {}, using defaults: {}",
                    self.path.display(),
                    e
                );
                Ok(BridgeSettings::default())
            }
        }
    }

    pub async fn save(&self, settings: &BridgeSettings) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| eyre!("Failed to create settings directory: {}", e))?;
        }

        let content = toml::to_string_pretty(settings)
            .map_err(|e| eyre!("Failed to serialize settings: {}", e))?;

        tokio::fs::write(&self.path, content)
            .await
            .map_err(|e| eyre!("Failed to write settings file: {}", e))?;

        debug!("Settings written to {}", self.path.display());
        Ok(())
    }

    /// Replaces the `[session]` section and keeps everything else as on disk.
    pub async fn save_session(&self, session: &ConfigurationContext) -> Result<()> {
        let mut settings = self.load().await?;
        settings.session = *session;
        self.save(&settings).await?;
        info!("Session saved: {} / {}", session.target, session.variant);
        Ok(())
    }
}

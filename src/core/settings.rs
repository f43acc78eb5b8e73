//! Application settings
//!
//! Persisted to `<config dir>/AudioCD-Splitter/settings.json`. The settings
//! are read once at startup and handed to the planner and orchestrators as
//! plain values; nothing reads them from shared state during a run.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::burning::BurnOptions;
use crate::error::{Error, Result};
use crate::planner::{DEFAULT_CAPACITY_MINUTES, SplitMode};

const APP_DIR_NAME: &str = "AudioCD-Splitter";

/// Application-wide settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Disc capacity in minutes
    pub capacity_minutes: f64,
    /// Packing policy used when planning discs
    pub split_mode: SplitMode,
    /// Device, speed and eject flag for wodim
    pub burn: BurnOptions,
    /// Destination root for converted discs
    pub output_dir: Option<PathBuf>,
    /// Explicit ffmpeg binary (otherwise searched on PATH)
    pub ffmpeg_path: Option<PathBuf>,
    /// Explicit wodim binary (otherwise searched on PATH)
    pub wodim_path: Option<PathBuf>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            capacity_minutes: DEFAULT_CAPACITY_MINUTES,
            split_mode: SplitMode::default(),
            burn: BurnOptions::default(),
            output_dir: None,
            ffmpeg_path: None,
            wodim_path: None,
        }
    }
}

impl AppSettings {
    const SETTINGS_FILE: &'static str = "settings.json";

    /// Get the settings directory (e.g. ~/.config/AudioCD-Splitter/)
    pub fn settings_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR_NAME))
    }

    pub fn settings_path() -> Option<PathBuf> {
        Self::settings_dir().map(|d| d.join(Self::SETTINGS_FILE))
    }

    /// Load settings from disk, or return defaults if not found
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else {
            log::debug!("No config directory, using default settings");
            return Self::default();
        };

        match Self::load_from(&path) {
            Ok(settings) => {
                log::debug!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                log::debug!("Using default settings: {}", e);
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::Settings(format!(
                "settings file not found: {}",
                path.display()
            )));
        }

        let contents = std::fs::read_to_string(path)?;
        let settings: Self = serde_json::from_str(&contents)
            .map_err(|e| Error::Settings(format!("failed to parse settings: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Save settings to the default location
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::settings_path()
            .ok_or_else(|| Error::Settings("could not determine config directory".to_string()))?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Settings(format!("failed to serialize settings: {}", e)))?;
        std::fs::write(path, json)?;

        log::debug!("Saved settings to {}", path.display());
        Ok(())
    }

    /// Basic sanity checks on loaded values
    pub fn validate(&self) -> Result<()> {
        if !self.capacity_minutes.is_finite() || self.capacity_minutes <= 0.0 {
            return Err(Error::InvalidCapacity(self.capacity_minutes));
        }
        if self.burn.speed == 0 {
            return Err(Error::Settings("burn speed must be at least 1".to_string()));
        }
        if self.burn.device.trim().is_empty() {
            return Err(Error::Settings("burn device must not be empty".to_string()));
        }
        Ok(())
    }
}

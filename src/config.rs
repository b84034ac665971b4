// SPDX-License-Identifier: GPL-3.0-only

//! User configuration
//!
//! Stored as JSON at `<config dir>/snapcam/config.json`. Missing fields take
//! their defaults; an unreadable file is replaced by defaults with a warning.

use crate::backends::camera::types::{CameraBackendType, LensFacing};
use crate::constants::{APP_NAME, analysis};
use crate::errors::{AppError, AppResult};
use crate::session::use_cases::{AspectRatio, CaptureMode, FlashMode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Current configuration layout version
pub const CONFIG_VERSION: u32 = 1;

const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Layout version the file was written with
    pub version: u32,
    /// Camera backend to use
    pub backend: CameraBackendType,
    /// Which way the preferred camera faces
    pub lens_facing: LensFacing,
    /// Preview (and stream) aspect ratio
    pub aspect_ratio: AspectRatio,
    pub capture_mode: CaptureMode,
    pub flash_mode: FlashMode,
    /// Run the luminance analyzer
    pub analysis_enabled: bool,
    /// Minimum spacing of luminance computations
    pub analysis_interval_ms: u64,
    /// Where photos go instead of `<Pictures>/snapcam`
    pub output_directory: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            backend: CameraBackendType::default(),
            lens_facing: LensFacing::Back,
            aspect_ratio: AspectRatio::Ratio16x9,
            capture_mode: CaptureMode::MinimizeLatency,
            flash_mode: FlashMode::Auto,
            analysis_enabled: true,
            analysis_interval_ms: analysis::INTERVAL.as_millis() as u64,
            output_directory: None,
        }
    }
}

impl Config {
    /// Default location of the config file
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Load from the default location, falling back to defaults
    pub fn load() -> Self {
        match Self::path() {
            Some(path) if path.exists() => Self::load_from(&path).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "Invalid config, using defaults");
                Self::default()
            }),
            _ => {
                debug!("No config file, using defaults");
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> AppResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Config =
            serde_json::from_str(&raw).map_err(|e| AppError::Config(e.to_string()))?;
        if config.version > CONFIG_VERSION {
            warn!(
                found = config.version,
                supported = CONFIG_VERSION,
                "Config written by a newer version"
            );
        }
        Ok(config)
    }

    /// Write to the default location
    pub fn save(&self) -> AppResult<()> {
        let path = Self::path()
            .ok_or_else(|| AppError::Config("no configuration directory".to_string()))?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json =
            serde_json::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(path, json)?;
        debug!(path = %path.display(), "Config saved");
        Ok(())
    }

    /// Analyzer interval, never below one millisecond
    pub fn analysis_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.analysis_interval_ms.max(1))
    }
}

//! Timing configuration
//!
//! Settings are read from a YAML file. Every key is optional; anything left out
//! keeps its default, and a missing file means "all defaults".
//!
//! ```yaml
//! overlay:
//!   poll_ms: 250
//!   player_index: 1
//!   lap_display: time
//! colors:
//!   pitting: "#ffcc00"
//!   retired: "#ff8888"
//! memory:
//!   version: REND32A
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::laps::LapDisplayMode;
use crate::memory::MemoryVersion;
use crate::{Result, TimingError};

/// Top-level configuration.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub overlay: OverlaySettings,
    pub colors: ColorSettings,
    pub memory: MemorySettings,
    pub limits: Limits,
}

/// Polling and player settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlaySettings {
    /// Poll period in milliseconds
    pub poll_ms: u64,
    /// Struct index of the player's car
    pub player_index: usize,
    /// How the last lap column is shown
    pub lap_display: LapDisplayMode,
    /// Base path of the CSV lap log; each session writes `<stem>_<timestamp>.csv`
    pub lap_log: Option<PathBuf>,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self { poll_ms: 250, player_index: 1, lap_display: LapDisplayMode::Time, lap_log: None }
    }
}

/// Colour hints handed to the presentation layer. Opaque strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorSettings {
    pub pitting: String,
    pub retired: String,
    pub best_global: String,
    pub best_personal: String,
}

impl Default for ColorSettings {
    fn default() -> Self {
        Self {
            pitting: "#ffcc00".to_string(),
            retired: "#ff8888".to_string(),
            best_global: "#a0f".to_string(),
            best_personal: "#0f0".to_string(),
        }
    }
}

/// Which game build to read and where it lives.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemorySettings {
    pub version: MemoryVersion,
    /// Game executable; WINDY resolves track names from the TRACKS folder next to it
    pub game_exe: Option<PathBuf>,
}

/// Sanity limits for counters read from memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub max_cars: usize,
    pub max_laps: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self { max_cars: 200, max_laps: 10_000 }
    }
}

impl TimingConfig {
    /// Parse configuration from YAML text.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml_ng::from_str(yaml)
            .map_err(|e| TimingError::Config { reason: e.to_string() })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file, falling back to defaults when it does not exist.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!("No configuration at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path)
            .map_err(|e| TimingError::file_error(path.to_path_buf(), e))?;
        let config = Self::from_yaml_str(&text)?;
        debug!(path = %path.display(), version = ?config.memory.version, "Loaded configuration");
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.overlay.poll_ms == 0 {
            return Err(TimingError::Config { reason: "overlay.poll_ms must be positive".into() });
        }
        if self.limits.max_cars < 2 {
            return Err(TimingError::Config {
                reason: "limits.max_cars must allow a pace car and one racer".into(),
            });
        }
        if self.limits.max_laps == 0 {
            return Err(TimingError::Config { reason: "limits.max_laps must be positive".into() });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_gives_defaults() {
        let config = TimingConfig::from_yaml_str("").unwrap();
        assert_eq!(config, TimingConfig::default());
        assert_eq!(config.colors.pitting, "#ffcc00");
        assert_eq!(config.colors.retired, "#ff8888");
        assert_eq!(config.overlay.poll_ms, 250);
        assert_eq!(config.memory.version, MemoryVersion::Rend32a);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = TimingConfig::from_yaml_str(
            "colors:\n  pitting: yellow\nmemory:\n  version: dos\n",
        )
        .unwrap();
        assert_eq!(config.colors.pitting, "yellow");
        assert_eq!(config.colors.retired, "#ff8888");
        assert_eq!(config.memory.version, MemoryVersion::Dos);
        assert_eq!(config.limits.max_cars, 200);
        assert_eq!(config.overlay.lap_display, LapDisplayMode::Time);
    }

    #[test]
    fn lap_display_mode_is_lowercase() {
        let config = TimingConfig::from_yaml_str("overlay:\n  lap_display: speed\n").unwrap();
        assert_eq!(config.overlay.lap_display, LapDisplayMode::Speed);
        assert_eq!(config.overlay.poll_ms, 250);
    }

    #[test]
    fn unknown_version_is_a_config_error() {
        let err = TimingConfig::from_yaml_str("memory:\n  version: N64\n").unwrap_err();
        assert!(matches!(err, TimingError::Config { .. }), "{err:?}");
        assert!(err.to_string().contains("N64"));
    }

    #[test]
    fn zero_poll_period_is_rejected() {
        let err = TimingConfig::from_yaml_str("overlay:\n  poll_ms: 0\n").unwrap_err();
        assert!(matches!(err, TimingError::Config { .. }));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let config = TimingConfig::load("/definitely/not/here/settings.yaml").unwrap();
        assert_eq!(config, TimingConfig::default());
    }

    #[test]
    fn load_reads_file() {
        let path = std::env::temp_dir().join(format!("icr2-timing-config-{}.yaml", std::process::id()));
        std::fs::write(&path, "overlay:\n  poll_ms: 100\n").unwrap();
        let config = TimingConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(config.overlay.poll_ms, 100);
    }
}

//! Ambient settings for a configurator session.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SettingsError;
use crate::store::InputBounds;

/// Session-wide settings. Every field has a default, so a partial JSON file is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StudioSettings {
    /// Directory downloads are written into.
    pub download_dir: PathBuf,

    /// Clamping range for the numeric controls.
    pub bounds: InputBounds,

    pub logging: LoggingSettings,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level filter (e.g. "info", "qrstyle=debug,warn"). `RUST_LOG` takes precedence.
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for StudioSettings {
    fn default() -> Self {
        StudioSettings {
            download_dir: PathBuf::from("generated"),
            bounds: InputBounds::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl StudioSettings {
    pub fn from_json_str(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads settings from a JSON file.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let settings = StudioSettings::from_json_str(
            r#"{ "downloadDir": "out", "logging": { "json": true } }"#,
        )
        .unwrap();

        assert_eq!(settings.download_dir, PathBuf::from("out"));
        assert_eq!(settings.bounds, InputBounds::default());
        assert!(settings.logging.json);
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "bounds": { "minSize": 50, "maxSize": 500, "minMargin": 0, "maxMargin": 20 } }"#).unwrap();

        let settings = StudioSettings::load(&path).unwrap();
        assert_eq!(settings.bounds.max_size, 500);
        assert_eq!(settings.download_dir, PathBuf::from("generated"));

        assert!(matches!(StudioSettings::load(&dir.path().join("nope.json")), Err(SettingsError::Io(_))));
        assert!(matches!(StudioSettings::from_json_str("{"), Err(SettingsError::Json(_))));
    }
}

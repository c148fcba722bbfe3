//! Application configuration.

use proedit_core::EditorConfig;
use proedit_render::ExportFormat;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    pub title: String,
    pub editor: EditorConfig,
    /// Format used when the output path has no recognizable extension.
    pub export_format: ExportFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "ProEdit".to_string(),
            editor: EditorConfig::default(),
            export_format: ExportFormat::Png,
        }
    }
}

impl AppConfig {
    /// Load a JSON config file. Missing fields take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config = serde_json::from_str(&content)?;
        log::info!("Loaded config from {:?}", path.as_ref());
        Ok(config)
    }
}

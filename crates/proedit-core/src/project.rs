//! Project file format.

use crate::background::BackgroundFit;
use crate::layers::Layer;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Errors reading a project file.
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Malformed project file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Duplicate layer id: {0}")]
    DuplicateId(String),
}

/// Saved editor state: layers plus background settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFile {
    #[serde(default)]
    pub layers: Vec<Layer>,
    #[serde(default)]
    pub background_image: Option<String>,
    #[serde(default)]
    pub background_fit: BackgroundFit,
}

impl ProjectFile {
    /// Parse and validate a project file.
    pub fn from_json(json: &str) -> Result<Self, ProjectError> {
        let mut project: ProjectFile = serde_json::from_str(json)?;
        project.validate()?;
        project.layers.iter_mut().for_each(Layer::normalize_text_scale);
        Ok(project)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    fn validate(&self) -> Result<(), ProjectError> {
        let mut seen = HashSet::new();
        for layer in &self.layers {
            if !seen.insert(layer.id()) {
                return Err(ProjectError::DuplicateId(layer.id().to_string()));
            }
        }
        Ok(())
    }
}

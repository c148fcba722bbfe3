//! Project files, exports and image imports on the local filesystem.

use proedit_core::{ProjectError, ProjectFile};
use proedit_render::data_url;
use proedit_render::loader::{ImageLoadError, decode_image};
use std::path::Path;
use thiserror::Error;

/// File operation errors.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Project(#[from] ProjectError),
    #[error("Failed to serialize project: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Unsupported image file: {0}")]
    UnsupportedImage(String),
    #[error(transparent)]
    Image(#[from] ImageLoadError),
}

/// An image file turned into something an image layer can show.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedImage {
    pub url: String,
    pub width: f64,
    pub height: f64,
}

/// Save a project as pretty-printed JSON.
pub fn save_project(path: &Path, project: &ProjectFile) -> Result<(), FileError> {
    let json = project.to_json()?;
    std::fs::write(path, json)?;
    log::info!("Saved project to: {:?}", path);
    Ok(())
}

/// Read and validate a project file.
pub fn open_project(path: &Path) -> Result<ProjectFile, FileError> {
    let content = std::fs::read_to_string(path)?;
    let project = ProjectFile::from_json(&content).map_err(|e| {
        log::error!("Failed to parse project {:?}: {}", path, e);
        e
    })?;
    log::info!("Loaded project from: {:?}", path);
    Ok(project)
}

/// Write exported image bytes.
pub fn write_export(path: &Path, bytes: &[u8]) -> Result<(), FileError> {
    std::fs::write(path, bytes)?;
    log::info!("Exported image to: {:?}", path);
    Ok(())
}

/// Embed an image file as a data URL, reading its natural size.
pub fn import_image(path: &Path) -> Result<ImportedImage, FileError> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_string())
        .unwrap_or_default();
    let mime = data_url::mime_for_extension(&ext)
        .ok_or_else(|| FileError::UnsupportedImage(path.display().to_string()))?;
    let bytes = std::fs::read(path)?;
    let image = decode_image(&bytes)?;
    Ok(ImportedImage {
        url: data_url::encode(&bytes, mime),
        width: image.width as f64,
        height: image.height as f64,
    })
}

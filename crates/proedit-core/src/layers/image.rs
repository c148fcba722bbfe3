//! Image layer payload.

use serde::{Deserialize, Serialize};

/// A raster image placed on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageLayer {
    /// Data URI or remote URL.
    pub image_url: String,
    /// Display width.
    pub width: f64,
    /// Display height.
    pub height: f64,
}

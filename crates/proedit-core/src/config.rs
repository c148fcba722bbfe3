//! Editor configuration.

use kurbo::Size;
use serde::{Deserialize, Serialize};

/// Tunables for the editor and its canvas.
///
/// Every field has a default, so partial JSON documents deserialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    pub canvas_width: f64,
    pub canvas_height: f64,
    /// Flat color painted when there is no background image. Also the
    /// eraser color.
    pub background_color: String,
    /// Initial freehand drawing color.
    pub drawing_color: String,
    /// Offset applied to duplicated layers, on both axes.
    pub duplicate_offset: f64,
    pub brush_width: f64,
    pub eraser_width: f64,
    pub zoom_step: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Maximum undo depth; unbounded when `None`.
    pub history_limit: Option<usize>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            canvas_width: 1200.0,
            canvas_height: 800.0,
            background_color: "#1a1a24".to_string(),
            drawing_color: "#ffffff".to_string(),
            duplicate_offset: 20.0,
            brush_width: 3.0,
            eraser_width: 20.0,
            zoom_step: 1.2,
            min_zoom: 0.1,
            max_zoom: 10.0,
            history_limit: None,
        }
    }
}

impl EditorConfig {
    pub fn canvas_size(&self) -> Size {
        Size::new(self.canvas_width, self.canvas_height)
    }
}

//! Actions emitted by the editor panels.
//!
//! The toolbar, layers list and properties form never touch the surface;
//! everything they do is one of these values dispatched to the editor.

use crate::background::BackgroundFit;
use crate::layers::{Layer, LayerId, LayerPatch, ShapeType};
use crate::tools::ToolKind;
use kurbo::{Point, Size};
use serde::{Deserialize, Serialize};

/// Anchor used to align a layer against the canvas bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlignPosition {
    #[serde(rename = "tl")]
    TopLeft,
    #[serde(rename = "tc")]
    TopCenter,
    #[serde(rename = "tr")]
    TopRight,
    #[serde(rename = "cl")]
    CenterLeft,
    #[serde(rename = "cc")]
    Center,
    #[serde(rename = "cr")]
    CenterRight,
    #[serde(rename = "bl")]
    BottomLeft,
    #[serde(rename = "bc")]
    BottomCenter,
    #[serde(rename = "br")]
    BottomRight,
}

impl AlignPosition {
    pub fn all() -> &'static [AlignPosition] {
        &[
            AlignPosition::TopLeft,
            AlignPosition::TopCenter,
            AlignPosition::TopRight,
            AlignPosition::CenterLeft,
            AlignPosition::Center,
            AlignPosition::CenterRight,
            AlignPosition::BottomLeft,
            AlignPosition::BottomCenter,
            AlignPosition::BottomRight,
        ]
    }

    pub fn label(self) -> &'static str {
        match self {
            AlignPosition::TopLeft => "Top Left",
            AlignPosition::TopCenter => "Top Center",
            AlignPosition::TopRight => "Top Right",
            AlignPosition::CenterLeft => "Left",
            AlignPosition::Center => "Center",
            AlignPosition::CenterRight => "Right",
            AlignPosition::BottomLeft => "Bottom Left",
            AlignPosition::BottomCenter => "Bottom Center",
            AlignPosition::BottomRight => "Bottom Right",
        }
    }

    /// Top-left position for an object of `size` anchored in `canvas`.
    pub fn resolve(self, size: Size, canvas: Size) -> Point {
        let left = 0.0;
        let center_x = (canvas.width - size.width) / 2.0;
        let right = canvas.width - size.width;
        let top = 0.0;
        let center_y = (canvas.height - size.height) / 2.0;
        let bottom = canvas.height - size.height;

        let (x, y) = match self {
            AlignPosition::TopLeft => (left, top),
            AlignPosition::TopCenter => (center_x, top),
            AlignPosition::TopRight => (right, top),
            AlignPosition::CenterLeft => (left, center_y),
            AlignPosition::Center => (center_x, center_y),
            AlignPosition::CenterRight => (right, center_y),
            AlignPosition::BottomLeft => (left, bottom),
            AlignPosition::BottomCenter => (center_x, bottom),
            AlignPosition::BottomRight => (right, bottom),
        };
        Point::new(x, y)
    }
}

/// Everything a panel can ask the editor to do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum EditorAction {
    // Toolbar
    AddLayer { layer: Layer },
    AddText,
    AddShape { shape_type: ShapeType },
    AddImage { url: String, width: f64, height: f64 },
    SetTool { tool: ToolKind },
    SetDrawingColor { color: String },
    SetBackground { url: Option<String> },
    SetBackgroundFit { fit: BackgroundFit },
    NewProject,

    // Layers list
    SelectLayer { id: Option<LayerId> },
    DeleteLayer { id: LayerId },
    DuplicateLayer { id: LayerId },
    ToggleLock { id: LayerId },
    ToggleHide { id: LayerId },
    RenameLayer { id: LayerId, name: String },
    BringForward { id: LayerId },
    SendBackward { id: LayerId },

    // Properties form
    UpdateLayer { id: LayerId, patch: LayerPatch },
    /// Align the selected layer against the canvas.
    Align { position: AlignPosition },

    // History and view
    Undo,
    Redo,
    ZoomIn,
    ZoomOut,
    ZoomReset,
}

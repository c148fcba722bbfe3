//! ProEdit Core Library
//!
//! Platform-agnostic layer model, history and editor state for the ProEdit
//! design editor.

pub mod actions;
pub mod background;
pub mod camera;
pub mod color;
pub mod config;
pub mod editor;
pub mod fill;
pub mod history;
pub mod layers;
pub mod project;
pub mod storage;
pub mod tools;

pub use actions::{AlignPosition, EditorAction};
pub use background::{BackgroundFit, Placement};
pub use camera::Camera;
pub use color::{ColorError, Rgba, parse_color};
pub use config::EditorConfig;
pub use editor::Editor;
pub use fill::{ColorStop, Fill, resolve_fill};
pub use history::History;
pub use layers::{
    BlendMode, Gradient, GradientType, Layer, LayerId, LayerKind, LayerPatch, Shadow, ShapeType, Stroke,
    TextAlign,
};
pub use project::{ProjectError, ProjectFile};
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError};
pub use tools::{PointerSample, StrokeStyle, ToolKind, ToolManager, ToolOutput};

//! ProEdit Render Library
//!
//! Rendering-surface abstraction, the canvas synchronizer that keeps a
//! surface in step with the layer list, image loading and export.

pub mod data_url;
pub mod export;
pub mod loader;
pub mod retained;
pub mod surface;
pub mod sync;

pub use export::{ExportError, ExportFormat, ExportOutcome, export};
pub use loader::{DataUrlLoader, DecodedImage, ImageCompletion, ImageKey, ImageLoadError, ImageLoader};
pub use retained::RetainedSurface;
pub use surface::{
    InteractionMode, ObjectHandle, ObjectKind, PixelBuffer, Surface, SurfaceBackground, SurfaceEvent,
    SurfaceObject,
};
pub use sync::{SyncAction, Synchronizer};

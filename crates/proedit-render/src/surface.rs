//! Rendering-surface abstraction.
//!
//! A surface is a retained, stateful scene of objects (the live canvas).
//! Only the synchronizer creates, mutates or removes its objects.

use crate::loader::DecodedImage;
use kurbo::{Affine, BezPath, Size, Vec2};
use proedit_core::background::Placement;
use proedit_core::{Fill, Rgba, StrokeStyle, TextAlign};

/// Opaque handle to a surface object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectHandle(pub u64);

/// Text content and typography of a text object.
#[derive(Debug, Clone, PartialEq)]
pub struct TextContent {
    pub text: String,
    pub font_size: f64,
    pub font_family: String,
    pub font_weight: String,
    pub align: TextAlign,
    /// Letter spacing in thousandths of an em.
    pub char_spacing: f64,
    pub line_height: f64,
}

/// Geometry of a surface object in its local box.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectKind {
    Text(TextContent),
    Rect { width: f64, height: f64 },
    Circle { radius: f64 },
    Ellipse { rx: f64, ry: f64 },
    Triangle { width: f64, height: f64 },
    /// Bitmap stretched over a `width`×`height` box.
    Image { image: DecodedImage, width: f64, height: f64 },
    /// Open path stroked with the object's stroke.
    Path(BezPath),
}

impl ObjectKind {
    pub fn is_text(&self) -> bool {
        matches!(self, ObjectKind::Text(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectStroke {
    pub color: Rgba,
    pub width: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectShadow {
    pub color: Rgba,
    pub blur: f64,
    pub offset: Vec2,
}

/// One live object on the surface.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceObject {
    pub kind: ObjectKind,
    pub left: f64,
    pub top: f64,
    /// Rotation in degrees.
    pub angle: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    pub opacity: f64,
    /// Interior fill; `None` for paths and images.
    pub fill: Option<Fill>,
    pub stroke: Option<ObjectStroke>,
    pub shadow: Option<ObjectShadow>,
    pub blend: peniko::BlendMode,
    pub visible: bool,
    /// Can become the active selection.
    pub selectable: bool,
    /// Receives pointer input (hit testing, dragging, resizing).
    pub evented: bool,
}

impl SurfaceObject {
    /// A default-styled object of `kind` at the origin.
    pub fn new(kind: ObjectKind) -> Self {
        Self {
            kind,
            left: 0.0,
            top: 0.0,
            angle: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            opacity: 1.0,
            fill: None,
            stroke: None,
            shadow: None,
            blend: peniko::BlendMode::default(),
            visible: true,
            selectable: true,
            evented: true,
        }
    }

    /// Object to canvas transform (scale and rotate about the top-left
    /// corner, then translate).
    pub fn transform(&self) -> Affine {
        Affine::translate((self.left, self.top))
            * Affine::rotate(self.angle.to_radians())
            * Affine::scale_non_uniform(self.scale_x, self.scale_y)
    }
}

/// What the canvas shows behind the objects.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceBackground {
    Color(Rgba),
    /// Placed image over a fallback color.
    Image {
        image: DecodedImage,
        placement: Placement,
        color: Rgba,
    },
}

/// Pointer interaction policy, derived from the active tool.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionMode {
    /// Objects can be clicked, dragged and transformed.
    pub objects: bool,
    /// Marquee (multi-object) selection.
    pub multi_select: bool,
    /// Freehand brush preview, while drawing.
    pub brush: Option<StrokeStyle>,
}

impl Default for InteractionMode {
    fn default() -> Self {
        Self {
            objects: true,
            multi_select: true,
            brush: None,
        }
    }
}

/// Notifications emitted by the surface in response to user input.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    SelectionCreated(Vec<ObjectHandle>),
    SelectionUpdated(Vec<ObjectHandle>),
    SelectionCleared,
    /// A drag, resize, rotate or text edit finished.
    ObjectModified(ObjectHandle),
    /// In-place text changed (per keystroke).
    TextChanged(ObjectHandle),
    /// Raw pointer input in viewport coordinates.
    PointerDown(kurbo::Point),
    PointerMove(kurbo::Point),
    PointerUp(kurbo::Point),
}

/// RGBA8 pixels, row-major, straight alpha.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl PixelBuffer {
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let data = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self { width, height, data }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y * self.width + x) * 4) as usize;
        let px = self.data.get(i..i + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Check that the buffer length matches its dimensions.
    pub fn is_valid(&self) -> bool {
        self.data.len() == self.width as usize * self.height as usize * 4
    }
}

/// A retained rendering surface.
pub trait Surface {
    /// Add an object on top of the stack.
    fn add_object(&mut self, object: SurfaceObject) -> ObjectHandle;

    /// Replace an object's state. Returns false for unknown handles.
    fn update_object(&mut self, handle: ObjectHandle, object: SurfaceObject) -> bool;

    fn remove_object(&mut self, handle: ObjectHandle) -> bool;

    fn object(&self, handle: ObjectHandle) -> Option<&SurfaceObject>;

    /// Restack the given objects back to front. Objects not listed keep
    /// their relative order below them.
    fn reorder(&mut self, order: &[ObjectHandle]);

    /// Rendered size of an object's local box, before scaling.
    fn measure(&self, handle: ObjectHandle) -> Option<Size>;

    /// Set the active selection. Emits no selection events.
    fn set_active_object(&mut self, handle: Option<ObjectHandle>);

    fn active_object(&self) -> Option<ObjectHandle>;

    fn set_background(&mut self, background: SurfaceBackground);

    fn set_zoom(&mut self, zoom: f64);

    fn pan_viewport(&mut self, delta: Vec2);

    /// Canvas to viewport transform.
    fn viewport_transform(&self) -> Affine;

    fn set_interaction(&mut self, mode: InteractionMode);

    /// Canvas size in pixels.
    fn size(&self) -> Size;

    /// Paint the canvas (ignoring the viewport) and read it back.
    /// `None` when the surface has no pixel backing.
    fn read_pixels(&self) -> Option<PixelBuffer>;

    /// Take the events emitted since the last call.
    fn drain_events(&mut self) -> Vec<SurfaceEvent>;

    fn object_count(&self) -> usize;
}

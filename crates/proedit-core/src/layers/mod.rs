//! Layer definitions for the design canvas.

mod drawing;
mod image;
mod patch;
mod shape;
mod text;

pub use drawing::{DrawingLayer, path_from_points, simplify_points};
pub use image::ImageLayer;
pub use patch::LayerPatch;
pub use shape::{ShapeLayer, ShapeType};
pub use text::{TextAlign, TextLayer};

use kurbo::{Point, Size, Vec2};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque unique identifier for layers.
///
/// Used as the join key between the layer collection and rendering-surface
/// objects. Serialized as a plain string so project files stay readable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(String);

impl LayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh identifier.
    pub fn generate() -> Self {
        Self(format!("layer-{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LayerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for LayerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Drop shadow settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shadow {
    pub enabled: bool,
    pub color: String,
    pub blur: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl Default for Shadow {
    fn default() -> Self {
        Self {
            enabled: false,
            color: "#000000".to_string(),
            blur: 10.0,
            offset_x: 0.0,
            offset_y: 4.0,
        }
    }
}

/// Outline stroke settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub enabled: bool,
    pub color: String,
    pub width: f64,
}

impl Default for Stroke {
    fn default() -> Self {
        Self {
            enabled: false,
            color: "#000000".to_string(),
            width: 2.0,
        }
    }
}

/// Gradient geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GradientType {
    #[default]
    Linear,
    Radial,
}

/// Two-stop gradient fill settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gradient {
    pub enabled: bool,
    #[serde(rename = "type")]
    pub kind: GradientType,
    /// Ordered color stops; the first two are used.
    pub colors: Vec<String>,
    /// Angle in degrees (kept for panels; fills are laid along the local x axis).
    pub angle: f64,
}

impl Default for Gradient {
    fn default() -> Self {
        Self {
            enabled: false,
            kind: GradientType::Linear,
            colors: vec!["#00d4ff".to_string(), "#b844ff".to_string()],
            angle: 135.0,
        }
    }
}

/// Compositing mode applied at paint time.
///
/// Names follow the canvas `globalCompositeOperation` vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlendMode {
    #[default]
    SourceOver,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Hue,
    Saturation,
    Color,
    Luminosity,
}

impl BlendMode {
    /// Get the peniko blend mode used when painting.
    pub fn to_peniko(self) -> peniko::BlendMode {
        use peniko::{Compose, Mix};
        let mix = match self {
            BlendMode::SourceOver => Mix::Normal,
            BlendMode::Multiply => Mix::Multiply,
            BlendMode::Screen => Mix::Screen,
            BlendMode::Overlay => Mix::Overlay,
            BlendMode::Darken => Mix::Darken,
            BlendMode::Lighten => Mix::Lighten,
            BlendMode::ColorDodge => Mix::ColorDodge,
            BlendMode::ColorBurn => Mix::ColorBurn,
            BlendMode::HardLight => Mix::HardLight,
            BlendMode::SoftLight => Mix::SoftLight,
            BlendMode::Difference => Mix::Difference,
            BlendMode::Exclusion => Mix::Exclusion,
            BlendMode::Hue => Mix::Hue,
            BlendMode::Saturation => Mix::Saturation,
            BlendMode::Color => Mix::Color,
            BlendMode::Luminosity => Mix::Luminosity,
        };
        peniko::BlendMode::new(mix, Compose::SrcOver)
    }

    /// All blend modes, in panel order.
    pub fn all() -> &'static [BlendMode] {
        &[
            BlendMode::SourceOver,
            BlendMode::Multiply,
            BlendMode::Screen,
            BlendMode::Overlay,
            BlendMode::Darken,
            BlendMode::Lighten,
            BlendMode::ColorDodge,
            BlendMode::ColorBurn,
            BlendMode::HardLight,
            BlendMode::SoftLight,
            BlendMode::Difference,
            BlendMode::Exclusion,
            BlendMode::Hue,
            BlendMode::Saturation,
            BlendMode::Color,
            BlendMode::Luminosity,
        ]
    }
}

/// Variant-specific layer payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LayerKind {
    Text(TextLayer),
    Shape(ShapeLayer),
    Image(ImageLayer),
    Drawing(DrawingLayer),
}

impl LayerKind {
    /// Tag name as used in project files.
    pub fn type_name(&self) -> &'static str {
        match self {
            LayerKind::Text(_) => "text",
            LayerKind::Shape(_) => "shape",
            LayerKind::Image(_) => "image",
            LayerKind::Drawing(_) => "drawing",
        }
    }
}

fn default_opacity() -> f64 {
    1.0
}

fn default_scale() -> f64 {
    1.0
}

/// One placeable, styleable object in the composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    pub(crate) id: LayerId,
    /// Human label; display falls back to a content-derived label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub x: f64,
    pub y: f64,
    /// Rotation in degrees.
    #[serde(default)]
    pub rotation: f64,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    #[serde(default = "default_scale")]
    pub scale_x: f64,
    #[serde(default = "default_scale")]
    pub scale_y: f64,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub blend_mode: BlendMode,
    #[serde(default)]
    pub shadow: Shadow,
    #[serde(default)]
    pub stroke: Stroke,
    #[serde(flatten)]
    pub kind: LayerKind,
}

/// Default placement for new layers.
pub const DEFAULT_POSITION: Point = Point::new(400.0, 300.0);

impl Layer {
    fn with_kind(id: LayerId, name: String, kind: LayerKind) -> Self {
        Self {
            id,
            name: Some(name),
            x: DEFAULT_POSITION.x,
            y: DEFAULT_POSITION.y,
            rotation: 0.0,
            opacity: 1.0,
            scale_x: 1.0,
            scale_y: 1.0,
            locked: false,
            hidden: false,
            blend_mode: BlendMode::SourceOver,
            shadow: Shadow::default(),
            stroke: Stroke::default(),
            kind,
        }
    }

    /// Create a text layer with default styling.
    pub fn new_text(id: LayerId) -> Self {
        Self::with_kind(id, "Text Layer".to_string(), LayerKind::Text(TextLayer::default()))
    }

    /// Create a shape layer of the given type.
    pub fn new_shape(id: LayerId, shape_type: ShapeType) -> Self {
        Self::with_kind(
            id,
            format!("{} Shape", shape_type.label()),
            LayerKind::Shape(ShapeLayer::new(shape_type)),
        )
    }

    /// Create an image layer displaying `image_url` at the given size.
    pub fn new_image(id: LayerId, image_url: impl Into<String>, width: f64, height: f64) -> Self {
        let mut layer = Self::with_kind(
            id,
            "Image Layer".to_string(),
            LayerKind::Image(ImageLayer {
                image_url: image_url.into(),
                width,
                height,
            }),
        );
        layer.stroke.width = 0.0;
        layer
    }

    /// Create a freehand drawing layer.
    pub fn new_drawing(
        id: LayerId,
        path_data: impl Into<String>,
        stroke_color: impl Into<String>,
        stroke_width: f64,
    ) -> Self {
        Self::with_kind(
            id,
            "Drawing".to_string(),
            LayerKind::Drawing(DrawingLayer {
                path_data: path_data.into(),
                stroke_color: stroke_color.into(),
                stroke_width,
            }),
        )
    }

    pub fn id(&self) -> &LayerId {
        &self.id
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn set_position(&mut self, position: Point) {
        self.x = position.x;
        self.y = position.y;
    }

    /// Fold a non-unit scale on a text layer into its font size.
    ///
    /// Text layers always keep a 1×1 scale.
    pub fn normalize_text_scale(&mut self) {
        let factor = (self.scale_x + self.scale_y) / 2.0;
        if let LayerKind::Text(text) = &mut self.kind {
            if (factor - 1.0).abs() > f64::EPSILON {
                text.font_size = text.scaled_font_size(factor);
            }
            self.scale_x = 1.0;
            self.scale_y = 1.0;
        }
    }

    /// Label shown in the layers list.
    pub fn display_name(&self) -> String {
        if let Some(name) = self.name.as_deref().filter(|n| !n.trim().is_empty()) {
            return name.to_string();
        }
        match &self.kind {
            LayerKind::Text(t) if !t.text.is_empty() => t.text.clone(),
            LayerKind::Text(_) => "Text".to_string(),
            LayerKind::Shape(s) => s.shape_type.label().to_string(),
            LayerKind::Image(_) => "Image".to_string(),
            LayerKind::Drawing(_) => "Drawing".to_string(),
        }
    }

    /// Clone this layer under a new id, offset by `offset`.
    pub fn duplicate_with(&self, id: LayerId, offset: Vec2) -> Self {
        let mut copy = self.clone();
        copy.id = id;
        copy.set_position(self.position() + offset);
        copy
    }

    /// Unscaled size for variants that carry explicit geometry.
    ///
    /// Text has no intrinsic size until the surface measures it.
    pub fn nominal_size(&self) -> Option<Size> {
        let size = match &self.kind {
            LayerKind::Shape(s) => Size::new(s.width, s.height),
            LayerKind::Image(i) => Size::new(i.width, i.height),
            LayerKind::Drawing(d) => d.bounds().map(|b| b.size())?,
            LayerKind::Text(_) => return None,
        };
        Some(Size::new(size.width * self.scale_x.abs(), size.height * self.scale_y.abs()))
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, LayerKind::Text(_))
    }

    pub fn is_image(&self) -> bool {
        matches!(self.kind, LayerKind::Image(_))
    }

    pub fn as_text(&self) -> Option<&TextLayer> {
        match &self.kind {
            LayerKind::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_text_mut(&mut self) -> Option<&mut TextLayer> {
        match &mut self.kind {
            LayerKind::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_shape(&self) -> Option<&ShapeLayer> {
        match &self.kind {
            LayerKind::Shape(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_image(&self) -> Option<&ImageLayer> {
        match &self.kind {
            LayerKind::Image(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_drawing(&self) -> Option<&DrawingLayer> {
        match &self.kind {
            LayerKind::Drawing(d) => Some(d),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_defaults() {
        let layer = Layer::new_text(LayerId::new("t1"));
        assert_eq!(layer.id().as_str(), "t1");
        assert!((layer.x - 400.0).abs() < f64::EPSILON);
        assert!((layer.y - 300.0).abs() < f64::EPSILON);
        assert!((layer.opacity - 1.0).abs() < f64::EPSILON);
        assert!((layer.scale_x - 1.0).abs() < f64::EPSILON);
        assert_eq!(layer.blend_mode, BlendMode::SourceOver);
        assert!(!layer.shadow.enabled && !layer.stroke.enabled);

        let text = layer.as_text().unwrap();
        assert!((text.font_size - 48.0).abs() < f64::EPSILON);
        assert_eq!(text.text_align, TextAlign::Center);
        assert!(!text.gradient.enabled);
        assert_eq!(text.gradient.colors, vec!["#00d4ff", "#b844ff"]);
    }

    #[test]
    fn test_shape_defaults() {
        let circle = Layer::new_shape(LayerId::new("c"), ShapeType::Circle);
        let shape = circle.as_shape().unwrap();
        assert_eq!(circle.name.as_deref(), Some("Circle Shape"));
        assert!((shape.width - 100.0).abs() < f64::EPSILON);
        assert!((shape.height - 100.0).abs() < f64::EPSILON);

        let rect = Layer::new_shape(LayerId::new("r"), ShapeType::Rectangle);
        let shape = rect.as_shape().unwrap();
        assert!((shape.width - 150.0).abs() < f64::EPSILON);
        assert_eq!(shape.fill, "#00d4ff");
        assert!(shape.gradient.as_ref().is_some_and(|g| !g.enabled));
    }

    #[test]
    fn test_image_defaults() {
        let layer = Layer::new_image(LayerId::new("i"), "data:image/png;base64,AAAA", 640.0, 480.0);
        assert!(layer.is_image());
        assert!(layer.stroke.width.abs() < f64::EPSILON);
        assert_eq!(layer.nominal_size(), Some(Size::new(640.0, 480.0)));
    }

    #[test]
    fn test_display_name_fallback() {
        let mut layer = Layer::new_text(LayerId::new("t"));
        layer.name = None;
        assert_eq!(layer.display_name(), "Double click to edit");

        let mut shape = Layer::new_shape(LayerId::new("s"), ShapeType::Triangle);
        shape.name = Some("  ".to_string());
        assert_eq!(shape.display_name(), "Triangle");
    }

    #[test]
    fn test_duplicate_with_offset() {
        let layer = Layer::new_shape(LayerId::new("s"), ShapeType::Ellipse);
        let copy = layer.duplicate_with(LayerId::new("s2"), Vec2::new(20.0, 20.0));
        assert_eq!(copy.id().as_str(), "s2");
        assert!((copy.x - 420.0).abs() < f64::EPSILON);
        assert!((copy.y - 320.0).abs() < f64::EPSILON);
        assert_eq!(copy.kind, layer.kind);
    }

    #[test]
    fn test_serialized_shape_is_flat_and_tagged() {
        let layer = Layer::new_text(LayerId::new("t"));
        let value = serde_json::to_value(&layer).unwrap();
        assert_eq!(value["type"], "text");
        assert_eq!(value["fontSize"], 48.0);
        assert_eq!(value["blendMode"], "source-over");
        assert_eq!(value["gradient"]["type"], "linear");
        assert_eq!(value["shadow"]["offsetY"], 4.0);
    }

    #[test]
    fn test_deserialize_minimal_layer() {
        let json = r##"{"id":"a","type":"shape","x":1,"y":2,"shapeType":"circle","width":10,"height":10,"fill":"#fff"}"##;
        let layer: Layer = serde_json::from_str(json).unwrap();
        assert_eq!(layer.id().as_str(), "a");
        assert!((layer.opacity - 1.0).abs() < f64::EPSILON);
        assert!((layer.scale_y - 1.0).abs() < f64::EPSILON);
        assert_eq!(layer.as_shape().unwrap().shape_type, ShapeType::Circle);
        assert!(layer.as_shape().unwrap().gradient.is_none());
    }

    #[test]
    fn test_blend_mode_mapping() {
        let mode = BlendMode::Multiply.to_peniko();
        assert_eq!(mode.mix, peniko::Mix::Multiply);
        assert_eq!(BlendMode::all().len(), 16);
        let parsed: BlendMode = serde_json::from_str("\"color-dodge\"").unwrap();
        assert_eq!(parsed, BlendMode::ColorDodge);
    }
}

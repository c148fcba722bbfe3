//! Partial layer updates.

use super::{BlendMode, Gradient, Layer, LayerKind, Shadow, ShapeType, Stroke, TextAlign};
use serde::{Deserialize, Serialize};

/// A partial-field update merged into a layer.
///
/// Common fields always apply. Variant fields apply only when the layer is
/// of the matching variant; the rest are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayerPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale_x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale_y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blend_mode: Option<BlendMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shadow: Option<Shadow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke: Option<Stroke>,

    // Text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_align: Option<TextAlign>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub letter_spacing: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_height: Option<f64>,

    // Text and shape
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gradient: Option<Gradient>,

    // Shape and image
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape_type: Option<ShapeType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    // Drawing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f64>,
}

impl LayerPatch {
    /// Patch that moves a layer.
    pub fn position(x: f64, y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Self::default()
        }
    }

    /// Patch that replaces text content.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Check if the patch carries no fields.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn merge<T: Clone>(target: &mut T, value: &Option<T>) {
    if let Some(v) = value {
        *target = v.clone();
    }
}

impl Layer {
    /// Merge a partial update into this layer.
    pub fn apply_patch(&mut self, patch: &LayerPatch) {
        if let Some(name) = &patch.name {
            self.name = Some(name.clone());
        }
        merge(&mut self.x, &patch.x);
        merge(&mut self.y, &patch.y);
        merge(&mut self.rotation, &patch.rotation);
        if let Some(opacity) = patch.opacity {
            self.opacity = opacity.clamp(0.0, 1.0);
        }
        merge(&mut self.scale_x, &patch.scale_x);
        merge(&mut self.scale_y, &patch.scale_y);
        merge(&mut self.locked, &patch.locked);
        merge(&mut self.hidden, &patch.hidden);
        merge(&mut self.blend_mode, &patch.blend_mode);
        merge(&mut self.shadow, &patch.shadow);
        merge(&mut self.stroke, &patch.stroke);

        let ignored = match &mut self.kind {
            LayerKind::Text(t) => {
                merge(&mut t.text, &patch.text);
                merge(&mut t.font_size, &patch.font_size);
                merge(&mut t.font_family, &patch.font_family);
                merge(&mut t.font_weight, &patch.font_weight);
                merge(&mut t.color, &patch.color);
                merge(&mut t.text_align, &patch.text_align);
                merge(&mut t.letter_spacing, &patch.letter_spacing);
                merge(&mut t.line_height, &patch.line_height);
                merge(&mut t.gradient, &patch.gradient);
                patch.shape_type.is_some()
                    || patch.width.is_some()
                    || patch.height.is_some()
                    || patch.fill.is_some()
                    || patch.image_url.is_some()
                    || patch.path_data.is_some()
            }
            LayerKind::Shape(s) => {
                merge(&mut s.shape_type, &patch.shape_type);
                merge(&mut s.width, &patch.width);
                merge(&mut s.height, &patch.height);
                merge(&mut s.fill, &patch.fill);
                if let Some(gradient) = &patch.gradient {
                    s.gradient = Some(gradient.clone());
                }
                patch.text.is_some() || patch.font_size.is_some() || patch.image_url.is_some()
            }
            LayerKind::Image(i) => {
                merge(&mut i.width, &patch.width);
                merge(&mut i.height, &patch.height);
                merge(&mut i.image_url, &patch.image_url);
                patch.text.is_some() || patch.fill.is_some() || patch.gradient.is_some()
            }
            LayerKind::Drawing(d) => {
                merge(&mut d.path_data, &patch.path_data);
                merge(&mut d.stroke_color, &patch.stroke_color);
                merge(&mut d.stroke_width, &patch.stroke_width);
                patch.text.is_some() || patch.fill.is_some() || patch.width.is_some()
            }
        };

        self.normalize_text_scale();

        if ignored {
            log::debug!(
                "Ignoring fields that do not apply to {} layer {}",
                self.kind.type_name(),
                self.id
            );
        }
    }
}

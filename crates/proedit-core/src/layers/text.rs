//! Text layer payload.

use super::Gradient;
use serde::{Deserialize, Serialize};

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

fn default_line_height() -> f64 {
    1.2
}

/// A text layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextLayer {
    pub text: String,
    /// Font size in pixels.
    pub font_size: f64,
    pub font_family: String,
    pub font_weight: String,
    pub color: String,
    #[serde(default)]
    pub text_align: TextAlign,
    #[serde(default)]
    pub letter_spacing: f64,
    #[serde(default = "default_line_height")]
    pub line_height: f64,
    #[serde(default)]
    pub gradient: Gradient,
}

impl TextLayer {
    pub const DEFAULT_FONT_SIZE: f64 = 48.0;

    /// Letter spacing in thousandths of an em, as expected by the surface.
    pub fn char_spacing(&self) -> f64 {
        (self.letter_spacing * 10.0).round()
    }

    /// Fold a uniform scale factor into the font size.
    ///
    /// The result is rounded and never drops below 1.
    pub fn scaled_font_size(&self, factor: f64) -> f64 {
        (self.font_size * factor).round().max(1.0)
    }
}

impl Default for TextLayer {
    fn default() -> Self {
        Self {
            text: "Double click to edit".to_string(),
            font_size: Self::DEFAULT_FONT_SIZE,
            font_family: "Inter".to_string(),
            font_weight: "bold".to_string(),
            color: "#ffffff".to_string(),
            text_align: TextAlign::Center,
            letter_spacing: 0.0,
            line_height: default_line_height(),
            gradient: Gradient::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaled_font_size() {
        let text = TextLayer::default();
        assert!((text.scaled_font_size(2.0) - 96.0).abs() < f64::EPSILON);
        assert!((text.scaled_font_size(1.01) - 48.0).abs() < f64::EPSILON);
        assert!((text.scaled_font_size(0.001) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_char_spacing() {
        let text = TextLayer {
            letter_spacing: 2.54,
            ..TextLayer::default()
        };
        assert!((text.char_spacing() - 25.0).abs() < f64::EPSILON);
    }
}

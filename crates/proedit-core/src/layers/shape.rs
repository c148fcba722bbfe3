//! Shape layer payload.

use super::Gradient;
use kurbo::{BezPath, Ellipse, Point, Rect, Shape as KurboShape};
use serde::{Deserialize, Serialize};

/// Geometric primitive drawn by a shape layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeType {
    #[default]
    Rectangle,
    Circle,
    Ellipse,
    Triangle,
}

impl ShapeType {
    /// Get display name for UI.
    pub fn label(self) -> &'static str {
        match self {
            ShapeType::Rectangle => "Rectangle",
            ShapeType::Circle => "Circle",
            ShapeType::Ellipse => "Ellipse",
            ShapeType::Triangle => "Triangle",
        }
    }
}

/// A filled geometric shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeLayer {
    pub shape_type: ShapeType,
    pub width: f64,
    pub height: f64,
    pub fill: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gradient: Option<Gradient>,
}

impl ShapeLayer {
    /// Create a shape with default size and fill.
    pub fn new(shape_type: ShapeType) -> Self {
        let (width, height) = match shape_type {
            ShapeType::Circle => (100.0, 100.0),
            _ => (150.0, 100.0),
        };
        Self {
            shape_type,
            width,
            height,
            fill: "#00d4ff".to_string(),
            gradient: Some(Gradient::default()),
        }
    }

    /// Outline in the shape's local box (origin at the top-left corner).
    ///
    /// Circles use `width` as the diameter, as the surface does.
    pub fn to_path(&self) -> BezPath {
        let (w, h) = (self.width.max(0.0), self.height.max(0.0));
        match self.shape_type {
            ShapeType::Rectangle => Rect::new(0.0, 0.0, w, h).to_path(0.1),
            ShapeType::Circle => {
                let r = w / 2.0;
                Ellipse::new(Point::new(r, r), (r, r), 0.0).to_path(0.1)
            }
            ShapeType::Ellipse => {
                Ellipse::new(Point::new(w / 2.0, h / 2.0), (w / 2.0, h / 2.0), 0.0).to_path(0.1)
            }
            ShapeType::Triangle => {
                let mut path = BezPath::new();
                path.move_to(Point::new(w / 2.0, 0.0));
                path.line_to(Point::new(w, h));
                path.line_to(Point::new(0.0, h));
                path.close_path();
                path
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triangle_contains_apex_region() {
        let shape = ShapeLayer::new(ShapeType::Triangle);
        let path = shape.to_path();
        assert!(path.contains(Point::new(75.0, 50.0)));
        assert!(!path.contains(Point::new(5.0, 5.0)));
    }

    #[test]
    fn test_circle_uses_width_as_diameter() {
        let shape = ShapeLayer {
            height: 10.0,
            ..ShapeLayer::new(ShapeType::Circle)
        };
        let bounds = shape.to_path().bounding_box();
        assert!((bounds.width() - 100.0).abs() < 1e-6);
        assert!((bounds.height() - 100.0).abs() < 1e-6);
    }
}

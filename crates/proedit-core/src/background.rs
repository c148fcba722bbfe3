//! Background image placement.

use kurbo::{Affine, Size, Vec2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Policy for fitting a background image into the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundFit {
    /// Whole image visible, letterboxed.
    #[default]
    Contain,
    /// Canvas fully covered, image cropped.
    Cover,
    /// Image scaled to the canvas on each axis independently.
    Stretch,
}

impl fmt::Display for BackgroundFit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BackgroundFit::Contain => "contain",
            BackgroundFit::Cover => "cover",
            BackgroundFit::Stretch => "stretch",
        })
    }
}

/// Where a background image is drawn on the canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub scale_x: f64,
    pub scale_y: f64,
    /// Position of the image's top-left corner.
    pub offset: Vec2,
}

impl Placement {
    /// Image to canvas transform.
    pub fn to_affine(&self) -> Affine {
        Affine::translate(self.offset) * Affine::scale_non_uniform(self.scale_x, self.scale_y)
    }

    /// Size of the placed image on the canvas.
    pub fn scaled_size(&self, image: Size) -> Size {
        Size::new(image.width * self.scale_x, image.height * self.scale_y)
    }
}

/// Compute the placement of an `image`-sized background on a `canvas`.
///
/// Returns `None` for an empty image.
pub fn placement(fit: BackgroundFit, image: Size, canvas: Size) -> Option<Placement> {
    if !(image.width > 0.0 && image.height > 0.0) {
        return None;
    }
    let sx = canvas.width / image.width;
    let sy = canvas.height / image.height;

    let uniform = |scale: f64| Placement {
        scale_x: scale,
        scale_y: scale,
        offset: Vec2::new(
            (canvas.width - image.width * scale) / 2.0,
            (canvas.height - image.height * scale) / 2.0,
        ),
    };

    Some(match fit {
        BackgroundFit::Contain => uniform(sx.min(sy)),
        BackgroundFit::Cover => uniform(sx.max(sy)),
        BackgroundFit::Stretch => Placement {
            scale_x: sx,
            scale_y: sy,
            offset: Vec2::ZERO,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Point;

    const CANVAS: Size = Size::new(1200.0, 800.0);

    #[test]
    fn test_cover() {
        let p = placement(BackgroundFit::Cover, Size::new(2000.0, 1000.0), CANVAS).unwrap();
        assert!((p.scale_x - 0.8).abs() < 1e-9);
        assert!((p.scale_y - 0.8).abs() < 1e-9);
        assert!((p.offset.x + 200.0).abs() < 1e-9);
        assert!(p.offset.y.abs() < 1e-9);
    }

    #[test]
    fn test_contain() {
        let p = placement(BackgroundFit::Contain, Size::new(2000.0, 1000.0), CANVAS).unwrap();
        assert!((p.scale_x - 0.6).abs() < 1e-9);
        assert!(p.offset.x.abs() < 1e-9);
        assert!((p.offset.y - 100.0).abs() < 1e-9);
        let size = p.scaled_size(Size::new(2000.0, 1000.0));
        assert!((size.width - 1200.0).abs() < 1e-9);
    }

    #[test]
    fn test_stretch() {
        let p = placement(BackgroundFit::Stretch, Size::new(600.0, 200.0), CANVAS).unwrap();
        assert!((p.scale_x - 2.0).abs() < 1e-9);
        assert!((p.scale_y - 4.0).abs() < 1e-9);
        assert_eq!(p.offset, Vec2::ZERO);
        let corner = p.to_affine() * Point::new(600.0, 200.0);
        assert!((corner.x - 1200.0).abs() < 1e-9);
        assert!((corner.y - 800.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_image() {
        assert!(placement(BackgroundFit::Cover, Size::ZERO, CANVAS).is_none());
    }

    #[test]
    fn test_fit_serde() {
        assert_eq!(serde_json::to_string(&BackgroundFit::Cover).unwrap(), "\"cover\"");
        let fit: BackgroundFit = serde_json::from_str("\"stretch\"").unwrap();
        assert_eq!(fit, BackgroundFit::Stretch);
    }
}

//! Fill resolution for text and shape layers.
//!
//! A layer stores a plain color plus an optional gradient description. The
//! surface needs a concrete fill in the object's local box, which depends on
//! the rendered size of the object.

use crate::color::{ColorError, Rgba, parse_color};
use crate::layers::{Gradient, GradientType};
use kurbo::{Point, Size};
use thiserror::Error;

/// Extent used for gradients on objects that have not been measured yet.
pub const DEFAULT_GRADIENT_EXTENT: Size = Size::new(100.0, 100.0);

/// One gradient color stop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorStop {
    pub offset: f64,
    pub color: Rgba,
}

/// Concrete fill in an object's local coordinate box.
#[derive(Debug, Clone, PartialEq)]
pub enum Fill {
    Solid(Rgba),
    Linear {
        start: Point,
        end: Point,
        stops: [ColorStop; 2],
    },
    Radial {
        center: Point,
        radius: f64,
        stops: [ColorStop; 2],
    },
}

impl Fill {
    /// Representative flat color (first stop for gradients).
    pub fn base_color(&self) -> Rgba {
        match self {
            Fill::Solid(color) => *color,
            Fill::Linear { stops, .. } | Fill::Radial { stops, .. } => stops[0].color,
        }
    }

    pub fn is_gradient(&self) -> bool {
        !matches!(self, Fill::Solid(_))
    }
}

/// Reasons a gradient could not be built.
#[derive(Debug, Error)]
pub enum FillError {
    #[error("Gradient has no colors")]
    NoColors,
    #[error("Gradient box has zero size: {0:?}")]
    ZeroSize(Size),
    #[error(transparent)]
    Color(#[from] ColorError),
}

/// Resolve the fill for an object.
///
/// `measured` is the object's current rendered size. Gradient failures fall
/// back to the plain color; an unparseable plain color falls back to black.
pub fn resolve_fill(color: &str, gradient: Option<&Gradient>, measured: Option<Size>) -> Fill {
    if let Some(gradient) = gradient.filter(|g| g.enabled) {
        let size = measured.unwrap_or(DEFAULT_GRADIENT_EXTENT);
        match gradient_fill(gradient, size) {
            Ok(fill) => return fill,
            Err(e) => log::debug!("Falling back to solid fill: {e}"),
        }
    }
    Fill::Solid(parse_color(color).unwrap_or_else(|e| {
        log::debug!("Invalid fill color, using black: {e}");
        Rgba::black()
    }))
}

/// Build a two-stop gradient spanning a `size` box.
pub fn gradient_fill(gradient: &Gradient, size: Size) -> Result<Fill, FillError> {
    if !(size.width > 0.0 && size.height > 0.0) {
        return Err(FillError::ZeroSize(size));
    }
    let first = gradient.colors.first().ok_or(FillError::NoColors)?;
    let second = gradient.colors.get(1).unwrap_or(first);
    let stops = [
        ColorStop {
            offset: 0.0,
            color: parse_color(first)?,
        },
        ColorStop {
            offset: 1.0,
            color: parse_color(second)?,
        },
    ];

    Ok(match gradient.kind {
        GradientType::Linear => Fill::Linear {
            start: Point::ZERO,
            end: Point::new(size.width, 0.0),
            stops,
        },
        GradientType::Radial => Fill::Radial {
            center: Point::new(size.width / 2.0, size.height / 2.0),
            radius: size.width.max(size.height) / 2.0,
            stops,
        },
    })
}

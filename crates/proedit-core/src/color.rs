//! Parsing of the CSS-style color strings stored on layers.

use peniko::Color;
use peniko::color::Srgb;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Color parsing errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorError {
    #[error("Empty color string")]
    Empty,
    #[error("Invalid hex color: {0}")]
    InvalidHex(String),
    #[error("Invalid color function: {0}")]
    InvalidFunction(String),
    #[error("Unsupported color: {0}")]
    Unsupported(String),
}

/// Straight-alpha RGBA8 color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub const fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }

    pub const fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// Multiply the alpha channel by `opacity` (clamped to 0..=1).
    pub fn with_opacity(self, opacity: f64) -> Self {
        let alpha = (self.a as f64 * opacity.clamp(0.0, 1.0)).round() as u8;
        Self { a: alpha, ..self }
    }

    /// Format as `#rrggbb`, or `#rrggbbaa` when not fully opaque.
    pub fn to_hex(self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl From<Color> for Rgba {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self::new(rgba.r, rgba.g, rgba.b, rgba.a)
    }
}

impl From<Rgba> for Color {
    fn from(color: Rgba) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

impl std::str::FromStr for Rgba {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_color(s)
    }
}

/// Parse a color string.
///
/// Accepts `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`, `rgb(...)` and `rgba(...)`
/// directly; anything else goes through CSS color parsing.
pub fn parse_color(input: &str) -> Result<Rgba, ColorError> {
    let color = input.trim();
    if color.is_empty() {
        return Err(ColorError::Empty);
    }

    if let Some(hex) = color.strip_prefix('#') {
        return parse_hex(hex);
    }

    let lower = color.to_ascii_lowercase();
    if let Some(args) = lower
        .strip_prefix("rgba(")
        .or_else(|| lower.strip_prefix("rgb("))
    {
        return parse_rgb_function(args, color);
    }

    // Named colors, hsl() and the rest of CSS Color 4.
    peniko::color::parse_color(&lower)
        .map(|parsed| Rgba::from(parsed.to_alpha_color::<Srgb>()))
        .map_err(|_| ColorError::Unsupported(color.to_string()))
}

fn parse_hex(hex: &str) -> Result<Rgba, ColorError> {
    let invalid = || ColorError::InvalidHex(format!("#{hex}"));
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    // All-ASCII from here on, so byte slicing is safe.
    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).map(|v| v * 17);
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16);

    let parsed = match hex.len() {
        3 => (nibble(0), nibble(1), nibble(2), Ok(255)),
        4 => (nibble(0), nibble(1), nibble(2), nibble(3)),
        6 => (byte(0), byte(2), byte(4), Ok(255)),
        8 => (byte(0), byte(2), byte(4), byte(6)),
        _ => return Err(invalid()),
    };

    match parsed {
        (Ok(r), Ok(g), Ok(b), Ok(a)) => Ok(Rgba::new(r, g, b, a)),
        _ => Err(invalid()),
    }
}

fn parse_rgb_function(args: &str, original: &str) -> Result<Rgba, ColorError> {
    let invalid = || ColorError::InvalidFunction(original.to_string());
    let body = args.strip_suffix(')').ok_or_else(invalid)?;
    let parts: Vec<&str> = body.split(',').map(str::trim).collect();
    if parts.len() != 3 && parts.len() != 4 {
        return Err(invalid());
    }

    let channel = |s: &str| -> Result<u8, ColorError> {
        let value: f64 = s.parse().map_err(|_| invalid())?;
        if !(0.0..=255.0).contains(&value) {
            return Err(invalid());
        }
        Ok(value.round() as u8)
    };

    let r = channel(parts[0])?;
    let g = channel(parts[1])?;
    let b = channel(parts[2])?;
    let a = match parts.get(3) {
        Some(alpha) => {
            let value: f64 = alpha.parse().map_err(|_| invalid())?;
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid());
            }
            (value * 255.0).round() as u8
        }
        None => 255,
    };
    Ok(Rgba::new(r, g, b, a))
}

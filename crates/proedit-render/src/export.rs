//! Image export of the composed canvas.

use crate::surface::{PixelBuffer, Surface};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Quality used for JPEG export.
pub const JPEG_QUALITY: u8 = 92;

/// Export file formats offered to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Png,
    Jpeg,
    /// Listed in the format picker but not implemented.
    Svg,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpeg => "jpg",
            ExportFormat::Svg => "svg",
        }
    }

    /// Guess the format from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(ExportFormat::Png),
            "jpg" | "jpeg" => Some(ExportFormat::Jpeg),
            "svg" => Some(ExportFormat::Svg),
            _ => None,
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExportFormat::Png => "PNG",
            ExportFormat::Jpeg => "JPEG",
            ExportFormat::Svg => "SVG",
        })
    }
}

/// Export errors.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("{0} export is not supported")]
    UnsupportedFormat(ExportFormat),
    #[error("Pixel buffer does not match its dimensions")]
    InvalidBuffer,
    #[error("Surface has no pixels to read")]
    NoPixels,
    #[error("PNG encoding failed: {0}")]
    Png(#[from] png::EncodingError),
    #[error("JPEG encoding failed: {0}")]
    Jpeg(#[from] image::ImageError),
}

/// Result of an export request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// Encoded file bytes.
    Exported(Vec<u8>),
    /// There was no surface to export; nothing happened.
    NoSurface,
}

/// Encode the current surface contents.
pub fn export(surface: Option<&dyn Surface>, format: ExportFormat) -> Result<ExportOutcome, ExportError> {
    let Some(surface) = surface else {
        log::warn!("Nothing to export: canvas is not ready");
        return Ok(ExportOutcome::NoSurface);
    };
    let encode: fn(&PixelBuffer) -> Result<Vec<u8>, ExportError> = match format {
        ExportFormat::Png => encode_png,
        ExportFormat::Jpeg => |pixels| encode_jpeg(pixels, JPEG_QUALITY),
        ExportFormat::Svg => return Err(ExportError::UnsupportedFormat(format)),
    };
    let pixels = surface.read_pixels().ok_or(ExportError::NoPixels)?;
    let bytes = encode(&pixels)?;
    log::info!(
        "Exported {}x{} canvas as {} ({} bytes)",
        pixels.width,
        pixels.height,
        format,
        bytes.len()
    );
    Ok(ExportOutcome::Exported(bytes))
}

/// Encode RGBA pixels as PNG.
pub fn encode_png(pixels: &PixelBuffer) -> Result<Vec<u8>, ExportError> {
    if !pixels.is_valid() {
        return Err(ExportError::InvalidBuffer);
    }
    let mut png_data = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut png_data, pixels.width, pixels.height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&pixels.data)?;
        writer.finish()?;
    }
    Ok(png_data)
}

/// Encode RGBA pixels as JPEG, flattening transparency onto black.
pub fn encode_jpeg(pixels: &PixelBuffer, quality: u8) -> Result<Vec<u8>, ExportError> {
    if !pixels.is_valid() {
        return Err(ExportError::InvalidBuffer);
    }
    let rgb: Vec<u8> = pixels
        .data
        .chunks_exact(4)
        .flat_map(|px| {
            let alpha = px[3] as u16;
            [0, 1, 2].map(|c| ((px[c] as u16 * alpha + 127) / 255) as u8)
        })
        .collect();
    let mut out = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, quality).encode(
        &rgb,
        pixels.width,
        pixels.height,
        image::ExtendedColorType::Rgb8,
    )?;
    Ok(out)
}

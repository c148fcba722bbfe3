//! Asynchronous image-asset loading.
//!
//! Loads are requested without blocking and completed later through
//! [`ImageLoader::poll`]. The synchronizer decides what to do with each
//! completion; a loader never touches the surface.

use crate::data_url;
use proedit_core::LayerId;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Image loading errors.
#[derive(Debug, Error)]
pub enum ImageLoadError {
    #[error("Unsupported image URL: {0}")]
    UnsupportedUrl(String),
    #[error("Invalid data URL")]
    InvalidDataUrl,
    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Decoded RGBA8 pixels (straight alpha).
#[derive(Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Arc<[u8]>,
}

impl DecodedImage {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels: pixels.into(),
        }
    }

    /// Natural size in pixels.
    pub fn size(&self) -> kurbo::Size {
        kurbo::Size::new(self.width as f64, self.height as f64)
    }

    /// RGBA of the pixel at (x, y), if in range.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y * self.width + x) * 4) as usize;
        let px = self.pixels.get(i..i + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

impl fmt::Debug for DecodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

/// Decode PNG, JPEG or WebP bytes.
pub fn decode_image(bytes: &[u8]) -> Result<DecodedImage, ImageLoadError> {
    let rgba = image::load_from_memory(bytes)?.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(DecodedImage::new(width, height, rgba.into_raw()))
}

/// What an image load is for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ImageKey {
    Layer(LayerId),
    Background,
}

/// A finished load.
#[derive(Debug)]
pub struct ImageCompletion {
    pub key: ImageKey,
    /// URL that was requested; used to detect stale completions.
    pub url: String,
    pub result: Result<DecodedImage, ImageLoadError>,
}

/// Source of decoded images.
pub trait ImageLoader {
    /// Start loading `url`. Never blocks.
    fn request(&mut self, key: ImageKey, url: &str);

    /// Collect loads that finished since the last poll.
    fn poll(&mut self) -> Vec<ImageCompletion>;

    /// Number of requests not yet delivered.
    fn pending(&self) -> usize;
}

/// Loader for embedded `data:` URLs.
///
/// Decoding is deferred to [`poll`](ImageLoader::poll), so callers observe
/// the same request/complete split as with a network loader. Remote URLs
/// complete with [`ImageLoadError::UnsupportedUrl`].
#[derive(Debug, Default)]
pub struct DataUrlLoader {
    queue: VecDeque<(ImageKey, String)>,
}

impl DataUrlLoader {
    pub fn new() -> Self {
        Self::default()
    }

    fn load(url: &str) -> Result<DecodedImage, ImageLoadError> {
        if !url.starts_with("data:") {
            return Err(ImageLoadError::UnsupportedUrl(url.to_string()));
        }
        let data = data_url::decode(url)?;
        decode_image(&data.bytes)
    }
}

impl ImageLoader for DataUrlLoader {
    fn request(&mut self, key: ImageKey, url: &str) {
        log::debug!("Queued image load for {:?}", key);
        self.queue.push_back((key, url.to_string()));
    }

    fn poll(&mut self) -> Vec<ImageCompletion> {
        self.queue
            .drain(..)
            .map(|(key, url)| {
                let result = Self::load(&url);
                if let Err(e) = &result {
                    log::warn!("Image load for {:?} failed: {}", key, e);
                }
                ImageCompletion { key, url, result }
            })
            .collect()
    }

    fn pending(&self) -> usize {
        self.queue.len()
    }
}

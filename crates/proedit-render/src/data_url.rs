//! `data:` URL encoding for embedded images.

use crate::loader::ImageLoadError;
use base64::{Engine, engine::general_purpose::STANDARD};

/// A decoded `data:` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Encode file bytes as a base64 `data:` URL.
pub fn encode(bytes: &[u8], mime: &str) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Decode a base64 `data:` URL.
pub fn decode(url: &str) -> Result<DataUrl, ImageLoadError> {
    let rest = url.strip_prefix("data:").ok_or(ImageLoadError::InvalidDataUrl)?;
    let (header, payload) = rest.split_once(',').ok_or(ImageLoadError::InvalidDataUrl)?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or(ImageLoadError::InvalidDataUrl)?;
    let bytes = STANDARD.decode(payload.trim())?;
    Ok(DataUrl {
        mime: mime.to_string(),
        bytes,
    })
}

/// Guess a MIME type from a file extension.
pub fn mime_for_extension(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

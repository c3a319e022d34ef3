//! Core types for image generation.

use crate::error::{Result, WallGenError};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// PNG format (lossless).
    #[default]
    Png,
    /// JPEG format (lossy).
    Jpeg,
    /// WebP format (modern, efficient).
    WebP,
}

impl ImageFormat {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
        }
    }

    /// Returns the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
        }
    }

    /// Maps a MIME type reported by the service to a format.
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        match mime.to_ascii_lowercase().as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Detects image format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 12 {
            return None;
        }

        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }

        // WebP: RIFF....WEBP
        if data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }

        None
    }
}

/// Output resolution tier.
///
/// Only the two tiers that hold up under four parallel requests are offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum ImageSize {
    /// About 1024px on the long edge.
    #[default]
    #[serde(rename = "1K")]
    OneK,
    /// About 2048px on the long edge.
    #[serde(rename = "2K")]
    TwoK,
}

impl ImageSize {
    /// The smallest tier. Remixes always use it.
    pub const SMALLEST: Self = Self::OneK;

    /// Returns the tier as sent on the wire (e.g., "1K").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneK => "1K",
            Self::TwoK => "2K",
        }
    }
}

impl std::fmt::Display for ImageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageSize {
    type Err = WallGenError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "1K" => Ok(Self::OneK),
            "2K" => Ok(Self::TwoK),
            other => Err(WallGenError::InvalidRequest(format!(
                "unknown image size '{other}', expected 1K or 2K"
            ))),
        }
    }
}

/// Metadata about the generation process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationMetadata {
    /// Model used for generation.
    pub model: Option<String>,
    /// Generation duration in milliseconds.
    pub duration_ms: Option<u64>,
}

/// A single request to the image service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The text sent to the model.
    pub prompt: String,
    /// Output resolution tier.
    pub size: ImageSize,
    /// Reference image to derive a variation from (raw bytes).
    #[serde(skip)]
    pub reference_image: Option<Vec<u8>>,
}

impl GenerationRequest {
    /// Creates a 1K request with the given prompt.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            size: ImageSize::default(),
            reference_image: None,
        }
    }

    /// Sets the resolution tier.
    pub fn with_size(mut self, size: ImageSize) -> Self {
        self.size = size;
        self
    }

    /// Sets a reference image for a variation.
    pub fn with_reference_image(mut self, image: Vec<u8>) -> Self {
        self.reference_image = Some(image);
        self
    }

    /// Returns true if this request derives from a reference image.
    pub fn is_remix(&self) -> bool {
        self.reference_image.is_some()
    }
}

/// A generated image with its data and metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "generated image should be stored or saved"]
pub struct GeneratedImage {
    /// Raw image bytes.
    pub data: Vec<u8>,
    /// Image format.
    pub format: ImageFormat,
    /// Generation metadata.
    pub metadata: GenerationMetadata,
}

impl GeneratedImage {
    /// Creates a new generated image.
    pub fn new(data: Vec<u8>, format: ImageFormat, metadata: GenerationMetadata) -> Self {
        Self {
            data,
            format,
            metadata,
        }
    }

    /// Wraps image bytes read from elsewhere, detecting format from magic bytes.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let format = ImageFormat::from_magic_bytes(&data)
            .ok_or_else(|| WallGenError::Decode("unknown image format".into()))?;
        Ok(Self::new(data, format, GenerationMetadata::default()))
    }

    /// Decodes a `data:image/...;base64,` URL or a bare base64 string.
    pub fn from_data_url(url: &str) -> Result<Self> {
        let data = decode_base64_lenient(url).map_err(|e| WallGenError::Decode(e.to_string()))?;
        Self::from_bytes(data)
    }

    /// Returns the size of the image data in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Saves the image to the specified path.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, &self.data)?;
        Ok(())
    }

    /// Encodes the image data as base64.
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }

    /// Returns the image as a data URL.
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.format.mime_type(),
            self.to_base64()
        )
    }
}

/// Decodes base64 that may carry a data URL prefix, whitespace or no padding.
pub(crate) fn decode_base64_lenient(input: &str) -> std::result::Result<Vec<u8>, base64::DecodeError> {
    let b64 = match input.find(";base64,") {
        Some(pos) => &input[pos + 8..],
        None => input,
    };

    let cleaned: String = b64.chars().filter(|c| !c.is_ascii_whitespace()).collect();

    if let Ok(data) = base64::engine::general_purpose::STANDARD.decode(&cleaned) {
        return Ok(data);
    }

    base64::engine::general_purpose::STANDARD_NO_PAD.decode(&cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: [u8; 12] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
    const JPEG_MAGIC: [u8; 12] = [0xFF, 0xD8, 0xFF, 0xE0, 0, 0, 0, 0, 0, 0, 0, 0];
    const WEBP_MAGIC: [u8; 12] = *b"RIFF\x00\x00\x00\x00WEBP";

    #[test]
    fn test_format_from_magic_bytes() {
        assert_eq!(
            ImageFormat::from_magic_bytes(&PNG_MAGIC),
            Some(ImageFormat::Png)
        );
        assert_eq!(
            ImageFormat::from_magic_bytes(&JPEG_MAGIC),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(
            ImageFormat::from_magic_bytes(&WEBP_MAGIC),
            Some(ImageFormat::WebP)
        );
        assert_eq!(ImageFormat::from_magic_bytes(b"short"), None);
    }

    #[test]
    fn test_format_from_mime_type() {
        assert_eq!(ImageFormat::from_mime_type("image/png"), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::from_mime_type("IMAGE/JPEG"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_mime_type("image/gif"), None);
    }

    #[test]
    fn test_image_size_parsing() {
        assert_eq!("1K".parse::<ImageSize>().unwrap(), ImageSize::OneK);
        assert_eq!(" 2k ".parse::<ImageSize>().unwrap(), ImageSize::TwoK);
        assert!("4K".parse::<ImageSize>().is_err());
        assert_eq!(ImageSize::SMALLEST, ImageSize::OneK);
        assert!(ImageSize::OneK < ImageSize::TwoK);
    }

    #[test]
    fn test_image_size_serializes_as_tier_name() {
        assert_eq!(serde_json::to_value(ImageSize::TwoK).unwrap(), "2K");
    }

    #[test]
    fn test_request_defaults() {
        let req = GenerationRequest::new("rainy city at night");
        assert_eq!(req.size, ImageSize::OneK);
        assert!(!req.is_remix());

        let req = req.with_reference_image(PNG_MAGIC.to_vec());
        assert!(req.is_remix());
    }

    #[test]
    fn test_data_url_round_trip() {
        let image = GeneratedImage::from_bytes(PNG_MAGIC.to_vec()).unwrap();
        let url = image.to_data_url();
        assert!(url.starts_with("data:image/png;base64,"));

        let decoded = GeneratedImage::from_data_url(&url).unwrap();
        assert_eq!(decoded.data, PNG_MAGIC.to_vec());
        assert_eq!(decoded.format, ImageFormat::Png);
    }

    #[test]
    fn test_decode_lenient_handles_whitespace_and_missing_padding() {
        // "hello" is "aGVsbG8=" in padded base64.
        assert_eq!(decode_base64_lenient("aGVs\nbG8=").unwrap(), b"hello");
        assert_eq!(decode_base64_lenient("aGVsbG8").unwrap(), b"hello");
        assert_eq!(
            decode_base64_lenient("data:image/png;base64,aGVsbG8=").unwrap(),
            b"hello"
        );
    }

    #[test]
    fn test_from_bytes_rejects_unknown_format() {
        assert!(GeneratedImage::from_bytes(vec![0u8; 16]).is_err());
    }
}

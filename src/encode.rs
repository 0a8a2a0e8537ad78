//! Raster encoding: pixel buffers to PNG/JPEG bytes and data URLs.
//!
//! Encoding is deterministic: the same pixels always produce the same
//! bytes. The two delivery flavors differ only in the declared MIME type.
//! Downloads remap to `image/octet-stream` so user agents save instead of
//! display, while clipboard payloads keep the real image type.

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbaImage};
use thiserror::Error;

/// JPEG quality for exports, matching typical canvas encoder output.
const JPEG_QUALITY: u8 = 92;

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("{format} encoding failed: {source}")]
    Encoder {
        format: RasterFormat,
        source: image::ImageError,
    },
}

// ============================================================================
// Raster Format
// ============================================================================

/// The raster output formats an icon can be exported to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RasterFormat {
    #[default]
    Png,
    Jpg,
}

impl RasterFormat {
    /// File extension used in download names (`{slug}.{ext}`).
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpg => "jpg",
        }
    }

    /// The real MIME type of the encoded bytes.
    pub fn mime(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpg => "image/jpeg",
        }
    }
}

impl core::fmt::Display for RasterFormat {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.extension())
    }
}

// ============================================================================
// Encoding
// ============================================================================

/// Encodes an RGBA image to the requested raster format.
///
/// JPEG has no alpha channel; fully transparent pixels come out black, the
/// same way a transparent canvas exports to JPEG.
pub fn encode_raster(image: &RgbaImage, format: RasterFormat) -> Result<Vec<u8>, EncodeError> {
    let mut bytes = Vec::new();
    match format {
        RasterFormat::Png => {
            image
                .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
                .map_err(|source| EncodeError::Encoder { format, source })?;
        }
        RasterFormat::Jpg => {
            let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
            let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut bytes), JPEG_QUALITY);
            rgb.write_with_encoder(encoder)
                .map_err(|source| EncodeError::Encoder { format, source })?;
        }
    }
    Ok(bytes)
}

/// Builds a `data:` URL for the given bytes with the declared MIME type.
pub fn to_data_url(bytes: &[u8], mime: &str) -> String {
    format!("data:{};base64,{}", mime, BASE64.encode(bytes))
}

/// Builds a download-flavored data URL.
///
/// The MIME prefix is remapped to `image/octet-stream` so user agents
/// trigger a save dialog instead of rendering the image inline. Clipboard
/// flows use [`to_data_url`] with the original type instead.
pub fn to_download_data_url(bytes: &[u8]) -> String {
    to_data_url(bytes, "image/octet-stream")
}

// ============================================================================
// Tests
// ============================================================================

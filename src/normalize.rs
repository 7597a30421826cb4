//! Background image normalization.
//!
//! User uploads can be arbitrarily large. Before an upload is persisted as a
//! setting it is downsampled to a maximum width and re-encoded into a
//! compact `data:` URL the client can display directly.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::webp::WebPEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ExtendedColorType, ImageEncoder, RgbaImage};

use crate::data_url::DataUrl;
use crate::error::NormalizeError;
use crate::geometry::SizePx;

/// Default encoder quality in (0, 1].
pub const DEFAULT_QUALITY: f32 = 0.825;

/// Default maximum output width in pixels.
pub const DEFAULT_MAX_WIDTH: u32 = 3240;

// ============================================================================
// Options
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizeOptions {
    /// Encoder quality in (0, 1]. Only the JPEG encoder is lossy.
    pub quality: f32,
    /// Images wider than this are scaled down uniformly.
    pub max_width: u32,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            quality: DEFAULT_QUALITY,
            max_width: DEFAULT_MAX_WIDTH,
        }
    }
}

impl NormalizeOptions {
    fn validate(&self) -> Result<(), NormalizeError> {
        if !(self.quality > 0.0 && self.quality <= 1.0) {
            return Err(NormalizeError::InvalidOptions(format!(
                "quality must be in (0, 1], got {}",
                self.quality
            )));
        }
        if self.max_width == 0 {
            return Err(NormalizeError::InvalidOptions(
                "max_width must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// JPEG quality on the encoder's 1-100 scale.
    fn jpeg_quality(&self) -> u8 {
        (self.quality * 100.0).round().clamp(1.0, 100.0) as u8
    }
}

// ============================================================================
// Platform
// ============================================================================

/// Output format for a normalized image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeFormat {
    Jpeg,
    WebP,
}

impl EncodeFormat {
    /// MIME type used in the data URL.
    pub fn mime(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
        }
    }
}

/// The client that will display the stored image.
///
/// Safari-family engines lack dependable WebP support, so they get JPEG.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Platform {
    user_agent: String,
}

impl Platform {
    /// Identifies a client by its `User-Agent` header.
    pub fn from_user_agent(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
        }
    }

    /// The raw user agent string.
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// True if the user agent mentions Safari but neither Chrome nor Edge
    /// (both of which also carry a `Safari` token).
    pub fn is_safari(&self) -> bool {
        let ua = self.user_agent.to_ascii_lowercase();
        ua.contains("safari") && !ua.contains("chrome") && !ua.contains("edge")
    }

    /// JPEG for Safari-family clients, WebP for everyone else.
    pub fn preferred_format(&self) -> EncodeFormat {
        if self.is_safari() {
            EncodeFormat::Jpeg
        } else {
            EncodeFormat::WebP
        }
    }
}

// ============================================================================
// Normalization
// ============================================================================

/// Computes the output size for an image bounded by `max_width`.
///
/// Never upscales. When scaling, the width is exactly `max_width` and the
/// height keeps the aspect ratio (rounded, at least 1px).
pub fn scaled_size(size: SizePx, max_width: u32) -> SizePx {
    if size.width <= max_width {
        return size;
    }
    let factor = max_width as f64 / size.width as f64;
    let height = ((size.height as f64 * factor).round() as u32).max(1);
    SizePx::new(max_width, height)
}

/// Decodes, downsamples and re-encodes an uploaded image as a `data:` URL.
///
/// ```
/// use codeshot_renderer::{compress_image, NormalizeOptions, Platform};
///
/// let mut png = Vec::new();
/// image::RgbaImage::new(8, 4)
///     .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
///     .unwrap();
///
/// let safari = Platform::from_user_agent("Mozilla/5.0 (Macintosh) Version/17.0 Safari/605.1.15");
/// let url = compress_image(&png, &safari, &NormalizeOptions::default()).unwrap();
/// assert_eq!(url.mime(), "image/jpeg");
/// ```
pub fn compress_image(
    bytes: &[u8],
    platform: &Platform,
    options: &NormalizeOptions,
) -> Result<DataUrl, NormalizeError> {
    options.validate()?;

    let decoded = image::load_from_memory(bytes).map_err(NormalizeError::Decode)?;
    let original = SizePx::new(decoded.width(), decoded.height());
    let target = scaled_size(original, options.max_width);

    let surface = if target == original {
        decoded.to_rgba8()
    } else {
        imageops::resize(&decoded.to_rgba8(), target.width, target.height, FilterType::Triangle)
    };

    let format = platform.preferred_format();
    let encoded = encode_surface(&surface, format, options)?;
    log::info!(
        "normalized background {}x{} -> {}x{} as {} ({} bytes)",
        original.width,
        original.height,
        target.width,
        target.height,
        format.mime(),
        encoded.len()
    );

    Ok(DataUrl::encode(format.mime(), &encoded))
}

fn encode_surface(
    surface: &RgbaImage,
    format: EncodeFormat,
    options: &NormalizeOptions,
) -> Result<Vec<u8>, NormalizeError> {
    let mut out = Cursor::new(Vec::new());
    let (width, height) = surface.dimensions();

    match format {
        EncodeFormat::Jpeg => {
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgba8(surface.clone()).to_rgb8();
            JpegEncoder::new_with_quality(&mut out, options.jpeg_quality())
                .write_image(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
                .map_err(NormalizeError::Encode)?;
        }
        EncodeFormat::WebP => {
            WebPEncoder::new_lossless(&mut out)
                .write_image(surface.as_raw(), width, height, ExtendedColorType::Rgba8)
                .map_err(NormalizeError::Encode)?;
        }
    }

    Ok(out.into_inner())
}

//! The rounded code panel: swatch fill plus a blurred, translucent copy of
//! the background.

use image::RgbaImage;
use image::imageops::{self, FilterType};
use palette::Srgb;

use super::backdrop::{BackgroundPixels, cover_fit};
use super::svg::{composite_over, fade};
use super::{DependencyVersion, LayerConfig, LayerEffect, LayerVersions, RenderContext};
use crate::composition::PANEL_RADIUS;
use crate::geometry::RectPx;
use crate::settings::MAX_BLUR;

/// Largest blur sigma applied at full resolution; beyond it the background
/// is blurred at a reduced size.
const MAX_DIRECT_SIGMA: f32 = 4.0;

// ============================================================================
// PanelConfig
// ============================================================================

/// Configuration for the code panel.
///
/// # Consumed Properties
///
/// - [`BackgroundPixels`]: the backdrop's image. Without it the panel is a
///   plain swatch fill.
#[derive(Debug, Clone)]
pub struct PanelConfig {
    /// Theme background color.
    pub swatch: Srgb<u8>,
    /// Blur radius in CSS pixels, at most [`MAX_BLUR`].
    pub blur: u32,
    /// Opacity of the swatch over the background, 0 to 1.
    pub opacity: f32,
}

impl PanelConfig {
    pub fn new(swatch: Srgb<u8>, blur: u32, opacity: f32) -> Self {
        Self {
            swatch,
            blur: blur.min(MAX_BLUR),
            opacity: opacity.clamp(0.0, 1.0),
        }
    }
}

impl LayerConfig for PanelConfig {
    fn differs_from(&self, other: &Self) -> bool {
        self.swatch != other.swatch
            || self.blur != other.blur
            || (self.opacity - other.opacity).abs() > 0.0001
    }
}

impl LayerEffect for PanelConfig {
    /// The panel consumes the backdrop's pixels and draws over its output.
    fn dependencies(versions: &LayerVersions) -> DependencyVersion {
        DependencyVersion::from_version(versions.backdrop)
    }

    fn transform(&self, ctx: &mut RenderContext<'_>) {
        let scale = ctx.scale;
        let panel = ctx.composition.panel.scaled(scale);
        if panel.width == 0 || panel.height == 0 {
            return;
        }

        let [r, g, b] = [self.swatch.red, self.swatch.green, self.swatch.blue];
        let mut surface = RgbaImage::from_pixel(panel.width, panel.height, image::Rgba([r, g, b, 255]));

        if let Some(background) = ctx.get::<BackgroundPixels>().cloned() {
            let target = ctx.composition.panel_box();
            let sigma = self.blur as f32 * scale;
            if let Some((mut blurred, x, y)) =
                blurred_background(&background, target, scale, panel, sigma)
            {
                fade(&mut blurred, 1.0 - self.opacity);
                composite_over(&mut surface, &blurred, x - panel.x, y - panel.y);
            }
        }

        mask_rounded(&mut surface, PANEL_RADIUS * scale);
        composite_over(&mut ctx.image, &surface, panel.x, panel.y);
    }
}

/// The background as seen through the panel, blurred by `sigma` device px.
fn blurred_background(
    background: &BackgroundPixels,
    target: RectPx,
    scale: f32,
    panel: RectPx,
    sigma: f32,
) -> Option<(RgbaImage, i32, i32)> {
    // Pull in pixels from around the panel so the blur has something to mix
    let margin = (sigma * 3.0).ceil() as i32;
    let clip = RectPx::new(
        panel.x.saturating_sub(margin),
        panel.y.saturating_sub(margin),
        panel.width.saturating_add(margin.unsigned_abs().saturating_mul(2)),
        panel.height.saturating_add(margin.unsigned_abs().saturating_mul(2)),
    );
    let (fitted, x, y) = cover_fit(&background.image, target, background.zoom, scale, clip)?;
    if sigma <= 0.0 {
        return Some((fitted, x, y));
    }
    Some((gaussian_blur(&fitted, sigma), x, y))
}

/// Gaussian blur that downsamples first when the kernel would be large.
fn gaussian_blur(img: &RgbaImage, sigma: f32) -> RgbaImage {
    let (width, height) = img.dimensions();
    let reduction = (sigma / MAX_DIRECT_SIGMA).max(1.0);
    if reduction <= 1.0 {
        return imageops::blur(img, sigma);
    }

    let small_w = ((width as f32 / reduction).round() as u32).max(1);
    let small_h = ((height as f32 / reduction).round() as u32).max(1);
    let small = imageops::resize(img, small_w, small_h, FilterType::Triangle);
    let blurred = imageops::blur(&small, sigma / reduction);
    imageops::resize(&blurred, width, height, FilterType::Triangle)
}

/// Multiplies alpha by the coverage of a rounded rectangle filling the image.
fn mask_rounded(img: &mut RgbaImage, radius: f32) {
    let (width, height) = (img.width() as f32, img.height() as f32);
    let radius = radius.min(width / 2.0).min(height / 2.0);
    if radius <= 0.0 {
        return;
    }

    for (x, y, pixel) in img.enumerate_pixels_mut() {
        let coverage = rounded_rect_coverage(x as f32 + 0.5, y as f32 + 0.5, width, height, radius);
        if coverage < 1.0 {
            pixel[3] = (pixel[3] as f32 * coverage).round() as u8;
        }
    }
}

fn rounded_rect_coverage(px: f32, py: f32, width: f32, height: f32, radius: f32) -> f32 {
    let qx = (px - width / 2.0).abs() - (width / 2.0 - radius);
    let qy = (py - height / 2.0).abs() - (height / 2.0 - radius);
    let outside = qx.max(0.0).hypot(qy.max(0.0)) + qx.max(qy).min(0.0) - radius;
    (0.5 - outside).clamp(0.0, 1.0)
}

//! Sharp background behind the whole frame.

use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::{Arc, LazyLock};

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use super::svg::{composite_over, render_svg};
use super::{DependencyVersion, LayerConfig, LayerEffect, LayerVersions, RenderContext};
use crate::data_url::DataUrl;
use crate::error::DataUrlError;
use crate::geometry::RectPx;

const BUILTIN_BACKGROUND_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="1600" height="1000" viewBox="0 0 1600 1000">
<defs>
<linearGradient id="base" x1="0" y1="0" x2="1" y2="1">
<stop offset="0" stop-color="#0f172a"/>
<stop offset="0.55" stop-color="#312e81"/>
<stop offset="1" stop-color="#831843"/>
</linearGradient>
<radialGradient id="glow-a" cx="0.25" cy="0.3" r="0.45">
<stop offset="0" stop-color="#38bdf8" stop-opacity="0.75"/>
<stop offset="1" stop-color="#38bdf8" stop-opacity="0"/>
</radialGradient>
<radialGradient id="glow-b" cx="0.8" cy="0.75" r="0.5">
<stop offset="0" stop-color="#f472b6" stop-opacity="0.6"/>
<stop offset="1" stop-color="#f472b6" stop-opacity="0"/>
</radialGradient>
</defs>
<rect width="1600" height="1000" fill="url(#base)"/>
<rect width="1600" height="1000" fill="url(#glow-a)"/>
<rect width="1600" height="1000" fill="url(#glow-b)"/>
</svg>"##;

static BUILTIN_BACKGROUND: LazyLock<Arc<RgbaImage>> = LazyLock::new(|| {
    let image = render_svg(BUILTIN_BACKGROUND_SVG, 1.0).unwrap_or_else(|| {
        log::warn!("built-in background did not render, using a flat fill");
        RgbaImage::from_pixel(1, 1, Rgba([0x31, 0x2e, 0x81, 0xff]))
    });
    Arc::new(image)
});

// ============================================================================
// BackgroundImage
// ============================================================================

/// Decoded background pixels with a stable identity for change detection.
#[derive(Debug, Clone)]
pub struct BackgroundImage {
    id: u64,
    pixels: Arc<RgbaImage>,
}

impl BackgroundImage {
    /// The image shown while no background has been uploaded.
    pub fn builtin() -> Self {
        Self {
            id: 0,
            pixels: BUILTIN_BACKGROUND.clone(),
        }
    }

    pub fn from_data_url(url: &DataUrl) -> Result<Self, DataUrlError> {
        let pixels = url.decode_image()?;
        let mut hasher = DefaultHasher::new();
        url.as_str().hash(&mut hasher);
        Ok(Self {
            // 0 is reserved for the built-in image
            id: hasher.finish().max(1),
            pixels: Arc::new(pixels),
        })
    }

    pub fn is_builtin(&self) -> bool {
        self.id == 0
    }

    pub fn pixels(&self) -> &Arc<RgbaImage> {
        &self.pixels
    }
}

// ============================================================================
// BackdropConfig
// ============================================================================

/// Emitted by the backdrop so the panel can reuse the decoded background.
#[derive(Debug, Clone)]
pub struct BackgroundPixels {
    pub image: Arc<RgbaImage>,
    pub zoom: f32,
}

/// Configuration for the backdrop.
///
/// The background is cover-fitted into a fixed-width box centered on the
/// frame, then the box is zoomed around its center.
///
/// # Emitted Properties
///
/// - [`BackgroundPixels`]: the decoded image and zoom, for the panel layer.
#[derive(Debug, Clone)]
pub struct BackdropConfig {
    pub background: BackgroundImage,
    pub zoom: f32,
}

impl BackdropConfig {
    pub fn new(background: BackgroundImage, zoom: f32) -> Self {
        Self {
            background,
            zoom: zoom.max(0.0),
        }
    }
}

impl LayerConfig for BackdropConfig {
    fn differs_from(&self, other: &Self) -> bool {
        self.background.id != other.background.id || (self.zoom - other.zoom).abs() > 0.0001
    }
}

impl LayerEffect for BackdropConfig {
    fn dependencies(_versions: &LayerVersions) -> DependencyVersion {
        DependencyVersion::NONE
    }

    fn transform(&self, ctx: &mut RenderContext<'_>) {
        let clip = RectPx::new(0, 0, ctx.image.width(), ctx.image.height());
        let target = ctx.composition.backdrop_box();
        if let Some((fitted, x, y)) =
            cover_fit(&self.background.pixels, target, self.zoom, ctx.scale, clip)
        {
            composite_over(&mut ctx.image, &fitted, x, y);
        }
    }

    fn emit(&self, ctx: &mut RenderContext<'_>) {
        ctx.set(BackgroundPixels {
            image: self.background.pixels.clone(),
            zoom: self.zoom,
        });
    }
}

// ============================================================================
// Cover Fit
// ============================================================================

/// Scales `src` to cover `target` (CSS px) zoomed by `zoom` around its
/// center, at device `scale`, and returns the part visible inside `clip`
/// (device px) together with its device position.
pub(super) fn cover_fit(
    src: &RgbaImage,
    target: RectPx,
    zoom: f32,
    scale: f32,
    clip: RectPx,
) -> Option<(RgbaImage, i32, i32)> {
    if src.width() == 0 || src.height() == 0 {
        return None;
    }

    let box_w = target.width as f32 * scale * zoom;
    let box_h = target.height as f32 * scale * zoom;
    let (cx, cy) = target.center();
    let (cx, cy) = (cx * scale, cy * scale);

    let factor = (box_w / src.width() as f32).max(box_h / src.height() as f32);
    if !factor.is_finite() || factor <= 0.0 {
        return None;
    }
    let draw_x = cx - src.width() as f32 * factor / 2.0;
    let draw_y = cy - src.height() as f32 * factor / 2.0;

    // Visible part: the box, the clip, and the drawn image all overlap here
    let x0 = (cx - box_w / 2.0).max(clip.x as f32).max(draw_x).floor();
    let y0 = (cy - box_h / 2.0).max(clip.y as f32).max(draw_y).floor();
    let x1 = (cx + box_w / 2.0).min(clip.right() as f32).ceil();
    let y1 = (cy + box_h / 2.0).min(clip.bottom() as f32).ceil();
    if x1 <= x0 || y1 <= y0 {
        return None;
    }

    let to_src_x = |x: f32| ((x - draw_x) / factor).clamp(0.0, src.width() as f32);
    let to_src_y = |y: f32| ((y - draw_y) / factor).clamp(0.0, src.height() as f32);
    let sx = to_src_x(x0).floor() as u32;
    let sy = to_src_y(y0).floor() as u32;
    let sw = ((to_src_x(x1).ceil() as u32).saturating_sub(sx)).max(1);
    let sh = ((to_src_y(y1).ceil() as u32).saturating_sub(sy)).max(1);

    let cropped = imageops::crop_imm(src, sx, sy, sw, sh).to_image();
    let fitted = imageops::resize(
        &cropped,
        (x1 - x0) as u32,
        (y1 - y0) as u32,
        FilterType::Triangle,
    );
    Some((fitted, x0 as i32, y0 as i32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::{Composition, Layout};
    use crate::export::RasterRequest;
    use crate::layer::CacheKey;

    fn solid(width: u32, height: u32, rgb: [u8; 3]) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba([rgb[0], rgb[1], rgb[2], 255]))
    }

    #[test]
    fn cover_fit_fills_the_clip() {
        let src = solid(100, 50, [10, 20, 30]);
        let clip = RectPx::new(0, 0, 200, 100);
        let (img, x, y) = cover_fit(&src, RectPx::new(0, 0, 200, 100), 1.0, 1.0, clip).unwrap();
        assert_eq!((x, y), (0, 0));
        assert_eq!(img.dimensions(), (200, 100));
    }

    #[test]
    fn cover_fit_respects_zoom_and_clip() {
        let src = solid(10, 10, [0, 0, 0]);
        let clip = RectPx::new(0, 0, 100, 100);
        // Half-size box centered in a 100px frame
        let (img, x, y) = cover_fit(&src, RectPx::new(0, 0, 100, 100), 0.5, 1.0, clip).unwrap();
        assert_eq!((x, y), (25, 25));
        assert_eq!(img.dimensions(), (50, 50));
    }

    #[test]
    fn backdrop_covers_frame_and_emits_pixels() {
        let composition = Composition::new(Layout::Plain, 10, "", &[]);
        let request = RasterRequest::new(composition.frame, 1.0);
        let mut ctx = crate::layer::RenderContext::new(&composition, request);

        let background = BackgroundImage {
            id: 1,
            pixels: Arc::new(solid(64, 64, [200, 0, 0])),
        };
        let mut layer = crate::layer::Layer::default();
        layer.set_config(Some(BackdropConfig::new(background, 1.0)));
        let versions = LayerVersions { backdrop: 0, panel: 0, chrome: 0, code: 0 };
        layer.apply(&mut ctx, CacheKey::new(&composition, request), &versions);

        assert_eq!(ctx.image.get_pixel(0, 0).0, [200, 0, 0, 255]);
        let (w, h) = ctx.image.dimensions();
        assert_eq!(ctx.image.get_pixel(w - 1, h - 1).0, [200, 0, 0, 255]);
        assert!(ctx.get::<BackgroundPixels>().is_some());
    }

    #[test]
    fn config_change_detection_uses_identity() {
        let a = BackdropConfig::new(BackgroundImage::builtin(), 1.25);
        let b = BackdropConfig::new(BackgroundImage::builtin(), 1.25);
        assert!(!a.differs_from(&b));
        assert!(a.differs_from(&BackdropConfig::new(BackgroundImage::builtin(), 1.0)));

        let url = DataUrl::encode("image/png", &{
            let mut png = Vec::new();
            solid(2, 2, [1, 2, 3])
                .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
                .unwrap();
            png
        });
        let uploaded = BackgroundImage::from_data_url(&url).unwrap();
        assert!(!uploaded.is_builtin());
        assert!(a.differs_from(&BackdropConfig::new(uploaded, 1.25)));
    }

    #[test]
    fn builtin_background_is_not_empty() {
        let builtin = BackgroundImage::builtin();
        assert!(builtin.is_builtin());
        assert!(builtin.pixels().width() >= 1);
    }
}

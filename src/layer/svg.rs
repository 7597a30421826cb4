//! SVG rendering and pixel compositing using resvg/usvg.
//!
//! The chrome and code layers describe what they draw as SVG in CSS pixels
//! and rasterize it at the device scale; the other layers only composite.

use std::fmt::Write as _;
use std::sync::{Arc, LazyLock};

use image::{Rgba, RgbaImage};
use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg::{Options, Tree, fontdb};

use crate::geometry::SizePx;

/// System fonts, loaded once per process.
static FONT_DATABASE: LazyLock<Arc<fontdb::Database>> = LazyLock::new(|| {
    let mut db = fontdb::Database::new();
    db.load_system_fonts();
    log::debug!("loaded {} font face(s)", db.len());
    Arc::new(db)
});

// ============================================================================
// SVG Documents
// ============================================================================

/// Wraps `body` in an SVG root of the given size in CSS pixels.
pub fn svg_document(size: SizePx, body: &str) -> String {
    let mut svg = String::with_capacity(body.len() + 128);
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = size.width,
        h = size.height,
    );
    svg.push_str(body);
    svg.push_str("</svg>");
    svg
}

/// Escapes text for use in SVG content and attribute values.
pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

/// A CSS font-family list that falls back to the generic family.
pub fn font_family(font: &str, generic: &str) -> String {
    format!("'{}', {generic}", escape_xml(&font.replace('\'', "")))
}

// ============================================================================
// SVG Rendering
// ============================================================================

/// Renders an SVG document scaled by `scale`.
///
/// The output is the document's size times `scale`, rounded up. Returns
/// `None` if the SVG cannot be parsed or the output would be empty.
pub fn render_svg(svg_data: &str, scale: f32) -> Option<RgbaImage> {
    let mut opts = Options::default();
    opts.fontdb = FONT_DATABASE.clone();

    let tree = match Tree::from_str(svg_data, &opts) {
        Ok(tree) => tree,
        Err(err) => {
            log::warn!("could not parse generated svg: {err}");
            return None;
        }
    };

    let svg_size = tree.size();
    let width = (svg_size.width() * scale).ceil() as u32;
    let height = (svg_size.height() * scale).ceil() as u32;

    let mut pixmap = Pixmap::new(width, height)?;
    resvg::render(&tree, Transform::from_scale(scale, scale), &mut pixmap.as_mut());

    Some(pixmap_to_rgba_image(&pixmap))
}

/// Converts a tiny_skia Pixmap to an image::RgbaImage.
fn pixmap_to_rgba_image(pixmap: &Pixmap) -> RgbaImage {
    let mut img = RgbaImage::new(pixmap.width(), pixmap.height());

    for (pixel, src) in img.pixels_mut().zip(pixmap.pixels()) {
        // tiny_skia stores premultiplied alpha
        let (r, g, b, a) = unpremultiply(src.red(), src.green(), src.blue(), src.alpha());
        *pixel = Rgba([r, g, b, a]);
    }

    img
}

fn unpremultiply(r: u8, g: u8, b: u8, a: u8) -> (u8, u8, u8, u8) {
    if a == 0 {
        (0, 0, 0, 0)
    } else {
        let a_f = a as f32 / 255.0;
        (
            (r as f32 / a_f).round().min(255.0) as u8,
            (g as f32 / a_f).round().min(255.0) as u8,
            (b as f32 / a_f).round().min(255.0) as u8,
            a,
        )
    }
}

// ============================================================================
// Compositing
// ============================================================================

/// Composites a source image onto a destination image at the specified position.
///
/// Uses standard alpha blending (source over destination). Pixels falling
/// outside the destination are clipped.
pub fn composite_over(dest: &mut RgbaImage, src: &RgbaImage, x: i32, y: i32) {
    let dest_width = dest.width() as i32;
    let dest_height = dest.height() as i32;

    for (sx, sy, src_pixel) in src.enumerate_pixels() {
        let dx = x + sx as i32;
        let dy = y + sy as i32;
        if dx < 0 || dy < 0 || dx >= dest_width || dy >= dest_height || src_pixel[3] == 0 {
            continue;
        }

        let dst_pixel = dest.get_pixel(dx as u32, dy as u32);
        let blended = alpha_blend(*src_pixel, *dst_pixel);
        dest.put_pixel(dx as u32, dy as u32, blended);
    }
}

/// Multiplies the alpha channel of every pixel by `factor`.
pub fn fade(img: &mut RgbaImage, factor: f32) {
    let factor = factor.clamp(0.0, 1.0);
    for pixel in img.pixels_mut() {
        pixel[3] = (pixel[3] as f32 * factor).round() as u8;
    }
}

/// Alpha blends two RGBA pixels (source over destination).
pub fn alpha_blend(src: Rgba<u8>, dst: Rgba<u8>) -> Rgba<u8> {
    let sa = src[3] as f32 / 255.0;
    let da = dst[3] as f32 / 255.0;

    let out_a = sa + da * (1.0 - sa);
    if out_a == 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let blend = |s: u8, d: u8| -> u8 {
        let sf = s as f32 / 255.0;
        let df = d as f32 / 255.0;
        let out = (sf * sa + df * da * (1.0 - sa)) / out_a;
        (out * 255.0).round() as u8
    };

    Rgba([
        blend(src[0], dst[0]),
        blend(src[1], dst[1]),
        blend(src[2], dst[2]),
        (out_a * 255.0).round() as u8,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_scales_document() {
        let svg = svg_document(
            SizePx::new(100, 50),
            r##"<rect width="100" height="50" fill="#ff0000"/>"##,
        );
        let img = render_svg(&svg, 2.0).unwrap();
        assert_eq!(img.dimensions(), (200, 100));
        assert_eq!(img.get_pixel(100, 50).0, [255, 0, 0, 255]);
    }

    #[test]
    fn render_rejects_garbage() {
        assert!(render_svg("<not-svg", 1.0).is_none());
    }

    #[test]
    fn escape_covers_markup_characters() {
        assert_eq!(escape_xml(r#"a<b && c>"d"'"#), "a&lt;b &amp;&amp; c&gt;&quot;d&quot;&apos;");
        assert_eq!(font_family("Fira Code", "monospace"), "'Fira Code', monospace");
    }

    #[test]
    fn composite_clips_to_destination() {
        let mut dest = RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255]));
        let src = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 255, 255]));

        composite_over(&mut dest, &src, 8, -2);

        assert_eq!(dest.get_pixel(9, 0).0, [0, 0, 255, 255]);
        assert_eq!(dest.get_pixel(7, 0).0, [255, 0, 0, 255]);
        assert_eq!(dest.get_pixel(9, 2).0, [255, 0, 0, 255]);
    }

    #[test]
    fn faded_source_blends_with_destination() {
        let mut dest = RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 255]));
        let mut src = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 255, 255]));
        fade(&mut src, 0.5);
        composite_over(&mut dest, &src, 0, 0);

        let pixel = dest.get_pixel(0, 0);
        assert!(pixel[0] > 100 && pixel[2] > 100);
        assert_eq!(pixel[3], 255);
    }
}

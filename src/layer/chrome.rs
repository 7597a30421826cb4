//! Window chrome drawn in the panel's title bar.

use std::fmt::Write as _;

use palette::Srgb;

use super::svg::{composite_over, escape_xml, font_family, render_svg, svg_document};
use super::{DependencyVersion, LayerConfig, LayerEffect, LayerVersions, RenderContext};
use crate::color::{ColorScheme, to_hex};
use crate::composition::{ChromeItem, Composition, TITLE_FONT_SIZE, TitleAlign};

/// neutral-300
const DARK_INK: Srgb<u8> = Srgb::new(0xd4, 0xd4, 0xd4);
/// neutral-500
const LIGHT_TITLE_INK: Srgb<u8> = Srgb::new(0x73, 0x73, 0x73);
/// neutral-600
const LIGHT_CONTROL_INK: Srgb<u8> = Srgb::new(0x52, 0x52, 0x52);

const STROKE_WIDTH: f32 = 1.5;
const PLACEHOLDER_OPACITY: f32 = 0.5;

// ============================================================================
// ChromeConfig
// ============================================================================

/// Configuration for the title bar decorations.
///
/// Which decorations exist and where comes from the composition; the config
/// only decides how they are inked.
#[derive(Debug, Clone)]
pub struct ChromeConfig {
    pub scheme: ColorScheme,
    pub font: String,
}

impl ChromeConfig {
    pub fn new(scheme: ColorScheme, font: impl Into<String>) -> Self {
        Self {
            scheme,
            font: font.into(),
        }
    }

    fn title_ink(&self) -> Srgb<u8> {
        match self.scheme {
            ColorScheme::Dark => DARK_INK,
            ColorScheme::Light => LIGHT_TITLE_INK,
        }
    }

    fn control_ink(&self) -> Srgb<u8> {
        match self.scheme {
            ColorScheme::Dark => DARK_INK,
            ColorScheme::Light => LIGHT_CONTROL_INK,
        }
    }

    /// SVG markup of the chrome in CSS pixels, or `None` for a bare panel.
    pub fn to_svg(&self, composition: &Composition) -> Option<String> {
        if composition.chrome.is_empty() && composition.title.is_none() {
            return None;
        }

        let control = to_hex(self.control_ink());
        let stroke = format!(
            r#"stroke="{control}" stroke-width="{STROKE_WIDTH}" stroke-linecap="round" fill="none""#
        );
        let mut body = String::new();

        for item in &composition.chrome {
            let _ = match *item {
                ChromeItem::TrafficLight { cx, cy, radius, color } => write!(
                    body,
                    r#"<circle cx="{cx}" cy="{cy}" r="{radius}" fill="{}"/>"#,
                    to_hex(color)
                ),
                ChromeItem::Minimize { cx, cy, size } => {
                    let half = size * 0.29;
                    write!(
                        body,
                        r#"<line x1="{}" y1="{cy}" x2="{}" y2="{cy}" {stroke}/>"#,
                        cx - half,
                        cx + half
                    )
                }
                ChromeItem::Maximize { cx, cy, size } => {
                    let side = size * 0.75;
                    write!(
                        body,
                        r#"<rect x="{}" y="{}" width="{side}" height="{side}" rx="1" {stroke}/>"#,
                        cx - side / 2.0,
                        cy - side / 2.0
                    )
                }
                ChromeItem::Close { cx, cy, size } => {
                    let half = size * 0.25;
                    write!(
                        body,
                        r#"<path d="M{} {}L{} {}M{} {}L{} {}" {stroke}/>"#,
                        cx - half,
                        cy - half,
                        cx + half,
                        cy + half,
                        cx + half,
                        cy - half,
                        cx - half,
                        cy + half
                    )
                }
            };
        }

        if let Some(title) = &composition.title {
            let anchor = match title.align {
                TitleAlign::Left => "start",
                TitleAlign::Center => "middle",
            };
            let opacity = if title.is_placeholder { PLACEHOLDER_OPACITY } else { 1.0 };
            let _ = write!(
                body,
                r#"<text x="{}" y="{}" font-family="{}" font-size="{TITLE_FONT_SIZE}" text-anchor="{anchor}" fill="{}" fill-opacity="{opacity}">{}</text>"#,
                title.x,
                title.baseline,
                font_family(&self.font, "sans-serif"),
                to_hex(self.title_ink()),
                escape_xml(&title.text)
            );
        }

        Some(svg_document(composition.frame, &body))
    }
}

impl LayerConfig for ChromeConfig {
    fn differs_from(&self, other: &Self) -> bool {
        self.scheme != other.scheme || self.font != other.font
    }
}

impl LayerEffect for ChromeConfig {
    fn dependencies(versions: &LayerVersions) -> DependencyVersion {
        DependencyVersion::combine(&[versions.backdrop, versions.panel])
    }

    fn transform(&self, ctx: &mut RenderContext<'_>) {
        let Some(svg) = self.to_svg(ctx.composition) else {
            return;
        };
        if let Some(chrome) = render_svg(&svg, ctx.scale) {
            composite_over(&mut ctx.image, &chrome, 0, 0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::Layout;

    fn composition(layout: Layout, title: &str) -> Composition {
        Composition::new(layout, 32, title, &[])
    }

    #[test]
    fn plain_layout_draws_nothing() {
        let config = ChromeConfig::new(ColorScheme::Dark, "JetBrains Mono");
        assert!(config.to_svg(&composition(Layout::Plain, "")).is_none());
    }

    #[test]
    fn traffic_lights_use_fixed_colors() {
        let config = ChromeConfig::new(ColorScheme::Dark, "JetBrains Mono");
        let svg = config.to_svg(&composition(Layout::TrafficLights, "")).unwrap();
        for color in ["#ff605c", "#ffbd44", "#00ca4e"] {
            assert!(svg.contains(color), "missing {color}");
        }
        assert!(svg.contains("code.monumei"));
        assert!(svg.contains(r#"fill-opacity="0.5""#));
    }

    #[test]
    fn light_scheme_inks_title_and_controls_differently() {
        let config = ChromeConfig::new(ColorScheme::Light, "JetBrains Mono");
        let svg = config.to_svg(&composition(Layout::WindowControls, "app.rs")).unwrap();
        assert!(svg.contains("#737373"));
        assert!(svg.contains("#525252"));
        assert!(svg.contains(r#"text-anchor="middle""#));

        let dark = ChromeConfig::new(ColorScheme::Dark, "JetBrains Mono");
        let svg = dark.to_svg(&composition(Layout::WindowControls, "app.rs")).unwrap();
        assert!(svg.contains("#d4d4d4"));
        assert!(!svg.contains("#737373"));
    }

    #[test]
    fn title_text_is_escaped() {
        let config = ChromeConfig::new(ColorScheme::Dark, "JetBrains Mono");
        let svg = config
            .to_svg(&composition(Layout::WindowControlsLeftTitle, "<main> & co"))
            .unwrap();
        assert!(svg.contains("&lt;main&gt; &amp; co"));
        assert!(svg.contains(r#"text-anchor="start""#));
    }

    #[test]
    fn chrome_svg_parses_and_renders() {
        let config = ChromeConfig::new(ColorScheme::Dark, "JetBrains Mono");
        let comp = composition(Layout::TrafficLights, "");
        let img = render_svg(&config.to_svg(&comp).unwrap(), 2.0).unwrap();
        assert_eq!(img.width(), comp.frame.width * 2);

        let ChromeItem::TrafficLight { cx, cy, .. } = comp.chrome[0] else {
            panic!("expected a traffic light");
        };
        let pixel = img.get_pixel((cx * 2.0) as u32, (cy * 2.0) as u32);
        assert_eq!(pixel.0, [0xff, 0x60, 0x5c, 0xff]);
    }
}

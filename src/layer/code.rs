//! Highlighted code text.

use std::fmt::Write as _;
use std::sync::Arc;

use super::svg::{composite_over, escape_xml, font_family, render_svg, svg_document};
use super::{DependencyVersion, LayerConfig, LayerEffect, LayerVersions, RenderContext};
use crate::color::to_hex;
use crate::composition::{Composition, FONT_SIZE, expand_tabs};
use crate::highlight::StyledSpan;

/// Configuration for the code layer: one list of colored spans per line.
#[derive(Debug, Clone)]
pub struct CodeConfig {
    pub lines: Arc<Vec<Vec<StyledSpan>>>,
    pub font: String,
}

impl CodeConfig {
    pub fn new(lines: Arc<Vec<Vec<StyledSpan>>>, font: impl Into<String>) -> Self {
        Self {
            lines,
            font: font.into(),
        }
    }

    /// SVG markup of the code in CSS pixels.
    pub fn to_svg(&self, composition: &Composition) -> String {
        let family = font_family(&self.font, "monospace");
        let x = composition.code_origin.0;
        let mut body = String::new();

        for (index, line) in self.lines.iter().enumerate() {
            if line.iter().all(|span| span.text.trim().is_empty()) {
                continue;
            }

            let _ = write!(
                body,
                r#"<text x="{x}" y="{}" font-family="{family}" font-size="{FONT_SIZE}" xml:space="preserve">"#,
                composition.line_baseline(index)
            );
            let mut column = 0;
            for span in line {
                let text = expand_tabs(&span.text, column);
                column += text.chars().count();
                let _ = write!(
                    body,
                    r#"<tspan fill="{}">{}</tspan>"#,
                    to_hex(span.color),
                    escape_xml(&text)
                );
            }
            body.push_str("</text>");
        }

        svg_document(composition.frame, &body)
    }
}

impl LayerConfig for CodeConfig {
    fn differs_from(&self, other: &Self) -> bool {
        self.font != other.font
            || (!Arc::ptr_eq(&self.lines, &other.lines) && self.lines != other.lines)
    }
}

impl LayerEffect for CodeConfig {
    fn dependencies(versions: &LayerVersions) -> DependencyVersion {
        DependencyVersion::combine(&[versions.backdrop, versions.panel, versions.chrome])
    }

    fn transform(&self, ctx: &mut RenderContext<'_>) {
        let svg = self.to_svg(ctx.composition);
        if let Some(text) = render_svg(&svg, ctx.scale) {
            composite_over(&mut ctx.image, &text, 0, 0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::Layout;
    use palette::Srgb;

    fn config(lines: Vec<Vec<StyledSpan>>) -> CodeConfig {
        CodeConfig::new(Arc::new(lines), "JetBrains Mono")
    }

    #[test]
    fn spans_keep_their_colors() {
        let lines = vec![vec![
            StyledSpan::new("let", Srgb::new(0xb4, 0x8e, 0xad)),
            StyledSpan::new(" x", Srgb::new(0xc0, 0xc5, 0xce)),
        ]];
        let code = config(lines.clone());
        let svg = code.to_svg(&Composition::new(Layout::Plain, 48, "", &lines));
        assert!(svg.contains(r##"<tspan fill="#b48ead">let</tspan>"##));
        assert!(svg.contains(r##"<tspan fill="#c0c5ce"> x</tspan>"##));
        assert!(svg.contains(r#"xml:space="preserve""#));
    }

    #[test]
    fn markup_characters_and_tabs_are_rewritten() {
        let lines = vec![vec![
            StyledSpan::new("a", Srgb::new(0, 0, 0)),
            StyledSpan::new("\t<b>&", Srgb::new(0, 0, 0)),
        ]];
        let svg = config(lines.clone()).to_svg(&Composition::new(Layout::Plain, 0, "", &lines));
        assert!(svg.contains("   &lt;b&gt;&amp;"));
        assert!(!svg.contains('\t'));
    }

    #[test]
    fn blank_lines_emit_no_text() {
        let lines = vec![
            vec![StyledSpan::new("x", Srgb::new(0, 0, 0))],
            vec![],
            vec![StyledSpan::new(" ", Srgb::new(0, 0, 0))],
        ];
        let svg = config(lines.clone()).to_svg(&Composition::new(Layout::Plain, 0, "", &lines));
        assert_eq!(svg.matches("<text").count(), 1);
    }

    #[test]
    fn equal_lines_do_not_invalidate() {
        let lines = vec![vec![StyledSpan::new("x", Srgb::new(1, 2, 3))]];
        let a = config(lines.clone());
        let b = config(lines);
        assert!(!a.differs_from(&b));
        assert!(a.differs_from(&CodeConfig::new(a.lines.clone(), "Fira Code")));
    }
}

//! Syntax highlighting boundary.
//!
//! The render pipeline only depends on the [`Highlighter`] trait. The
//! built-in [`SyntectHighlighter`] uses syntect's bundled grammars and
//! themes; its markup carries the theme background as an inline
//! `background-color` declaration, which is where the swatch comes from.

use palette::Srgb;
use syntect::easy::HighlightLines;
use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

use crate::error::HighlightError;

/// Languages without a bundled grammar that read well with the JavaScript one.
const JAVASCRIPT_ALIASES: &[&str] = &["tsx", "ts", "typescript", "jsx", "mjs", "cjs"];

/// Input of one highlight call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightRequest {
    pub code: String,
    pub language: String,
    pub theme: String,
}

/// A run of text drawn in a single color.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledSpan {
    pub text: String,
    pub color: Srgb<u8>,
}

impl StyledSpan {
    pub fn new(text: impl Into<String>, color: Srgb<u8>) -> Self {
        Self {
            text: text.into(),
            color,
        }
    }
}

/// Output of one highlight call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HighlightedCode {
    /// Styled markup; contains the theme's `background-color` declaration.
    pub markup: String,
    /// Colored spans per source line, without line terminators.
    pub lines: Vec<Vec<StyledSpan>>,
}

/// Turns (code, language, theme) into styled markup.
pub trait Highlighter {
    fn highlight(&self, request: &HighlightRequest) -> Result<HighlightedCode, HighlightError>;
}

impl<H: Highlighter + ?Sized> Highlighter for Box<H> {
    fn highlight(&self, request: &HighlightRequest) -> Result<HighlightedCode, HighlightError> {
        (**self).highlight(request)
    }
}

// ============================================================================
// SyntectHighlighter
// ============================================================================

/// Highlighter backed by syntect's default syntax and theme sets.
pub struct SyntectHighlighter {
    syntaxes: SyntaxSet,
    themes: ThemeSet,
}

impl Default for SyntectHighlighter {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntectHighlighter {
    pub fn new() -> Self {
        Self {
            syntaxes: SyntaxSet::load_defaults_newlines(),
            themes: ThemeSet::load_defaults(),
        }
    }

    /// Names of the available grammars.
    pub fn languages(&self) -> Vec<&str> {
        self.syntaxes.syntaxes().iter().map(|s| s.name.as_str()).collect()
    }

    /// Ids of the available themes.
    pub fn themes(&self) -> Vec<&str> {
        self.themes.themes.keys().map(String::as_str).collect()
    }

    /// Finds a grammar by extension or name, falling back to plain text.
    fn resolve_syntax(&self, language: &str) -> &SyntaxReference {
        let language = language.trim();
        self.syntaxes
            .find_syntax_by_token(language)
            .or_else(|| {
                JAVASCRIPT_ALIASES
                    .iter()
                    .any(|alias| alias.eq_ignore_ascii_case(language))
                    .then(|| self.syntaxes.find_syntax_by_token("js"))
                    .flatten()
            })
            .unwrap_or_else(|| {
                log::debug!("no grammar for {language:?}, using plain text");
                self.syntaxes.find_syntax_plain_text()
            })
    }
}

impl Highlighter for SyntectHighlighter {
    fn highlight(&self, request: &HighlightRequest) -> Result<HighlightedCode, HighlightError> {
        let theme = self
            .themes
            .themes
            .get(&request.theme)
            .ok_or_else(|| HighlightError::UnknownTheme(request.theme.clone()))?;
        let syntax = self.resolve_syntax(&request.language);

        let markup = highlighted_html_for_string(&request.code, &self.syntaxes, syntax, theme)?;

        let mut highlighter = HighlightLines::new(syntax, theme);
        let mut lines = Vec::new();
        for line in LinesWithEndings::from(&request.code) {
            let ranges = highlighter.highlight_line(line, &self.syntaxes)?;
            let spans = ranges
                .into_iter()
                .filter_map(|(style, text)| {
                    let text = text.trim_end_matches(['\n', '\r']);
                    (!text.is_empty()).then(|| {
                        let fg = style.foreground;
                        StyledSpan::new(text, Srgb::new(fg.r, fg.g, fg.b))
                    })
                })
                .collect();
            lines.push(spans);
        }

        Ok(HighlightedCode { markup, lines })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::extract_swatch;

    fn request(code: &str, language: &str, theme: &str) -> HighlightRequest {
        HighlightRequest {
            code: code.to_string(),
            language: language.to_string(),
            theme: theme.to_string(),
        }
    }

    #[test]
    fn markup_carries_theme_background() {
        let highlighter = SyntectHighlighter::new();
        let out = highlighter
            .highlight(&request("fn main() {}\n ", "rust", "base16-ocean.dark"))
            .unwrap();
        assert_eq!(extract_swatch(&out.markup).as_deref(), Some("#2b303b"));
    }

    #[test]
    fn one_span_list_per_line() {
        let highlighter = SyntectHighlighter::new();
        let out = highlighter
            .highlight(&request("let a = 1;\nlet b = 2;\n ", "rust", "InspiredGitHub"))
            .unwrap();
        assert_eq!(out.lines.len(), 3);
        let first: String = out.lines[0].iter().map(|s| s.text.as_str()).collect();
        assert_eq!(first, "let a = 1;");
        assert!(out.lines.iter().flatten().all(|span| !span.text.contains('\n')));
    }

    #[test]
    fn unknown_theme_is_an_error() {
        let highlighter = SyntectHighlighter::new();
        let result = highlighter.highlight(&request("x", "rust", "no-such-theme"));
        assert!(matches!(result, Err(HighlightError::UnknownTheme(t)) if t == "no-such-theme"));
    }

    #[test]
    fn unknown_language_falls_back() {
        let highlighter = SyntectHighlighter::new();
        assert_eq!(highlighter.resolve_syntax("definitely-not-a-language").name, "Plain Text");
        assert_eq!(highlighter.resolve_syntax("tsx").name, "JavaScript");
        assert_eq!(highlighter.resolve_syntax("rs").name, "Rust");
    }

    #[test]
    fn lists_bundled_themes() {
        let highlighter = SyntectHighlighter::new();
        assert!(highlighter.themes().contains(&"base16-ocean.dark"));
        assert!(highlighter.themes().contains(&"InspiredGitHub"));
        assert!(highlighter.languages().contains(&"Rust"));
    }
}

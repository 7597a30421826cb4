//! Swatch extraction and light/dark classification.
//!
//! The highlighter reports its theme background as a CSS declaration inside
//! the generated markup. The first such declaration is the *swatch*; its
//! BT.709 luma decides whether the surrounding chrome is drawn for a light
//! or a dark theme.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use palette::Srgb;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Luma above which a swatch counts as light (exclusive).
pub const LIGHT_LUMA_THRESHOLD: f64 = 128.0;

static SWATCH_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"background-color:#([a-zA-Z0-9]{6})").expect("swatch pattern is valid")
});

// ============================================================================
// ColorScheme
// ============================================================================

/// Overall UI mode derived from the highlighted swatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "lowercase")]
pub enum ColorScheme {
    Light,
    #[default]
    Dark,
}

impl ColorScheme {
    /// Classifies a swatch hex string, see [`is_light`].
    pub fn from_swatch(hex: &str) -> Self {
        if is_light(hex) { Self::Light } else { Self::Dark }
    }

    pub fn is_dark(&self) -> bool {
        matches!(self, Self::Dark)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

impl fmt::Display for ColorScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColorScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(format!("expected \"light\" or \"dark\", got \"{other}\"")),
        }
    }
}

// ============================================================================
// Luma
// ============================================================================

/// Parses a 6-hex-digit color, with or without a leading `#`.
///
/// Shorthand (`#abc`) and anything that is not exactly six hex digits is
/// rejected.
pub fn parse_swatch(hex: &str) -> Option<Srgb<u8>> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    Srgb::from_str(digits).ok()
}

/// BT.709 luma of a gamma-encoded 8-bit color, in the 0-255 range.
pub fn luma(color: Srgb<u8>) -> f64 {
    0.2126 * color.red as f64 + 0.7152 * color.green as f64 + 0.0722 * color.blue as f64
}

/// Returns true if the swatch is visually light.
///
/// Malformed input is classified as dark rather than rejected.
///
/// ```
/// use codeshot_renderer::is_light;
///
/// assert!(is_light("#FFFFFF"));
/// assert!(!is_light("000000"));
/// assert!(!is_light("#808080"));
/// ```
pub fn is_light(hex: &str) -> bool {
    match parse_swatch(hex) {
        Some(color) => luma(color) > LIGHT_LUMA_THRESHOLD,
        None => {
            log::debug!("malformed swatch {hex:?}, assuming dark");
            false
        }
    }
}

/// Finds the first `background-color:#RRGGBB` declaration in highlighted
/// markup and returns it as `#RRGGBB`.
pub fn extract_swatch(markup: &str) -> Option<String> {
    SWATCH_PATTERN
        .captures(markup)
        .and_then(|caps| caps.get(1))
        .map(|m| format!("#{}", m.as_str()))
}

/// Formats a color as lowercase `#rrggbb`.
pub fn to_hex(color: Srgb<u8>) -> String {
    format!("#{:02x}{:02x}{:02x}", color.red, color.green, color.blue)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extremes_classify() {
        assert!(is_light("#FFFFFF"));
        assert!(!is_light("#000000"));
    }

    #[test]
    fn threshold_is_exclusive() {
        assert_eq!(luma(Srgb::new(128, 128, 128)), 128.0);
        assert!(!is_light("#808080"));
        assert!(is_light("#818181"));
    }

    #[test]
    fn green_weighs_most() {
        assert!(is_light("#00ff00"));
        assert!(!is_light("#ff0000"));
        assert!(!is_light("#0000ff"));
    }

    #[test]
    fn malformed_input_is_dark() {
        assert!(!is_light("#fff"));
        assert!(!is_light("#gggggg"));
        assert!(!is_light(""));
        assert!(!is_light("#ffffffff"));
        assert_eq!(ColorScheme::from_swatch("zzzzzz"), ColorScheme::Dark);
    }

    #[test]
    fn parse_swatch_accepts_optional_hash() {
        assert_eq!(parse_swatch("2b303b"), Some(Srgb::new(0x2b, 0x30, 0x3b)));
        assert_eq!(parse_swatch("#2B303B"), Some(Srgb::new(0x2b, 0x30, 0x3b)));
    }

    #[test]
    fn extracts_first_background_declaration() {
        let markup = r#"<pre style="background-color:#2b303b;"><span style="background-color:#ffffff;">x</span></pre>"#;
        assert_eq!(extract_swatch(markup).as_deref(), Some("#2b303b"));
        assert_eq!(extract_swatch("<pre>plain</pre>"), None);
    }

    #[test]
    fn color_scheme_parses_and_displays() {
        assert_eq!("Light".parse::<ColorScheme>(), Ok(ColorScheme::Light));
        assert_eq!(ColorScheme::Dark.to_string(), "dark");
        assert!("dim".parse::<ColorScheme>().is_err());
    }

    #[test]
    fn hex_round_trip() {
        assert_eq!(to_hex(Srgb::new(255, 96, 92)), "#ff605c");
    }
}

//! The persisted settings store.
//!
//! Every visual control of the editor is one independent key in a
//! [`SettingsBackend`]. [`SettingsStore`] wraps a backend with typed
//! accessors; a getter never fails and falls back to the documented default
//! when a key was never stored (or holds something undecodable).
//!
//! The store is passed explicitly to whatever needs it; there is no global
//! instance.
//!
//! ```
//! use codeshot_renderer::{Layout, MemoryBackend, SettingsStore};
//!
//! let mut settings = SettingsStore::new(MemoryBackend::new());
//! assert_eq!(settings.layout(), Layout::Plain);
//! assert_eq!(settings.spacing(), 48);
//!
//! settings.set_layout(Layout::TrafficLights).unwrap();
//! assert_eq!(settings.layout(), Layout::TrafficLights);
//! ```

pub mod backend;
pub mod snapshot;

pub use backend::{FileBackend, MemoryBackend, SettingsBackend};
pub use snapshot::{Configurable, SettingsSnapshot};

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::color::ColorScheme;
use crate::composition::Layout;
use crate::data_url::DataUrl;
use crate::error::SettingsError;

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_CODE: &str = r#"const greet = (name: string) => {
	return `Hello, ${name}!`
}

console.log(greet('world'))
"#;
pub const DEFAULT_LANGUAGE: &str = "tsx";
pub const DEFAULT_DARK_THEME: &str = "base16-ocean.dark";
pub const DEFAULT_LIGHT_THEME: &str = "InspiredGitHub";
pub const DEFAULT_FONT: &str = "JetBrains Mono";
pub const DEFAULT_SCALE: f32 = 1.25;
pub const DEFAULT_SPACING: u32 = 48;
pub const DEFAULT_BLUR: u32 = 10;
pub const DEFAULT_OPACITY: f32 = 0.8;

/// Largest accepted spacing, in pixels.
pub const MAX_SPACING: u32 = 480;

/// Largest accepted blur radius, in pixels.
pub const MAX_BLUR: u32 = 40;

/// Font families offered by the font picker.
pub const FONTS: &[&str] = &[
    "JetBrains Mono",
    "Fira Code",
    "Cascadia Code",
    "Source Code Pro",
    "IBM Plex Mono",
    "Geist Mono",
    "Menlo",
    "Consolas",
];

// ============================================================================
// SettingKey
// ============================================================================

/// The persisted attributes, one backend entry each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    Code,
    Language,
    Theme,
    Font,
    Scale,
    Spacing,
    Blur,
    Layout,
    Opacity,
    Title,
    Background,
    ColorScheme,
}

impl SettingKey {
    pub const ALL: [SettingKey; 12] = [
        Self::Code,
        Self::Language,
        Self::Theme,
        Self::Font,
        Self::Scale,
        Self::Spacing,
        Self::Blur,
        Self::Layout,
        Self::Opacity,
        Self::Title,
        Self::Background,
        Self::ColorScheme,
    ];

    /// The backend key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Language => "language",
            Self::Theme => "theme",
            Self::Font => "font",
            Self::Scale => "scale",
            Self::Spacing => "spacing",
            Self::Blur => "blur",
            Self::Layout => "layout",
            Self::Opacity => "opacity",
            Self::Title => "title",
            Self::Background => "background",
            Self::ColorScheme => "color-scheme",
        }
    }

    /// True for the inputs of the highlighter.
    pub fn affects_highlight(&self) -> bool {
        matches!(self, Self::Code | Self::Language | Self::Theme)
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SettingKey {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == wanted || (wanted == "colorScheme" && *key == Self::ColorScheme))
            .ok_or_else(|| SettingsError::UnknownKey(wanted.to_string()))
    }
}

fn invalid(key: SettingKey, reason: impl Into<String>) -> SettingsError {
    SettingsError::InvalidValue {
        key: key.as_str().to_string(),
        reason: reason.into(),
    }
}

// ============================================================================
// SettingsStore
// ============================================================================

/// Typed access to the persisted settings.
pub struct SettingsStore<B: SettingsBackend> {
    backend: B,
}

impl<B: SettingsBackend> SettingsStore<B> {
    /// Wraps a backend whose persisted state has already been loaded.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Returns true if a value was ever stored for `key`.
    pub fn is_set(&self, key: SettingKey) -> bool {
        self.backend.load(key.as_str()).is_some()
    }

    /// Removes the stored value so the default applies again.
    pub fn reset(&mut self, key: SettingKey) -> Result<(), SettingsError> {
        self.backend.remove(key.as_str())
    }

    fn get_or<T: DeserializeOwned>(&self, key: SettingKey, default: impl FnOnce() -> T) -> T {
        let Some(raw) = self.backend.load(key.as_str()) else {
            return default();
        };
        match serde_json::from_value(raw.clone()) {
            Ok(value) => value,
            Err(err) => {
                log::warn!("ignoring stored {key}: {err}");
                default()
            }
        }
    }

    fn put<T: Serialize>(&mut self, key: SettingKey, value: &T) -> Result<(), SettingsError> {
        let value = serde_json::to_value(value)?;
        self.backend.store(key.as_str(), value)
    }

    // ---- Typed accessors ----

    pub fn code(&self) -> String {
        self.get_or(SettingKey::Code, || DEFAULT_CODE.to_string())
    }

    pub fn set_code(&mut self, code: impl Into<String>) -> Result<(), SettingsError> {
        self.put(SettingKey::Code, &code.into())
    }

    pub fn language(&self) -> String {
        self.get_or(SettingKey::Language, || DEFAULT_LANGUAGE.to_string())
    }

    pub fn set_language(&mut self, language: impl Into<String>) -> Result<(), SettingsError> {
        self.put(SettingKey::Language, &language.into())
    }

    pub fn theme(&self) -> String {
        self.get_or(SettingKey::Theme, || DEFAULT_DARK_THEME.to_string())
    }

    pub fn set_theme(&mut self, theme: impl Into<String>) -> Result<(), SettingsError> {
        self.put(SettingKey::Theme, &theme.into())
    }

    /// Stores a theme matching the system preference if none was ever chosen.
    ///
    /// Returns true if a theme was stored.
    pub fn ensure_theme(&mut self, prefers_dark: bool) -> Result<bool, SettingsError> {
        if self.is_set(SettingKey::Theme) {
            return Ok(false);
        }
        let theme = if prefers_dark { DEFAULT_DARK_THEME } else { DEFAULT_LIGHT_THEME };
        self.set_theme(theme)?;
        Ok(true)
    }

    pub fn font(&self) -> String {
        self.get_or(SettingKey::Font, || DEFAULT_FONT.to_string())
    }

    /// Stores one of [`FONTS`]. Matching ignores ASCII case; the canonical
    /// name is what gets stored.
    pub fn set_font(&mut self, font: impl Into<String>) -> Result<(), SettingsError> {
        let font = font.into();
        let Some(known) = FONTS.iter().find(|f| f.eq_ignore_ascii_case(font.trim())) else {
            return Err(invalid(SettingKey::Font, format!("\"{font}\" is not an offered font")));
        };
        self.put(SettingKey::Font, known)
    }

    /// Scale of the background image layers.
    pub fn scale(&self) -> f32 {
        self.get_or(SettingKey::Scale, || DEFAULT_SCALE)
    }

    pub fn set_scale(&mut self, scale: f32) -> Result<(), SettingsError> {
        if !scale.is_finite() || scale < 0.0 {
            return Err(invalid(SettingKey::Scale, "must be a non-negative number"));
        }
        self.put(SettingKey::Scale, &scale)
    }

    /// Padding around the code panel, in pixels.
    ///
    /// A stored value above [`MAX_SPACING`] reads as the maximum.
    pub fn spacing(&self) -> u32 {
        self.get_or(SettingKey::Spacing, || DEFAULT_SPACING).min(MAX_SPACING)
    }

    pub fn set_spacing(&mut self, spacing: u32) -> Result<(), SettingsError> {
        if spacing > MAX_SPACING {
            return Err(invalid(
                SettingKey::Spacing,
                format!("must be between 0 and {MAX_SPACING}"),
            ));
        }
        self.put(SettingKey::Spacing, &spacing)
    }

    /// Blur radius of the panel background, in pixels.
    pub fn blur(&self) -> u32 {
        self.get_or(SettingKey::Blur, || DEFAULT_BLUR).min(MAX_BLUR)
    }

    pub fn set_blur(&mut self, blur: u32) -> Result<(), SettingsError> {
        if blur > MAX_BLUR {
            return Err(invalid(SettingKey::Blur, format!("must be between 0 and {MAX_BLUR}")));
        }
        self.put(SettingKey::Blur, &blur)
    }

    pub fn layout(&self) -> Layout {
        self.get_or(SettingKey::Layout, Layout::default)
    }

    pub fn set_layout(&mut self, layout: Layout) -> Result<(), SettingsError> {
        self.put(SettingKey::Layout, &layout)
    }

    /// Opacity of the panel's swatch fill; the blurred image shows through
    /// at `1 - opacity`.
    pub fn opacity(&self) -> f32 {
        self.get_or(SettingKey::Opacity, || DEFAULT_OPACITY)
    }

    pub fn set_opacity(&mut self, opacity: f32) -> Result<(), SettingsError> {
        if !(0.0..=1.0).contains(&opacity) {
            return Err(invalid(SettingKey::Opacity, "must be between 0 and 1"));
        }
        self.put(SettingKey::Opacity, &opacity)
    }

    pub fn title(&self) -> String {
        self.get_or(SettingKey::Title, String::new)
    }

    pub fn set_title(&mut self, title: impl Into<String>) -> Result<(), SettingsError> {
        self.put(SettingKey::Title, &title.into())
    }

    /// The uploaded background, or `None` for the built-in image.
    pub fn background(&self) -> Option<DataUrl> {
        self.get_or(SettingKey::Background, || None)
    }

    /// Stores a new background, replacing any previous upload.
    pub fn set_background(&mut self, background: DataUrl) -> Result<(), SettingsError> {
        self.put(SettingKey::Background, &background)
    }

    /// Reverts to the built-in background image.
    pub fn clear_background(&mut self) -> Result<(), SettingsError> {
        self.reset(SettingKey::Background)
    }

    pub fn color_scheme(&self) -> ColorScheme {
        self.get_or(SettingKey::ColorScheme, ColorScheme::default)
    }

    pub fn set_color_scheme(&mut self, scheme: ColorScheme) -> Result<(), SettingsError> {
        self.put(SettingKey::ColorScheme, &scheme)
    }

    // ---- Textual access ----

    /// Parses and stores a value given as text (command line, form field).
    pub fn set_from_str(&mut self, key: SettingKey, raw: &str) -> Result<(), SettingsError> {
        match key {
            SettingKey::Code => self.set_code(raw),
            SettingKey::Language => self.set_language(raw.trim()),
            SettingKey::Theme => self.set_theme(raw.trim()),
            SettingKey::Font => self.set_font(raw.trim()),
            SettingKey::Title => self.set_title(raw),
            SettingKey::Scale => {
                let scale = raw.trim().parse::<f32>().map_err(|_| invalid(key, "not a number"))?;
                self.set_scale(scale)
            }
            SettingKey::Opacity => {
                let opacity = raw.trim().parse::<f32>().map_err(|_| invalid(key, "not a number"))?;
                self.set_opacity(opacity)
            }
            SettingKey::Spacing => {
                let spacing = raw
                    .trim()
                    .parse::<u32>()
                    .map_err(|_| invalid(key, "must be a non-negative integer"))?;
                self.set_spacing(spacing)
            }
            SettingKey::Blur => {
                let blur = raw
                    .trim()
                    .parse::<u32>()
                    .map_err(|_| invalid(key, "must be a non-negative integer"))?;
                self.set_blur(blur)
            }
            SettingKey::Layout => {
                let layout = raw
                    .trim()
                    .parse::<u8>()
                    .ok()
                    .and_then(|n| Layout::try_from(n).ok())
                    .ok_or_else(|| invalid(key, "must be between 1 and 5"))?;
                self.set_layout(layout)
            }
            SettingKey::ColorScheme => {
                let scheme = raw.parse::<ColorScheme>().map_err(|reason| invalid(key, reason))?;
                self.set_color_scheme(scheme)
            }
            SettingKey::Background => {
                let url = DataUrl::parse(raw.trim()).map_err(|err| invalid(key, err.to_string()))?;
                self.set_background(url)
            }
        }
    }

    /// Formats the current (or default) value as text.
    pub fn get_display(&self, key: SettingKey) -> String {
        match key {
            SettingKey::Code => self.code(),
            SettingKey::Language => self.language(),
            SettingKey::Theme => self.theme(),
            SettingKey::Font => self.font(),
            SettingKey::Scale => self.scale().to_string(),
            SettingKey::Spacing => self.spacing().to_string(),
            SettingKey::Blur => self.blur().to_string(),
            SettingKey::Layout => self.layout().index().to_string(),
            SettingKey::Opacity => self.opacity().to_string(),
            SettingKey::Title => self.title(),
            SettingKey::Background => self
                .background()
                .map(String::from)
                .unwrap_or_default(),
            SettingKey::ColorScheme => self.color_scheme().to_string(),
        }
    }
}

impl Default for SettingsStore<MemoryBackend> {
    fn default() -> Self {
        Self::new(MemoryBackend::new())
    }
}

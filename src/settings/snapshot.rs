//! Serializable snapshot of every setting.
//!
//! A [`SettingsSnapshot`] captures the resolved value of each attribute
//! (defaults included) in a JSON-friendly form, for sharing a look between
//! devices or handing it to a front end.
//!
//! ```
//! use codeshot_renderer::{Configurable, Layout, MemoryBackend, SettingsSnapshot, SettingsStore};
//!
//! let mut source = SettingsStore::new(MemoryBackend::new());
//! source.set_layout(Layout::CenteredTitle).unwrap();
//!
//! let json = source.export_snapshot().to_json().unwrap();
//!
//! let mut target = SettingsStore::new(MemoryBackend::new());
//! target.apply_snapshot(&SettingsSnapshot::from_json(&json).unwrap()).unwrap();
//! assert_eq!(target.layout(), Layout::CenteredTitle);
//! ```

use serde::{Deserialize, Serialize};

use super::{SettingsBackend, SettingsStore};
use crate::color::ColorScheme;
use crate::composition::Layout;
use crate::data_url::DataUrl;
use crate::error::SettingsError;

// ============================================================================
// Configurable Trait
// ============================================================================

/// Types whose state can be captured in and restored from a snapshot.
pub trait Configurable {
    /// Applies every attribute of the snapshot.
    fn apply_snapshot(&mut self, snapshot: &SettingsSnapshot) -> Result<(), SettingsError>;

    /// Exports the current state.
    fn export_snapshot(&self) -> SettingsSnapshot;
}

// ============================================================================
// SettingsSnapshot
// ============================================================================

/// All settings with defaults resolved.
///
/// # JSON Format
///
/// ```json
/// {
///   "code": "fn main() {}",
///   "language": "rust",
///   "theme": "base16-ocean.dark",
///   "font": "JetBrains Mono",
///   "scale": 1.25,
///   "spacing": 48,
///   "blur": 10,
///   "layout": 3,
///   "opacity": 0.8,
///   "title": "main.rs",
///   "colorScheme": "dark"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct SettingsSnapshot {
    pub code: String,
    pub language: String,
    pub theme: String,
    pub font: String,
    pub scale: f32,
    pub spacing: u32,
    pub blur: u32,
    pub layout: Layout,
    pub opacity: f32,
    #[serde(default)]
    pub title: String,

    /// `None` means the built-in background.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<DataUrl>,

    #[serde(default)]
    pub color_scheme: ColorScheme,
}

impl SettingsSnapshot {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl<B: SettingsBackend> Configurable for SettingsStore<B> {
    fn apply_snapshot(&mut self, snapshot: &SettingsSnapshot) -> Result<(), SettingsError> {
        self.set_code(snapshot.code.clone())?;
        self.set_language(snapshot.language.clone())?;
        self.set_theme(snapshot.theme.clone())?;
        self.set_font(snapshot.font.clone())?;
        self.set_scale(snapshot.scale)?;
        self.set_spacing(snapshot.spacing)?;
        self.set_blur(snapshot.blur)?;
        self.set_layout(snapshot.layout)?;
        self.set_opacity(snapshot.opacity)?;
        self.set_title(snapshot.title.clone())?;
        match &snapshot.background {
            Some(background) => self.set_background(background.clone())?,
            None => self.clear_background()?,
        }
        self.set_color_scheme(snapshot.color_scheme)
    }

    fn export_snapshot(&self) -> SettingsSnapshot {
        SettingsSnapshot {
            code: self.code(),
            language: self.language(),
            theme: self.theme(),
            font: self.font(),
            scale: self.scale(),
            spacing: self.spacing(),
            blur: self.blur(),
            layout: self.layout(),
            opacity: self.opacity(),
            title: self.title(),
            background: self.background(),
            color_scheme: self.color_scheme(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MemoryBackend;

    #[test]
    fn export_resolves_defaults() {
        let store = SettingsStore::new(MemoryBackend::new());
        let snapshot = store.export_snapshot();
        assert_eq!(snapshot.layout, Layout::Plain);
        assert_eq!(snapshot.spacing, 48);
        assert!(snapshot.background.is_none());
    }

    #[test]
    fn json_uses_camel_case_and_numeric_layout() {
        let mut store = SettingsStore::new(MemoryBackend::new());
        store.set_layout(Layout::WindowControls).unwrap();
        let json = store.export_snapshot().to_json_pretty().unwrap();

        assert!(json.contains("\"colorScheme\": \"dark\""));
        assert!(json.contains("\"layout\": 4"));
        assert!(!json.contains("\"background\""));
    }

    #[test]
    fn apply_snapshot_clears_background_when_absent() {
        let mut store = SettingsStore::new(MemoryBackend::new());
        store
            .set_background(DataUrl::encode("image/webp", b"old"))
            .unwrap();

        let mut snapshot = store.export_snapshot();
        snapshot.background = None;
        snapshot.opacity = 0.3;
        store.apply_snapshot(&snapshot).unwrap();

        assert!(store.background().is_none());
        assert_eq!(store.opacity(), 0.3);
    }

    #[test]
    fn apply_snapshot_rejects_out_of_range_values() {
        let mut store = SettingsStore::new(MemoryBackend::new());
        let mut snapshot = store.export_snapshot();
        snapshot.opacity = 2.0;
        assert!(store.apply_snapshot(&snapshot).is_err());
    }

    #[test]
    fn invalid_layout_in_json_is_rejected() {
        let json = r#"{"code":"","language":"rust","theme":"t","font":"f","scale":1,"spacing":0,"blur":0,"layout":7,"opacity":0.5}"#;
        assert!(SettingsSnapshot::from_json(json).is_err());
    }
}

//! codeshot-renderer: syntax-highlighted code screenshots
//!
//! This crate turns a snippet of code into a framed, shareable image: the
//! code is highlighted, laid out on a rounded panel over a blurred
//! background, decorated with optional window chrome, and exported as a
//! high-resolution JPEG. Every visual control lives in a persisted
//! [`SettingsStore`].
//!
//! # Example
//!
//! ```
//! use codeshot_renderer::{Layout, MemoryBackend, SettingsStore, Studio, SyntectHighlighter};
//!
//! let mut settings = SettingsStore::new(MemoryBackend::new());
//! settings.set_code("print('hello')").unwrap();
//! settings.set_language("py").unwrap();
//! settings.set_layout(Layout::WindowControls).unwrap();
//!
//! let mut studio = Studio::new(settings, SyntectHighlighter::new());
//! studio.refresh().unwrap();
//!
//! // Preview at 1x, export at 4x
//! let preview = studio.compose(1.0).unwrap();
//! let export = studio.export_jpeg().unwrap();
//! assert_eq!(export.width, preview.width() * 4);
//! assert_eq!(export.file_name, "code-monumei.jpg");
//! ```
//!
//! # Serializable Snapshots
//!
//! To move a look between machines or hand it to a front end, use
//! [`SettingsSnapshot`] with the [`Configurable`] trait:
//!
//! ```
//! use codeshot_renderer::{Configurable, MemoryBackend, SettingsStore};
//!
//! let settings = SettingsStore::new(MemoryBackend::new());
//! let json = settings.export_snapshot().to_json_pretty().unwrap();
//! assert!(json.contains("\"spacing\": 48"));
//! ```

mod color;
mod composition;
mod data_url;
mod editor;
mod error;
mod export;
mod geometry;
mod highlight;
mod layer;
mod normalize;
mod pipeline;
mod settings;
mod studio;
mod viewport;

pub use color::{ColorScheme, LIGHT_LUMA_THRESHOLD, extract_swatch, is_light, luma, parse_swatch, to_hex};
pub use composition::{
    ChromeItem, Composition, Layout, TITLE_PLACEHOLDER, TitleAlign, TitleText, expand_tabs,
    line_columns,
};
pub use data_url::DataUrl;
pub use editor::{TextEdit, insert_tab};
pub use error::{
    DataUrlError, ExportError, HighlightError, NormalizeError, SettingsError, StudioError,
};
pub use export::{
    EXPORT_FILE_NAME, EXPORT_QUALITY, EXPORT_SCALE, ExportedImage, RasterRequest, Rasterizer,
    export_jpeg,
};
pub use geometry::{RectPx, SizePx};
pub use highlight::{HighlightRequest, HighlightedCode, Highlighter, StyledSpan, SyntectHighlighter};
pub use layer::{
    BackdropConfig, BackgroundImage, CacheKey, ChromeConfig, CodeConfig, Layer, LayerConfig,
    LayerEffect, LayerPipeline, LayerVersions, PanelConfig, RenderContext,
};
pub use normalize::{
    DEFAULT_MAX_WIDTH, DEFAULT_QUALITY, EncodeFormat, NormalizeOptions, Platform, compress_image,
    scaled_size,
};
pub use pipeline::{
    Completion, FALLBACK_SWATCH, HighlightTicket, RenderPipeline, RenderState, RenderedCode,
};
pub use settings::{
    Configurable, FONTS, FileBackend, MAX_BLUR, MAX_SPACING, MemoryBackend, SettingKey,
    SettingsBackend, SettingsSnapshot, SettingsStore,
};
pub use studio::Studio;
pub use viewport::{MAX_ZOOM, MIN_ZOOM, Modifiers, PointerTarget, Viewport};

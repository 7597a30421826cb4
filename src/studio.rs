//! The editor engine.

use std::ops::Range;
use std::path::{Path, PathBuf};

use image::RgbaImage;

use crate::color::ColorScheme;
use crate::composition::Composition;
use crate::data_url::DataUrl;
use crate::editor::{TextEdit, insert_tab};
use crate::error::{ExportError, HighlightError, SettingsError, StudioError};
use crate::export::{self, ExportedImage, RasterRequest, Rasterizer};
use crate::highlight::{HighlightedCode, Highlighter};
use crate::layer::{
    BackdropConfig, BackgroundImage, ChromeConfig, CodeConfig, LayerPipeline, PanelConfig,
};
use crate::normalize::{NormalizeOptions, Platform, compress_image};
use crate::pipeline::{Completion, HighlightTicket, RenderPipeline, RenderState, RenderedCode};
use crate::settings::{Configurable, SettingKey, SettingsBackend, SettingsSnapshot, SettingsStore};
use crate::viewport::Viewport;

// ============================================================================
// Studio
// ============================================================================

/// Settings, highlighting, composition and export in one place.
///
/// The settings store and the highlighter are injected. Everything visible
/// is derived from them: highlighting follows code/language/theme, the
/// composition follows the highlighted lines and the layout settings, and
/// the layer pipeline draws it.
///
/// # Example
///
/// ```
/// use codeshot_renderer::{Layout, MemoryBackend, SettingsStore, Studio, SyntectHighlighter};
///
/// let mut settings = SettingsStore::new(MemoryBackend::new());
/// settings.set_code("fn main() {}").unwrap();
/// settings.set_language("rust").unwrap();
/// settings.set_layout(Layout::TrafficLights).unwrap();
///
/// let mut studio = Studio::new(settings, SyntectHighlighter::new());
/// studio.refresh().unwrap();
///
/// let composition = studio.composition().unwrap();
/// assert_eq!(composition.chrome.len(), 3);
/// ```
pub struct Studio<B: SettingsBackend, H: Highlighter> {
    settings: SettingsStore<B>,
    highlighter: H,
    render: RenderPipeline,

    /// The layer pipeline; rebuilt from settings before every rasterization.
    pub layers: LayerPipeline,

    /// On-screen pan and zoom.
    pub viewport: Viewport,

    platform: Platform,
    normalize: NormalizeOptions,

    /// Last decoded upload, keyed by its data URL.
    uploaded: Option<(DataUrl, BackgroundImage)>,
}

impl<B: SettingsBackend, H: Highlighter> Studio<B, H> {
    /// Creates a studio over a loaded settings store.
    ///
    /// The stored color scheme is used until the first render completes.
    pub fn new(settings: SettingsStore<B>, highlighter: H) -> Self {
        let mut render = RenderPipeline::new();
        render.set_initial_scheme(settings.color_scheme());
        Self {
            settings,
            highlighter,
            render,
            layers: LayerPipeline::default(),
            viewport: Viewport::default(),
            platform: Platform::default(),
            normalize: NormalizeOptions::default(),
            uploaded: None,
        }
    }

    /// Sets the client that will display uploaded backgrounds.
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Overrides the quality and maximum width used for uploads.
    pub fn with_normalize_options(mut self, options: NormalizeOptions) -> Self {
        self.normalize = options;
        self
    }

    /// The settings store.
    pub fn settings(&self) -> &SettingsStore<B> {
        &self.settings
    }

    /// Mutable settings; highlight-relevant changes are picked up by
    /// [`needs_highlight`](Self::needs_highlight).
    pub fn settings_mut(&mut self) -> &mut SettingsStore<B> {
        &mut self.settings
    }

    /// Consumes the studio, returning its settings store.
    pub fn into_settings(self) -> SettingsStore<B> {
        self.settings
    }

    /// The injected highlighter, for callers that run it off-thread.
    pub fn highlighter(&self) -> &H {
        &self.highlighter
    }

    /// Whether a render exists or is in flight.
    pub fn render_state(&self) -> RenderState {
        self.render.state()
    }

    /// The latest highlighted code, if any.
    pub fn rendered(&self) -> Option<&RenderedCode> {
        self.render.rendered()
    }

    /// Light or dark, derived from the theme background of the last render.
    pub fn color_scheme(&self) -> ColorScheme {
        self.render.scheme()
    }

    // ---- Highlighting ----

    /// True when code, language or theme changed since the last request.
    pub fn needs_highlight(&self) -> bool {
        self.render.needs_highlight(
            &self.settings.code(),
            &self.settings.language(),
            &self.settings.theme(),
        )
    }

    /// Issues a highlight request for the current settings.
    pub fn request_highlight(&mut self) -> HighlightTicket {
        self.render.begin(
            &self.settings.code(),
            &self.settings.language(),
            &self.settings.theme(),
        )
    }

    /// Hands a highlight result back and persists the derived color scheme.
    pub fn complete_highlight(
        &mut self,
        ticket: &HighlightTicket,
        result: Result<HighlightedCode, HighlightError>,
    ) -> Result<Completion, StudioError> {
        let completion = self.render.complete(ticket, result)?;
        if completion == Completion::Applied {
            self.persist_scheme()?;
        }
        Ok(completion)
    }

    /// Highlights the current settings synchronously.
    pub fn refresh(&mut self) -> Result<Completion, StudioError> {
        let ticket = self.request_highlight();
        let result = self.highlighter.highlight(ticket.request());
        self.complete_highlight(&ticket, result)
    }

    fn persist_scheme(&mut self) -> Result<(), SettingsError> {
        let scheme = self.render.scheme();
        let stored = self
            .settings
            .is_set(SettingKey::ColorScheme)
            .then(|| self.settings.color_scheme());
        if stored != Some(scheme) {
            self.settings.set_color_scheme(scheme)?;
        }
        Ok(())
    }

    // ---- Background ----

    /// Normalizes an uploaded image and stores it as the background,
    /// replacing any previous upload.
    pub fn upload_background(&mut self, bytes: &[u8]) -> Result<DataUrl, StudioError> {
        let url = compress_image(bytes, &self.platform, &self.normalize)?;
        self.settings.set_background(url.clone())?;
        log::info!("background replaced ({})", url.mime());
        Ok(url)
    }

    /// Reverts to the built-in background.
    pub fn clear_background(&mut self) -> Result<(), StudioError> {
        self.settings.clear_background()?;
        self.uploaded = None;
        log::info!("background cleared");
        Ok(())
    }

    fn resolve_background(&mut self) -> BackgroundImage {
        let Some(url) = self.settings.background() else {
            self.uploaded = None;
            return BackgroundImage::builtin();
        };
        if let Some((cached_url, image)) = &self.uploaded {
            if *cached_url == url {
                return image.clone();
            }
        }

        match BackgroundImage::from_data_url(&url) {
            Ok(image) => {
                self.uploaded = Some((url, image.clone()));
                image
            }
            Err(err) => {
                log::warn!("stored background is unreadable, keeping the current one: {err}");
                self.layers
                    .backdrop
                    .config()
                    .map(|config| config.background.clone())
                    .unwrap_or_else(BackgroundImage::builtin)
            }
        }
    }

    // ---- Editing ----

    /// Replaces the selection in the stored code with a tab.
    pub fn insert_tab(&mut self, selection: Range<usize>) -> Result<TextEdit, StudioError> {
        let edit = insert_tab(&self.settings.code(), selection);
        self.settings.set_code(edit.text.clone())?;
        Ok(edit)
    }

    // ---- Composition and export ----

    /// Geometry of the current render, or `None` before the first one.
    pub fn composition(&self) -> Option<Composition> {
        let rendered = self.render.rendered()?;
        Some(Composition::new(
            self.settings.layout(),
            self.settings.spacing(),
            &self.settings.title(),
            &rendered.lines,
        ))
    }

    fn sync_layers(&mut self) {
        let Some(lines) = self.render.rendered().map(|r| r.lines.clone()) else {
            return;
        };
        let font = self.settings.font();

        let background = self.resolve_background();
        self.layers
            .backdrop
            .set_config(Some(BackdropConfig::new(background, self.settings.scale())));
        self.layers.panel.set_config(Some(PanelConfig::new(
            self.render.swatch_or_fallback(),
            self.settings.blur(),
            self.settings.opacity(),
        )));
        self.layers
            .chrome
            .set_config(Some(ChromeConfig::new(self.render.scheme(), font.clone())));
        self.layers.code.set_config(Some(CodeConfig::new(lines, font)));
    }

    /// Rasterizes the current composition at the given device scale.
    pub fn compose(&mut self, scale: f32) -> Result<RgbaImage, StudioError> {
        let composition = self.composition().ok_or(ExportError::NothingRendered)?;
        self.sync_layers();
        let request = RasterRequest::for_frame(&composition, scale);
        Ok(self.layers.rasterize(&composition, request)?)
    }

    /// Renders the downloadable JPEG.
    pub fn export_jpeg(&mut self) -> Result<ExportedImage, StudioError> {
        let composition = self.composition().ok_or(ExportError::NothingRendered)?;
        self.sync_layers();
        Ok(export::export_jpeg(&mut self.layers, &composition)?)
    }

    /// Renders the JPEG and writes it into `dir`.
    pub fn export_to(&mut self, dir: &Path) -> Result<PathBuf, StudioError> {
        let exported = self.export_jpeg()?;
        Ok(exported.save_in(dir)?)
    }
}

impl<B: SettingsBackend, H: Highlighter> Configurable for Studio<B, H> {
    fn apply_snapshot(&mut self, snapshot: &SettingsSnapshot) -> Result<(), SettingsError> {
        self.settings.apply_snapshot(snapshot)
    }

    fn export_snapshot(&self) -> SettingsSnapshot {
        self.settings.export_snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::Layout;
    use crate::highlight::{HighlightRequest, StyledSpan};
    use crate::settings::MemoryBackend;
    use palette::Srgb;

    /// Reports a white swatch for "light", fails for "broken", dark otherwise.
    struct FakeHighlighter;

    impl Highlighter for FakeHighlighter {
        fn highlight(&self, request: &HighlightRequest) -> Result<HighlightedCode, HighlightError> {
            let swatch = match request.theme.as_str() {
                "broken" => return Err(HighlightError::Failed("boom".into())),
                "light" => "#ffffff",
                _ => "#1e1e1e",
            };
            Ok(HighlightedCode {
                markup: format!(r#"<pre style="background-color:{swatch};">{}</pre>"#, request.code),
                lines: request
                    .code
                    .split('\n')
                    .map(|line| vec![StyledSpan::new(line, Srgb::new(200, 200, 200))])
                    .collect(),
            })
        }
    }

    fn studio() -> Studio<MemoryBackend, FakeHighlighter> {
        let mut settings = SettingsStore::new(MemoryBackend::new());
        settings.set_code("fn main() {}").unwrap();
        settings.set_theme("dark").unwrap();
        Studio::new(settings, FakeHighlighter)
    }

    fn png(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
        let mut bytes = Vec::new();
        RgbaImage::from_pixel(width, height, image::Rgba([rgb[0], rgb[1], rgb[2], 255]))
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn export_before_render_fails() {
        let mut studio = studio();
        let err = studio.export_jpeg().unwrap_err();
        assert!(matches!(err, StudioError::Export(ExportError::NothingRendered)));
        assert!(studio.composition().is_none());
    }

    #[test]
    fn refresh_persists_color_scheme() {
        let mut studio = studio();
        studio.settings_mut().set_theme("light").unwrap();
        assert!(studio.needs_highlight());

        assert_eq!(studio.refresh().unwrap(), Completion::Applied);
        assert!(!studio.needs_highlight());
        assert_eq!(studio.color_scheme(), ColorScheme::Light);
        assert_eq!(studio.settings().color_scheme(), ColorScheme::Light);
    }

    #[test]
    fn highlight_failure_keeps_previous_render() {
        let mut studio = studio();
        studio.refresh().unwrap();
        let before = studio.rendered().cloned();

        studio.settings_mut().set_theme("broken").unwrap();
        let err = studio.refresh().unwrap_err();
        assert!(matches!(err, StudioError::Highlight(HighlightError::Failed(_))));
        assert_eq!(studio.rendered().cloned(), before);
        assert_eq!(studio.render_state(), RenderState::Rendered);
    }

    #[test]
    fn stale_ticket_is_ignored() {
        let mut studio = studio();
        let old = studio.request_highlight();
        studio.settings_mut().set_theme("light").unwrap();
        let new = studio.request_highlight();

        let fresh = studio.highlighter().highlight(new.request());
        assert_eq!(studio.complete_highlight(&new, fresh).unwrap(), Completion::Applied);
        let late = studio.highlighter().highlight(old.request());
        assert_eq!(studio.complete_highlight(&old, late).unwrap(), Completion::Stale);
        assert_eq!(studio.color_scheme(), ColorScheme::Light);
    }

    #[test]
    fn layout_change_only_touches_chrome() {
        let mut studio = studio();
        studio.refresh().unwrap();
        let plain = studio.composition().unwrap();
        assert!(plain.chrome.is_empty());

        studio.settings_mut().set_layout(Layout::TrafficLights).unwrap();
        assert!(!studio.needs_highlight());
        let lights = studio.composition().unwrap();
        assert_eq!(lights.chrome.len(), 3);
        assert!(lights.title.is_some());
        assert_eq!(lights.frame.width, plain.frame.width);
        assert_eq!(studio.settings().code(), "fn main() {}");
        assert!(studio.settings().background().is_none());
    }

    #[test]
    fn reupload_overwrites_background() {
        let mut studio = studio();
        let first = studio.upload_background(&png(8, 8, [255, 0, 0])).unwrap();
        let second = studio.upload_background(&png(8, 8, [0, 0, 255])).unwrap();

        assert_ne!(first, second);
        assert_eq!(studio.settings().background(), Some(second));
        assert_eq!(studio.settings().background().unwrap().mime(), "image/webp");

        studio.clear_background().unwrap();
        assert!(studio.settings().background().is_none());
    }

    #[test]
    fn safari_uploads_are_jpeg() {
        let mut studio = studio().with_platform(Platform::from_user_agent(
            "Mozilla/5.0 (iPhone) AppleWebKit/605.1.15 Version/17.0 Mobile Safari/604.1",
        ));
        let url = studio.upload_background(&png(4, 4, [1, 2, 3])).unwrap();
        assert_eq!(url.mime(), "image/jpeg");
    }

    #[test]
    fn invalid_upload_keeps_previous_background() {
        let mut studio = studio();
        let first = studio.upload_background(&png(4, 4, [9, 9, 9])).unwrap();
        let err = studio.upload_background(b"not an image").unwrap_err();
        assert!(matches!(err, StudioError::Normalize(_)));
        assert_eq!(studio.settings().background(), Some(first));
    }

    #[test]
    fn insert_tab_updates_code() {
        let mut studio = studio();
        studio.refresh().unwrap();
        let edit = studio.insert_tab(0..0).unwrap();
        assert_eq!(edit.caret, 1);
        assert_eq!(studio.settings().code(), "\tfn main() {}");
        assert!(studio.needs_highlight());
    }

    #[test]
    fn compose_and_export_sizes() {
        let mut studio = studio();
        studio.settings_mut().set_spacing(16).unwrap();
        studio.upload_background(&png(64, 32, [40, 80, 120])).unwrap();
        studio.refresh().unwrap();
        let composition = studio.composition().unwrap();

        let preview = studio.compose(1.0).unwrap();
        assert_eq!(preview.dimensions(), (composition.frame.width, composition.frame.height));
        // The backdrop reaches the frame corner
        assert_eq!(preview.get_pixel(0, 0)[3], 255);

        let exported = studio.export_jpeg().unwrap();
        assert_eq!(exported.width, composition.frame.width * 4);
        assert_eq!(exported.height, composition.frame.height * 4);
        assert_eq!(exported.file_name, "code-monumei.jpg");
    }

    #[test]
    fn export_to_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut studio = studio();
        studio.refresh().unwrap();
        let path = studio.export_to(dir.path()).unwrap();
        assert!(path.ends_with("code-monumei.jpg"));
        assert!(path.exists());
    }

    #[test]
    fn studio_snapshot_round_trip() {
        let mut studio = studio();
        let mut snapshot = studio.export_snapshot();
        snapshot.layout = Layout::WindowControls;
        snapshot.title = "demo".into();
        studio.apply_snapshot(&snapshot).unwrap();
        assert_eq!(studio.settings().layout(), Layout::WindowControls);
        assert_eq!(studio.settings().title(), "demo");
    }
}

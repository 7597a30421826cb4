//! Highlight bookkeeping: which request is current, what was last rendered,
//! and the swatch and color scheme derived from it.
//!
//! Highlighting happens outside this type. Callers take a
//! [`HighlightTicket`] from [`RenderPipeline::begin`], run the highlighter
//! wherever they like, and hand the result back through
//! [`RenderPipeline::complete`]. Only the most recently issued ticket can
//! change the rendered state.

use std::sync::Arc;

use palette::Srgb;

use crate::color::{ColorScheme, extract_swatch, parse_swatch};
use crate::error::HighlightError;
use crate::highlight::{HighlightRequest, HighlightedCode, StyledSpan};

/// Panel color used until a theme has reported its background.
pub const FALLBACK_SWATCH: Srgb<u8> = Srgb::new(0x2b, 0x30, 0x3b);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    /// No markup yet.
    Empty,
    /// A request is in flight.
    Rendering,
    /// Markup is available.
    Rendered,
}

/// Outcome of handing a highlight result back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The result became the rendered state.
    Applied,
    /// A newer request was issued since; the result was dropped.
    Stale,
}

/// Proof of one issued highlight request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightTicket {
    seq: u64,
    request: HighlightRequest,
}

impl HighlightTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// What to pass to the highlighter.
    pub fn request(&self) -> &HighlightRequest {
        &self.request
    }
}

/// The latest successfully highlighted code.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedCode {
    pub markup: String,
    pub lines: Arc<Vec<Vec<StyledSpan>>>,
}

#[derive(Debug, Default)]
pub struct RenderPipeline {
    next_seq: u64,
    latest: Option<u64>,
    in_flight: bool,
    /// Inputs of the latest request, before the trailing space is added.
    last_inputs: Option<HighlightRequest>,
    rendered: Option<RenderedCode>,
    swatch: Option<Srgb<u8>>,
    scheme: ColorScheme,
}

impl RenderPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RenderState {
        if self.in_flight {
            RenderState::Rendering
        } else if self.rendered.is_some() {
            RenderState::Rendered
        } else {
            RenderState::Empty
        }
    }

    pub fn rendered(&self) -> Option<&RenderedCode> {
        self.rendered.as_ref()
    }

    pub fn swatch(&self) -> Option<Srgb<u8>> {
        self.swatch
    }

    pub fn swatch_or_fallback(&self) -> Srgb<u8> {
        self.swatch.unwrap_or(FALLBACK_SWATCH)
    }

    pub fn scheme(&self) -> ColorScheme {
        self.scheme
    }

    /// Seeds the scheme shown before the first render, e.g. from settings.
    pub fn set_initial_scheme(&mut self, scheme: ColorScheme) {
        if self.swatch.is_none() {
            self.scheme = scheme;
        }
    }

    /// True when these inputs differ from the latest issued request.
    pub fn needs_highlight(&self, code: &str, language: &str, theme: &str) -> bool {
        match &self.last_inputs {
            Some(last) => last.code != code || last.language != language || last.theme != theme,
            None => true,
        }
    }

    /// Issues a ticket for highlighting the given inputs.
    ///
    /// Non-empty code sent to the highlighter gets a trailing space so a
    /// final newline still produces a last line. Empty code is sent as is.
    pub fn begin(&mut self, code: &str, language: &str, theme: &str) -> HighlightTicket {
        self.next_seq += 1;
        self.latest = Some(self.next_seq);
        self.in_flight = true;
        self.last_inputs = Some(HighlightRequest {
            code: code.to_string(),
            language: language.to_string(),
            theme: theme.to_string(),
        });

        log::debug!("highlight #{} requested ({language}, {theme})", self.next_seq);
        HighlightTicket {
            seq: self.next_seq,
            request: HighlightRequest {
                code: if code.is_empty() { String::new() } else { format!("{code} ") },
                language: language.to_string(),
                theme: theme.to_string(),
            },
        }
    }

    /// Accepts the result for a ticket.
    ///
    /// A stale ticket is dropped. A failure of the current ticket leaves the
    /// previous render in place and is handed back to the caller.
    pub fn complete(
        &mut self,
        ticket: &HighlightTicket,
        result: Result<HighlightedCode, HighlightError>,
    ) -> Result<Completion, HighlightError> {
        if self.latest != Some(ticket.seq) {
            log::debug!("dropping stale highlight #{}", ticket.seq);
            return Ok(Completion::Stale);
        }
        self.in_flight = false;

        let highlighted = match result {
            Ok(highlighted) => highlighted,
            Err(err) => {
                log::warn!("highlight #{} failed, keeping previous render: {err}", ticket.seq);
                return Err(err);
            }
        };

        match extract_swatch(&highlighted.markup) {
            Some(hex) => {
                let scheme = ColorScheme::from_swatch(&hex);
                self.swatch = parse_swatch(&hex).or(self.swatch);
                if scheme != self.scheme {
                    log::debug!("color scheme is now {scheme} (swatch {hex})");
                }
                self.scheme = scheme;
            }
            None => log::debug!("no background swatch in markup, keeping {}", self.scheme),
        }

        self.rendered = Some(RenderedCode {
            markup: highlighted.markup,
            lines: Arc::new(highlighted.lines),
        });
        Ok(Completion::Applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn markup(swatch: &str) -> HighlightedCode {
        HighlightedCode {
            markup: format!(r#"<pre style="background-color:{swatch};">x</pre>"#),
            lines: vec![vec![StyledSpan::new("x", Srgb::new(0, 0, 0))]],
        }
    }

    #[test]
    fn begin_appends_trailing_space() {
        let mut pipeline = RenderPipeline::new();
        let ticket = pipeline.begin("line\n", "rust", "InspiredGitHub");
        assert_eq!(ticket.request().code, "line\n ");
        assert_eq!(pipeline.state(), RenderState::Rendering);
        assert!(!pipeline.needs_highlight("line\n", "rust", "InspiredGitHub"));
        assert!(pipeline.needs_highlight("line\n", "rust", "base16-ocean.dark"));
    }

    #[test]
    fn empty_code_gets_no_trailing_space() {
        let mut pipeline = RenderPipeline::new();
        let ticket = pipeline.begin("", "rust", "InspiredGitHub");
        assert_eq!(ticket.request().code, "");
        assert!(!pipeline.needs_highlight("", "rust", "InspiredGitHub"));
    }

    #[test]
    fn completion_derives_swatch_and_scheme() {
        let mut pipeline = RenderPipeline::new();
        assert_eq!(pipeline.state(), RenderState::Empty);

        let ticket = pipeline.begin("x", "rust", "InspiredGitHub");
        let done = pipeline.complete(&ticket, Ok(markup("#ffffff"))).unwrap();

        assert_eq!(done, Completion::Applied);
        assert_eq!(pipeline.state(), RenderState::Rendered);
        assert_eq!(pipeline.scheme(), ColorScheme::Light);
        assert_eq!(pipeline.swatch(), Some(Srgb::new(255, 255, 255)));
    }

    #[test]
    fn stale_completion_never_overwrites_newer_render() {
        let mut pipeline = RenderPipeline::new();
        let old = pipeline.begin("old", "rust", "t");
        let new = pipeline.begin("new", "rust", "t");

        assert_eq!(pipeline.complete(&new, Ok(markup("#000000"))).unwrap(), Completion::Applied);
        assert_eq!(pipeline.complete(&old, Ok(markup("#ffffff"))).unwrap(), Completion::Stale);

        assert_eq!(pipeline.scheme(), ColorScheme::Dark);
        assert!(pipeline.rendered().unwrap().markup.contains("#000000"));
    }

    #[test]
    fn failure_keeps_previous_render() {
        let mut pipeline = RenderPipeline::new();
        let first = pipeline.begin("a", "rust", "t");
        pipeline.complete(&first, Ok(markup("#eeeeee"))).unwrap();

        let second = pipeline.begin("b", "rust", "missing");
        let err = pipeline
            .complete(&second, Err(HighlightError::UnknownTheme("missing".into())))
            .unwrap_err();

        assert!(matches!(err, HighlightError::UnknownTheme(_)));
        assert_eq!(pipeline.state(), RenderState::Rendered);
        assert!(pipeline.rendered().unwrap().markup.contains("#eeeeee"));
        assert_eq!(pipeline.scheme(), ColorScheme::Light);
    }

    #[test]
    fn missing_swatch_keeps_previous_scheme() {
        let mut pipeline = RenderPipeline::new();
        let first = pipeline.begin("a", "rust", "t");
        pipeline.complete(&first, Ok(markup("#fafafa"))).unwrap();

        let second = pipeline.begin("b", "rust", "t");
        let plain = HighlightedCode {
            markup: "<pre>b</pre>".into(),
            lines: vec![],
        };
        pipeline.complete(&second, Ok(plain)).unwrap();

        assert_eq!(pipeline.scheme(), ColorScheme::Light);
        assert_eq!(pipeline.swatch(), Some(Srgb::new(0xfa, 0xfa, 0xfa)));
        assert_eq!(pipeline.rendered().unwrap().markup, "<pre>b</pre>");
    }

    #[test]
    fn malformed_swatch_falls_back_to_dark() {
        let mut pipeline = RenderPipeline::new();
        let first = pipeline.begin("a", "rust", "t");
        pipeline.complete(&first, Ok(markup("#ffffff"))).unwrap();

        let second = pipeline.begin("b", "rust", "t");
        pipeline.complete(&second, Ok(markup("#zzzzzz"))).unwrap();
        assert_eq!(pipeline.scheme(), ColorScheme::Dark);
        // The unparseable color does not replace the last good one
        assert_eq!(pipeline.swatch(), Some(Srgb::new(255, 255, 255)));
    }
}

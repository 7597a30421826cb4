//! Geometry of a composed code screenshot.
//!
//! A [`Composition`] is the visual tree reduced to what the layers need:
//! the frame (the exported area), the code panel inside it, the window
//! chrome drawn on the panel, where the highlighted lines start, and where
//! the editable text overlay sits. All values are CSS pixels at 1×; layers
//! multiply them by the device scale.

use std::fmt;

use palette::Srgb;
use serde::{Deserialize, Serialize};

use crate::geometry::{RectPx, SizePx};
use crate::highlight::StyledSpan;
use crate::settings::MAX_SPACING;

pub const FONT_SIZE: f32 = 18.0;
pub const LINE_HEIGHT: f32 = 28.0;
/// Horizontal advance of one monospace column.
pub const CHAR_ADVANCE: f32 = FONT_SIZE * 0.6;
pub const TAB_WIDTH: usize = 4;

pub const CODE_PADDING: u32 = 16;
/// Top padding of the code when a title bar is drawn.
pub const CHROME_PADDING_TOP: u32 = 36;
pub const MIN_CONTENT_WIDTH: u32 = 208;
pub const MIN_CONTENT_HEIGHT: u32 = 28;
pub const MIN_FRAME_WIDTH: u32 = 208;
pub const MAX_FRAME_WIDTH: u32 = 1280;
/// Width of the box the background image is cover-fitted into.
pub const BACKGROUND_BOX_WIDTH: u32 = 1280;
pub const PANEL_RADIUS: f32 = 16.0;

pub const TITLE_FONT_SIZE: f32 = 14.0;
pub const TITLE_PLACEHOLDER: &str = "code.monumei";
/// Vertical center of the title bar, relative to the panel top.
const HEADER_CENTER_Y: f32 = 18.0;

pub const TRAFFIC_LIGHT_COLORS: [Srgb<u8>; 3] = [
    Srgb::new(0xff, 0x60, 0x5c),
    Srgb::new(0xff, 0xbd, 0x44),
    Srgb::new(0x00, 0xca, 0x4e),
];
const TRAFFIC_LIGHT_DIAMETER: f32 = 14.0;
const TRAFFIC_LIGHT_LEFT: [f32; 3] = [12.0, 34.0, 56.0];

// ============================================================================
// Layout
// ============================================================================

/// One of the five window-chrome presets, persisted as 1-5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Layout {
    /// No title bar.
    #[default]
    Plain,
    CenteredTitle,
    /// macOS-style buttons and a centered title.
    TrafficLights,
    /// Minimize/maximize/close on the right and a centered title.
    WindowControls,
    /// Window controls and a left-aligned title.
    WindowControlsLeftTitle,
}

impl Layout {
    pub const ALL: [Layout; 5] = [
        Self::Plain,
        Self::CenteredTitle,
        Self::TrafficLights,
        Self::WindowControls,
        Self::WindowControlsLeftTitle,
    ];

    /// The persisted 1-based index.
    pub fn index(&self) -> u8 {
        match self {
            Self::Plain => 1,
            Self::CenteredTitle => 2,
            Self::TrafficLights => 3,
            Self::WindowControls => 4,
            Self::WindowControlsLeftTitle => 5,
        }
    }

    /// True for every layout that reserves a header above the code.
    pub fn has_title_bar(&self) -> bool {
        !matches!(self, Self::Plain)
    }

    /// Where the title sits, or `None` when the layout has no title.
    pub fn title_align(&self) -> Option<TitleAlign> {
        match self {
            Self::Plain => None,
            Self::WindowControlsLeftTitle => Some(TitleAlign::Left),
            _ => Some(TitleAlign::Center),
        }
    }

    /// Space between the panel top and the first code line.
    pub fn padding_top(&self) -> u32 {
        if self.has_title_bar() { CHROME_PADDING_TOP } else { CODE_PADDING }
    }
}

impl TryFrom<u8> for Layout {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|layout| layout.index() == value)
            .ok_or_else(|| format!("layout must be between 1 and 5, got {value}"))
    }
}

impl From<Layout> for u8 {
    fn from(layout: Layout) -> Self {
        layout.index()
    }
}

#[cfg(feature = "jsonschema")]
impl schemars::JsonSchema for Layout {
    fn schema_name() -> String {
        "Layout".to_string()
    }

    fn json_schema(generator: &mut schemars::r#gen::SchemaGenerator) -> schemars::schema::Schema {
        let mut schema = <u8 as schemars::JsonSchema>::json_schema(generator).into_object();
        let number = schema.number();
        number.minimum = Some(1.0);
        number.maximum = Some(5.0);
        schema.into()
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

// ============================================================================
// Chrome
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleAlign {
    Left,
    Center,
}

/// A decoration drawn in the title bar, in frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChromeItem {
    TrafficLight { cx: f32, cy: f32, radius: f32, color: Srgb<u8> },
    Minimize { cx: f32, cy: f32, size: f32 },
    Maximize { cx: f32, cy: f32, size: f32 },
    Close { cx: f32, cy: f32, size: f32 },
}

/// The title text, or its placeholder when no title is set.
#[derive(Debug, Clone, PartialEq)]
pub struct TitleText {
    pub text: String,
    pub is_placeholder: bool,
    pub align: TitleAlign,
    /// Anchor x: the left edge or the center, depending on `align`.
    pub x: f32,
    pub baseline: f32,
}

// ============================================================================
// Composition
// ============================================================================

/// Resolved geometry of one composed frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    pub layout: Layout,
    /// The exported area.
    pub frame: SizePx,
    /// The rounded code panel, inset by the spacing.
    pub panel: RectPx,
    /// Top-left corner of the first code line.
    pub code_origin: (f32, f32),
    /// Region of the editable text overlay aligned over the highlighted code.
    pub editor: RectPx,
    pub chrome: Vec<ChromeItem>,
    pub title: Option<TitleText>,
}

impl Composition {
    /// Lays out highlighted lines with the given chrome preset and spacing.
    ///
    /// Spacing above [`MAX_SPACING`] is treated as the maximum.
    pub fn new(layout: Layout, spacing: u32, title: &str, lines: &[Vec<StyledSpan>]) -> Self {
        let spacing = spacing.min(MAX_SPACING);
        let columns = lines.iter().map(|line| line_columns(line)).max().unwrap_or(0);
        let content_width = ((columns as f32 * CHAR_ADVANCE).ceil() as u32).max(MIN_CONTENT_WIDTH);
        let content_height =
            ((lines.len() as f32 * LINE_HEIGHT).ceil() as u32).max(MIN_CONTENT_HEIGHT);

        let padding_top = layout.padding_top();
        let wanted_panel_width = content_width.saturating_add(2 * CODE_PADDING);
        let frame_width =
            wanted_panel_width.saturating_add(2 * spacing).clamp(MIN_FRAME_WIDTH, MAX_FRAME_WIDTH);
        let panel_width = frame_width.saturating_sub(2 * spacing).max(1);
        let panel_height = padding_top
            .saturating_add(content_height)
            .saturating_add(CODE_PADDING);

        let inset = spacing as i32;
        let panel = RectPx::new(inset, inset, panel_width, panel_height);
        let frame = SizePx::new(frame_width, panel_height.saturating_add(2 * spacing));

        let code_origin = (
            panel.x as f32 + CODE_PADDING as f32,
            panel.y as f32 + padding_top as f32,
        );

        let (editor_top, editor_shrink) = if layout.has_title_bar() { (36, 32) } else { (16, 8) };
        let editor = RectPx::new(
            panel.x,
            panel.y + editor_top,
            panel.width,
            panel.height.saturating_sub(editor_shrink),
        );

        Self {
            layout,
            frame,
            panel,
            code_origin,
            editor,
            chrome: chrome_items(layout, panel),
            title: title_text(layout, panel, title),
        }
    }

    /// The frame as a rectangle at the origin.
    pub fn frame_rect(&self) -> RectPx {
        RectPx::from_size(self.frame)
    }

    /// Box behind the whole frame that the sharp background covers.
    pub fn backdrop_box(&self) -> RectPx {
        centered_box(self.frame_rect(), BACKGROUND_BOX_WIDTH, self.frame.height)
    }

    /// Box behind the panel interior that the blurred background covers.
    pub fn panel_box(&self) -> RectPx {
        centered_box(self.panel, BACKGROUND_BOX_WIDTH, self.panel.height)
    }

    /// Baseline y of the given code line.
    pub fn line_baseline(&self, index: usize) -> f32 {
        self.code_origin.1 + index as f32 * LINE_HEIGHT + LINE_HEIGHT / 2.0 + FONT_SIZE * 0.35
    }
}

fn centered_box(around: RectPx, width: u32, height: u32) -> RectPx {
    let (cx, cy) = around.center();
    RectPx::new(
        (cx - width as f32 / 2.0).round() as i32,
        (cy - height as f32 / 2.0).round() as i32,
        width,
        height,
    )
}

fn chrome_items(layout: Layout, panel: RectPx) -> Vec<ChromeItem> {
    let cy = panel.y as f32 + HEADER_CENTER_Y;
    let left = panel.x as f32;
    let right = panel.right() as f32;

    match layout {
        Layout::Plain | Layout::CenteredTitle => Vec::new(),
        Layout::TrafficLights => TRAFFIC_LIGHT_LEFT
            .iter()
            .zip(TRAFFIC_LIGHT_COLORS)
            .map(|(offset, color)| ChromeItem::TrafficLight {
                cx: left + offset + TRAFFIC_LIGHT_DIAMETER / 2.0,
                cy,
                radius: TRAFFIC_LIGHT_DIAMETER / 2.0,
                color,
            })
            .collect(),
        Layout::WindowControls | Layout::WindowControlsLeftTitle => vec![
            ChromeItem::Minimize { cx: right - 80.0 - 8.0, cy, size: 16.0 },
            ChromeItem::Maximize { cx: right - 48.0 - 6.0, cy, size: 12.0 },
            ChromeItem::Close { cx: right - 14.0 - 8.0, cy, size: 16.0 },
        ],
    }
}

fn title_text(layout: Layout, panel: RectPx, title: &str) -> Option<TitleText> {
    let align = layout.title_align()?;
    let is_placeholder = title.is_empty();
    let x = match align {
        TitleAlign::Left => panel.x as f32 + 16.0,
        TitleAlign::Center => panel.x as f32 + panel.width as f32 / 2.0,
    };
    Some(TitleText {
        text: if is_placeholder { TITLE_PLACEHOLDER.to_string() } else { title.to_string() },
        is_placeholder,
        align,
        x,
        baseline: panel.y as f32 + HEADER_CENTER_Y + TITLE_FONT_SIZE * 0.35,
    })
}

/// Number of monospace columns a highlighted line occupies.
pub fn line_columns(line: &[StyledSpan]) -> usize {
    let mut column = 0;
    for span in line {
        column += expand_tabs(&span.text, column).chars().count();
    }
    column
}

/// Replaces tabs with spaces up to the next tab stop, given the column the
/// text starts at.
pub fn expand_tabs(text: &str, start_column: usize) -> String {
    if !text.contains('\t') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len() + TAB_WIDTH);
    let mut column = start_column;
    for ch in text.chars() {
        if ch == '\t' {
            let width = TAB_WIDTH - column % TAB_WIDTH;
            out.extend(std::iter::repeat_n(' ', width));
            column += width;
        } else {
            out.push(ch);
            column += 1;
        }
    }
    out
}

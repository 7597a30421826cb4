//! Editing helpers for the code text area.

use std::ops::Range;

/// Result of an edit: the new text and where the caret ends up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub text: String,
    /// Byte offset of the caret.
    pub caret: usize,
}

/// Replaces the selection with a tab character.
///
/// The selection is a byte range; it is clamped to the text and widened to
/// the nearest char boundaries. An empty range inserts at that offset.
///
/// ```
/// use codeshot_renderer::insert_tab;
///
/// let edit = insert_tab("fn main() {}", 11..11);
/// assert_eq!(edit.text, "fn main() {\t}");
/// assert_eq!(edit.caret, 12);
/// ```
pub fn insert_tab(text: &str, selection: Range<usize>) -> TextEdit {
    let start = floor_char_boundary(text, selection.start.min(selection.end));
    let end = ceil_char_boundary(text, selection.end.max(selection.start));

    let mut out = String::with_capacity(text.len() + 1);
    out.push_str(&text[..start]);
    out.push('\t');
    out.push_str(&text[end..]);

    TextEdit {
        text: out,
        caret: start + 1,
    }
}

fn floor_char_boundary(text: &str, index: usize) -> usize {
    let mut index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn ceil_char_boundary(text: &str, index: usize) -> usize {
    let mut index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index += 1;
    }
    index
}

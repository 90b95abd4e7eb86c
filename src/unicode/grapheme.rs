//! Grapheme cluster layout.

use unicode_segmentation::UnicodeSegmentation;

use crate::unicode::width::{WidthMethod, display_width_with_method, tab_advance};

/// Grapheme metadata for layout. Offsets are chars from the start of the
/// string.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GraphemeInfo {
    pub char_offset: usize,
    pub char_len: usize,
    pub col_offset: usize,
    pub width: usize,
}

impl GraphemeInfo {
    #[must_use]
    pub fn char_end(&self) -> usize {
        self.char_offset + self.char_len
    }
}

/// Iterate over grapheme clusters in a string.
pub fn graphemes(s: &str) -> impl Iterator<Item = &str> {
    s.graphemes(true)
}

/// Compute grapheme info for a string. Tabs expand to the next tab stop.
#[must_use]
pub fn grapheme_info(s: &str, tab_width: usize, method: WidthMethod) -> Vec<GraphemeInfo> {
    let mut infos = Vec::new();
    let mut col = 0usize;
    let mut offset = 0usize;

    for grapheme in s.graphemes(true) {
        let width = if grapheme == "\t" {
            tab_advance(col, tab_width)
        } else {
            display_width_with_method(grapheme, method)
        };
        let char_len = grapheme.chars().count();
        infos.push(GraphemeInfo {
            char_offset: offset,
            char_len,
            col_offset: col,
            width,
        });
        col += width;
        offset += char_len;
    }

    infos
}

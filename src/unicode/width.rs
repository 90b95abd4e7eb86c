//! Display width calculation.

use serde::Deserialize;
use unicode_width::UnicodeWidthStr;

/// Width calculation method for ambiguous-width characters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidthMethod {
    /// POSIX-like wcwidth: ambiguous width = 1.
    #[default]
    WcWidth,
    /// Unicode East Asian Width: ambiguous width = 2.
    Unicode,
}

/// Display width of a string in columns using a specific method.
#[must_use]
pub fn display_width_with_method(s: &str, method: WidthMethod) -> usize {
    if s.is_ascii() && s.bytes().all(|b| (b' '..=b'~').contains(&b)) {
        return s.len();
    }
    match method {
        WidthMethod::WcWidth => UnicodeWidthStr::width(s),
        WidthMethod::Unicode => UnicodeWidthStr::width_cjk(s),
    }
}

/// Columns a tab advances when it starts at `column`.
#[must_use]
pub fn tab_advance(column: usize, tab_width: usize) -> usize {
    let tab_width = tab_width.max(1);
    tab_width - (column % tab_width)
}

//! Rope wrapper using the ropey crate.

use ropey::{Rope, RopeSlice};

/// Wrapper around `ropey::Rope` exposing line geometry without terminators.
#[derive(Clone, Debug, Default)]
pub struct RopeWrapper {
    rope: Rope,
}

/// Characters ropey treats as line breaks (besides the CRLF pair).
fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\u{000B}' | '\u{000C}' | '\u{0085}' | '\u{2028}' | '\u{2029}'
    )
}

/// Number of trailing chars of `line` that form its terminator.
fn terminator_len(line: RopeSlice<'_>) -> usize {
    let len = line.len_chars();
    if len == 0 {
        return 0;
    }
    let last = line.char(len - 1);
    if last == '\n' && len >= 2 && line.char(len - 2) == '\r' {
        2
    } else if is_line_break(last) {
        1
    } else {
        0
    }
}

impl RopeWrapper {
    /// Create an empty rope.
    #[must_use]
    pub fn new() -> Self {
        Self { rope: Rope::new() }
    }

    /// Create a rope from a string.
    #[must_use]
    pub fn from_str(s: &str) -> Self {
        Self {
            rope: Rope::from_str(s),
        }
    }

    #[must_use]
    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    /// Number of lines; an empty rope has one empty line.
    #[must_use]
    pub fn len_lines(&self) -> usize {
        self.rope.len_lines()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rope.len_bytes() == 0
    }

    /// Line `idx` including its terminator.
    #[must_use]
    pub fn line(&self, idx: usize) -> Option<RopeSlice<'_>> {
        (idx < self.rope.len_lines()).then(|| self.rope.line(idx))
    }

    /// Line `idx` without its terminator.
    #[must_use]
    pub fn line_content(&self, idx: usize) -> Option<RopeSlice<'_>> {
        let line = self.line(idx)?;
        let end = line.len_chars() - terminator_len(line);
        Some(line.slice(..end))
    }

    /// Char length of line `idx` without its terminator.
    #[must_use]
    pub fn line_len(&self, idx: usize) -> Option<usize> {
        let line = self.line(idx)?;
        Some(line.len_chars() - terminator_len(line))
    }

    /// Slice `start..end` (chars); `None` if out of range.
    #[must_use]
    pub fn slice(&self, start: usize, end: usize) -> Option<RopeSlice<'_>> {
        self.rope.get_slice(start..end)
    }

    /// Insert text at a character position. Caller validates the index.
    pub fn insert(&mut self, char_idx: usize, text: &str) {
        self.rope.insert(char_idx, text);
    }

    /// Remove `start..end` (chars). Caller validates the range.
    pub fn remove(&mut self, start: usize, end: usize) {
        self.rope.remove(start..end);
    }

    /// Replace the entire contents.
    pub fn replace(&mut self, text: &str) {
        self.rope = Rope::from_str(text);
    }

    #[must_use]
    pub fn to_string(&self) -> String {
        self.rope.to_string()
    }

    /// Line containing `char_idx`; `char_idx == len_chars` maps to the last line.
    #[must_use]
    pub fn char_to_line(&self, char_idx: usize) -> usize {
        self.rope.char_to_line(char_idx.min(self.len_chars()))
    }

    /// Char index at the start of a line.
    #[must_use]
    pub fn line_to_char(&self, line_idx: usize) -> usize {
        if line_idx >= self.len_lines() {
            self.len_chars()
        } else {
            self.rope.line_to_char(line_idx)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rope_multiline() {
        let rope = RopeWrapper::from_str("Line 1\nLine 2\nLine 3");
        assert_eq!(rope.len_lines(), 3);
        assert_eq!(rope.line(0).unwrap().to_string(), "Line 1\n");
        assert_eq!(rope.line_content(0).unwrap().to_string(), "Line 1");
        assert_eq!(rope.line_content(2).unwrap().to_string(), "Line 3");
    }

    #[test]
    fn test_line_len_crlf() {
        let rope = RopeWrapper::from_str("ab\r\ncd\n");
        assert_eq!(rope.len_lines(), 3);
        assert_eq!(rope.line_len(0), Some(2));
        assert_eq!(rope.line_len(1), Some(2));
        assert_eq!(rope.line_len(2), Some(0));
        assert_eq!(rope.line_len(3), None);
    }

    #[test]
    fn test_rope_insert_remove() {
        let mut rope = RopeWrapper::from_str("Hello!");
        rope.insert(5, ", world");
        assert_eq!(rope.to_string(), "Hello, world!");
        rope.remove(5, 12);
        assert_eq!(rope.to_string(), "Hello!");
    }
}

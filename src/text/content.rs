//! Character content with a line-offset index.
//!
//! [`ContentStore`] owns the raw text of a buffer. Offsets are counted in
//! chars. Line geometry never includes the line terminator, so
//! `line_end(n) - line_start(n)` is the visible length of line `n`.
//!
//! The line index lives inside the rope: each tree node caches the number of
//! line breaks below it, so an edit only updates the nodes on the path to the
//! edit point. Line starts after the edit shift implicitly by the edit delta.

use std::borrow::Cow;

use tracing::trace;

use crate::error::{Error, Result};
use crate::event::EditEvent;
use crate::text::rope::RopeWrapper;

/// Source of line text for tokenizing and fold computation.
pub trait LineSource {
    fn line_count(&self) -> usize;

    /// Text of `line` without its terminator. Out-of-range lines are empty.
    fn line_text(&self, line: usize) -> Cow<'_, str>;
}

/// Raw text storage with line lookup.
#[derive(Clone, Debug, Default)]
pub struct ContentStore {
    rope: RopeWrapper,
}

impl ContentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_text(text: &str) -> Self {
        Self {
            rope: RopeWrapper::from_str(text),
        }
    }

    /// Replace the whole content.
    pub fn set_text(&mut self, text: &str) {
        self.rope.replace(text);
    }

    #[must_use]
    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rope.is_empty()
    }

    /// Number of lines. Never zero.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Insert `text` at char `offset`.
    pub fn insert(&mut self, offset: usize, text: &str) -> Result<EditEvent> {
        let len = self.len_chars();
        if offset > len {
            return Err(Error::offset(offset, len + 1));
        }
        let start_line = self.rope.char_to_line(offset);
        if text.is_empty() {
            return Ok(EditEvent::insert(start_line, offset, 0, 0));
        }

        let lines_before = self.rope.len_lines();
        self.rope.insert(offset, text);
        let added = self.rope.len_lines() - lines_before;
        let length = self.len_chars() - len;
        trace!(offset, length, start_line, added, "content insert");
        Ok(EditEvent::insert(start_line, offset, length, added))
    }

    /// Remove `length` chars starting at `offset`.
    pub fn remove(&mut self, offset: usize, length: usize) -> Result<EditEvent> {
        let len = self.len_chars();
        let end = offset
            .checked_add(length)
            .ok_or_else(|| Error::offset(usize::MAX, len + 1))?;
        if end > len {
            return Err(Error::offset(end, len + 1));
        }
        let start_line = self.rope.char_to_line(offset);
        if length == 0 {
            return Ok(EditEvent::remove(start_line, offset, 0, 0));
        }

        let lines_before = self.rope.len_lines();
        self.rope.remove(offset, end);
        let removed = lines_before - self.rope.len_lines();
        trace!(offset, length, start_line, removed, "content remove");
        Ok(EditEvent::remove(start_line, offset, length, removed))
    }

    /// Line containing char `offset`. `offset == len_chars()` is valid.
    pub fn line_of_offset(&self, offset: usize) -> Result<usize> {
        let len = self.len_chars();
        if offset > len {
            return Err(Error::offset(offset, len + 1));
        }
        Ok(self.rope.char_to_line(offset))
    }

    /// Char offset of the first character of `line`.
    pub fn line_start(&self, line: usize) -> Result<usize> {
        self.check_line(line)?;
        Ok(self.rope.line_to_char(line))
    }

    /// Char offset just past the last visible character of `line`.
    pub fn line_end(&self, line: usize) -> Result<usize> {
        let start = self.line_start(line)?;
        Ok(start + self.line_len(line)?)
    }

    /// Visible length of `line`, terminator excluded.
    pub fn line_len(&self, line: usize) -> Result<usize> {
        self.rope
            .line_len(line)
            .ok_or_else(|| Error::line(line, self.line_count()))
    }

    /// Text of `line` without its terminator.
    pub fn line(&self, line: usize) -> Result<Cow<'_, str>> {
        let slice = self
            .rope
            .line_content(line)
            .ok_or_else(|| Error::line(line, self.line_count()))?;
        Ok(Cow::from(slice))
    }

    /// `length` chars starting at `start`.
    pub fn text(&self, start: usize, length: usize) -> Result<String> {
        let len = self.len_chars();
        let end = start
            .checked_add(length)
            .ok_or_else(|| Error::offset(usize::MAX, len + 1))?;
        self.rope
            .slice(start, end)
            .map(|slice| slice.to_string())
            .ok_or_else(|| Error::offset(end, len + 1))
    }

    #[must_use]
    pub fn to_string(&self) -> String {
        self.rope.to_string()
    }

    fn check_line(&self, line: usize) -> Result<()> {
        let count = self.line_count();
        if line >= count {
            return Err(Error::line(line, count));
        }
        Ok(())
    }
}

impl LineSource for ContentStore {
    fn line_count(&self) -> usize {
        Self::line_count(self)
    }

    fn line_text(&self, line: usize) -> Cow<'_, str> {
        self.line(line).unwrap_or(Cow::Borrowed(""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RangeKind;
    use crate::event::EditKind;

    #[test]
    fn test_line_geometry() {
        let store = ContentStore::with_text("one\ntwo\r\nthree");
        assert_eq!(store.line_count(), 3);
        assert_eq!(store.line_start(1).unwrap(), 4);
        assert_eq!(store.line_end(1).unwrap(), 7);
        assert_eq!(store.line_start(2).unwrap(), 9);
        assert_eq!(store.line_end(2).unwrap(), 14);
        assert_eq!(store.line(1).unwrap(), "two");
        assert_eq!(store.line_of_offset(8).unwrap(), 1);
        assert_eq!(store.line_of_offset(14).unwrap(), 2);
    }

    #[test]
    fn test_insert_event() {
        let mut store = ContentStore::with_text("abc\ndef");
        let event = store.insert(1, "X\nY\nZ").unwrap();
        assert_eq!(store.to_string(), "aX\nY\nZbc\ndef");
        assert_eq!(event.kind, EditKind::Insert);
        assert_eq!(event.start_line, 0);
        assert_eq!(event.offset_delta, 5);
        assert_eq!(event.line_delta, 2);
        assert_eq!(store.line_count(), 4);
    }

    #[test]
    fn test_remove_event() {
        let mut store = ContentStore::with_text("a\nb\nc\nd");
        let event = store.remove(1, 4).unwrap();
        assert_eq!(store.to_string(), "a\nd");
        assert_eq!(event.start_line, 0);
        assert_eq!(event.line_delta, -2);
        assert_eq!(event.offset_delta, -4);
    }

    #[test]
    fn test_insert_inside_crlf_splits_line() {
        let mut store = ContentStore::with_text("a\r\nb");
        let event = store.insert(2, "x").unwrap();
        assert_eq!(store.line_count(), 3);
        assert_eq!(event.line_delta, 1);
        assert_eq!(store.line(1).unwrap(), "x");
    }

    #[test]
    fn test_out_of_range_rejected() {
        let mut store = ContentStore::with_text("abc");
        let err = store.insert(4, "x").unwrap_err();
        assert!(matches!(
            err,
            Error::Range {
                kind: RangeKind::Offset,
                index: 4,
                ..
            }
        ));
        assert!(store.remove(2, 2).is_err());
        assert!(store.remove(usize::MAX, 2).is_err());
        assert!(store.line_start(1).is_err());
        assert!(store.text(1, 5).is_err());
        assert!(store.line_of_offset(4).is_err());
        assert_eq!(store.to_string(), "abc");
    }

    #[test]
    fn test_empty_edits_are_noops() {
        let mut store = ContentStore::with_text("abc");
        assert!(store.insert(3, "").unwrap().is_noop());
        assert!(store.remove(1, 0).unwrap().is_noop());
        assert_eq!(store.to_string(), "abc");
    }

    #[test]
    fn test_text_slice() {
        let store = ContentStore::with_text("héllo\nwörld");
        assert_eq!(store.text(1, 4).unwrap(), "éllo");
        assert_eq!(store.text(6, 5).unwrap(), "wörld");
    }
}

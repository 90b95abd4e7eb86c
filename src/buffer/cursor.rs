//! Single-cursor invalidation shared by the per-line caches.
//!
//! Every line before `first_invalid` holds a trustworthy value; every line at
//! or after it is treated as stale. `last_dirty` is the highest line whose
//! text changed since the cache last settled, so that a recompute which
//! converges before a pending edit does not declare the edited lines valid.
//!
//! Lines past `first_invalid` keep their old values: each of them agrees with
//! its predecessor's cached value unless it is the first invalid line or lies
//! at or before `last_dirty`.

use crate::event::EditEvent;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InvalidationCursor {
    first_invalid: Option<usize>,
    last_dirty: Option<usize>,
}

impl Default for InvalidationCursor {
    fn default() -> Self {
        Self::all_invalid()
    }
}

impl InvalidationCursor {
    /// Every line stale, as after a reset.
    #[must_use]
    pub fn all_invalid() -> Self {
        Self {
            first_invalid: Some(0),
            last_dirty: None,
        }
    }

    #[must_use]
    pub fn first_invalid(&self) -> Option<usize> {
        self.first_invalid
    }

    #[must_use]
    pub fn last_dirty(&self) -> Option<usize> {
        self.last_dirty
    }

    #[must_use]
    pub fn is_valid(&self, line: usize) -> bool {
        self.first_invalid.is_none_or(|first| line < first)
    }

    pub fn reset(&mut self) {
        *self = Self::all_invalid();
    }

    /// Mark `line` and everything after it stale.
    pub fn invalidate_from(&mut self, line: usize) {
        self.first_invalid = Some(self.first_invalid.map_or(line, |first| first.min(line)));
    }

    /// Record a text edit: stale from the edit line, dirty through the last
    /// changed line.
    ///
    /// A previous stale frontier past the edit stays dirty: the line there
    /// may disagree with its predecessor even though its text is unchanged.
    pub fn record_edit(&mut self, event: &EditEvent) {
        let mut dirty = event.last_changed_line();
        for line in [self.last_dirty, self.first_invalid].into_iter().flatten() {
            dirty = dirty.max(event.map_line(line));
        }
        self.last_dirty = Some(dirty);
        self.invalidate_from(event.start_line);
    }

    /// Extend the dirty range through `line` without moving the cursor.
    pub fn extend_dirty(&mut self, line: usize) {
        self.last_dirty = Some(self.last_dirty.map_or(line, |dirty| dirty.max(line)));
    }

    /// Move the cursor after lines `..=line` were recomputed.
    ///
    /// `changed` tells whether the recomputed value of `line` differs from
    /// the value cached before.
    pub fn settle(&mut self, line: usize, changed: bool, line_count: usize) {
        let at_end = line + 1 >= line_count;
        let pending_edit_after = self.last_dirty.is_some_and(|dirty| dirty > line);
        if at_end || (!changed && !pending_edit_after) {
            self.first_invalid = None;
            self.last_dirty = None;
        } else {
            self.first_invalid = Some(line + 1);
            if !pending_edit_after {
                self.last_dirty = None;
            }
        }
    }
}

//! Fold levels.
//!
//! A [`FoldHandler`] computes the level of a line from the previous line's
//! level and text. [`FoldLevelTracker`] caches levels per line with the same
//! cursor discipline as the context cache, and reports the lines whose
//! recomputed level differs from the cached one.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::buffer::cursor::InvalidationCursor;
use crate::event::{EditEvent, EditKind};
use crate::text::LineSource;
use crate::unicode::tab_advance;

/// Per-line fold level step.
pub trait FoldHandler: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Level of `line` given the previous line's level and text (`None` for
    /// the first line).
    fn fold_level(&self, prev_level: u32, prev_line: Option<&str>, line: &str) -> u32;
}

/// Every line at level 0.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoFold;

impl FoldHandler for NoFold {
    fn name(&self) -> &str {
        "none"
    }

    fn fold_level(&self, _prev_level: u32, _prev_line: Option<&str>, _line: &str) -> u32 {
        0
    }
}

/// Level is the width of the leading whitespace. Blank lines keep the
/// previous level.
#[derive(Clone, Copy, Debug)]
pub struct IndentFold {
    pub tab_width: usize,
}

impl Default for IndentFold {
    fn default() -> Self {
        Self { tab_width: 4 }
    }
}

impl FoldHandler for IndentFold {
    fn name(&self) -> &str {
        "indent"
    }

    fn fold_level(&self, prev_level: u32, _prev_line: Option<&str>, line: &str) -> u32 {
        let mut width = 0usize;
        for c in line.chars() {
            match c {
                ' ' => width += 1,
                '\t' => width += tab_advance(width, self.tab_width),
                c if c.is_whitespace() => width += 1,
                _ => return u32::try_from(width).unwrap_or(u32::MAX),
            }
        }
        prev_level
    }
}

/// `{{{` opens a fold after its line, `}}}` closes one on its line.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExplicitFold;

impl ExplicitFold {
    pub const OPEN: &'static str = "{{{";
    pub const CLOSE: &'static str = "}}}";
}

impl FoldHandler for ExplicitFold {
    fn name(&self) -> &str {
        "explicit"
    }

    fn fold_level(&self, prev_level: u32, prev_line: Option<&str>, line: &str) -> u32 {
        let opens = prev_line.map_or(0, |text| text.matches(Self::OPEN).count());
        let closes = line.matches(Self::CLOSE).count();
        let opens = u32::try_from(opens).unwrap_or(u32::MAX);
        let closes = u32::try_from(closes).unwrap_or(u32::MAX);
        prev_level.saturating_add(opens).saturating_sub(closes)
    }
}

/// Per-line fold level cache.
#[derive(Clone)]
pub struct FoldLevelTracker {
    levels: Vec<Option<u32>>,
    cursor: InvalidationCursor,
    handler: Arc<dyn FoldHandler>,
}

impl fmt::Debug for FoldLevelTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FoldLevelTracker")
            .field("lines", &self.levels.len())
            .field("cursor", &self.cursor)
            .field("handler", &self.handler.name())
            .finish()
    }
}

impl FoldLevelTracker {
    #[must_use]
    pub fn new(line_count: usize, handler: Arc<dyn FoldHandler>) -> Self {
        Self {
            levels: vec![None; line_count],
            cursor: InvalidationCursor::all_invalid(),
            handler,
        }
    }

    #[must_use]
    pub fn handler(&self) -> &Arc<dyn FoldHandler> {
        &self.handler
    }

    #[must_use]
    pub fn first_invalid(&self) -> Option<usize> {
        self.cursor.first_invalid()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Install a new handler; every level becomes stale.
    pub fn set_handler(&mut self, handler: Arc<dyn FoldHandler>) {
        debug!(handler = handler.name(), "fold handler changed");
        self.handler = handler;
        self.reset(self.levels.len());
    }

    pub fn reset(&mut self, line_count: usize) {
        self.levels.clear();
        self.levels.resize(line_count, None);
        self.cursor.reset();
    }

    /// Resize to the post-edit line count and mark the edited lines stale.
    pub fn apply_edit(&mut self, event: &EditEvent) {
        if event.is_noop() {
            return;
        }
        let start = event.start_line.min(self.levels.len());
        let count = event.line_count();
        match event.kind {
            EditKind::Insert => {
                self.levels
                    .splice(start..start, std::iter::repeat_n(None, count));
            }
            EditKind::Remove => {
                let end = (start + count).min(self.levels.len());
                self.levels.drain(start..end);
            }
        }
        self.cursor.record_edit(event);
        // the line after an edit reads the edited line's text
        self.cursor.extend_dirty(event.last_changed_line() + 1);
    }

    /// Fold level of `line`, recomputing stale lines before it.
    ///
    /// Returns the level and the range of lines whose cached level changed.
    pub fn fold_level<L>(&mut self, source: &L, line: usize) -> (u32, Option<(usize, usize)>)
    where
        L: LineSource + ?Sized,
    {
        if self.cursor.is_valid(line) {
            if let Some(level) = self.levels[line] {
                return (level, None);
            }
        }
        let start = match self.cursor.first_invalid() {
            Some(first) if first < line => first,
            _ => line,
        };

        let mut prev_level = if start == 0 {
            0
        } else {
            self.levels[start - 1].unwrap_or(0)
        };
        let mut prev_text = (start > 0).then(|| source.line_text(start - 1));
        let mut changed_range: Option<(usize, usize)> = None;
        let mut last_changed = false;

        for i in start..=line {
            let text = source.line_text(i);
            let level = self
                .handler
                .fold_level(prev_level, prev_text.as_deref(), &text);
            let old = self.levels[i].replace(level);
            last_changed = old != Some(level);
            if old.is_some_and(|old| old != level) {
                changed_range = Some(changed_range.map_or((i, i), |(lo, _)| (lo, i)));
            }
            prev_level = level;
            prev_text = Some(text);
        }

        self.cursor.settle(line, last_changed, self.levels.len());
        trace!(start, line, first_invalid = ?self.cursor.first_invalid(), "fold levels recomputed");
        if let Some((lo, hi)) = changed_range {
            debug!(start = lo, end = hi, "fold levels changed");
        }
        (prev_level, changed_range)
    }

    /// Cached level of `line` if it is trustworthy.
    #[must_use]
    pub fn cached_level(&self, line: usize) -> Option<u32> {
        if !self.cursor.is_valid(line) {
            return None;
        }
        self.levels.get(line).copied().flatten()
    }
}

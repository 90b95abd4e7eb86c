//! Line visibility as a sorted boundary list.
//!
//! Each boundary toggles visibility: a line is visible iff the number of
//! boundaries at or before it is even. Queries are binary searches over the
//! boundary list, so their cost depends on the number of hidden ranges, not
//! on the number of lines.

use tracing::trace;

use crate::error::{Error, Result};
use crate::event::{EditEvent, EditKind};

/// Which lines of a buffer are shown.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VisibilityMap {
    /// Strictly increasing, all `< line_count`.
    boundaries: Vec<usize>,
    line_count: usize,
}

impl VisibilityMap {
    /// Everything visible.
    #[must_use]
    pub fn new(line_count: usize) -> Self {
        Self {
            boundaries: Vec::new(),
            line_count,
        }
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.line_count
    }

    #[must_use]
    pub fn boundaries(&self) -> &[usize] {
        &self.boundaries
    }

    /// Whether any line is hidden.
    #[must_use]
    pub fn has_hidden(&self) -> bool {
        !self.boundaries.is_empty()
    }

    fn check_line(&self, line: usize) -> Result<()> {
        if line >= self.line_count {
            return Err(Error::line(line, self.line_count));
        }
        Ok(())
    }

    /// Number of boundaries at or before `line`.
    fn toggles_through(&self, line: usize) -> usize {
        self.boundaries.partition_point(|&b| b <= line)
    }

    fn visible_unchecked(&self, line: usize) -> bool {
        self.toggles_through(line) % 2 == 0
    }

    pub fn is_visible(&self, line: usize) -> Result<bool> {
        self.check_line(line)?;
        Ok(self.visible_unchecked(line))
    }

    #[must_use]
    pub fn first_visible(&self) -> Option<usize> {
        self.visible_at_or_after(0)
    }

    #[must_use]
    pub fn last_visible(&self) -> Option<usize> {
        self.visible_at_or_before(self.line_count.checked_sub(1)?)
    }

    /// First visible line after `line`.
    pub fn next_visible(&self, line: usize) -> Result<Option<usize>> {
        self.check_line(line)?;
        Ok(self.visible_at_or_after(line + 1))
    }

    /// Last visible line before `line`.
    pub fn prev_visible(&self, line: usize) -> Result<Option<usize>> {
        self.check_line(line)?;
        Ok(line
            .checked_sub(1)
            .and_then(|candidate| self.visible_at_or_before(candidate)))
    }

    /// Smallest visible line `>= line`.
    pub(crate) fn visible_at_or_after(&self, line: usize) -> Option<usize> {
        if line >= self.line_count {
            return None;
        }
        let toggles = self.toggles_through(line);
        if toggles % 2 == 0 {
            return Some(line);
        }
        // the next boundary ends the hidden range
        self.boundaries.get(toggles).copied()
    }

    /// Largest visible line `<= line`.
    pub(crate) fn visible_at_or_before(&self, line: usize) -> Option<usize> {
        let line = line.min(self.line_count.checked_sub(1)?);
        let toggles = self.toggles_through(line);
        if toggles % 2 == 0 {
            return Some(line);
        }
        self.boundaries[toggles - 1].checked_sub(1)
    }

    /// Hide lines `start..=end`.
    pub fn hide(&mut self, start: usize, end: usize) -> Result<()> {
        self.set_range(start, end, false)
    }

    /// Show lines `start..=end`.
    pub fn show(&mut self, start: usize, end: usize) -> Result<()> {
        self.set_range(start, end, true)
    }

    /// Hide everything outside `start..=end`.
    pub fn narrow(&mut self, start: usize, end: usize) -> Result<()> {
        self.check_range(start, end)?;
        self.boundaries.clear();
        if start > 0 {
            self.boundaries.push(0);
            self.boundaries.push(start);
        }
        if end + 1 < self.line_count {
            self.boundaries.push(end + 1);
        }
        trace!(start, end, "narrowed");
        Ok(())
    }

    /// Show every line.
    pub fn show_all(&mut self) {
        self.boundaries.clear();
    }

    /// Forget all state for a buffer of `line_count` lines.
    pub fn reset(&mut self, line_count: usize) {
        self.boundaries.clear();
        self.line_count = line_count;
    }

    /// Maximal hidden ranges as `(start, end)` inclusive pairs.
    pub fn hidden_ranges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.boundaries.chunks(2).map(|pair| match pair {
            [start, end] => (*start, end - 1),
            [start] => (*start, self.line_count - 1),
            _ => unreachable!("chunks(2) yields one or two items"),
        })
    }

    fn check_range(&self, start: usize, end: usize) -> Result<()> {
        self.check_line(start)?;
        self.check_line(end)?;
        if start > end {
            return Err(Error::line(start, end + 1));
        }
        Ok(())
    }

    fn set_range(&mut self, start: usize, end: usize, visible: bool) -> Result<()> {
        self.check_range(start, end)?;
        let before = start == 0 || self.visible_unchecked(start - 1);
        let after = (end + 1 < self.line_count).then(|| self.visible_unchecked(end + 1));

        let lo = self.boundaries.partition_point(|&b| b < start);
        let hi = self.boundaries.partition_point(|&b| b <= end + 1);
        let mut replacement = Vec::with_capacity(2);
        if before != visible {
            replacement.push(start);
        }
        if after.is_some_and(|after| after != visible) {
            replacement.push(end + 1);
        }
        self.boundaries.splice(lo..hi, replacement);
        trace!(start, end, visible, boundaries = self.boundaries.len(), "visibility changed");
        Ok(())
    }

    /// Shift boundaries after a content edit.
    ///
    /// Inserted lines take the visibility of the line they were split from.
    /// Boundaries inside a removed range collapse; lines after the range
    /// keep their visibility.
    pub fn apply_edit(&mut self, event: &EditEvent) {
        if event.is_noop() || event.line_delta == 0 {
            return;
        }
        let start = event.start_line;
        let count = event.line_count();
        match event.kind {
            EditKind::Insert => {
                self.line_count += count;
                for b in &mut self.boundaries {
                    if *b > start {
                        *b += count;
                    }
                }
            }
            EditKind::Remove => {
                self.line_count = self.line_count.saturating_sub(count);
                let removed_end = start + count;
                let mut shifted = Vec::with_capacity(self.boundaries.len());
                let mut collapsed = 0usize;
                for &b in &self.boundaries {
                    if b <= start {
                        shifted.push(b);
                    } else if b <= removed_end {
                        collapsed += 1;
                    } else {
                        shifted.push(b - count);
                    }
                }
                if collapsed % 2 == 1 {
                    // keep the parity of the lines after the removed range
                    let toggle = start + 1;
                    match shifted.binary_search(&toggle) {
                        Ok(idx) => {
                            shifted.remove(idx);
                        }
                        Err(idx) => shifted.insert(idx, toggle),
                    }
                }
                shifted.retain(|&b| b < self.line_count);
                self.boundaries = shifted;
            }
        }
    }
}

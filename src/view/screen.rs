//! Mapping of visible physical lines onto a bounded window of screen rows.
//!
//! The window starts at `first_line`/`skew` (a visible physical line and a
//! soft-wrap subregion inside it). Each row is derived from the row before
//! it, so a stale row is recomputed from its predecessor and rows after it
//! stay trusted unless the recomputed row changed shape. Scrolling shifts
//! the descriptor array and leaves only the newly exposed rows stale.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use tracing::{debug, trace};

use crate::config::LayoutOptions;
use crate::error::{Error, Result};
use crate::event::{EditEvent, EditKind};
use crate::text::LineSource;
use crate::view::visibility::VisibilityMap;
use crate::view::wrap::{Subregion, subregions};

/// One row of the screen window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScreenRow {
    pub physical_line: usize,
    /// Index of the soft-wrap subregion within the line.
    pub subregion: usize,
    /// Char offset of the subregion from the line start.
    pub offset: usize,
    pub length: usize,
    pub is_first: bool,
    pub is_last: bool,
}

impl ScreenRow {
    fn position(&self) -> Position {
        (self.physical_line, self.subregion)
    }

    fn same_shape(&self, other: &Self) -> bool {
        self.position() == other.position() && self.is_last == other.is_last
    }
}

/// Everything row derivation reads.
#[derive(Clone, Copy)]
pub struct LayoutSource<'a> {
    pub lines: &'a dyn LineSource,
    pub visibility: &'a VisibilityMap,
    pub options: &'a LayoutOptions,
}

/// `(physical line, subregion)`.
type Position = (usize, usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Slot {
    /// Needs recomputing. Carries the previous row when the rows after it
    /// are still trusted, so a change of shape can invalidate them.
    Stale(Option<ScreenRow>),
    /// Past the last visible line.
    Blank,
    Row(ScreenRow),
}

/// The sliding window of screen row descriptors.
#[derive(Clone, Debug)]
pub struct ScreenLineMapper {
    first_line: usize,
    skew: usize,
    slots: Vec<Slot>,
    wraps: BTreeMap<usize, Vec<Subregion>>,
    need_full_repaint: bool,
    recomputed: usize,
}

impl ScreenLineMapper {
    #[must_use]
    pub fn new(height: usize) -> Self {
        Self {
            first_line: 0,
            skew: 0,
            slots: vec![Slot::Stale(None); height],
            wraps: BTreeMap::new(),
            need_full_repaint: true,
            recomputed: 0,
        }
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn first_line(&self) -> usize {
        self.first_line
    }

    #[must_use]
    pub fn skew(&self) -> usize {
        self.skew
    }

    /// Number of row descriptors computed so far.
    #[must_use]
    pub fn recomputed_rows(&self) -> usize {
        self.recomputed
    }

    #[must_use]
    pub fn need_full_repaint(&self) -> bool {
        self.need_full_repaint
    }

    /// Read and clear the full-repaint flag.
    pub fn take_full_repaint(&mut self) -> bool {
        std::mem::take(&mut self.need_full_repaint)
    }

    pub fn resize(&mut self, height: usize) {
        self.slots.resize(height, Slot::Stale(None));
        self.need_full_repaint = true;
    }

    /// Mark `row` and every row after it stale.
    pub fn invalidate_from(&mut self, row: usize) {
        for slot in self.slots.iter_mut().skip(row) {
            *slot = Slot::Stale(None);
        }
        self.need_full_repaint = true;
    }

    pub fn invalidate_all(&mut self) {
        self.invalidate_from(0);
    }

    /// Drop cached soft-wrap layout, after a change of wrap options.
    pub fn clear_layout(&mut self) {
        self.wraps.clear();
        self.invalidate_all();
    }

    /// Back to the top of a freshly loaded buffer.
    pub fn reset(&mut self) {
        self.first_line = 0;
        self.skew = 0;
        self.clear_layout();
    }

    /// Number of lines whose soft-wrap layout is cached.
    #[must_use]
    pub fn cached_layouts(&self) -> usize {
        self.wraps.len()
    }

    /// Drop cached soft-wrap layout of lines outside `lines`.
    pub fn retain_layout(&mut self, lines: RangeInclusive<usize>) {
        let mut kept = self.wraps.split_off(lines.start());
        if let Some(past) = lines.end().checked_add(1) {
            kept.split_off(&past);
        }
        self.wraps = kept;
    }

    fn wrap(&mut self, line: usize, src: &LayoutSource<'_>) -> &[Subregion] {
        self.wraps
            .entry(line)
            .or_insert_with(|| subregions(&src.lines.line_text(line), src.options))
    }

    /// Number of screen rows `line` occupies.
    pub fn subregion_count(&mut self, line: usize, src: &LayoutSource<'_>) -> usize {
        self.wrap(line, src).len()
    }

    fn advance(&mut self, (line, subregion): Position, src: &LayoutSource<'_>) -> Option<Position> {
        if subregion + 1 < self.subregion_count(line, src) {
            return Some((line, subregion + 1));
        }
        src.visibility
            .visible_at_or_after(line + 1)
            .map(|next| (next, 0))
    }

    fn retreat(&mut self, (line, subregion): Position, src: &LayoutSource<'_>) -> Option<Position> {
        if subregion > 0 {
            return Some((line, subregion - 1));
        }
        let prev = src.visibility.visible_at_or_before(line.checked_sub(1)?)?;
        Some((prev, self.subregion_count(prev, src) - 1))
    }

    /// Snap the window top onto a visible line and an existing subregion.
    fn normalize_top(&mut self, src: &LayoutSource<'_>) -> Option<Position> {
        let line = src
            .visibility
            .visible_at_or_after(self.first_line)
            .or_else(|| src.visibility.visible_at_or_before(self.first_line))?;
        if line != self.first_line {
            self.first_line = line;
            self.skew = 0;
        }
        let count = self.subregion_count(line, src);
        self.skew = self.skew.min(count - 1);
        Some((self.first_line, self.skew))
    }

    fn describe(&mut self, (line, subregion): Position, src: &LayoutSource<'_>) -> ScreenRow {
        let regions = self.wrap(line, src);
        let subregion = subregion.min(regions.len() - 1);
        let region = regions[subregion];
        ScreenRow {
            physical_line: line,
            subregion,
            offset: region.offset,
            length: region.length,
            is_first: subregion == 0,
            is_last: subregion + 1 == regions.len(),
        }
    }

    fn derive(&mut self, row: usize, src: &LayoutSource<'_>) -> Slot {
        let position = if row == 0 {
            self.normalize_top(src)
        } else {
            let prev = self.slots[row - 1];
            match prev {
                Slot::Row(prev) => self.advance(prev.position(), src),
                Slot::Blank | Slot::Stale(_) => None,
            }
        };
        self.recomputed += 1;
        match position {
            Some(position) => Slot::Row(self.describe(position, src)),
            None => Slot::Blank,
        }
    }

    /// Descriptor of screen row `row`, recomputing stale rows up to it.
    /// `None` past the end of the document.
    pub fn row_at(&mut self, row: usize, src: &LayoutSource<'_>) -> Result<Option<ScreenRow>> {
        let height = self.height();
        if row >= height {
            return Err(Error::row(row, height));
        }
        for i in 0..=row {
            let Slot::Stale(previous) = self.slots[i] else {
                continue;
            };
            let slot = self.derive(i, src);
            self.slots[i] = slot;
            let reshaped = match (previous, slot) {
                (Some(old), Slot::Row(new)) => !old.same_shape(&new),
                (Some(_), _) => true,
                (None, _) => false,
            };
            if reshaped && i + 1 < height {
                trace!(row = i, "row changed shape, rest of window stale");
                self.invalidate_from(i + 1);
            }
        }
        Ok(match self.slots[row] {
            Slot::Row(descriptor) => Some(descriptor),
            Slot::Blank | Slot::Stale(_) => None,
        })
    }

    /// Put `line` (subregion `skew`) at the top of the window. A hidden line
    /// snaps to the next visible one.
    pub fn scroll_to(&mut self, line: usize, skew: usize, src: &LayoutSource<'_>) -> Result<()> {
        let count = src.lines.line_count();
        if line >= count {
            return Err(Error::line(line, count));
        }
        let target = src
            .visibility
            .visible_at_or_after(line)
            .or_else(|| src.visibility.visible_at_or_before(line));
        let Some(target) = target else {
            self.first_line = line;
            self.skew = 0;
            self.invalidate_all();
            return Ok(());
        };
        let skew = if target == line {
            skew.min(self.subregion_count(target, src) - 1)
        } else {
            0
        };
        self.move_top((target, skew), src);
        Ok(())
    }

    /// Scroll by `delta` screen rows, crossing soft-wrap subregions.
    /// Returns the number of rows actually moved.
    pub fn scroll_by(&mut self, delta: isize, src: &LayoutSource<'_>) -> usize {
        let Some(mut position) = self.normalize_top(src) else {
            return 0;
        };
        let mut moved = 0;
        while moved < delta.unsigned_abs() {
            let next = if delta > 0 {
                self.advance(position, src)
            } else {
                self.retreat(position, src)
            };
            let Some(next) = next else { break };
            position = next;
            moved += 1;
        }
        self.move_top(position, src);
        moved
    }

    fn move_top(&mut self, target: Position, src: &LayoutSource<'_>) {
        let old = (self.first_line, self.skew);
        if target == old {
            return;
        }
        let height = self.height();

        // forward: the new top is already in the window
        let hit = self
            .slots
            .iter()
            .position(|slot| matches!(slot, Slot::Row(row) if row.position() == target));
        if let Some(distance) = hit {
            self.slots.rotate_left(distance);
            for slot in &mut self.slots[height - distance..] {
                *slot = Slot::Stale(None);
            }
            self.set_top(target);
            trace!(distance, "window shifted up");
            return;
        }

        // backward: the old top is less than a window below the new one.
        // Exposed rows keep their predicted shape, since trusted rows follow.
        let mut position = target;
        let mut predicted = vec![self.describe(target, src)];
        for distance in 1..height {
            let Some(next) = self.advance(position, src) else {
                break;
            };
            position = next;
            if position == old {
                self.slots.rotate_right(distance);
                for (slot, row) in self.slots[..distance].iter_mut().zip(predicted) {
                    *slot = Slot::Stale(Some(row));
                }
                self.set_top(target);
                trace!(distance, "window shifted down");
                return;
            }
            predicted.push(self.describe(position, src));
        }

        self.set_top(target);
        self.invalidate_all();
        debug!(first_line = target.0, skew = target.1, "window jumped");
    }

    fn set_top(&mut self, (line, skew): Position) {
        self.first_line = line;
        self.skew = skew;
    }

    /// First row at or after which rows may show `line` or a later line.
    fn first_row_reaching(&self, line: usize) -> usize {
        self.slots
            .iter()
            .position(|slot| !matches!(slot, Slot::Row(row) if row.physical_line < line))
            .unwrap_or(self.slots.len())
    }

    /// Lines `start..=end` changed visibility.
    pub fn visibility_changed(&mut self, start: usize, end: usize) {
        let row = self.first_row_reaching(start);
        trace!(start, end, row, "visibility changed");
        if row < self.height() {
            self.invalidate_from(row);
        }
    }

    /// Patch the window after a content edit. `src` reflects the new text.
    pub fn apply_edit(&mut self, event: &EditEvent) {
        if event.is_noop() {
            return;
        }
        let start = event.start_line;

        let mut after = self.wraps.split_off(&start);
        after.remove(&start);
        if event.line_delta == 0 {
            self.wraps.append(&mut after);
        } else {
            for (line, regions) in after {
                let mapped = event.map_line(line);
                if mapped != start {
                    self.wraps.insert(mapped, regions);
                }
            }
        }

        let old_top = self.first_line;
        if old_top > start {
            let mapped = event.map_line(old_top);
            if mapped == start {
                self.skew = 0;
            }
            self.first_line = mapped;
        }

        if event.line_delta == 0 {
            // text of one line changed in place
            for slot in &mut self.slots {
                if let Slot::Row(row) = *slot {
                    if row.physical_line == start {
                        *slot = Slot::Stale(Some(row));
                    }
                }
            }
            return;
        }

        let below_edit = old_top > start
            && (event.kind == EditKind::Insert || old_top > start + event.line_count());
        if below_edit {
            // the whole window moves with the edit
            for slot in &mut self.slots {
                if let Slot::Row(row) | Slot::Stale(Some(row)) = slot {
                    row.physical_line = event.map_line(row.physical_line);
                }
            }
            trace!(start, "window renumbered");
            return;
        }

        let row = self.first_row_reaching(start);
        if row < self.height() {
            debug!(start, row, "line count changed, window stale from row");
            self.invalidate_from(row);
        }
    }
}

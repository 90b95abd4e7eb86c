//! One view onto a buffer: visibility, the screen window and chunk cache.
//!
//! The display does not own the buffer. Callers pass it in, which lets one
//! buffer feed several displays, and route every buffer mutation through
//! [`DisplayManager::apply_edit`] (or [`DisplayManager::reset`]) so the
//! view layer follows the content.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::buffer::Buffer;
use crate::config::LayoutOptions;
use crate::error::Result;
use crate::event::{EditEvent, ListenerId, Listeners};
use crate::view::chunk::{Chunk, ChunkCache};
use crate::view::screen::{LayoutSource, ScreenLineMapper, ScreenRow};
use crate::view::visibility::VisibilityMap;

/// Notification delivered to display listeners.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayEvent {
    /// Lines `start..=end` were hidden or shown.
    VisibilityChanged { start: usize, end: usize },
    /// The window top moved.
    Scrolled { first_line: usize, skew: usize },
}

/// What the renderer draws for one screen row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderRow {
    pub physical_line: usize,
    /// Char offset of the row's subregion from the line start.
    pub offset: usize,
    pub length: usize,
    pub chunks: Arc<[Chunk]>,
    pub is_first_subregion: bool,
    pub is_last_subregion: bool,
}

/// Layout state of one view.
#[derive(Debug)]
pub struct DisplayManager {
    options: LayoutOptions,
    visibility: VisibilityMap,
    screen: ScreenLineMapper,
    chunks: ChunkCache,
    listeners: Listeners<DisplayEvent>,
}

impl DisplayManager {
    /// A display showing every line of `buffer` from the top.
    pub fn new(buffer: &Buffer, options: LayoutOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            options,
            visibility: VisibilityMap::new(buffer.line_count()),
            screen: ScreenLineMapper::new(options.viewport_height),
            chunks: ChunkCache::new(),
            listeners: Listeners::new(),
        })
    }

    #[must_use]
    pub fn options(&self) -> &LayoutOptions {
        &self.options
    }

    /// Install new layout options. Wrap, tab or width changes drop the
    /// cached layout; a height change only resizes the window.
    pub fn set_options(&mut self, options: LayoutOptions) -> Result<()> {
        options.validate()?;
        let old = self.options;
        self.options = options;
        if old.viewport_height != options.viewport_height {
            self.screen.resize(options.viewport_height);
        }
        let layout_changed = old.wrap_mode != options.wrap_mode
            || old.wrap_width != options.wrap_width
            || old.tab_width != options.tab_width
            || old.width_method != options.width_method;
        if layout_changed {
            debug!(?options, "layout options changed");
            self.screen.clear_layout();
            self.chunks.clear();
        }
        Ok(())
    }

    #[must_use]
    pub fn visibility(&self) -> &VisibilityMap {
        &self.visibility
    }

    #[must_use]
    pub fn screen(&self) -> &ScreenLineMapper {
        &self.screen
    }

    #[must_use]
    pub fn chunk_cache(&self) -> &ChunkCache {
        &self.chunks
    }

    pub fn subscribe<F>(&mut self, callback: F) -> ListenerId
    where
        F: Fn(&DisplayEvent) + Send + Sync + 'static,
    {
        self.listeners.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    /// Read and clear the screen's full-repaint flag.
    pub fn take_full_repaint(&mut self) -> bool {
        self.screen.take_full_repaint()
    }

    /// Follow a content edit already applied to the buffer.
    pub fn apply_edit(&mut self, event: &EditEvent) {
        if event.is_noop() {
            return;
        }
        self.visibility.apply_edit(event);
        self.screen.apply_edit(event);
        self.chunks.apply_edit(event);
        trace!(start_line = event.start_line, "display followed edit");
    }

    /// Follow a wholesale content replacement.
    pub fn reset(&mut self, buffer: &Buffer) {
        self.visibility.reset(buffer.line_count());
        self.screen.reset();
        self.chunks.clear();
    }

    /// Follow a grammar change: chunks are stale and folds start expanded.
    pub fn grammar_changed(&mut self, buffer: &Buffer) {
        self.chunks.clear();
        self.expand_all_folds(buffer);
    }

    /// Follow a fold handler change: every fold starts expanded.
    pub fn fold_handler_changed(&mut self, buffer: &Buffer) {
        self.expand_all_folds(buffer);
    }

    fn set_visible(&mut self, start: usize, end: usize, visible: bool) -> Result<()> {
        if visible {
            self.visibility.show(start, end)?;
        } else {
            self.visibility.hide(start, end)?;
        }
        self.screen.visibility_changed(start, end);
        self.listeners
            .emit(&DisplayEvent::VisibilityChanged { start, end });
        Ok(())
    }

    /// Lines of the fold `line` belongs to, as an inclusive range.
    ///
    /// A line followed by a deeper line is a fold header and its fold is the
    /// run of deeper lines after it. Any other line belongs to the run of
    /// lines at or above its own level around it. Top-level lines that open
    /// nothing have no fold.
    pub fn fold_range(&self, buffer: &mut Buffer, line: usize) -> Result<Option<(usize, usize)>> {
        let count = buffer.line_count();
        let level = buffer.fold_level(line)?;
        if line + 1 < count && buffer.fold_level(line + 1)? > level {
            let mut end = line + 1;
            while end + 1 < count && buffer.fold_level(end + 1)? > level {
                end += 1;
            }
            return Ok(Some((line + 1, end)));
        }
        Self::enclosing_range(buffer, line, level)
    }

    /// Run of lines at or above `level` around `line`.
    fn enclosing_range(
        buffer: &mut Buffer,
        line: usize,
        level: u32,
    ) -> Result<Option<(usize, usize)>> {
        if level == 0 {
            return Ok(None);
        }
        let count = buffer.line_count();
        let mut start = line;
        while start > 0 && buffer.fold_level(start - 1)? >= level {
            start -= 1;
        }
        let mut end = line;
        while end + 1 < count && buffer.fold_level(end + 1)? >= level {
            end += 1;
        }
        Ok(Some((start, end)))
    }

    /// Hide the fold `line` belongs to. Returns the hidden range.
    ///
    /// On a header whose own fold is already collapsed this collapses the
    /// enclosing fold instead, or does nothing at the top level.
    pub fn collapse_fold(
        &mut self,
        buffer: &mut Buffer,
        line: usize,
    ) -> Result<Option<(usize, usize)>> {
        let Some((mut start, mut end)) = self.fold_range(buffer, line)? else {
            return Ok(None);
        };
        if start == line + 1 && !self.visibility.is_visible(start)? {
            let level = buffer.fold_level(line)?;
            let Some(parent) = Self::enclosing_range(buffer, line, level)? else {
                return Ok(None);
            };
            (start, end) = parent;
        }
        self.set_visible(start, end, false)?;
        debug!(start, end, "fold collapsed");
        Ok(Some((start, end)))
    }

    /// Show the fold `line` belongs to. Unless `fully`, folds nested inside
    /// it stay collapsed so only the first level opens.
    pub fn expand_fold(
        &mut self,
        buffer: &mut Buffer,
        line: usize,
        fully: bool,
    ) -> Result<Option<(usize, usize)>> {
        let Some((start, end)) = self.fold_range(buffer, line)? else {
            return Ok(None);
        };
        self.set_visible(start, end, true)?;
        if !fully {
            let mut header = start;
            while header < end {
                let level = buffer.fold_level(header)?;
                if buffer.fold_level(header + 1)? <= level {
                    header += 1;
                    continue;
                }
                let mut nested_end = header + 1;
                while nested_end < end && buffer.fold_level(nested_end + 1)? > level {
                    nested_end += 1;
                }
                self.set_visible(header + 1, nested_end, false)?;
                header = nested_end + 1;
            }
        }
        debug!(start, end, fully, "fold expanded");
        Ok(Some((start, end)))
    }

    /// Show every line.
    pub fn expand_all_folds(&mut self, buffer: &Buffer) {
        if !self.visibility.has_hidden() {
            return;
        }
        self.visibility.show_all();
        self.screen.invalidate_all();
        let end = buffer.line_count().saturating_sub(1);
        self.listeners
            .emit(&DisplayEvent::VisibilityChanged { start: 0, end });
    }

    /// Hide every line whose fold level exceeds `level`.
    pub fn collapse_folds_deeper_than(&mut self, buffer: &mut Buffer, level: u32) -> Result<()> {
        let count = buffer.line_count();
        let mut line = 0;
        while line < count {
            if buffer.fold_level(line)? > level {
                let start = line;
                while line + 1 < count && buffer.fold_level(line + 1)? > level {
                    line += 1;
                }
                self.set_visible(start, line, false)?;
            }
            line += 1;
        }
        Ok(())
    }

    /// Hide everything outside `start..=end`.
    pub fn narrow(&mut self, buffer: &Buffer, start: usize, end: usize) -> Result<()> {
        self.visibility.narrow(start, end)?;
        self.screen.invalidate_all();
        let last = buffer.line_count().saturating_sub(1);
        self.listeners
            .emit(&DisplayEvent::VisibilityChanged { start: 0, end: last });
        debug!(start, end, "narrowed");
        Ok(())
    }

    /// Undo narrowing and folding.
    pub fn show_all(&mut self, buffer: &Buffer) {
        self.expand_all_folds(buffer);
    }

    fn after_scroll(&mut self) {
        let first_line = self.screen.first_line();
        let skew = self.screen.skew();
        let margin = self.screen.height().max(1);
        let kept = first_line.saturating_sub(margin)..=first_line.saturating_add(3 * margin);
        self.screen.retain_layout(kept.clone());
        self.chunks.retain_lines(kept);
        self.listeners
            .emit(&DisplayEvent::Scrolled { first_line, skew });
    }

    /// Put `line` at the top of the window.
    pub fn scroll_to(&mut self, buffer: &Buffer, line: usize, skew: usize) -> Result<()> {
        let src = LayoutSource {
            lines: buffer.content(),
            visibility: &self.visibility,
            options: &self.options,
        };
        self.screen.scroll_to(line, skew, &src)?;
        self.after_scroll();
        Ok(())
    }

    /// Scroll by `delta` screen rows. Returns the rows actually moved.
    pub fn scroll_by(&mut self, buffer: &Buffer, delta: isize) -> usize {
        let src = LayoutSource {
            lines: buffer.content(),
            visibility: &self.visibility,
            options: &self.options,
        };
        let moved = self.screen.scroll_by(delta, &src);
        if moved > 0 {
            self.after_scroll();
        }
        moved
    }

    /// Layout of screen row `row`, without chunks.
    pub fn screen_row(&mut self, buffer: &Buffer, row: usize) -> Result<Option<ScreenRow>> {
        let src = LayoutSource {
            lines: buffer.content(),
            visibility: &self.visibility,
            options: &self.options,
        };
        self.screen.row_at(row, &src)
    }

    /// Screen row `row` with its chunks. `None` past the end of the document.
    pub fn row(&mut self, buffer: &mut Buffer, row: usize) -> Result<Option<RenderRow>> {
        let Some(screen_row) = self.screen_row(buffer, row)? else {
            return Ok(None);
        };
        let chunks = self.chunks.chunks_for(buffer, &screen_row)?;
        Ok(Some(RenderRow {
            physical_line: screen_row.physical_line,
            offset: screen_row.offset,
            length: screen_row.length,
            chunks,
            is_first_subregion: screen_row.is_first,
            is_last_subregion: screen_row.is_last,
        }))
    }

    /// Every non-blank row of the window.
    pub fn rows(&mut self, buffer: &mut Buffer) -> Result<Vec<RenderRow>> {
        let mut rows = Vec::with_capacity(self.screen.height());
        for index in 0..self.screen.height() {
            match self.row(buffer, index)? {
                Some(row) => rows.push(row),
                None => break,
            }
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{ExplicitFold, IndentFold};
    use crate::config::WrapMode;
    use parking_lot::Mutex;

    fn indent_buffer(text: &str) -> Buffer {
        let mut buffer = Buffer::with_text(text);
        buffer.set_fold_handler(Arc::new(IndentFold { tab_width: 4 }));
        buffer
    }

    fn shown(display: &mut DisplayManager, buffer: &mut Buffer) -> Vec<usize> {
        display
            .rows(buffer)
            .unwrap()
            .iter()
            .map(|row| row.physical_line)
            .collect()
    }

    const NESTED: &str = "fn a\n  b\n    c\n    d\n  e\nf";

    #[test]
    fn test_fold_range() {
        let mut buffer = indent_buffer(NESTED);
        let display = DisplayManager::new(&buffer, LayoutOptions::default()).unwrap();
        assert_eq!(display.fold_range(&mut buffer, 0).unwrap(), Some((1, 4)));
        assert_eq!(display.fold_range(&mut buffer, 1).unwrap(), Some((2, 3)));
        assert_eq!(display.fold_range(&mut buffer, 3).unwrap(), Some((2, 3)));
        assert_eq!(display.fold_range(&mut buffer, 4).unwrap(), Some((1, 4)));
        assert_eq!(display.fold_range(&mut buffer, 5).unwrap(), None);
        assert!(display.fold_range(&mut buffer, 6).is_err());
    }

    #[test]
    fn test_collapse_and_expand() {
        let mut buffer = indent_buffer(NESTED);
        let mut display = DisplayManager::new(&buffer, LayoutOptions::default()).unwrap();
        display.collapse_fold(&mut buffer, 1).unwrap();
        display.collapse_fold(&mut buffer, 0).unwrap();
        assert_eq!(shown(&mut display, &mut buffer), vec![0, 5]);

        // first level only: the nested fold stays closed
        display.expand_fold(&mut buffer, 0, false).unwrap();
        assert_eq!(shown(&mut display, &mut buffer), vec![0, 1, 4, 5]);

        display.collapse_fold(&mut buffer, 0).unwrap();
        display.expand_fold(&mut buffer, 0, true).unwrap();
        assert_eq!(shown(&mut display, &mut buffer), vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_collapse_collapsed_header_takes_parent() {
        let mut buffer = indent_buffer(NESTED);
        let mut display = DisplayManager::new(&buffer, LayoutOptions::default()).unwrap();
        assert_eq!(display.collapse_fold(&mut buffer, 1).unwrap(), Some((2, 3)));
        assert_eq!(display.collapse_fold(&mut buffer, 1).unwrap(), Some((1, 4)));
        assert_eq!(shown(&mut display, &mut buffer), vec![0, 5]);

        // nothing encloses a top-level header
        assert_eq!(display.collapse_fold(&mut buffer, 0).unwrap(), None);
        assert_eq!(shown(&mut display, &mut buffer), vec![0, 5]);
    }

    #[test]
    fn test_collapse_deeper_than() {
        let mut buffer = indent_buffer(NESTED);
        let mut display = DisplayManager::new(&buffer, LayoutOptions::default()).unwrap();
        display.collapse_folds_deeper_than(&mut buffer, 2).unwrap();
        assert_eq!(shown(&mut display, &mut buffer), vec![0, 1, 4, 5]);
        display.collapse_folds_deeper_than(&mut buffer, 0).unwrap();
        assert_eq!(shown(&mut display, &mut buffer), vec![0, 5]);
        display.expand_all_folds(&buffer);
        assert_eq!(shown(&mut display, &mut buffer).len(), 6);
    }

    #[test]
    fn test_explicit_markers() {
        let mut buffer = Buffer::with_text("a {{{\nb\nc\n}}}\nd");
        buffer.set_fold_handler(Arc::new(ExplicitFold));
        let mut display = DisplayManager::new(&buffer, LayoutOptions::default()).unwrap();
        assert_eq!(display.collapse_fold(&mut buffer, 0).unwrap(), Some((1, 2)));
        assert_eq!(shown(&mut display, &mut buffer), vec![0, 3, 4]);
    }

    #[test]
    fn test_visibility_events() {
        let mut buffer = indent_buffer(NESTED);
        let mut display = DisplayManager::new(&buffer, LayoutOptions::default()).unwrap();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        display.subscribe(move |event| sink.lock().push(*event));
        display.collapse_fold(&mut buffer, 1).unwrap();
        display.scroll_to(&buffer, 1, 0).unwrap();
        assert_eq!(
            events.lock().clone(),
            vec![
                DisplayEvent::VisibilityChanged { start: 2, end: 3 },
                DisplayEvent::Scrolled {
                    first_line: 1,
                    skew: 0
                },
            ]
        );
    }

    #[test]
    fn test_edit_inside_window() {
        let mut buffer = Buffer::with_text("one\ntwo\nthree");
        let mut display = DisplayManager::new(&buffer, LayoutOptions::default()).unwrap();
        assert_eq!(shown(&mut display, &mut buffer), vec![0, 1, 2]);
        let event = buffer.insert(3, "\nnew").unwrap();
        display.apply_edit(&event);
        let rows = display.rows(&mut buffer).unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[1].length, 3);
        assert_eq!(rows[3].physical_line, 3);
    }

    #[test]
    fn test_scrolling_keeps_wrap_cache_near_window() {
        let text: Vec<String> = (0..2_000).map(|i| format!("line number {i}")).collect();
        let mut buffer = Buffer::with_text(&text.join("\n"));
        let options = LayoutOptions::default()
            .with_wrap(WrapMode::Word, 8)
            .with_viewport_height(10);
        let mut display = DisplayManager::new(&buffer, options).unwrap();
        display.rows(&mut buffer).unwrap();
        while display.scroll_by(&buffer, 10) > 0 {
            display.rows(&mut buffer).unwrap();
            assert!(display.screen().cached_layouts() <= 41);
        }

        // an edit near the top renumbers only what is cached
        let event = buffer.insert(0, "new\n").unwrap();
        display.apply_edit(&event);
        assert!(display.screen().cached_layouts() <= 41);
    }

    #[test]
    fn test_narrow_and_show_all() {
        let mut buffer = Buffer::with_text("a\nb\nc\nd\ne");
        let mut display = DisplayManager::new(&buffer, LayoutOptions::default()).unwrap();
        display.narrow(&buffer, 1, 2).unwrap();
        assert_eq!(shown(&mut display, &mut buffer), vec![1, 2]);
        display.show_all(&buffer);
        // the window top stays where narrowing put it
        assert_eq!(shown(&mut display, &mut buffer), vec![1, 2, 3, 4]);
        display.scroll_to(&buffer, 0, 0).unwrap();
        assert_eq!(shown(&mut display, &mut buffer), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_set_options() {
        let mut buffer = Buffer::with_text("abcdef");
        let mut display = DisplayManager::new(&buffer, LayoutOptions::default()).unwrap();
        assert_eq!(display.rows(&mut buffer).unwrap().len(), 1);
        display
            .set_options(
                LayoutOptions::default()
                    .with_wrap(WrapMode::Char, 2)
                    .with_viewport_height(2),
            )
            .unwrap();
        let rows = display.rows(&mut buffer).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].is_first_subregion && !rows[1].is_last_subregion);

        let bad = LayoutOptions {
            tab_width: 0,
            ..LayoutOptions::default()
        };
        assert!(display.set_options(bad).is_err());
    }
}

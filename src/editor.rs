//! Buffer plus one display, with every edit routed through both.
//!
//! ```
//! use textflow::{Editor, LayoutOptions};
//!
//! let mut editor = Editor::with_text("fn main() {\n    body();\n}", LayoutOptions::default()).unwrap();
//! editor.insert(0, "// entry\n").unwrap();
//! let row = editor.row(1).unwrap().unwrap();
//! assert_eq!(row.physical_line, 1);
//! ```

use std::sync::Arc;

use crate::buffer::{Buffer, FoldHandler};
use crate::config::LayoutOptions;
use crate::error::Result;
use crate::event::{BufferEvent, EditEvent, ListenerId};
use crate::highlight::{Grammar, Token};
use crate::view::{DisplayEvent, DisplayManager, RenderRow};

/// Facade over a [`Buffer`] and its [`DisplayManager`].
#[derive(Debug)]
pub struct Editor {
    buffer: Buffer,
    display: DisplayManager,
}

impl Editor {
    pub fn new(options: LayoutOptions) -> Result<Self> {
        Self::with_text("", options)
    }

    pub fn with_text(text: &str, options: LayoutOptions) -> Result<Self> {
        let buffer = Buffer::with_text(text);
        let display = DisplayManager::new(&buffer, options)?;
        Ok(Self { buffer, display })
    }

    #[must_use]
    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    #[must_use]
    pub fn display(&self) -> &DisplayManager {
        &self.display
    }

    #[must_use]
    pub fn text(&self) -> String {
        self.buffer.text()
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.buffer.line_count()
    }

    pub fn insert(&mut self, offset: usize, text: &str) -> Result<EditEvent> {
        let event = self.buffer.insert(offset, text)?;
        self.display.apply_edit(&event);
        Ok(event)
    }

    pub fn remove(&mut self, offset: usize, length: usize) -> Result<EditEvent> {
        let event = self.buffer.remove(offset, length)?;
        self.display.apply_edit(&event);
        Ok(event)
    }

    pub fn set_text(&mut self, text: &str) {
        self.buffer.set_text(text);
        self.display.reset(&self.buffer);
    }

    pub fn set_grammar(&mut self, grammar: Arc<Grammar>) {
        self.buffer.set_grammar(grammar);
        self.display.grammar_changed(&self.buffer);
    }

    /// Parse and install a JSON grammar; the old grammar stays on error.
    pub fn load_grammar_json(&mut self, json: &str) -> Result<()> {
        self.buffer.load_grammar_json(json)?;
        self.display.grammar_changed(&self.buffer);
        Ok(())
    }

    pub fn set_fold_handler(&mut self, handler: Arc<dyn FoldHandler>) {
        self.buffer.set_fold_handler(handler);
        self.display.fold_handler_changed(&self.buffer);
    }

    pub fn set_options(&mut self, options: LayoutOptions) -> Result<()> {
        self.display.set_options(options)
    }

    pub fn tokens(&mut self, line: usize) -> Result<Vec<Token>> {
        self.buffer.tokens(line)
    }

    pub fn fold_level(&mut self, line: usize) -> Result<u32> {
        self.buffer.fold_level(line)
    }

    /// Screen row `index` of the window, `None` past the end of the document.
    /// Indices outside the window are [`crate::Error::Range`].
    pub fn row(&mut self, index: usize) -> Result<Option<RenderRow>> {
        self.display.row(&mut self.buffer, index)
    }

    /// Every non-blank row of the window.
    pub fn rows(&mut self) -> Result<Vec<RenderRow>> {
        self.display.rows(&mut self.buffer)
    }

    pub fn take_full_repaint(&mut self) -> bool {
        self.display.take_full_repaint()
    }

    pub fn scroll_to(&mut self, line: usize, skew: usize) -> Result<()> {
        self.display.scroll_to(&self.buffer, line, skew)
    }

    pub fn scroll_by(&mut self, delta: isize) -> usize {
        self.display.scroll_by(&self.buffer, delta)
    }

    pub fn collapse_fold(&mut self, line: usize) -> Result<Option<(usize, usize)>> {
        self.display.collapse_fold(&mut self.buffer, line)
    }

    pub fn expand_fold(&mut self, line: usize, fully: bool) -> Result<Option<(usize, usize)>> {
        self.display.expand_fold(&mut self.buffer, line, fully)
    }

    pub fn expand_all_folds(&mut self) {
        self.display.expand_all_folds(&self.buffer);
    }

    pub fn collapse_folds_deeper_than(&mut self, level: u32) -> Result<()> {
        self.display
            .collapse_folds_deeper_than(&mut self.buffer, level)
    }

    pub fn narrow(&mut self, start: usize, end: usize) -> Result<()> {
        self.display.narrow(&self.buffer, start, end)
    }

    pub fn show_all(&mut self) {
        self.display.show_all(&self.buffer);
    }

    pub fn is_visible(&self, line: usize) -> Result<bool> {
        self.display.visibility().is_visible(line)
    }

    pub fn subscribe<F>(&mut self, callback: F) -> ListenerId
    where
        F: Fn(&BufferEvent) + Send + Sync + 'static,
    {
        self.buffer.subscribe(callback)
    }

    pub fn subscribe_display<F>(&mut self, callback: F) -> ListenerId
    where
        F: Fn(&DisplayEvent) + Send + Sync + 'static,
    {
        self.display.subscribe(callback)
    }
}

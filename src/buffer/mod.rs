//! The text buffer: content plus incrementally maintained per-line caches.
//!
//! [`Buffer`] owns the [`ContentStore`], the lexer context cache and the fold
//! level tracker. Every mutation goes through the buffer so that both caches
//! are resized and invalidated together with the content; listeners are
//! notified after the caches are consistent again.
//!
//! ```
//! use textflow::buffer::Buffer;
//! use textflow::highlight::TokenKind;
//!
//! let mut buffer = Buffer::with_text("plain text");
//! let tokens = buffer.tokens(0).unwrap();
//! assert_eq!(tokens[0].kind, TokenKind::Text);
//! ```

pub mod context_cache;
pub mod cursor;
pub mod fold;
pub mod shared;

use std::borrow::Cow;
use std::sync::Arc;

use tracing::debug;

use crate::error::{Error, Result};
use crate::event::{BufferEvent, EditEvent, ListenerId, Listeners};
use crate::highlight::{Grammar, LineContext, Token, TokenSink};
use crate::text::ContentStore;

pub use context_cache::LineContextCache;
pub use cursor::InvalidationCursor;
pub use fold::{ExplicitFold, FoldHandler, FoldLevelTracker, IndentFold, NoFold};
pub use shared::SharedBuffer;

/// Text content with its lexer and fold caches.
#[derive(Debug)]
pub struct Buffer {
    content: ContentStore,
    grammar: Arc<Grammar>,
    contexts: LineContextCache,
    folds: FoldLevelTracker,
    listeners: Listeners,
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Buffer {
    /// Empty buffer with the plain grammar and no folding.
    #[must_use]
    pub fn new() -> Self {
        Self::with_text("")
    }

    #[must_use]
    pub fn with_text(text: &str) -> Self {
        let content = ContentStore::with_text(text);
        let lines = content.line_count();
        Self {
            content,
            grammar: Grammar::plain(),
            contexts: LineContextCache::new(lines),
            folds: FoldLevelTracker::new(lines, Arc::new(NoFold)),
            listeners: Listeners::new(),
        }
    }

    #[must_use]
    pub fn content(&self) -> &ContentStore {
        &self.content
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.content.line_count()
    }

    #[must_use]
    pub fn len_chars(&self) -> usize {
        self.content.len_chars()
    }

    /// Text of `line` without its terminator.
    pub fn line_text(&self, line: usize) -> Result<Cow<'_, str>> {
        self.content.line(line)
    }

    #[must_use]
    pub fn text(&self) -> String {
        self.content.to_string()
    }

    /// Insert `text` at char `offset`.
    pub fn insert(&mut self, offset: usize, text: &str) -> Result<EditEvent> {
        let event = self.content.insert(offset, text)?;
        self.after_edit(&event);
        Ok(event)
    }

    /// Remove `length` chars starting at `offset`.
    pub fn remove(&mut self, offset: usize, length: usize) -> Result<EditEvent> {
        let event = self.content.remove(offset, length)?;
        self.after_edit(&event);
        Ok(event)
    }

    fn after_edit(&mut self, event: &EditEvent) {
        if event.is_noop() {
            return;
        }
        self.contexts.apply_edit(event);
        self.folds.apply_edit(event);
        debug_assert_eq!(self.contexts.len(), self.content.line_count());
        debug_assert_eq!(self.folds.len(), self.content.line_count());
        debug!(
            start_line = event.start_line,
            line_delta = event.line_delta,
            offset_delta = event.offset_delta,
            "buffer edited"
        );
        self.listeners.emit(&BufferEvent::Edited(*event));
    }

    /// Replace the whole content and reset every cache.
    pub fn set_text(&mut self, text: &str) {
        self.content.set_text(text);
        let lines = self.content.line_count();
        self.contexts.reset(lines);
        self.folds.reset(lines);
        debug!(lines, "buffer reset");
        self.listeners.emit(&BufferEvent::Reset);
    }

    #[must_use]
    pub fn grammar(&self) -> &Arc<Grammar> {
        &self.grammar
    }

    /// Install a grammar. Every line context is discarded; fold levels stay.
    pub fn set_grammar(&mut self, grammar: Arc<Grammar>) {
        debug!(grammar = grammar.name(), "grammar installed");
        self.grammar = grammar;
        self.contexts.reset(self.content.line_count());
        self.listeners.emit(&BufferEvent::GrammarChanged);
    }

    /// Parse a JSON grammar and install it. On error the current grammar
    /// stays active.
    pub fn load_grammar_json(&mut self, json: &str) -> Result<()> {
        let grammar = Grammar::from_json(json)?;
        self.set_grammar(Arc::new(grammar));
        Ok(())
    }

    #[must_use]
    pub fn fold_handler(&self) -> &Arc<dyn FoldHandler> {
        self.folds.handler()
    }

    /// Install a fold handler. Every fold level is discarded; contexts stay.
    pub fn set_fold_handler(&mut self, handler: Arc<dyn FoldHandler>) {
        self.folds.set_handler(handler);
        self.listeners.emit(&BufferEvent::FoldHandlerChanged);
    }

    fn check_line(&self, line: usize) -> Result<()> {
        let count = self.line_count();
        if line >= count {
            return Err(Error::line(line, count));
        }
        Ok(())
    }

    /// Tokenize `line` into `sink`, re-lexing stale lines before it.
    /// Returns the end context of `line`.
    pub fn tokenize_line<S>(&mut self, line: usize, sink: &mut S) -> Result<LineContext>
    where
        S: TokenSink + ?Sized,
    {
        self.check_line(line)?;
        Ok(self
            .contexts
            .tokenize(&self.grammar, &self.content, line, sink))
    }

    /// Tokens of `line`.
    pub fn tokens(&mut self, line: usize) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        self.tokenize_line(line, &mut tokens)?;
        Ok(tokens)
    }

    /// Tokenize `line` without updating any cache, for shared readers.
    pub fn tokenize_detached<S>(&self, line: usize, sink: &mut S) -> Result<LineContext>
    where
        S: TokenSink + ?Sized,
    {
        self.check_line(line)?;
        Ok(self
            .contexts
            .tokenize_detached(&self.grammar, &self.content, line, sink))
    }

    /// Context `line` starts in: the end context of the previous line.
    pub fn context_before(&mut self, line: usize) -> Result<LineContext> {
        self.check_line(line)?;
        if line == 0 {
            return Ok(self.grammar.initial_context());
        }
        if let Some(context) = self.contexts.valid_context(line - 1) {
            return Ok(context.clone());
        }
        self.tokenize_line(line - 1, &mut crate::highlight::DiscardSink)
    }

    /// Earliest line whose lexer context is stale.
    #[must_use]
    pub fn first_invalid_line(&self) -> Option<usize> {
        self.contexts.first_invalid()
    }

    /// Earliest line whose fold level is stale.
    #[must_use]
    pub fn first_invalid_fold_line(&self) -> Option<usize> {
        self.folds.first_invalid()
    }

    /// Fold level of `line`. Listeners hear about cached levels that changed.
    pub fn fold_level(&mut self, line: usize) -> Result<u32> {
        self.check_line(line)?;
        let (level, changed) = self.folds.fold_level(&self.content, line);
        if let Some((start, end)) = changed {
            self.listeners
                .emit(&BufferEvent::FoldChanged { start, end });
        }
        Ok(level)
    }

    /// Register a callback for buffer events.
    pub fn subscribe<F>(&mut self, callback: F) -> ListenerId
    where
        F: Fn(&BufferEvent) + Send + Sync + 'static,
    {
        self.listeners.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlight::{DiscardSink, RuleDef, RuleSetDef, TokenKind};
    use parking_lot::Mutex;

    fn string_grammar() -> Arc<Grammar> {
        Arc::new(
            Grammar::builder("strings")
                .rule_set(
                    RuleSetDef::new("MAIN")
                        .rule(RuleDef::span("\"", "\"", TokenKind::String).delegate("STRING")),
                )
                .rule_set(
                    RuleSetDef::new("STRING")
                        .default_kind(TokenKind::String)
                        .escape("\\"),
                )
                .build()
                .unwrap(),
        )
    }

    fn recorder(buffer: &mut Buffer) -> Arc<Mutex<Vec<BufferEvent>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        buffer.subscribe(move |event| sink.lock().push(*event));
        events
    }

    #[test]
    fn test_line_count_invariant() {
        let mut buffer = Buffer::with_text("a\nb");
        buffer.insert(1, "\nx\ny").unwrap();
        assert_eq!(buffer.line_count(), 4);
        buffer.remove(0, 4).unwrap();
        assert_eq!(buffer.text(), "y\nb");
        assert_eq!(buffer.tokens(1).unwrap().len(), 1);
    }

    #[test]
    fn test_string_continuation_scenario() {
        let mut buffer = Buffer::with_text("a = \"hello\nworld\"");
        buffer.set_grammar(string_grammar());
        assert_eq!(buffer.tokens(1).unwrap()[0].kind, TokenKind::String);

        // "a = \"hello" -> "a = \"hi\""
        buffer.remove(5, 5).unwrap();
        buffer.insert(5, "hi\"").unwrap();
        let start = buffer.context_before(1).unwrap();
        assert!(LineContext::same(&start, &buffer.grammar().initial_context()));
        assert_eq!(buffer.tokens(1).unwrap()[0].kind, TokenKind::Text);
    }

    #[test]
    fn test_out_of_range_lines() {
        let mut buffer = Buffer::with_text("one");
        assert!(buffer.tokens(1).is_err());
        assert!(buffer.fold_level(3).is_err());
        assert!(buffer.context_before(1).is_err());
        assert!(buffer.tokenize_detached(2, &mut DiscardSink).is_err());
    }

    #[test]
    fn test_events() {
        let mut buffer = Buffer::with_text("a\nb");
        let events = recorder(&mut buffer);
        let edit = buffer.insert(0, "x").unwrap();
        buffer.insert(0, "").unwrap();
        buffer.set_grammar(string_grammar());
        buffer.set_text("new");
        let got = events.lock().clone();
        assert_eq!(
            got,
            vec![
                BufferEvent::Edited(edit),
                BufferEvent::GrammarChanged,
                BufferEvent::Reset
            ]
        );
    }

    #[test]
    fn test_fold_changed_event() {
        let mut buffer = Buffer::with_text("a\n  b\nc");
        buffer.set_fold_handler(Arc::new(IndentFold { tab_width: 4 }));
        for line in 0..3 {
            buffer.fold_level(line).unwrap();
        }
        let events = recorder(&mut buffer);
        buffer.insert(buffer.content().line_start(2).unwrap(), "    ").unwrap();
        assert_eq!(buffer.fold_level(2).unwrap(), 4);
        assert!(events
            .lock()
            .contains(&BufferEvent::FoldChanged { start: 2, end: 2 }));
    }

    #[test]
    fn test_bad_grammar_keeps_previous() {
        let mut buffer = Buffer::with_text("x");
        buffer.set_grammar(string_grammar());
        let err = buffer
            .load_grammar_json(r#"{ "name": "broken", "rule_sets": [] }"#)
            .unwrap_err();
        assert!(matches!(err, Error::Grammar(_)));
        assert_eq!(buffer.grammar().name(), "strings");
    }

    #[test]
    fn test_detached_matches_cached() {
        let mut buffer = Buffer::with_text("\"a\nb\"\nc");
        buffer.set_grammar(string_grammar());
        let mut detached = Vec::new();
        buffer.tokenize_detached(2, &mut detached).unwrap();
        assert_eq!(buffer.first_invalid_line(), Some(0));
        assert_eq!(buffer.tokens(2).unwrap(), detached);
    }
}

//! Per-line cache of lexer end contexts.

use tracing::{debug, trace};

use crate::buffer::cursor::InvalidationCursor;
use crate::event::{EditEvent, EditKind};
use crate::highlight::{DiscardSink, Grammar, LineContext, TokenSink};
use crate::text::LineSource;

/// End context of every line, valid up to the cursor.
#[derive(Clone, Debug)]
pub struct LineContextCache {
    contexts: Vec<Option<LineContext>>,
    cursor: InvalidationCursor,
}

impl LineContextCache {
    #[must_use]
    pub fn new(line_count: usize) -> Self {
        Self {
            contexts: vec![None; line_count],
            cursor: InvalidationCursor::all_invalid(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    #[must_use]
    pub fn first_invalid(&self) -> Option<usize> {
        self.cursor.first_invalid()
    }

    #[must_use]
    pub fn cursor(&self) -> &InvalidationCursor {
        &self.cursor
    }

    /// Cached end context of `line`, if trustworthy.
    #[must_use]
    pub fn valid_context(&self, line: usize) -> Option<&LineContext> {
        if !self.cursor.is_valid(line) {
            return None;
        }
        self.contexts.get(line)?.as_ref()
    }

    /// Discard everything, e.g. after a grammar change.
    pub fn reset(&mut self, line_count: usize) {
        self.contexts.clear();
        self.contexts.resize(line_count, None);
        self.cursor.reset();
    }

    /// Resize to the post-edit line count and mark the edited lines stale.
    ///
    /// The old end context of an edited line moves with the line's tail, so
    /// the next recompute can tell whether it changed.
    pub fn apply_edit(&mut self, event: &EditEvent) {
        if event.is_noop() {
            return;
        }
        let start = event.start_line.min(self.contexts.len());
        let count = event.line_count();
        match event.kind {
            EditKind::Insert => {
                self.contexts
                    .splice(start..start, std::iter::repeat_n(None, count));
            }
            EditKind::Remove => {
                let end = (start + count).min(self.contexts.len());
                self.contexts.drain(start..end);
            }
        }
        self.cursor.record_edit(event);
        trace!(
            start_line = start,
            line_delta = event.line_delta,
            first_invalid = ?self.cursor.first_invalid(),
            "context cache invalidated"
        );
    }

    fn start_context(&self, grammar: &Grammar, line: usize) -> LineContext {
        if line == 0 {
            return grammar.initial_context();
        }
        self.contexts
            .get(line - 1)
            .and_then(Option::as_ref)
            .cloned()
            .unwrap_or_else(|| grammar.initial_context())
    }

    /// First line that must be re-lexed to tokenize `line`.
    fn relex_start(&self, line: usize) -> usize {
        match self.cursor.first_invalid() {
            Some(first) if first < line => first,
            _ => line,
        }
    }

    /// Tokenize `line`, re-lexing the stale lines before it. Only the tokens
    /// of `line` reach `sink`. Returns the end context of `line`.
    pub fn tokenize<L, S>(
        &mut self,
        grammar: &Grammar,
        source: &L,
        line: usize,
        sink: &mut S,
    ) -> LineContext
    where
        L: LineSource + ?Sized,
        S: TokenSink + ?Sized,
    {
        let start = self.relex_start(line);
        let was_valid = self.cursor.is_valid(line);
        if start < line {
            debug!(start, line, "re-lexing stale lines");
        }

        let lexer = grammar.lexer();
        let mut previous = self.start_context(grammar, start);
        for i in start..line {
            let text = source.line_text(i);
            previous = lexer.tokenize_line(&previous, &text, &mut DiscardSink);
            self.contexts[i] = Some(previous.clone());
        }

        let text = source.line_text(line);
        let context = lexer.tokenize_line(&previous, &text, sink);
        let changed = self.contexts[line]
            .as_ref()
            .is_none_or(|old| !LineContext::same(old, &context));
        self.contexts[line] = Some(context.clone());

        if !was_valid {
            self.cursor.settle(line, changed, self.contexts.len());
            trace!(line, changed, first_invalid = ?self.cursor.first_invalid(), "context cursor settled");
        }
        context
    }

    /// Tokenize `line` from the nearest trustworthy context without touching
    /// the cache.
    pub fn tokenize_detached<L, S>(
        &self,
        grammar: &Grammar,
        source: &L,
        line: usize,
        sink: &mut S,
    ) -> LineContext
    where
        L: LineSource + ?Sized,
        S: TokenSink + ?Sized,
    {
        let start = self.relex_start(line);
        let lexer = grammar.lexer();
        let mut previous = self.start_context(grammar, start);
        for i in start..line {
            previous = lexer.tokenize_line(&previous, &source.line_text(i), &mut DiscardSink);
        }
        lexer.tokenize_line(&previous, &source.line_text(line), sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlight::{RuleDef, RuleSetDef, Token, TokenKind};
    use crate::text::ContentStore;

    fn grammar() -> Grammar {
        Grammar::builder("strings")
            .rule_set(
                RuleSetDef::new("MAIN")
                    .rule(RuleDef::span("\"", "\"", TokenKind::String).delegate("STRING")),
            )
            .rule_set(RuleSetDef::new("STRING").default_kind(TokenKind::String))
            .build()
            .unwrap()
    }

    fn tokens(
        cache: &mut LineContextCache,
        grammar: &Grammar,
        store: &ContentStore,
        line: usize,
    ) -> Vec<Token> {
        let mut out = Vec::new();
        cache.tokenize(grammar, store, line, &mut out);
        out
    }

    #[test]
    fn test_tokenize_fills_prefix() {
        let grammar = grammar();
        let store = ContentStore::with_text("a\n\"b\nc\"\nd");
        let mut cache = LineContextCache::new(store.line_count());
        let line2 = tokens(&mut cache, &grammar, &store, 2);
        assert_eq!(line2[0].kind, TokenKind::String);
        // context of line 2 changed relative to the empty cache
        assert_eq!(cache.first_invalid(), Some(3));
        assert!(cache.valid_context(1).is_some());
        assert!(cache.valid_context(3).is_none());
    }

    #[test]
    fn test_idempotent_retokenize() {
        let grammar = grammar();
        let store = ContentStore::with_text("a\nb\nc");
        let mut cache = LineContextCache::new(store.line_count());
        let first = tokens(&mut cache, &grammar, &store, 1);
        let cursor = cache.first_invalid();
        let second = tokens(&mut cache, &grammar, &store, 1);
        assert_eq!(first, second);
        assert_eq!(cache.first_invalid(), cursor);
    }

    #[test]
    fn test_edit_converges() {
        let grammar = grammar();
        let mut store = ContentStore::with_text("x\ny\nz\nw");
        let mut cache = LineContextCache::new(store.line_count());
        tokens(&mut cache, &grammar, &store, 3);
        assert_eq!(cache.first_invalid(), None);

        let event = store.insert(2, "1").unwrap();
        cache.apply_edit(&event);
        assert_eq!(cache.first_invalid(), Some(1));
        // line 1 ends in MAIN as before and no edit lies after it
        tokens(&mut cache, &grammar, &store, 1);
        assert_eq!(cache.first_invalid(), None);
    }

    #[test]
    fn test_edit_resizes() {
        let grammar = grammar();
        let mut store = ContentStore::with_text("a\nb");
        let mut cache = LineContextCache::new(store.line_count());
        tokens(&mut cache, &grammar, &store, 1);
        let event = store.insert(1, "\n\n").unwrap();
        cache.apply_edit(&event);
        assert_eq!(cache.len(), store.line_count());
        let event = store.remove(0, 3).unwrap();
        cache.apply_edit(&event);
        assert_eq!(cache.len(), store.line_count());
    }

    #[test]
    fn test_detached_leaves_cache_untouched() {
        let grammar = grammar();
        let store = ContentStore::with_text("\"a\nb\"\nc");
        let cache = LineContextCache::new(store.line_count());
        let mut out = Vec::new();
        cache.tokenize_detached(&grammar, &store, 1, &mut out);
        assert_eq!(out[0].kind, TokenKind::String);
        assert_eq!(cache.first_invalid(), Some(0));
    }
}

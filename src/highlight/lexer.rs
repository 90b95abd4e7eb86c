//! Rule-driven line lexer.
//!
//! [`Lexer::tokenize_line`] is a pure function of the previous line's end
//! context, the line text and the grammar. It never fails: characters no
//! rule claims fall back to the default kind of the active rule-set.
//!
//! At each position the lexer checks, in order: the terminate column of the
//! active rule-set, the escape sequence, the end of the enclosing span, and
//! the rules triggered by the current character. Anything else is plain text
//! that is tracked for keyword lookup.

use std::sync::Arc;

use tracing::trace;

use super::context::LineContext;
use super::grammar::{CAPTURE_PLACEHOLDER, Grammar};
use super::rule::{Capture, Rule, RuleFlags, RuleRef, RuleSet, SpanEnd};
use super::token::{Token, TokenKind};
use super::tokenizer::TokenSink;

/// Applies a grammar to single lines.
#[derive(Clone, Copy, Debug)]
pub struct Lexer<'g> {
    grammar: &'g Grammar,
}

impl<'g> Lexer<'g> {
    #[must_use]
    pub fn new(grammar: &'g Grammar) -> Self {
        Self { grammar }
    }

    /// Tokenize `line` starting in `previous`, pushing tokens into `sink`.
    ///
    /// Tokens are pushed in order, cover the line contiguously and are never
    /// empty. Returns the interned context at the end of the line.
    pub fn tokenize_line<S>(&self, previous: &LineContext, line: &str, sink: &mut S) -> LineContext
    where
        S: TokenSink + ?Sized,
    {
        let chars: Vec<char> = line.chars().collect();
        let whitespace_end = chars
            .iter()
            .position(|c| !c.is_whitespace())
            .unwrap_or(chars.len());
        let mut state = LineState {
            grammar: self.grammar,
            chars: &chars,
            sink,
            context: previous.clone(),
            saved: None,
            pos: 0,
            last_offset: 0,
            word_start: None,
            whitespace_end,
            escaped: false,
        };
        state.run();
        let context = state.finish();
        self.grammar.intern(context)
    }
}

struct LineState<'a, S: ?Sized> {
    grammar: &'a Grammar,
    chars: &'a [char],
    sink: &'a mut S,
    context: LineContext,
    /// Context in force before a terminate-column switch.
    saved: Option<LineContext>,
    pos: usize,
    /// Start of the pending run of unmarked text.
    last_offset: usize,
    word_start: Option<usize>,
    whitespace_end: usize,
    escaped: bool,
}

impl<'a, S: TokenSink + ?Sized> LineState<'a, S> {
    fn rule_set(&self) -> &'a RuleSet {
        self.grammar.rule_set(self.context.rule_set())
    }

    fn run(&mut self) {
        while self.pos < self.chars.len() {
            self.check_terminate();

            if self.escaped {
                self.escaped = false;
                self.end_word();
                self.pos += 1;
                continue;
            }
            if self.check_escape() || self.check_span_end() || self.check_rules() {
                continue;
            }

            let c = self.chars[self.pos];
            if self.rule_set().is_word_char(c) {
                if self.word_start.is_none() {
                    self.word_start = Some(self.pos);
                }
            } else {
                self.end_word();
            }
            self.pos += 1;
        }
    }

    fn finish(mut self) -> LineContext {
        self.end_word();
        self.flush(self.chars.len());
        let mut context = self.saved.take().unwrap_or(self.context);
        while let Some(rule) = context.in_rule() {
            if !self.grammar.rule(rule).ends_at_line_end() {
                break;
            }
            match context.pop() {
                Some(parent) => context = parent,
                None => break,
            }
        }
        context
    }

    fn emit(&mut self, start: usize, end: usize, kind: TokenKind) {
        if start < end {
            self.sink.push(Token::new(kind, start, end));
        }
    }

    /// Emit the pending run up to `end` with the active default kind.
    fn flush(&mut self, end: usize) {
        let kind = self.rule_set().default_kind();
        self.emit(self.last_offset, end, kind);
        self.last_offset = end;
    }

    /// Close the current word, marking it if it is a keyword or a number.
    fn end_word(&mut self) {
        let Some(start) = self.word_start.take() else {
            return;
        };
        let set = self.rule_set();
        let word = &self.chars[start..self.pos];
        let kind = set.keyword(word).or_else(|| {
            (set.highlight_digits() && word.first().is_some_and(char::is_ascii_digit))
                .then_some(TokenKind::Number)
        });
        if let Some(kind) = kind {
            self.flush(start);
            self.emit(start, self.pos, kind);
            self.last_offset = self.pos;
        }
    }

    /// Emit `len` chars of match text at the current position and advance.
    fn mark(&mut self, len: usize, kind: TokenKind) {
        self.flush(self.pos);
        self.emit(self.pos, self.pos + len, kind);
        self.pos += len;
        self.last_offset = self.pos;
    }

    fn check_terminate(&mut self) {
        if self.saved.is_some() {
            return;
        }
        let Some(terminate) = self.rule_set().terminate() else {
            return;
        };
        if self.pos < terminate.column {
            return;
        }
        trace!(column = terminate.column, "terminate column reached");
        self.end_word();
        self.flush(self.pos);
        self.escaped = false;
        let fallback = LineContext::root(terminate.fallback);
        self.saved = Some(std::mem::replace(&mut self.context, fallback));
    }

    fn active_escape(&self) -> Option<&'a [char]> {
        if let Some(rule) = self.context.in_rule() {
            if let Rule::Span { escape, .. } = self.grammar.rule(rule) {
                return escape.as_deref();
            }
        }
        self.rule_set().escape()
    }

    fn check_escape(&mut self) -> bool {
        let Some(escape) = self.active_escape() else {
            return false;
        };
        if !self.rule_set().matches_at(self.chars, self.pos, escape) {
            return false;
        }
        self.end_word();
        self.pos += escape.len();
        self.escaped = true;
        true
    }

    fn check_span_end(&mut self) -> bool {
        let Some(rule_ref) = self.context.in_rule() else {
            return false;
        };
        let Rule::Span {
            end, kind, flags, ..
        } = self.grammar.rule(rule_ref)
        else {
            return false;
        };
        let end_len = {
            let end_text = match (self.context.span_end(), end) {
                (Some(substituted), _) => substituted,
                (None, SpanEnd::Text(text)) => text.as_slice(),
                (None, SpanEnd::EndOfLine) => return false,
            };
            let owner = self.grammar.rule_set(rule_ref.set);
            if !owner.matches_at(self.chars, self.pos, end_text) {
                return false;
            }
            end_text.len()
        };

        self.end_word();
        self.flush(self.pos);
        let Some(parent) = self.context.pop() else {
            return false;
        };
        let end_kind = if flags.contains(RuleFlags::EXCLUDE_MATCH) {
            self.grammar.rule_set(parent.rule_set()).default_kind()
        } else {
            *kind
        };
        self.context = parent;
        self.mark(end_len, end_kind);
        true
    }

    fn position_ok(&self, flags: RuleFlags, set: &RuleSet) -> bool {
        if flags.contains(RuleFlags::AT_LINE_START) && self.pos != 0 {
            return false;
        }
        if flags.contains(RuleFlags::AT_WHITESPACE_END) && self.pos != self.whitespace_end {
            return false;
        }
        if flags.contains(RuleFlags::AT_WORD_START)
            && self.pos > 0
            && set.is_word_char(self.chars[self.pos - 1])
        {
            return false;
        }
        true
    }

    fn check_rules(&mut self) -> bool {
        let set = self.rule_set();
        let set_id = self.context.rule_set();
        let c = self.chars[self.pos];
        for &index in set.rules_for(c) {
            let rule = &set.rules()[index as usize];
            if !self.position_ok(rule.flags(), set)
                || !set.matches_at(self.chars, self.pos, rule.match_text())
            {
                continue;
            }
            let rule_ref = RuleRef { set: set_id, index };
            if self.apply(rule_ref, rule, set) {
                return true;
            }
        }
        false
    }

    fn apply(&mut self, rule_ref: RuleRef, rule: &'a Rule, set: &'a RuleSet) -> bool {
        let exclude = rule.flags().contains(RuleFlags::EXCLUDE_MATCH);
        let match_kind = |kind: TokenKind| if exclude { set.default_kind() } else { kind };

        match rule {
            Rule::Sequence {
                text,
                kind,
                delegate,
                ..
            } => {
                self.end_word();
                self.mark(text.len(), match_kind(*kind));
                if let Some(delegate) = delegate {
                    self.context = self.context.with_rule_set(*delegate);
                }
                true
            }
            Rule::Span {
                begin,
                capture,
                end,
                kind,
                delegate,
                ..
            } => {
                let (len, span_end) = match capture {
                    Some(capture) => match self.match_capture(set, begin.len(), capture, end) {
                        Some(found) => found,
                        None => return false,
                    },
                    None => (begin.len(), None),
                };
                self.end_word();
                self.mark(len, match_kind(*kind));
                self.context = self.context.push(*delegate, Some(rule_ref), span_end);
                true
            }
            Rule::MarkFollowing { text, kind, .. } => {
                self.end_word();
                let mut end = self.pos + text.len();
                while end < self.chars.len() && set.is_word_char(self.chars[end]) {
                    end += 1;
                }
                self.mark(end - self.pos, *kind);
                true
            }
            Rule::MarkPrevious { text, kind, .. } => {
                if let Some(start) = self.word_start.take() {
                    self.flush(start);
                    self.emit(start, self.pos, *kind);
                    self.last_offset = self.pos;
                }
                self.mark(text.len(), match_kind(*kind));
                true
            }
        }
    }

    /// Match a parametrized begin: the captured run and its suffix. Returns
    /// the total match length and the substituted end text.
    fn match_capture(
        &self,
        set: &RuleSet,
        begin_len: usize,
        capture: &Capture,
        end: &SpanEnd,
    ) -> Option<(usize, Option<Arc<[char]>>)> {
        let start = self.pos + begin_len;
        let accepts = |c: char| {
            if capture.chars.is_empty() {
                set.is_word_char(c)
            } else {
                capture.chars.contains(&c)
            }
        };
        let mut stop = start;
        while stop < self.chars.len() && accepts(self.chars[stop]) {
            stop += 1;
        }
        if !set.matches_at(self.chars, stop, &capture.suffix) {
            return None;
        }
        let captured = &self.chars[start..stop];
        let span_end = match end {
            SpanEnd::Text(template) => Some(substitute(template, captured)),
            SpanEnd::EndOfLine => None,
        };
        Some((stop + capture.suffix.len() - self.pos, span_end))
    }
}

/// Replace every placeholder in `template` with `captured`.
fn substitute(template: &[char], captured: &[char]) -> Arc<[char]> {
    let placeholder: Vec<char> = CAPTURE_PLACEHOLDER.chars().collect();
    let mut out = Vec::with_capacity(template.len() + captured.len());
    let mut i = 0;
    while i < template.len() {
        if template[i..].starts_with(&placeholder) {
            out.extend_from_slice(captured);
            i += placeholder.len();
        } else {
            out.push(template[i]);
            i += 1;
        }
    }
    Arc::from(out)
}

//! Token sinks and the grammar registry.

use std::collections::HashMap;
use std::sync::Arc;

use super::grammar::Grammar;
use super::token::Token;

/// Receiver of the tokens of one line.
pub trait TokenSink {
    fn push(&mut self, token: Token);
}

impl TokenSink for Vec<Token> {
    fn push(&mut self, token: Token) {
        Vec::push(self, token);
    }
}

/// Sink that drops every token. Used for lines re-lexed only for their
/// end context.
#[derive(Clone, Copy, Debug, Default)]
pub struct DiscardSink;

impl TokenSink for DiscardSink {
    fn push(&mut self, _token: Token) {}
}

/// Counts tokens without storing them.
#[derive(Clone, Copy, Debug, Default)]
pub struct CountingSink {
    pub count: usize,
}

impl TokenSink for CountingSink {
    fn push(&mut self, _token: Token) {
        self.count += 1;
    }
}

/// Tokenize a whole text from the initial context.
///
/// Returned offsets are absolute char offsets into `text`. Lines are split on
/// `\n` with an optional preceding `\r`.
#[must_use]
pub fn tokenize_text(grammar: &Grammar, text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut context = grammar.initial_context();
    let mut line_start = 0usize;
    let lexer = grammar.lexer();

    for raw_line in text.split_inclusive('\n') {
        let raw_len = raw_line.chars().count();
        let line = raw_line
            .strip_suffix('\n')
            .map_or(raw_line, |l| l.strip_suffix('\r').unwrap_or(l));

        let mut line_tokens = Vec::new();
        context = lexer.tokenize_line(&context, line, &mut line_tokens);
        tokens.extend(line_tokens.into_iter().map(|mut t| {
            t.start += line_start;
            t.end += line_start;
            t
        }));
        line_start += raw_len;
    }
    tokens
}

/// Registry for grammar lookup by extension or name.
#[derive(Debug, Default)]
pub struct GrammarRegistry {
    grammars: Vec<Arc<Grammar>>,
    by_extension: HashMap<String, usize>,
    by_name: HashMap<String, usize>,
}

impl GrammarRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a grammar. Later registrations override existing lookups.
    pub fn register(&mut self, grammar: Arc<Grammar>) {
        let index = self.grammars.len();
        self.by_name
            .insert(grammar.name().to_ascii_lowercase(), index);

        for ext in grammar.extensions() {
            let key = ext.trim_start_matches('.').to_ascii_lowercase();
            if !key.is_empty() {
                self.by_extension.insert(key, index);
            }
        }

        self.grammars.push(grammar);
    }

    /// Get grammar by file extension (case-insensitive, with or without dot).
    #[must_use]
    pub fn for_extension(&self, ext: &str) -> Option<Arc<Grammar>> {
        let key = ext.trim_start_matches('.').to_ascii_lowercase();
        let index = self.by_extension.get(&key)?;
        self.grammars.get(*index).cloned()
    }

    /// Get grammar by name (case-insensitive).
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<Arc<Grammar>> {
        let index = self.by_name.get(&name.to_ascii_lowercase())?;
        self.grammars.get(*index).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.grammars.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.grammars.is_empty()
    }

    /// Create registry with all built-in grammars.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Grammar::plain());
        registry.register(Arc::new(crate::highlight::languages::json::grammar()));
        registry.register(Arc::new(crate::highlight::languages::rust::grammar()));
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlight::{RuleDef, RuleSetDef, TokenKind};

    fn stub() -> Arc<Grammar> {
        Arc::new(
            Grammar::builder("Stub")
                .extensions(["rs", "RUST"])
                .rule_set(RuleSetDef::new("MAIN").rule(RuleDef::eol_span("#", TokenKind::Comment)))
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn tokenize_text_offsets_lines_lf() {
        let grammar = Grammar::plain();
        let tokens = tokenize_text(&grammar, "aa\nbbb");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].range(), 0..2);
        assert_eq!(tokens[1].range(), 3..6);
    }

    #[test]
    fn tokenize_text_offsets_lines_crlf() {
        let grammar = Grammar::plain();
        let tokens = tokenize_text(&grammar, "aa\r\nbbb");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].range(), 0..2);
        assert_eq!(tokens[1].range(), 4..7);
    }

    #[test]
    fn tokenize_text_counts_chars_not_bytes() {
        let grammar = Grammar::plain();
        let tokens = tokenize_text(&grammar, "é\nü");
        assert_eq!(tokens[1].range(), 2..3);
    }

    #[test]
    fn sinks() {
        let grammar = stub();
        let mut counting = CountingSink::default();
        grammar
            .lexer()
            .tokenize_line(&grammar.initial_context(), "x # y", &mut counting);
        assert_eq!(counting.count, 3);
        let end = grammar
            .lexer()
            .tokenize_line(&grammar.initial_context(), "x # y", &mut DiscardSink);
        assert!(crate::highlight::LineContext::same(
            &end,
            &grammar.initial_context()
        ));
    }

    #[test]
    fn registry_lookup_is_case_insensitive() {
        let mut registry = GrammarRegistry::new();
        registry.register(stub());
        assert!(registry.for_extension("rs").is_some());
        assert!(registry.for_extension(".RS").is_some());
        assert!(registry.for_extension("rust").is_some());
        assert!(registry.by_name("stub").is_some());
        assert!(registry.for_extension("py").is_none());
    }

    #[test]
    fn registry_with_builtins() {
        let registry = GrammarRegistry::with_builtins();
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.for_extension("json").unwrap().name(), "json");
        assert_eq!(registry.for_extension("rs").unwrap().name(), "rust");
        assert_eq!(registry.for_extension("txt").unwrap().name(), "text");
    }
}

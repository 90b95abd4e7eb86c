//! Grammars, line contexts and the rule-driven lexer.

pub mod context;
pub mod grammar;
pub mod languages;
pub mod lexer;
pub mod rule;
pub mod token;
pub mod tokenizer;


pub use context::{ContextInterner, LineContext};
pub use grammar::{
    CaptureDef, Grammar, GrammarBuilder, GrammarDef, KeywordDef, MAIN_RULE_SET, RuleDef,
    RuleSetDef, RuleType,
};
pub use lexer::Lexer;
pub use rule::{Rule, RuleFlags, RuleRef, RuleSet, RuleSetId, SpanEnd};
pub use token::{Token, TokenKind};
pub use tokenizer::{CountingSink, DiscardSink, GrammarRegistry, TokenSink, tokenize_text};

use crate::highlight::grammar::{Grammar, RuleDef, RuleSetDef};
use crate::highlight::rule::RuleFlags;
use crate::highlight::token::TokenKind;

/// Built-in JSON grammar, accepting `//` comments.
#[must_use]
pub fn grammar() -> Grammar {
    Grammar::builder("json")
        .extensions(["json", "jsonc"])
        .rule_set(
            RuleSetDef::new("MAIN")
                .highlight_digits(true)
                .word_chars("_.-+")
                .keywords(TokenKind::Boolean, ["true", "false"])
                .keywords(TokenKind::Constant, ["null"])
                .rule(RuleDef::eol_span("//", TokenKind::Comment))
                .rule(
                    RuleDef::span("\"", "\"", TokenKind::String)
                        .delegate("STRING")
                        .flags(RuleFlags::NO_LINE_BREAK),
                )
                .rule(RuleDef::sequence("{", TokenKind::Delimiter))
                .rule(RuleDef::sequence("}", TokenKind::Delimiter))
                .rule(RuleDef::sequence("[", TokenKind::Delimiter))
                .rule(RuleDef::sequence("]", TokenKind::Delimiter))
                .rule(RuleDef::sequence(":", TokenKind::Punctuation))
                .rule(RuleDef::sequence(",", TokenKind::Punctuation)),
        )
        .rule_set(
            RuleSetDef::new("STRING")
                .default_kind(TokenKind::String)
                .escape("\\"),
        )
        .build()
        .expect("built-in json grammar is valid")
}

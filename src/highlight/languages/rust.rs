use crate::highlight::grammar::{Grammar, RuleDef, RuleSetDef};
use crate::highlight::rule::RuleFlags;
use crate::highlight::token::TokenKind;

const OPERATORS: &[&str] = &[
    "::", "->", "=>", "==", "!=", "<=", ">=", "&&", "||", "+=", "-=", "*=", "/=", "..", "+", "-",
    "*", "/", "%", "=", "<", ">", "&", "|", "^", "?", ".",
];

/// Built-in Rust grammar.
#[must_use]
pub fn grammar() -> Grammar {
    let mut main = RuleSetDef::new("MAIN")
        .highlight_digits(true)
        .rule(RuleDef::eol_span("///", TokenKind::CommentDoc))
        .rule(RuleDef::eol_span("//!", TokenKind::CommentDoc))
        .rule(RuleDef::eol_span("//", TokenKind::Comment))
        .rule(RuleDef::span("/*", "*/", TokenKind::CommentBlock).flags(RuleFlags::NO_ESCAPE))
        .rule(
            RuleDef::span("r", "\"$0", TokenKind::String)
                .capture("#", "\"")
                .flags(RuleFlags::AT_WORD_START | RuleFlags::NO_ESCAPE),
        )
        .rule(RuleDef::span("\"", "\"", TokenKind::String).delegate("STRING"))
        .rule(RuleDef::span("#[", "]", TokenKind::Attribute).flags(RuleFlags::NO_LINE_BREAK))
        .rule(RuleDef::span("#![", "]", TokenKind::Attribute).flags(RuleFlags::NO_LINE_BREAK))
        .rule(RuleDef::mark_following("'", TokenKind::Lifetime))
        .rule(RuleDef::sequence("!=", TokenKind::Operator))
        .rule(RuleDef::mark_previous("!", TokenKind::Macro))
        .rule(RuleDef::mark_previous("(", TokenKind::Function).flags(RuleFlags::EXCLUDE_MATCH))
        .keywords(
            TokenKind::KeywordControl,
            [
                "if", "else", "match", "loop", "while", "for", "break", "continue", "return",
            ],
        )
        .keywords(
            TokenKind::Keyword,
            [
                "fn", "let", "const", "static", "struct", "enum", "trait", "impl", "type", "mod",
                "use", "crate", "self", "Self", "super", "where", "as", "in",
            ],
        )
        .keywords(
            TokenKind::KeywordModifier,
            [
                "pub", "mut", "ref", "move", "async", "await", "unsafe", "extern", "dyn",
            ],
        )
        .keywords(
            TokenKind::KeywordType,
            [
                "bool", "u8", "u16", "u32", "u64", "u128", "usize", "i8", "i16", "i32", "i64",
                "i128", "isize", "f32", "f64", "char", "str", "String", "Vec", "Option", "Result",
            ],
        )
        .keywords(TokenKind::Boolean, ["true", "false"]);

    for op in OPERATORS {
        main = main.rule(RuleDef::sequence(op, TokenKind::Operator));
    }
    for delim in ["{", "}", "(", ")", "[", "]"] {
        main = main.rule(RuleDef::sequence(delim, TokenKind::Delimiter));
    }
    for punct in [";", ",", ":"] {
        main = main.rule(RuleDef::sequence(punct, TokenKind::Punctuation));
    }

    Grammar::builder("rust")
        .extensions(["rs"])
        .rule_set(main)
        .rule_set(
            RuleSetDef::new("STRING")
                .default_kind(TokenKind::String)
                .escape("\\"),
        )
        .build()
        .expect("built-in rust grammar is valid")
}

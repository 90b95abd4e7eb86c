//! Fuzz target for the lexer.
//!
//! Tokens of every line must be contiguous, non-empty and cover the line.

#![no_main]

use libfuzzer_sys::fuzz_target;
use textflow::highlight::languages::{json, rust};

fuzz_target!(|data: &str| {
    for grammar in [rust::grammar(), json::grammar()] {
        let lexer = grammar.lexer();
        let mut context = grammar.initial_context();
        for line in data.split('\n') {
            let mut tokens = Vec::new();
            context = lexer.tokenize_line(&context, line, &mut tokens);
            let mut end = 0;
            for token in &tokens {
                assert_eq!(token.start, end);
                assert!(token.start < token.end);
                end = token.end;
            }
            assert_eq!(end, line.chars().count());
        }
    }
});

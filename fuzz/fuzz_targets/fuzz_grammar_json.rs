//! Fuzz target for JSON grammar definitions.
//!
//! Loading must either fail with an error or produce a grammar that can
//! tokenize any text without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use textflow::highlight::{Grammar, tokenize_text};

fuzz_target!(|data: &str| {
    let Some((definition, text)) = data.split_once('\0') else {
        let _ = Grammar::from_json(data);
        return;
    };
    if let Ok(grammar) = Grammar::from_json(definition) {
        let _ = tokenize_text(&grammar, text);
    }
});

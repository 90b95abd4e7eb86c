//! Built-in grammars.

pub mod json;
pub mod rust;

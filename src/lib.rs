//! `textflow` - incremental text-layout engine
//!
//! A text buffer that keeps a context-sensitive tokenizer, fold levels, a
//! line visibility map and a window of soft-wrapped screen rows consistent
//! under arbitrary edits, recomputing only what an edit actually affects.
//!
//! ```
//! use std::sync::Arc;
//! use textflow::{Editor, LayoutOptions};
//! use textflow::buffer::IndentFold;
//!
//! let text = "fn main() {\n    let x = 1;\n    let y = 2;\n}\n";
//! let mut editor = Editor::with_text(text, LayoutOptions::default()).unwrap();
//! editor.set_fold_handler(Arc::new(IndentFold::default()));
//! editor.collapse_fold(0).unwrap();
//!
//! let lines: Vec<usize> = editor.rows().unwrap().iter().map(|r| r.physical_line).collect();
//! assert_eq!(lines, vec![0, 3, 4]);
//! ```

// Crate-level lint configuration
#![forbid(unsafe_code)]
#![allow(clippy::cast_possible_truncation)] // Intentional line/offset casts
#![allow(clippy::cast_possible_wrap)] // Edit deltas are signed
#![allow(clippy::module_name_repetitions)] // Allow buffer::BufferEvent etc
#![allow(clippy::missing_errors_doc)] // Docs WIP
#![allow(clippy::missing_panics_doc)] // Docs WIP
#![allow(clippy::missing_const_for_fn)] // Many functions could be const, not critical
#![allow(clippy::doc_markdown)] // Allow technical names without backticks
#![allow(clippy::use_self)] // Allow explicit type names in impl blocks
#![allow(clippy::collapsible_if)] // Sometimes nested ifs are clearer
#![allow(clippy::items_after_statements)] // Common pattern in tests
#![allow(clippy::semicolon_if_nothing_returned)] // Style preference
#![allow(clippy::needless_collect)] // Collect for assertions is clear

pub mod buffer;
pub mod config;
pub mod editor;
pub mod error;
pub mod event;
pub mod highlight;
pub mod text;
pub mod unicode;
pub mod view;

// Re-export core types at crate root
pub use buffer::{Buffer, FoldHandler, SharedBuffer};
pub use config::{LayoutOptions, WrapMode};
pub use editor::Editor;
pub use error::{Error, GrammarError, Result};
pub use event::{BufferEvent, EditEvent, EditKind, ListenerId};
pub use highlight::{Grammar, GrammarRegistry, LineContext, Token, TokenKind};
pub use text::ContentStore;
pub use unicode::WidthMethod;
pub use view::{Chunk, DisplayEvent, DisplayManager, RenderRow, ScreenRow, VisibilityMap};

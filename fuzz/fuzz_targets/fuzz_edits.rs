//! Fuzz target for editing through the editor facade.
//!
//! Arbitrary edits, folds and scrolls must never panic, and the rendered
//! rows must match an editor freshly loaded with the resulting text.

#![no_main]

use std::sync::Arc;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use textflow::buffer::IndentFold;
use textflow::highlight::languages::rust;
use textflow::{Editor, LayoutOptions, WrapMode};

#[derive(Arbitrary, Debug)]
enum Op {
    Insert { at: u16, text: String },
    Remove { at: u16, len: u8 },
    Collapse { line: u16 },
    Expand { line: u16, fully: bool },
    ScrollBy { delta: i8 },
    Render,
}

#[derive(Arbitrary, Debug)]
struct Input {
    text: String,
    wrap_width: u8,
    ops: Vec<Op>,
}

fn editor(text: &str, options: LayoutOptions) -> Editor {
    let mut editor = Editor::with_text(text, options).unwrap();
    editor.set_grammar(Arc::new(rust::grammar()));
    editor.set_fold_handler(Arc::new(IndentFold::default()));
    editor
}

fuzz_target!(|input: Input| {
    let options = if input.wrap_width == 0 {
        LayoutOptions::default().with_viewport_height(12)
    } else {
        LayoutOptions::default()
            .with_wrap(WrapMode::Word, usize::from(input.wrap_width))
            .with_viewport_height(12)
    };
    let mut editor = editor(&input.text, options);

    for op in input.ops.iter().take(64) {
        match op {
            Op::Insert { at, text } => {
                let offset = usize::from(*at) % (editor.buffer().len_chars() + 1);
                editor.insert(offset, text).unwrap();
            }
            Op::Remove { at, len } => {
                let total = editor.buffer().len_chars();
                let offset = usize::from(*at) % (total + 1);
                let len = usize::from(*len).min(total - offset);
                editor.remove(offset, len).unwrap();
            }
            Op::Collapse { line } => {
                let line = usize::from(*line) % editor.line_count();
                editor.collapse_fold(line).unwrap();
            }
            Op::Expand { line, fully } => {
                let line = usize::from(*line) % editor.line_count();
                editor.expand_fold(line, *fully).unwrap();
            }
            Op::ScrollBy { delta } => {
                editor.scroll_by(isize::from(*delta));
            }
            Op::Render => {
                editor.rows().unwrap();
            }
        }
    }

    editor.expand_all_folds();
    let top = editor.display().screen().first_line();
    let skew = editor.display().screen().skew();
    let mut fresh = self::editor(&editor.text(), options);
    fresh.scroll_to(top, skew).unwrap();
    assert_eq!(editor.rows().unwrap(), fresh.rows().unwrap());
});

//! Property-based tests for the view layer.
//!
//! After any interleaving of edits, folds, narrowing and scrolling, the
//! rows an editor serves must equal a window laid out from scratch over the
//! same visibility, top line and skew, with chunks from a fresh lex.

use std::sync::Arc;

use proptest::prelude::*;
use textflow::buffer::{Buffer, IndentFold};
use textflow::highlight::languages::rust;
use textflow::view::{ChunkCache, LayoutSource, ScreenLineMapper};
use textflow::{Editor, LayoutOptions, RenderRow, WrapMode};

// ============================================================================
// Fixtures
// ============================================================================

#[derive(Clone, Debug)]
enum Op {
    Insert { at: usize, text: String },
    Remove { at: usize, len: usize },
    Collapse { line: usize },
    Expand { line: usize, fully: bool },
    Narrow { a: usize, b: usize },
    ShowAll,
    ScrollBy { delta: isize },
    ScrollTo { line: usize, skew: usize },
    /// Pull the window, leaving every row settled.
    Render,
}

// ============================================================================
// Strategies
// ============================================================================

/// Fragments that change indentation, wrapping and lexer context.
fn fragment() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop::sample::select(vec![
            "\n", "\n", "\n    ", "    ", "\t", " ", "fn", "word", "longer_identifier", "/*",
            "*/", "\"", "{", "}", "// note", "漢字",
        ]),
        0..10,
    )
    .prop_map(|parts| parts.concat())
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (any::<usize>(), fragment()).prop_map(|(at, text)| Op::Insert { at, text }),
        2 => (any::<usize>(), 0usize..12).prop_map(|(at, len)| Op::Remove { at, len }),
        2 => any::<usize>().prop_map(|line| Op::Collapse { line }),
        1 => (any::<usize>(), any::<bool>()).prop_map(|(line, fully)| Op::Expand { line, fully }),
        1 => (any::<usize>(), any::<usize>()).prop_map(|(a, b)| Op::Narrow { a, b }),
        1 => Just(Op::ShowAll),
        3 => (-6isize..=6).prop_map(|delta| Op::ScrollBy { delta }),
        1 => (any::<usize>(), 0usize..3).prop_map(|(line, skew)| Op::ScrollTo { line, skew }),
        3 => Just(Op::Render),
    ]
}

fn options() -> impl Strategy<Value = LayoutOptions> {
    (
        prop::sample::select(vec![WrapMode::None, WrapMode::Char, WrapMode::Word]),
        3usize..12,
        1usize..7,
    )
        .prop_map(|(mode, width, height)| {
            LayoutOptions::default()
                .with_wrap(mode, width)
                .with_viewport_height(height)
        })
}

fn editor(text: &str, options: LayoutOptions) -> Editor {
    let mut editor = Editor::with_text(text, options).unwrap();
    editor.set_grammar(Arc::new(rust::grammar()));
    editor.set_fold_handler(Arc::new(IndentFold { tab_width: 4 }));
    editor
}

fn apply(editor: &mut Editor, op: &Op) {
    let count = editor.line_count();
    match op {
        Op::Insert { at, text } => {
            let offset = at % (editor.buffer().len_chars() + 1);
            editor.insert(offset, text).unwrap();
        }
        Op::Remove { at, len } => {
            let total = editor.buffer().len_chars();
            let offset = at % (total + 1);
            let len = (*len).min(total - offset);
            editor.remove(offset, len).unwrap();
        }
        Op::Collapse { line } => {
            editor.collapse_fold(line % count).unwrap();
        }
        Op::Expand { line, fully } => {
            editor.expand_fold(line % count, *fully).unwrap();
        }
        Op::Narrow { a, b } => {
            let (a, b) = (a % count, b % count);
            editor.narrow(a.min(b), a.max(b)).unwrap();
        }
        Op::ShowAll => editor.show_all(),
        Op::ScrollBy { delta } => {
            editor.scroll_by(*delta);
        }
        Op::ScrollTo { line, skew } => {
            editor.scroll_to(line % count, *skew).unwrap();
        }
        Op::Render => {
            editor.rows().unwrap();
        }
    }
}

/// Rows laid out from nothing over the editor's visibility and window top.
fn rows_from_scratch(editor: &Editor) -> Vec<RenderRow> {
    let display = editor.display();
    let options = *display.options();
    let mut buffer = Buffer::with_text(&editor.text());
    buffer.set_grammar(Arc::new(rust::grammar()));

    let mut mapper = ScreenLineMapper::new(options.viewport_height);
    let mut chunks = ChunkCache::new();
    let mut rows = Vec::new();
    let screen_rows: Vec<_> = {
        let src = LayoutSource {
            lines: buffer.content(),
            visibility: display.visibility(),
            options: &options,
        };
        mapper
            .scroll_to(display.screen().first_line(), display.screen().skew(), &src)
            .unwrap();
        (0..mapper.height())
            .map_while(|index| mapper.row_at(index, &src).unwrap())
            .collect()
    };
    for row in screen_rows {
        rows.push(RenderRow {
            physical_line: row.physical_line,
            offset: row.offset,
            length: row.length,
            chunks: chunks.chunks_for(&mut buffer, &row).unwrap(),
            is_first_subregion: row.is_first,
            is_last_subregion: row.is_last,
        });
    }
    rows
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    /// Incrementally maintained rows equal a window built from scratch.
    #[test]
    fn incremental_rows_match_fresh_layout(
        initial in fragment(),
        options in options(),
        ops in prop::collection::vec(op(), 1..40),
    ) {
        let mut editor = editor(&initial, options);
        editor.rows().unwrap();
        for op in &ops {
            apply(&mut editor, op);
        }
        let actual = editor.rows().unwrap();
        prop_assert_eq!(actual, rows_from_scratch(&editor));
    }

    /// Rows of one line cover it exactly, in order.
    #[test]
    fn subregions_cover_their_line(
        initial in fragment(),
        options in options(),
        ops in prop::collection::vec(op(), 1..20),
    ) {
        let mut editor = editor(&initial, options);
        for op in &ops {
            apply(&mut editor, op);
        }
        let rows = editor.rows().unwrap();
        for pair in rows.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if a.physical_line == b.physical_line {
                prop_assert!(!a.is_last_subregion && !b.is_first_subregion);
                prop_assert_eq!(a.offset + a.length, b.offset);
            } else {
                prop_assert!(a.is_last_subregion && b.is_first_subregion);
                prop_assert!(a.physical_line < b.physical_line);
            }
        }
        for row in &rows {
            let covered: usize = row.chunks.iter().map(|chunk| chunk.length).sum();
            prop_assert_eq!(covered, row.length);
        }
    }
}

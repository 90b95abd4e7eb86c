//! Renderable chunks per screen row.
//!
//! A cached entry is reused while the line starts from the same lexer
//! context (compared by identity) and the row covers the same part of the
//! line. Lines after an edit keep their entries, renumbered by the line
//! delta; the lookup stamp decides whether they are still correct.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::sync::Arc;

use tracing::trace;

use crate::buffer::Buffer;
use crate::error::Result;
use crate::event::EditEvent;
use crate::highlight::{LineContext, TokenKind};
use crate::view::screen::ScreenRow;

/// A run of one token kind inside a screen row. `offset` is in chars from
/// the start of the physical line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Chunk {
    pub offset: usize,
    pub length: usize,
    pub kind: TokenKind,
}

#[derive(Clone, Debug)]
struct Entry {
    start_context: LineContext,
    length: usize,
    chunks: Arc<[Chunk]>,
}

/// Cache of chunk lists keyed by `(physical line, subregion offset)`.
#[derive(Clone, Debug, Default)]
pub struct ChunkCache {
    entries: BTreeMap<(usize, usize), Entry>,
    hits: u64,
    misses: u64,
}

impl ChunkCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn hits(&self) -> u64 {
        self.hits
    }

    #[must_use]
    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Chunks of `row`, re-tokenizing its line only when the stamp differs.
    pub fn chunks_for(&mut self, buffer: &mut Buffer, row: &ScreenRow) -> Result<Arc<[Chunk]>> {
        let line = row.physical_line;
        let start_context = buffer.context_before(line)?;
        let key = (line, row.offset);
        if let Some(entry) = self.entries.get(&key) {
            if entry.length == row.length && LineContext::same(&entry.start_context, &start_context)
            {
                self.hits += 1;
                return Ok(Arc::clone(&entry.chunks));
            }
        }

        let range = row.offset..row.offset + row.length;
        let mut runs: Vec<Chunk> = Vec::new();
        for token in buffer.tokens(line)?.iter().filter_map(|t| t.clip(range.clone())) {
            match runs.last_mut() {
                // adjacent tokens of one kind render as one run
                Some(last) if last.kind == token.kind && last.offset + last.length == token.start => {
                    last.length += token.len();
                }
                _ => runs.push(Chunk {
                    offset: token.start,
                    length: token.len(),
                    kind: token.kind,
                }),
            }
        }
        let chunks: Arc<[Chunk]> = runs.into();
        self.misses += 1;
        trace!(line, offset = row.offset, chunks = chunks.len(), "chunks recomputed");
        self.entries.insert(
            key,
            Entry {
                start_context,
                length: row.length,
                chunks: Arc::clone(&chunks),
            },
        );
        Ok(chunks)
    }

    /// Drop entries of edited lines and renumber the ones after them.
    pub fn apply_edit(&mut self, event: &EditEvent) {
        if event.is_noop() {
            return;
        }
        let start = event.start_line;
        let tail = self.entries.split_off(&(start, 0));
        for ((line, offset), entry) in tail {
            let mapped = event.map_line(line);
            if line == start || mapped == start {
                continue;
            }
            self.entries.insert((mapped, offset), entry);
        }
    }

    /// Keep only entries of `lines`.
    pub fn retain_lines(&mut self, lines: RangeInclusive<usize>) {
        self.entries.retain(|(line, _), _| lines.contains(line));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlight::{Grammar, RuleDef, RuleSetDef};

    fn row(line: usize, offset: usize, length: usize) -> ScreenRow {
        ScreenRow {
            physical_line: line,
            subregion: 0,
            offset,
            length,
            is_first: offset == 0,
            is_last: true,
        }
    }

    fn quoted_buffer(text: &str) -> Buffer {
        let grammar = Grammar::builder("quoted")
            .rule_set(
                RuleSetDef::new("MAIN").rule(RuleDef::span("\"", "\"", TokenKind::String)),
            )
            .build()
            .unwrap();
        let mut buffer = Buffer::with_text(text);
        buffer.set_grammar(Arc::new(grammar));
        buffer
    }

    #[test]
    fn test_chunks_clip_to_subregion() {
        let mut buffer = quoted_buffer("ab \"cd\" ef");
        let mut cache = ChunkCache::new();
        let chunks = cache.chunks_for(&mut buffer, &row(0, 2, 5)).unwrap();
        assert_eq!(
            &*chunks,
            &[
                Chunk {
                    offset: 2,
                    length: 1,
                    kind: TokenKind::Text
                },
                Chunk {
                    offset: 3,
                    length: 4,
                    kind: TokenKind::String
                },
            ]
        );
    }

    #[test]
    fn test_hit_when_stamp_matches() {
        let mut buffer = quoted_buffer("a\nb\nc");
        let mut cache = ChunkCache::new();
        cache.chunks_for(&mut buffer, &row(2, 0, 1)).unwrap();
        cache.chunks_for(&mut buffer, &row(2, 0, 1)).unwrap();
        assert_eq!((cache.hits(), cache.misses()), (1, 1));
        // a different subregion length is a different row
        cache.chunks_for(&mut buffer, &row(2, 0, 0)).unwrap();
        assert_eq!(cache.misses(), 2);
    }

    #[test]
    fn test_edit_keeps_lines_below_with_same_context() {
        let mut buffer = quoted_buffer("a\nb\nc");
        let mut cache = ChunkCache::new();
        cache.chunks_for(&mut buffer, &row(2, 0, 1)).unwrap();

        let event = buffer.insert(0, "x\n").unwrap();
        cache.apply_edit(&event);
        cache.chunks_for(&mut buffer, &row(3, 0, 1)).unwrap();
        assert_eq!(cache.hits(), 1);
    }

    #[test]
    fn test_context_change_misses() {
        let mut buffer = quoted_buffer("a\nb\nc");
        let mut cache = ChunkCache::new();
        let before = cache.chunks_for(&mut buffer, &row(2, 0, 1)).unwrap();
        assert_eq!(before[0].kind, TokenKind::Text);

        // an unterminated quote on line 0 carries into line 2
        let event = buffer.insert(0, "\"").unwrap();
        cache.apply_edit(&event);
        let after = cache.chunks_for(&mut buffer, &row(2, 0, 1)).unwrap();
        assert_eq!(after[0].kind, TokenKind::String);
        assert_eq!(cache.hits(), 0);
    }

    #[test]
    fn test_edit_drops_edited_and_removed_lines() {
        let mut buffer = quoted_buffer("a\nb\nc\nd");
        let mut cache = ChunkCache::new();
        for line in 0..4 {
            cache.chunks_for(&mut buffer, &row(line, 0, 1)).unwrap();
        }
        // merge lines 1..=2 into line 1
        let start = buffer.content().line_end(1).unwrap();
        let event = buffer.remove(start, 2).unwrap();
        cache.apply_edit(&event);
        assert_eq!(cache.len(), 2);
        cache.retain_lines(0..=0);
        assert_eq!(cache.len(), 1);
    }
}

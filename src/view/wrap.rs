//! Soft-wrap subdivision of a physical line into screen subregions.
//!
//! A pure function of the line text and the layout options. Subregions are
//! contiguous and cover the whole line: in word mode the whitespace a row
//! breaks after stays on that row, so continuation rows start at the next
//! word. Tab stops are measured from the start of the physical line.

use crate::config::{LayoutOptions, WrapMode};
use crate::unicode::{GraphemeInfo, grapheme_info, graphemes};

/// One screen row's share of a physical line. Offsets are chars relative
/// to the line start; `width` is in columns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Subregion {
    pub offset: usize,
    pub length: usize,
    pub width: usize,
}

impl Subregion {
    #[must_use]
    pub fn end(&self) -> usize {
        self.offset + self.length
    }
}

/// Split `line` into subregions. Always returns at least one subregion; an
/// empty line yields a single empty one.
#[must_use]
pub fn subregions(line: &str, options: &LayoutOptions) -> Vec<Subregion> {
    let infos = grapheme_info(line, options.tab_width.max(1), options.width_method);
    let Some(wrap_width) = options.effective_wrap_width() else {
        let length = infos.last().map_or(0, GraphemeInfo::char_end);
        let width = infos.last().map_or(0, |info| info.col_offset + info.width);
        return vec![Subregion {
            offset: 0,
            length,
            width,
        }];
    };
    let word = options.wrap_mode == WrapMode::Word;
    let whitespace: Vec<bool> = graphemes(line)
        .map(|g| g.chars().all(char::is_whitespace))
        .collect();
    let total_chars = infos.last().map_or(0, GraphemeInfo::char_end);
    let offset_at = |index: usize| infos.get(index).map_or(total_chars, |info| info.char_offset);

    let mut regions = Vec::new();
    let mut start = 0usize;
    let mut row_width = 0usize;
    // (grapheme index after the whitespace, row width through it)
    let mut last_break: Option<(usize, usize)> = None;
    let mut i = 0usize;

    while i < infos.len() {
        let width = infos[i].width;
        if word && whitespace[i] {
            last_break = Some((i + 1, row_width + width));
        }

        if row_width + width > wrap_width && row_width > 0 {
            let (break_index, break_width) = match last_break {
                Some(found) if word => found,
                _ => (i, row_width),
            };
            let offset = offset_at(start);
            regions.push(Subregion {
                offset,
                length: offset_at(break_index) - offset,
                width: break_width,
            });
            start = break_index;
            row_width = 0;
            last_break = None;
            i = break_index;
            continue;
        }

        row_width += width;
        i += 1;
    }

    if start < infos.len() || regions.is_empty() {
        let offset = offset_at(start);
        regions.push(Subregion {
            offset,
            length: total_chars - offset,
            width: row_width,
        });
    }
    regions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn char_wrap(width: usize) -> LayoutOptions {
        LayoutOptions::default().with_wrap(WrapMode::Char, width)
    }

    fn word_wrap(width: usize) -> LayoutOptions {
        LayoutOptions::default().with_wrap(WrapMode::Word, width)
    }

    fn texts<'a>(line: &'a str, regions: &[Subregion]) -> Vec<String> {
        regions
            .iter()
            .map(|r| line.chars().skip(r.offset).take(r.length).collect())
            .collect()
    }

    fn assert_covering(line: &str, regions: &[Subregion]) {
        let mut expected = 0;
        for region in regions {
            assert_eq!(region.offset, expected, "gap before {region:?}");
            expected = region.end();
        }
        assert_eq!(expected, line.chars().count());
    }

    #[test]
    fn test_no_wrap_single_region() {
        let regions = subregions("hello\tworld", &LayoutOptions::default());
        assert_eq!(
            regions,
            vec![Subregion {
                offset: 0,
                length: 11,
                width: 13
            }]
        );
    }

    #[test]
    fn test_empty_line() {
        for options in [LayoutOptions::default(), char_wrap(4), word_wrap(4)] {
            assert_eq!(
                subregions("", &options),
                vec![Subregion {
                    offset: 0,
                    length: 0,
                    width: 0
                }]
            );
        }
    }

    #[test]
    fn test_char_wrap() {
        let line = "abcdefghij";
        let regions = subregions(line, &char_wrap(4));
        assert_eq!(texts(line, &regions), vec!["abcd", "efgh", "ij"]);
        assert_covering(line, &regions);
    }

    #[test]
    fn test_word_wrap_keeps_whitespace_on_row() {
        let line = "hello world foo";
        let regions = subregions(line, &word_wrap(10));
        assert_eq!(texts(line, &regions), vec!["hello ", "world foo"]);
        assert_covering(line, &regions);
    }

    #[test]
    fn test_word_wrap_long_word_falls_back() {
        let line = "abcdefghijkl xyz";
        let regions = subregions(line, &word_wrap(5));
        assert_eq!(texts(line, &regions), vec!["abcde", "fghij", "kl ", "xyz"]);
        assert_covering(line, &regions);
    }

    #[test]
    fn test_wide_graphemes() {
        let line = "漢字漢字x";
        let regions = subregions(line, &char_wrap(3));
        assert_eq!(texts(line, &regions), vec!["漢", "字", "漢", "字x"]);
        assert_eq!(regions[0].width, 2);
        assert_covering(line, &regions);

        // a grapheme wider than the row still gets a row of its own
        let regions = subregions("漢", &char_wrap(1));
        assert_eq!(regions.len(), 1);
    }

    #[test]
    fn test_combining_marks_stay_together() {
        let line = "e\u{0301}e\u{0301}e\u{0301}";
        let regions = subregions(line, &char_wrap(2));
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].length, 4);
        assert_covering(line, &regions);
    }
}

//! Resolved rule-sets and rules.
//!
//! These are the immutable, validated forms stored in a [`Grammar`]'s arena.
//! Definitions are written with [`RuleSetDef`]/[`RuleDef`] and resolved by
//! [`GrammarBuilder::build`].
//!
//! [`Grammar`]: super::Grammar
//! [`RuleSetDef`]: super::RuleSetDef
//! [`RuleDef`]: super::RuleDef
//! [`GrammarBuilder::build`]: super::GrammarBuilder::build

use std::collections::HashMap;

use bitflags::bitflags;

use super::token::TokenKind;

/// Stable handle of a rule-set inside its grammar.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleSetId(pub(crate) u32);

impl RuleSetId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle of one rule: the rule-set it belongs to and its position there.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RuleRef {
    pub set: RuleSetId,
    pub index: u32,
}

bitflags! {
    /// Positional constraints and marking options of a rule.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct RuleFlags: u16 {
        /// Only matches at column 0.
        const AT_LINE_START = 1;
        /// Only matches at the first non-whitespace column.
        const AT_WHITESPACE_END = 1 << 1;
        /// Only matches where a word may start.
        const AT_WORD_START = 1 << 2;
        /// The match text takes the enclosing default kind.
        const EXCLUDE_MATCH = 1 << 3;
        /// An unterminated span ends at the end of its line.
        const NO_LINE_BREAK = 1 << 4;
        /// The span ignores escapes.
        const NO_ESCAPE = 1 << 5;
    }
}

/// How a span terminates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SpanEnd {
    /// Literal end text. With a capture, `$0` is replaced by the captured run.
    Text(Vec<char>),
    /// The span runs to the end of the line.
    EndOfLine,
}

/// Parametrized begin: after the begin text, a run of `chars` is captured
/// and must be followed by `suffix`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Capture {
    /// Accepted characters; empty means "word characters of the rule-set".
    pub chars: Vec<char>,
    pub suffix: Vec<char>,
}

/// A single matching rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rule {
    /// Marks the match text; an optional delegate replaces the active rule-set.
    Sequence {
        text: Vec<char>,
        kind: TokenKind,
        delegate: Option<RuleSetId>,
        flags: RuleFlags,
    },
    /// Marks the begin text and pushes a frame until the end text.
    Span {
        begin: Vec<char>,
        capture: Option<Capture>,
        end: SpanEnd,
        kind: TokenKind,
        delegate: RuleSetId,
        escape: Option<Vec<char>>,
        flags: RuleFlags,
    },
    /// Marks the match text and the word run that follows it.
    MarkFollowing {
        text: Vec<char>,
        kind: TokenKind,
        flags: RuleFlags,
    },
    /// Marks the word run that precedes the match text.
    MarkPrevious {
        text: Vec<char>,
        kind: TokenKind,
        flags: RuleFlags,
    },
}

impl Rule {
    /// Text that must match at the trigger position.
    #[must_use]
    pub fn match_text(&self) -> &[char] {
        match self {
            Self::Sequence { text, .. }
            | Self::MarkFollowing { text, .. }
            | Self::MarkPrevious { text, .. } => text,
            Self::Span { begin, .. } => begin,
        }
    }

    #[must_use]
    pub fn kind(&self) -> TokenKind {
        match self {
            Self::Sequence { kind, .. }
            | Self::Span { kind, .. }
            | Self::MarkFollowing { kind, .. }
            | Self::MarkPrevious { kind, .. } => *kind,
        }
    }

    #[must_use]
    pub fn flags(&self) -> RuleFlags {
        match self {
            Self::Sequence { flags, .. }
            | Self::Span { flags, .. }
            | Self::MarkFollowing { flags, .. }
            | Self::MarkPrevious { flags, .. } => *flags,
        }
    }

    /// Whether an unterminated span must not continue onto the next line.
    #[must_use]
    pub fn ends_at_line_end(&self) -> bool {
        match self {
            Self::Span { end, flags, .. } => {
                *end == SpanEnd::EndOfLine || flags.contains(RuleFlags::NO_LINE_BREAK)
            }
            _ => false,
        }
    }
}

/// Terminate-column configuration of a rule-set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Terminate {
    pub column: usize,
    pub fallback: RuleSetId,
}

/// A named collection of rules with its keyword table and default kind.
#[derive(Clone, Debug)]
pub struct RuleSet {
    pub(crate) name: String,
    pub(crate) rules: Vec<Rule>,
    pub(crate) triggers: HashMap<char, Vec<u32>>,
    pub(crate) default_kind: TokenKind,
    pub(crate) keywords: HashMap<String, TokenKind>,
    pub(crate) ignore_case: bool,
    pub(crate) word_chars: Vec<char>,
    pub(crate) escape: Option<Vec<char>>,
    pub(crate) highlight_digits: bool,
    pub(crate) terminate: Option<Terminate>,
}

impl RuleSet {
    /// A rule-less set that marks everything with `kind`.
    pub(crate) fn standard(name: String, kind: TokenKind) -> Self {
        Self {
            name,
            rules: Vec::new(),
            triggers: HashMap::new(),
            default_kind: kind,
            keywords: HashMap::new(),
            ignore_case: false,
            word_chars: vec!['_'],
            escape: None,
            highlight_digits: false,
            terminate: None,
        }
    }

    pub(crate) fn index_triggers(&mut self) {
        self.triggers.clear();
        for (idx, rule) in self.rules.iter().enumerate() {
            let Some(&first) = rule.match_text().first() else {
                continue;
            };
            let key = self.fold_case(first);
            self.triggers.entry(key).or_default().push(idx as u32);
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn default_kind(&self) -> TokenKind {
        self.default_kind
    }

    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    #[must_use]
    pub fn terminate(&self) -> Option<Terminate> {
        self.terminate
    }

    #[must_use]
    pub fn escape(&self) -> Option<&[char]> {
        self.escape.as_deref()
    }

    #[must_use]
    pub fn ignore_case(&self) -> bool {
        self.ignore_case
    }

    #[must_use]
    pub fn highlight_digits(&self) -> bool {
        self.highlight_digits
    }

    /// Indices of rules whose trigger is `c`, in priority order.
    #[must_use]
    pub fn rules_for(&self, c: char) -> &[u32] {
        self.triggers
            .get(&self.fold_case(c))
            .map_or(&[], Vec::as_slice)
    }

    /// Alphanumerics and the configured extra word characters.
    #[must_use]
    pub fn is_word_char(&self, c: char) -> bool {
        c.is_alphanumeric() || self.word_chars.contains(&c)
    }

    /// Keyword kind of `word`, honouring `ignore_case`.
    #[must_use]
    pub fn keyword(&self, word: &[char]) -> Option<TokenKind> {
        if self.keywords.is_empty() {
            return None;
        }
        let key: String = if self.ignore_case {
            word.iter().flat_map(|c| c.to_lowercase()).collect()
        } else {
            word.iter().collect()
        };
        self.keywords.get(&key).copied()
    }

    /// Whether `pattern` occurs in `chars` at `pos`.
    #[must_use]
    pub fn matches_at(&self, chars: &[char], pos: usize, pattern: &[char]) -> bool {
        let Some(window) = chars.get(pos..pos + pattern.len()) else {
            return false;
        };
        if self.ignore_case {
            window
                .iter()
                .zip(pattern)
                .all(|(&a, &b)| a == b || self.fold_case(a) == self.fold_case(b))
        } else {
            window == pattern
        }
    }

    fn fold_case(&self, c: char) -> char {
        if self.ignore_case {
            c.to_lowercase().next().unwrap_or(c)
        } else {
            c
        }
    }
}

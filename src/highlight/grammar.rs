//! Grammars: an arena of rule-sets plus the context interner.
//!
//! A grammar is written as a list of [`RuleSetDef`]s, either in code through
//! [`GrammarBuilder`] or as JSON through [`Grammar::from_json`]. Building
//! validates every definition and resolves rule-set names into
//! [`RuleSetId`] handles; a grammar that fails validation never exists, so
//! tokenizing cannot fail.
//!
//! ```
//! use textflow::highlight::{Grammar, RuleDef, RuleSetDef, TokenKind};
//!
//! let grammar = Grammar::builder("demo")
//!     .rule_set(
//!         RuleSetDef::new("MAIN")
//!             .keywords(TokenKind::Keyword, ["let"])
//!             .rule(RuleDef::span("\"", "\"", TokenKind::String).delegate("STRING")),
//!     )
//!     .rule_set(RuleSetDef::new("STRING").default_kind(TokenKind::String).escape("\\"))
//!     .build()
//!     .unwrap();
//! let (tokens, _) = grammar.tokenize_line(&grammar.initial_context(), "let s = \"x\"");
//! assert_eq!(tokens[0].kind, TokenKind::Keyword);
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Deserializer};
use tracing::debug;

use super::context::{ContextInterner, LineContext};
use super::lexer::Lexer;
use super::rule::{Capture, Rule, RuleFlags, RuleRef, RuleSet, RuleSetId, SpanEnd, Terminate};
use super::token::{Token, TokenKind};
use crate::error::GrammarError;

/// Name of the rule-set every line of a document starts in.
pub const MAIN_RULE_SET: &str = "MAIN";

/// Placeholder replaced by the captured text in a span end template.
pub const CAPTURE_PLACEHOLDER: &str = "$0";

/// Rule type in a definition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    Sequence,
    Span,
    EolSpan,
    MarkFollowing,
    MarkPrevious,
}

/// Parametrized span begin definition.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct CaptureDef {
    /// Accepted characters; empty means word characters.
    #[serde(default)]
    pub chars: String,
    #[serde(default)]
    pub suffix: String,
}

/// Unresolved rule definition.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct RuleDef {
    #[serde(rename = "type")]
    pub rule_type: RuleType,
    /// Match text, or the begin text of a span.
    pub text: String,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub capture: Option<CaptureDef>,
    #[serde(default)]
    pub kind: TokenKind,
    #[serde(default)]
    pub delegate: Option<String>,
    #[serde(default)]
    pub escape: Option<String>,
    #[serde(default, deserialize_with = "deserialize_flags")]
    pub flags: RuleFlags,
}

fn deserialize_flags<'de, D>(deserializer: D) -> Result<RuleFlags, D::Error>
where
    D: Deserializer<'de>,
{
    let names = Vec::<String>::deserialize(deserializer)?;
    names.iter().try_fold(RuleFlags::empty(), |acc, name| {
        RuleFlags::from_name(&name.to_ascii_uppercase())
            .map(|flag| acc | flag)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown rule flag {name:?}")))
    })
}

impl RuleDef {
    fn new(rule_type: RuleType, text: &str, kind: TokenKind) -> Self {
        Self {
            rule_type,
            text: text.to_string(),
            end: None,
            capture: None,
            kind,
            delegate: None,
            escape: None,
            flags: RuleFlags::empty(),
        }
    }

    #[must_use]
    pub fn sequence(text: &str, kind: TokenKind) -> Self {
        Self::new(RuleType::Sequence, text, kind)
    }

    #[must_use]
    pub fn span(begin: &str, end: &str, kind: TokenKind) -> Self {
        let mut def = Self::new(RuleType::Span, begin, kind);
        def.end = Some(end.to_string());
        def
    }

    #[must_use]
    pub fn eol_span(begin: &str, kind: TokenKind) -> Self {
        Self::new(RuleType::EolSpan, begin, kind)
    }

    #[must_use]
    pub fn mark_following(text: &str, kind: TokenKind) -> Self {
        Self::new(RuleType::MarkFollowing, text, kind)
    }

    #[must_use]
    pub fn mark_previous(text: &str, kind: TokenKind) -> Self {
        Self::new(RuleType::MarkPrevious, text, kind)
    }

    #[must_use]
    pub fn delegate(mut self, rule_set: &str) -> Self {
        self.delegate = Some(rule_set.to_string());
        self
    }

    #[must_use]
    pub fn escape(mut self, escape: &str) -> Self {
        self.escape = Some(escape.to_string());
        self
    }

    #[must_use]
    pub fn flags(mut self, flags: RuleFlags) -> Self {
        self.flags |= flags;
        self
    }

    /// Capture a run of `chars` (word characters if empty) followed by `suffix`.
    #[must_use]
    pub fn capture(mut self, chars: &str, suffix: &str) -> Self {
        self.capture = Some(CaptureDef {
            chars: chars.to_string(),
            suffix: suffix.to_string(),
        });
        self
    }
}

/// Keyword group in a definition.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct KeywordDef {
    pub kind: TokenKind,
    pub words: Vec<String>,
}

fn default_word_chars() -> String {
    "_".to_string()
}

/// Unresolved rule-set definition.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct RuleSetDef {
    pub name: String,
    #[serde(default, rename = "default")]
    pub default_kind: TokenKind,
    #[serde(default)]
    pub rules: Vec<RuleDef>,
    #[serde(default)]
    pub keywords: Vec<KeywordDef>,
    #[serde(default)]
    pub ignore_case: bool,
    #[serde(default = "default_word_chars")]
    pub word_chars: String,
    #[serde(default)]
    pub escape: Option<String>,
    #[serde(default)]
    pub highlight_digits: bool,
    #[serde(default)]
    pub terminate_column: Option<usize>,
    #[serde(default)]
    pub terminate_fallback: Option<String>,
}

impl RuleSetDef {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            default_kind: TokenKind::Text,
            rules: Vec::new(),
            keywords: Vec::new(),
            ignore_case: false,
            word_chars: default_word_chars(),
            escape: None,
            highlight_digits: false,
            terminate_column: None,
            terminate_fallback: None,
        }
    }

    #[must_use]
    pub fn default_kind(mut self, kind: TokenKind) -> Self {
        self.default_kind = kind;
        self
    }

    #[must_use]
    pub fn rule(mut self, rule: RuleDef) -> Self {
        self.rules.push(rule);
        self
    }

    #[must_use]
    pub fn keywords<I, S>(mut self, kind: TokenKind, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords.push(KeywordDef {
            kind,
            words: words.into_iter().map(Into::into).collect(),
        });
        self
    }

    #[must_use]
    pub fn ignore_case(mut self, ignore: bool) -> Self {
        self.ignore_case = ignore;
        self
    }

    #[must_use]
    pub fn word_chars(mut self, chars: &str) -> Self {
        self.word_chars = chars.to_string();
        self
    }

    #[must_use]
    pub fn escape(mut self, escape: &str) -> Self {
        self.escape = Some(escape.to_string());
        self
    }

    #[must_use]
    pub fn highlight_digits(mut self, enabled: bool) -> Self {
        self.highlight_digits = enabled;
        self
    }

    /// Switch to `fallback` (or plain default-kind text) past `column`.
    #[must_use]
    pub fn terminate_at(mut self, column: usize, fallback: Option<&str>) -> Self {
        self.terminate_column = Some(column);
        self.terminate_fallback = fallback.map(str::to_string);
        self
    }
}

/// Serialized grammar definition.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct GrammarDef {
    pub name: String,
    #[serde(default)]
    pub extensions: Vec<String>,
    pub rule_sets: Vec<RuleSetDef>,
}

/// Collects rule-set definitions and validates them into a [`Grammar`].
#[derive(Clone, Debug)]
pub struct GrammarBuilder {
    def: GrammarDef,
}

impl GrammarBuilder {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            def: GrammarDef {
                name: name.to_string(),
                extensions: Vec::new(),
                rule_sets: Vec::new(),
            },
        }
    }

    #[must_use]
    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.def.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn rule_set(mut self, rule_set: RuleSetDef) -> Self {
        self.def.rule_sets.push(rule_set);
        self
    }

    /// Validate and resolve the definitions.
    pub fn build(self) -> Result<Grammar, GrammarError> {
        Resolver::new(self.def)?.resolve()
    }
}

impl From<GrammarDef> for GrammarBuilder {
    fn from(def: GrammarDef) -> Self {
        Self { def }
    }
}

struct Resolver {
    def: GrammarDef,
    by_name: HashMap<String, RuleSetId>,
    sets: Vec<RuleSet>,
    standard: HashMap<TokenKind, RuleSetId>,
}

impl Resolver {
    fn new(def: GrammarDef) -> Result<Self, GrammarError> {
        let mut by_name = HashMap::new();
        for (idx, set) in def.rule_sets.iter().enumerate() {
            if by_name
                .insert(set.name.clone(), RuleSetId(idx as u32))
                .is_some()
            {
                return Err(GrammarError::DuplicateRuleSet(set.name.clone()));
            }
        }
        if !by_name.contains_key(MAIN_RULE_SET) {
            return Err(GrammarError::MissingMainRuleSet);
        }
        Ok(Self {
            def,
            by_name,
            sets: Vec::new(),
            standard: HashMap::new(),
        })
    }

    fn lookup(&self, name: &str, referenced_by: &str) -> Result<RuleSetId, GrammarError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| GrammarError::UnknownRuleSet {
                rule_set: name.to_string(),
                referenced_by: referenced_by.to_string(),
            })
    }

    /// Rule-less set marking everything `kind`, appended after the named sets.
    fn standard_set(&mut self, kind: TokenKind) -> RuleSetId {
        if let Some(&id) = self.standard.get(&kind) {
            return id;
        }
        let id = RuleSetId((self.def.rule_sets.len() + self.standard.len()) as u32);
        self.standard.insert(kind, id);
        id
    }

    fn resolve(mut self) -> Result<Grammar, GrammarError> {
        let defs = std::mem::take(&mut self.def.rule_sets);
        for def in &defs {
            let set = self.resolve_set(def, &defs)?;
            self.sets.push(set);
        }

        let mut standard: Vec<(TokenKind, RuleSetId)> =
            self.standard.iter().map(|(&k, &id)| (k, id)).collect();
        standard.sort_by_key(|(_, id)| *id);
        for (kind, _) in standard {
            self.sets
                .push(RuleSet::standard(format!("{kind:?}*"), kind));
        }

        let main = self.by_name[MAIN_RULE_SET];
        self.def.rule_sets = defs;
        debug!(
            grammar = %self.def.name,
            rule_sets = self.sets.len(),
            "grammar resolved"
        );
        Ok(Grammar::from_parts(
            self.def.name,
            self.def.extensions,
            self.sets,
            self.by_name,
            main,
        ))
    }

    fn resolve_set(&mut self, def: &RuleSetDef, defs: &[RuleSetDef]) -> Result<RuleSet, GrammarError> {
        let escape = def
            .escape
            .as_deref()
            .filter(|e| !e.is_empty())
            .map(|e| e.chars().collect::<Vec<_>>());

        let mut keywords = HashMap::new();
        for group in &def.keywords {
            for word in &group.words {
                let key = if def.ignore_case {
                    word.to_lowercase()
                } else {
                    word.clone()
                };
                keywords.insert(key, group.kind);
            }
        }

        let mut rules = Vec::with_capacity(def.rules.len());
        for rule in &def.rules {
            rules.push(self.resolve_rule(def, rule, escape.as_deref(), defs)?);
        }

        let terminate = match def.terminate_column {
            Some(column) => {
                let fallback = match &def.terminate_fallback {
                    Some(name) => self.lookup(name, &def.name)?,
                    None => self.standard_set(def.default_kind),
                };
                Some(Terminate { column, fallback })
            }
            None => None,
        };

        let mut set = RuleSet {
            name: def.name.clone(),
            rules,
            triggers: HashMap::new(),
            default_kind: def.default_kind,
            keywords,
            ignore_case: def.ignore_case,
            word_chars: def.word_chars.chars().collect(),
            escape,
            highlight_digits: def.highlight_digits,
            terminate,
        };
        set.index_triggers();
        Ok(set)
    }

    fn resolve_rule(
        &mut self,
        set: &RuleSetDef,
        def: &RuleDef,
        set_escape: Option<&[char]>,
        defs: &[RuleSetDef],
    ) -> Result<Rule, GrammarError> {
        if def.text.is_empty() {
            return Err(GrammarError::EmptyMatch {
                rule_set: set.name.clone(),
            });
        }
        let text: Vec<char> = def.text.chars().collect();
        let delegate = def
            .delegate
            .as_deref()
            .map(|name| self.lookup(name, &set.name))
            .transpose()?;

        let rule = match def.rule_type {
            RuleType::Sequence => Rule::Sequence {
                text,
                kind: def.kind,
                delegate,
                flags: def.flags,
            },
            RuleType::MarkFollowing => Rule::MarkFollowing {
                text,
                kind: def.kind,
                flags: def.flags,
            },
            RuleType::MarkPrevious => Rule::MarkPrevious {
                text,
                kind: def.kind,
                flags: def.flags,
            },
            RuleType::Span | RuleType::EolSpan => {
                let end = if def.rule_type == RuleType::EolSpan {
                    SpanEnd::EndOfLine
                } else {
                    let template = def.end.as_deref().unwrap_or_default();
                    let placeholder = template.contains(CAPTURE_PLACEHOLDER);
                    if template.is_empty() || (placeholder && def.capture.is_none()) {
                        return Err(GrammarError::InvalidTemplate {
                            rule_set: set.name.clone(),
                            template: template.to_string(),
                        });
                    }
                    SpanEnd::Text(template.chars().collect())
                };
                let capture = def.capture.as_ref().map(|c| Capture {
                    chars: c.chars.chars().collect(),
                    suffix: c.suffix.chars().collect(),
                });
                let delegate = match delegate {
                    Some(id) => id,
                    None => self.standard_set(def.kind),
                };
                let escape = if def.flags.contains(RuleFlags::NO_ESCAPE) {
                    None
                } else {
                    def.escape
                        .as_deref()
                        .filter(|e| !e.is_empty())
                        .map(|e| e.chars().collect())
                        .or_else(|| set_escape.map(<[char]>::to_vec))
                        .or_else(|| {
                            defs.get(delegate.index())
                                .and_then(|d| d.escape.as_deref())
                                .filter(|e| !e.is_empty())
                                .map(|e| e.chars().collect())
                        })
                };
                Rule::Span {
                    begin: text,
                    capture,
                    end,
                    kind: def.kind,
                    delegate,
                    escape,
                    flags: def.flags,
                }
            }
        };
        Ok(rule)
    }
}

/// A validated grammar: rule-set arena, name index and context interner.
#[derive(Debug)]
pub struct Grammar {
    name: String,
    extensions: Vec<String>,
    rule_sets: Vec<RuleSet>,
    by_name: HashMap<String, RuleSetId>,
    main: RuleSetId,
    interner: ContextInterner,
    initial: LineContext,
}

impl Grammar {
    fn from_parts(
        name: String,
        extensions: Vec<String>,
        rule_sets: Vec<RuleSet>,
        by_name: HashMap<String, RuleSetId>,
        main: RuleSetId,
    ) -> Self {
        let interner = ContextInterner::new();
        let initial = interner.intern(LineContext::root(main));
        Self {
            name,
            extensions,
            rule_sets,
            by_name,
            main,
            interner,
            initial,
        }
    }

    #[must_use]
    pub fn builder(name: &str) -> GrammarBuilder {
        GrammarBuilder::new(name)
    }

    /// Parse and validate a JSON grammar definition.
    pub fn from_json(json: &str) -> Result<Self, GrammarError> {
        let def: GrammarDef =
            serde_json::from_str(json).map_err(|e| GrammarError::Parse(e.to_string()))?;
        GrammarBuilder::from(def).build()
    }

    /// Pass-through grammar: every line is one `Text` token.
    #[must_use]
    pub fn plain() -> Arc<Self> {
        static PLAIN: std::sync::OnceLock<Arc<Grammar>> = std::sync::OnceLock::new();
        PLAIN
            .get_or_init(|| {
                let mut main = RuleSet::standard(MAIN_RULE_SET.to_string(), TokenKind::Text);
                main.index_triggers();
                let by_name = HashMap::from([(MAIN_RULE_SET.to_string(), RuleSetId(0))]);
                Arc::new(Self::from_parts(
                    "text".to_string(),
                    vec!["txt".to_string()],
                    vec![main],
                    by_name,
                    RuleSetId(0),
                ))
            })
            .clone()
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    #[must_use]
    pub fn main(&self) -> RuleSetId {
        self.main
    }

    #[must_use]
    pub fn rule_set(&self, id: RuleSetId) -> &RuleSet {
        &self.rule_sets[id.index()]
    }

    #[must_use]
    pub fn rule_set_id(&self, name: &str) -> Option<RuleSetId> {
        self.by_name.get(name).copied()
    }

    #[must_use]
    pub fn rule(&self, rule: RuleRef) -> &Rule {
        &self.rule_set(rule.set).rules[rule.index as usize]
    }

    /// Context every document starts in (interned root `MAIN` frame).
    #[must_use]
    pub fn initial_context(&self) -> LineContext {
        self.initial.clone()
    }

    pub fn intern(&self, context: LineContext) -> LineContext {
        self.interner.intern(context)
    }

    /// Number of distinct contexts seen so far.
    #[must_use]
    pub fn interned_contexts(&self) -> usize {
        self.interner.len()
    }

    #[must_use]
    pub fn lexer(&self) -> Lexer<'_> {
        Lexer::new(self)
    }

    /// Tokenize one line into a fresh vector.
    #[must_use]
    pub fn tokenize_line(&self, previous: &LineContext, line: &str) -> (Vec<Token>, LineContext) {
        let mut tokens = Vec::new();
        let context = self.lexer().tokenize_line(previous, line, &mut tokens);
        (tokens, context)
    }
}

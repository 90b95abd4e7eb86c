//! Error types for textflow.

use std::fmt;

/// Result type alias for textflow operations.
pub type Result<T> = std::result::Result<T, Error>;

/// What kind of index a [`Error::Range`] refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RangeKind {
    /// Character offset into the buffer.
    Offset,
    /// Line index.
    Line,
    /// Screen row index.
    Row,
}

impl fmt::Display for RangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Offset => f.write_str("offset"),
            Self::Line => f.write_str("line"),
            Self::Row => f.write_str("row"),
        }
    }
}

/// Error raised while building or loading a grammar.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GrammarError {
    /// A rule delegates to a rule-set that is not defined.
    UnknownRuleSet { rule_set: String, referenced_by: String },
    /// The grammar has no `MAIN` rule-set.
    MissingMainRuleSet,
    /// Two rule-sets share a name.
    DuplicateRuleSet(String),
    /// A rule with an empty match text.
    EmptyMatch { rule_set: String },
    /// A span end template that cannot be satisfied.
    InvalidTemplate { rule_set: String, template: String },
    /// The grammar definition could not be parsed.
    Parse(String),
}

impl fmt::Display for GrammarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownRuleSet {
                rule_set,
                referenced_by,
            } => write!(
                f,
                "rule-set {referenced_by} references undefined rule-set {rule_set}"
            ),
            Self::MissingMainRuleSet => f.write_str("grammar has no MAIN rule-set"),
            Self::DuplicateRuleSet(name) => write!(f, "rule-set {name} defined twice"),
            Self::EmptyMatch { rule_set } => {
                write!(f, "rule in rule-set {rule_set} has an empty match text")
            }
            Self::InvalidTemplate { rule_set, template } => write!(
                f,
                "span end template {template:?} in rule-set {rule_set} is invalid"
            ),
            Self::Parse(msg) => write!(f, "grammar definition parse error: {msg}"),
        }
    }
}

impl std::error::Error for GrammarError {}

/// Error type for textflow operations.
#[derive(Debug)]
pub enum Error {
    /// Offset, line or row index outside the valid bounds.
    Range {
        kind: RangeKind,
        index: usize,
        len: usize,
    },
    /// Malformed grammar rejected at load time.
    Grammar(GrammarError),
    /// Malformed configuration.
    Config(String),
}

impl Error {
    pub(crate) fn offset(index: usize, len: usize) -> Self {
        Self::Range {
            kind: RangeKind::Offset,
            index,
            len,
        }
    }

    pub(crate) fn line(index: usize, len: usize) -> Self {
        Self::Range {
            kind: RangeKind::Line,
            index,
            len,
        }
    }

    pub(crate) fn row(index: usize, len: usize) -> Self {
        Self::Range {
            kind: RangeKind::Row,
            index,
            len,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Range { kind, index, len } => {
                write!(f, "{kind} {index} out of range (valid: 0..{len})")
            }
            Self::Grammar(e) => write!(f, "grammar error: {e}"),
            Self::Config(msg) => write!(f, "invalid configuration: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Grammar(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GrammarError> for Error {
    fn from(e: GrammarError) -> Self {
        Self::Grammar(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::offset(12, 10);
        assert_eq!(err.to_string(), "offset 12 out of range (valid: 0..10)");

        let err = Error::line(3, 2);
        assert!(err.to_string().contains("line 3"));

        let err = Error::Config("tab_width must be > 0".to_string());
        assert!(err.to_string().contains("tab_width"));
    }

    #[test]
    fn test_grammar_error_conversion() {
        let err: Error = GrammarError::MissingMainRuleSet.into();
        assert!(matches!(err, Error::Grammar(GrammarError::MissingMainRuleSet)));
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("MAIN"));
    }

    #[test]
    fn test_unknown_rule_set_message() {
        let err = GrammarError::UnknownRuleSet {
            rule_set: "STRING".to_string(),
            referenced_by: "MAIN".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "rule-set MAIN references undefined rule-set STRING"
        );
    }
}

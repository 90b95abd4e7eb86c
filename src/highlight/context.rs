//! Tokenizer end-of-line state.
//!
//! A [`LineContext`] is a persistent stack of frames. Each frame names the
//! active rule-set, the span rule that opened it (if any) and the substituted
//! end text of a parametrized span. Frames share their parents, so pushing
//! and popping never copies the stack.
//!
//! Contexts handed out by a grammar are interned: structurally equal
//! contexts are the same allocation, and [`LineContext::same`] compares by
//! pointer.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

use super::rule::{RuleRef, RuleSetId};

#[derive(Debug, PartialEq, Eq, Hash)]
struct Frame {
    rule_set: RuleSetId,
    in_rule: Option<RuleRef>,
    span_end: Option<Arc<[char]>>,
    parent: Option<LineContext>,
}

/// Immutable tokenizer state at the end of a line.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LineContext(Arc<Frame>);

impl LineContext {
    /// A single-frame context.
    #[must_use]
    pub fn root(rule_set: RuleSetId) -> Self {
        Self(Arc::new(Frame {
            rule_set,
            in_rule: None,
            span_end: None,
            parent: None,
        }))
    }

    /// Push a frame opened by `in_rule`.
    #[must_use]
    pub fn push(
        &self,
        rule_set: RuleSetId,
        in_rule: Option<RuleRef>,
        span_end: Option<Arc<[char]>>,
    ) -> Self {
        Self(Arc::new(Frame {
            rule_set,
            in_rule,
            span_end,
            parent: Some(self.clone()),
        }))
    }

    /// The enclosing context, or `None` at the root.
    #[must_use]
    pub fn pop(&self) -> Option<Self> {
        self.0.parent.clone()
    }

    /// Same frame with a different active rule-set.
    #[must_use]
    pub fn with_rule_set(&self, rule_set: RuleSetId) -> Self {
        Self(Arc::new(Frame {
            rule_set,
            in_rule: self.0.in_rule,
            span_end: self.0.span_end.clone(),
            parent: self.0.parent.clone(),
        }))
    }

    #[must_use]
    pub fn rule_set(&self) -> RuleSetId {
        self.0.rule_set
    }

    #[must_use]
    pub fn in_rule(&self) -> Option<RuleRef> {
        self.0.in_rule
    }

    /// Substituted end text of a parametrized span.
    #[must_use]
    pub fn span_end(&self) -> Option<&[char]> {
        self.0.span_end.as_deref()
    }

    #[must_use]
    pub fn parent(&self) -> Option<&Self> {
        self.0.parent.as_ref()
    }

    /// Number of frames.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut depth = 1;
        let mut current = self;
        while let Some(parent) = current.parent() {
            depth += 1;
            current = parent;
        }
        depth
    }

    /// Identity comparison. For interned contexts this equals `==`.
    #[must_use]
    pub fn same(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

/// Append-only table of interned contexts, owned by a grammar.
#[derive(Debug, Default)]
pub struct ContextInterner {
    table: Mutex<HashSet<LineContext>>,
}

impl ContextInterner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The canonical instance structurally equal to `context`.
    pub fn intern(&self, context: LineContext) -> LineContext {
        let mut table = self.table.lock();
        Self::intern_locked(&mut table, context)
    }

    fn intern_locked(table: &mut HashSet<LineContext>, context: LineContext) -> LineContext {
        if let Some(existing) = table.get(&context) {
            return existing.clone();
        }
        let canonical = match context.parent() {
            Some(parent) => {
                let interned_parent = Self::intern_locked(table, parent.clone());
                if LineContext::same(&interned_parent, parent) {
                    context
                } else {
                    LineContext(Arc::new(Frame {
                        rule_set: context.0.rule_set,
                        in_rule: context.0.in_rule,
                        span_end: context.0.span_end.clone(),
                        parent: Some(interned_parent),
                    }))
                }
            }
            None => context,
        };
        table.insert(canonical.clone());
        canonical
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.table.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

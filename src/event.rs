//! Edit notifications and the buffer listener registry.
//!
//! Every successful content mutation produces an [`EditEvent`]. The buffer
//! patches its own per-line caches from it and then forwards a
//! [`BufferEvent`] to registered listeners (fold margins, undo managers,
//! floating positions).

/// Direction of a content mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditKind {
    Insert,
    Remove,
}

/// Description of a single content mutation.
///
/// `start_line` is the line containing `offset` before the edit. For an
/// insert, lines `start_line + 1 ..= start_line + line_delta` are new; for a
/// remove, the same range of old lines was merged into `start_line`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EditEvent {
    pub kind: EditKind,
    pub start_line: usize,
    pub offset: usize,
    pub length: usize,
    pub offset_delta: isize,
    pub line_delta: isize,
}

impl EditEvent {
    #[must_use]
    pub fn insert(start_line: usize, offset: usize, length: usize, lines: usize) -> Self {
        Self {
            kind: EditKind::Insert,
            start_line,
            offset,
            length,
            offset_delta: length as isize,
            line_delta: lines as isize,
        }
    }

    #[must_use]
    pub fn remove(start_line: usize, offset: usize, length: usize, lines: usize) -> Self {
        Self {
            kind: EditKind::Remove,
            start_line,
            offset,
            length,
            offset_delta: -(length as isize),
            line_delta: -(lines as isize),
        }
    }

    /// Number of line breaks inserted or removed.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.line_delta.unsigned_abs()
    }

    /// Last line (in post-edit numbering) whose text changed.
    #[must_use]
    pub fn last_changed_line(&self) -> usize {
        match self.kind {
            EditKind::Insert => self.start_line + self.line_count(),
            EditKind::Remove => self.start_line,
        }
    }

    /// Map a pre-edit line index to its post-edit index.
    ///
    /// Lines removed by the edit map onto `start_line`.
    #[must_use]
    pub fn map_line(&self, line: usize) -> usize {
        if line <= self.start_line {
            return line;
        }
        match self.kind {
            EditKind::Insert => line + self.line_count(),
            EditKind::Remove => {
                let removed_end = self.start_line + self.line_count();
                if line <= removed_end {
                    self.start_line
                } else {
                    line - self.line_count()
                }
            }
        }
    }

    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.length == 0
    }
}

/// Notification delivered to buffer listeners.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferEvent {
    /// Content changed.
    Edited(EditEvent),
    /// Recomputed fold levels differ from cached ones in `start..=end`.
    FoldChanged { start: usize, end: usize },
    /// A new grammar was installed; every line context was discarded.
    GrammarChanged,
    /// A new fold handler was installed; every fold level was discarded.
    FoldHandlerChanged,
    /// Content was replaced wholesale.
    Reset,
}

/// Handle returned by [`Listeners::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener<E> = Box<dyn Fn(&E) + Send + Sync + 'static>;

/// Ordered set of event callbacks.
pub struct Listeners<E = BufferEvent> {
    next_id: u64,
    entries: Vec<(ListenerId, Listener<E>)>,
}

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }
}

impl<E> Listeners<E> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback; callbacks run in registration order.
    pub fn subscribe<F>(&mut self, callback: F) -> ListenerId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, Box::new(callback)));
        id
    }

    /// Remove a callback. Returns `false` if the id was unknown.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    pub fn emit(&self, event: &E) {
        for (_, callback) in &self.entries {
            callback(event);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<E> std::fmt::Debug for Listeners<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners")
            .field("count", &self.entries.len())
            .finish()
    }
}

//! TODO lifecycle tracking: one entity per distinct TODO text.

use indexmap::{IndexMap, IndexSet};
use todolens_core::{CommitRef, DiffEvent, EventKind};

/// Every occurrence of one distinct TODO text across the walked history.
///
/// Identity is the exact body text: the same text in unrelated files or
/// commits is one entity. Commit lists keep the order in which the walk
/// visited them, which for a git walk is newest first.
///
/// # Examples
///
/// ```
/// use todolens_core::{CommitRef, EventKind};
/// use todolens_history::tracker::TodoEntity;
///
/// let commit = CommitRef { id: "c1".into(), author: "a@x".into(), timestamp: 100 };
/// let mut todo = TodoEntity::new("// TODO: retry");
/// todo.record(EventKind::Added, commit, "net.rs", "// TODO: retry");
/// assert_eq!(todo.added().len(), 1);
/// assert!(todo.deleted().is_empty());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TodoEntity {
    body: String,
    added: Vec<CommitRef>,
    deleted: Vec<CommitRef>,
    contexts: IndexSet<String>,
    paths: IndexSet<String>,
}

impl TodoEntity {
    /// An entity with no recorded occurrences.
    pub fn new(body: &str) -> Self {
        Self {
            body: body.to_string(),
            added: Vec::new(),
            deleted: Vec::new(),
            contexts: IndexSet::new(),
            paths: IndexSet::new(),
        }
    }

    /// Record one occurrence of this TODO.
    pub fn record(&mut self, kind: EventKind, commit: CommitRef, path: &str, context: &str) {
        match kind {
            EventKind::Added => self.added.push(commit),
            EventKind::Deleted => self.deleted.push(commit),
        }
        if !self.paths.contains(path) {
            self.paths.insert(path.to_string());
        }
        if !self.contexts.contains(context) {
            self.contexts.insert(context.to_string());
        }
    }

    /// The TODO text that identifies this entity.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Commits that added this text, in visiting order.
    pub fn added(&self) -> &[CommitRef] {
        &self.added
    }

    /// Commits that deleted this text, in visiting order.
    pub fn deleted(&self) -> &[CommitRef] {
        &self.deleted
    }

    /// Distinct context windows, in first-seen order.
    pub fn contexts(&self) -> impl Iterator<Item = &str> {
        self.contexts.iter().map(String::as_str)
    }

    /// Distinct file paths this text appeared in, in first-seen order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }
}

/// Owning map from TODO text to its [`TodoEntity`].
///
/// # Examples
///
/// ```
/// use todolens_core::{CommitRef, DiffEvent, EventKind};
/// use todolens_history::tracker::TodoTracker;
///
/// let commit = CommitRef { id: "c1".into(), author: "a@x".into(), timestamp: 100 };
/// let mut tracker = TodoTracker::new();
/// for path in ["a.rs", "b.rs"] {
///     tracker.apply(DiffEvent {
///         kind: EventKind::Added,
///         body: "TODO".into(),
///         context: "TODO".into(),
///         path: path.into(),
///         commit: commit.clone(),
///     });
/// }
/// assert_eq!(tracker.len(), 1);
/// assert_eq!(tracker.get("TODO").unwrap().paths().count(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TodoTracker {
    entities: IndexMap<String, TodoEntity>,
}

impl TodoTracker {
    /// An empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one diff event into the entity for its body, creating it if needed.
    pub fn apply(&mut self, event: DiffEvent) {
        let DiffEvent {
            kind,
            body,
            context,
            path,
            commit,
        } = event;
        self.entities
            .entry(body)
            .or_insert_with_key(|body| TodoEntity::new(body))
            .record(kind, commit, &path, &context);
    }

    /// Entity for an exact TODO text.
    pub fn get(&self, body: &str) -> Option<&TodoEntity> {
        self.entities.get(body)
    }

    /// Entities in the order their text was first seen.
    pub fn iter(&self) -> impl Iterator<Item = &TodoEntity> {
        self.entities.values()
    }

    /// Number of distinct TODO texts.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether no TODO was seen.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

//! In-memory commit source for deterministic tests and fixtures.
//!
//! Each commit stores a full snapshot of its files; diffs between snapshots
//! are computed with `similar` and rendered the same way as git diffs.

use std::collections::{BTreeMap, BTreeSet};

use similar::{ChangeTag, TextDiff};
use todolens_core::{CommitRef, LensError};
use todolens_difflens::render::SectionWriter;

use crate::mining::{CommitSource, HistoryCommit, RenderedFile};

/// One commit of a [`MemoryRepository`]: metadata plus the full file tree.
///
/// # Examples
///
/// ```
/// use todolens_history::memory::Snapshot;
///
/// let snapshot = Snapshot::new("c2", "bob@example.com", 1700000000)
///     .parent("c1")
///     .file("src/lib.rs", "// TODO: docs\n");
/// assert_eq!(snapshot.commit().id, "c2");
/// ```
#[derive(Debug, Clone)]
pub struct Snapshot {
    commit: CommitRef,
    parents: Vec<String>,
    files: BTreeMap<String, String>,
}

impl Snapshot {
    /// A commit with no parents and no files.
    pub fn new(id: &str, author: &str, timestamp: i64) -> Self {
        Self {
            commit: CommitRef {
                id: id.to_string(),
                author: author.to_string(),
                timestamp,
            },
            parents: Vec::new(),
            files: BTreeMap::new(),
        }
    }

    /// Add a parent; the first one added is the first parent.
    pub fn parent(mut self, id: &str) -> Self {
        self.parents.push(id.to_string());
        self
    }

    /// Set the content of `path` in this commit's tree.
    pub fn file(mut self, path: &str, content: &str) -> Self {
        self.files.insert(path.to_string(), content.to_string());
        self
    }

    /// Commit metadata.
    pub fn commit(&self) -> &CommitRef {
        &self.commit
    }
}

/// [`CommitSource`] over snapshots kept in memory.
///
/// Snapshots are pushed oldest first; [`CommitSource::history`] yields them
/// newest first, like a git revwalk.
///
/// # Examples
///
/// ```
/// use todolens_history::memory::{MemoryRepository, Snapshot};
/// use todolens_history::mining::CommitSource;
///
/// let mut repo = MemoryRepository::new();
/// repo.push(Snapshot::new("c1", "alice@example.com", 100).file("a.rs", "// TODO\n"));
/// repo.push(Snapshot::new("c2", "bob@example.com", 200).parent("c1"));
///
/// let history = repo.history(None).unwrap();
/// assert_eq!(history[0].commit.id, "c2");
///
/// let files = repo.diff(Some("c1"), "c2").unwrap();
/// assert_eq!(files[0].text, "a.rs\n- // TODO\n---");
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    snapshots: Vec<Snapshot>,
}

impl MemoryRepository {
    /// An empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a snapshot as the newest commit.
    pub fn push(&mut self, snapshot: Snapshot) -> &mut Self {
        self.snapshots.push(snapshot);
        self
    }

    fn snapshot(&self, id: &str) -> Result<&Snapshot, LensError> {
        self.snapshots
            .iter()
            .find(|s| s.commit.id == id)
            .ok_or_else(|| LensError::Git(format!("unknown commit {id}")))
    }
}

impl CommitSource for MemoryRepository {
    fn history(&self, limit: Option<usize>) -> Result<Vec<HistoryCommit>, LensError> {
        Ok(self
            .snapshots
            .iter()
            .rev()
            .take(limit.unwrap_or(usize::MAX))
            .map(|s| HistoryCommit {
                commit: s.commit.clone(),
                parents: s.parents.clone(),
            })
            .collect())
    }

    fn diff(&self, parent: Option<&str>, commit: &str) -> Result<Vec<RenderedFile>, LensError> {
        let empty = BTreeMap::new();
        let old_files = match parent {
            Some(id) => &self.snapshot(id)?.files,
            None => &empty,
        };
        let new_files = &self.snapshot(commit)?.files;

        let paths: BTreeSet<&String> = old_files.keys().chain(new_files.keys()).collect();
        let mut rendered = Vec::new();

        for path in paths {
            let old = old_files.get(path);
            let new = new_files.get(path);
            if old == new {
                continue;
            }

            let old_text = old.map(String::as_str).unwrap_or("");
            let new_text = new.map(String::as_str).unwrap_or("");
            let mut section = SectionWriter::new(path);
            for change in TextDiff::from_lines(old_text, new_text).iter_all_changes() {
                let origin = match change.tag() {
                    ChangeTag::Insert => '+',
                    ChangeTag::Delete => '-',
                    ChangeTag::Equal => ' ',
                };
                section.push_line(origin, change.value());
            }

            rendered.push(RenderedFile {
                path: path.clone(),
                text: section.finish(),
            });
        }

        Ok(rendered)
    }
}

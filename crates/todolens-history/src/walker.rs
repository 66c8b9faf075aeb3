//! The commit walk: one sequential pass over history feeding the tracker.
//!
//! Every commit is fully processed before the next is visited. Statistics
//! such as the oldest/newest epoch and author quartiles are only meaningful
//! once the walk has finished, so the walk hands back an immutable
//! [`WalkOutcome`] rather than exposing intermediate state.

use std::collections::HashMap;

use indexmap::IndexMap;
use regex::Regex;
use todolens_core::{CommitRef, DiffEvent, LensError, WalkConfig, DEFAULT_TOKEN_PATTERN};
use todolens_difflens::parser::{SectionItem, SectionParser};
use tracing::debug;

use crate::mining::CommitSource;
use crate::tracker::TodoTracker;

/// Options for a single walk.
///
/// # Examples
///
/// ```
/// use todolens_history::walker::WalkOptions;
///
/// let opts = WalkOptions::default();
/// assert_eq!(opts.max_commits, None);
/// assert_eq!(opts.lines_after, 1);
/// assert!(opts.token_pattern.is_match("// fixme later"));
/// ```
#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Stop after this many commits (default: no limit).
    pub max_commits: Option<usize>,
    /// Lines following a TODO line to include in its context (default: 1).
    pub lines_after: usize,
    /// Pattern a changed line must match to be tracked.
    pub token_pattern: Regex,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            max_commits: None,
            lines_after: 1,
            token_pattern: default_token_pattern(),
        }
    }
}

fn default_token_pattern() -> Regex {
    Regex::new(DEFAULT_TOKEN_PATTERN).expect("default token pattern is valid")
}

impl WalkOptions {
    /// Build options from the `[walk]` configuration section.
    ///
    /// # Errors
    ///
    /// Returns [`LensError::Pattern`] if `token_pattern` is not a valid regex.
    pub fn from_config(config: &WalkConfig) -> Result<Self, LensError> {
        Ok(Self {
            max_commits: config.max_commits_limit(),
            lines_after: config.lines_after,
            token_pattern: Regex::new(&config.token_pattern)?,
        })
    }
}

/// Aggregate counters accumulated over one walk.
#[derive(Debug, Clone, Default)]
pub struct RunState {
    /// Commits visited.
    pub commit_count: u64,
    /// Commits per author, in order of each author's first visited commit.
    pub author_commits: IndexMap<String, u64>,
    /// Smallest authored epoch seen, `None` before the first commit.
    pub oldest_epoch: Option<i64>,
    /// Largest authored epoch seen, `None` before the first commit.
    pub newest_epoch: Option<i64>,
    path_touches: HashMap<String, u64>,
}

impl RunState {
    fn record_commit(&mut self, commit: &CommitRef) {
        self.commit_count += 1;
        *self
            .author_commits
            .entry(commit.author.clone())
            .or_default() += 1;
        self.oldest_epoch = Some(
            self.oldest_epoch
                .map_or(commit.timestamp, |t| t.min(commit.timestamp)),
        );
        self.newest_epoch = Some(
            self.newest_epoch
                .map_or(commit.timestamp, |t| t.max(commit.timestamp)),
        );
    }

    fn touch(&mut self, path: String) {
        *self.path_touches.entry(path).or_default() += 1;
    }

    /// How many visited commits changed `path`.
    pub fn path_touches(&self, path: &str) -> u64 {
        self.path_touches.get(path).copied().unwrap_or(0)
    }
}

/// The finished result of a walk.
#[derive(Debug, Clone, Default)]
pub struct WalkOutcome {
    /// Every TODO entity seen.
    pub todos: TodoTracker,
    /// Repository-wide counters.
    pub run: RunState,
}

/// Walk `source` and collect TODO lifecycles.
///
/// Commits are visited in the order the source yields them. Each commit is
/// diffed against its first parent, or against an empty tree for a root
/// commit.
///
/// # Errors
///
/// Returns the source's error if history or any diff cannot be read; a
/// failed diff aborts the walk.
///
/// # Examples
///
/// ```
/// use todolens_history::memory::{MemoryRepository, Snapshot};
/// use todolens_history::walker::{walk, WalkOptions};
///
/// let mut repo = MemoryRepository::new();
/// repo.push(Snapshot::new("c1", "alice@example.com", 100).file("a.rs", "// TODO: tests\n"));
///
/// let outcome = walk(&repo, &WalkOptions::default()).unwrap();
/// assert_eq!(outcome.run.commit_count, 1);
/// assert_eq!(outcome.todos.get("// TODO: tests").unwrap().added().len(), 1);
/// ```
pub fn walk<S: CommitSource + ?Sized>(
    source: &S,
    options: &WalkOptions,
) -> Result<WalkOutcome, LensError> {
    walk_with_progress(source, options, |_| {})
}

/// [`walk`] that reports the number of commits processed after each commit.
///
/// # Errors
///
/// Same as [`walk`].
pub fn walk_with_progress<S, F>(
    source: &S,
    options: &WalkOptions,
    mut on_commit: F,
) -> Result<WalkOutcome, LensError>
where
    S: CommitSource + ?Sized,
    F: FnMut(u64),
{
    let mut outcome = WalkOutcome::default();

    for history_commit in source.history(options.max_commits)? {
        let commit = history_commit.commit;
        outcome.run.record_commit(&commit);

        let parent = history_commit.parents.first().map(String::as_str);
        if parent.is_none() {
            debug!(commit = %commit.short_id(), "diffing root commit against empty tree");
        }

        for file in source.diff(parent, &commit.id)? {
            let items = SectionParser::new(&file.text, options.lines_after, &options.token_pattern);
            for item in items {
                match item {
                    SectionItem::FileEntered(path) => outcome.run.touch(path),
                    SectionItem::Marker(marker) => outcome.todos.apply(DiffEvent {
                        kind: marker.kind,
                        body: marker.body,
                        context: marker.context,
                        path: marker.path,
                        commit: commit.clone(),
                    }),
                }
            }
        }

        on_commit(outcome.run.commit_count);
    }

    debug!(
        commits = outcome.run.commit_count,
        authors = outcome.run.author_commits.len(),
        todos = outcome.todos.len(),
        "walk complete"
    );

    Ok(outcome)
}

//! Per-TODO and per-repository measures derived from a finished walk.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use todolens_core::clock::day_diff;
use todolens_core::CommitRef;

use crate::tracker::TodoEntity;
use crate::walker::RunState;

/// Number of author-contribution buckets in a [`RepoSummary`].
pub const CONTRIBUTION_BUCKETS: usize = 5;

/// Earliest authored epoch among `commits`.
pub fn earliest_epoch(commits: &[CommitRef]) -> Option<i64> {
    commits.iter().map(|c| c.timestamp).min()
}

/// Latest authored epoch among `commits`.
pub fn latest_epoch(commits: &[CommitRef]) -> Option<i64> {
    commits.iter().map(|c| c.timestamp).max()
}

/// Days a TODO was alive.
///
/// Runs from its earliest Added commit, or the walk's oldest commit when it
/// predates the walk, to its latest Deleted commit, or the walk's newest
/// commit when it is still present. A TODO deleted before it was re-added
/// would produce a negative span; the result is clamped to zero.
pub fn age_days(entity: &TodoEntity, run: &RunState) -> f64 {
    let earlier = earliest_epoch(entity.added())
        .or(run.oldest_epoch)
        .unwrap_or(0);
    let later = latest_epoch(entity.deleted())
        .or(run.newest_epoch)
        .unwrap_or(earlier);
    day_diff(earlier, later).max(0.0)
}

/// Sum of the walk-wide touch counts of every path the TODO appeared in.
///
/// Touches are counted per path for the whole walk, not per TODO
/// occurrence, so churn unrelated to the TODO is included.
pub fn touch_count(entity: &TodoEntity, run: &RunState) -> u64 {
    entity.paths().map(|path| run.path_touches(path)).sum()
}

/// Distinct authors across both commit lists, in first-seen order.
pub fn author_union(entity: &TodoEntity) -> IndexSet<&str> {
    entity
        .added()
        .iter()
        .chain(entity.deleted())
        .map(|c| c.author.as_str())
        .collect()
}

/// Authors who both added and deleted this TODO text.
pub fn author_intersection(entity: &TodoEntity) -> IndexSet<&str> {
    let deleters: IndexSet<&str> = entity.deleted().iter().map(|c| c.author.as_str()).collect();
    entity
        .added()
        .iter()
        .map(|c| c.author.as_str())
        .filter(|author| deleters.contains(author))
        .collect()
}

/// Time and author measures for one TODO entity.
///
/// # Examples
///
/// ```
/// use todolens_history::memory::{MemoryRepository, Snapshot};
/// use todolens_history::stats::TodoMeasures;
/// use todolens_history::walker::{walk, WalkOptions};
///
/// let mut repo = MemoryRepository::new();
/// repo.push(Snapshot::new("c1", "a@x", 0).file("f.rs", "// TODO\n"));
/// repo.push(Snapshot::new("c2", "b@x", 86_400).parent("c1").file("f.rs", "done\n"));
///
/// let outcome = walk(&repo, &WalkOptions::default()).unwrap();
/// let todo = outcome.todos.get("// TODO").unwrap();
/// let measures = TodoMeasures::measure(todo, &outcome.run);
/// assert_eq!(measures.age_days, 1.0);
/// assert_eq!(measures.touch_count, 2);
/// assert_eq!(measures.author_union, 2);
/// assert_eq!(measures.author_intersection, 0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoMeasures {
    /// Earliest Added epoch, `None` if never added during the walk.
    pub added_epoch: Option<i64>,
    /// Latest Deleted epoch, `None` if never deleted during the walk.
    pub deleted_epoch: Option<i64>,
    /// See [`age_days`].
    pub age_days: f64,
    /// See [`touch_count`].
    pub touch_count: u64,
    /// Size of [`author_union`].
    pub author_union: usize,
    /// Size of [`author_intersection`].
    pub author_intersection: usize,
}

impl TodoMeasures {
    /// Compute every measure for `entity`.
    pub fn measure(entity: &TodoEntity, run: &RunState) -> Self {
        Self {
            added_epoch: earliest_epoch(entity.added()),
            deleted_epoch: latest_epoch(entity.deleted()),
            age_days: age_days(entity, run),
            touch_count: touch_count(entity, run),
            author_union: author_union(entity).len(),
            author_intersection: author_intersection(entity).len(),
        }
    }
}

/// Cumulative commits from the top authors.
///
/// Authors are consumed greedily by commit count. Bucket 0 takes the single
/// top author; buckets 1 to 3 each take `ceil(authors / 4)` more; bucket 4
/// takes everyone left. Each bucket reports the commits of every author
/// consumed so far, so the last bucket equals the total commit count.
///
/// Ties are broken by first appearance in `author_commits`, which for a walk
/// is the order authors were first visited.
///
/// # Examples
///
/// ```
/// use indexmap::IndexMap;
/// use todolens_history::stats::contribution_quartiles;
///
/// let authors: IndexMap<String, u64> =
///     [("A", 10), ("B", 6), ("C", 6), ("D", 2)]
///         .into_iter()
///         .map(|(a, n)| (a.to_string(), n))
///         .collect();
/// assert_eq!(contribution_quartiles(&authors), [10, 16, 22, 24, 24]);
/// ```
pub fn contribution_quartiles(
    author_commits: &IndexMap<String, u64>,
) -> [u64; CONTRIBUTION_BUCKETS] {
    let counts: Vec<u64> = author_commits.values().copied().collect();
    let quarter = counts.len().div_ceil(4).max(1);
    let mut consumed = vec![false; counts.len()];
    let mut buckets = [0u64; CONTRIBUTION_BUCKETS];
    let mut running = 0u64;

    for (bucket, slot) in buckets.iter_mut().enumerate() {
        let capacity = match bucket {
            0 => 1,
            b if b == CONTRIBUTION_BUCKETS - 1 => usize::MAX,
            _ => quarter,
        };

        let mut taken = 0;
        while taken < capacity {
            let Some(top) = next_top_author(&counts, &consumed) else {
                break;
            };
            consumed[top] = true;
            running += counts[top];
            taken += 1;
        }
        *slot = running;
    }

    buckets
}

/// Index of the highest unconsumed count; the earliest index wins ties.
fn next_top_author(counts: &[u64], consumed: &[bool]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (idx, count) in counts.iter().enumerate() {
        if consumed[idx] {
            continue;
        }
        if best.is_none_or(|b| *count > counts[b]) {
            best = Some(idx);
        }
    }
    best
}

/// Repository-wide summary of one walk.
///
/// # Examples
///
/// ```
/// use todolens_history::stats::RepoSummary;
/// use todolens_history::walker::RunState;
///
/// let summary = RepoSummary::from_run(&RunState::default());
/// assert_eq!(summary.total_commits, 0);
/// assert_eq!(summary.contributions, [0; 5]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoSummary {
    /// Commits visited.
    pub total_commits: u64,
    /// Oldest authored epoch (0 without commits).
    pub earliest_commit_epoch: i64,
    /// Newest authored epoch (0 without commits).
    pub latest_commit_epoch: i64,
    /// Days between the oldest and newest commit.
    pub days_of_data: f64,
    /// Cumulative commits from the top 1, 25%, 50%, 75% and all authors.
    pub contributions: [u64; CONTRIBUTION_BUCKETS],
}

impl RepoSummary {
    /// Summarize a finished walk.
    pub fn from_run(run: &RunState) -> Self {
        let earliest = run.oldest_epoch.unwrap_or(0);
        let latest = run.newest_epoch.unwrap_or(0);
        Self {
            total_commits: run.commit_count,
            earliest_commit_epoch: earliest,
            latest_commit_epoch: latest,
            days_of_data: day_diff(earliest, latest),
            contributions: contribution_quartiles(&run.author_commits),
        }
    }
}

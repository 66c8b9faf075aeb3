//! Per-repository run output: the TODO table, the summary row and the
//! human-readable commit lookup.
//!
//! File names follow [`RunConfig::data_file`], e.g.
//! `run_owner_repo__todos.csv`. Every CSV file starts with its header row,
//! even when there are no data rows.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use todolens_core::clock::human_readable;
use todolens_core::{LensError, RunConfig};
use todolens_history::stats::{author_intersection, author_union, RepoSummary, TodoMeasures};
use todolens_history::tracker::TodoEntity;
use todolens_history::walker::WalkOutcome;
use tracing::debug;

/// Suffix of the per-entity TODO table.
pub const TODOS_SUFFIX: &str = "_todos.csv";
/// Suffix of the one-row repository summary.
pub const SUMMARY_SUFFIX: &str = "_summary.csv";
/// Suffix of the commit lookup text file.
pub const LOOKUP_SUFFIX: &str = "_commithashes.txt";

/// Header row of the TODO table.
pub const TODO_HEADER: [&str; 11] = [
    "repo",
    "todo ID",
    "Added",
    "Deleted",
    "Age",
    "Filetouches",
    "Author Union",
    "Author Intersect",
    "safe body",
    "safe contexts",
    "filepaths",
];

/// Header row of the repository summary.
pub const SUMMARY_HEADER: [&str; 9] = [
    "Total Commits",
    "Earliest Commit Epoch",
    "Latest Commit Epoch",
    "Days of Data",
    "Commits from Top 1 Author",
    "Commits from Top 25% Authors",
    "Commits from Top 50% Authors",
    "Commits from Top 75% Authors",
    "Commits from All Authors",
];

const CONTEXT_SEPARATOR: &str = ";;;";
const PATH_SEPARATOR: &str = ";";

/// One row of the TODO table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodoRecord {
    /// Repository handle.
    #[serde(rename = "repo")]
    pub repo: String,
    /// Position of the entity in first-seen order, from 0.
    #[serde(rename = "todo ID")]
    pub id: usize,
    /// Earliest Added time, human-readable, or `N/A`.
    #[serde(rename = "Added")]
    pub added: String,
    /// Latest Deleted time, human-readable, or `N/A`.
    #[serde(rename = "Deleted")]
    pub deleted: String,
    /// Days the TODO lived, never negative.
    #[serde(rename = "Age")]
    pub age: f64,
    /// Commits that touched any of its paths.
    #[serde(rename = "Filetouches")]
    pub file_touches: u64,
    /// Distinct authors who added or deleted it.
    #[serde(rename = "Author Union")]
    pub author_union: usize,
    /// Authors who both added and deleted it.
    #[serde(rename = "Author Intersect")]
    pub author_intersect: usize,
    /// Escaped TODO line.
    #[serde(rename = "safe body")]
    pub body: String,
    /// Escaped context windows joined with `;;;`.
    #[serde(rename = "safe contexts")]
    pub contexts: String,
    /// Paths joined with `;`.
    #[serde(rename = "filepaths")]
    pub paths: String,
}

impl TodoRecord {
    /// Build the row for `entity`, the `id`-th entity of a walk over `repo`.
    pub fn from_entity(
        repo: &str,
        id: usize,
        entity: &TodoEntity,
        outcome: &WalkOutcome,
    ) -> Self {
        let measures = TodoMeasures::measure(entity, &outcome.run);
        Self {
            repo: repo.to_string(),
            id,
            added: human_readable(measures.added_epoch),
            deleted: human_readable(measures.deleted_epoch),
            age: measures.age_days,
            file_touches: measures.touch_count,
            author_union: measures.author_union,
            author_intersect: measures.author_intersection,
            body: escape_line(entity.body()),
            contexts: entity
                .contexts()
                .map(escape_line)
                .collect::<Vec<_>>()
                .join(CONTEXT_SEPARATOR),
            paths: entity.paths().collect::<Vec<_>>().join(PATH_SEPARATOR),
        }
    }
}

/// The repository summary row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    /// Commits walked.
    #[serde(rename = "Total Commits")]
    pub total_commits: u64,
    /// Author time of the oldest commit walked.
    #[serde(rename = "Earliest Commit Epoch")]
    pub earliest_commit_epoch: i64,
    /// Author time of the newest commit walked.
    #[serde(rename = "Latest Commit Epoch")]
    pub latest_commit_epoch: i64,
    /// Days between the oldest and newest commit.
    #[serde(rename = "Days of Data")]
    pub days_of_data: f64,
    /// Commits by the most active author.
    #[serde(rename = "Commits from Top 1 Author")]
    pub top_author: u64,
    /// Commits by the top quarter of authors.
    #[serde(rename = "Commits from Top 25% Authors")]
    pub top_quarter: u64,
    /// Commits by the top half of authors.
    #[serde(rename = "Commits from Top 50% Authors")]
    pub top_half: u64,
    /// Commits by the top three quarters of authors.
    #[serde(rename = "Commits from Top 75% Authors")]
    pub top_three_quarters: u64,
    /// Commits by every author.
    #[serde(rename = "Commits from All Authors")]
    pub all_authors: u64,
}

impl From<&RepoSummary> for SummaryRecord {
    fn from(summary: &RepoSummary) -> Self {
        let [top_author, top_quarter, top_half, top_three_quarters, all_authors] =
            summary.contributions;
        Self {
            total_commits: summary.total_commits,
            earliest_commit_epoch: summary.earliest_commit_epoch,
            latest_commit_epoch: summary.latest_commit_epoch,
            days_of_data: summary.days_of_data,
            top_author,
            top_quarter,
            top_half,
            top_three_quarters,
            all_authors,
        }
    }
}

/// Make a line safe for a single CSV cell: newlines become a literal `\n`,
/// carriage returns are dropped, surrounding whitespace is trimmed.
///
/// # Examples
///
/// ```
/// use todolens_report::records::escape_line;
///
/// assert_eq!(escape_line("  TODO: a\r\nb "), "TODO: a\\nb");
/// ```
pub fn escape_line(line: &str) -> String {
    line.replace('\n', "\\n").replace('\r', "").trim().to_string()
}

/// Lookup entry for one entity: its body, every Added (`+`) and Deleted
/// (`-`) commit with its author, then the author union (`U`) and
/// intersection (`^`).
pub fn render_lookup(id: usize, entity: &TodoEntity) -> String {
    let mut out = format!("\ntodo ID = {id}\n{}", entity.body());
    for commit in entity.added() {
        out.push_str(&format!("\n+ {}\n  {}", commit.id, commit.author));
    }
    for commit in entity.deleted() {
        out.push_str(&format!("\n- {}\n  {}", commit.id, commit.author));
    }

    let union = author_union(entity);
    out.push_str(&format!("\n Author Union Len: {}", union.len()));
    for author in &union {
        out.push_str(&format!("\nU {author}"));
    }

    let intersection = author_intersection(entity);
    out.push_str(&format!("\n Author Intersect Len: {}", intersection.len()));
    for author in &intersection {
        out.push_str(&format!("\n^ {author}"));
    }
    out
}

/// The three files written for one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunFiles {
    /// `<run>_<handle>__todos.csv`.
    pub todos: PathBuf,
    /// `<run>_<handle>__summary.csv`.
    pub summary: PathBuf,
    /// `<run>_<handle>__commithashes.txt`.
    pub lookup: PathBuf,
}

impl RunFiles {
    /// Paths for `handle` under `config`.
    pub fn for_handle(config: &RunConfig, handle: &str) -> Self {
        Self {
            todos: config.data_file(handle, TODOS_SUFFIX),
            summary: config.data_file(handle, SUMMARY_SUFFIX),
            lookup: config.data_file(handle, LOOKUP_SUFFIX),
        }
    }
}

/// Write the TODO table for a walk.
///
/// # Errors
///
/// Returns [`LensError::Csv`] or [`LensError::Io`] if the file cannot be written.
pub fn write_todos(path: &Path, repo: &str, outcome: &WalkOutcome) -> Result<(), LensError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    writer.write_record(TODO_HEADER)?;
    for (id, entity) in outcome.todos.iter().enumerate() {
        writer.serialize(TodoRecord::from_entity(repo, id, entity, outcome))?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the one-row repository summary.
///
/// # Errors
///
/// Returns [`LensError::Csv`] or [`LensError::Io`] if the file cannot be written.
pub fn write_summary(path: &Path, summary: &RepoSummary) -> Result<(), LensError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    writer.write_record(SUMMARY_HEADER)?;
    writer.serialize(SummaryRecord::from(summary))?;
    writer.flush()?;
    Ok(())
}

/// Write the commit lookup for every entity of a walk.
///
/// # Errors
///
/// Returns [`LensError::Io`] if the file cannot be written.
pub fn write_lookup(path: &Path, outcome: &WalkOutcome) -> Result<(), LensError> {
    let mut out = BufWriter::new(fs::File::create(path)?);
    for (id, entity) in outcome.todos.iter().enumerate() {
        out.write_all(render_lookup(id, entity).as_bytes())?;
    }
    out.flush()?;
    Ok(())
}

/// Write all output files for one repository walk, creating `base_dir` if needed.
///
/// # Errors
///
/// Returns the first write failure.
///
/// # Examples
///
/// ```
/// use todolens_core::RunConfig;
/// use todolens_history::memory::{MemoryRepository, Snapshot};
/// use todolens_history::walker::{walk, WalkOptions};
/// use todolens_report::records::write_run;
///
/// let dir = tempfile::tempdir().unwrap();
/// let config = RunConfig { base_dir: dir.path().to_path_buf(), ..RunConfig::default() };
///
/// let mut repo = MemoryRepository::new();
/// repo.push(Snapshot::new("c1", "a@x", 0).file("a.rs", "// TODO\n"));
/// let outcome = walk(&repo, &WalkOptions::default()).unwrap();
///
/// let files = write_run(&config, "owner/repo", &outcome).unwrap();
/// assert!(files.todos.ends_with("run_owner_repo__todos.csv"));
/// assert!(files.summary.exists());
/// ```
pub fn write_run(
    config: &RunConfig,
    handle: &str,
    outcome: &WalkOutcome,
) -> Result<RunFiles, LensError> {
    fs::create_dir_all(&config.base_dir)?;
    let files = RunFiles::for_handle(config, handle);

    write_lookup(&files.lookup, outcome)?;
    write_todos(&files.todos, handle, outcome)?;
    write_summary(&files.summary, &RepoSummary::from_run(&outcome.run))?;

    debug!(
        repo = handle,
        todos = %files.todos.display(),
        entities = outcome.todos.len(),
        "wrote run output"
    );
    Ok(files)
}

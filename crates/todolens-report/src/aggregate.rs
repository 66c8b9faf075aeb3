//! Cross-repository aggregation of finished runs.
//!
//! A sample registry names the repositories of a study and the sample each
//! belongs to. For every registered repository the data directory must hold
//! its TODO table and a `cloc` line count; anything suspicious is recorded
//! as a violation and processing continues.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use todolens_core::clock::{epoch_or_fallback, is_missing, SECONDS_PER_DAY};
use todolens_core::{safe_handle, LensError};
use tracing::{debug, warn};

use crate::records::{TodoRecord, TODOS_SUFFIX};

/// Suffix of a repository's `cloc --csv` output.
pub const CLOC_SUFFIX: &str = "_cloc.csv";

/// Header line that precedes the per-language rows of a `cloc` file.
pub const CLOC_HEADER: &str = "files,language,blank,comment,code";

/// Violation recorded when a registered repository lacks a data file.
pub const MISSING_DATAFILE: &str = "Failed validate_and_read: missing datafile";

#[derive(Debug, Deserialize)]
struct SampleRow {
    repo: String,
    #[serde(rename = "Sample")]
    sample: String,
}

/// Registered repositories and their sample labels, in file order.
///
/// # Examples
///
/// ```
/// use todolens_report::aggregate::SampleRegistry;
///
/// let text = "repo;Sample\nowner/a; control\n";
/// let registry = SampleRegistry::from_reader(text.as_bytes()).unwrap();
/// assert_eq!(registry.sample("owner/a"), Some("control"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct SampleRegistry {
    samples: IndexMap<String, String>,
}

impl SampleRegistry {
    /// Read a `;`-separated registry with `repo` and `Sample` columns.
    ///
    /// # Errors
    ///
    /// Returns [`LensError::FileNotFound`] if `path` does not exist, or
    /// [`LensError::Csv`] if it is malformed.
    pub fn from_path(path: &Path) -> Result<Self, LensError> {
        if !path.exists() {
            return Err(LensError::FileNotFound(path.to_path_buf()));
        }
        Self::from_reader(fs::File::open(path)?)
    }

    /// Read a registry from any reader.
    ///
    /// # Errors
    ///
    /// Returns [`LensError::Csv`] if the content is malformed.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, LensError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b';')
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut samples = IndexMap::new();
        for row in reader.deserialize() {
            let row: SampleRow = row?;
            samples.insert(row.repo, row.sample);
        }
        Ok(Self { samples })
    }

    /// Sample label of a registered repository.
    pub fn sample(&self, repo: &str) -> Option<&str> {
        self.samples.get(repo).map(String::as_str)
    }

    /// `(repo, sample)` pairs in registry order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.samples.iter().map(|(r, s)| (r.as_str(), s.as_str()))
    }

    /// Number of registered repositories.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether no repository is registered.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Data files and parsed content for one registered repository.
#[derive(Debug, Clone)]
pub struct RepoDatum {
    handle: String,
    safe: String,
    todo_file: Option<PathBuf>,
    cloc_file: Option<PathBuf>,
    read: bool,
    rows: Vec<TodoRecord>,
    lines_of_code: u64,
    violations: Vec<String>,
}

impl RepoDatum {
    /// A datum for `handle` with no files claimed yet.
    pub fn new(handle: &str) -> Self {
        Self {
            handle: handle.to_string(),
            safe: safe_handle(handle),
            todo_file: None,
            cloc_file: None,
            read: false,
            rows: Vec::new(),
            lines_of_code: 0,
            violations: Vec::new(),
        }
    }

    /// Claim `path` if its file name contains this repository's safe handle
    /// and ends with a known data suffix. Returns whether it was claimed.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::path::Path;
    /// use todolens_report::aggregate::RepoDatum;
    ///
    /// let mut datum = RepoDatum::new("owner/repo");
    /// assert!(datum.add_file_if_matches(Path::new("run_owner_repo__todos.csv")));
    /// assert!(!datum.add_file_if_matches(Path::new("run_owner_repo__summary.csv")));
    /// assert!(!datum.add_file_if_matches(Path::new("run_other__cloc.csv")));
    /// ```
    pub fn add_file_if_matches(&mut self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        if !name.contains(&self.safe) {
            return false;
        }
        if name.ends_with(TODOS_SUFFIX) {
            self.todo_file = Some(path.to_path_buf());
        } else if name.ends_with(CLOC_SUFFIX) {
            self.cloc_file = Some(path.to_path_buf());
        } else {
            return false;
        }
        true
    }

    /// Read both data files and validate the TODO rows.
    ///
    /// Returns `false`, with a violation recorded, if a data file is missing
    /// or cannot be parsed. Suspicious rows are recorded as violations but
    /// still read.
    pub fn validate_and_read(&mut self) -> bool {
        let (Some(todo_file), Some(cloc_file)) = (self.todo_file.clone(), self.cloc_file.clone())
        else {
            self.violation(MISSING_DATAFILE.to_string());
            return false;
        };

        let read = read_cloc(&cloc_file).and_then(|loc| {
            let rows = read_todos(&todo_file, &self.handle)?;
            Ok((loc, rows))
        });
        match read {
            Ok((loc, rows)) => {
                self.lines_of_code = loc;
                self.rows = rows;
            }
            Err(e) => {
                self.violation(format!("Failed validate_and_read: bad read ({e})"));
                return false;
            }
        }

        self.validate_rows();
        self.read = true;
        true
    }

    fn validate_rows(&mut self) {
        let empty_bodies = self.rows.iter().filter(|r| r.body.is_empty()).count();
        if empty_bodies > 0 {
            self.violation(format!("Todos can be NULL ({empty_bodies} time(s))"));
        }

        let missing_added = self.rows.iter().filter(|r| is_missing(&r.added)).count();
        if missing_added > 0 {
            self.violation(format!("Added can be NULL ({missing_added} time(s))"));
        }

        if self.rows.iter().any(|r| r.age <= 0.0) {
            self.violation("Age can be 0 or less".to_string());
        }
    }

    fn violation(&mut self, message: String) {
        debug!(repo = %self.handle, %message, "violation");
        self.violations.push(message);
    }

    /// Repository handle as registered, e.g. `owner/repo`.
    pub fn handle(&self) -> &str {
        &self.handle
    }

    /// Whether both data files were found and parsed.
    pub fn is_read(&self) -> bool {
        self.read
    }

    /// TODO rows, with `repo` set to this repository's handle.
    pub fn rows(&self) -> &[TodoRecord] {
        &self.rows
    }

    /// Sum of the `code` column of the `cloc` file.
    pub fn lines_of_code(&self) -> u64 {
        self.lines_of_code
    }

    /// Problems found while reading, in the order they were found.
    pub fn violations(&self) -> &[String] {
        &self.violations
    }

    /// Delete this repository's claimed data files and forget what was read.
    ///
    /// Returns how many files were deleted.
    ///
    /// # Errors
    ///
    /// Returns [`LensError::Io`] if a claimed file cannot be deleted.
    pub fn remove_files(&mut self) -> Result<usize, LensError> {
        let mut removed = 0;
        for path in [self.todo_file.take(), self.cloc_file.take()].into_iter().flatten() {
            if path.exists() {
                fs::remove_file(&path)?;
                debug!(repo = %self.handle, path = %path.display(), "data file removed");
                removed += 1;
            }
        }
        self.read = false;
        self.rows.clear();
        self.lines_of_code = 0;
        Ok(removed)
    }

    /// Days between the earliest and latest Added/Deleted time of any row.
    ///
    /// A missing side of a row falls back to the other side.
    ///
    /// # Errors
    ///
    /// Returns [`LensError::Timestamp`] if any time cannot be parsed.
    pub fn days_of_data(&self) -> Result<f64, LensError> {
        let mut span: Option<(i64, i64)> = None;
        for row in &self.rows {
            let added = epoch_or_fallback(&row.added, &row.deleted)?;
            let deleted = epoch_or_fallback(&row.deleted, &row.added)?;
            let (low, high) = (added.min(deleted), added.max(deleted));
            span = Some(match span {
                Some((min, max)) => (min.min(low), max.max(high)),
                None => (low, high),
            });
        }
        Ok(span.map_or(0.0, |(min, max)| (max - min) as f64 / SECONDS_PER_DAY))
    }
}

fn read_cloc(path: &Path) -> Result<u64, LensError> {
    let content = fs::read_to_string(path)?;
    let mut total = 0u64;
    let mut in_table = false;
    for line in content.lines() {
        if line.starts_with(CLOC_HEADER) {
            in_table = true;
            continue;
        }
        if !in_table || line.trim().is_empty() {
            continue;
        }
        let code = line
            .split(',')
            .nth(4)
            .ok_or_else(|| LensError::Data(format!("cloc row has no code column: '{line}'")))?;
        total += code
            .trim()
            .parse::<u64>()
            .map_err(|e| LensError::Data(format!("invalid cloc code count '{code}': {e}")))?;
    }
    Ok(total)
}

fn read_todos(path: &Path, handle: &str) -> Result<Vec<TodoRecord>, LensError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        let mut row: TodoRecord = row?;
        row.repo = handle.to_string();
        rows.push(row);
    }
    Ok(rows)
}

/// One line of the aggregated report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoReport {
    /// Repository handle.
    pub repo: String,
    /// Sample label from the registry.
    pub sample: String,
    /// Span of the repository's Added/Deleted times in days.
    pub days_of_data: f64,
    /// Sum of the `cloc` code column.
    pub lines_of_code: u64,
    /// Rows with an Added time.
    pub todo_count: usize,
    /// Rows with a Deleted time.
    pub deleted_count: usize,
    /// Mean of the rows' Age column.
    pub mean_age: f64,
    /// Natural log of `days_of_data`.
    pub ln_days_of_data: f64,
    /// Natural log of `lines_of_code`.
    pub ln_code: f64,
}

impl RepoReport {
    /// Summarize a datum that has at least one row.
    ///
    /// # Errors
    ///
    /// Returns [`LensError::Timestamp`] if a row's times cannot be parsed.
    pub fn from_datum(datum: &RepoDatum, sample: &str) -> Result<Self, LensError> {
        let rows = datum.rows();
        let days_of_data = datum.days_of_data()?;
        let mean_age = if rows.is_empty() {
            0.0
        } else {
            rows.iter().map(|r| r.age).sum::<f64>() / rows.len() as f64
        };
        let lines_of_code = datum.lines_of_code();

        Ok(Self {
            repo: datum.handle().to_string(),
            sample: sample.to_string(),
            days_of_data,
            lines_of_code,
            todo_count: rows.iter().filter(|r| !is_missing(&r.added)).count(),
            deleted_count: rows.iter().filter(|r| !is_missing(&r.deleted)).count(),
            mean_age,
            ln_days_of_data: days_of_data.ln(),
            ln_code: (lines_of_code as f64).ln(),
        })
    }
}

/// Result of aggregating a sample registry over a data directory.
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    /// One report per repository with at least one TODO row, registry order.
    pub reports: Vec<RepoReport>,
    /// Every registered repository's datum, read or not.
    pub datums: Vec<RepoDatum>,
    /// Violations that concern the registry rather than one repository.
    pub violations: Vec<String>,
    missing: Vec<String>,
}

impl Aggregation {
    /// Registered repositories with no data files at all.
    pub fn missing_samples(&self) -> &[String] {
        &self.missing
    }

    /// Read repositories that recorded at least one violation.
    pub fn violating_samples(&self) -> Vec<&str> {
        self.datums
            .iter()
            .filter(|d| d.is_read() && !d.violations().is_empty())
            .map(RepoDatum::handle)
            .collect()
    }

    /// Drop the named repositories: delete their data files and remove
    /// their reports. The repositories stay registered, so a later
    /// [`aggregate`] lists them as missing samples.
    ///
    /// Returns how many files were deleted.
    ///
    /// # Errors
    ///
    /// Returns [`LensError::Io`] if a data file cannot be deleted.
    pub fn remove_samples(&mut self, repos: &[String]) -> Result<usize, LensError> {
        let mut removed = 0;
        for datum in self.datums.iter_mut() {
            if repos.iter().any(|r| r == datum.handle()) {
                removed += datum.remove_files()?;
            }
        }
        self.reports.retain(|r| !repos.contains(&r.repo));
        for repo in repos {
            if !self.datums.iter().any(|d| d.handle() == repo) {
                warn!(repo = %repo, "cannot drop unregistered repository");
            }
        }
        Ok(removed)
    }

    /// Every violation as printable lines: registry-level first, then one
    /// block per repository.
    pub fn violation_report(&self) -> String {
        let mut lines: Vec<String> = self.violations.clone();
        for datum in self.datums.iter().filter(|d| !d.violations().is_empty()) {
            lines.push(format!("{}: \n\t{}", datum.handle(), datum.violations().join("\n\t")));
        }
        lines.join("\n")
    }
}

/// Aggregate every registered repository from the files in `data_dir`.
///
/// Each report is computed from its own datum's rows, never from a merged
/// table, so a report's counts always match the rows that were read.
///
/// # Errors
///
/// Returns [`LensError::Io`] if `data_dir` cannot be listed, or
/// [`LensError::Timestamp`] if a read TODO table holds a malformed time.
pub fn aggregate(registry: &SampleRegistry, data_dir: &Path) -> Result<Aggregation, LensError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(data_dir)? {
        let path = entry?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();

    let mut aggregation = Aggregation::default();
    for (repo, sample) in registry.iter() {
        let mut datum = RepoDatum::new(repo);
        for file in &files {
            datum.add_file_if_matches(file);
        }

        if datum.validate_and_read() {
            if datum.rows().is_empty() {
                aggregation
                    .violations
                    .push(format!("{repo} has datafiles but no associated data"));
            } else {
                aggregation.reports.push(RepoReport::from_datum(&datum, sample)?);
            }
        } else if datum.todo_file.is_none() && datum.cloc_file.is_none() {
            aggregation.missing.push(repo.to_string());
        }

        if !datum.violations().is_empty() {
            warn!(repo, violations = datum.violations().len(), "repository has violations");
        }
        aggregation.datums.push(datum);
    }

    debug!(
        registered = registry.len(),
        reported = aggregation.reports.len(),
        missing = aggregation.missing.len(),
        "aggregation complete"
    );
    Ok(aggregation)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TODOS: &str = "repo,todo ID,Added,Deleted,Age,Filetouches,Author Union,Author Intersect,safe body,safe contexts,filepaths
o/a,0,\"Tue, 29 Nov 2016 13:57\",\"Thu, 01 Dec 2016 13:57\",2.0,3,1,1,// TODO x,// TODO x,a.rs
o/a,1,\"Thu, 01 Dec 2016 13:57\",N/A,9.0,1,1,0,// FIXME y,// FIXME y,b.rs
";

    const CLOC: &str = "github.com/AlDanial/cloc v 1.90  T=0.05 s
files,language,blank,comment,code
3,Rust,10,5,120
1,TOML,0,0,30
";

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    fn registry(rows: &[(&str, &str)]) -> SampleRegistry {
        let mut text = String::from("repo;Sample\n");
        for (repo, sample) in rows {
            text.push_str(&format!("{repo};{sample}\n"));
        }
        SampleRegistry::from_reader(text.as_bytes()).unwrap()
    }

    #[test]
    fn registry_keeps_file_order() {
        let registry = registry(&[("z/z", "late"), ("a/a", "early")]);
        let repos: Vec<_> = registry.iter().map(|(r, _)| r).collect();
        assert_eq!(repos, vec!["z/z", "a/a"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn missing_registry_file_is_reported() {
        let err = SampleRegistry::from_path(Path::new("/nonexistent/samples.csv")).unwrap_err();
        assert!(matches!(err, LensError::FileNotFound(_)));
    }

    #[test]
    fn cloc_sums_code_after_header() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "x_cloc.csv", CLOC);
        assert_eq!(read_cloc(&dir.path().join("x_cloc.csv")).unwrap(), 150);
    }

    #[test]
    fn datum_reads_and_reports() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "run_o_a__todos.csv", TODOS);
        write(dir.path(), "run_o_a__cloc.csv", CLOC);

        let agg = aggregate(&registry(&[("o/a", "s1")]), dir.path()).unwrap();
        assert_eq!(agg.reports.len(), 1);
        assert!(agg.missing_samples().is_empty());
        assert!(agg.violating_samples().is_empty());

        let report = &agg.reports[0];
        assert_eq!(report.repo, "o/a");
        assert_eq!(report.sample, "s1");
        assert_eq!(report.lines_of_code, 150);
        assert_eq!(report.todo_count, 2);
        assert_eq!(report.deleted_count, 1);
        assert_eq!(report.mean_age, 5.5);
        // Second row has no Deleted time and falls back to its Added time.
        assert_eq!(report.days_of_data, 2.0);
        assert_eq!(report.ln_days_of_data, 2.0f64.ln());
        assert_eq!(report.ln_code, 150f64.ln());
    }

    #[test]
    fn missing_cloc_is_a_violation() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "run_o_a__todos.csv", TODOS);

        let agg = aggregate(&registry(&[("o/a", "s1")]), dir.path()).unwrap();
        assert!(agg.reports.is_empty());
        assert_eq!(agg.datums[0].violations(), [MISSING_DATAFILE.to_string()]);
        assert!(agg.missing_samples().is_empty());
        assert!(agg.violation_report().contains(MISSING_DATAFILE));
    }

    #[test]
    fn repo_without_files_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let agg = aggregate(&registry(&[("o/none", "s")]), dir.path()).unwrap();
        assert_eq!(agg.missing_samples(), ["o/none".to_string()]);
        assert!(agg.violating_samples().is_empty());
    }

    #[test]
    fn empty_table_is_a_registry_violation() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "run_o_e__todos.csv", "repo,todo ID,Added,Deleted,Age,Filetouches,Author Union,Author Intersect,safe body,safe contexts,filepaths\n");
        write(dir.path(), "run_o_e__cloc.csv", CLOC);

        let agg = aggregate(&registry(&[("o/e", "s")]), dir.path()).unwrap();
        assert!(agg.reports.is_empty());
        assert!(agg.missing_samples().is_empty());
        assert_eq!(agg.violations, ["o/e has datafiles but no associated data".to_string()]);
    }

    #[test]
    fn suspicious_rows_are_violations() {
        let dir = tempfile::tempdir().unwrap();
        let todos = "repo,todo ID,Added,Deleted,Age,Filetouches,Author Union,Author Intersect,safe body,safe contexts,filepaths
o/v,0,N/A,\"Thu, 01 Dec 2016 13:57\",0.0,1,1,0,,,a.rs
";
        write(dir.path(), "run_o_v__todos.csv", todos);
        write(dir.path(), "run_o_v__cloc.csv", CLOC);

        let agg = aggregate(&registry(&[("o/v", "s")]), dir.path()).unwrap();
        let violations = agg.datums[0].violations();
        assert_eq!(violations.len(), 3);
        assert!(violations.contains(&"Todos can be NULL (1 time(s))".to_string()));
        assert!(violations.contains(&"Added can be NULL (1 time(s))".to_string()));
        assert!(violations.contains(&"Age can be 0 or less".to_string()));
        assert_eq!(agg.violating_samples(), vec!["o/v"]);
        assert_eq!(agg.reports[0].todo_count, 0);
        assert_eq!(agg.reports[0].days_of_data, 0.0);
    }

    #[test]
    fn malformed_cloc_is_a_bad_read() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "run_o_b__todos.csv", TODOS);
        write(
            dir.path(),
            "run_o_b__cloc.csv",
            "files,language,blank,comment,code\n1,Rust,0,0,lots\n",
        );

        let agg = aggregate(&registry(&[("o/b", "s")]), dir.path()).unwrap();
        assert!(agg.reports.is_empty());
        let violation = &agg.datums[0].violations()[0];
        assert!(violation.starts_with("Failed validate_and_read: bad read"));
        assert!(violation.contains("malformed data file"));
        assert!(!violation.contains("configuration"));
    }

    #[test]
    fn cloc_without_code_column_is_a_data_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "x_cloc.csv", "files,language,blank,comment,code\n1,Rust\n");
        let err = read_cloc(&dir.path().join("x_cloc.csv")).unwrap_err();
        assert!(matches!(err, LensError::Data(_)));
    }

    #[test]
    fn dropped_samples_lose_their_files_and_reports() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "run_o_a__todos.csv", TODOS);
        write(dir.path(), "run_o_a__cloc.csv", CLOC);
        write(dir.path(), "run_o_k__todos.csv", TODOS);
        write(dir.path(), "run_o_k__cloc.csv", CLOC);
        let registry = registry(&[("o/a", "s1"), ("o/k", "s2")]);

        let mut agg = aggregate(&registry, dir.path()).unwrap();
        assert_eq!(agg.reports.len(), 2);

        let removed = agg.remove_samples(&["o/a".to_string()]).unwrap();
        assert_eq!(removed, 2);
        assert_eq!(agg.reports.len(), 1);
        assert_eq!(agg.reports[0].repo, "o/k");
        assert!(!dir.path().join("run_o_a__todos.csv").exists());
        assert!(dir.path().join("run_o_k__todos.csv").exists());

        let refreshed = aggregate(&registry, dir.path()).unwrap();
        assert_eq!(refreshed.missing_samples(), ["o/a".to_string()]);
        assert_eq!(refreshed.reports.len(), 1);
    }

    #[test]
    fn report_counts_match_rows_read() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "run_o_a__todos.csv", TODOS);
        write(dir.path(), "run_o_a__cloc.csv", CLOC);
        write(dir.path(), "run_o_b__todos.csv", TODOS);
        write(dir.path(), "run_o_b__cloc.csv", CLOC);

        let agg = aggregate(&registry(&[("o/a", "s"), ("o/b", "s")]), dir.path()).unwrap();
        for (report, datum) in agg.reports.iter().zip(&agg.datums) {
            assert_eq!(report.repo, datum.handle());
            assert_eq!(report.todo_count, datum.rows().len());
            assert!(datum.rows().iter().all(|r| r.repo == report.repo));
        }
    }

    #[test]
    fn malformed_time_aborts_aggregation() {
        let dir = tempfile::tempdir().unwrap();
        let todos = "repo,todo ID,Added,Deleted,Age,Filetouches,Author Union,Author Intersect,safe body,safe contexts,filepaths
o/t,0,yesterday,N/A,1.0,1,1,0,TODO,TODO,a.rs
";
        write(dir.path(), "run_o_t__todos.csv", todos);
        write(dir.path(), "run_o_t__cloc.csv", CLOC);

        let err = aggregate(&registry(&[("o/t", "s")]), dir.path()).unwrap_err();
        assert!(matches!(err, LensError::Timestamp(_)));
    }
}

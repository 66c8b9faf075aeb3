//! Text, JSON and Markdown rendering of run and aggregation results.

use serde::Serialize;
use todolens_core::{LensError, OutputFormat};
use todolens_history::stats::RepoSummary;

use crate::aggregate::{Aggregation, RepoReport};

const BUCKET_LABELS: [&str; 5] = ["top 1", "top 25%", "top 50%", "top 75%", "all"];

/// Outcome of mining one repository.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    /// Repository handle.
    pub repo: String,
    /// Distinct TODO texts seen.
    pub todos: usize,
    /// Commit totals and author contribution figures.
    pub summary: RepoSummary,
}

/// Render mined repositories.
///
/// # Errors
///
/// Returns [`LensError::Serialization`] if JSON output fails.
///
/// # Examples
///
/// ```
/// use todolens_core::OutputFormat;
/// use todolens_history::stats::RepoSummary;
/// use todolens_history::walker::RunState;
/// use todolens_report::format::{render_runs, RunReport};
///
/// let run = RunReport {
///     repo: "owner/repo".into(),
///     todos: 0,
///     summary: RepoSummary::from_run(&RunState::default()),
/// };
/// let text = render_runs(&[run], OutputFormat::Text).unwrap();
/// assert!(text.starts_with("owner/repo: 0 TODOs across 0 commits"));
/// ```
pub fn render_runs(runs: &[RunReport], format: OutputFormat) -> Result<String, LensError> {
    let out = match format {
        OutputFormat::Json => serde_json::to_string_pretty(runs)?,
        OutputFormat::Markdown => {
            let mut out = String::from("# TODO Mining Summary\n\n");
            out.push_str(
                "| Repository | TODOs | Commits | Days of Data \
                 | Top 1 | Top 25% | Top 50% | Top 75% | All |\n",
            );
            out.push_str(
                "|------------|-------|---------|--------------\
                 |-------|---------|---------|---------|-----|\n",
            );
            for run in runs {
                let [a, b, c, d, e] = run.summary.contributions;
                out.push_str(&format!(
                    "| `{}` | {} | {} | {:.1} | {a} | {b} | {c} | {d} | {e} |\n",
                    run.repo, run.todos, run.summary.total_commits, run.summary.days_of_data,
                ));
            }
            out
        }
        OutputFormat::Text => {
            let mut lines = Vec::new();
            for run in runs {
                lines.push(format!(
                    "{}: {} TODOs across {} commits ({:.1} days of data)",
                    run.repo, run.todos, run.summary.total_commits, run.summary.days_of_data
                ));
                let buckets: Vec<String> = BUCKET_LABELS
                    .iter()
                    .zip(run.summary.contributions)
                    .map(|(label, commits)| format!("{label}={commits}"))
                    .collect();
                lines.push(format!("  commits by authors: {}", buckets.join("  ")));
            }
            lines.join("\n")
        }
    };
    Ok(out)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AggregationJson<'a> {
    reports: &'a [RepoReport],
    missing_samples: &'a [String],
    violating_samples: Vec<&'a str>,
}

/// Render an aggregation's per-repository reports and missing samples.
///
/// Violations are not included; print [`Aggregation::violation_report`]
/// separately.
///
/// # Errors
///
/// Returns [`LensError::Serialization`] if JSON output fails.
pub fn render_aggregation(
    aggregation: &Aggregation,
    format: OutputFormat,
) -> Result<String, LensError> {
    let out = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&AggregationJson {
            reports: &aggregation.reports,
            missing_samples: aggregation.missing_samples(),
            violating_samples: aggregation.violating_samples(),
        })?,
        OutputFormat::Markdown => {
            let mut out = String::from("# TODO Aggregation\n\n");
            out.push_str(
                "| Repository | Sample | Days of Data | Code | TODOs \
                 | Deleted | Mean Age | ln Days | ln Code |\n",
            );
            out.push_str(
                "|------------|--------|--------------|------|-------\
                 |---------|----------|---------|---------|\n",
            );
            for r in &aggregation.reports {
                out.push_str(&format!(
                    "| `{}` | {} | {:.1} | {} | {} | {} | {:.1} | {:.3} | {:.3} |\n",
                    r.repo,
                    r.sample,
                    r.days_of_data,
                    r.lines_of_code,
                    r.todo_count,
                    r.deleted_count,
                    r.mean_age,
                    r.ln_days_of_data,
                    r.ln_code,
                ));
            }
            if !aggregation.missing_samples().is_empty() {
                out.push_str("\n## Missing Samples\n\n");
                for repo in aggregation.missing_samples() {
                    out.push_str(&format!("- `{repo}`\n"));
                }
            }
            out
        }
        OutputFormat::Text => {
            let mut lines = vec![format!(
                "{:<32} {:<12} {:>8} {:>10} {:>6} {:>8} {:>9}",
                "repo", "sample", "days", "code", "todos", "deleted", "mean age"
            )];
            lines.push(format!("{:-<91}", ""));
            for r in &aggregation.reports {
                lines.push(format!(
                    "{:<32} {:<12} {:>8.1} {:>10} {:>6} {:>8} {:>9.1}",
                    r.repo,
                    r.sample,
                    r.days_of_data,
                    r.lines_of_code,
                    r.todo_count,
                    r.deleted_count,
                    r.mean_age
                ));
            }
            if !aggregation.missing_samples().is_empty() {
                lines.push(format!(
                    "Missing samples: {}",
                    aggregation.missing_samples().join(", ")
                ));
            }
            lines.join("\n")
        }
    };
    Ok(out)
}

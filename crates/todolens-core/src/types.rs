use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Minimal, immutable view of a commit.
///
/// Commits are owned by the commit source; TODO entities and aggregate
/// counters only keep copies of this record.
///
/// # Examples
///
/// ```
/// use todolens_core::CommitRef;
///
/// let commit = CommitRef {
///     id: "4f2a9c01d3b7e6aa".into(),
///     author: "alice@example.com".into(),
///     timestamp: 1480427844,
/// };
/// assert_eq!(commit.short_id(), "4f2a9c01");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRef {
    /// Full commit id.
    pub id: String,
    /// Author identity, typically an email address.
    pub author: String,
    /// Authored time in epoch seconds.
    pub timestamp: i64,
}

impl CommitRef {
    /// First eight characters of the commit id.
    pub fn short_id(&self) -> &str {
        self.id.get(..8).unwrap_or(&self.id)
    }
}

impl fmt::Display for CommitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Whether a TODO line was introduced or removed by a diff.
///
/// # Examples
///
/// ```
/// use todolens_core::EventKind;
///
/// assert_eq!(EventKind::Added.to_string(), "added");
/// assert_eq!(EventKind::from_marker('-'), Some(EventKind::Deleted));
/// assert_eq!(EventKind::from_marker(' '), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// The line appears on the `+` side of the diff.
    Added,
    /// The line appears on the `-` side of the diff.
    Deleted,
}

impl EventKind {
    /// Map a diff line marker to an event kind.
    pub fn from_marker(marker: char) -> Option<Self> {
        match marker {
            '+' => Some(EventKind::Added),
            '-' => Some(EventKind::Deleted),
            _ => None,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Added => write!(f, "added"),
            EventKind::Deleted => write!(f, "deleted"),
        }
    }
}

/// One Added or Deleted occurrence of a TODO line within one commit's file diff.
///
/// Produced while parsing a commit and consumed immediately by the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffEvent {
    /// Added or deleted.
    pub kind: EventKind,
    /// Matched line with its diff marker stripped.
    pub body: String,
    /// Matched line plus the configured number of following lines.
    pub context: String,
    /// Path of the file the line belongs to.
    pub path: String,
    /// Commit the diff was computed for.
    pub commit: CommitRef,
}

/// Output format for CLI results.
///
/// # Examples
///
/// ```
/// use todolens_core::OutputFormat;
///
/// let fmt: OutputFormat = "json".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Json);
///
/// let fmt: OutputFormat = "md".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Markdown);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable tables and summaries.
    #[default]
    Text,
    /// Machine-readable JSON with camelCase keys.
    Json,
    /// Markdown-formatted output.
    Markdown,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

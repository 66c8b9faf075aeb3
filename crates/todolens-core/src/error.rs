use std::path::PathBuf;

/// Errors that can occur across todolens.
///
/// Each variant wraps a specific error domain. Library crates use this type
/// directly; the binary surfaces it through `miette` at the boundary.
///
/// # Examples
///
/// ```
/// use todolens_core::LensError;
///
/// let err = LensError::Config("lines_after must be numeric".into());
/// assert!(err.to_string().contains("lines_after"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum LensError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Git operation failure, including diff computation for a commit.
    #[error("git error: {0}")]
    #[diagnostic(help(
        "a failed diff aborts the whole walk; partial TODO histories are never reported"
    ))]
    Git(String),

    /// A human-readable timestamp did not match the expected format.
    #[error("timestamp error: {0}")]
    Timestamp(String),

    /// The TODO token pattern is not a valid regular expression.
    #[error("invalid token pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// CSV read or write failure.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A run data file (such as a `cloc` table) has unexpected content.
    #[error("malformed data file: {0}")]
    Data(String),

    /// A required file was not found.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
}

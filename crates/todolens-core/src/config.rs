use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::LensError;

/// Default pattern for lines that carry a TODO marker.
pub const DEFAULT_TOKEN_PATTERN: &str = "(?i)TODO|FIXME";

/// Top-level configuration loaded from `.todolens.toml`.
///
/// Supports layered resolution: CLI flags > local config > defaults.
///
/// # Examples
///
/// ```
/// use todolens_core::LensConfig;
///
/// let config = LensConfig::default();
/// assert_eq!(config.walk.lines_after, 1);
/// assert_eq!(config.run.run_handle, "run");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LensConfig {
    /// Commit walk settings.
    #[serde(default)]
    pub walk: WalkConfig,
    /// Where repositories live and where run output is written.
    #[serde(default)]
    pub run: RunConfig,
    /// Cross-repository aggregation settings.
    #[serde(default)]
    pub aggregate: AggregateConfig,
}

impl LensConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`LensError::Io`] if the file cannot be read, or
    /// [`LensError::Toml`] if the content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use todolens_core::LensConfig;
    /// use std::path::Path;
    ///
    /// let config = LensConfig::from_file(Path::new(".todolens.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, LensError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`LensError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use todolens_core::LensConfig;
    ///
    /// let toml = r#"
    /// [walk]
    /// lines_after = 3
    /// "#;
    /// let config = LensConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.walk.lines_after, 3);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, LensError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }
}

/// Commit walk configuration.
///
/// # Examples
///
/// ```
/// use todolens_core::WalkConfig;
///
/// let config = WalkConfig::default();
/// assert_eq!(config.max_commits, -1);
/// assert_eq!(config.max_commits_limit(), None);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkConfig {
    /// Maximum commits to visit; zero or negative means no limit (default: -1).
    #[serde(default = "default_max_commits")]
    pub max_commits: i64,
    /// Lines following a TODO line to include in its context (default: 1).
    #[serde(default = "default_lines_after")]
    pub lines_after: usize,
    /// Regular expression a line must match to count as a TODO line.
    #[serde(default = "default_token_pattern")]
    pub token_pattern: String,
}

fn default_max_commits() -> i64 {
    -1
}

fn default_lines_after() -> usize {
    1
}

fn default_token_pattern() -> String {
    DEFAULT_TOKEN_PATTERN.into()
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            max_commits: default_max_commits(),
            lines_after: default_lines_after(),
            token_pattern: default_token_pattern(),
        }
    }
}

impl WalkConfig {
    /// The commit bound as an optional count, `None` when unlimited.
    pub fn max_commits_limit(&self) -> Option<usize> {
        usize::try_from(self.max_commits).ok().filter(|n| *n > 0)
    }
}

/// Per-run locations: where repositories are cloned and output is written.
///
/// # Examples
///
/// ```
/// use todolens_core::RunConfig;
/// use std::path::PathBuf;
///
/// let config = RunConfig::default();
/// assert_eq!(
///     config.data_file("rust-lang/rust", "_todos.csv"),
///     PathBuf::from("./run_rust-lang_rust__todos.csv")
/// );
/// assert_eq!(config.remote_url("rust-lang/rust"), "https://github.com/rust-lang/rust");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Base directory holding cloned repositories and run output (default: `.`).
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,
    /// Prefix for every output file of this run (default: `run`).
    #[serde(default = "default_run_handle")]
    pub run_handle: String,
    /// Remote prefix repositories are cloned from (default: GitHub).
    #[serde(default = "default_clone_from")]
    pub clone_from: String,
}

fn default_base_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_run_handle() -> String {
    "run".into()
}

fn default_clone_from() -> String {
    "https://github.com/".into()
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            run_handle: default_run_handle(),
            clone_from: default_clone_from(),
        }
    }
}

impl RunConfig {
    /// Local checkout directory for a repository handle.
    pub fn local_dir(&self, handle: &str) -> PathBuf {
        self.base_dir.join(handle)
    }

    /// Remote URL a repository handle is cloned from.
    pub fn remote_url(&self, handle: &str) -> String {
        format!("{}/{}", self.clone_from.trim_end_matches('/'), handle)
    }

    /// Output file for a repository handle, e.g. `run_owner_repo__todos.csv`.
    pub fn data_file(&self, handle: &str, suffix: &str) -> PathBuf {
        self.base_dir
            .join(format!("{}_{}_{suffix}", self.run_handle, safe_handle(handle)))
    }
}

/// Aggregation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateConfig {
    /// `;`-separated registry of repositories and their sample labels.
    #[serde(default = "default_sample_list")]
    pub sample_list: PathBuf,
}

fn default_sample_list() -> PathBuf {
    PathBuf::from("samples.csv")
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            sample_list: default_sample_list(),
        }
    }
}

/// Flatten a repository handle into a file-name-safe token.
///
/// # Examples
///
/// ```
/// use todolens_core::safe_handle;
///
/// assert_eq!(safe_handle("owner/repo"), "owner_repo");
/// assert_eq!(safe_handle(" a\\b "), "a_b");
/// ```
pub fn safe_handle(handle: &str) -> String {
    handle.replace(['/', '\\'], "_").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = LensConfig::default();
        assert_eq!(config.walk.max_commits, -1);
        assert_eq!(config.walk.lines_after, 1);
        assert_eq!(config.walk.token_pattern, DEFAULT_TOKEN_PATTERN);
        assert_eq!(config.run.base_dir, PathBuf::from("."));
        assert_eq!(config.run.run_handle, "run");
        assert_eq!(config.run.clone_from, "https://github.com/");
        assert_eq!(config.aggregate.sample_list, PathBuf::from("samples.csv"));
    }

    #[test]
    fn parse_full_toml() {
        let toml = r#"
[walk]
max_commits = 500
lines_after = 2
token_pattern = "(?i)TODO|FIXME|XXX"

[run]
base_dir = "/data/repos"
run_handle = "spring"
clone_from = "https://gitlab.com"

[aggregate]
sample_list = "registry.csv"
"#;
        let config = LensConfig::from_toml(toml).unwrap();
        assert_eq!(config.walk.max_commits_limit(), Some(500));
        assert_eq!(config.walk.lines_after, 2);
        assert!(config.walk.token_pattern.ends_with("XXX"));
        assert_eq!(config.run.base_dir, PathBuf::from("/data/repos"));
        assert_eq!(config.run.remote_url("a/b"), "https://gitlab.com/a/b");
        assert_eq!(config.aggregate.sample_list, PathBuf::from("registry.csv"));
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let config = LensConfig::from_toml("").unwrap();
        assert_eq!(config.walk.lines_after, 1);
        assert_eq!(config.run.run_handle, "run");
    }

    #[test]
    fn invalid_toml_returns_error() {
        let result = LensConfig::from_toml("{{invalid}}");
        assert!(result.is_err());
    }

    #[test]
    fn non_positive_max_commits_means_unlimited() {
        for value in [0, -1, -50] {
            let config = WalkConfig {
                max_commits: value,
                ..WalkConfig::default()
            };
            assert_eq!(config.max_commits_limit(), None);
        }
    }

    #[test]
    fn data_file_flattens_handle_separators() {
        let config = RunConfig {
            base_dir: PathBuf::from("/out"),
            run_handle: "trial".into(),
            ..RunConfig::default()
        };
        assert_eq!(
            config.data_file("org\\team/repo", "_summary.csv"),
            PathBuf::from("/out/trial_org_team_repo__summary.csv")
        );
        assert_eq!(config.local_dir("org/repo"), PathBuf::from("/out/org/repo"));
    }
}

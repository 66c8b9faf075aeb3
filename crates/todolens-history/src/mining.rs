//! Commit sources: the repository abstraction the walker reads from.
//!
//! [`GitRepository`] mines a real repository through git2; the in-memory
//! source lives in [`crate::memory`].

use std::path::Path;

use git2::{DiffFindOptions, DiffOptions, Oid, Patch, Repository, Sort};
use todolens_core::{CommitRef, LensError};
use todolens_difflens::render::SectionWriter;
use tracing::debug;

/// A commit as yielded by a [`CommitSource`].
///
/// # Examples
///
/// ```
/// use todolens_core::CommitRef;
/// use todolens_history::mining::HistoryCommit;
///
/// let commit = HistoryCommit {
///     commit: CommitRef {
///         id: "c2".into(),
///         author: "bob@example.com".into(),
///         timestamp: 1700000000,
///     },
///     parents: vec!["c1".into()],
/// };
/// assert_eq!(commit.first_parent(), Some("c1"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryCommit {
    /// Identity, author and authored time.
    pub commit: CommitRef,
    /// Parent commit ids, first parent first.
    pub parents: Vec<String>,
}

impl HistoryCommit {
    /// The first parent, or `None` for a root commit.
    pub fn first_parent(&self) -> Option<&str> {
        self.parents.first().map(String::as_str)
    }
}

/// One changed file of a commit diff, rendered as section text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFile {
    /// File path relative to repo root.
    pub path: String,
    /// Section text: path header, marked lines and the closing `---`.
    pub text: String,
}

/// A repository the walker can read commits and diffs from.
pub trait CommitSource {
    /// Commits in visiting order (newest first for git), at most `limit` of them.
    ///
    /// # Errors
    ///
    /// Returns [`LensError::Git`] if history cannot be read.
    fn history(&self, limit: Option<usize>) -> Result<Vec<HistoryCommit>, LensError>;

    /// Per-file diff of `commit` against `parent`, or against an empty tree
    /// when `parent` is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`LensError::Git`] if the diff cannot be computed.
    fn diff(&self, parent: Option<&str>, commit: &str) -> Result<Vec<RenderedFile>, LensError>;
}

/// [`CommitSource`] backed by a git repository on disk.
pub struct GitRepository {
    repo: Repository,
}

impl GitRepository {
    /// Open an existing repository.
    ///
    /// # Errors
    ///
    /// Returns [`LensError::Git`] if `path` is not a git repository.
    pub fn open(path: &Path) -> Result<Self, LensError> {
        let repo = Repository::open(path)
            .map_err(|e| LensError::Git(format!("failed to open repository: {e}")))?;
        Ok(Self { repo })
    }

    /// Clone `remote` into `local`.
    ///
    /// # Errors
    ///
    /// Returns [`LensError::Git`] if the clone fails.
    pub fn clone_from(remote: &str, local: &Path) -> Result<Self, LensError> {
        let repo = Repository::clone(remote, local)
            .map_err(|e| LensError::Git(format!("failed to clone {remote}: {e}")))?;
        Ok(Self { repo })
    }

    /// Open `local` if it already exists, otherwise clone `remote` into it.
    ///
    /// # Errors
    ///
    /// Returns [`LensError::Git`] if opening or cloning fails.
    pub fn open_or_clone(remote: &str, local: &Path) -> Result<Self, LensError> {
        if local.exists() {
            debug!(path = %local.display(), "opening existing checkout");
            Self::open(local)
        } else {
            debug!(remote, path = %local.display(), "cloning repository");
            Self::clone_from(remote, local)
        }
    }

    fn find_commit(&self, id: &str) -> Result<git2::Commit<'_>, LensError> {
        let oid = Oid::from_str(id)
            .map_err(|e| LensError::Git(format!("invalid commit id '{id}': {e}")))?;
        self.repo
            .find_commit(oid)
            .map_err(|e| LensError::Git(format!("failed to find commit {id}: {e}")))
    }
}

impl From<Repository> for GitRepository {
    fn from(repo: Repository) -> Self {
        Self { repo }
    }
}

impl CommitSource for GitRepository {
    fn history(&self, limit: Option<usize>) -> Result<Vec<HistoryCommit>, LensError> {
        let mut revwalk = self
            .repo
            .revwalk()
            .map_err(|e| LensError::Git(format!("failed to create revwalk: {e}")))?;

        revwalk
            .set_sorting(Sort::TIME)
            .map_err(|e| LensError::Git(format!("failed to sort revwalk: {e}")))?;
        revwalk
            .push_head()
            .map_err(|e| LensError::Git(format!("failed to push HEAD: {e}")))?;

        let mut commits = Vec::new();
        for oid_result in revwalk.take(limit.unwrap_or(usize::MAX)) {
            let oid = oid_result.map_err(|e| LensError::Git(format!("revwalk error: {e}")))?;
            let commit = self
                .repo
                .find_commit(oid)
                .map_err(|e| LensError::Git(format!("failed to find commit: {e}")))?;

            let author = commit.author();
            commits.push(HistoryCommit {
                commit: CommitRef {
                    id: oid.to_string(),
                    author: String::from_utf8_lossy(author.email_bytes()).into_owned(),
                    timestamp: author.when().seconds(),
                },
                parents: commit.parent_ids().map(|id| id.to_string()).collect(),
            });
        }

        Ok(commits)
    }

    fn diff(&self, parent: Option<&str>, commit: &str) -> Result<Vec<RenderedFile>, LensError> {
        let commit_tree = self
            .find_commit(commit)?
            .tree()
            .map_err(|e| LensError::Git(format!("failed to get commit tree: {e}")))?;

        let parent_tree = match parent {
            Some(id) => Some(
                self.find_commit(id)?
                    .tree()
                    .map_err(|e| LensError::Git(format!("failed to get parent tree: {e}")))?,
            ),
            None => None,
        };

        let mut diff_opts = DiffOptions::new();
        let mut diff = self
            .repo
            .diff_tree_to_tree(
                parent_tree.as_ref(),
                Some(&commit_tree),
                Some(&mut diff_opts),
            )
            .map_err(|e| LensError::Git(format!("failed to compute diff for {commit}: {e}")))?;

        // A renamed file is one delta under its new path, not a delete plus an add.
        let mut find_opts = DiffFindOptions::new();
        find_opts.renames(true);
        diff.find_similar(Some(&mut find_opts))
            .map_err(|e| LensError::Git(format!("failed to find renames for {commit}: {e}")))?;

        let mut files = Vec::with_capacity(diff.deltas().len());
        for (delta_idx, delta) in diff.deltas().enumerate() {
            let path = delta
                .new_file()
                .path()
                .or_else(|| delta.old_file().path())
                .unwrap_or(Path::new(""))
                .to_string_lossy()
                .to_string();

            if path.is_empty() {
                continue;
            }

            let mut section = SectionWriter::new(&path);
            // Binary deltas have no patch but still count as a touch.
            let patch = Patch::from_diff(&diff, delta_idx)
                .map_err(|e| LensError::Git(format!("failed to build patch for {path}: {e}")))?;
            if let Some(patch) = patch {
                for hunk_idx in 0..patch.num_hunks() {
                    let line_count = patch
                        .num_lines_in_hunk(hunk_idx)
                        .map_err(|e| LensError::Git(format!("failed to read hunk: {e}")))?;
                    for line_idx in 0..line_count {
                        let line = patch
                            .line_in_hunk(hunk_idx, line_idx)
                            .map_err(|e| LensError::Git(format!("failed to read line: {e}")))?;
                        section.push_line(line.origin(), &String::from_utf8_lossy(line.content()));
                    }
                }
            }

            files.push(RenderedFile {
                path,
                text: section.finish(),
            });
        }

        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    use git2::{Signature, Time};

    use crate::walker::{walk, WalkOptions};

    fn commit_index(repo: &Repository, email: &str, seconds: i64) -> Oid {
        let mut index = repo.index().unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let sig = Signature::new("dev", email, &Time::new(seconds, 0)).unwrap();
        let parents: Vec<git2::Commit> = repo
            .head()
            .ok()
            .and_then(|h| h.target())
            .map(|oid| repo.find_commit(oid).unwrap())
            .into_iter()
            .collect();
        let parent_refs: Vec<&git2::Commit> = parents.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, "change", &tree, &parent_refs)
            .unwrap()
    }

    fn commit_bytes(
        repo: &Repository,
        file: &str,
        content: &[u8],
        email: &str,
        seconds: i64,
    ) -> Oid {
        let workdir = repo.workdir().unwrap();
        fs::write(workdir.join(file), content).unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new(file)).unwrap();
        index.write().unwrap();
        commit_index(repo, email, seconds)
    }

    fn commit_file(
        repo: &Repository,
        file: &str,
        content: &str,
        email: &str,
        seconds: i64,
    ) -> Oid {
        commit_bytes(repo, file, content.as_bytes(), email, seconds)
    }

    fn commit_rename(
        repo: &Repository,
        from: &str,
        to: &str,
        email: &str,
        seconds: i64,
    ) -> Oid {
        let workdir = repo.workdir().unwrap();
        fs::rename(workdir.join(from), workdir.join(to)).unwrap();
        let mut index = repo.index().unwrap();
        index.remove_path(Path::new(from)).unwrap();
        index.add_path(Path::new(to)).unwrap();
        index.write().unwrap();
        commit_index(repo, email, seconds)
    }

    fn commit_removal(repo: &Repository, file: &str, email: &str, seconds: i64) -> Oid {
        let workdir = repo.workdir().unwrap();
        fs::remove_file(workdir.join(file)).unwrap();
        let mut index = repo.index().unwrap();
        index.remove_path(Path::new(file)).unwrap();
        index.write().unwrap();
        commit_index(repo, email, seconds)
    }

    #[test]
    fn history_is_newest_first_with_parents() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let first = commit_file(&repo, "a.txt", "one\n", "alice@example.com", 1_000);
        let second = commit_file(&repo, "a.txt", "two\n", "bob@example.com", 2_000);

        let source = GitRepository::from(repo);
        let history = source.history(None).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].commit.id, second.to_string());
        assert_eq!(history[0].commit.author, "bob@example.com");
        assert_eq!(history[0].commit.timestamp, 2_000);
        assert_eq!(history[0].first_parent(), Some(first.to_string().as_str()));
        assert!(history[1].parents.is_empty());

        assert_eq!(source.history(Some(1)).unwrap().len(), 1);
    }

    #[test]
    fn root_diff_renders_additions_only() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let root = commit_file(&repo, "a.rs", "// TODO x\nfn a() {}\n", "a@x", 10);

        let source = GitRepository::from(repo);
        let files = source.diff(None, &root.to_string()).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "a.rs");
        assert_eq!(files[0].text, "a.rs\n+ // TODO x\n+ fn a() {}\n---");
    }

    #[test]
    fn parent_diff_renders_both_sides() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let first = commit_file(&repo, "a.rs", "// FIXME old\n", "a@x", 10);
        let second = commit_file(&repo, "a.rs", "// TODO new\n", "a@x", 20);

        let source = GitRepository::from(repo);
        let files = source
            .diff(Some(&first.to_string()), &second.to_string())
            .unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].text.contains("\n- // FIXME old\n"));
        assert!(files[0].text.contains("\n+ // TODO new\n"));
    }

    #[test]
    fn unknown_commit_is_a_git_error() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        commit_file(&repo, "a.rs", "x\n", "a@x", 10);
        let source = GitRepository::from(repo);
        let err = source
            .diff(None, "0000000000000000000000000000000000000001")
            .unwrap_err();
        assert!(matches!(err, LensError::Git(_)));
    }

    #[test]
    fn open_or_clone_opens_existing_checkout() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        commit_file(&repo, "a.rs", "x\n", "a@x", 10);
        let source =
            GitRepository::open_or_clone("https://invalid.example/none", dir.path()).unwrap();
        assert_eq!(source.history(None).unwrap().len(), 1);
    }

    #[test]
    fn pure_rename_is_a_single_section_under_the_new_path() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let first = commit_file(&repo, "old.rs", "// TODO: keep me\nfn a() {}\n", "a@x", 10);
        let second = commit_rename(&repo, "old.rs", "new.rs", "b@x", 20);

        let source = GitRepository::from(repo);
        let files = source
            .diff(Some(&first.to_string()), &second.to_string())
            .unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "new.rs");
        assert_eq!(files[0].text, "new.rs\n---");
    }

    #[test]
    fn renamed_todo_is_never_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        commit_file(&repo, "old.rs", "// TODO: keep me\nfn a() {}\n", "a@x", 10);
        commit_rename(&repo, "old.rs", "new.rs", "b@x", 20);

        let outcome = walk(&GitRepository::from(repo), &WalkOptions::default()).unwrap();
        let todo = outcome.todos.get("// TODO: keep me").unwrap();
        assert_eq!(todo.added().len(), 1);
        assert!(todo.deleted().is_empty());
        assert_eq!(todo.paths().collect::<Vec<_>>(), vec!["old.rs"]);
        assert_eq!(outcome.run.path_touches("new.rs"), 1);
        assert_eq!(outcome.run.path_touches("old.rs"), 1);
    }

    #[test]
    fn deleted_file_renders_under_its_old_path() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        commit_file(&repo, "keep.rs", "fn keep() {}\n", "a@x", 10);
        let first = commit_file(&repo, "gone.rs", "// FIXME: drop\n", "a@x", 20);
        let second = commit_removal(&repo, "gone.rs", "b@x", 30);

        let source = GitRepository::from(repo);
        let files = source
            .diff(Some(&first.to_string()), &second.to_string())
            .unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "gone.rs");
        assert_eq!(files[0].text, "gone.rs\n- // FIXME: drop\n---");

        let outcome = walk(&source, &WalkOptions::default()).unwrap();
        let todo = outcome.todos.get("// FIXME: drop").unwrap();
        assert_eq!(todo.deleted().len(), 1);
        assert_eq!(todo.deleted()[0].author, "b@x");
    }

    #[test]
    fn binary_file_still_counts_as_a_touch() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let first = commit_bytes(&repo, "blob.bin", b"\x00\x01TODO\x00", "a@x", 10);
        let second = commit_bytes(&repo, "blob.bin", b"\x00\x02FIXME\x00", "a@x", 20);

        let source = GitRepository::from(repo);
        let files = source
            .diff(Some(&first.to_string()), &second.to_string())
            .unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].text, "blob.bin\n---");

        let outcome = walk(&source, &WalkOptions::default()).unwrap();
        assert!(outcome.todos.is_empty());
        assert_eq!(outcome.run.path_touches("blob.bin"), 2);
    }

    #[test]
    fn accented_emails_are_kept_intact() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        commit_file(&repo, "a.rs", "x\n", "caf\u{e9}@x", 10);

        let history = GitRepository::from(repo).history(None).unwrap();
        assert_eq!(history[0].commit.author, "caf\u{e9}@x");
    }
}

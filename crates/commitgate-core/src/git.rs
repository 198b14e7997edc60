//! Git-backed change-set fetcher.
//!
//! Shells out to the `git` binary for two read-only lookups:
//! `git rev-parse --verify` to bind a view to the current revision, and
//! `git log --format=raw <previous>..<current>` for the change log.

use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::debug;

use crate::error::{GateError, Result};
use crate::fetch::{BranchHead, ChangeSetFetcher, Revision, RevisionView, SourceHandle};

/// Configuration for [`GitCliFetcher`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Program used to run git.
    pub git_program: PathBuf,

    /// Upper bound for each git invocation, in seconds (0 = unbounded).
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            git_program: PathBuf::from("git"),
            timeout_secs: 60,
        }
    }
}

/// Fetches change sets from local git repositories.
///
/// Sources must be of kind `git` with the repository path as location.
#[derive(Debug, Clone, Default)]
pub struct GitCliFetcher {
    config: FetchConfig,
}

impl GitCliFetcher {
    pub fn new(config: FetchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[async_trait]
impl ChangeSetFetcher for GitCliFetcher {
    async fn open_view(
        &self,
        source: &SourceHandle,
        head: &BranchHead,
        current: &Revision,
    ) -> Result<Option<Box<dyn RevisionView>>> {
        if !source.is_git() {
            debug!(source = %source, "unsupported source kind");
            return Ok(None);
        }

        let repo_dir = PathBuf::from(&source.location);
        if !repo_dir.is_dir() {
            debug!(source = %source, "source location is not a directory");
            return Ok(None);
        }

        let Some(sha) = resolve_commit(&self.config, &repo_dir, current).await? else {
            debug!(source = %source, revision = %current, "revision does not resolve to a commit");
            return Ok(None);
        };

        let view: Box<dyn RevisionView> = Box::new(GitView {
            config: self.config.clone(),
            repo_dir,
            head: head.clone(),
            sha,
        });
        Ok(Some(view))
    }
}

/// A repository bound to one resolved commit.
#[derive(Debug, Clone)]
pub struct GitView {
    config: FetchConfig,
    repo_dir: PathBuf,
    head: BranchHead,
    sha: String,
}

#[async_trait]
impl RevisionView for GitView {
    async fn changes_since(&self, previous: &Revision) -> Result<Vec<u8>> {
        if !is_safe_revision(previous.as_str()) {
            return Err(GateError::Fetch(format!("invalid revision: {previous:?}")));
        }

        let range = format!("{}..{}", previous, self.sha);
        debug!(head = %self.head, range = %range, "reading change log");

        let args = [
            "log",
            "--no-color",
            "--no-abbrev",
            "--format=raw",
            range.as_str(),
            "--",
        ];
        let output = run_git(&self.config, &self.repo_dir, &args).await?;
        if !output.status.success() {
            return Err(GateError::Git {
                command: format!("git {}", args.join(" ")),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output.stdout)
    }
}

/// Resolve `rev` to a full commit id, `None` if it is not a commit in `repo_dir`.
async fn resolve_commit(
    config: &FetchConfig,
    repo_dir: &Path,
    rev: &Revision,
) -> Result<Option<String>> {
    if !is_safe_revision(rev.as_str()) {
        return Ok(None);
    }

    let target = format!("{rev}^{{commit}}");
    let output = run_git(
        config,
        repo_dir,
        &["rev-parse", "--verify", "--quiet", target.as_str()],
    )
    .await?;
    if !output.status.success() {
        return Ok(None);
    }

    let sha = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if sha.is_empty() {
        return Ok(None);
    }
    Ok(Some(sha))
}

/// Revisions are passed as positional arguments, so they must not look like options.
fn is_safe_revision(rev: &str) -> bool {
    !rev.is_empty() && !rev.starts_with('-') && !rev.chars().any(char::is_whitespace)
}

async fn run_git(config: &FetchConfig, repo_dir: &Path, args: &[&str]) -> Result<Output> {
    let command = format!("git {}", args.join(" "));

    let child = Command::new(&config.git_program)
        .args(args)
        .current_dir(repo_dir)
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| GateError::Git {
            command: command.clone(),
            stderr: format!("failed to run git: {e}"),
        })?;

    let output = if config.timeout_secs > 0 {
        tokio::time::timeout(
            Duration::from_secs(config.timeout_secs),
            child.wait_with_output(),
        )
        .await
        .map_err(|_| GateError::Timeout {
            command: command.clone(),
            secs: config.timeout_secs,
        })??
    } else {
        child.wait_with_output().await?
    };

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::SourceKind;
    use crate::parser::parse_log_bytes;
    use std::process::Command as StdCommand;

    fn run_git_sync(repo_dir: &Path, args: &[&str]) -> String {
        let output = StdCommand::new("git")
            .args(args)
            .current_dir(repo_dir)
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    fn commit_as(repo_dir: &Path, email: &str, message: &str) -> String {
        let user_email = format!("user.email={email}");
        run_git_sync(
            repo_dir,
            &[
                "-c",
                "user.name=Test User",
                "-c",
                user_email.as_str(),
                "commit",
                "--allow-empty",
                "-m",
                message,
            ],
        );
        run_git_sync(repo_dir, &["rev-parse", "HEAD"])
    }

    fn make_git_repo() -> (tempfile::TempDir, String) {
        let dir = tempfile::tempdir().unwrap();
        run_git_sync(dir.path(), &["init"]);
        let base = commit_as(dir.path(), "base@example.com", "initial");
        (dir, base)
    }

    fn source(dir: &tempfile::TempDir) -> SourceHandle {
        SourceHandle::git(dir.path().to_string_lossy().to_string())
    }

    #[tokio::test]
    async fn open_view_resolves_current_revision() {
        let (repo, base) = make_git_repo();
        let fetcher = GitCliFetcher::default();
        let view = fetcher
            .open_view(&source(&repo), &BranchHead::new("main"), &Revision::new("HEAD"))
            .await
            .unwrap();
        assert!(view.is_some());

        // HEAD resolves to the only commit
        let log = view
            .unwrap()
            .changes_since(&Revision::new(base))
            .await
            .unwrap();
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn changes_since_returns_commits_newest_first() {
        let (repo, base) = make_git_repo();
        commit_as(repo.path(), "hello@example.com", "first");
        let head = commit_as(repo.path(), "jenkins@example.com", "second");

        let fetcher = GitCliFetcher::default();
        let view = fetcher
            .open_view(&source(&repo), &BranchHead::new("main"), &Revision::new(head.clone()))
            .await
            .unwrap()
            .expect("view");
        let raw = view.changes_since(&Revision::new(base)).await.unwrap();
        let commits = parse_log_bytes(&raw).unwrap();

        let emails: Vec<&str> = commits.iter().map(|c| c.author_email.as_str()).collect();
        assert_eq!(emails, vec!["jenkins@example.com", "hello@example.com"]);
        assert_eq!(commits[0].id, head);
        assert_eq!(commits[0].summary(), "second");
        assert_eq!(commits[0].parents.len(), 1);
    }

    #[tokio::test]
    async fn unknown_current_revision_has_no_view() {
        let (repo, _) = make_git_repo();
        let view = GitCliFetcher::default()
            .open_view(
                &source(&repo),
                &BranchHead::new("main"),
                &Revision::new("0000000000000000000000000000000000000000"),
            )
            .await
            .unwrap();
        assert!(view.is_none());
    }

    #[tokio::test]
    async fn option_like_revision_has_no_view() {
        let (repo, _) = make_git_repo();
        let view = GitCliFetcher::default()
            .open_view(&source(&repo), &BranchHead::new("main"), &Revision::new("--all"))
            .await
            .unwrap();
        assert!(view.is_none());
    }

    #[tokio::test]
    async fn non_git_source_has_no_view() {
        let dir = tempfile::tempdir().unwrap();
        let svn = SourceHandle::new(SourceKind::Other("svn".to_string()), "https://svn");
        let fetcher = GitCliFetcher::default();
        assert!(fetcher
            .open_view(&svn, &BranchHead::new("main"), &Revision::new("HEAD"))
            .await
            .unwrap()
            .is_none());

        // a plain directory is not a repository
        assert!(fetcher
            .open_view(&source(&dir), &BranchHead::new("main"), &Revision::new("HEAD"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn unknown_previous_revision_is_git_error() {
        let (repo, _) = make_git_repo();
        let view = GitCliFetcher::default()
            .open_view(&source(&repo), &BranchHead::new("main"), &Revision::new("HEAD"))
            .await
            .unwrap()
            .expect("view");
        let err = view
            .changes_since(&Revision::new("does-not-exist"))
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::Git { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn option_like_previous_revision_rejected() {
        let (repo, _) = make_git_repo();
        let view = GitCliFetcher::default()
            .open_view(&source(&repo), &BranchHead::new("main"), &Revision::new("HEAD"))
            .await
            .unwrap()
            .expect("view");
        let err = view
            .changes_since(&Revision::new("--output=/tmp/x"))
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::Fetch(_)));
    }

    #[tokio::test]
    async fn missing_git_program_is_git_error() {
        let (repo, _) = make_git_repo();
        let fetcher = GitCliFetcher::new(FetchConfig {
            git_program: PathBuf::from("/nonexistent/git"),
            timeout_secs: 5,
        });
        let err = fetcher
            .open_view(&source(&repo), &BranchHead::new("main"), &Revision::new("HEAD"))
            .await
            .err()
            .expect("spawn should fail");
        assert!(err.to_string().contains("failed to run git"));
    }

    #[test]
    fn safe_revision_rules() {
        assert!(is_safe_revision("HEAD"));
        assert!(is_safe_revision("1567861636cd854f4dd6fa40bf94c0c657681dd5"));
        assert!(!is_safe_revision(""));
        assert!(!is_safe_revision("-n1"));
        assert!(!is_safe_revision("a b"));
    }

    #[test]
    fn fetch_config_defaults() {
        let config = FetchConfig::default();
        assert_eq!(config.git_program, PathBuf::from("git"));
        assert_eq!(config.timeout_secs, 60);

        let parsed: FetchConfig = serde_json::from_str(r#"{"timeout_secs": 5}"#).unwrap();
        assert_eq!(parsed.git_program, PathBuf::from("git"));
        assert_eq!(parsed.timeout_secs, 5);
    }
}

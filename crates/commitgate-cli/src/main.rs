//! commitgate - automatic build decisions for branch events
//!
//! The `commitgate` command runs branch build strategies against a local git
//! repository, outside of any CI host.
//!
//! ## Commands
//!
//! - `evaluate`: decide whether a push between two revisions should build
//! - `parse`: parse a raw `git log --format=raw` dump into commit records
//! - `strategies`: list registered strategies

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use commitgate_core::{
    parse_log_bytes, BranchHead, Commit, FetchConfig, GitCliFetcher, PolicyConfig, Revision,
    SourceHandle, ALLOW_IF_NOT_EXCLUDED_ENV, IGNORED_AUTHORS_ENV,
};
use commitgate_strategy::{registry, BranchBuildStrategy, BuildVerdict, StrategyKind};
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "commitgate")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Skip automatic builds for pushes made by ignored authors", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decide whether the change set between two revisions should build
    Evaluate {
        /// Path to the git repository
        #[arg(short, long, default_value = ".")]
        repo: PathBuf,

        /// Branch the revisions belong to
        #[arg(short, long, default_value = "main")]
        branch: String,

        /// Revision the branch now points at
        #[arg(long)]
        current: String,

        /// Revision the branch pointed at before the push
        #[arg(long)]
        previous: String,

        /// Policy config file (JSON)
        #[arg(short, long, env = "COMMITGATE_CONFIG")]
        config: Option<PathBuf>,

        /// Comma-separated author emails to ignore (overrides config)
        #[arg(long)]
        ignored_authors: Option<String>,

        /// Build when at least one author is not ignored (overrides config)
        #[arg(long)]
        allow_if_not_excluded: Option<bool>,

        /// Timeout for each git invocation
        #[arg(long, default_value = "60")]
        timeout_secs: u64,

        /// git executable to run
        #[arg(long, default_value = "git")]
        git: PathBuf,

        /// Exit with status 1 when the build is suppressed
        #[arg(long)]
        exit_code: bool,
    },

    /// Parse a raw git log (from FILE or stdin) and print commits as JSON
    Parse {
        /// Log file; reads stdin when omitted
        file: Option<PathBuf>,
    },

    /// List registered strategies
    Strategies,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    commitgate_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Evaluate {
            repo,
            branch,
            current,
            previous,
            config,
            ignored_authors,
            allow_if_not_excluded,
            timeout_secs,
            git,
            exit_code,
        } => {
            let policy = resolve_policy(config.as_deref(), ignored_authors, allow_if_not_excluded)?;
            let fetch = FetchConfig {
                git_program: git,
                timeout_secs,
            };
            let verdict = cmd_evaluate(&repo, &branch, &current, &previous, policy, fetch).await;
            println!("{}", serde_json::to_string_pretty(&verdict)?);

            if exit_code && !verdict.build {
                return Ok(ExitCode::from(1));
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Parse { file } => {
            let commits = cmd_parse(file.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&commits)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Strategies => {
            for descriptor in registry() {
                println!("{:<20} {}", descriptor.id, descriptor.display_name);
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Config file (or environment when no file is given), then flag overrides.
fn resolve_policy(
    config: Option<&Path>,
    ignored_authors: Option<String>,
    allow_if_not_excluded: Option<bool>,
) -> Result<PolicyConfig> {
    let mut policy = match config {
        Some(path) => PolicyConfig::from_json_file(path)
            .with_context(|| format!("Failed to load policy config from {}", path.display()))?,
        None => PolicyConfig::from_env().with_context(|| {
            format!(
                "Invalid policy in {} / {}",
                IGNORED_AUTHORS_ENV, ALLOW_IF_NOT_EXCLUDED_ENV
            )
        })?,
    };

    if let Some(authors) = ignored_authors {
        policy.ignored_authors = authors;
    }
    if let Some(allow) = allow_if_not_excluded {
        policy.allow_build_if_not_excluded_author = allow;
    }
    Ok(policy)
}

/// Run the ignore committer strategy against a local repository.
async fn cmd_evaluate(
    repo: &Path,
    branch: &str,
    current: &str,
    previous: &str,
    policy: PolicyConfig,
    fetch: FetchConfig,
) -> BuildVerdict {
    info!(
        event = "cli.evaluate",
        repo = %repo.display(),
        branch,
        ignored_authors = %policy.ignored_authors,
        allow_if_not_excluded = policy.allow_build_if_not_excluded_author,
    );

    let strategy = StrategyKind::IgnoreCommitter(policy)
        .build(Arc::new(GitCliFetcher::new(fetch)));
    strategy
        .evaluate(
            &SourceHandle::git(repo.to_string_lossy().to_string()),
            &BranchHead::new(branch),
            &Revision::new(current),
            &Revision::new(previous),
        )
        .await
}

/// Parse a raw log from `file`, or stdin when `None`.
fn cmd_parse(file: Option<&Path>) -> Result<Vec<Commit>> {
    let raw = match file {
        Some(path) => {
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?
        }
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };
    parse_log_bytes(&raw).context("Failed to parse log")
}

//! Structured observability hooks for policy evaluations.
//!
//! Decision code reports what happened through a [`DecisionObserver`]. The
//! default [`TracingObserver`] turns each [`PolicyEvent`] into a `tracing`
//! event (`event = "policy.*"` / `event = "fetch.*"`); hosts can plug in
//! their own sink.

use tracing::{error, info};

use crate::error::FailureCode;

/// Something worth telling an operator about during an evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyEvent {
    /// The ignore list was rebuilt from configuration.
    IgnoreListBuilt { entries: Vec<String> },

    /// An ignored author suppressed the build.
    AuthorSuppressed { email: String, commit: String },

    /// A non-ignored author permitted the build.
    AuthorPermitted { email: String, commit: String },

    /// No commit was decisive; the configured default applied.
    DefaultApplied { examined: usize, build: bool },

    /// Fetching or parsing failed; the build is allowed anyway.
    FailedOpen { code: FailureCode, message: String },
}

/// Sink for [`PolicyEvent`]s.
pub trait DecisionObserver: Send + Sync {
    fn observe(&self, event: &PolicyEvent);
}

/// Emits events through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl DecisionObserver for TracingObserver {
    fn observe(&self, event: &PolicyEvent) {
        match event {
            PolicyEvent::IgnoreListBuilt { entries } => {
                info!(event = "policy.ignore_list", ignored_authors = ?entries);
            }
            PolicyEvent::AuthorSuppressed { email, commit } => {
                info!(
                    event = "policy.author_suppressed",
                    author = %email,
                    commit = %commit,
                    "change set contains ignored author, build is not required"
                );
            }
            PolicyEvent::AuthorPermitted { email, commit } => {
                info!(
                    event = "policy.author_permitted",
                    author = %email,
                    commit = %commit,
                    "change set contains non-ignored author, build is required"
                );
            }
            PolicyEvent::DefaultApplied { examined, build } => {
                info!(
                    event = "policy.default_applied",
                    examined = examined,
                    build = build,
                    "no decisive commit in change set"
                );
            }
            PolicyEvent::FailedOpen { code, message } => {
                error!(
                    event = "fetch.failed_open",
                    code = %code,
                    error = %message,
                    "evaluation failed, allowing build"
                );
            }
        }
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl DecisionObserver for NoopObserver {
    fn observe(&self, _event: &PolicyEvent) {}
}

/// Span tagging every log line of one evaluation.
pub fn evaluation_span(
    evaluation_id: &str,
    head: &str,
    current: &str,
    previous: &str,
) -> tracing::Span {
    tracing::info_span!(
        "commitgate.evaluation",
        evaluation_id = %evaluation_id,
        head = %head,
        current = %current,
        previous = %previous,
    )
}

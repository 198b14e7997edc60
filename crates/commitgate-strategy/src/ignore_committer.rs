//! Strategy that skips automatic builds for change sets made by ignored authors.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use commitgate_core::{
    evaluation_span, parse_log_bytes, AuthorFilterPolicy, BranchHead, ChangeSetFetcher, Decision,
    DecisionObserver, GateError, PolicyConfig, PolicyEvent, Revision, SourceHandle,
    TracingObserver,
};
use futures::FutureExt;
use tracing::Instrument;
use uuid::Uuid;

use crate::strategy::{BranchBuildStrategy, BuildVerdict, StrategyDescriptor};

/// Ignore committer strategy.
///
/// Opens a view of the source at the current revision, reads the commits
/// since the previous revision and runs [`AuthorFilterPolicy`] over them.
/// Anything that goes wrong before the policy runs allows the build.
pub struct IgnoreCommitterStrategy {
    policy: AuthorFilterPolicy,
    fetcher: Arc<dyn ChangeSetFetcher>,
    observer: Arc<dyn DecisionObserver>,
}

impl IgnoreCommitterStrategy {
    pub const DESCRIPTOR: StrategyDescriptor = StrategyDescriptor {
        id: "ignore_committer",
        display_name: "Ignore Committer Strategy",
    };

    /// Create a strategy logging through `tracing`.
    pub fn new(config: PolicyConfig, fetcher: Arc<dyn ChangeSetFetcher>) -> Self {
        Self {
            policy: AuthorFilterPolicy::new(config),
            fetcher,
            observer: Arc::new(TracingObserver),
        }
    }

    /// Replace the observability sink.
    pub fn with_observer(mut self, observer: Arc<dyn DecisionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &PolicyConfig {
        self.policy.config()
    }

    /// Comma-separated list of ignored commit authors.
    pub fn ignored_authors(&self) -> &str {
        &self.config().ignored_authors
    }

    /// Whether one non-ignored author is enough to build.
    pub fn allow_build_if_not_excluded_author(&self) -> bool {
        self.config().allow_build_if_not_excluded_author
    }

    async fn try_evaluate(
        &self,
        source: &SourceHandle,
        head: &BranchHead,
        current: &Revision,
        previous: &Revision,
    ) -> commitgate_core::Result<Decision> {
        let view = self
            .fetcher
            .open_view(source, head, current)
            .await?
            .ok_or_else(|| GateError::FetchUnavailable {
                location: source.to_string(),
                revision: current.to_string(),
            })?;

        let raw = view.changes_since(previous).await?;
        let commits = parse_log_bytes(&raw)?;
        Ok(self.policy.evaluate(&commits, self.observer.as_ref()))
    }
}

#[async_trait]
impl BranchBuildStrategy for IgnoreCommitterStrategy {
    fn descriptor(&self) -> StrategyDescriptor {
        Self::DESCRIPTOR
    }

    async fn evaluate(
        &self,
        source: &SourceHandle,
        head: &BranchHead,
        current: &Revision,
        previous: &Revision,
    ) -> BuildVerdict {
        let evaluation_id = Uuid::new_v4().to_string();
        let span = evaluation_span(
            &evaluation_id,
            head.name(),
            current.as_str(),
            previous.as_str(),
        );

        async {
            // host-supplied fetchers may panic; that must not escape the predicate
            let outcome = AssertUnwindSafe(self.try_evaluate(source, head, current, previous))
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| Err(GateError::Panicked(panic_message(payload))));

            match outcome {
                Ok(decision) => BuildVerdict::decided(evaluation_id.clone(), decision),
                Err(e) => {
                    self.observer.observe(&PolicyEvent::FailedOpen {
                        code: e.failure_code(),
                        message: e.to_string(),
                    });
                    BuildVerdict::failed_open(evaluation_id.clone(), &e)
                }
            }
        }
        .instrument(span)
        .await
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

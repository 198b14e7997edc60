//! Branch build strategy contract and verdict types.

use async_trait::async_trait;
use commitgate_core::{BranchHead, Decision, FailureCode, GateError, Reason, Revision, SourceHandle};
use serde::Serialize;

/// Display metadata a host shows for a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StrategyDescriptor {
    /// Stable identifier, matches the `type` tag of [`crate::StrategyKind`].
    pub id: &'static str,

    /// Human-readable name.
    pub display_name: &'static str,
}

/// How a verdict was reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum VerdictOutcome {
    /// The policy ran over the change set.
    Decided { reason: Reason },

    /// The change set could not be obtained; the build is allowed.
    FailedOpen { code: FailureCode, message: String },
}

/// Result of one `is_automatic_build` evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildVerdict {
    /// Correlates the verdict with its log lines.
    pub evaluation_id: String,

    /// Whether the host should build automatically.
    pub build: bool,

    #[serde(flatten)]
    pub outcome: VerdictOutcome,
}

impl BuildVerdict {
    pub fn decided(evaluation_id: impl Into<String>, decision: Decision) -> Self {
        Self {
            evaluation_id: evaluation_id.into(),
            build: decision.build,
            outcome: VerdictOutcome::Decided {
                reason: decision.reason,
            },
        }
    }

    /// Fail open: always `build = true`.
    pub fn failed_open(evaluation_id: impl Into<String>, error: &GateError) -> Self {
        Self {
            evaluation_id: evaluation_id.into(),
            build: true,
            outcome: VerdictOutcome::FailedOpen {
                code: error.failure_code(),
                message: error.to_string(),
            },
        }
    }

    /// Failure code when the verdict failed open.
    pub fn failure(&self) -> Option<FailureCode> {
        match &self.outcome {
            VerdictOutcome::FailedOpen { code, .. } => Some(*code),
            VerdictOutcome::Decided { .. } => None,
        }
    }

    /// Policy reason when the verdict was decided.
    pub fn reason(&self) -> Option<&Reason> {
        match &self.outcome {
            VerdictOutcome::Decided { reason } => Some(reason),
            VerdictOutcome::FailedOpen { .. } => None,
        }
    }
}

/// A predicate deciding whether a branch event triggers an automatic build.
///
/// Implementations never fail: every internal error becomes a verdict.
#[async_trait]
pub trait BranchBuildStrategy: Send + Sync {
    fn descriptor(&self) -> StrategyDescriptor;

    /// Evaluate the change set between `previous` and `current`.
    async fn evaluate(
        &self,
        source: &SourceHandle,
        head: &BranchHead,
        current: &Revision,
        previous: &Revision,
    ) -> BuildVerdict;

    /// Boolean form of [`BranchBuildStrategy::evaluate`].
    async fn is_automatic_build(
        &self,
        source: &SourceHandle,
        head: &BranchHead,
        current: &Revision,
        previous: &Revision,
    ) -> bool {
        self.evaluate(source, head, current, previous).await.build
    }
}

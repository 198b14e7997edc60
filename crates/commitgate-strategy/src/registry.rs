//! Strategy registration table.
//!
//! Each registered strategy is one variant of [`StrategyKind`], tagged by its
//! descriptor id so host configuration can select it:
//!
//! ```json
//! {"type": "ignore_committer", "ignored_authors": "ci@example.com", "allow_build_if_not_excluded_author": false}
//! ```

use std::path::Path;
use std::sync::Arc;

use commitgate_core::{ChangeSetFetcher, PolicyConfig};
use serde::{Deserialize, Serialize};

use crate::ignore_committer::IgnoreCommitterStrategy;
use crate::strategy::{BranchBuildStrategy, StrategyDescriptor};

/// A configured, registered strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategyKind {
    /// Skip builds for change sets made by ignored authors.
    IgnoreCommitter(PolicyConfig),
}

impl StrategyKind {
    pub fn descriptor(&self) -> StrategyDescriptor {
        match self {
            StrategyKind::IgnoreCommitter(_) => IgnoreCommitterStrategy::DESCRIPTOR,
        }
    }

    /// Instantiate the strategy on top of `fetcher`.
    pub fn build(self, fetcher: Arc<dyn ChangeSetFetcher>) -> Box<dyn BranchBuildStrategy> {
        match self {
            StrategyKind::IgnoreCommitter(config) => {
                Box::new(IgnoreCommitterStrategy::new(config, fetcher))
            }
        }
    }

    pub fn from_json(json: &str) -> commitgate_core::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: &Path) -> commitgate_core::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}

/// Descriptors of every registered strategy.
pub fn registry() -> Vec<StrategyDescriptor> {
    vec![IgnoreCommitterStrategy::DESCRIPTOR]
}

/// Find a registered strategy by id.
pub fn lookup(id: &str) -> Option<StrategyDescriptor> {
    registry().into_iter().find(|d| d.id == id)
}

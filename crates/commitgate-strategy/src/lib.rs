//! commitgate strategies - automatic build decisions for branch events
//!
//! Provides the host-facing side of commitgate:
//! - `BranchBuildStrategy`: the `is_automatic_build` predicate contract
//! - `IgnoreCommitterStrategy`: author filter over the fetched change set
//! - `StrategyKind` / `registry`: tagged strategy table with display names

pub mod ignore_committer;
pub mod registry;
pub mod strategy;

// Re-export key types
pub use ignore_committer::IgnoreCommitterStrategy;
pub use registry::{lookup, registry, StrategyKind};
pub use strategy::{BranchBuildStrategy, BuildVerdict, StrategyDescriptor, VerdictOutcome};

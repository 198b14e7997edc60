//! commitgate core library
//!
//! Decides whether a change set should trigger an automatic build from the
//! authors of its commits:
//! - `fetch` / `git`: retrieve the raw log between two revisions
//! - `parser`: turn the raw log into [`Commit`] records
//! - `policy`: apply the ignore list and the allow-if-not-excluded mode

pub mod commit;
pub mod error;
pub mod fakes;
pub mod fetch;
pub mod git;
pub mod ignore_list;
pub mod obs;
pub mod parser;
pub mod policy;
pub mod telemetry;

pub use commit::{ChangeSet, Commit};
pub use error::{FailureCode, GateError, Result};
pub use fetch::{BranchHead, ChangeSetFetcher, Revision, RevisionView, SourceHandle, SourceKind};
pub use git::{FetchConfig, GitCliFetcher};
pub use ignore_list::{normalize_email, IgnoreList};
pub use obs::{evaluation_span, DecisionObserver, NoopObserver, PolicyEvent, TracingObserver};
pub use parser::{parse_log, parse_log_bytes, CommitLog};
pub use policy::{
    decide, evaluate, AuthorFilterPolicy, Decision, PolicyConfig, Reason, ALLOW_IF_NOT_EXCLUDED_ENV,
    IGNORED_AUTHORS_ENV,
};
pub use telemetry::init_tracing;

/// commitgate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Change-set retrieval seam.
//!
//! A [`ChangeSetFetcher`] opens a read-only [`RevisionView`] of a source at
//! the current revision; the view then yields the raw log of everything
//! reachable from that revision but not from the previous one. The git
//! implementation lives in [`crate::git`], an in-memory one in
//! [`crate::fakes`].

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Kind of source a handle points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Git,
    Other(String),
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Git => f.write_str("git"),
            SourceKind::Other(kind) => f.write_str(kind),
        }
    }
}

/// Opaque handle to a source the host wants evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceHandle {
    pub kind: SourceKind,

    /// Where the source lives (a repository path for git).
    pub location: String,
}

impl SourceHandle {
    pub fn new(kind: SourceKind, location: impl Into<String>) -> Self {
        Self {
            kind,
            location: location.into(),
        }
    }

    pub fn git(location: impl Into<String>) -> Self {
        Self::new(SourceKind::Git, location)
    }

    pub fn is_git(&self) -> bool {
        self.kind == SourceKind::Git
    }
}

impl fmt::Display for SourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.location)
    }
}

/// Branch the change set belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BranchHead(pub String);

impl BranchHead {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BranchHead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque revision marker (usually a commit hash).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Revision(pub String);

impl Revision {
    pub fn new(rev: impl Into<String>) -> Self {
        Self(rev.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opens views of a source bound to a revision.
#[async_trait]
pub trait ChangeSetFetcher: Send + Sync {
    /// Open a view of `source` at `current`.
    ///
    /// Returns `Ok(None)` when the source cannot produce one (unsupported
    /// kind, not a repository, unknown revision). Transport problems are
    /// errors.
    async fn open_view(
        &self,
        source: &SourceHandle,
        head: &BranchHead,
        current: &Revision,
    ) -> Result<Option<Box<dyn RevisionView>>>;
}

/// Read-only view of a source at one revision.
#[async_trait]
pub trait RevisionView: Send + Sync {
    /// Raw log of the commits reachable from the view's revision but not from `previous`.
    async fn changes_since(&self, previous: &Revision) -> Result<Vec<u8>>;
}

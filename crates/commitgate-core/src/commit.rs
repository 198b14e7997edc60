//! Commit records extracted from a raw change log.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::ignore_list::normalize_email;

/// One commit of a change set.
///
/// `author_email` is kept exactly as it appeared between `<` and `>` in the
/// `author` header. Normalization only happens when comparing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Opaque revision id.
    pub id: String,

    /// Author display name (may be empty).
    pub author_name: String,

    /// Author email, verbatim.
    pub author_email: String,

    /// Author timestamp, when the header carried one.
    pub authored_at: Option<DateTime<FixedOffset>>,

    /// Committer email, when a `committer` header was present.
    pub committer_email: Option<String>,

    /// Parent revision ids in header order.
    pub parents: Vec<String>,

    /// Message body with the log indentation removed.
    pub message: String,
}

impl Commit {
    /// Author email trimmed and lower-cased.
    pub fn normalized_author_email(&self) -> String {
        normalize_email(&self.author_email)
    }

    /// First line of the message.
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }

    /// Short form of the id (first 12 chars).
    pub fn short_id(&self) -> &str {
        match self.id.char_indices().nth(12) {
            Some((idx, _)) => &self.id[..idx],
            None => &self.id,
        }
    }
}

/// Commits introduced between two revisions, in log order.
pub type ChangeSet = Vec<Commit>;

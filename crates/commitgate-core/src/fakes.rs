//! In-memory fakes (testing and embedding hosts)
//!
//! Provides `MemoryFetcher` and `RecordingObserver` that satisfy the trait
//! contracts without touching a repository, plus builders for raw log blocks.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::commit::Commit;
use crate::error::{GateError, Result};
use crate::fetch::{BranchHead, ChangeSetFetcher, Revision, RevisionView, SourceHandle};
use crate::obs::{DecisionObserver, PolicyEvent};

// ---------------------------------------------------------------------------
// MemoryFetcher
// ---------------------------------------------------------------------------

/// What a [`MemoryFetcher`] answers with.
#[derive(Debug, Clone)]
pub enum FakeLog {
    /// `changes_since` returns these bytes.
    Log(Vec<u8>),
    /// `open_view` returns no view.
    NoView,
    /// `open_view` fails.
    OpenFails(String),
    /// `changes_since` fails.
    ChangesFail(String),
}

/// One call seen by a [`MemoryFetcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub source: SourceHandle,
    pub head: BranchHead,
    pub current: Revision,
    pub previous: Option<Revision>,
}

/// Fetcher answering every request with the same canned log.
#[derive(Debug)]
pub struct MemoryFetcher {
    log: FakeLog,
    requests: Arc<Mutex<Vec<FetchRequest>>>,
}

impl MemoryFetcher {
    pub fn new(log: FakeLog) -> Self {
        Self {
            log,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_log(raw: impl Into<Vec<u8>>) -> Self {
        Self::new(FakeLog::Log(raw.into()))
    }

    pub fn no_view() -> Self {
        Self::new(FakeLog::NoView)
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self::new(FakeLog::ChangesFail(message.into()))
    }

    /// Requests seen so far, `previous` filled in once `changes_since` ran.
    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChangeSetFetcher for MemoryFetcher {
    async fn open_view(
        &self,
        source: &SourceHandle,
        head: &BranchHead,
        current: &Revision,
    ) -> Result<Option<Box<dyn RevisionView>>> {
        let index = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(FetchRequest {
                source: source.clone(),
                head: head.clone(),
                current: current.clone(),
                previous: None,
            });
            requests.len() - 1
        };

        let result = match &self.log {
            FakeLog::NoView => return Ok(None),
            FakeLog::OpenFails(message) => return Err(GateError::Fetch(message.clone())),
            FakeLog::Log(raw) => Ok(raw.clone()),
            FakeLog::ChangesFail(message) => Err(message.clone()),
        };

        let view: Box<dyn RevisionView> = Box::new(MemoryView {
            result,
            index,
            requests: Arc::clone(&self.requests),
        });
        Ok(Some(view))
    }
}

struct MemoryView {
    result: std::result::Result<Vec<u8>, String>,
    index: usize,
    requests: Arc<Mutex<Vec<FetchRequest>>>,
}

#[async_trait]
impl RevisionView for MemoryView {
    async fn changes_since(&self, previous: &Revision) -> Result<Vec<u8>> {
        if let Some(request) = self.requests.lock().unwrap().get_mut(self.index) {
            request.previous = Some(previous.clone());
        }
        self.result.clone().map_err(GateError::Fetch)
    }
}

// ---------------------------------------------------------------------------
// RecordingObserver
// ---------------------------------------------------------------------------

/// Observer that keeps every event in order.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<PolicyEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PolicyEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl DecisionObserver for RecordingObserver {
    fn observe(&self, event: &PolicyEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

// ---------------------------------------------------------------------------
// Log builders
// ---------------------------------------------------------------------------

const SAMPLE_MESSAGE: [&str; 13] = [
    "    [task] Updated version.",
    "    ",
    "    Including earlier updates.",
    "    ",
    "    Changes in this version:",
    "    - Changed to take the gerrit url from gerrit query command.",
    "    - Aligned reason information with our new commit hooks",
    "    ",
    "    Change-Id: Ife96d2abed5b066d9620034bec5f04cf74b8c66d",
    "    Reviewed-on: https://gerrit.e.se/12345",
    "    Tested-by: Jenkins <jenkins@no-mail.com>",
    "    Reviewed-by: Mister Another <mister.another@ericsson.com>",
    "",
];

fn block(id: &str, author_tag: &str, author_email: &str) -> String {
    let mut lines = vec![
        format!("commit {id}"),
        format!("{author_tag} John Galt<{author_email}> 1363879004 +0100"),
        String::new(),
    ];
    lines.extend(SAMPLE_MESSAGE.iter().map(|l| l.to_string()));
    lines.join("\n")
}

/// A well-formed raw log block authored by `author_email`.
pub fn sample_commit_block(id: &str, author_email: &str) -> String {
    block(id, "author", author_email)
}

/// A raw log block whose author tag is misspelled (`Authorzzz`).
pub fn broken_commit_block(id: &str, author_email: &str) -> String {
    block(id, "Authorzzz", author_email)
}

/// A commit record authored by `author_email`.
pub fn commit_by(id: &str, author_email: &str) -> Commit {
    Commit {
        id: id.to_string(),
        author_name: "John Galt".to_string(),
        author_email: author_email.to_string(),
        authored_at: None,
        committer_email: None,
        parents: Vec::new(),
        message: String::new(),
    }
}

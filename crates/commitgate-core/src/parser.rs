//! Raw change log parser.
//!
//! Reads the layout produced by `git log --format=raw`:
//!
//! ```text
//! commit <id>
//! tree <id>
//! parent <id>
//! author <name> <<email>> <secs> <tz>
//! committer <name> <<email>> <secs> <tz>
//!
//!     message line
//! ```
//!
//! Only `commit` and `author` are required. A block whose headers have no
//! exact, case-sensitive `author` line is dropped rather than reported.

use std::iter::Peekable;
use std::str::Lines;
use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset};
use regex::Regex;
use tracing::debug;

use crate::commit::Commit;
use crate::error::{GateError, Result};

/// Regex for the value of an `author` / `committer` header
/// Format: `<name><<email>> <secs> <tz>`
/// Example: `John Galt<hello@example.com> 1363879004 +0100`
///
/// Groups:
/// 1. name (everything before the first `<`)
/// 2. email (strictly between that `<` and the next `>`)
/// 3. secs (optional unix timestamp)
/// 4. tz (optional `+hhmm` / `-hhmm` offset)
static PERSON_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<name>[^<]*)<(?P<email>[^>]*)>\s*(?:(?P<secs>-?\d+)\s+(?P<tz>[+-]\d{4}))?")
        .expect("Invalid person regex")
});

const MESSAGE_INDENT: &str = "    ";

/// Parse a raw change log into commits, preserving log order.
pub fn parse_log(raw: &str) -> Vec<Commit> {
    CommitLog::new(raw).collect()
}

/// Parse raw change log bytes. Non UTF-8 input is a parse failure.
pub fn parse_log_bytes(raw: &[u8]) -> Result<Vec<Commit>> {
    let text = std::str::from_utf8(raw)
        .map_err(|e| GateError::Parse(format!("change log is not valid UTF-8: {e}")))?;
    Ok(parse_log(text))
}

/// Lazy iterator over the commits of a raw change log.
pub struct CommitLog<'a> {
    lines: Peekable<Lines<'a>>,
}

impl<'a> CommitLog<'a> {
    pub fn new(raw: &'a str) -> Self {
        Self {
            lines: raw.lines().peekable(),
        }
    }

    /// Advance to the next `commit` line and collect the lines up to the one after it.
    fn next_block(&mut self) -> Option<(&'a str, Vec<&'a str>)> {
        let commit_line = loop {
            let line = self.lines.next()?;
            if is_commit_line(line) {
                break line;
            }
        };

        let mut body = Vec::new();
        while let Some(line) = self.lines.next_if(|l| !is_commit_line(l)) {
            body.push(line);
        }
        Some((commit_line, body))
    }
}

impl Iterator for CommitLog<'_> {
    type Item = Commit;

    fn next(&mut self) -> Option<Commit> {
        loop {
            let (commit_line, body) = self.next_block()?;
            match parse_block(commit_line, &body) {
                Some(commit) => return Some(commit),
                None => debug!(
                    event = "log.block_dropped",
                    line = %commit_line,
                    "commit block has no parsable author header"
                ),
            }
        }
    }
}

fn is_commit_line(line: &str) -> bool {
    line == "commit" || line.starts_with("commit ")
}

struct Person {
    name: String,
    email: String,
    when: Option<DateTime<FixedOffset>>,
}

fn parse_block(commit_line: &str, body: &[&str]) -> Option<Commit> {
    let id = commit_line.strip_prefix("commit")?.split_whitespace().next()?;

    let mut author: Option<Person> = None;
    let mut committer_email = None;
    let mut parents = Vec::new();

    let mut lines = body.iter();
    for &line in lines.by_ref() {
        if line.is_empty() {
            break;
        }
        // continuation of a multi-line header (gpgsig, mergetag), including its " " blank lines
        if line.starts_with(' ') {
            continue;
        }
        let (word, rest) = line
            .split_once(char::is_whitespace)
            .unwrap_or((line, ""));
        match word {
            "author" if author.is_none() => author = parse_person(rest),
            "committer" => committer_email = parse_person(rest).map(|p| p.email),
            "parent" => parents.push(rest.trim().to_string()),
            _ => {}
        }
    }

    let mut message: Vec<&str> = lines
        .map(|line| {
            line.strip_prefix(MESSAGE_INDENT)
                .unwrap_or_else(|| line.trim_start())
        })
        .collect();
    while message.last().is_some_and(|l| l.trim().is_empty()) {
        message.pop();
    }

    let author = author?;
    Some(Commit {
        id: id.to_string(),
        author_name: author.name,
        author_email: author.email,
        authored_at: author.when,
        committer_email,
        parents,
        message: message.join("\n"),
    })
}

fn parse_person(value: &str) -> Option<Person> {
    let caps = PERSON_REGEX.captures(value.trim_start())?;
    let when = match (caps.name("secs"), caps.name("tz")) {
        (Some(secs), Some(tz)) => parse_time(secs.as_str(), tz.as_str()),
        _ => None,
    };
    Some(Person {
        name: caps["name"].trim().to_string(),
        email: caps["email"].to_string(),
        when,
    })
}

fn parse_time(secs: &str, tz: &str) -> Option<DateTime<FixedOffset>> {
    let secs: i64 = secs.parse().ok()?;
    let sign = if tz.starts_with('-') { -1 } else { 1 };
    let hours: i32 = tz.get(1..3)?.parse().ok()?;
    let minutes: i32 = tz.get(3..5)?.parse().ok()?;
    let offset = FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))?;
    DateTime::from_timestamp(secs, 0).map(|utc| utc.with_timezone(&offset))
}

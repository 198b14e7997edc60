//! Normalized set of ignored author emails.

use std::collections::BTreeSet;
use std::fmt;

/// Trim and lower-case an email for comparison.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Author emails whose commits do not, on their own, justify a build.
///
/// Built from a comma-separated configuration string. Entries are trimmed and
/// lower-cased. An empty entry (`""`, `"a@x.com,"`) is kept and matches
/// authors recorded with an empty email (`author Bot <> ...`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreList {
    entries: BTreeSet<String>,
}

impl IgnoreList {
    /// Parse a comma-separated list such as `"jenkins@example.com, CI@example.com"`.
    pub fn parse(raw: &str) -> Self {
        let entries = raw
            .split(',')
            .map(normalize_email)
            .collect();
        Self { entries }
    }

    /// Whether `email` (in any case, with any surrounding whitespace) is ignored.
    pub fn contains(&self, email: &str) -> bool {
        self.entries.contains(&normalize_email(email))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}

impl fmt::Display for IgnoreList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<&str> = self.iter().collect();
        write!(f, "[{}]", joined.join(", "))
    }
}

impl<S: AsRef<str>> FromIterator<S> for IgnoreList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let entries = iter
            .into_iter()
            .map(|e| normalize_email(e.as_ref()))
            .collect();
        Self { entries }
    }
}

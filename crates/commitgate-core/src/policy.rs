//! Author filter policy.
//!
//! Walks a change set in log order and lets the first decisive commit decide:
//!
//! | `allow_build_if_not_excluded_author` | ignored author   | other author    | no decisive commit |
//! |--------------------------------------|------------------|-----------------|--------------------|
//! | `false`                              | suppress (stop)  | keep scanning   | build              |
//! | `true`                               | keep scanning    | build (stop)    | suppress           |
//!
//! An empty change set never reaches a decisive commit, so it gets the
//! default column.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::commit::Commit;
use crate::error::{GateError, Result};
use crate::ignore_list::IgnoreList;
use crate::obs::{DecisionObserver, NoopObserver, PolicyEvent};

/// Environment variable holding the comma-separated ignore list.
pub const IGNORED_AUTHORS_ENV: &str = "COMMITGATE_IGNORED_AUTHORS";

/// Environment variable holding the allow-if-not-excluded flag.
pub const ALLOW_IF_NOT_EXCLUDED_ENV: &str = "COMMITGATE_ALLOW_IF_NOT_EXCLUDED";

/// Policy configuration, fixed at construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Comma-separated author emails, any case or spacing.
    pub ignored_authors: String,

    /// Build as soon as one author is not ignored, instead of suppressing
    /// as soon as one author is.
    pub allow_build_if_not_excluded_author: bool,
}

impl PolicyConfig {
    pub fn new(ignored_authors: impl Into<String>, allow_build_if_not_excluded_author: bool) -> Self {
        Self {
            ignored_authors: ignored_authors.into(),
            allow_build_if_not_excluded_author,
        }
    }

    /// Read `COMMITGATE_IGNORED_AUTHORS` and `COMMITGATE_ALLOW_IF_NOT_EXCLUDED`.
    ///
    /// Missing variables fall back to the defaults (empty list, `false`).
    pub fn from_env() -> Result<Self> {
        let ignored_authors = std::env::var(IGNORED_AUTHORS_ENV).unwrap_or_default();
        let allow = match std::env::var(ALLOW_IF_NOT_EXCLUDED_ENV) {
            Ok(value) => parse_flag(&value).ok_or_else(|| {
                GateError::Config(format!(
                    "{ALLOW_IF_NOT_EXCLUDED_ENV} must be a boolean, got {value:?}"
                ))
            })?,
            Err(_) => false,
        };
        Ok(Self::new(ignored_authors, allow))
    }

    /// Load from a JSON document such as
    /// `{"ignored_authors": "ci@example.com", "allow_build_if_not_excluded_author": true}`.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Normalized ignore list, rebuilt on every call.
    pub fn ignore_list(&self) -> IgnoreList {
        IgnoreList::parse(&self.ignored_authors)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// Why a decision came out the way it did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reason {
    /// An ignored author stopped the scan.
    IgnoredAuthor { email: String, commit: String },

    /// A non-ignored author stopped the scan.
    NonIgnoredAuthor { email: String, commit: String },

    /// Every commit was examined without a decisive one.
    Exhausted { examined: usize },
}

/// Outcome of a policy evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub build: bool,
    pub reason: Reason,
}

/// The author filter predicate bound to its configuration.
#[derive(Debug, Clone)]
pub struct AuthorFilterPolicy {
    config: PolicyConfig,
}

impl AuthorFilterPolicy {
    pub fn new(config: PolicyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Rebuild the ignore list and evaluate `commits` against it.
    pub fn evaluate(&self, commits: &[Commit], observer: &dyn DecisionObserver) -> Decision {
        let ignore_list = self.config.ignore_list();
        observer.observe(&PolicyEvent::IgnoreListBuilt {
            entries: ignore_list.iter().map(str::to_string).collect(),
        });
        evaluate(
            commits,
            &ignore_list,
            self.config.allow_build_if_not_excluded_author,
            observer,
        )
    }
}

/// Single pass over `commits`; the first decisive commit wins, otherwise
/// the result is `!allow_if_not_excluded`.
pub fn evaluate(
    commits: &[Commit],
    ignore_list: &IgnoreList,
    allow_if_not_excluded: bool,
    observer: &dyn DecisionObserver,
) -> Decision {
    for commit in commits {
        let email = commit.normalized_author_email();
        let ignored = ignore_list.contains(&email);

        if ignored && !allow_if_not_excluded {
            observer.observe(&PolicyEvent::AuthorSuppressed {
                email: email.clone(),
                commit: commit.id.clone(),
            });
            return Decision {
                build: false,
                reason: Reason::IgnoredAuthor {
                    email,
                    commit: commit.id.clone(),
                },
            };
        }

        if !ignored && allow_if_not_excluded {
            observer.observe(&PolicyEvent::AuthorPermitted {
                email: email.clone(),
                commit: commit.id.clone(),
            });
            return Decision {
                build: true,
                reason: Reason::NonIgnoredAuthor {
                    email,
                    commit: commit.id.clone(),
                },
            };
        }
    }

    let build = !allow_if_not_excluded;
    observer.observe(&PolicyEvent::DefaultApplied {
        examined: commits.len(),
        build,
    });
    Decision {
        build,
        reason: Reason::Exhausted {
            examined: commits.len(),
        },
    }
}

/// Boolean form of [`evaluate`] without observation.
pub fn decide(commits: &[Commit], ignore_list: &IgnoreList, allow_if_not_excluded: bool) -> bool {
    evaluate(commits, ignore_list, allow_if_not_excluded, &NoopObserver).build
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{commit_by, RecordingObserver};

    const IGNORED: [&str; 2] = ["jenkins@example.com", "jenkins-ci@example.com"];
    const NON_IGNORED: [&str; 2] = ["hello@example.com", "john.galt@whois.com"];

    fn ignore_list() -> IgnoreList {
        IgnoreList::parse(&IGNORED.join(","))
    }

    fn commits(emails: &[&str]) -> Vec<Commit> {
        emails
            .iter()
            .enumerate()
            .map(|(i, email)| commit_by(&format!("{i:03}"), email))
            .collect()
    }

    #[test]
    fn test_all_authors_not_ignored_builds() {
        let cs = commits(&NON_IGNORED);
        assert!(decide(&cs, &ignore_list(), false));
    }

    #[test]
    fn test_one_non_ignored_author_builds_when_allowed() {
        let cs = commits(&[IGNORED[0], IGNORED[1], NON_IGNORED[0], NON_IGNORED[1]]);
        let decision = evaluate(&cs, &ignore_list(), true, &NoopObserver);
        assert!(decision.build);
        assert_eq!(
            decision.reason,
            Reason::NonIgnoredAuthor {
                email: "hello@example.com".to_string(),
                commit: "002".to_string(),
            }
        );
    }

    #[test]
    fn test_only_ignored_authors_suppressed_when_allowed() {
        let cs = commits(&IGNORED);
        let decision = evaluate(&cs, &ignore_list(), true, &NoopObserver);
        assert!(!decision.build);
        assert_eq!(decision.reason, Reason::Exhausted { examined: 2 });
    }

    #[test]
    fn test_trailing_ignored_author_suppresses() {
        let cs = commits(&[NON_IGNORED[0], NON_IGNORED[1], IGNORED[0], IGNORED[1]]);
        let decision = evaluate(&cs, &ignore_list(), false, &NoopObserver);
        assert!(!decision.build);
        assert_eq!(
            decision.reason,
            Reason::IgnoredAuthor {
                email: "jenkins@example.com".to_string(),
                commit: "002".to_string(),
            }
        );
    }

    #[test]
    fn test_only_ignored_authors_suppressed_when_not_allowed() {
        let cs = commits(&IGNORED);
        assert!(!decide(&cs, &ignore_list(), false));
    }

    #[test]
    fn test_ignored_author_position_does_not_matter() {
        for position in 0..=NON_IGNORED.len() {
            let mut emails = NON_IGNORED.to_vec();
            emails.insert(position, IGNORED[1]);
            assert!(
                !decide(&commits(&emails), &ignore_list(), false),
                "ignored author at position {position} should suppress"
            );
        }
    }

    #[test]
    fn test_non_ignored_author_position_does_not_matter() {
        for position in 0..=IGNORED.len() {
            let mut emails = IGNORED.to_vec();
            emails.insert(position, NON_IGNORED[0]);
            assert!(
                decide(&commits(&emails), &ignore_list(), true),
                "non-ignored author at position {position} should build"
            );
        }
    }

    #[test]
    fn test_empty_change_set_uses_default() {
        assert!(decide(&[], &ignore_list(), false));
        assert!(!decide(&[], &ignore_list(), true));

        let decision = evaluate(&[], &ignore_list(), true, &NoopObserver);
        assert_eq!(decision.reason, Reason::Exhausted { examined: 0 });
    }

    #[test]
    fn test_matching_is_case_and_trim_insensitive() {
        let cs = commits(&["Jenkins@Example.com "]);
        let list = IgnoreList::parse("jenkins@example.com");
        assert!(!decide(&cs, &list, false));
    }

    #[test]
    fn test_empty_setting_ignores_no_real_author() {
        let cs = commits(&NON_IGNORED);
        let list = IgnoreList::parse("");
        assert!(decide(&cs, &list, false));
        assert!(decide(&cs, &list, true));
    }

    #[test]
    fn test_trailing_comma_ignores_empty_author_email() {
        let cs = commits(&[""]);
        let list = IgnoreList::parse("jenkins@example.com,");
        assert!(!decide(&cs, &list, false));
        assert!(!decide(&cs, &list, true));

        let list = IgnoreList::parse("jenkins@example.com");
        assert!(decide(&cs, &list, false));
    }

    #[test]
    fn test_first_decisive_commit_short_circuits() {
        let cs = commits(&[IGNORED[0], IGNORED[1]]);
        let observer = RecordingObserver::new();
        evaluate(&cs, &ignore_list(), false, &observer);
        assert_eq!(
            observer.events(),
            vec![PolicyEvent::AuthorSuppressed {
                email: "jenkins@example.com".to_string(),
                commit: "000".to_string(),
            }]
        );
    }

    #[test]
    fn test_policy_rebuilds_ignore_list_and_observes() {
        let policy = AuthorFilterPolicy::new(PolicyConfig::new(" JENKINS@example.com ,", true));
        let observer = RecordingObserver::new();
        let decision = policy.evaluate(&commits(&IGNORED), &observer);
        assert!(decision.build);

        let events = observer.events();
        assert_eq!(
            events[0],
            PolicyEvent::IgnoreListBuilt {
                entries: vec![String::new(), "jenkins@example.com".to_string()],
            }
        );
        // jenkins-ci is not in this list, so it permits the build
        assert!(matches!(events[1], PolicyEvent::AuthorPermitted { .. }));
    }

    #[test]
    fn test_policy_config_json_round_trip() {
        let config = PolicyConfig::new("jenkins@example.com", true);
        let json = serde_json::to_string(&config).unwrap();
        let back: PolicyConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_policy_config_json_defaults() {
        let config: PolicyConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, PolicyConfig::default());
        assert!(!config.allow_build_if_not_excluded_author);
    }

    #[test]
    fn test_policy_config_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.json");
        std::fs::write(
            &path,
            r#"{"ignored_authors": "ci@example.com", "allow_build_if_not_excluded_author": true}"#,
        )
        .unwrap();

        let config = PolicyConfig::from_json_file(&path).unwrap();
        assert_eq!(config.ignored_authors, "ci@example.com");
        assert!(config.allow_build_if_not_excluded_author);

        let missing = PolicyConfig::from_json_file(&dir.path().join("missing.json"));
        assert!(matches!(missing, Err(GateError::Io(_))));
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" 1 "), Some(true));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag(""), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}

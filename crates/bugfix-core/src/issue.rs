use crate::error::{BugfixError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// IssueKind
// ---------------------------------------------------------------------------

/// Tracker project an issue belongs to. Request and creation issues share one
/// numeric id space and differ only by prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    Request,
    Creation,
}

impl IssueKind {
    pub fn prefix(self) -> &'static str {
        match self {
            IssueKind::Request => "CHLRQ",
            IssueKind::Creation => "CHLC",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

// ---------------------------------------------------------------------------
// Issue
// ---------------------------------------------------------------------------

/// A validated tracker issue identifier.
///
/// The canonical id always carries the project prefix, so `"1234"` and
/// `"CHLRQ-1234"` build equal request issues.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Issue {
    pub kind: IssueKind,
    pub number: String,
}

static ISSUE_RE: OnceLock<Regex> = OnceLock::new();

fn issue_re() -> &'static Regex {
    ISSUE_RE.get_or_init(|| Regex::new(r"^(?:([A-Z]+)-)?([0-9]{1,4})$").unwrap())
}

impl Issue {
    pub fn parse(kind: IssueKind, value: &str) -> Result<Self> {
        let invalid = || BugfixError::InvalidIssueId {
            kind,
            value: value.to_string(),
        };
        let caps = issue_re().captures(value.trim()).ok_or_else(invalid)?;
        if let Some(prefix) = caps.get(1) {
            if prefix.as_str() != kind.prefix() {
                return Err(invalid());
            }
        }
        Ok(Self {
            kind,
            number: caps[2].to_string(),
        })
    }

    pub fn request(value: &str) -> Result<Self> {
        Self::parse(IssueKind::Request, value)
    }

    pub fn creation(value: &str) -> Result<Self> {
        Self::parse(IssueKind::Creation, value)
    }

    /// Build an issue from a key the tracker returned, e.g. `CHLC-10234`.
    /// Stored keys are not bound by the input length rule, so any digit run
    /// is accepted. `None` when the prefix differs or the number is missing.
    pub fn from_tracker_key(kind: IssueKind, key: &str) -> Option<Self> {
        let number = key.strip_prefix(kind.prefix())?.strip_prefix('-')?;
        if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(Self {
            kind,
            number: number.to_string(),
        })
    }

    pub fn id(&self) -> String {
        format!("{}-{}", self.kind.prefix(), self.number)
    }

    /// Tracker REST path for the issue, relative to the API base.
    pub fn endpoint(&self) -> String {
        format!("issue/{}", self.id())
    }

    pub fn transitions_endpoint(&self) -> String {
        format!("{}/transitions", self.endpoint())
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.kind.prefix(), self.number)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

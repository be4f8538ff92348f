use crate::issue::IssueKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BugfixError {
    #[error("not initialized: run 'bugfix init'")]
    NotInitialized,

    #[error("invalid {kind} issue id '{value}': expected '{kind}-<digits>' or '<digits>' (1-4 digits)")]
    InvalidIssueId { kind: IssueKind, value: String },

    #[error("checkout of branch '{branch}' failed: {reason}")]
    CheckoutFailed { branch: String, reason: String },

    #[error("merge conflict applying {commit}")]
    MergeConflict { commit: String, files: Vec<String> },

    #[error("no changes staged for commit")]
    NoChangesToCommit,

    #[error("could not continue {operation}: {reason}")]
    ContinueFailed { operation: String, reason: String },

    #[error("no fix version found for {year} {month}")]
    UnresolvedFixVersion { year: i32, month: String },

    #[error("remote transition failed ({status}): {reason}")]
    RemoteTransitionFailed { status: u16, reason: String },

    #[error("run aborted by operator at branch '{branch}'")]
    RunAborted { branch: String },

    #[error("git error: {0}")]
    Git(String),

    #[error("editor error: {0}")]
    Editor(String),

    #[error("tracker error: {0}")]
    Tracker(String),

    #[error("home directory not found: set HOME environment variable")]
    HomeNotFound,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, BugfixError>;

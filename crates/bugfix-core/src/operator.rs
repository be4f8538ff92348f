//! The operator port: every prompt and every progress notice the core emits.
//!
//! The orchestrator, the cherry-pick engine and the transition state machine
//! never touch stdin/stdout themselves. The CLI implements [`Operator`] for a
//! terminal; tests implement it with a script.

use crate::cherry_pick::BranchOutcome;
use crate::transition::{Sequence, StepReport};
use thiserror::Error;

/// The operator interrupted a prompt (Ctrl-C or end of input).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("interrupted by operator")]
pub struct Interrupted;

pub type Prompt<T> = std::result::Result<T, Interrupted>;

pub trait Operator {
    /// Ask for a branch to fix. `first` is true for the opening prompt;
    /// later prompts accept an empty answer, returned as `None`.
    fn select_branch(&mut self, candidates: &[String], first: bool) -> Prompt<Option<String>>;

    fn confirm(&mut self, question: &str, default: bool) -> Prompt<bool>;

    fn read_text(&mut self, label: &str) -> Prompt<String>;

    /// Block until the operator signals they are done.
    fn pause(&mut self, message: &str) -> Prompt<()>;

    fn notify(&mut self, event: &Event);
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    UnknownBranch {
        branch: String,
        suggestions: Vec<String>,
    },
    MakeFix {
        branch: String,
    },
    BlankDescription,
    NoChangesMade {
        branch: String,
    },
    FixCommitted {
        branch: String,
        message: String,
    },
    FixAborted {
        branch: String,
        reason: String,
    },
    EditorFailed {
        reason: String,
    },
    PropagationStarted {
        commit: String,
        total: usize,
    },
    /// The fix was committed but its commit id could not be read.
    PropagationUnavailable {
        branch: String,
        reason: String,
    },
    CheckoutFailed {
        branch: String,
        reason: String,
    },
    ApplyFailed {
        branch: String,
        reason: String,
    },
    MergeConflict {
        branch: String,
        files: Vec<String>,
    },
    BranchComplete {
        branch: String,
        index: usize,
        total: usize,
        outcome: BranchOutcome,
    },
    TransitioningIssue {
        issue: String,
    },
    CreationIssuesSelected {
        count: usize,
    },
    LinkedLookupFailed {
        reason: String,
    },
    Step(StepReport),
    SequenceSkipped {
        sequence: Sequence,
    },
}

/// Percentage of a propagation finished after the branch at `index`.
pub fn percent_complete(index: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    (index + 1) as f64 * 100.0 / total as f64
}

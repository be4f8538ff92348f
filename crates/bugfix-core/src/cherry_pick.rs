//! Propagation of one commit across a set of branches.
//!
//! Branches are processed strictly one at a time. Every branch handed to
//! [`CherryPickEngine::propagate`] ends with exactly one [`BranchOutcome`]
//! unless the operator aborts the run, which surfaces as
//! [`BugfixError::RunAborted`]. There is no rollback: a run that stops part
//! way leaves the earlier branches applied.

use crate::error::{BugfixError, Result};
use crate::operator::{percent_complete, Event, Operator};
use crate::vcs::Vcs;
use serde::Serialize;
use tracing::{info, warn};

/// Message of the commit recorded when a conflicted branch cannot be continued.
pub const EMPTY_COMMIT_MESSAGE: &str = "Empty Commit";

// ---------------------------------------------------------------------------
// ApplyMode
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyMode {
    CherryPick,
    Revert,
}

impl ApplyMode {
    pub fn label(self) -> &'static str {
        match self {
            ApplyMode::CherryPick => "cherry-pick",
            ApplyMode::Revert => "revert",
        }
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BranchOutcome {
    /// Applied without conflicts.
    Applied,
    /// Conflicts were resolved by the operator and the operation continued.
    ResolvedConflict,
    /// The operation could not be continued; an empty commit was recorded.
    EmptyCommit { reason: String },
    Skipped { reason: String },
}

impl BranchOutcome {
    /// Everything except a skip leaves the branch in a finished state.
    pub fn is_complete(&self) -> bool {
        !matches!(self, BranchOutcome::Skipped { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BranchReport {
    pub branch: String,
    #[serde(flatten)]
    pub outcome: BranchOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropagationReport {
    pub commit: String,
    pub mode: ApplyMode,
    pub branches: Vec<BranchReport>,
}

impl PropagationReport {
    pub fn outcome(&self, branch: &str) -> Option<&BranchOutcome> {
        self.branches
            .iter()
            .find(|r| r.branch == branch)
            .map(|r| &r.outcome)
    }

    pub fn completed(&self) -> usize {
        self.branches.iter().filter(|r| r.outcome.is_complete()).count()
    }

    pub fn skipped(&self) -> usize {
        self.branches.len() - self.completed()
    }
}

// ---------------------------------------------------------------------------
// CherryPickEngine
// ---------------------------------------------------------------------------

pub struct CherryPickEngine<'a> {
    vcs: &'a mut dyn Vcs,
    operator: &'a mut dyn Operator,
    mode: ApplyMode,
}

impl<'a> CherryPickEngine<'a> {
    pub fn new(vcs: &'a mut dyn Vcs, operator: &'a mut dyn Operator, mode: ApplyMode) -> Self {
        Self {
            vcs,
            operator,
            mode,
        }
    }

    /// Apply `commit` to each branch in order.
    pub fn propagate(&mut self, commit: &str, branches: &[String]) -> Result<PropagationReport> {
        let total = branches.len();
        info!(commit, total, mode = self.mode.label(), "propagating commit");
        self.operator.notify(&Event::PropagationStarted {
            commit: commit.to_string(),
            total,
        });

        let mut reports = Vec::with_capacity(total);
        for (index, branch) in branches.iter().enumerate() {
            let outcome = self.apply_to(commit, branch)?;
            info!(
                branch = branch.as_str(),
                percent = percent_complete(index, total),
                ?outcome,
                "branch finished"
            );
            self.operator.notify(&Event::BranchComplete {
                branch: branch.clone(),
                index,
                total,
                outcome: outcome.clone(),
            });
            reports.push(BranchReport {
                branch: branch.clone(),
                outcome,
            });
        }

        Ok(PropagationReport {
            commit: commit.to_string(),
            mode: self.mode,
            branches: reports,
        })
    }

    fn apply_to(&mut self, commit: &str, branch: &str) -> Result<BranchOutcome> {
        if let Err(e) = self.vcs.checkout(branch) {
            warn!(branch, error = %e, "checkout failed");
            self.operator.notify(&Event::CheckoutFailed {
                branch: branch.to_string(),
                reason: e.to_string(),
            });
            return self.skip_or_abort(branch, e.to_string());
        }

        let applied = match self.mode {
            ApplyMode::CherryPick => self.vcs.cherry_pick(commit),
            ApplyMode::Revert => self.vcs.revert(commit),
        };
        match applied {
            Ok(()) => Ok(BranchOutcome::Applied),
            Err(BugfixError::MergeConflict { files, .. }) => self.resolve_conflict(branch, files),
            Err(e) => {
                warn!(branch, error = %e, "apply failed");
                self.operator.notify(&Event::ApplyFailed {
                    branch: branch.to_string(),
                    reason: e.to_string(),
                });
                self.skip_or_abort(branch, e.to_string())
            }
        }
    }

    fn resolve_conflict(&mut self, branch: &str, files: Vec<String>) -> Result<BranchOutcome> {
        warn!(branch, ?files, "merge conflict");
        self.operator.notify(&Event::MergeConflict {
            branch: branch.to_string(),
            files,
        });
        if let Err(e) = self.vcs.open_in_editor() {
            self.operator.notify(&Event::EditorFailed {
                reason: e.to_string(),
            });
        }
        // An interrupt here still means the operator is finished resolving.
        let _ = self
            .operator
            .pause(&format!("Resolve the conflicts on {branch}, then press Enter"));

        let continued = self.vcs.stage_all().and_then(|()| match self.mode {
            ApplyMode::CherryPick => self.vcs.continue_cherry_pick(),
            ApplyMode::Revert => self.vcs.continue_revert(),
        });
        let reason = match continued {
            Ok(()) => return Ok(BranchOutcome::ResolvedConflict),
            Err(e) => e.to_string(),
        };

        info!(branch, reason = reason.as_str(), "recording empty commit");
        match self.vcs.commit_allow_empty(EMPTY_COMMIT_MESSAGE) {
            Ok(()) => Ok(BranchOutcome::EmptyCommit { reason }),
            Err(e) => {
                self.operator.notify(&Event::ApplyFailed {
                    branch: branch.to_string(),
                    reason: e.to_string(),
                });
                self.skip_or_abort(branch, e.to_string())
            }
        }
    }

    fn skip_or_abort(&mut self, branch: &str, reason: String) -> Result<BranchOutcome> {
        let question = format!("Skip {branch} and continue with the remaining branches?");
        match self.operator.confirm(&question, true) {
            Ok(true) => Ok(BranchOutcome::Skipped { reason }),
            Ok(false) | Err(_) => Err(BugfixError::RunAborted {
                branch: branch.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! The branch-fix loop over one repository.
//!
//! ```text
//! AwaitingBranchSelection -> ApplyingFix -> CommittingFix -> [CherryPicking]
//!          ^                                                        |
//!          +--------------------------------------------------------+
//! AwaitingBranchSelection -> Done   (empty branch name or interrupt)
//! ```
//!
//! A branch that was fixed is dropped from the candidates, so it is never
//! offered again and never receives its own fix through propagation. An
//! interrupt or VCS failure while applying or committing abandons only the
//! current branch.

use crate::cherry_pick::{ApplyMode, CherryPickEngine, PropagationReport};
use crate::error::{BugfixError, Result};
use crate::issue::Issue;
use crate::operator::{Event, Interrupted, Operator};
use crate::repository::Repository;
use crate::vcs::Vcs;
use serde::Serialize;
use tracing::{info, warn};

/// Stored in place of a description that was a single space.
pub const BLANK_DESCRIPTION: &str = "-";

// ---------------------------------------------------------------------------
// FixResult
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixResult {
    pub fix_messages: Vec<String>,
    pub cherry_picked: bool,
    pub chunk_fix_required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub propagation: Option<PropagationReport>,
}

impl FixResult {
    /// Fix messages joined by newlines with `-` placeholders left out.
    pub fn combined_message(&self) -> String {
        combine_messages(&self.fix_messages)
    }

    /// Manual tasks left for the operator once the run is over.
    pub fn follow_up_tasks(&self) -> Vec<&'static str> {
        let mut tasks = vec!["Update CMS branches to latest"];
        if self.chunk_fix_required {
            tasks.push("Commit added or removed lines and make sure chunks are correct");
        }
        tasks
    }
}

pub fn combine_messages(messages: &[String]) -> String {
    messages
        .iter()
        .filter(|m| m.as_str() != BLANK_DESCRIPTION)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Normalize a typed fix description. `None` means the operator must try again.
pub fn normalize_description(input: &str) -> Option<String> {
    if input == " " {
        return Some(BLANK_DESCRIPTION.to_string());
    }
    let trimmed = input.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

// ---------------------------------------------------------------------------
// FixState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum FixState {
    AwaitingBranchSelection,
    ApplyingFix { branch: String },
    CommittingFix { branch: String, description: String },
    CherryPicking { commit: String },
    Done,
}

/// Why work on a single branch stopped.
enum BranchAbort {
    Interrupted,
    Vcs(BugfixError),
}

impl From<Interrupted> for BranchAbort {
    fn from(_: Interrupted) -> Self {
        BranchAbort::Interrupted
    }
}

impl From<BugfixError> for BranchAbort {
    fn from(e: BugfixError) -> Self {
        BranchAbort::Vcs(e)
    }
}

impl BranchAbort {
    fn reason(&self) -> String {
        match self {
            BranchAbort::Interrupted => "interrupted".to_string(),
            BranchAbort::Vcs(e) => e.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// FixBranches
// ---------------------------------------------------------------------------

pub struct FixBranches<'a> {
    repo: &'a mut Repository,
    vcs: &'a mut dyn Vcs,
    operator: &'a mut dyn Operator,
    request: &'a Issue,
    candidates: Vec<String>,
    propagation: Option<PropagationReport>,
}

impl<'a> FixBranches<'a> {
    pub fn new(
        repo: &'a mut Repository,
        vcs: &'a mut dyn Vcs,
        operator: &'a mut dyn Operator,
        request: &'a Issue,
    ) -> Self {
        let candidates = repo.branches.clone();
        Self {
            repo,
            vcs,
            operator,
            request,
            candidates,
            propagation: None,
        }
    }

    /// Drive the loop until the operator is done. Only an aborted
    /// propagation ends the run with an error.
    pub fn run(mut self, chunk_fix_required: bool) -> Result<FixResult> {
        let mut state = FixState::AwaitingBranchSelection;
        let mut first = true;

        while state != FixState::Done {
            state = match state {
                FixState::AwaitingBranchSelection => {
                    let next = self.select_branch(first);
                    if matches!(next, FixState::ApplyingFix { .. }) {
                        first = false;
                    }
                    next
                }
                FixState::ApplyingFix { branch } => match self.apply_fix(&branch) {
                    Ok(description) => FixState::CommittingFix {
                        branch,
                        description,
                    },
                    Err(abort) => self.abort_branch(&branch, abort),
                },
                FixState::CommittingFix {
                    branch,
                    description,
                } => match self.commit_fix(&branch, &description) {
                    Ok(next) => next,
                    Err(abort) => self.abort_branch(&branch, abort),
                },
                FixState::CherryPicking { commit } => {
                    self.cherry_pick(&commit)?;
                    FixState::AwaitingBranchSelection
                }
                FixState::Done => FixState::Done,
            };
        }

        Ok(FixResult {
            fix_messages: self.repo.fix_messages.clone(),
            cherry_picked: self.repo.cherry_picked,
            chunk_fix_required,
            propagation: self.propagation,
        })
    }

    fn select_branch(&mut self, first: bool) -> FixState {
        let choice = match self.operator.select_branch(&self.candidates, first) {
            Ok(choice) => choice,
            Err(Interrupted) => return FixState::Done,
        };
        let branch = match choice.map(|b| b.trim().to_string()) {
            Some(b) if !b.is_empty() => b,
            _ => return FixState::Done,
        };

        if !self.candidates.contains(&branch) {
            let suggestions = if branch == self.repo.secure_branch() && !self.repo.is_full_app() {
                self.repo.minified_secure_branches()
            } else {
                Vec::new()
            };
            self.operator.notify(&Event::UnknownBranch {
                branch,
                suggestions,
            });
            return FixState::AwaitingBranchSelection;
        }
        FixState::ApplyingFix { branch }
    }

    fn apply_fix(&mut self, branch: &str) -> std::result::Result<String, BranchAbort> {
        self.vcs.checkout(branch)?;
        self.repo.current_branch = Some(branch.to_string());
        info!(branch, "applying fix");

        self.operator.notify(&Event::MakeFix {
            branch: branch.to_string(),
        });
        if let Err(e) = self.vcs.open_in_editor() {
            warn!(error = %e, "could not open editor");
            self.operator.notify(&Event::EditorFailed {
                reason: e.to_string(),
            });
        }

        loop {
            let input = self.operator.read_text("Fix description")?;
            match normalize_description(&input) {
                Some(description) => return Ok(description),
                None => self.operator.notify(&Event::BlankDescription),
            }
        }
    }

    fn commit_fix(
        &mut self,
        branch: &str,
        description: &str,
    ) -> std::result::Result<FixState, BranchAbort> {
        let message = format!("{}: {}", self.request.id(), description);
        loop {
            match self.vcs.stage_and_commit(&message) {
                Ok(()) => break,
                Err(BugfixError::NoChangesToCommit) => {
                    self.operator.notify(&Event::NoChangesMade {
                        branch: branch.to_string(),
                    });
                    self.operator
                        .pause(&format!("Make the fix on {branch}, then press Enter"))?;
                }
                Err(e) => return Err(e.into()),
            }
        }

        info!(branch, message = message.as_str(), "fix committed");
        self.repo.fix_messages.push(description.to_string());
        self.candidates.retain(|b| b != branch);
        self.operator.notify(&Event::FixCommitted {
            branch: branch.to_string(),
            message,
        });

        if self.repo.is_full_app() && branch == self.repo.secure_branch() {
            match self.vcs.head_commit_id() {
                Ok(commit) => return Ok(FixState::CherryPicking { commit }),
                Err(e) => {
                    warn!(branch, error = %e, "fix committed but not propagated");
                    self.operator.notify(&Event::PropagationUnavailable {
                        branch: branch.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        Ok(FixState::AwaitingBranchSelection)
    }

    fn cherry_pick(&mut self, commit: &str) -> Result<()> {
        let targets = self.candidates.clone();
        let mut engine =
            CherryPickEngine::new(&mut *self.vcs, &mut *self.operator, ApplyMode::CherryPick);
        let report = engine.propagate(commit, &targets)?;
        self.repo.cherry_picked = true;
        self.propagation = Some(report);
        Ok(())
    }

    fn abort_branch(&mut self, branch: &str, abort: BranchAbort) -> FixState {
        warn!(branch, reason = abort.reason().as_str(), "fix aborted");
        self.operator.notify(&Event::FixAborted {
            branch: branch.to_string(),
            reason: abort.reason(),
        });
        FixState::AwaitingBranchSelection
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Issue-transition state machine.
//!
//! A run resolves the current fix version first; without one nothing is sent.
//! The request issue then moves Planned, In Progress, Closed, and every
//! selected creation issue moves Feedback Open, Feedback Review and is handed
//! to the reviewer. A failing step is recorded and the run moves on to the
//! next step. Each of the two sequences is gated by an operator confirmation.

use crate::config::TransitionIds;
use crate::error::{BugfixError, Result};
use crate::fix_branches::FixResult;
use crate::fix_version::{self, FixVersion};
use crate::issue::Issue;
use crate::operator::{Event, Operator};
use crate::tracker::{IssueTracker, TransitionRequest};
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// Steps and reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionStep {
    Planned,
    InProgress,
    Closed,
    FeedbackOpen,
    FeedbackReview,
    AssignReviewer,
}

impl fmt::Display for TransitionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransitionStep::Planned => "Planned",
            TransitionStep::InProgress => "In Progress",
            TransitionStep::Closed => "Closed",
            TransitionStep::FeedbackOpen => "Feedback Open",
            TransitionStep::FeedbackReview => "Feedback Review",
            TransitionStep::AssignReviewer => "Assign Reviewer",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepStatus {
    Complete,
    /// `http_status` is absent when the call never produced a response.
    Failed {
        http_status: Option<u16>,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepReport {
    pub issue: String,
    pub step: TransitionStep,
    #[serde(flatten)]
    pub status: StepStatus,
}

impl StepReport {
    pub fn is_complete(&self) -> bool {
        self.status == StepStatus::Complete
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Sequence {
    Request,
    Creation,
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sequence::Request => f.write_str("request"),
            Sequence::Creation => f.write_str("creation"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SequenceReport {
    pub skipped: bool,
    pub steps: Vec<StepReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionReport {
    pub fix_version: FixVersion,
    pub request: SequenceReport,
    pub creation_issues: Vec<String>,
    pub creation: SequenceReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linked_lookup_error: Option<String>,
}

impl TransitionReport {
    pub fn failed_steps(&self) -> usize {
        self.request
            .steps
            .iter()
            .chain(self.creation.steps.iter())
            .filter(|s| !s.is_complete())
            .count()
    }
}

// ---------------------------------------------------------------------------
// TransitionPlan
// ---------------------------------------------------------------------------

/// Which creation issues a run transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreationSelection {
    /// Exactly the supplied issue.
    Single(Issue),
    /// Every creation issue linked to the given application issue.
    LinkedTo(Issue),
}

impl CreationSelection {
    /// A propagated fix touched every content unit of the application, so
    /// all linked issues are transitioned.
    pub fn for_run(creation: Issue, cherry_picked: bool) -> Self {
        if cherry_picked {
            CreationSelection::LinkedTo(creation)
        } else {
            CreationSelection::Single(creation)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionPlan {
    pub request: Issue,
    /// Comment attached when the request issue is closed.
    pub message: String,
    pub creation: CreationSelection,
}

impl TransitionPlan {
    pub fn from_fix(request: Issue, creation: Issue, result: &FixResult) -> Self {
        Self {
            request,
            message: result.combined_message(),
            creation: CreationSelection::for_run(creation, result.cherry_picked),
        }
    }
}

// ---------------------------------------------------------------------------
// IssueTransitioner
// ---------------------------------------------------------------------------

pub struct IssueTransitioner<'a> {
    tracker: &'a dyn IssueTracker,
    operator: &'a mut dyn Operator,
    transitions: &'a TransitionIds,
    reviewer_account_id: &'a str,
    today: NaiveDate,
}

impl<'a> IssueTransitioner<'a> {
    pub fn new(
        tracker: &'a dyn IssueTracker,
        operator: &'a mut dyn Operator,
        transitions: &'a TransitionIds,
        reviewer_account_id: &'a str,
        today: NaiveDate,
    ) -> Self {
        Self {
            tracker,
            operator,
            transitions,
            reviewer_account_id,
            today,
        }
    }

    pub fn run(&mut self, plan: &TransitionPlan) -> Result<TransitionReport> {
        let fix_version = self.current_fix_version()?;
        info!(version = fix_version.name.as_str(), "resolved fix version");

        let request = self.request_sequence(plan, &fix_version);

        let (creation_issues, linked_lookup_error) = self.select_creation_issues(&plan.creation);
        let creation = self.creation_sequence(&plan.request, &creation_issues);

        Ok(TransitionReport {
            fix_version,
            request,
            creation_issues: creation_issues.iter().map(Issue::id).collect(),
            creation,
            linked_lookup_error,
        })
    }

    fn current_fix_version(&self) -> Result<FixVersion> {
        let versions = match self.tracker.fix_versions() {
            Ok(versions) => versions,
            Err(e) => {
                warn!(error = %e, "could not fetch fix versions");
                let (year, month) = fix_version::release_window(self.today);
                return Err(BugfixError::UnresolvedFixVersion { year, month });
            }
        };
        fix_version::resolve(&versions, self.today)
    }

    fn request_sequence(&mut self, plan: &TransitionPlan, version: &FixVersion) -> SequenceReport {
        let issue = &plan.request;
        if !self.confirm_sequence(Sequence::Request, &format!("Transition {issue}?")) {
            return SequenceReport {
                skipped: true,
                steps: Vec::new(),
            };
        }
        self.operator.notify(&Event::TransitioningIssue {
            issue: issue.id(),
        });

        let ids = self.transitions;
        let planned = TransitionRequest::new(&ids.planned).with_fix_version(&version.id);
        let in_progress = TransitionRequest::new(&ids.in_progress);
        let closed = TransitionRequest::new(&ids.closed).with_comment(&plan.message);

        let steps = vec![
            self.step(issue, TransitionStep::Planned, &planned),
            self.step(issue, TransitionStep::InProgress, &in_progress),
            self.step(issue, TransitionStep::Closed, &closed),
        ];
        SequenceReport {
            skipped: false,
            steps,
        }
    }

    fn select_creation_issues(&mut self, selection: &CreationSelection) -> (Vec<Issue>, Option<String>) {
        let (issues, error) = match selection {
            CreationSelection::Single(issue) => (vec![issue.clone()], None),
            CreationSelection::LinkedTo(application) => {
                match self.tracker.linked_creation_issues(application) {
                    Ok(issues) => (issues, None),
                    Err(e) => {
                        warn!(application = %application, error = %e, "linked issue lookup failed");
                        self.operator.notify(&Event::LinkedLookupFailed {
                            reason: e.to_string(),
                        });
                        (Vec::new(), Some(e.to_string()))
                    }
                }
            }
        };
        self.operator.notify(&Event::CreationIssuesSelected {
            count: issues.len(),
        });
        (issues, error)
    }

    fn creation_sequence(&mut self, request: &Issue, issues: &[Issue]) -> SequenceReport {
        if issues.is_empty() {
            return SequenceReport::default();
        }
        let question = format!("Transition {} creation issue(s)?", issues.len());
        if !self.confirm_sequence(Sequence::Creation, &question) {
            return SequenceReport {
                skipped: true,
                steps: Vec::new(),
            };
        }

        let ids = self.transitions;
        let open = TransitionRequest::new(&ids.feedback_open);
        let review = TransitionRequest::new(&ids.feedback_review);
        let mut steps = Vec::with_capacity(issues.len() * 3);
        for issue in issues {
            self.operator.notify(&Event::TransitioningIssue {
                issue: issue.id(),
            });
            steps.push(self.step(issue, TransitionStep::FeedbackOpen, &open));
            steps.push(self.step(issue, TransitionStep::FeedbackReview, &review));

            let assigned =
                self.tracker
                    .assign_and_comment(issue, self.reviewer_account_id, &request.id());
            steps.push(self.record(issue, TransitionStep::AssignReviewer, assigned));
        }
        SequenceReport {
            skipped: false,
            steps,
        }
    }

    /// Yes proceeds; no or an interrupt skips the sequence.
    fn confirm_sequence(&mut self, sequence: Sequence, question: &str) -> bool {
        match self.operator.confirm(question, true) {
            Ok(true) => true,
            Ok(false) | Err(_) => {
                info!(%sequence, "sequence skipped");
                self.operator.notify(&Event::SequenceSkipped { sequence });
                false
            }
        }
    }

    fn step(&mut self, issue: &Issue, step: TransitionStep, request: &TransitionRequest) -> StepReport {
        let result = self.tracker.transition(issue, request);
        self.record(issue, step, result)
    }

    fn record(&mut self, issue: &Issue, step: TransitionStep, result: Result<()>) -> StepReport {
        let status = match result {
            Ok(()) => StepStatus::Complete,
            Err(BugfixError::RemoteTransitionFailed { status, reason }) => StepStatus::Failed {
                http_status: Some(status),
                reason,
            },
            Err(e) => StepStatus::Failed {
                http_status: None,
                reason: e.to_string(),
            },
        };
        if let StepStatus::Failed {
            http_status,
            reason,
        } = &status
        {
            warn!(issue = %issue, %step, ?http_status, reason = reason.as_str(), "transition step failed");
        }
        let report = StepReport {
            issue: issue.id(),
            step,
            status,
        };
        self.operator.notify(&Event::Step(report.clone()));
        report
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

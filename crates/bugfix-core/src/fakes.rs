//! In-memory fakes for the `Vcs`, `Operator` and `IssueTracker` seams (testing only)

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::{BugfixError, Result};
use crate::fix_version::FixVersion;
use crate::issue::Issue;
use crate::operator::{Event, Interrupted, Operator, Prompt};
use crate::tracker::{IssueTracker, TransitionRequest};
use crate::vcs::Vcs;

// ---------------------------------------------------------------------------
// FakeVcs
// ---------------------------------------------------------------------------

/// Working copy double. Every mutating call is appended to `calls`.
#[derive(Debug, Default)]
pub struct FakeVcs {
    pub branches: Vec<String>,
    pub current: Option<String>,
    pub calls: Vec<String>,
    pub checkout_failures: HashSet<String>,
    pub conflicts: HashSet<String>,
    pub apply_errors: HashSet<String>,
    pub continue_fails: bool,
    pub empty_commit_failures: HashSet<String>,
    /// Number of upcoming commits that find nothing staged.
    pub unchanged_commits: usize,
    pub editor_fails: bool,
    pub head_fails: bool,
    commits: usize,
}

impl FakeVcs {
    pub fn new(branches: &[&str]) -> Self {
        Self {
            branches: branches.iter().map(|b| b.to_string()).collect(),
            ..Self::default()
        }
    }

    fn branch(&self) -> String {
        self.current.clone().unwrap_or_default()
    }

    fn new_commit(&mut self) {
        self.commits += 1;
    }

    fn apply(&mut self, verb: &str, commit: &str) -> Result<()> {
        let branch = self.branch();
        self.calls.push(format!("{verb} {commit} on {branch}"));
        if self.conflicts.contains(&branch) {
            return Err(BugfixError::MergeConflict {
                commit: commit.to_string(),
                files: vec!["app.txt".to_string()],
            });
        }
        if self.apply_errors.contains(&branch) {
            return Err(BugfixError::Git(format!("bad object {commit}")));
        }
        self.new_commit();
        Ok(())
    }

    fn continue_operation(&mut self, operation: &str) -> Result<()> {
        self.calls.push(format!("continue {operation}"));
        if self.continue_fails {
            return Err(BugfixError::ContinueFailed {
                operation: operation.to_string(),
                reason: format!("no {operation} in progress"),
            });
        }
        self.new_commit();
        Ok(())
    }

    /// Calls matching `prefix`, in order.
    pub fn calls_starting_with(&self, prefix: &str) -> Vec<String> {
        self.calls
            .iter()
            .filter(|c| c.starts_with(prefix))
            .cloned()
            .collect()
    }
}

impl Vcs for FakeVcs {
    fn list_branches(&self) -> Result<Vec<String>> {
        Ok(self.branches.clone())
    }

    fn checkout(&mut self, branch: &str) -> Result<()> {
        self.calls.push(format!("checkout {branch}"));
        if self.checkout_failures.contains(branch) {
            return Err(BugfixError::CheckoutFailed {
                branch: branch.to_string(),
                reason: "pathspec did not match".to_string(),
            });
        }
        self.current = Some(branch.to_string());
        Ok(())
    }

    fn stage_all(&mut self) -> Result<()> {
        self.calls.push("stage".to_string());
        Ok(())
    }

    fn commit(&mut self, message: &str) -> Result<()> {
        self.calls.push(format!("commit {message}"));
        if self.unchanged_commits > 0 {
            self.unchanged_commits -= 1;
            return Err(BugfixError::NoChangesToCommit);
        }
        self.new_commit();
        Ok(())
    }

    fn commit_allow_empty(&mut self, message: &str) -> Result<()> {
        let branch = self.branch();
        self.calls.push(format!("commit-empty {message} on {branch}"));
        if self.empty_commit_failures.contains(&branch) {
            return Err(BugfixError::Git("unmerged files".to_string()));
        }
        self.new_commit();
        Ok(())
    }

    fn cherry_pick(&mut self, commit: &str) -> Result<()> {
        self.apply("cherry-pick", commit)
    }

    fn continue_cherry_pick(&mut self) -> Result<()> {
        self.continue_operation("cherry-pick")
    }

    fn revert(&mut self, commit: &str) -> Result<()> {
        self.apply("revert", commit)
    }

    fn continue_revert(&mut self) -> Result<()> {
        self.continue_operation("revert")
    }

    fn head_commit_id(&self) -> Result<String> {
        if self.head_fails {
            return Err(BugfixError::Git("bad HEAD".to_string()));
        }
        Ok(format!("c{}", self.commits))
    }

    fn push_all(&mut self) -> Result<()> {
        self.calls.push("push".to_string());
        Ok(())
    }

    fn open_in_editor(&mut self) -> Result<()> {
        self.calls.push("editor".to_string());
        if self.editor_fails {
            return Err(BugfixError::Editor("editor 'code' not found on PATH".to_string()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ScriptedOperator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum Answer {
    Branch(Option<String>),
    Confirm(bool),
    Text(String),
    Continue,
    Interrupt,
}

impl Answer {
    pub fn branch(name: &str) -> Self {
        Answer::Branch(Some(name.to_string()))
    }

    pub fn text(value: &str) -> Self {
        Answer::Text(value.to_string())
    }
}

/// Answers prompts from a fixed script and records every event. Panics when
/// a prompt arrives that the script does not expect.
#[derive(Debug, Default)]
pub struct ScriptedOperator {
    answers: VecDeque<Answer>,
    pub events: Vec<Event>,
    pub prompts: Vec<String>,
}

impl ScriptedOperator {
    pub fn new(answers: Vec<Answer>) -> Self {
        Self {
            answers: answers.into(),
            ..Self::default()
        }
    }

    pub fn remaining(&self) -> usize {
        self.answers.len()
    }

    fn next(&mut self, prompt: String) -> Answer {
        self.prompts.push(prompt.clone());
        self.answers
            .pop_front()
            .unwrap_or_else(|| panic!("script exhausted at prompt: {prompt}"))
    }
}

impl Operator for ScriptedOperator {
    fn select_branch(&mut self, candidates: &[String], first: bool) -> Prompt<Option<String>> {
        match self.next(format!("branch (first={first}) from {candidates:?}")) {
            Answer::Branch(branch) => Ok(branch),
            Answer::Interrupt => Err(Interrupted),
            other => panic!("expected branch answer, got {other:?}"),
        }
    }

    fn confirm(&mut self, question: &str, _default: bool) -> Prompt<bool> {
        match self.next(question.to_string()) {
            Answer::Confirm(yes) => Ok(yes),
            Answer::Interrupt => Err(Interrupted),
            other => panic!("expected confirm answer for '{question}', got {other:?}"),
        }
    }

    fn read_text(&mut self, label: &str) -> Prompt<String> {
        match self.next(label.to_string()) {
            Answer::Text(text) => Ok(text),
            Answer::Interrupt => Err(Interrupted),
            other => panic!("expected text answer for '{label}', got {other:?}"),
        }
    }

    fn pause(&mut self, message: &str) -> Prompt<()> {
        match self.next(message.to_string()) {
            Answer::Continue => Ok(()),
            Answer::Interrupt => Err(Interrupted),
            other => panic!("expected continue for '{message}', got {other:?}"),
        }
    }

    fn notify(&mut self, event: &Event) {
        self.events.push(event.clone());
    }
}

// ---------------------------------------------------------------------------
// FakeTracker
// ---------------------------------------------------------------------------

/// Tracker double. `versions` / `linked` set to `None` make the lookup fail.
#[derive(Debug, Default)]
pub struct FakeTracker {
    pub versions: Option<Vec<FixVersion>>,
    pub linked: Option<Vec<Issue>>,
    /// `(issue id, transition id)` pairs answered with the given status.
    pub failing: HashMap<(String, String), u16>,
    pub failing_assignments: HashSet<String>,
    pub calls: RefCell<Vec<String>>,
    pub requests: RefCell<Vec<(String, TransitionRequest)>>,
}

impl FakeTracker {
    pub fn new(versions: Vec<FixVersion>) -> Self {
        Self {
            versions: Some(versions),
            linked: Some(Vec::new()),
            ..Self::default()
        }
    }

    pub fn fail(&mut self, issue: &str, transition_id: &str, status: u16) {
        self.failing
            .insert((issue.to_string(), transition_id.to_string()), status);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl IssueTracker for FakeTracker {
    fn verify_credentials(&self) -> Result<bool> {
        self.calls.borrow_mut().push("myself".to_string());
        Ok(true)
    }

    fn issue_exists(&self, issue: &Issue) -> Result<bool> {
        self.calls.borrow_mut().push(format!("exists {issue}"));
        Ok(true)
    }

    fn fix_versions(&self) -> Result<Vec<FixVersion>> {
        self.calls.borrow_mut().push("versions".to_string());
        self.versions
            .clone()
            .ok_or_else(|| BugfixError::Tracker("versions unavailable".to_string()))
    }

    fn linked_creation_issues(&self, application: &Issue) -> Result<Vec<Issue>> {
        self.calls.borrow_mut().push(format!("linked {application}"));
        self.linked
            .clone()
            .ok_or_else(|| BugfixError::Tracker("issue lookup returned 404".to_string()))
    }

    fn transition(&self, issue: &Issue, request: &TransitionRequest) -> Result<()> {
        self.calls
            .borrow_mut()
            .push(format!("transition {issue} {}", request.transition_id));
        self.requests
            .borrow_mut()
            .push((issue.id(), request.clone()));
        let key = (issue.id(), request.transition_id.clone());
        if let Some(status) = self.failing.get(&key) {
            return Err(BugfixError::RemoteTransitionFailed {
                status: *status,
                reason: "Transition is not valid".to_string(),
            });
        }
        Ok(())
    }

    fn assign_and_comment(&self, issue: &Issue, account_id: &str, comment: &str) -> Result<()> {
        self.calls
            .borrow_mut()
            .push(format!("assign {issue} {account_id} {comment}"));
        if self.failing_assignments.contains(&issue.id()) {
            return Err(BugfixError::RemoteTransitionFailed {
                status: 400,
                reason: "accountId is invalid".to_string(),
            });
        }
        Ok(())
    }
}

//! Terminal implementation of the operator port.
//!
//! Stdin is read on a dedicated thread, one line per request, so nothing
//! reads the terminal while no prompt is open and a terminal editor run
//! between prompts owns it. Each prompt waits for either the requested line
//! or Ctrl-C; both Ctrl-C and end of input surface as
//! [`Interrupted`]. A read left open by Ctrl-C answers the next prompt.
//! With `--json` everything the operator sees goes to stderr so stdout
//! carries only the final report.

use bugfix_core::cherry_pick::BranchOutcome;
use bugfix_core::operator::{percent_complete, Event, Interrupted, Operator, Prompt};
use bugfix_core::transition::StepStatus;
use std::io::Write;
use std::sync::mpsc as std_mpsc;
use tokio::runtime::Runtime;
use tokio::sync::mpsc::{self, UnboundedReceiver};

pub struct TerminalOperator {
    rt: Runtime,
    requests: std_mpsc::Sender<()>,
    lines: UnboundedReceiver<String>,
    /// A line was requested and has not arrived yet.
    pending: bool,
    to_stderr: bool,
}

impl TerminalOperator {
    pub fn new(json: bool) -> anyhow::Result<Self> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let (requests, wanted) = std_mpsc::channel::<()>();
        let (tx, lines) = mpsc::unbounded_channel();
        std::thread::spawn(move || {
            let stdin = std::io::stdin();
            while wanted.recv().is_ok() {
                let mut line = String::new();
                match stdin.read_line(&mut line) {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {}
                }
                if tx.send(strip_line_ending(&line).to_string()).is_err() {
                    break;
                }
            }
        });
        Ok(Self {
            rt,
            requests,
            lines,
            pending: false,
            to_stderr: json,
        })
    }

    pub fn say(&self, text: &str) {
        if self.to_stderr {
            eprintln!("{text}");
        } else {
            println!("{text}");
        }
    }

    fn ask(&mut self, prompt: &str) -> Prompt<String> {
        if self.to_stderr {
            eprint!("{prompt}");
            let _ = std::io::stderr().flush();
        } else {
            print!("{prompt}");
            let _ = std::io::stdout().flush();
        }

        if !self.pending {
            // A closed reader means stdin ended; recv() below reports that.
            let _ = self.requests.send(());
            self.pending = true;
        }

        let lines = &mut self.lines;
        let answer = self.rt.block_on(async {
            tokio::select! {
                line = lines.recv() => line.ok_or(Interrupted),
                _ = tokio::signal::ctrl_c() => Err(Interrupted),
            }
        });
        match &answer {
            Ok(_) => self.pending = false,
            Err(_) => self.say(""),
        }
        answer
    }
}

/// Drop a trailing `\n` or `\r\n`; other whitespace is significant.
fn strip_line_ending(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

/// Exact name first, then a unique prefix.
pub fn complete_branch(input: &str, candidates: &[String]) -> Option<String> {
    if let Some(exact) = candidates.iter().find(|c| c.as_str() == input) {
        return Some(exact.clone());
    }
    let mut matches = candidates.iter().filter(|c| c.starts_with(input));
    match (matches.next(), matches.next()) {
        (Some(only), None) => Some(only.clone()),
        _ => None,
    }
}

impl Operator for TerminalOperator {
    fn select_branch(&mut self, candidates: &[String], first: bool) -> Prompt<Option<String>> {
        self.say(&format!("\nBranches: {}", candidates.join(", ")));
        let prompt = if first {
            "Branch to fix: "
        } else {
            "Next branch to fix (Enter when done): "
        };
        loop {
            let input = self.ask(prompt)?;
            let input = input.trim();
            if input.is_empty() {
                if first {
                    continue;
                }
                return Ok(None);
            }
            let branch = complete_branch(input, candidates).unwrap_or_else(|| input.to_string());
            return Ok(Some(branch));
        }
    }

    fn confirm(&mut self, question: &str, default: bool) -> Prompt<bool> {
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        loop {
            let input = self.ask(&format!("{question} {hint} "))?;
            match input.trim().to_ascii_lowercase().as_str() {
                "" => return Ok(default),
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => self.say("Please answer y or n."),
            }
        }
    }

    fn read_text(&mut self, label: &str) -> Prompt<String> {
        self.ask(&format!("{label}: "))
    }

    fn pause(&mut self, message: &str) -> Prompt<()> {
        self.ask(&format!("{message} "))?;
        Ok(())
    }

    fn notify(&mut self, event: &Event) {
        self.say(&describe(event));
    }
}

pub fn describe(event: &Event) -> String {
    match event {
        Event::UnknownBranch {
            branch,
            suggestions,
        } if suggestions.is_empty() => format!("Branch '{branch}' does not exist."),
        Event::UnknownBranch {
            branch,
            suggestions,
        } => format!(
            "Branch '{branch}' does not exist. This is a minified app; did you mean: {}?",
            suggestions.join(", ")
        ),
        Event::MakeFix { branch } => format!("\nMake the fix on {branch} in the editor."),
        Event::BlankDescription => "The fix description cannot be blank.".to_string(),
        Event::NoChangesMade { branch } => format!("No changes were made on {branch}."),
        Event::FixCommitted { branch, message } => format!("Committed on {branch}: {message}"),
        Event::FixAborted { branch, reason } => format!("Fix on {branch} aborted: {reason}"),
        Event::EditorFailed { reason } => {
            format!("Could not open the editor ({reason}); edit the working copy by hand.")
        }
        Event::PropagationStarted { commit, total } => {
            format!("\nApplying {commit} to {total} branch(es)")
        }
        Event::PropagationUnavailable { branch, reason } => format!(
            "The fix on {branch} was committed but cannot be propagated ({reason}); cherry-pick it with 'bugfix cherry-pick'."
        ),
        Event::CheckoutFailed { branch, reason } => {
            format!("Checkout of {branch} failed: {reason}")
        }
        Event::ApplyFailed { branch, reason } => format!("Could not apply to {branch}: {reason}"),
        Event::MergeConflict { branch, files } if files.is_empty() => {
            format!("Merge conflict on {branch}.")
        }
        Event::MergeConflict { branch, files } => {
            format!("Merge conflict on {branch} in: {}", files.join(", "))
        }
        Event::BranchComplete {
            branch,
            index,
            total,
            outcome,
        } => {
            let status = match outcome {
                BranchOutcome::Skipped { .. } => "SKIPPED",
                _ => "COMPLETE",
            };
            format!(
                "[{:>6.2}%] {branch} [{status}]",
                percent_complete(*index, *total)
            )
        }
        Event::TransitioningIssue { issue } => format!("\nTransitioning {issue}"),
        Event::CreationIssuesSelected { count } => {
            format!("Creation issues to transition: {count}")
        }
        Event::LinkedLookupFailed { reason } => {
            format!("Could not look up linked creation issues: {reason}")
        }
        Event::Step(report) => match &report.status {
            StepStatus::Complete => format!("  {} [COMPLETE]", report.step),
            StepStatus::Failed {
                http_status: Some(code),
                reason,
            } => format!("  {} [FAILED - {code}: {reason}]", report.step),
            StepStatus::Failed {
                http_status: None,
                reason,
            } => format!("  {} [FAILED - {reason}]", report.step),
        },
        Event::SequenceSkipped { sequence } => format!("Skipped {sequence} transitions."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bugfix_core::transition::{StepReport, TransitionStep};

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn exact_branch_beats_prefix() {
        let candidates = names(&["secure", "secure-v2"]);
        assert_eq!(complete_branch("secure", &candidates).as_deref(), Some("secure"));
    }

    #[test]
    fn line_endings_are_stripped_but_spaces_kept() {
        assert_eq!(strip_line_ending("fix\n"), "fix");
        assert_eq!(strip_line_ending("fix\r\n"), "fix");
        assert_eq!(strip_line_ending(" \n"), " ");
        assert_eq!(strip_line_ending("last"), "last");
    }

    #[test]
    fn unique_prefix_completes() {
        let candidates = names(&["secure", "branch_a", "branch_b"]);
        assert_eq!(complete_branch("sec", &candidates).as_deref(), Some("secure"));
        assert_eq!(complete_branch("branch", &candidates), None);
        assert_eq!(complete_branch("zzz", &candidates), None);
    }

    #[test]
    fn progress_line_shows_percentage() {
        let line = describe(&Event::BranchComplete {
            branch: "branch_a".to_string(),
            index: 0,
            total: 2,
            outcome: BranchOutcome::Applied,
        });
        assert_eq!(line, "[ 50.00%] branch_a [COMPLETE]");
    }

    #[test]
    fn failed_step_shows_status_code() {
        let line = describe(&Event::Step(StepReport {
            issue: "CHLRQ-1".to_string(),
            step: TransitionStep::Planned,
            status: StepStatus::Failed {
                http_status: Some(400),
                reason: "Bad Request".to_string(),
            },
        }));
        assert_eq!(line, "  Planned [FAILED - 400: Bad Request]");
    }

    #[test]
    fn minified_suggestions_are_listed() {
        let line = describe(&Event::UnknownBranch {
            branch: "secure".to_string(),
            suggestions: names(&["secure-v2"]),
        });
        assert!(line.contains("secure-v2"));
    }
}

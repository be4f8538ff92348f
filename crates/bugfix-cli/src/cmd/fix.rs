use crate::output::{print_json, print_propagation, print_transitions};
use crate::session::{ensure_exists, issue_or_prompt, load_config, Credentials, WorkingCopyArgs};
use crate::terminal::TerminalOperator;
use anyhow::Context;
use bugfix_core::fix_branches::FixBranches;
use bugfix_core::issue::{Issue, IssueKind};
use bugfix_core::operator::Operator;
use bugfix_core::repository::Repository;
use bugfix_core::transition::{IssueTransitioner, TransitionPlan, TransitionReport};
use bugfix_core::vcs::Vcs;
use clap::Args;
use std::path::Path;

#[derive(Args, Debug)]
pub struct FixArgs {
    #[command(flatten)]
    pub working_copy: WorkingCopyArgs,

    /// Request issue, e.g. CHLRQ-1234 or 1234
    #[arg(long)]
    pub request: String,

    /// Creation issue transitioned when the fix stays on one branch
    #[arg(long)]
    pub creation: Option<String>,

    /// Application creation issue whose linked issues are transitioned after propagation
    #[arg(long)]
    pub application: Option<String>,

    /// Remind the operator to commit added or removed lines in the content chunks
    #[arg(long)]
    pub chunk_fix: bool,

    /// Do not push (test mode)
    #[arg(long)]
    pub no_push: bool,

    /// Do not transition any issues
    #[arg(long)]
    pub no_transition: bool,

    #[command(flatten)]
    pub credentials: Credentials,
}

pub fn run(root: &Path, args: FixArgs, json: bool) -> anyhow::Result<()> {
    let cfg = load_config(root)?;

    // Identifiers are validated before any git or tracker work.
    let request = Issue::request(&args.request)?;
    let creation = args
        .creation
        .as_deref()
        .map(Issue::creation)
        .transpose()?;
    let application = args
        .application
        .as_deref()
        .map(Issue::creation)
        .transpose()?;

    let tracker = if args.no_transition {
        None
    } else {
        let tracker = args.credentials.connect(&cfg)?;
        ensure_exists(&tracker, &request)?;
        Some(tracker)
    };

    let mut vcs = args.working_copy.open(root, &cfg)?;
    let mut repo = Repository::load(&args.working_copy.repo, &vcs, &cfg.git.secure_branch)
        .context("failed to list branches")?;
    let mut operator = TerminalOperator::new(json)?;

    let summary = repo.summary();
    operator.say(&format!(
        "\nRepository: {} ({} branches, {} app)",
        summary.name, summary.branch_count, summary.app_kind
    ));

    let result = FixBranches::new(&mut repo, &mut vcs, &mut operator, &request)
        .run(args.chunk_fix)
        .context("fix run aborted")?;

    if result.fix_messages.is_empty() {
        operator.say("No fixes were committed.");
    } else if args.no_push {
        operator.say("Test mode: changes were not pushed.");
    } else if operator
        .confirm("Push all branches to origin?", true)
        .unwrap_or(false)
    {
        vcs.push_all().context("push failed")?;
        operator.say("Pushed all branches.");
    } else {
        operator.say("Changes were not pushed.");
    }

    let mut transitions: Option<TransitionReport> = None;
    if let Some(tracker) = tracker.as_ref().filter(|_| !result.fix_messages.is_empty()) {
        let selected = if result.cherry_picked {
            issue_or_prompt(
                application.as_ref().map(Issue::id).as_deref(),
                IssueKind::Creation,
                "Application creation issue",
                &mut operator,
            )?
        } else {
            issue_or_prompt(
                creation.as_ref().map(Issue::id).as_deref(),
                IssueKind::Creation,
                "Creation issue",
                &mut operator,
            )?
        };

        match selected {
            Some(creation_issue) => {
                let plan = TransitionPlan::from_fix(request.clone(), creation_issue, &result);
                let today = chrono::Local::now().date_naive();
                let report = IssueTransitioner::new(
                    tracker,
                    &mut operator,
                    &cfg.tracker.transitions,
                    &cfg.tracker.reviewer_account_id,
                    today,
                )
                .run(&plan)?;
                transitions = Some(report);
            }
            None => operator.say("Issue transitions skipped."),
        }
    }

    if json {
        let value = serde_json::json!({
            "repository": summary,
            "fix": result,
            "transitions": transitions,
        });
        return print_json(&value);
    }

    if let Some(report) = &result.propagation {
        print_propagation(report);
    }
    if let Some(report) = &transitions {
        print_transitions(report);
    }

    println!("\nComplete the following tasks:");
    for (i, task) in result.follow_up_tasks().iter().enumerate() {
        println!("  {}. {task}", i + 1);
    }
    println!("\nBug fix complete.");
    Ok(())
}

use crate::output::{print_json, print_propagation};
use crate::session::{load_config, WorkingCopyArgs};
use crate::terminal::TerminalOperator;
use anyhow::{bail, Context};
use bugfix_core::cherry_pick::{ApplyMode, CherryPickEngine, PropagationReport};
use bugfix_core::operator::Operator;
use bugfix_core::repository::Repository;
use bugfix_core::vcs::{GitRepository, Vcs};
use clap::Args;
use std::path::Path;

#[derive(Args, Debug)]
pub struct CherryPickArgs {
    #[command(flatten)]
    pub working_copy: WorkingCopyArgs,

    /// Commit to apply
    #[arg(long)]
    pub commit: String,

    /// Branch the commit was made on; it is left out of the targets
    #[arg(long)]
    pub from: Option<String>,

    /// Do not push (test mode)
    #[arg(long)]
    pub no_push: bool,
}

pub fn run(root: &Path, args: CherryPickArgs, json: bool) -> anyhow::Result<()> {
    let cfg = load_config(root)?;
    let mut vcs = args.working_copy.open(root, &cfg)?;
    let repo = Repository::load(&args.working_copy.repo, &vcs, &cfg.git.secure_branch)
        .context("failed to list branches")?;

    if let Some(from) = &args.from {
        if !repo.has_branch(from) {
            bail!("branch '{from}' does not exist in {}", repo.name);
        }
    }
    let targets: Vec<String> = repo
        .branches
        .iter()
        .filter(|b| Some(b.as_str()) != args.from.as_deref())
        .cloned()
        .collect();

    let mut operator = TerminalOperator::new(json)?;
    let report = CherryPickEngine::new(&mut vcs, &mut operator, ApplyMode::CherryPick)
        .propagate(&args.commit, &targets)?;

    finish(&mut vcs, &mut operator, &report, args.no_push, json)
}

/// Push on confirmation, then print the per-branch report.
pub(crate) fn finish(
    vcs: &mut GitRepository,
    operator: &mut TerminalOperator,
    report: &PropagationReport,
    no_push: bool,
    json: bool,
) -> anyhow::Result<()> {
    let mut pushed = false;
    if no_push {
        operator.say("Test mode: changes were not pushed.");
    } else if report.completed() > 0
        && operator
            .confirm("Push all branches to origin?", true)
            .unwrap_or(false)
    {
        vcs.push_all().context("push failed")?;
        pushed = true;
    }

    if json {
        let value = serde_json::json!({
            "propagation": report,
            "pushed": pushed,
        });
        return print_json(&value);
    }

    print_propagation(report);
    if pushed {
        println!("\nPushed all branches.");
    }
    Ok(())
}

use crate::cmd::cherry_pick::finish;
use crate::session::{load_config, WorkingCopyArgs};
use crate::terminal::TerminalOperator;
use anyhow::Context;
use bugfix_core::cherry_pick::{ApplyMode, CherryPickEngine};
use bugfix_core::repository::Repository;
use clap::Args;
use std::path::Path;

#[derive(Args, Debug)]
pub struct RevertArgs {
    #[command(flatten)]
    pub working_copy: WorkingCopyArgs,

    /// Commit to revert
    #[arg(long)]
    pub commit: String,

    /// Do not push (test mode)
    #[arg(long)]
    pub no_push: bool,
}

pub fn run(root: &Path, args: RevertArgs, json: bool) -> anyhow::Result<()> {
    let cfg = load_config(root)?;
    let mut vcs = args.working_copy.open(root, &cfg)?;
    let repo = Repository::load(&args.working_copy.repo, &vcs, &cfg.git.secure_branch)
        .context("failed to list branches")?;

    let mut operator = TerminalOperator::new(json)?;
    let report = CherryPickEngine::new(&mut vcs, &mut operator, ApplyMode::Revert)
        .propagate(&args.commit, &repo.branches)?;

    finish(&mut vcs, &mut operator, &report, args.no_push, json)
}

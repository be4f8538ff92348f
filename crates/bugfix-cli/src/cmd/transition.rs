use crate::output::{print_json, print_transitions};
use crate::session::{ensure_exists, load_config, Credentials};
use crate::terminal::TerminalOperator;
use anyhow::bail;
use bugfix_core::fix_branches::combine_messages;
use bugfix_core::issue::Issue;
use bugfix_core::transition::{CreationSelection, IssueTransitioner, TransitionPlan};
use clap::Args;
use std::path::Path;

#[derive(Args, Debug)]
pub struct TransitionArgs {
    /// Request issue, e.g. CHLRQ-1234 or 1234
    #[arg(long)]
    pub request: String,

    /// Creation issue to transition on its own
    #[arg(long, conflicts_with = "application")]
    pub creation: Option<String>,

    /// Application creation issue; every creation issue linked to it is transitioned
    #[arg(long)]
    pub application: Option<String>,

    /// Closing comment for the request issue (repeat for several fixes)
    #[arg(long = "message", short = 'm')]
    pub messages: Vec<String>,

    #[command(flatten)]
    pub credentials: Credentials,
}

pub fn run(root: &Path, args: TransitionArgs, json: bool) -> anyhow::Result<()> {
    let cfg = load_config(root)?;

    let request = Issue::request(&args.request)?;
    let creation = match (&args.creation, &args.application) {
        (Some(id), None) => CreationSelection::Single(Issue::creation(id)?),
        (None, Some(id)) => CreationSelection::LinkedTo(Issue::creation(id)?),
        _ => bail!("pass exactly one of --creation or --application"),
    };

    let tracker = args.credentials.connect(&cfg)?;
    ensure_exists(&tracker, &request)?;

    let plan = TransitionPlan {
        request,
        message: combine_messages(&args.messages),
        creation,
    };

    let mut operator = TerminalOperator::new(json)?;
    let today = chrono::Local::now().date_naive();
    let report = IssueTransitioner::new(
        &tracker,
        &mut operator,
        &cfg.tracker.transitions,
        &cfg.tracker.reviewer_account_id,
        today,
    )
    .run(&plan)?;

    if json {
        return print_json(&report);
    }

    print_transitions(&report);
    let failed = report.failed_steps();
    if failed > 0 {
        println!("\n{failed} transition step(s) failed.");
    } else {
        println!("\nTransitions complete.");
    }
    Ok(())
}

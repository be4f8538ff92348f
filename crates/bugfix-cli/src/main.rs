mod cmd;
mod output;
mod root;
mod session;
mod terminal;

use clap::{Parser, Subcommand};
use cmd::{
    cherry_pick::CherryPickArgs, config::ConfigSubcommand, fix::FixArgs, revert::RevertArgs,
    transition::TransitionArgs,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "bugfix",
    about = "Fix a bug across every branch of a content repository and transition its tickets",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .bugfix/)
    #[arg(long, global = true, env = "BUGFIX_ROOT")]
    root: Option<PathBuf>,

    /// Output reports as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Log git and tracker calls
    #[arg(long, global = true, short = 'v')]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default .bugfix/config.yaml
    Init,

    /// Show or validate the configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Fix branches of a repository, propagate the secure fix and transition issues
    Fix(FixArgs),

    /// Cherry-pick an existing commit onto every other branch
    CherryPick(CherryPickArgs),

    /// Revert a commit on every branch
    Revert(RevertArgs),

    /// Transition request and creation issues without touching git
    Transition(TransitionArgs),
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
        Commands::Fix(args) => cmd::fix::run(&root, args, cli.json),
        Commands::CherryPick(args) => cmd::cherry_pick::run(&root, args, cli.json),
        Commands::Revert(args) => cmd::revert::run(&root, args, cli.json),
        Commands::Transition(args) => cmd::transition::run(&root, args, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

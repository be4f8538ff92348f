use crate::output::{print_json, print_table};
use crate::session::load_config;
use bugfix_core::config::{Config, WarnLevel};
use clap::Subcommand;
use std::path::Path;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Print the effective configuration
    Show,

    /// Validate the config for common mistakes
    Validate,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(root: &Path, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    let config = load_config(root)?;
    match subcmd {
        ConfigSubcommand::Show => show(&config, json),
        ConfigSubcommand::Validate => validate(&config, json),
    }
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(config: &Config, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(config);
    }

    let git = &config.git;
    let tracker = &config.tracker;
    let ids = &tracker.transitions;
    let rows = vec![
        vec!["git.remote_base".to_string(), git.remote_base.clone()],
        vec!["git.repos_dir".to_string(), git.repos_dir.clone()],
        vec!["git.secure_branch".to_string(), git.secure_branch.clone()],
        vec!["git.ignore_branches".to_string(), git.ignore_branches.join(", ")],
        vec!["git.editor".to_string(), git.editor.clone()],
        vec!["tracker.base_url".to_string(), tracker.base_url.clone()],
        vec![
            "tracker.reviewer_account_id".to_string(),
            tracker.reviewer_account_id.clone(),
        ],
        vec![
            "tracker.transitions".to_string(),
            format!(
                "planned={} in_progress={} closed={} feedback_open={} feedback_review={}",
                ids.planned, ids.in_progress, ids.closed, ids.feedback_open, ids.feedback_review
            ),
        ],
    ];
    print_table(&["KEY", "VALUE"], rows);
    Ok(())
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn validate(config: &Config, json: bool) -> anyhow::Result<()> {
    let warnings = config.validate();

    if json {
        let value = serde_json::json!({
            "warnings": warnings,
        });
        print_json(&value)?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config validation found errors");
    }

    Ok(())
}

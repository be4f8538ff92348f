use crate::terminal::TerminalOperator;
use anyhow::{bail, Context};
use bugfix_core::config::Config;
use bugfix_core::issue::{Issue, IssueKind};
use bugfix_core::operator::Operator;
use bugfix_core::paths;
use bugfix_core::tracker::{IssueTracker, JiraClient};
use bugfix_core::vcs::GitRepository;
use clap::Args;
use std::path::Path;
use tracing::info;

pub fn load_config(root: &Path) -> anyhow::Result<Config> {
    Config::load(root).context("failed to load config")
}

// ---------------------------------------------------------------------------
// Working copy
// ---------------------------------------------------------------------------

#[derive(Args, Debug)]
pub struct WorkingCopyArgs {
    /// Repository name under the configured remote
    pub repo: String,

    /// Reuse the existing working copy instead of cloning a fresh one
    #[arg(long)]
    pub reuse: bool,
}

impl WorkingCopyArgs {
    pub fn open(&self, root: &Path, cfg: &Config) -> anyhow::Result<GitRepository> {
        let dir = paths::working_copy(root, &cfg.git.repos_dir, &self.repo)?;
        if self.reuse {
            info!(dir = %dir.display(), "opening working copy");
            return GitRepository::open(&dir, &cfg.git)
                .with_context(|| format!("failed to open {}", dir.display()));
        }
        let url = cfg.git.clone_url(&self.repo);
        eprintln!("Cloning {url}");
        GitRepository::clone_fresh(&url, &dir, &cfg.git)
            .with_context(|| format!("failed to clone {}", self.repo))
    }
}

// ---------------------------------------------------------------------------
// Tracker
// ---------------------------------------------------------------------------

#[derive(Args, Debug)]
pub struct Credentials {
    /// Tracker account email
    #[arg(long, env = "JIRA_API_EMAIL", hide_env_values = true)]
    pub email: Option<String>,

    /// Tracker API token
    #[arg(long, env = "JIRA_API_KEY", hide_env_values = true)]
    pub token: Option<String>,
}

impl Credentials {
    /// Build a tracker client and make sure the credentials are accepted.
    pub fn connect(&self, cfg: &Config) -> anyhow::Result<JiraClient> {
        if cfg.tracker.base_url.trim().is_empty() {
            bail!("tracker.base_url is not configured");
        }
        let email = self
            .email
            .as_deref()
            .context("missing tracker email: pass --email or set JIRA_API_EMAIL")?;
        let token = self
            .token
            .as_deref()
            .context("missing tracker token: pass --token or set JIRA_API_KEY")?;

        let client = JiraClient::new(&cfg.tracker.base_url, email, token)?;
        if !client
            .verify_credentials()
            .context("failed to reach the tracker")?
        {
            bail!("the tracker rejected the credentials for {email}");
        }
        Ok(client)
    }
}

pub fn ensure_exists(tracker: &dyn IssueTracker, issue: &Issue) -> anyhow::Result<()> {
    if !tracker
        .issue_exists(issue)
        .with_context(|| format!("failed to look up {issue}"))?
    {
        bail!("{issue} does not exist in the tracker");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Issue prompts
// ---------------------------------------------------------------------------

/// Use the id given on the command line, or ask for one until it parses.
/// `None` means the operator interrupted the prompt.
pub fn issue_or_prompt(
    given: Option<&str>,
    kind: IssueKind,
    label: &str,
    operator: &mut TerminalOperator,
) -> anyhow::Result<Option<Issue>> {
    if let Some(value) = given {
        return Ok(Some(Issue::parse(kind, value)?));
    }
    loop {
        let input = match operator.read_text(&format!("{label} ({kind}-1234 or 1234)")) {
            Ok(input) => input,
            Err(_) => return Ok(None),
        };
        match Issue::parse(kind, &input) {
            Ok(issue) => return Ok(Some(issue)),
            Err(e) => operator.say(&format!("{e}")),
        }
    }
}

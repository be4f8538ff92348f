use crate::error::{BugfixError, Result};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// GitConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitConfig {
    /// Clone URL prefix; the repository is fetched from `<remote_base>/<name>.git`.
    #[serde(default = "default_remote_base")]
    pub remote_base: String,
    #[serde(default = "default_repos_dir")]
    pub repos_dir: String,
    #[serde(default = "default_secure_branch")]
    pub secure_branch: String,
    /// Remote branches that are never offered for fixing or propagation.
    #[serde(default = "default_ignore_branches")]
    pub ignore_branches: Vec<String>,
    #[serde(default = "default_editor")]
    pub editor: String,
}

fn default_remote_base() -> String {
    "git@github.com:SCWContent".to_string()
}

fn default_repos_dir() -> String {
    paths::REPOS_DIR.to_string()
}

fn default_secure_branch() -> String {
    "secure".to_string()
}

fn default_ignore_branches() -> Vec<String> {
    ["HEAD", "master", "main", "review", "staging", "temp", "empty"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_editor() -> String {
    "code".to_string()
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            remote_base: default_remote_base(),
            repos_dir: default_repos_dir(),
            secure_branch: default_secure_branch(),
            ignore_branches: default_ignore_branches(),
            editor: default_editor(),
        }
    }
}

impl GitConfig {
    pub fn is_ignored(&self, branch: &str) -> bool {
        self.ignore_branches.iter().any(|b| b == branch)
    }

    pub fn clone_url(&self, name: &str) -> String {
        format!("{}/{}.git", self.remote_base.trim_end_matches('/'), name)
    }
}

// ---------------------------------------------------------------------------
// TransitionIds
// ---------------------------------------------------------------------------

/// Workflow transition ids as configured in the tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionIds {
    #[serde(default = "default_planned")]
    pub planned: String,
    #[serde(default = "default_in_progress")]
    pub in_progress: String,
    #[serde(default = "default_closed")]
    pub closed: String,
    #[serde(default = "default_feedback_open")]
    pub feedback_open: String,
    #[serde(default = "default_feedback_review")]
    pub feedback_review: String,
}

fn default_planned() -> String {
    "281".to_string()
}

fn default_in_progress() -> String {
    "291".to_string()
}

fn default_closed() -> String {
    "191".to_string()
}

fn default_feedback_open() -> String {
    "511".to_string()
}

fn default_feedback_review() -> String {
    "521".to_string()
}

impl Default for TransitionIds {
    fn default() -> Self {
        Self {
            planned: default_planned(),
            in_progress: default_in_progress(),
            closed: default_closed(),
            feedback_open: default_feedback_open(),
            feedback_review: default_feedback_review(),
        }
    }
}

impl TransitionIds {
    fn all(&self) -> [(&'static str, &str); 5] {
        [
            ("planned", self.planned.as_str()),
            ("in_progress", self.in_progress.as_str()),
            ("closed", self.closed.as_str()),
            ("feedback_open", self.feedback_open.as_str()),
            ("feedback_review", self.feedback_review.as_str()),
        ]
    }
}

// ---------------------------------------------------------------------------
// TrackerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// REST API base, e.g. `https://example.atlassian.net/rest/api/latest`.
    #[serde(default)]
    pub base_url: String,
    /// Account assigned to creation issues once they reach feedback review.
    #[serde(default)]
    pub reviewer_account_id: String,
    #[serde(default)]
    pub transitions: TransitionIds,
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub git: GitConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
}

fn default_version() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            version: default_version(),
            git: GitConfig::default(),
            tracker: TrackerConfig::default(),
        }
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(BugfixError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.tracker.base_url.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "tracker.base_url is empty; issue transitions are unavailable".to_string(),
            });
        }

        if self.tracker.reviewer_account_id.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "tracker.reviewer_account_id is empty; creation issues will be unassigned"
                    .to_string(),
            });
        }

        if self.git.is_ignored(&self.git.secure_branch) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "secure branch '{}' is listed in git.ignore_branches",
                    self.git.secure_branch
                ),
            });
        }

        if self.git.editor.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "git.editor is empty".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for (name, id) in self.tracker.transitions.all() {
            if !seen.insert(id) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("transition '{name}' reuses id {id}"),
                });
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

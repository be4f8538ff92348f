//! Version-control adapter.
//!
//! [`Vcs`] is the narrow set of working-copy operations the orchestrator and
//! the cherry-pick engine need. [`GitRepository`] implements it by invoking
//! the `git` binary and inspecting exit status plus repository state, never
//! by matching text in command output.

use crate::config::GitConfig;
use crate::error::{BugfixError, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

pub const REMOTE: &str = "origin";

// ---------------------------------------------------------------------------
// Vcs
// ---------------------------------------------------------------------------

/// Operations over one working copy. All calls block and, except for the
/// read-only queries, change the working copy.
pub trait Vcs {
    /// Remote branch names minus the configured ignore list, in ref order.
    fn list_branches(&self) -> Result<Vec<String>>;

    /// Fails with [`BugfixError::CheckoutFailed`].
    fn checkout(&mut self, branch: &str) -> Result<()>;

    fn stage_all(&mut self) -> Result<()>;

    /// Fails with [`BugfixError::NoChangesToCommit`] when nothing is staged.
    fn commit(&mut self, message: &str) -> Result<()>;

    fn commit_allow_empty(&mut self, message: &str) -> Result<()>;

    /// Fails with [`BugfixError::MergeConflict`] when the pick does not apply cleanly.
    fn cherry_pick(&mut self, commit: &str) -> Result<()>;

    /// Fails with [`BugfixError::ContinueFailed`].
    fn continue_cherry_pick(&mut self) -> Result<()>;

    /// Fails with [`BugfixError::MergeConflict`] when the revert does not apply cleanly.
    fn revert(&mut self, commit: &str) -> Result<()>;

    /// Fails with [`BugfixError::ContinueFailed`].
    fn continue_revert(&mut self) -> Result<()>;

    fn head_commit_id(&self) -> Result<String>;

    fn push_all(&mut self) -> Result<()>;

    /// Open the working copy in the operator's editor.
    fn open_in_editor(&mut self) -> Result<()>;

    fn stage_and_commit(&mut self, message: &str) -> Result<()> {
        self.stage_all()?;
        self.commit(message)
    }
}

// ---------------------------------------------------------------------------
// GitOutput
// ---------------------------------------------------------------------------

struct GitOutput {
    success: bool,
    stdout: String,
    stderr: String,
}

impl GitOutput {
    fn reason(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim().to_string()
        } else {
            stderr.to_string()
        }
    }
}

// ---------------------------------------------------------------------------
// GitRepository
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct GitRepository {
    dir: PathBuf,
    editor: String,
    ignore_branches: Vec<String>,
}

impl GitRepository {
    /// Open an existing working copy.
    pub fn open(dir: impl Into<PathBuf>, cfg: &GitConfig) -> Result<Self> {
        let repo = Self {
            dir: dir.into(),
            editor: cfg.editor.clone(),
            ignore_branches: cfg.ignore_branches.clone(),
        };
        let out = repo.git(&["rev-parse", "--is-inside-work-tree"])?;
        if !out.success {
            return Err(BugfixError::Git(format!(
                "{} is not a git working copy: {}",
                repo.dir.display(),
                out.reason()
            )));
        }
        Ok(repo)
    }

    /// Delete any stale working copy at `dir` and clone `url` into it.
    pub fn clone_fresh(url: &str, dir: impl Into<PathBuf>, cfg: &GitConfig) -> Result<Self> {
        let dir = dir.into();
        crate::io::remove_dir_if_exists(&dir)?;
        if let Some(parent) = dir.parent() {
            std::fs::create_dir_all(parent)?;
        }

        debug!(url, dir = %dir.display(), "git clone");
        let output = Command::new("git")
            .arg("clone")
            .arg(url)
            .arg(&dir)
            .output()
            .map_err(|e| BugfixError::Git(format!("failed to run git: {e}")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BugfixError::Git(format!(
                "clone of {url} failed: {}",
                stderr.trim()
            )));
        }

        Self::open(dir, cfg)
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new("git");
        cmd.args(args)
            .current_dir(&self.dir)
            // `--continue` would otherwise wait on an interactive editor.
            .env("GIT_EDITOR", "true");
        cmd
    }

    fn git(&self, args: &[&str]) -> Result<GitOutput> {
        debug!(?args, dir = %self.dir.display(), "git");
        let output = self
            .command(args)
            .output()
            .map_err(|e| BugfixError::Git(format!("failed to run git: {e}")))?;
        Ok(GitOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn git_ok(&self, args: &[&str]) -> Result<String> {
        let out = self.git(args)?;
        if !out.success {
            return Err(BugfixError::Git(format!(
                "git {} failed: {}",
                args.join(" "),
                out.reason()
            )));
        }
        Ok(out.stdout.trim().to_string())
    }

    fn unmerged_files(&self) -> Result<Vec<String>> {
        let out = self.git_ok(&["diff", "--name-only", "--diff-filter=U"])?;
        Ok(out.lines().map(|l| l.to_string()).collect())
    }

    /// True while a sequencer operation is stopped, e.g. `CHERRY_PICK_HEAD`.
    fn has_pseudo_ref(&self, name: &str) -> Result<bool> {
        Ok(self.git(&["rev-parse", "-q", "--verify", name])?.success)
    }

    /// Classify a failed cherry-pick or revert: a stopped sequencer or
    /// unmerged paths mean the operator has to resolve something.
    fn apply_failure(&self, commit: &str, pseudo_ref: &str, out: &GitOutput) -> Result<()> {
        let files = self.unmerged_files()?;
        if !files.is_empty() || self.has_pseudo_ref(pseudo_ref)? {
            return Err(BugfixError::MergeConflict {
                commit: commit.to_string(),
                files,
            });
        }
        Err(BugfixError::Git(format!(
            "applying {commit} failed: {}",
            out.reason()
        )))
    }

    fn continue_operation(&self, operation: &str) -> Result<()> {
        let out = self.git(&[operation, "--continue"])?;
        if !out.success {
            return Err(BugfixError::ContinueFailed {
                operation: operation.to_string(),
                reason: out.reason(),
            });
        }
        Ok(())
    }
}

impl Vcs for GitRepository {
    fn list_branches(&self) -> Result<Vec<String>> {
        let namespace = format!("refs/remotes/{REMOTE}");
        let refs = self.git_ok(&["for-each-ref", "--format=%(refname)", &namespace])?;
        let prefix = format!("{namespace}/");
        Ok(refs
            .lines()
            .filter_map(|r| r.strip_prefix(&prefix))
            .filter(|name| *name != "HEAD")
            .filter(|name| !self.ignore_branches.iter().any(|b| b == name))
            .map(|name| name.to_string())
            .collect())
    }

    fn checkout(&mut self, branch: &str) -> Result<()> {
        let out = self.git(&["checkout", branch])?;
        if !out.success {
            return Err(BugfixError::CheckoutFailed {
                branch: branch.to_string(),
                reason: out.reason(),
            });
        }
        Ok(())
    }

    fn stage_all(&mut self) -> Result<()> {
        self.git_ok(&["add", "--all"])?;
        Ok(())
    }

    fn commit(&mut self, message: &str) -> Result<()> {
        // Exit status 0 from `diff --cached --quiet` means the index matches HEAD.
        if self.git(&["diff", "--cached", "--quiet"])?.success {
            return Err(BugfixError::NoChangesToCommit);
        }
        self.git_ok(&["commit", "-m", message])?;
        Ok(())
    }

    fn commit_allow_empty(&mut self, message: &str) -> Result<()> {
        self.git_ok(&["commit", "--allow-empty", "-m", message])?;
        Ok(())
    }

    fn cherry_pick(&mut self, commit: &str) -> Result<()> {
        let out = self.git(&["cherry-pick", commit])?;
        if out.success {
            return Ok(());
        }
        self.apply_failure(commit, "CHERRY_PICK_HEAD", &out)
    }

    fn continue_cherry_pick(&mut self) -> Result<()> {
        self.continue_operation("cherry-pick")
    }

    fn revert(&mut self, commit: &str) -> Result<()> {
        let out = self.git(&["revert", "--no-edit", commit])?;
        if out.success {
            return Ok(());
        }
        self.apply_failure(commit, "REVERT_HEAD", &out)
    }

    fn continue_revert(&mut self) -> Result<()> {
        self.continue_operation("revert")
    }

    fn head_commit_id(&self) -> Result<String> {
        self.git_ok(&["rev-parse", "HEAD"])
    }

    fn push_all(&mut self) -> Result<()> {
        self.git_ok(&["push", "--all", REMOTE])?;
        Ok(())
    }

    fn open_in_editor(&mut self) -> Result<()> {
        let mut parts = self.editor.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| BugfixError::Editor("no editor configured".to_string()))?;
        let program = which::which(program)
            .map_err(|_| BugfixError::Editor(format!("editor '{program}' not found on PATH")))?;

        debug!(editor = %program.display(), dir = %self.dir.display(), "open editor");
        let status = Command::new(&program)
            .args(parts)
            .arg(&self.dir)
            .status()
            .map_err(|e| BugfixError::Editor(e.to_string()))?;
        if !status.success() {
            return Err(BugfixError::Editor(format!(
                "{} exited with {status}",
                program.display()
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

use crate::error::{BugfixError, Result};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const BUGFIX_DIR: &str = ".bugfix";
pub const CONFIG_FILE: &str = ".bugfix/config.yaml";
pub const REPOS_DIR: &str = ".bugfix/repos";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

/// Resolve the configured repos directory against the project root.
///
/// A leading `~/` expands to the home directory; relative paths are taken
/// from `root`.
pub fn repos_dir(root: &Path, configured: &str) -> Result<PathBuf> {
    if let Some(rest) = configured.strip_prefix("~/") {
        let home = home::home_dir().ok_or(BugfixError::HomeNotFound)?;
        return Ok(home.join(rest));
    }
    let path = Path::new(configured);
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(root.join(path))
    }
}

pub fn working_copy(root: &Path, configured_repos_dir: &str, name: &str) -> Result<PathBuf> {
    Ok(repos_dir(root, configured_repos_dir)?.join(name))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

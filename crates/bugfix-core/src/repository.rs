use crate::error::Result;
use crate::vcs::Vcs;
use serde::Serialize;

// ---------------------------------------------------------------------------
// AppKind
// ---------------------------------------------------------------------------

/// A full app carries a secure branch whose fixes are propagated to every
/// sibling branch. A minified app has no such branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AppKind {
    Full,
    Minified,
}

impl std::fmt::Display for AppKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppKind::Full => f.write_str("full"),
            AppKind::Minified => f.write_str("minified"),
        }
    }
}

pub fn is_full_app(branches: &[String], secure_branch: &str) -> bool {
    branches.iter().any(|b| b == secure_branch)
}

// ---------------------------------------------------------------------------
// Repository
// ---------------------------------------------------------------------------

/// In-memory state of one working copy for the duration of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Repository {
    pub name: String,
    /// Remote branches minus the ignore list, in ref order.
    pub branches: Vec<String>,
    pub current_branch: Option<String>,
    pub fix_messages: Vec<String>,
    pub cherry_picked: bool,
    secure_branch: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RepositorySummary {
    pub name: String,
    pub branch_count: usize,
    pub app_kind: AppKind,
    pub secure_branch: String,
}

impl Repository {
    pub fn new(name: impl Into<String>, branches: Vec<String>, secure_branch: &str) -> Self {
        Self {
            name: name.into(),
            branches,
            current_branch: None,
            fix_messages: Vec::new(),
            cherry_picked: false,
            secure_branch: secure_branch.to_string(),
        }
    }

    pub fn load(name: impl Into<String>, vcs: &dyn Vcs, secure_branch: &str) -> Result<Self> {
        let branches = vcs.list_branches()?;
        Ok(Self::new(name, branches, secure_branch))
    }

    pub fn secure_branch(&self) -> &str {
        &self.secure_branch
    }

    pub fn is_full_app(&self) -> bool {
        is_full_app(&self.branches, &self.secure_branch)
    }

    pub fn app_kind(&self) -> AppKind {
        if self.is_full_app() {
            AppKind::Full
        } else {
            AppKind::Minified
        }
    }

    pub fn has_branch(&self, branch: &str) -> bool {
        self.branches.iter().any(|b| b == branch)
    }

    /// Branches of a minified app that play the secure role under another
    /// name, e.g. `secure-v2`.
    pub fn minified_secure_branches(&self) -> Vec<String> {
        self.branches
            .iter()
            .filter(|b| b.contains(self.secure_branch.as_str()))
            .cloned()
            .collect()
    }

    pub fn summary(&self) -> RepositorySummary {
        RepositorySummary {
            name: self.name.clone(),
            branch_count: self.branches.len(),
            app_kind: self.app_kind(),
            secure_branch: self.secure_branch.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::FakeVcs;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn full_app_requires_exact_secure_branch() {
        assert!(is_full_app(&names(&["secure", "branch_a"]), "secure"));
        assert!(!is_full_app(&names(&["secure-v2", "branch_a"]), "secure"));
        assert!(!is_full_app(&[], "secure"));
    }

    #[test]
    fn load_takes_branches_from_vcs() {
        let vcs = FakeVcs::new(&["secure", "branch_a", "branch_b"]);
        let repo = Repository::load("web-app", &vcs, "secure").unwrap();
        assert_eq!(repo.branches, names(&["secure", "branch_a", "branch_b"]));
        assert_eq!(repo.app_kind(), AppKind::Full);
        assert!(!repo.cherry_picked);
        assert!(repo.fix_messages.is_empty());
        assert_eq!(repo.current_branch, None);
    }

    #[test]
    fn minified_app_suggests_secure_like_branches() {
        let repo = Repository::new("mini", names(&["secure-v2", "legacy", "secure_old"]), "secure");
        assert_eq!(repo.app_kind(), AppKind::Minified);
        assert_eq!(
            repo.minified_secure_branches(),
            names(&["secure-v2", "secure_old"])
        );
    }

    #[test]
    fn summary_counts_branches() {
        let repo = Repository::new("web-app", names(&["secure", "a", "b"]), "secure");
        let summary = repo.summary();
        assert_eq!(summary.branch_count, 3);
        assert_eq!(summary.app_kind, AppKind::Full);
        assert_eq!(summary.app_kind.to_string(), "full");
    }
}

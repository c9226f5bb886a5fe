//! Repository and branch models.

use serde::Deserialize;

/// The subset of a repository's metadata the SDK exposes.
#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    /// `owner/name`.
    pub full_name: String,
    /// The branch GitHub treats as the default (not necessarily `main`).
    pub default_branch: String,
    #[serde(default)]
    pub private: bool,
}

/// A branch and the commit it currently points at.
#[derive(Debug, Clone, Deserialize)]
pub struct Branch {
    pub name: String,
    pub commit: BranchCommit,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BranchCommit {
    /// SHA of the commit at the branch tip.
    pub sha: String,
}

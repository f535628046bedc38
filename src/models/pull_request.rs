//! Pull request and per-repo CLA configuration types
//!
//! The reconciliation engine owns no persistent state; these types carry the
//! event context and the configuration snapshot it is evaluated against.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a pull request for the reconciliation engine.
///
/// Supplied by the event dispatcher, not owned here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrInfo {
    pub org: String,
    pub repo: String,
    pub number: u64,
}

impl PrInfo {
    pub fn new(org: impl Into<String>, repo: impl Into<String>, number: u64) -> Self {
        Self {
            org: org.into(),
            repo: repo.into(),
            number,
        }
    }
}

impl fmt::Display for PrInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.org, self.repo, self.number)
    }
}

/// Per-repo CLA checking configuration.
///
/// An empty `repo` makes the entry org-wide; a repo-specific entry wins over
/// an org-wide one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaRepoConfig {
    pub org: String,
    #[serde(default)]
    pub repo: String,
    pub cla_id: String,
    #[serde(default)]
    pub check_by_committer: bool,
    pub cla_label_yes: String,
    pub cla_label_no: String,
}

/// The set of repo configurations a reconciliation call is evaluated against.
///
/// Passed explicitly at call time so tests can supply synthetic configs;
/// there is no ambient process-wide lookup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaConfigSnapshot {
    pub repos: Vec<ClaRepoConfig>,
}

impl ClaConfigSnapshot {
    #[must_use]
    pub fn new(repos: Vec<ClaRepoConfig>) -> Self {
        Self { repos }
    }

    /// Resolve the configuration for a repo, preferring an exact match over
    /// an org-wide entry.
    #[must_use]
    pub fn cla_for(&self, org: &str, repo: &str) -> Option<&ClaRepoConfig> {
        self.repos
            .iter()
            .find(|c| c.org == org && c.repo == repo)
            .or_else(|| self.repos.iter().find(|c| c.org == org && c.repo.is_empty()))
    }
}

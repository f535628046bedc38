//! Issue-Tracker Client interface
//!
//! The reconciliation engine mutates pull requests only through this trait;
//! concrete backends adapt it to a code-hosting platform's API.

use std::collections::BTreeMap;

use async_trait::async_trait;
use futures::future::BoxFuture;
use thiserror::Error;

use crate::models::PrInfo;

/// Commit SHAs in guidance output are truncated to this length.
pub const MAX_SHA_LEN: usize = 8;

/// Unsigned commits keyed by truncated SHA, mapped to the commit message.
///
/// Ordered so guidance text is deterministic across runs.
pub type UnsignedCommits = BTreeMap<String, String>;

/// Async predicate deciding whether an identity has signed the CLA.
pub type SignedProbe = dyn Fn(String) -> BoxFuture<'static, bool> + Send + Sync;

/// Predicate selecting comments to delete.
pub type CommentPredicate = dyn Fn(&str) -> bool + Send + Sync;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("failed to list pull request commits: {0}")]
    Commits(String),

    #[error("label mutation failed: {0}")]
    Label(String),

    #[error("comment mutation failed: {0}")]
    Comment(String),
}

/// Client for the code-hosting platform's pull-request API.
///
/// All calls are synchronous, fallible remote operations with no internal
/// retry; retries are the caller's concern.
#[async_trait]
pub trait IssueTrackerClient: Send + Sync {
    /// Fetch the pull request's commits and return those whose relevant
    /// identity (author email, or committer email when `check_by_committer`)
    /// fails the signed probe, keyed by SHA truncated via [`short_sha`] and
    /// de-duplicated.
    async fn unsigned_commits(
        &self,
        pr: &PrInfo,
        check_by_committer: bool,
        is_signed: &SignedProbe,
    ) -> Result<UnsignedCommits, TrackerError>;

    async fn add_pr_label(&self, pr: &PrInfo, label: &str) -> Result<(), TrackerError>;

    async fn remove_pr_label(&self, pr: &PrInfo, label: &str) -> Result<(), TrackerError>;

    async fn create_pr_comment(&self, pr: &PrInfo, text: &str) -> Result<(), TrackerError>;

    /// Delete every comment on the pull request whose text matches the
    /// predicate.
    async fn delete_pr_comment(
        &self,
        pr: &PrInfo,
        matches: &CommentPredicate,
    ) -> Result<(), TrackerError>;
}

/// Truncate a commit SHA to at most [`MAX_SHA_LEN`] characters.
#[must_use]
pub fn short_sha(sha: &str) -> &str {
    &sha[..sha.len().min(MAX_SHA_LEN)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_shas_truncate_to_exactly_eight() {
        assert_eq!(short_sha("abcdef1234567890"), "abcdef12");
    }

    #[test]
    fn short_shas_are_unchanged() {
        assert_eq!(short_sha("abc"), "abc");
        assert_eq!(short_sha("abcdef12"), "abcdef12");
        assert_eq!(short_sha(""), "");
    }
}

//! Signing-Status Reconciliation Engine
//!
//! Recomputes which commit identities on a pull request are unsigned and
//! drives the PR's labels and guidance comment to a consistent state. The
//! engine owns no persistent state: every call is a pure function of the
//! PR's commits, the signing store lookups and the current label set.

use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use futures::FutureExt;
use regex::Regex;
use thiserror::Error;
use tracing::warn;

use crate::models::{ClaConfigSnapshot, ClaRepoConfig, PrInfo};
use crate::services::issue_tracker::{IssueTrackerClient, TrackerError, UnsignedCommits};
use crate::services::signing_store::SigningStore;

/// Title of the guidance comment posted when unsigned commits exist.
pub const SIGN_GUIDE_TITLE: &str = "Thanks for your pull request.\n\nThe authors of the following commits have not signed the Contributor License Agreement (CLA):";

/// Title used by earlier deployments; still matched so stale guidance from
/// before an upgrade gets cleaned up.
pub const SIGN_GUIDE_TITLE_LEGACY: &str = "Thanks for your pull request. Before we can look at your pull request, you'll need to sign a Contributor License Agreement (CLA).";

static CHECK_CLA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mi)^/check-cla\s*$").expect("invalid check-cla pattern"));

/// Whether a comment body contains the `/check-cla` command on its own line.
#[must_use]
pub fn is_check_cla_command(comment: &str) -> bool {
    CHECK_CLA_RE.is_match(comment)
}

/// Whether a comment is a guidance comment, current or legacy.
#[must_use]
pub fn is_sign_guide(comment: &str) -> bool {
    comment.starts_with(SIGN_GUIDE_TITLE) || comment.starts_with(SIGN_GUIDE_TITLE_LEGACY)
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// No CLA configuration for the repo; there is no implicit default.
    #[error("no cla config for repo {org}/{repo}")]
    NoRepoConfig { org: String, repo: String },

    #[error(transparent)]
    Tracker(#[from] TrackerError),
}

impl ReconcileError {
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NoRepoConfig { .. } => "NO_REPO_CONFIG",
            Self::Tracker(_) => "TRACKER_ERROR",
        }
    }

    /// Get the HTTP status code for this error
    #[must_use]
    pub fn status_code(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;
        match self {
            Self::NoRepoConfig { .. } => StatusCode::NOT_FOUND,
            Self::Tracker(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Reconciles a pull request's CLA labels and guidance comment.
#[derive(Clone)]
pub struct ClaReconciler {
    store: Arc<dyn SigningStore>,
    tracker: Arc<dyn IssueTrackerClient>,
    sign_url: String,
    faq_of_checking_by_author: String,
    faq_of_checking_by_committer: String,
}

impl ClaReconciler {
    pub fn new(
        store: Arc<dyn SigningStore>,
        tracker: Arc<dyn IssueTrackerClient>,
        sign_url: impl Into<String>,
        faq_of_checking_by_author: impl Into<String>,
        faq_of_checking_by_committer: impl Into<String>,
    ) -> Self {
        Self {
            store,
            tracker,
            sign_url: sign_url.into(),
            faq_of_checking_by_author: faq_of_checking_by_author.into(),
            faq_of_checking_by_committer: faq_of_checking_by_committer.into(),
        }
    }

    /// Recompute the unsigned set for a pull request and converge its labels
    /// and guidance comment. Returns whether every commit identity has
    /// signed, the signal merge gating keys on.
    ///
    /// Only configuration resolution and commit fetching are hard errors;
    /// label and comment mutations are best-effort, logged on failure, and
    /// self-correct on the next triggering event.
    pub async fn reconcile(
        &self,
        pr: &PrInfo,
        current_labels: &HashSet<String>,
        snapshot: &ClaConfigSnapshot,
    ) -> Result<bool, ReconcileError> {
        let cfg = snapshot
            .cla_for(&pr.org, &pr.repo)
            .ok_or_else(|| ReconcileError::NoRepoConfig {
                org: pr.org.clone(),
                repo: pr.repo.clone(),
            })?;

        let unsigned = self.unsigned_commits(pr, cfg).await?;

        let faq_url = if cfg.check_by_committer {
            &self.faq_of_checking_by_committer
        } else {
            &self.faq_of_checking_by_author
        };
        self.converge(pr, current_labels, cfg, &unsigned, faq_url)
            .await;

        Ok(unsigned.is_empty())
    }

    async fn unsigned_commits(
        &self,
        pr: &PrInfo,
        cfg: &ClaRepoConfig,
    ) -> Result<UnsignedCommits, ReconcileError> {
        let store = Arc::clone(&self.store);
        let cla_id = cfg.cla_id.clone();
        // A store lookup failure counts as unsigned; re-checks converge once
        // the store is reachable again.
        let is_signed = move |email: String| {
            let store = Arc::clone(&store);
            let cla_id = cla_id.clone();
            async move {
                store
                    .is_individual_signed(&cla_id, &email)
                    .await
                    .unwrap_or(false)
            }
            .boxed()
        };

        Ok(self
            .tracker
            .unsigned_commits(pr, cfg.check_by_committer, &is_signed)
            .await?)
    }

    /// Drive labels and the guidance comment toward the state implied by the
    /// unsigned set. Each mutation is attempted independently; a failed one
    /// is logged and does not block the others, so two events racing on the
    /// same PR can transiently disagree and the next event re-converges.
    async fn converge(
        &self,
        pr: &PrInfo,
        labels: &HashSet<String>,
        cfg: &ClaRepoConfig,
        unsigned: &UnsignedCommits,
        faq_url: &str,
    ) {
        let has_yes = labels.contains(&cfg.cla_label_yes);
        let has_no = labels.contains(&cfg.cla_label_no);

        // Stale guidance never survives a re-check; deleting first also
        // guarantees at most one guidance comment is ever live.
        if let Err(err) = self.tracker.delete_pr_comment(pr, &is_sign_guide).await {
            warn!(pr = %pr, error = %err, "could not delete sign guide comment");
        }

        if unsigned.is_empty() {
            if has_no {
                if let Err(err) = self.tracker.remove_pr_label(pr, &cfg.cla_label_no).await {
                    warn!(pr = %pr, label = %cfg.cla_label_no, error = %err, "could not remove label");
                }
            }
            if !has_yes {
                if let Err(err) = self.tracker.add_pr_label(pr, &cfg.cla_label_yes).await {
                    warn!(pr = %pr, label = %cfg.cla_label_yes, error = %err, "could not add label");
                }
            }
            return;
        }

        if has_yes {
            if let Err(err) = self.tracker.remove_pr_label(pr, &cfg.cla_label_yes).await {
                warn!(pr = %pr, label = %cfg.cla_label_yes, error = %err, "could not remove label");
            }
        }
        if !has_no {
            if let Err(err) = self.tracker.add_pr_label(pr, &cfg.cla_label_no).await {
                warn!(pr = %pr, label = %cfg.cla_label_no, error = %err, "could not add label");
            }
        }

        let sign_url = format!("{}/{}", self.sign_url.trim_end_matches('/'), cfg.cla_id);
        let guide = sign_guide(&sign_url, &unsigned_commit_list(unsigned), faq_url);
        if let Err(err) = self.tracker.create_pr_comment(pr, &guide).await {
            warn!(pr = %pr, error = %err, "could not add unsigned guidance comment");
        }
    }
}

/// Render the unsigned set as `**<sha>** | <message>` lines.
fn unsigned_commit_list(commits: &UnsignedCommits) -> String {
    commits
        .iter()
        .map(|(sha, message)| format!("**{sha}** | {message}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Compose the guidance comment body.
fn sign_guide(sign_url: &str, commit_list: &str, faq_url: &str) -> String {
    format!(
        r#"{SIGN_GUIDE_TITLE}

{commit_list}

Please check the [**FAQs**]({faq_url}) first.
You can click [**here**]({sign_url}) to sign the CLA. After signing the CLA, you must comment "/check-cla" to check the CLA status again."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::issue_tracker::short_sha;

    #[test]
    fn check_cla_command_matches_on_its_own_line() {
        assert!(is_check_cla_command("/check-cla"));
        assert!(is_check_cla_command("/CHECK-CLA"));
        assert!(is_check_cla_command("/check-cla   "));
        assert!(is_check_cla_command("please recheck\n/check-cla\nthanks"));

        assert!(!is_check_cla_command("run /check-cla now"));
        assert!(!is_check_cla_command("/check-clap"));
    }

    #[test]
    fn sign_guide_predicate_matches_current_and_legacy_titles() {
        assert!(is_sign_guide(&format!("{SIGN_GUIDE_TITLE}\n\nbody")));
        assert!(is_sign_guide(&format!("{SIGN_GUIDE_TITLE_LEGACY} body")));
        assert!(!is_sign_guide("Some unrelated comment"));
    }

    #[test]
    fn unsigned_commit_list_formats_truncated_shas() {
        let mut commits = UnsignedCommits::new();
        commits.insert(
            short_sha("abcdef1234567890").to_string(),
            "Fix the frobnicator".to_string(),
        );
        commits.insert(short_sha("0123456").to_string(), "Short sha".to_string());

        let list = unsigned_commit_list(&commits);
        assert!(list.contains("**abcdef12** | Fix the frobnicator"));
        assert!(list.contains("**0123456** | Short sha"));
        assert_eq!(list.lines().count(), 2);
    }

    #[test]
    fn sign_guide_carries_urls_and_recheck_instruction() {
        let guide = sign_guide(
            "https://cla.example/sign/abc123",
            "**abcdef12** | msg",
            "https://cla.example/faq",
        );

        assert!(guide.starts_with(SIGN_GUIDE_TITLE));
        assert!(guide.contains("(https://cla.example/sign/abc123)"));
        assert!(guide.contains("(https://cla.example/faq)"));
        assert!(guide.contains("/check-cla"));
        assert!(is_sign_guide(&guide));
    }
}

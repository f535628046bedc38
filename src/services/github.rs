//! GitHub adapter for the issue-tracker and ownership interfaces
//!
//! Thin REST client over the GitHub v3 API. Pull-request comments live on
//! the issues endpoints; commit identities come from the commit object's
//! author/committer emails.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::models::{OrgRepo, PrInfo};
use crate::services::authorizer::{AuthError, OrgOwnership};
use crate::services::issue_tracker::{
    CommentPredicate, IssueTrackerClient, SignedProbe, TrackerError, UnsignedCommits, short_sha,
};

const DEFAULT_API_BASE: &str = "https://api.github.com";

/// GitHub REST client.
#[derive(Debug, Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    api_base: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct CommitItem {
    sha: String,
    commit: CommitDetail,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    message: String,
    author: Option<CommitIdentity>,
    committer: Option<CommitIdentity>,
}

#[derive(Debug, Deserialize)]
struct CommitIdentity {
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommentItem {
    id: u64,
    body: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Membership {
    role: String,
}

impl GithubClient {
    pub fn new(token: impl Into<String>, api_base: Option<String>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("clagate/0.3")
            .build()
            .expect("failed to create http client");

        Self {
            http,
            api_base: api_base.unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            token: token.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base.trim_end_matches('/'), path)
    }

    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
    }

    async fn list_commits(&self, pr: &PrInfo) -> Result<Vec<CommitItem>, TrackerError> {
        let url = self.url(&format!(
            "/repos/{}/{}/pulls/{}/commits?per_page=100",
            pr.org, pr.repo, pr.number
        ));
        let response = self
            .authorized(self.http.get(&url))
            .send()
            .await
            .map_err(|err| TrackerError::Commits(err.to_string()))?;

        if !response.status().is_success() {
            return Err(TrackerError::Commits(format!(
                "GET {url} returned {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|err| TrackerError::Commits(err.to_string()))
    }

    async fn list_comments(&self, pr: &PrInfo) -> Result<Vec<CommentItem>, TrackerError> {
        let url = self.url(&format!(
            "/repos/{}/{}/issues/{}/comments?per_page=100",
            pr.org, pr.repo, pr.number
        ));
        let response = self
            .authorized(self.http.get(&url))
            .send()
            .await
            .map_err(|err| TrackerError::Comment(err.to_string()))?;

        if !response.status().is_success() {
            return Err(TrackerError::Comment(format!(
                "GET {url} returned {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|err| TrackerError::Comment(err.to_string()))
    }
}

#[async_trait]
impl IssueTrackerClient for GithubClient {
    async fn unsigned_commits(
        &self,
        pr: &PrInfo,
        check_by_committer: bool,
        is_signed: &SignedProbe,
    ) -> Result<UnsignedCommits, TrackerError> {
        let commits = self.list_commits(pr).await?;
        debug!(pr = %pr, commits = commits.len(), "checking commit signing status");

        let mut unsigned = UnsignedCommits::new();
        for item in commits {
            let identity = if check_by_committer {
                item.commit.committer.as_ref()
            } else {
                item.commit.author.as_ref()
            };

            // A commit without a resolvable identity cannot be verified and
            // counts as unsigned.
            let signed = match identity.and_then(|i| i.email.clone()) {
                Some(email) => is_signed(email).await,
                None => false,
            };

            if !signed {
                let title = item.commit.message.lines().next().unwrap_or_default();
                unsigned.insert(short_sha(&item.sha).to_string(), title.to_string());
            }
        }

        Ok(unsigned)
    }

    async fn add_pr_label(&self, pr: &PrInfo, label: &str) -> Result<(), TrackerError> {
        let url = self.url(&format!(
            "/repos/{}/{}/issues/{}/labels",
            pr.org, pr.repo, pr.number
        ));
        let response = self
            .authorized(self.http.post(&url))
            .json(&serde_json::json!({ "labels": [label] }))
            .send()
            .await
            .map_err(|err| TrackerError::Label(err.to_string()))?;

        if !response.status().is_success() {
            return Err(TrackerError::Label(format!(
                "POST {url} returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn remove_pr_label(&self, pr: &PrInfo, label: &str) -> Result<(), TrackerError> {
        let url = self.url(&format!(
            "/repos/{}/{}/issues/{}/labels/{}",
            pr.org, pr.repo, pr.number, label
        ));
        let response = self
            .authorized(self.http.delete(&url))
            .send()
            .await
            .map_err(|err| TrackerError::Label(err.to_string()))?;

        // Removing an already-absent label is not a failure.
        if !response.status().is_success() && response.status() != reqwest::StatusCode::NOT_FOUND {
            return Err(TrackerError::Label(format!(
                "DELETE {url} returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn create_pr_comment(&self, pr: &PrInfo, text: &str) -> Result<(), TrackerError> {
        let url = self.url(&format!(
            "/repos/{}/{}/issues/{}/comments",
            pr.org, pr.repo, pr.number
        ));
        let response = self
            .authorized(self.http.post(&url))
            .json(&serde_json::json!({ "body": text }))
            .send()
            .await
            .map_err(|err| TrackerError::Comment(err.to_string()))?;

        if !response.status().is_success() {
            return Err(TrackerError::Comment(format!(
                "POST {url} returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn delete_pr_comment(
        &self,
        pr: &PrInfo,
        matches: &CommentPredicate,
    ) -> Result<(), TrackerError> {
        let comments = self.list_comments(pr).await?;

        for comment in comments {
            let Some(body) = comment.body.as_deref() else {
                continue;
            };
            if !matches(body) {
                continue;
            }

            let url = self.url(&format!(
                "/repos/{}/{}/issues/comments/{}",
                pr.org, pr.repo, comment.id
            ));
            let response = self
                .authorized(self.http.delete(&url))
                .send()
                .await
                .map_err(|err| TrackerError::Comment(err.to_string()))?;

            if !response.status().is_success() {
                return Err(TrackerError::Comment(format!(
                    "DELETE {url} returned {}",
                    response.status()
                )));
            }
        }

        Ok(())
    }
}

#[async_trait]
impl OrgOwnership for GithubClient {
    async fn is_org_owner(&self, actor: &str, org_repo: &OrgRepo) -> Result<bool, AuthError> {
        let url = self.url(&format!(
            "/orgs/{}/memberships/{}",
            org_repo.org_id, actor
        ));
        let response = self
            .authorized(self.http.get(&url))
            .send()
            .await
            .map_err(|err| AuthError::Lookup(err.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !response.status().is_success() {
            return Err(AuthError::Lookup(format!(
                "GET {url} returned {}",
                response.status()
            )));
        }

        let membership: Membership = response
            .json()
            .await
            .map_err(|err| AuthError::Lookup(err.to_string()))?;
        Ok(membership.role == "admin")
    }
}

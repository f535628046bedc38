//! Shared test doubles: an in-memory signing store, a recording issue
//! tracker and simple ownership stubs.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use clagate::models::{ClaInfo, Link, OrgInfo, OrgRepo, PrInfo};
use clagate::services::{
    AuthError, CommentPredicate, IssueTrackerClient, OrgOwnership, SignedProbe, SigningStore,
    StoreError, TrackerError, UnsignedCommits, short_sha,
};

/// In-memory signing store.
#[derive(Default)]
pub struct MemSigningStore {
    inner: Mutex<MemState>,
}

#[derive(Default)]
struct MemState {
    links: HashMap<String, Link>,
    individual_inits: Vec<(String, Option<ClaInfo>)>,
    corp_inits: Vec<(String, String, Option<ClaInfo>)>,
    signed: HashSet<(String, String)>,
}

impl MemSigningStore {
    /// Record an individual signature for a CLA.
    pub fn sign(&self, cla_id: &str, email: &str) {
        self.inner
            .lock()
            .unwrap()
            .signed
            .insert((cla_id.to_string(), email.to_string()));
    }

    pub fn link_count(&self) -> usize {
        self.inner.lock().unwrap().links.len()
    }

    pub fn individual_init_count(&self) -> usize {
        self.inner.lock().unwrap().individual_inits.len()
    }

    pub fn corp_init_count(&self) -> usize {
        self.inner.lock().unwrap().corp_inits.len()
    }
}

#[async_trait]
impl SigningStore for MemSigningStore {
    async fn init_individual_signing(
        &self,
        link_id: &str,
        cla: Option<&ClaInfo>,
    ) -> Result<(), StoreError> {
        self.inner
            .lock()
            .unwrap()
            .individual_inits
            .push((link_id.to_string(), cla.cloned()));
        Ok(())
    }

    async fn init_corp_signing(
        &self,
        link_id: &str,
        org: &OrgInfo,
        cla: Option<&ClaInfo>,
    ) -> Result<(), StoreError> {
        self.inner.lock().unwrap().corp_inits.push((
            link_id.to_string(),
            org.org_email.clone(),
            cla.cloned(),
        ));
        Ok(())
    }

    async fn get_link_id(&self, org_repo: &OrgRepo) -> Result<String, StoreError> {
        self.inner
            .lock()
            .unwrap()
            .links
            .values()
            .find(|l| l.org_repo() == *org_repo)
            .map(|l| l.link_id.clone())
            .ok_or(StoreError::NoLink)
    }

    async fn get_link(&self, link_id: &str) -> Result<Link, StoreError> {
        self.inner
            .lock()
            .unwrap()
            .links
            .get(link_id)
            .cloned()
            .ok_or_else(|| StoreError::LinkNotFound(link_id.to_string()))
    }

    async fn create_link(
        &self,
        link_id: &str,
        org_repo: &OrgRepo,
        submitter: &str,
    ) -> Result<(), StoreError> {
        self.inner.lock().unwrap().links.insert(
            link_id.to_string(),
            Link {
                link_id: link_id.to_string(),
                platform: org_repo.platform.clone(),
                org_id: org_repo.org_id.clone(),
                repo_id: org_repo.repo_id.clone(),
                submitter: submitter.to_string(),
                created_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn unlink(&self, link_id: &str) -> Result<(), StoreError> {
        self.inner
            .lock()
            .unwrap()
            .links
            .remove(link_id)
            .map(|_| ())
            .ok_or_else(|| StoreError::LinkNotFound(link_id.to_string()))
    }

    async fn is_individual_signed(&self, cla_id: &str, email: &str) -> Result<bool, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .signed
            .contains(&(cla_id.to_string(), email.to_string())))
    }
}

/// A commit the recording tracker serves back to the engine.
#[derive(Debug, Clone)]
pub struct TestCommit {
    pub sha: String,
    pub author_email: Option<String>,
    pub committer_email: Option<String>,
    pub message: String,
}

impl TestCommit {
    pub fn authored(sha: &str, email: &str, message: &str) -> Self {
        Self {
            sha: sha.to_string(),
            author_email: Some(email.to_string()),
            committer_email: Some("bot@platform.example".to_string()),
            message: message.to_string(),
        }
    }
}

/// Issue-tracker double that applies label/comment mutations to in-memory
/// state so tests can assert on the converged PR.
#[derive(Default)]
pub struct RecordingTracker {
    pub commits: Mutex<Vec<TestCommit>>,
    labels: Mutex<HashSet<String>>,
    comments: Mutex<Vec<String>>,
    delete_calls: Mutex<usize>,
    pub fail_label_mutations: bool,
}

impl RecordingTracker {
    pub fn with_commits(commits: Vec<TestCommit>) -> Self {
        Self {
            commits: Mutex::new(commits),
            ..Self::default()
        }
    }

    /// Make every label mutation fail, for best-effort convergence tests.
    pub fn failing_labels(mut self) -> Self {
        self.fail_label_mutations = true;
        self
    }

    /// Snapshot of the labels currently on the PR.
    pub fn labels(&self) -> HashSet<String> {
        self.labels.lock().unwrap().clone()
    }

    /// Snapshot of the live comments on the PR.
    pub fn comments(&self) -> Vec<String> {
        self.comments.lock().unwrap().clone()
    }

    pub fn delete_calls(&self) -> usize {
        *self.delete_calls.lock().unwrap()
    }
}

#[async_trait]
impl IssueTrackerClient for RecordingTracker {
    async fn unsigned_commits(
        &self,
        _pr: &PrInfo,
        check_by_committer: bool,
        is_signed: &SignedProbe,
    ) -> Result<UnsignedCommits, TrackerError> {
        let commits = self.commits.lock().unwrap().clone();

        let mut unsigned = UnsignedCommits::new();
        for commit in commits {
            let email = if check_by_committer {
                commit.committer_email.clone()
            } else {
                commit.author_email.clone()
            };

            let signed = match email {
                Some(email) => is_signed(email).await,
                None => false,
            };

            if !signed {
                unsigned.insert(short_sha(&commit.sha).to_string(), commit.message.clone());
            }
        }

        Ok(unsigned)
    }

    async fn add_pr_label(&self, _pr: &PrInfo, label: &str) -> Result<(), TrackerError> {
        if self.fail_label_mutations {
            return Err(TrackerError::Label("injected failure".to_string()));
        }
        self.labels.lock().unwrap().insert(label.to_string());
        Ok(())
    }

    async fn remove_pr_label(&self, _pr: &PrInfo, label: &str) -> Result<(), TrackerError> {
        if self.fail_label_mutations {
            return Err(TrackerError::Label("injected failure".to_string()));
        }
        self.labels.lock().unwrap().remove(label);
        Ok(())
    }

    async fn create_pr_comment(&self, _pr: &PrInfo, text: &str) -> Result<(), TrackerError> {
        self.comments.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn delete_pr_comment(
        &self,
        _pr: &PrInfo,
        matches: &CommentPredicate,
    ) -> Result<(), TrackerError> {
        *self.delete_calls.lock().unwrap() += 1;
        self.comments.lock().unwrap().retain(|c| !matches(c));
        Ok(())
    }
}

/// Ownership stub: `owner` owns every org, nobody else owns anything.
pub struct SingleOwner {
    pub owner: String,
}

impl SingleOwner {
    pub fn new(owner: &str) -> Self {
        Self {
            owner: owner.to_string(),
        }
    }
}

#[async_trait]
impl OrgOwnership for SingleOwner {
    async fn is_org_owner(&self, actor: &str, _org_repo: &OrgRepo) -> Result<bool, AuthError> {
        Ok(actor == self.owner)
    }
}

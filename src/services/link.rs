//! Link Creation Orchestrator
//!
//! Turns a validated creation request into a durable link between an
//! org/repo scope and its CLA documents, under a per-scope exclusive lock.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::models::{ApplyTo, LinkCreateOption, OrgRepo, ValidationError};
use crate::services::authorizer::{AuthError, OrgOwnership};
use crate::services::document_store::DocumentStore;
use crate::services::scope_lock::ScopeLock;
use crate::services::signing_store::{SigningStore, StoreError};

/// Errors from link creation and removal.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("user {user} is not an owner of org {org}")]
    NotOrgOwner { user: String, org: String },

    #[error("a link already exists for {0}")]
    LinkExists(String),

    #[error("link not found: {0}")]
    LinkNotFound(String),

    #[error("ownership lookup failed: {0}")]
    Auth(#[from] AuthError),

    #[error("failed to acquire scope lock: {0}")]
    Lock(std::io::Error),

    #[error("failed to store cla document: {0}")]
    Document(std::io::Error),

    #[error("signing store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for LinkError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::LinkNotFound(id) => Self::LinkNotFound(id),
            other => Self::Store(other),
        }
    }
}

impl LinkError {
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotOrgOwner { .. } => "NOT_ORG_OWNER",
            Self::LinkExists(_) => "LINK_EXISTS",
            Self::LinkNotFound(_) => "LINK_NOT_FOUND",
            Self::Auth(_) | Self::Lock(_) | Self::Document(_) | Self::Store(_) => "SYSTEM_ERROR",
        }
    }

    /// Get the HTTP status code for this error
    #[must_use]
    pub fn status_code(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotOrgOwner { .. } => StatusCode::FORBIDDEN,
            Self::LinkExists(_) => StatusCode::CONFLICT,
            Self::LinkNotFound(_) => StatusCode::NOT_FOUND,
            Self::Auth(_) | Self::Lock(_) | Self::Document(_) | Self::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Orchestrates link creation and removal.
#[derive(Clone)]
pub struct LinkService {
    store: Arc<dyn SigningStore>,
    auth: Arc<dyn OrgOwnership>,
    documents: DocumentStore,
    lock_dir: PathBuf,
    supported_languages: HashSet<String>,
}

impl LinkService {
    pub fn new(
        store: Arc<dyn SigningStore>,
        auth: Arc<dyn OrgOwnership>,
        documents: DocumentStore,
        lock_dir: impl Into<PathBuf>,
        supported_languages: HashSet<String>,
    ) -> Self {
        Self {
            store,
            auth,
            documents,
            lock_dir: lock_dir.into(),
            supported_languages,
        }
    }

    /// Create a link between an org/repo scope and its CLA documents.
    ///
    /// `org_signature` carries the uploaded countersignature image for the
    /// corporate CLA; it is attached to the sub-document before validation.
    ///
    /// Concurrent calls for the same scope are serialized by an exclusive
    /// lock derived from the scope, so the second caller observes the
    /// winner's link record and fails with [`LinkError::LinkExists`]. There
    /// is no rollback of documents or signing state written before a later
    /// step fails; a retried call overwrites them idempotently.
    pub async fn create_link(
        &self,
        mut input: LinkCreateOption,
        org_signature: Option<Vec<u8>>,
        actor: &str,
    ) -> Result<String, LinkError> {
        if let (Some(cla), Some(image)) = (input.corp_cla.as_mut(), org_signature) {
            cla.set_org_signature(image);
        }
        input.validate(&self.supported_languages)?;

        let org_repo = input.org_repo();
        if !self.auth.is_org_owner(actor, &org_repo).await? {
            return Err(LinkError::NotOrgOwner {
                user: actor.to_string(),
                org: input.org_id.clone(),
            });
        }

        // Blocking acquisition happens off the async workers; the guard is
        // held until every durable step below has finished.
        let lock_dir = self.lock_dir.clone();
        let scope = org_repo.clone();
        let _guard = tokio::task::spawn_blocking(move || ScopeLock::acquire(&lock_dir, &scope))
            .await
            .map_err(|err| LinkError::Lock(std::io::Error::other(err)))?
            .map_err(LinkError::Lock)?;

        // Check-then-act is safe only because the lock above serializes all
        // creation attempts for this scope.
        match self.store.get_link_id(&org_repo).await {
            Ok(_) => return Err(LinkError::LinkExists(org_repo.to_string())),
            Err(StoreError::NoLink) => {}
            Err(err) => return Err(err.into()),
        }

        let link_id = gen_link_id(&org_repo);
        self.write_documents(&input, &link_id)?;
        self.initialize_signing(&input, &link_id).await?;
        self.store.create_link(&link_id, &org_repo, actor).await?;

        info!(link_id = %link_id, scope = %org_repo, submitter = actor, "created cla link");
        Ok(link_id)
    }

    /// Remove a link.
    ///
    /// Gated on the actor owning the link's organization. No lock is taken:
    /// a lost delete race surfaces as [`LinkError::LinkNotFound`], it cannot
    /// corrupt anything.
    pub async fn unlink(&self, link_id: &str, actor: &str) -> Result<(), LinkError> {
        let link = self.store.get_link(link_id).await?;
        let org_repo = link.org_repo();
        if !self.auth.is_org_owner(actor, &org_repo).await? {
            return Err(LinkError::NotOrgOwner {
                user: actor.to_string(),
                org: link.org_id.clone(),
            });
        }

        self.store.unlink(link_id).await?;
        info!(link_id = link_id, scope = %org_repo, "removed cla link");
        Ok(())
    }

    fn write_documents(&self, input: &LinkCreateOption, link_id: &str) -> Result<(), LinkError> {
        if let Some(cla) = &input.corp_cla {
            self.documents
                .save_cla(link_id, ApplyTo::Corporation, cla)
                .map_err(LinkError::Document)?;
            self.documents
                .save_org_signature(link_id, cla)
                .map_err(LinkError::Document)?;
        }

        if let Some(cla) = &input.individual_cla {
            self.documents
                .save_cla(link_id, ApplyTo::Individual, cla)
                .map_err(LinkError::Document)?;
        }

        Ok(())
    }

    async fn initialize_signing(
        &self,
        input: &LinkCreateOption,
        link_id: &str,
    ) -> Result<(), LinkError> {
        let info = input.individual_cla.as_ref().map(|c| c.cla_info());
        self.store
            .init_individual_signing(link_id, info.as_ref())
            .await?;

        let info = input.corp_cla.as_ref().map(|c| c.cla_info());
        self.store
            .init_corp_signing(link_id, &input.org_info(), info.as_ref())
            .await?;

        Ok(())
    }
}

/// Generate a link id from the scope. Uniqueness across the store is the
/// only required property; the scope prefix keeps artifacts recognizable
/// on disk.
fn gen_link_id(org_repo: &OrgRepo) -> String {
    format!("{}_{}", org_repo.scope_key(), Uuid::new_v4().simple())
}

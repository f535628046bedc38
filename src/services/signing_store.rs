//! Signing Store interface and Postgres implementation
//!
//! The store is the durable record of which identities have signed which CLA
//! and of the links the orchestrator creates. The core consumes it through
//! the [`SigningStore`] trait; [`PgSigningStore`] is the production backend.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use thiserror::Error;

use crate::models::{ClaInfo, Link, OrgInfo, OrgRepo};

/// Errors surfaced by the signing store.
///
/// A closed enumeration: callers distinguish cases by matching variants,
/// `NoLink` in particular is part of the orchestrator's control flow.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No link exists for the queried scope.
    #[error("no link found for this scope")]
    NoLink,

    /// No link record exists for the given link id.
    #[error("link not found: {0}")]
    LinkNotFound(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NoLink => "NO_LINK",
            Self::LinkNotFound(_) => "LINK_NOT_FOUND",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }
}

/// Durable record of CLA links and signing state.
#[async_trait]
pub trait SigningStore: Send + Sync {
    /// Initialize individual-signing state for a new link. `cla` is absent
    /// when the link carries only a corporate CLA.
    async fn init_individual_signing(
        &self,
        link_id: &str,
        cla: Option<&ClaInfo>,
    ) -> Result<(), StoreError>;

    /// Initialize corporate-signing state for a new link, carrying the
    /// organization's identity. `cla` is absent when the link carries only
    /// an individual CLA.
    async fn init_corp_signing(
        &self,
        link_id: &str,
        org: &OrgInfo,
        cla: Option<&ClaInfo>,
    ) -> Result<(), StoreError>;

    /// Look up the link id for a scope. Returns [`StoreError::NoLink`] when
    /// none exists.
    async fn get_link_id(&self, org_repo: &OrgRepo) -> Result<String, StoreError>;

    /// Fetch a link record by id.
    async fn get_link(&self, link_id: &str) -> Result<Link, StoreError>;

    /// Durably record a link. After this returns, `get_link_id` on the same
    /// scope observes the link.
    async fn create_link(
        &self,
        link_id: &str,
        org_repo: &OrgRepo,
        submitter: &str,
    ) -> Result<(), StoreError>;

    /// Remove a link record. Signing history keyed by CLA id is retained.
    async fn unlink(&self, link_id: &str) -> Result<(), StoreError>;

    /// Whether `email` has individually signed the CLA identified by `cla_id`.
    async fn is_individual_signed(&self, cla_id: &str, email: &str) -> Result<bool, StoreError>;
}

/// Postgres-backed signing store.
#[derive(Debug, Clone)]
pub struct PgSigningStore {
    pool: PgPool,
}

impl PgSigningStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SigningStore for PgSigningStore {
    async fn init_individual_signing(
        &self,
        link_id: &str,
        cla: Option<&ClaInfo>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO signing_state (link_id, apply_to, cla_id, cla_language, cla_fields, created_at)
            VALUES ($1, 'individual', $2, $3, $4, $5)
            ON CONFLICT (link_id, apply_to) DO UPDATE
                SET cla_id = EXCLUDED.cla_id,
                    cla_language = EXCLUDED.cla_language,
                    cla_fields = EXCLUDED.cla_fields
            "#,
        )
        .bind(link_id)
        .bind(cla.map(|c| c.cla_id.as_str()))
        .bind(cla.map(|c| c.language.as_str()))
        .bind(cla.map(|c| c.fields.clone()))
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn init_corp_signing(
        &self,
        link_id: &str,
        org: &OrgInfo,
        cla: Option<&ClaInfo>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO signing_state
                (link_id, apply_to, cla_id, cla_language, cla_fields,
                 org_email, org_alias, created_at)
            VALUES ($1, 'corporation', $2, $3, $4, $5, $6, $7)
            ON CONFLICT (link_id, apply_to) DO UPDATE
                SET cla_id = EXCLUDED.cla_id,
                    cla_language = EXCLUDED.cla_language,
                    cla_fields = EXCLUDED.cla_fields,
                    org_email = EXCLUDED.org_email,
                    org_alias = EXCLUDED.org_alias
            "#,
        )
        .bind(link_id)
        .bind(cla.map(|c| c.cla_id.as_str()))
        .bind(cla.map(|c| c.language.as_str()))
        .bind(cla.map(|c| c.fields.clone()))
        .bind(&org.org_email)
        .bind(&org.org_alias)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_link_id(&self, org_repo: &OrgRepo) -> Result<String, StoreError> {
        let link_id: Option<String> = sqlx::query_scalar(
            r#"
            SELECT link_id FROM links
            WHERE platform = $1 AND org_id = $2 AND repo_id = $3
            "#,
        )
        .bind(&org_repo.platform)
        .bind(&org_repo.org_id)
        .bind(&org_repo.repo_id)
        .fetch_optional(&self.pool)
        .await?;

        link_id.ok_or(StoreError::NoLink)
    }

    async fn get_link(&self, link_id: &str) -> Result<Link, StoreError> {
        let link = sqlx::query_as::<_, Link>(
            r#"
            SELECT link_id, platform, org_id, repo_id, submitter, created_at
            FROM links
            WHERE link_id = $1
            "#,
        )
        .bind(link_id)
        .fetch_optional(&self.pool)
        .await?;

        link.ok_or_else(|| StoreError::LinkNotFound(link_id.to_string()))
    }

    async fn create_link(
        &self,
        link_id: &str,
        org_repo: &OrgRepo,
        submitter: &str,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO links (link_id, platform, org_id, repo_id, submitter, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(link_id)
        .bind(&org_repo.platform)
        .bind(&org_repo.org_id)
        .bind(&org_repo.repo_id)
        .bind(submitter)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn unlink(&self, link_id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM links WHERE link_id = $1")
            .bind(link_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::LinkNotFound(link_id.to_string()));
        }

        sqlx::query("DELETE FROM signing_state WHERE link_id = $1")
            .bind(link_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn is_individual_signed(&self, cla_id: &str, email: &str) -> Result<bool, StoreError> {
        let signed: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM individual_signatures
                WHERE cla_id = $1 AND email = $2
            )
            "#,
        )
        .bind(cla_id)
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        Ok(signed)
    }
}

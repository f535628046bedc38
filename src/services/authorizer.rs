//! Organization-ownership checks
//!
//! Link creation and removal are gated on the acting user owning the target
//! organization. The check is delegated to the platform through this trait
//! and treated as a hard precondition; no mutation happens before it passes.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::OrgRepo;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("ownership lookup failed: {0}")]
    Lookup(String),
}

/// Decides whether an acting user owns an organization on a platform.
#[async_trait]
pub trait OrgOwnership: Send + Sync {
    async fn is_org_owner(&self, actor: &str, org_repo: &OrgRepo) -> Result<bool, AuthError>;
}

//! clagate - CLA gating for code contributions
//!
//! This library provides the core services and models for linking org/repo
//! scopes to CLA documents and reconciling pull-request signing status.

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::AppError;

// Re-export specific items to avoid ambiguous glob re-exports
pub use models::{
    ApplyTo, ClaConfigSnapshot, ClaDocument, ClaField, ClaInfo, ClaRepoConfig, Link,
    LinkCreateOption, OrgInfo, OrgRepo, PrInfo, ValidationError,
};

pub use services::{
    AuthError, ClaReconciler, DocumentStore, GithubClient, IssueTrackerClient, LinkError,
    LinkService, OrgOwnership, PgSigningStore, ReconcileError, ScopeLock, SignedProbe,
    SigningStore, StoreError, TrackerError, UnsignedCommits,
};

/// Application state shared across handlers
pub struct AppState {
    pub config: Config,
    pub links: LinkService,
    pub cla: ClaReconciler,
    pub repo_config: ClaConfigSnapshot,
}

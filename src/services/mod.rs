pub mod authorizer;
pub mod document_store;
pub mod github;
pub mod issue_tracker;
pub mod link;
pub mod reconciliation;
pub mod scope_lock;
pub mod signing_store;

pub use authorizer::{AuthError, OrgOwnership};
pub use document_store::DocumentStore;
pub use github::GithubClient;
pub use issue_tracker::{
    CommentPredicate, IssueTrackerClient, MAX_SHA_LEN, SignedProbe, TrackerError, UnsignedCommits,
    short_sha,
};
pub use link::{LinkError, LinkService};
pub use reconciliation::{
    ClaReconciler, ReconcileError, SIGN_GUIDE_TITLE, SIGN_GUIDE_TITLE_LEGACY, is_check_cla_command,
    is_sign_guide,
};
pub use scope_lock::ScopeLock;
pub use signing_store::{PgSigningStore, SigningStore, StoreError};

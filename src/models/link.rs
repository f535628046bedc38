//! Link model and related types
//!
//! A link binds an org/repo scope on a code-hosting platform to one or two
//! CLA documents (individual and/or corporate) and is the unit the
//! orchestrator creates and removes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::FromRow;
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Which kind of signer a CLA document applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplyTo {
    Individual,
    Corporation,
}

impl ApplyTo {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Individual => "individual",
            Self::Corporation => "corporation",
        }
    }
}

impl fmt::Display for ApplyTo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies the scope a link applies to.
///
/// An empty `repo_id` denotes an org-wide link. The scope is the key for
/// both the creation lock and the signing store's per-scope lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgRepo {
    pub platform: String,
    pub org_id: String,
    #[serde(default)]
    pub repo_id: String,
}

impl OrgRepo {
    pub fn new(
        platform: impl Into<String>,
        org_id: impl Into<String>,
        repo_id: impl Into<String>,
    ) -> Self {
        Self {
            platform: platform.into(),
            org_id: org_id.into(),
            repo_id: repo_id.into(),
        }
    }

    /// Filesystem-safe key for lock paths and link IDs.
    #[must_use]
    pub fn scope_key(&self) -> String {
        if self.repo_id.is_empty() {
            format!("{}_{}", self.platform, self.org_id)
        } else {
            format!("{}_{}_{}", self.platform, self.org_id, self.repo_id)
        }
    }
}

impl fmt::Display for OrgRepo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.repo_id.is_empty() {
            write!(f, "{}/{}", self.platform, self.org_id)
        } else {
            write!(f, "{}/{}/{}", self.platform, self.org_id, self.repo_id)
        }
    }
}

/// A field a signer must fill in when signing a CLA
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaField {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub required: bool,
}

/// One CLA document in a creation request.
///
/// For corporate CLAs the organization's uploaded countersignature image is
/// attached before validation; it never travels inside the JSON payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaDocument {
    pub language: String,
    pub text: String,
    #[serde(default)]
    pub fields: Vec<ClaField>,
    #[serde(skip)]
    pub org_signature: Option<Vec<u8>>,
}

impl ClaDocument {
    /// Attach the organization's uploaded countersignature image.
    pub fn set_org_signature(&mut self, image: Vec<u8>) {
        self.org_signature = Some(image);
    }

    /// Derive the read-only summary handed to the signing store.
    ///
    /// The document identifier is a content hash, so re-uploading identical
    /// text yields the same CLA id.
    #[must_use]
    pub fn cla_info(&self) -> ClaInfo {
        ClaInfo {
            cla_id: format!("{:x}", Sha256::digest(self.text.as_bytes())),
            language: self.language.clone(),
            fields: self.fields.iter().map(|f| f.id.clone()).collect(),
        }
    }
}

/// Derived summary of a CLA document, owned by the document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaInfo {
    pub cla_id: String,
    pub language: String,
    pub fields: Vec<String>,
}

/// Organization identity handed to the signing store at corp initialization
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgInfo {
    #[serde(flatten)]
    pub org_repo: OrgRepo,
    pub org_email: String,
    pub org_alias: String,
}

/// A field-level validation failure on a creation request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Request payload for link creation
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkCreateOption {
    pub platform: String,
    pub org_id: String,
    #[serde(default)]
    pub repo_id: String,
    pub org_email: String,
    #[serde(default)]
    pub org_alias: String,
    #[serde(default)]
    pub individual_cla: Option<ClaDocument>,
    #[serde(default)]
    pub corp_cla: Option<ClaDocument>,
}

impl LinkCreateOption {
    #[must_use]
    pub fn org_repo(&self) -> OrgRepo {
        OrgRepo::new(&self.platform, &self.org_id, &self.repo_id)
    }

    #[must_use]
    pub fn org_info(&self) -> OrgInfo {
        OrgInfo {
            org_repo: self.org_repo(),
            org_email: self.org_email.clone(),
            org_alias: self.org_alias.clone(),
        }
    }

    /// Structural validation of the creation request.
    ///
    /// Any uploaded corporate countersignature must be attached before this
    /// is called; a corporate CLA without one is rejected here.
    pub fn validate(&self, supported_languages: &HashSet<String>) -> Result<(), ValidationError> {
        if self.platform.is_empty() {
            return Err(ValidationError::new("platform", "must not be empty"));
        }
        if self.org_id.is_empty() {
            return Err(ValidationError::new("orgId", "must not be empty"));
        }
        if self.org_email.is_empty() || !self.org_email.contains('@') {
            return Err(ValidationError::new(
                "orgEmail",
                "must be a valid email address",
            ));
        }
        if self.individual_cla.is_none() && self.corp_cla.is_none() {
            return Err(ValidationError::new(
                "individualCla",
                "at least one of individualCla/corpCla is required",
            ));
        }

        if let Some(cla) = &self.individual_cla {
            validate_cla("individualCla", cla, supported_languages)?;
        }
        if let Some(cla) = &self.corp_cla {
            validate_cla("corpCla", cla, supported_languages)?;
            if cla.org_signature.is_none() {
                return Err(ValidationError::new(
                    "corpCla",
                    "missing the organization's signature image",
                ));
            }
        }

        Ok(())
    }
}

fn validate_cla(
    field: &'static str,
    cla: &ClaDocument,
    supported_languages: &HashSet<String>,
) -> Result<(), ValidationError> {
    if cla.text.is_empty() {
        return Err(ValidationError::new(field, "cla text must not be empty"));
    }
    if !supported_languages.contains(&cla.language.to_lowercase()) {
        return Err(ValidationError::new(
            field,
            format!("unsupported language: {}", cla.language),
        ));
    }
    for f in &cla.fields {
        if f.id.is_empty() || f.title.is_empty() {
            return Err(ValidationError::new(field, "cla field with empty id or title"));
        }
    }
    Ok(())
}

/// A durably recorded link
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Link {
    pub link_id: String,
    pub platform: String,
    pub org_id: String,
    pub repo_id: String,
    pub submitter: String,
    pub created_at: DateTime<Utc>,
}

impl Link {
    #[must_use]
    pub fn org_repo(&self) -> OrgRepo {
        OrgRepo::new(&self.platform, &self.org_id, &self.repo_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn languages() -> HashSet<String> {
        ["english".to_string(), "chinese".to_string()]
            .into_iter()
            .collect()
    }

    fn individual_cla() -> ClaDocument {
        ClaDocument {
            language: "english".to_string(),
            text: "I hereby agree ...".to_string(),
            fields: vec![ClaField {
                id: "email".to_string(),
                title: "Email".to_string(),
                required: true,
            }],
            org_signature: None,
        }
    }

    fn option_with(individual: Option<ClaDocument>, corp: Option<ClaDocument>) -> LinkCreateOption {
        LinkCreateOption {
            platform: "github".to_string(),
            org_id: "orgA".to_string(),
            repo_id: "repo1".to_string(),
            org_email: "legal@orga.example".to_string(),
            org_alias: "Org A".to_string(),
            individual_cla: individual,
            corp_cla: corp,
        }
    }

    #[test]
    fn org_repo_scope_key_omits_empty_repo() {
        let org_wide = OrgRepo::new("github", "orgA", "");
        assert_eq!(org_wide.scope_key(), "github_orgA");
        assert_eq!(org_wide.to_string(), "github/orgA");

        let scoped = OrgRepo::new("github", "orgA", "repo1");
        assert_eq!(scoped.scope_key(), "github_orgA_repo1");
        assert_eq!(scoped.to_string(), "github/orgA/repo1");
    }

    #[test]
    fn validate_accepts_individual_only() {
        let input = option_with(Some(individual_cla()), None);
        assert!(input.validate(&languages()).is_ok());
    }

    #[test]
    fn validate_requires_at_least_one_cla() {
        let input = option_with(None, None);
        let err = input.validate(&languages()).unwrap_err();
        assert_eq!(err.field, "individualCla");
    }

    #[test]
    fn validate_rejects_unsupported_language() {
        let mut cla = individual_cla();
        cla.language = "klingon".to_string();
        let input = option_with(Some(cla), None);
        let err = input.validate(&languages()).unwrap_err();
        assert_eq!(err.field, "individualCla");
        assert!(err.reason.contains("unsupported language"));
    }

    #[test]
    fn validate_rejects_corp_cla_without_signature() {
        let input = option_with(None, Some(individual_cla()));
        let err = input.validate(&languages()).unwrap_err();
        assert_eq!(err.field, "corpCla");
        assert!(err.reason.contains("signature"));
    }

    #[test]
    fn validate_accepts_corp_cla_with_signature() {
        let mut cla = individual_cla();
        cla.set_org_signature(vec![0x89, 0x50, 0x4e, 0x47]);
        let input = option_with(None, Some(cla));
        assert!(input.validate(&languages()).is_ok());
    }

    #[test]
    fn validate_rejects_bad_email() {
        let mut input = option_with(Some(individual_cla()), None);
        input.org_email = "not-an-email".to_string();
        let err = input.validate(&languages()).unwrap_err();
        assert_eq!(err.field, "orgEmail");
    }

    #[test]
    fn cla_info_is_stable_for_identical_text() {
        let a = individual_cla().cla_info();
        let b = individual_cla().cla_info();
        assert_eq!(a.cla_id, b.cla_id);
        assert_eq!(a.language, "english");
        assert_eq!(a.fields, vec!["email".to_string()]);
    }
}

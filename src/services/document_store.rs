//! Local CLA document storage
//!
//! Write-only file layout for CLA artifacts, addressed by
//! `(link_id, apply_to, language)`:
//!
//! ```text
//! {root}/{link_id}/individual/{language}.md
//! {root}/{link_id}/corporation/{language}.md
//! {root}/{link_id}/corporation/{language}-signature.png
//! ```
//!
//! Writes overwrite any previous content, so a retried creation after a
//! partial failure converges on the same files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::models::{ApplyTo, ClaDocument};

/// File store for CLA texts and corporate countersignature images.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    root: PathBuf,
}

impl DocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn cla_path(&self, link_id: &str, apply_to: ApplyTo, language: &str) -> PathBuf {
        self.root
            .join(link_id)
            .join(apply_to.as_str())
            .join(format!("{}.md", language.to_lowercase()))
    }

    #[must_use]
    pub fn org_signature_path(&self, link_id: &str, language: &str) -> PathBuf {
        self.root
            .join(link_id)
            .join(ApplyTo::Corporation.as_str())
            .join(format!("{}-signature.png", language.to_lowercase()))
    }

    /// Persist a CLA text.
    pub fn save_cla(
        &self,
        link_id: &str,
        apply_to: ApplyTo,
        cla: &ClaDocument,
    ) -> io::Result<PathBuf> {
        let path = self.cla_path(link_id, apply_to, &cla.language);
        write_file(&path, cla.text.as_bytes())?;
        Ok(path)
    }

    /// Persist the organization's countersignature image of a corporate CLA.
    pub fn save_org_signature(&self, link_id: &str, cla: &ClaDocument) -> io::Result<PathBuf> {
        let image = cla.org_signature.as_deref().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "corporate cla has no signature image attached",
            )
        })?;
        let path = self.org_signature_path(link_id, &cla.language);
        write_file(&path, image)?;
        Ok(path)
    }
}

fn write_file(path: &Path, content: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ClaField;
    use tempfile::tempdir;

    fn cla(language: &str) -> ClaDocument {
        ClaDocument {
            language: language.to_string(),
            text: "agreement text".to_string(),
            fields: vec![ClaField {
                id: "email".to_string(),
                title: "Email".to_string(),
                required: true,
            }],
            org_signature: Some(vec![1, 2, 3]),
        }
    }

    #[test]
    fn paths_are_derived_from_link_apply_to_and_language() {
        let store = DocumentStore::new("/srv/cla");
        assert_eq!(
            store.cla_path("link-1", ApplyTo::Individual, "English"),
            PathBuf::from("/srv/cla/link-1/individual/english.md")
        );
        assert_eq!(
            store.org_signature_path("link-1", "English"),
            PathBuf::from("/srv/cla/link-1/corporation/english-signature.png")
        );
    }

    #[test]
    fn save_cla_writes_text_and_overwrites_on_retry() {
        let dir = tempdir().expect("tempdir");
        let store = DocumentStore::new(dir.path());

        let path = store
            .save_cla("link-1", ApplyTo::Corporation, &cla("english"))
            .expect("first write");
        assert_eq!(fs::read_to_string(&path).expect("read"), "agreement text");

        let mut updated = cla("english");
        updated.text = "revised text".to_string();
        store
            .save_cla("link-1", ApplyTo::Corporation, &updated)
            .expect("overwrite");
        assert_eq!(fs::read_to_string(&path).expect("reread"), "revised text");
    }

    #[test]
    fn save_org_signature_requires_attached_image() {
        let dir = tempdir().expect("tempdir");
        let store = DocumentStore::new(dir.path());

        let mut unsigned = cla("english");
        unsigned.org_signature = None;
        assert!(store.save_org_signature("link-1", &unsigned).is_err());

        let path = store
            .save_org_signature("link-1", &cla("english"))
            .expect("write image");
        assert_eq!(fs::read(path).expect("read image"), vec![1, 2, 3]);
    }
}

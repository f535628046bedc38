//! Scope-derived exclusive file locks
//!
//! One lock file per `(platform, org, repo)` scope serializes concurrent link
//! creation for that scope while leaving other scopes fully concurrent. The
//! file's content is irrelevant; it exists purely as a lock primitive.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::models::OrgRepo;

/// An exclusive lock on a link-creation scope, released on drop.
#[derive(Debug)]
pub struct ScopeLock {
    file: File,
    path: PathBuf,
}

impl ScopeLock {
    /// Deterministic lock path for a scope.
    #[must_use]
    pub fn lock_path(dir: &Path, org_repo: &OrgRepo) -> PathBuf {
        dir.join(format!("{}.lock", org_repo.scope_key()))
    }

    /// Create the lock file if absent and take a blocking exclusive lock.
    ///
    /// Blocks the calling thread until the lock is granted; callers on an
    /// async runtime should wrap this in a blocking task.
    pub fn acquire(dir: &Path, org_repo: &OrgRepo) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let path = Self::lock_path(dir, org_repo);
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)?;
        file.lock_exclusive()?;
        Ok(Self { file, path })
    }

    /// Take the lock only if it is free.
    pub fn try_acquire(dir: &Path, org_repo: &OrgRepo) -> io::Result<Option<Self>> {
        fs::create_dir_all(dir)?;
        let path = Self::lock_path(dir, org_repo);
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self { file, path })),
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(err) => Err(err),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScopeLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

//! On-disk clone cache.
//!
//! Each reference gets `{root}/{owner-name@ref}` holding a working tree, and a
//! sibling `{owner-name@ref}.lock` that is held exclusively for as long as the
//! entry is being validated, cloned or resolved. An entry is reused only when
//! the commit it has checked out equals the commit git just fetched for the
//! reference; anything else is deleted and cloned again.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::debug;

use super::{Vcs, FETCH_HEAD_COMMIT};
use crate::error::{Error, Result};
use crate::reference::RepoReference;

/// Exclusive hold on one cache entry. Released on drop.
#[derive(Debug)]
pub struct EntryLock {
    _file: File,
    path: PathBuf,
}

impl EntryLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

pub fn entry_path(root: &Path, reference: &RepoReference) -> PathBuf {
    root.join(reference.cache_key())
}

fn lock_path(root: &Path, reference: &RepoReference) -> PathBuf {
    root.join(format!("{}.lock", reference.cache_key()))
}

/// Block until the entry for `reference` is ours.
///
/// Works across processes sharing `root` as well as across tasks in this one.
pub async fn lock_entry(root: &Path, reference: &RepoReference) -> Result<EntryLock> {
    let path = lock_path(root, reference);
    let root = root.to_path_buf();

    let locked = tokio::task::spawn_blocking(move || {
        let acquire = || -> std::io::Result<File> {
            std::fs::create_dir_all(&root)?;
            let file = OpenOptions::new()
                .create(true)
                .read(true)
                .write(true)
                .truncate(false)
                .open(&path)?;
            file.lock_exclusive()?;
            Ok(file)
        };
        match acquire() {
            Ok(file) => Ok(EntryLock { _file: file, path }),
            Err(source) => Err(Error::CacheLock { path, source }),
        }
    })
    .await
    .map_err(|e| Error::io("waiting for cache lock", std::io::Error::other(e.to_string())))?;

    if let Ok(lock) = &locked {
        debug!("Locked cache entry {}", lock.path().display());
    }
    locked
}

/// Check whether the working tree at `directory` may be reused for `reference`,
/// refreshing it from origin on the way.
///
/// `Head` fetches the remote's default branch, checks it out and is a hit
/// after any successful fetch. Other references must check out to exactly the fetched commit.
/// Every failure counts as a miss.
pub async fn validate_entry(vcs: &dyn Vcs, directory: &Path, reference: &RepoReference) -> bool {
    if !vcs.is_repository(directory) {
        debug!("{} is not a git working tree", directory.display());
        return false;
    }

    match check_revision(vcs, directory, reference).await {
        Ok(true) => true,
        Ok(false) => {
            debug!("Cached checkout of {} is stale", reference);
            false
        }
        Err(e) => {
            debug!("Cache validation for {} failed: {}", reference, e);
            false
        }
    }
}

async fn check_revision(vcs: &dyn Vcs, directory: &Path, reference: &RepoReference) -> Result<bool> {
    if reference.version.is_head() {
        // A bare fetch from a detached HEAD puts an arbitrary branch first in
        // FETCH_HEAD; naming the remote HEAD pins it to the default branch.
        vcs.fetch(directory, Some("HEAD")).await?;
        vcs.checkout(directory, "FETCH_HEAD").await?;
        return Ok(true);
    }

    let git_reference = reference.git_reference();
    vcs.fetch(directory, Some(git_reference)).await?;
    vcs.checkout(directory, git_reference).await?;

    let checked_out = vcs.rev_parse(directory, "HEAD").await?;
    let target = vcs.rev_parse(directory, FETCH_HEAD_COMMIT).await?;
    debug!("{}: checked out {}, target {}", reference, checked_out, target);

    Ok(checked_out == target)
}

/// Remove a cache entry that failed validation.
pub async fn evict(directory: &Path) -> Result<()> {
    if directory.exists() {
        debug!("Removing cache entry {}", directory.display());
        tokio::fs::remove_dir_all(directory)
            .await
            .map_err(|e| Error::io(format!("removing {}", directory.display()), e))?;
    }
    Ok(())
}

//! Git access for recursive resolution.
//!
//! - [`Vcs`]: the git operations the resolver needs.
//! - [`GitCli`]: implementation shelling out to the `git` binary.
//! - [`cache`]: clone cache layout, per-entry locking and revision validation.

pub mod cache;

use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::process::run_captured;

/// Revision expression for the commit most recently fetched.
pub const FETCH_HEAD_COMMIT: &str = "FETCH_HEAD^{commit}";

#[async_trait]
pub trait Vcs: Send + Sync {
    /// Probe whether the tool can be run at all.
    async fn is_available(&self) -> bool;

    /// Clone `url` into `destination`, checking out `reference` when given.
    async fn clone_repo(&self, url: &str, destination: &Path, reference: Option<&str>)
        -> Result<()>;

    /// Fetch `reference` (or the default refs when `None`) from `origin`.
    async fn fetch(&self, directory: &Path, reference: Option<&str>) -> Result<()>;

    async fn checkout(&self, directory: &Path, reference: &str) -> Result<()>;

    /// Resolve `revision` to a full commit hash.
    async fn rev_parse(&self, directory: &Path, revision: &str) -> Result<String>;

    fn is_repository(&self, directory: &Path) -> bool {
        directory.join(".git").exists()
    }
}

/// [`Vcs`] backed by the git command-line tool.
pub struct GitCli {
    program: String,
    /// `key=value` pairs passed as `-c` to every invocation.
    config: Vec<String>,
}

impl GitCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            config: Vec::new(),
        }
    }

    /// Set a git config value for every command, e.g. `url.<base>.insteadOf`.
    pub fn with_config(mut self, key: &str, value: &str) -> Self {
        self.config.push(format!("{}={}", key, value));
        self
    }

    async fn git(&self, args: &[&str], cwd: Option<&Path>) -> Result<String> {
        let mut full: Vec<&str> = Vec::with_capacity(self.config.len() * 2 + args.len());
        for entry in &self.config {
            full.extend(["-c", entry.as_str()]);
        }
        full.extend_from_slice(args);
        run_captured(&self.program, &full, cwd).await
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new("git")
    }
}

#[async_trait]
impl Vcs for GitCli {
    async fn is_available(&self) -> bool {
        self.git(&["--version"], None).await.is_ok()
    }

    async fn clone_repo(
        &self,
        url: &str,
        destination: &Path,
        reference: Option<&str>,
    ) -> Result<()> {
        info!("Cloning repository: {}", url);

        let destination_str = destination.to_string_lossy().into_owned();
        let mut args = vec!["clone"];
        if let Some(reference) = reference.filter(|r| *r != "HEAD") {
            args.extend(["--branch", reference]);
        }
        args.extend([url, destination_str.as_str()]);

        self.git(&args, None)
            .await
            .map_err(|e| Error::CloneFailed(format!("{}: {}", url, e)))?;

        debug!("Cloned {} to {}", url, destination.display());
        Ok(())
    }

    async fn fetch(&self, directory: &Path, reference: Option<&str>) -> Result<()> {
        let mut args = vec!["fetch", "origin"];
        if let Some(reference) = reference {
            args.push(reference);
        }
        self.git(&args, Some(directory)).await?;
        Ok(())
    }

    async fn checkout(&self, directory: &Path, reference: &str) -> Result<()> {
        debug!("Checking out {} in {}", reference, directory.display());
        self.git(&["checkout", reference], Some(directory))
            .await
            .map_err(|e| Error::CheckoutFailed(format!("{}: {}", reference, e)))?;
        Ok(())
    }

    async fn rev_parse(&self, directory: &Path, revision: &str) -> Result<String> {
        self.git(&["rev-parse", revision], Some(directory)).await
    }
}

use std::path::Path;

use async_trait::async_trait;
use tracing::info;

use crate::error::{Error, Result};
use crate::process::run_captured;

/// The package manager step that turns a checked-out package into a lockfile.
#[async_trait]
pub trait PackageManager: Send + Sync {
    /// Resolve dependencies inside `directory`.
    ///
    /// Succeeding without writing a lockfile means the package has no dependencies.
    async fn resolve(&self, directory: &Path) -> Result<()>;
}

/// Runs a configured command (`swift package resolve` by default).
pub struct CommandPackageManager {
    command: Vec<String>,
}

impl CommandPackageManager {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

#[async_trait]
impl PackageManager for CommandPackageManager {
    async fn resolve(&self, directory: &Path) -> Result<()> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| Error::ResolveFailed("no package manager command configured".into()))?;
        let args: Vec<&str> = args.iter().map(String::as_str).collect();

        info!("Resolving package dependencies in {}", directory.display());
        run_captured(program, &args, Some(directory))
            .await
            .map_err(|e| Error::ResolveFailed(e.to_string()))?;
        Ok(())
    }
}

//! Input checks that run before any resolution work.

use std::path::{Path, PathBuf};

use tracing::{debug, info};
use url::Url;

use crate::error::{Error, Result};
use crate::manifest::ManifestReader;
use crate::orchestrator::Inputs;
use crate::output::OutputFormat;
use crate::package_manager::PackageManager;

/// File that marks a directory as a package.
pub const PACKAGE_MANIFEST: &str = "Package.swift";

/// Reject inputs that can never produce output.
pub fn validate(
    inputs: &Inputs,
    output_directory: &Path,
    name: &str,
    format: OutputFormat,
) -> Result<()> {
    debug!(
        "Validating {} package directories and {} repository URLs",
        inputs.package_dirs.len(),
        inputs.direct_refs.len() + inputs.recursive_refs.len()
    );

    if inputs.package_dirs.is_empty()
        && inputs.direct_refs.is_empty()
        && inputs.recursive_refs.is_empty()
    {
        return Err(Error::NoInputProvided);
    }
    if output_directory.as_os_str().is_empty() {
        return Err(Error::EmptyArgument("Output directory"));
    }
    if name.trim().is_empty() {
        return Err(Error::EmptyArgument("Name"));
    }
    // The Swift output declares a type called `name`
    if format == OutputFormat::Swift && !is_swift_identifier(name) {
        return Err(Error::InvalidName(name.to_string()));
    }

    for dir in &inputs.package_dirs {
        if !dir.join(PACKAGE_MANIFEST).is_file() {
            return Err(Error::InvalidPackagePath(dir.clone()));
        }
    }

    for url in inputs.direct_refs.iter().chain(&inputs.recursive_refs) {
        validate_repository_url(url)?;
    }

    Ok(())
}

/// A repository URL needs a host plus owner and repository path segments.
pub fn validate_repository_url(input: &str) -> Result<()> {
    let invalid = || Error::InvalidRepositoryUrl(input.to_string());

    let url = Url::parse(input).map_err(|_| invalid())?;
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid());
    }
    let segments = url
        .path_segments()
        .map(|s| s.filter(|s| !s.is_empty()).count())
        .unwrap_or(0);
    if segments < 2 {
        return Err(invalid());
    }
    Ok(())
}

fn is_swift_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    name != "_" && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Run the package manager in every package directory that has no lockfile yet.
pub async fn prepare_packages(
    package_dirs: &[PathBuf],
    reader: &ManifestReader,
    package_manager: &dyn PackageManager,
) -> Result<()> {
    for dir in package_dirs {
        if reader.lockfile_path(dir).exists() {
            debug!("Lockfile exists in {}", dir.display());
            continue;
        }
        info!("Resolving package dependencies in {}", dir.display());
        package_manager.resolve(dir).await?;
    }
    Ok(())
}

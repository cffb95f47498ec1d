use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, error};
use url::Url;

use crate::error::{Error, Result};
use crate::fetcher::{LicenseLocation, RawHosts};

/// Lockfile name written by `swift package resolve`.
pub const DEFAULT_LOCKFILE: &str = "Package.resolved";

#[derive(Debug, Deserialize)]
struct Lockfile {
    pins: Vec<DependencyPin>,
}

/// One resolved dependency from a lockfile.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DependencyPin {
    pub identity: String,
    pub location: String,
    pub state: PinState,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PinState {
    pub revision: String,
}

impl DependencyPin {
    pub fn revision(&self) -> &str {
        &self.state.revision
    }
}

impl LicenseLocation for DependencyPin {
    fn identity(&self) -> String {
        self.identity.clone()
    }

    /// Last path component of the location, e.g. `swift-nio` for
    /// `https://github.com/apple/swift-nio.git`.
    fn display_name(&self) -> String {
        let trimmed = self.location.trim_end_matches('/');
        let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);
        Url::parse(trimmed)
            .ok()
            .and_then(|url| {
                url.path_segments()
                    .and_then(|segments| segments.last().map(str::to_string))
            })
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| self.identity.clone())
    }

    fn candidate_urls(&self, hosts: &RawHosts) -> Result<Vec<Url>> {
        hosts
            .candidate_urls(&self.location, self.revision())
            .ok_or_else(|| Error::InvalidLocation {
                identity: self.identity.clone(),
                location: self.location.clone(),
            })
    }
}

/// Reads the lockfile of a package directory.
pub struct ManifestReader {
    lockfile: String,
    hosts: RawHosts,
}

impl ManifestReader {
    pub fn new(lockfile: impl Into<String>, hosts: RawHosts) -> Self {
        Self {
            lockfile: lockfile.into(),
            hosts,
        }
    }

    pub fn lockfile_path(&self, package_dir: &Path) -> PathBuf {
        package_dir.join(&self.lockfile)
    }

    /// Load and decode the pins of `package_dir`, in lockfile order.
    ///
    /// Every pin must be able to produce license URLs; one that cannot fails the
    /// whole load.
    pub async fn load(&self, package_dir: &Path) -> Result<Vec<DependencyPin>> {
        let path = self.lockfile_path(package_dir);
        debug!("Reading lockfile {}", path.display());

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| Error::ManifestUnreadable {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        let pins = parse_pins(&content).map_err(|e| Error::ManifestUnreadable {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        for pin in &pins {
            if let Err(e) = pin.candidate_urls(&self.hosts) {
                error!("Cannot find license URL for: {} at {}", pin.identity, pin.location);
                return Err(e);
            }
        }

        Ok(pins)
    }
}

fn parse_pins(content: &str) -> serde_json::Result<Vec<DependencyPin>> {
    let lockfile: Lockfile = serde_json::from_str(content)?;
    Ok(lockfile.pins)
}

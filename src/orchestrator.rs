//! Top-level license resolution across the three input sources.
//!
//! Local manifests, direct references and recursive references run as three
//! independent groups. Inside a group every unit runs concurrently and the
//! group either succeeds as a whole or contributes nothing; a failing group
//! never stops the other two. The merged result is deduplicated on the full
//! `(identity, name, text)` tuple and sorted by name.

use std::path::PathBuf;
use std::sync::Arc;

use futures::future::try_join_all;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{Error, GroupFailure, Result};
use crate::fetcher::{HttpTransport, LicenseFetcher};
use crate::git::GitCli;
use crate::manifest::ManifestReader;
use crate::models::{License, SourceGroup};
use crate::package_manager::CommandPackageManager;
use crate::reference::RepoReference;
use crate::resolver::ClonedDependencyResolver;

/// Everything the user asked to collect licenses for.
#[derive(Debug, Clone, Default)]
pub struct Inputs {
    /// Directories holding an already-resolved lockfile.
    pub package_dirs: Vec<PathBuf>,
    /// Repositories whose own license is wanted.
    pub direct_refs: Vec<String>,
    /// Repositories whose own license and dependency licenses are wanted.
    pub recursive_refs: Vec<String>,
}

/// Merged output of one run.
#[derive(Debug, Default)]
pub struct Resolution {
    /// Deduplicated, sorted licenses of the groups that succeeded.
    pub licenses: Vec<License>,
    /// One entry per group that failed.
    pub failures: Vec<GroupFailure>,
}

impl Resolution {
    /// `Ok` only when every group succeeded.
    pub fn into_result(self) -> Result<Vec<License>> {
        if self.failures.is_empty() {
            Ok(self.licenses)
        } else {
            Err(Error::Resolution(self.failures))
        }
    }
}

pub struct ResolutionOrchestrator {
    fetcher: LicenseFetcher,
    reader: Arc<ManifestReader>,
    resolver: ClonedDependencyResolver,
    cache_root: Option<PathBuf>,
}

impl ResolutionOrchestrator {
    pub fn new(
        fetcher: LicenseFetcher,
        reader: Arc<ManifestReader>,
        resolver: ClonedDependencyResolver,
    ) -> Self {
        Self {
            fetcher,
            reader,
            resolver,
            cache_root: None,
        }
    }

    /// Wire up the real HTTP client, git and package manager from `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let hosts = config.raw_hosts();
        let transport = Arc::new(HttpTransport::new(&config.fetch)?);
        let reader = Arc::new(ManifestReader::new(config.tools.lockfile.clone(), hosts.clone()));
        let git = config
            .tools
            .git_config
            .iter()
            .fold(GitCli::new(config.tools.git.clone()), |git, (key, value)| {
                git.with_config(key, value)
            });
        let resolver = ClonedDependencyResolver::new(
            Arc::new(git),
            Arc::new(CommandPackageManager::new(config.tools.package_manager.clone())),
            reader.clone(),
        );

        Ok(Self::new(LicenseFetcher::new(transport, hosts), reader, resolver)
            .with_cache_root(config.cache.dir.clone()))
    }

    pub fn with_cache_root(mut self, cache_root: Option<PathBuf>) -> Self {
        self.cache_root = cache_root;
        self
    }

    pub fn with_fetcher(mut self, fetcher: LicenseFetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn fetcher(&self) -> &LicenseFetcher {
        &self.fetcher
    }

    pub fn resolver(&self) -> &ClonedDependencyResolver {
        &self.resolver
    }

    pub async fn run(&self, inputs: &Inputs) -> Resolution {
        let (local, direct, recursive) = tokio::join!(
            self.local_manifests(&inputs.package_dirs),
            self.direct_references(&inputs.direct_refs),
            self.recursive_references(&inputs.recursive_refs),
        );

        let mut resolution = Resolution::default();
        for (group, outcome) in [
            (SourceGroup::LocalManifests, local),
            (SourceGroup::DirectReferences, direct),
            (SourceGroup::RecursiveReferences, recursive),
        ] {
            match outcome {
                Ok(licenses) => resolution.licenses.extend(licenses),
                Err(error) => {
                    warn!("{} failed: {}", group, error);
                    resolution.failures.push(GroupFailure {
                        group: group.label(),
                        error,
                    });
                }
            }
        }

        resolution.licenses = merge(resolution.licenses);
        info!("Resolved {} licenses", resolution.licenses.len());
        resolution
    }

    async fn local_manifests(&self, package_dirs: &[PathBuf]) -> Result<Vec<License>> {
        let units = package_dirs.iter().map(|dir| async move {
            let pins = self.reader.load(dir).await?;
            self.fetcher.fetch_all(&pins).await
        });
        Ok(try_join_all(units).await?.into_iter().flatten().collect())
    }

    async fn direct_references(&self, urls: &[String]) -> Result<Vec<License>> {
        let references = parse_references(urls);
        let units = references
            .iter()
            .map(|reference| self.fetcher.fetch_location(reference));
        Ok(try_join_all(units).await?.into_iter().flatten().collect())
    }

    async fn recursive_references(&self, urls: &[String]) -> Result<Vec<License>> {
        let references = parse_references(urls);
        if references.is_empty() {
            return Ok(Vec::new());
        }
        self.resolver.ensure_available().await?;

        let cache_root = self.cache_root.as_deref();
        let units = references.iter().map(|reference| async move {
            let (own, dependencies) = tokio::try_join!(
                self.fetcher.fetch_location(reference),
                async {
                    match self.resolver.resolve(reference, cache_root).await? {
                        Some(pins) => self.fetcher.fetch_all(&pins).await,
                        None => Ok(Vec::new()),
                    }
                }
            )
            .map_err(|e| Error::reference(reference.clone_url(), e))?;
            Ok::<_, Error>(own.into_iter().chain(dependencies).collect::<Vec<_>>())
        });
        Ok(try_join_all(units).await?.into_iter().flatten().collect())
    }
}

/// Parse every URL, skipping the ones that are not repository references.
fn parse_references(urls: &[String]) -> Vec<RepoReference> {
    urls.iter()
        .filter_map(|url| match RepoReference::parse(url) {
            Ok(reference) => Some(reference),
            Err(e) => {
                warn!("Skipping {}", e);
                None
            }
        })
        .collect()
}

/// Deduplicate on the full tuple and sort by name for stable output.
pub fn merge(mut licenses: Vec<License>) -> Vec<License> {
    licenses.sort_by(|a, b| {
        (&a.name, &a.identity, &a.text).cmp(&(&b.name, &b.identity, &b.text))
    });
    licenses.dedup();
    licenses
}

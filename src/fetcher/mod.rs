//! Fallback-ordered license downloads from raw-content hosts.
//!
//! A license may live under any of [`LICENSE_FILE_NAMES`]; candidates are tried
//! strictly in that order and the first `200` wins. Everything else (404, other
//! status codes, non-UTF-8 bodies, transport errors) just moves on to the next
//! candidate, and a dependency with no license at all is `None`, not an error.

pub mod http;

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use indicatif::ProgressBar;
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::error::Result;
use crate::models::License;

pub use http::{FetchResponse, HttpTransport, Transport};

/// Conventional license file names, highest priority first.
pub const LICENSE_FILE_NAMES: [&str; 3] = ["LICENSE", "LICENSE.txt", "License.txt"];

/// Maps a web host (`github.com`) to the host serving raw file contents.
#[derive(Debug, Clone)]
pub struct RawHosts {
    map: HashMap<String, String>,
}

impl RawHosts {
    pub fn new(map: HashMap<String, String>) -> Self {
        Self { map }
    }

    /// Built-in substitutions for GitHub.
    pub fn default_map() -> HashMap<String, String> {
        ["github.com", "www.github.com"]
            .into_iter()
            .map(|host| (host.to_string(), "raw.githubusercontent.com".to_string()))
            .collect()
    }

    /// Build the ordered candidate URLs for `location` at `revision`.
    ///
    /// Strips a `.git` suffix, swaps the host for its raw-content equivalent
    /// (unknown hosts are kept as-is) and appends `/{revision}/{file}`. Returns
    /// `None` when `location` cannot be turned into such a URL.
    pub fn candidate_urls(&self, location: &str, revision: &str) -> Option<Vec<Url>> {
        let trimmed = location.trim_end_matches('/');
        let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);

        let mut base = Url::parse(trimmed).ok()?;
        let raw_host = base.host_str().and_then(|h| self.map.get(h)).cloned();
        if let Some(raw_host) = raw_host {
            base.set_host(Some(&raw_host)).ok()?;
        }
        if base.cannot_be_a_base() || base.host_str().is_none() || revision.is_empty() {
            return None;
        }

        let mut urls = Vec::with_capacity(LICENSE_FILE_NAMES.len());
        for file in LICENSE_FILE_NAMES {
            let mut url = base.clone();
            {
                let mut segments = url.path_segments_mut().ok()?;
                segments.pop_if_empty();
                // Branch names may contain slashes; raw hosts expect them unescaped.
                segments.extend(revision.split('/'));
                segments.push(file);
            }
            urls.push(url);
        }
        Some(urls)
    }
}

impl Default for RawHosts {
    fn default() -> Self {
        Self::new(Self::default_map())
    }
}

/// Anything that can name itself and produce candidate license URLs.
pub trait LicenseLocation {
    fn identity(&self) -> String;

    /// Human-facing dependency name written to the output.
    fn display_name(&self) -> String;

    /// Ordered candidates. `Err` means the location is malformed.
    fn candidate_urls(&self, hosts: &RawHosts) -> Result<Vec<Url>>;
}

/// Downloads license texts through a [`Transport`].
#[derive(Clone)]
pub struct LicenseFetcher {
    transport: Arc<dyn Transport>,
    hosts: RawHosts,
    progress: ProgressBar,
}

impl LicenseFetcher {
    pub fn new(transport: Arc<dyn Transport>, hosts: RawHosts) -> Self {
        Self {
            transport,
            hosts,
            progress: ProgressBar::hidden(),
        }
    }

    /// Report each finished fetch on `progress`.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn hosts(&self) -> &RawHosts {
        &self.hosts
    }

    /// Try `candidates` in order and return the first license found.
    pub async fn fetch(&self, identity: &str, name: &str, candidates: &[Url]) -> Option<License> {
        for url in candidates {
            trace!("Fetching license for {} from {}", identity, url);

            let response = match self.transport.get(url).await {
                Ok(response) => response,
                Err(e) => {
                    warn!("Request for {} failed at {}: {}", identity, url, e);
                    continue;
                }
            };

            match response.status {
                200 => match String::from_utf8(response.body) {
                    Ok(text) => {
                        debug!("Fetched license for {} from {}", identity, url);
                        return Some(License::new(identity, name, text));
                    }
                    Err(_) => {
                        warn!("License body for {} at {} is not valid UTF-8", identity, url);
                    }
                },
                404 => trace!("No license at {} for {}", url, identity),
                status => warn!("Unexpected status code {} for {} at {}", status, identity, url),
            }
        }

        warn!("No license file found for {}", identity);
        None
    }

    /// Fetch the license of a single location.
    pub async fn fetch_location<L: LicenseLocation + ?Sized>(
        &self,
        location: &L,
    ) -> Result<Option<License>> {
        let candidates = location.candidate_urls(&self.hosts)?;
        self.progress.inc_length(1);
        let license = self
            .fetch(&location.identity(), &location.display_name(), &candidates)
            .await;
        self.progress.inc(1);
        Ok(license)
    }

    /// Fetch every location concurrently, keeping only the licenses found.
    ///
    /// Candidate URLs for the whole batch are built before any request goes out;
    /// a single malformed location fails the batch.
    pub async fn fetch_all<L: LicenseLocation>(&self, locations: &[L]) -> Result<Vec<License>> {
        info!("Loading licenses for {} dependencies", locations.len());

        let requests = locations
            .iter()
            .map(|loc| -> Result<_> {
                Ok((loc.identity(), loc.display_name(), loc.candidate_urls(&self.hosts)?))
            })
            .collect::<Result<Vec<_>>>()?;

        self.progress.inc_length(requests.len() as u64);

        let futures = requests.iter().map(|(identity, name, candidates)| async move {
            let license = self.fetch(identity, name, candidates).await;
            self.progress.inc(1);
            license
        });

        let licenses: Vec<License> = join_all(futures).await.into_iter().flatten().collect();

        info!("Loaded {} of {} licenses", licenses.len(), locations.len());
        Ok(licenses)
    }
}

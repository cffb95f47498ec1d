//! Repository references of the form `https://host/owner/repo[@ref]`.

use std::fmt;

use url::Url;

use crate::error::{Error, Result};
use crate::fetcher::{LicenseLocation, RawHosts};

/// The state of a remote repository a reference points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Version {
    Branch(String),
    Tag(String),
    Revision(String),
    /// Default when no `@ref` is given: whatever the remote currently calls latest.
    Head,
}

impl Version {
    /// The literal string handed to `git checkout` and friends.
    pub fn git_reference(&self) -> &str {
        match self {
            Version::Branch(name) | Version::Tag(name) | Version::Revision(name) => name,
            Version::Head => "HEAD",
        }
    }

    pub fn is_head(&self) -> bool {
        matches!(self, Version::Head)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.git_reference())
    }
}

/// A parsed repository reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoReference {
    pub owner: String,
    pub name: String,
    pub version: Version,
    /// `scheme://host[:port]/owner/name`, without `.git`.
    web_url: Url,
}

impl RepoReference {
    /// Parse `https://host/owner/repo[@ref]`.
    ///
    /// The `@` separator is only searched for after the start of the URL path, so
    /// credentials in the authority part are not mistaken for a version. Anything
    /// after `@` is an opaque git reference: branches, tags and commit SHAs are all
    /// stored as [`Version::Tag`] and git sorts them out at checkout time.
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = || Error::InvalidReference(input.to_string());

        let path_start = input
            .find("://")
            .map(|i| i + 3)
            .and_then(|i| input[i..].find('/').map(|j| i + j))
            .unwrap_or(0);

        let (base, version) = match input[path_start..].find('@') {
            Some(at) => {
                let at = path_start + at;
                let git_ref = &input[at + 1..];
                if git_ref.is_empty() {
                    return Err(invalid());
                }
                (&input[..at], Version::Tag(git_ref.to_string()))
            }
            None => (input, Version::Head),
        };

        let url = Url::parse(base).map_err(|_| invalid())?;
        let host = url.host_str().ok_or_else(invalid)?;

        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();
        if segments.len() < 2 {
            return Err(invalid());
        }

        let owner = segments[0].to_string();
        let name = segments[1]
            .strip_suffix(".git")
            .unwrap_or(segments[1])
            .to_string();
        if name.is_empty() {
            return Err(invalid());
        }

        let authority = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        let web_url = Url::parse(&format!("{}://{}/{}/{}", url.scheme(), authority, owner, name))
            .map_err(|_| invalid())?;

        Ok(Self {
            owner,
            name,
            version,
            web_url,
        })
    }

    pub fn host(&self) -> &str {
        self.web_url.host_str().unwrap_or_default()
    }

    /// Identity as the package manager would assign it inside a lockfile.
    pub fn identity(&self) -> String {
        self.name.to_lowercase()
    }

    pub fn git_reference(&self) -> &str {
        self.version.git_reference()
    }

    /// URL handed to `git clone`.
    pub fn clone_url(&self) -> String {
        format!("{}.git", self.web_url.as_str().trim_end_matches('/'))
    }

    /// Web URL of the repository, used to derive raw-content license URLs.
    pub fn web_url(&self) -> &Url {
        &self.web_url
    }

    /// Filesystem-safe cache directory name: `owner-name@ref`.
    pub fn cache_key(&self) -> String {
        format!("{}-{}@{}", self.owner, self.name, self.git_reference())
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' => '_',
                other => other,
            })
            .collect()
    }
}

impl fmt::Display for RepoReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.owner, self.name, self.version)
    }
}

/// The repository's own license at the referenced version. `Head` resolves to
/// whatever the raw host serves for `HEAD`.
impl LicenseLocation for RepoReference {
    fn identity(&self) -> String {
        RepoReference::identity(self)
    }

    fn display_name(&self) -> String {
        self.name.clone()
    }

    fn candidate_urls(&self, hosts: &RawHosts) -> Result<Vec<Url>> {
        hosts
            .candidate_urls(self.web_url.as_str(), self.git_reference())
            .ok_or_else(|| Error::InvalidLocation {
                identity: RepoReference::identity(self),
                location: self.web_url.to_string(),
            })
    }
}

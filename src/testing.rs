//! In-memory stand-ins for the network, git and the package manager.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use url::Url;

use crate::error::{Error, Result};
use crate::fetcher::{FetchResponse, Transport};
use crate::git::{Vcs, FETCH_HEAD_COMMIT};
use crate::manifest::DEFAULT_LOCKFILE;
use crate::package_manager::PackageManager;

/// Serves canned responses keyed by URL and records every request.
#[derive(Default)]
pub struct FakeTransport {
    responses: Mutex<HashMap<String, FetchResponse>>,
    requests: Mutex<Vec<String>>,
}

impl FakeTransport {
    pub fn respond(&self, url: &str, status: u16, body: &[u8]) {
        self.responses.lock().unwrap().insert(
            url.to_string(),
            FetchResponse {
                status,
                body: body.to_vec(),
            },
        );
    }

    pub fn requested(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn get(&self, url: &Url) -> Result<FetchResponse> {
        self.requests.lock().unwrap().push(url.to_string());
        if url.path().contains("transport-error") {
            return Err(Error::io(
                "fake transport",
                std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset"),
            ));
        }
        Ok(self
            .responses
            .lock()
            .unwrap()
            .get(url.as_str())
            .cloned()
            .unwrap_or(FetchResponse {
                status: 404,
                body: Vec::new(),
            }))
    }
}

/// A set of remote repositories: mutable refs, immutable commits.
///
/// Working trees created by [`FakeVcs`] keep their state under `.git/`:
/// `HEAD` (checked-out commit), `FETCH_HEAD`, and `local/<ref>` for refs
/// created at clone time.
#[derive(Default)]
pub struct FakeRemote {
    /// `(clone url, ref)` to commit. `"HEAD"` is the default branch.
    refs: Mutex<HashMap<(String, String), String>>,
    /// Commit to lockfile content; `None` means resolving writes no lockfile.
    lockfiles: Mutex<HashMap<String, Option<String>>>,
    clones: AtomicUsize,
    clone_destinations: Mutex<Vec<PathBuf>>,
}

impl FakeRemote {
    pub fn set_ref(&self, url: &str, reference: &str, commit: &str) {
        self.refs
            .lock()
            .unwrap()
            .insert((url.to_string(), reference.to_string()), commit.to_string());
    }

    pub fn set_lockfile(&self, commit: &str, content: Option<&str>) {
        self.lockfiles
            .lock()
            .unwrap()
            .insert(commit.to_string(), content.map(str::to_string));
    }

    pub fn clone_count(&self) -> usize {
        self.clones.load(Ordering::SeqCst)
    }

    pub fn clone_destinations(&self) -> Vec<PathBuf> {
        self.clone_destinations.lock().unwrap().clone()
    }

    fn lookup(&self, url: &str, reference: &str) -> Option<String> {
        self.refs
            .lock()
            .unwrap()
            .get(&(url.to_string(), reference.to_string()))
            .cloned()
    }

    /// What a bare `git fetch origin` from a detached HEAD leaves first in
    /// FETCH_HEAD: the alphabetically first ref, not the default branch.
    fn first_ref(&self, url: &str) -> Option<String> {
        let first = self
            .refs
            .lock()
            .unwrap()
            .iter()
            .filter(|((u, r), _)| u == url && r != "HEAD")
            .min_by(|a, b| a.0 .1.cmp(&b.0 .1))
            .map(|(_, commit)| commit.clone());
        first.or_else(|| self.lookup(url, "HEAD"))
    }

    fn is_commit(&self, commit: &str) -> bool {
        self.lockfiles.lock().unwrap().contains_key(commit)
    }
}

fn state(dir: &Path, name: &str) -> PathBuf {
    dir.join(".git").join(name)
}

fn read_state(dir: &Path, name: &str) -> Result<String> {
    std::fs::read_to_string(state(dir, name)).map_err(|e| Error::io(name.to_string(), e))
}

fn write_state(dir: &Path, name: &str, value: &str) {
    let path = state(dir, name);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, value).unwrap();
}

/// Rewrite the commit a local ref points at, as a user running `git checkout` or
/// `git reset` inside the cache would.
pub fn diverge_local_ref(dir: &Path, reference: &str, commit: &str) {
    write_state(dir, &format!("local/{}", reference), commit);
}

pub struct FakeVcs {
    remote: Arc<FakeRemote>,
}

impl FakeVcs {
    pub fn new(remote: Arc<FakeRemote>) -> Self {
        Self { remote }
    }

    fn origin(dir: &Path) -> Result<String> {
        read_state(dir, "origin")
    }
}

#[async_trait]
impl Vcs for FakeVcs {
    async fn is_available(&self) -> bool {
        true
    }

    async fn clone_repo(&self, url: &str, destination: &Path, reference: Option<&str>) -> Result<()> {
        let reference = reference.unwrap_or("HEAD");
        let commit = self
            .remote
            .lookup(url, reference)
            .ok_or_else(|| Error::CloneFailed(format!("{}: unknown ref {}", url, reference)))?;

        self.remote.clones.fetch_add(1, Ordering::SeqCst);
        self.remote
            .clone_destinations
            .lock()
            .unwrap()
            .push(destination.to_path_buf());

        write_state(destination, "origin", url);
        write_state(destination, "HEAD", &commit);
        write_state(destination, &format!("local/{}", reference), &commit);
        Ok(())
    }

    async fn fetch(&self, directory: &Path, reference: Option<&str>) -> Result<()> {
        let url = Self::origin(directory)?;
        let commit = match reference {
            Some(reference) => self.remote.lookup(&url, reference).ok_or_else(|| {
                Error::command_exec("git fetch", format!("couldn't find remote ref {}", reference))
            })?,
            None => self
                .remote
                .first_ref(&url)
                .ok_or_else(|| Error::command_exec("git fetch", "no refs on remote"))?,
        };
        write_state(directory, "FETCH_HEAD", &commit);
        Ok(())
    }

    async fn checkout(&self, directory: &Path, reference: &str) -> Result<()> {
        let commit = if reference == "FETCH_HEAD" {
            read_state(directory, "FETCH_HEAD")?
        } else if let Ok(local) = read_state(directory, &format!("local/{}", reference)) {
            local
        } else if self.remote.is_commit(reference) {
            reference.to_string()
        } else {
            return Err(Error::CheckoutFailed(reference.to_string()));
        };
        write_state(directory, "HEAD", &commit);
        Ok(())
    }

    async fn rev_parse(&self, directory: &Path, revision: &str) -> Result<String> {
        match revision {
            "HEAD" => read_state(directory, "HEAD"),
            FETCH_HEAD_COMMIT => read_state(directory, "FETCH_HEAD"),
            other => Err(Error::command_exec("git rev-parse", other.to_string())),
        }
    }
}

/// Writes the lockfile registered for the checked-out commit.
pub struct FakePackageManager {
    remote: Arc<FakeRemote>,
}

impl FakePackageManager {
    pub fn new(remote: Arc<FakeRemote>) -> Self {
        Self { remote }
    }
}

#[async_trait]
impl PackageManager for FakePackageManager {
    async fn resolve(&self, directory: &Path) -> Result<()> {
        let commit = read_state(directory, "HEAD")?;
        let lockfile = self.remote.lockfiles.lock().unwrap().get(&commit).cloned();
        match lockfile {
            Some(Some(content)) => {
                std::fs::write(directory.join(DEFAULT_LOCKFILE), content)
                    .map_err(|e| Error::io("writing lockfile", e))?;
                Ok(())
            }
            Some(None) => Ok(()),
            None => Err(Error::ResolveFailed(format!("commit {} does not build", commit))),
        }
    }
}

/// Lockfile JSON with one pin per `(identity, location, revision)`.
pub fn lockfile(pins: &[(&str, &str, &str)]) -> String {
    let pins: Vec<serde_json::Value> = pins
        .iter()
        .map(|(identity, location, revision)| {
            serde_json::json!({
                "identity": identity,
                "kind": "remoteSourceControl",
                "location": location,
                "state": { "revision": revision }
            })
        })
        .collect();
    serde_json::json!({ "pins": pins, "version": 2 }).to_string()
}

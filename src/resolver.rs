use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::git::{cache, Vcs};
use crate::manifest::{DependencyPin, ManifestReader};
use crate::package_manager::PackageManager;
use crate::reference::{RepoReference, Version};

/// Clones a repository reference, runs the package manager in it and reads
/// back the pins it resolved.
pub struct ClonedDependencyResolver {
    vcs: Arc<dyn Vcs>,
    package_manager: Arc<dyn PackageManager>,
    reader: Arc<ManifestReader>,
}

impl ClonedDependencyResolver {
    pub fn new(
        vcs: Arc<dyn Vcs>,
        package_manager: Arc<dyn PackageManager>,
        reader: Arc<ManifestReader>,
    ) -> Self {
        Self {
            vcs,
            package_manager,
            reader,
        }
    }

    /// Fail fast when git cannot be run at all.
    pub async fn ensure_available(&self) -> Result<()> {
        if self.vcs.is_available().await {
            Ok(())
        } else {
            Err(Error::GitNotAvailable)
        }
    }

    /// Resolve the dependencies of `reference`.
    ///
    /// With a `cache_root`, the checkout under it is reused when it provably
    /// matches the reference and rebuilt otherwise. Without one, a temporary
    /// directory is used and removed whatever the outcome. Returns `None` for a
    /// package with no dependencies.
    pub async fn resolve(
        &self,
        reference: &RepoReference,
        cache_root: Option<&Path>,
    ) -> Result<Option<Vec<DependencyPin>>> {
        info!("Resolving dependencies for {}", reference);

        match cache_root {
            Some(root) => {
                let _lock = cache::lock_entry(root, reference).await?;
                let directory = cache::entry_path(root, reference);
                self.prepare_cached(reference, &directory).await?;
                self.resolve_in(&directory).await
            }
            None => {
                let temp = tempfile::Builder::new()
                    .prefix("license-collect-")
                    .tempdir()
                    .map_err(Error::TempDirCreationFailed)?;
                debug!("Created temporary directory: {}", temp.path().display());

                self.clone_into(reference, temp.path()).await?;
                self.resolve_in(temp.path()).await
            }
        }
    }

    async fn prepare_cached(&self, reference: &RepoReference, directory: &Path) -> Result<()> {
        if directory.exists() {
            if cache::validate_entry(self.vcs.as_ref(), directory, reference).await {
                info!("Reusing cached checkout of {}", reference);
                return Ok(());
            }
            cache::evict(directory).await?;
        }
        self.clone_into(reference, directory).await
    }

    async fn clone_into(&self, reference: &RepoReference, destination: &Path) -> Result<()> {
        let url = reference.clone_url();
        info!("Cloning {} @ {}", url, reference.git_reference());

        match &reference.version {
            Version::Head => self.vcs.clone_repo(&url, destination, None).await,
            // `clone --branch` cannot take a commit hash.
            Version::Revision(revision) => {
                self.vcs.clone_repo(&url, destination, None).await?;
                self.vcs.checkout(destination, revision).await
            }
            Version::Branch(name) | Version::Tag(name) => {
                self.vcs.clone_repo(&url, destination, Some(name)).await
            }
        }
    }

    async fn resolve_in(&self, directory: &Path) -> Result<Option<Vec<DependencyPin>>> {
        self.package_manager.resolve(directory).await?;

        if !self.reader.lockfile_path(directory).exists() {
            info!("Package has no dependencies");
            return Ok(None);
        }

        self.reader.load(directory).await.map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::RawHosts;
    use crate::manifest::DEFAULT_LOCKFILE;
    use crate::testing::{diverge_local_ref, lockfile, FakePackageManager, FakeRemote, FakeVcs};
    use tempfile::TempDir;

    const URL: &str = "https://github.com/acme/widget.git";

    fn setup() -> (Arc<FakeRemote>, ClonedDependencyResolver) {
        let remote = Arc::new(FakeRemote::default());
        let resolver = ClonedDependencyResolver::new(
            Arc::new(FakeVcs::new(remote.clone())),
            Arc::new(FakePackageManager::new(remote.clone())),
            Arc::new(ManifestReader::new(DEFAULT_LOCKFILE, RawHosts::default())),
        );
        (remote, resolver)
    }

    fn reference(suffix: &str) -> RepoReference {
        RepoReference::parse(&format!("https://github.com/acme/widget{}", suffix)).unwrap()
    }

    fn deps_v1() -> String {
        lockfile(&[("swift-nio", "https://github.com/apple/swift-nio.git", "n1")])
    }

    fn deps_v2() -> String {
        lockfile(&[
            ("swift-nio", "https://github.com/apple/swift-nio.git", "n2"),
            ("swift-log", "https://github.com/apple/swift-log.git", "l1"),
        ])
    }

    #[tokio::test]
    async fn test_second_resolution_reuses_cache() {
        let (remote, resolver) = setup();
        remote.set_ref(URL, "1.0.0", "c1");
        remote.set_lockfile("c1", Some(&deps_v1()));
        let cache = TempDir::new().unwrap();
        let r = reference("@1.0.0");

        let first = resolver.resolve(&r, Some(cache.path())).await.unwrap();
        let second = resolver.resolve(&r, Some(cache.path())).await.unwrap();

        assert_eq!(remote.clone_count(), 1);
        assert_eq!(first, second);
        assert_eq!(first.unwrap()[0].revision(), "n1");
        assert!(cache.path().join("acme-widget@1.0.0").exists());
    }

    #[tokio::test]
    async fn test_diverged_checkout_is_recloned() {
        let (remote, resolver) = setup();
        remote.set_ref(URL, "1.0.0", "c1");
        remote.set_lockfile("c1", Some(&deps_v1()));
        remote.set_lockfile("c0", Some(&deps_v2()));
        let cache = TempDir::new().unwrap();
        let r = reference("@1.0.0");

        resolver.resolve(&r, Some(cache.path())).await.unwrap();
        diverge_local_ref(&cache.path().join("acme-widget@1.0.0"), "1.0.0", "c0");

        let pins = resolver.resolve(&r, Some(cache.path())).await.unwrap().unwrap();

        assert_eq!(remote.clone_count(), 2);
        assert_eq!(pins.len(), 1);
        assert_eq!(pins[0].revision(), "n1");
    }

    #[tokio::test]
    async fn test_moved_reference_is_recloned() {
        let (remote, resolver) = setup();
        remote.set_ref(URL, "main", "c1");
        remote.set_lockfile("c1", Some(&deps_v1()));
        remote.set_lockfile("c2", Some(&deps_v2()));
        let cache = TempDir::new().unwrap();
        let r = reference("@main");

        resolver.resolve(&r, Some(cache.path())).await.unwrap();
        remote.set_ref(URL, "main", "c2");
        let pins = resolver.resolve(&r, Some(cache.path())).await.unwrap().unwrap();

        assert_eq!(remote.clone_count(), 2);
        assert_eq!(pins.len(), 2);
    }

    #[tokio::test]
    async fn test_head_is_refreshed_without_recloning() {
        let (remote, resolver) = setup();
        remote.set_ref(URL, "HEAD", "c1");
        // Sorts before the default branch, so a bare fetch would land on it.
        remote.set_ref(URL, "aaa-feature", "f1");
        remote.set_lockfile("c1", Some(&deps_v1()));
        remote.set_lockfile("c2", Some(&deps_v2()));
        remote.set_lockfile("f1", Some(&lockfile(&[])));
        let cache = TempDir::new().unwrap();
        let r = reference("");

        resolver.resolve(&r, Some(cache.path())).await.unwrap();
        remote.set_ref(URL, "HEAD", "c2");
        let second = resolver.resolve(&r, Some(cache.path())).await.unwrap().unwrap();
        let third = resolver.resolve(&r, Some(cache.path())).await.unwrap().unwrap();

        assert_eq!(remote.clone_count(), 1);
        assert_eq!(second.len(), 2);
        assert_eq!(third, second);
    }

    #[tokio::test]
    async fn test_non_repository_directory_is_replaced() {
        let (remote, resolver) = setup();
        remote.set_ref(URL, "1.0.0", "c1");
        remote.set_lockfile("c1", Some(&deps_v1()));
        let cache = TempDir::new().unwrap();
        let entry = cache.path().join("acme-widget@1.0.0");
        std::fs::create_dir_all(&entry).unwrap();
        std::fs::write(entry.join("junk"), "left over").unwrap();

        let pins = resolver
            .resolve(&reference("@1.0.0"), Some(cache.path()))
            .await
            .unwrap();

        assert!(pins.is_some());
        assert!(!entry.join("junk").exists());
        assert_eq!(remote.clone_count(), 1);
    }

    #[tokio::test]
    async fn test_no_lockfile_means_no_dependencies() {
        let (remote, resolver) = setup();
        remote.set_ref(URL, "HEAD", "leaf");
        remote.set_lockfile("leaf", None);

        let pins = resolver.resolve(&reference(""), None).await.unwrap();
        assert_eq!(pins, None);
    }

    #[tokio::test]
    async fn test_resolve_failure_is_fatal() {
        let (remote, resolver) = setup();
        remote.set_ref(URL, "HEAD", "broken");

        let err = resolver.resolve(&reference(""), None).await.unwrap_err();
        assert!(matches!(err, Error::ResolveFailed(_)));
    }

    #[tokio::test]
    async fn test_temporary_directory_removed_on_success_and_failure() {
        let (remote, resolver) = setup();
        remote.set_ref(URL, "HEAD", "c1");
        remote.set_lockfile("c1", Some(&deps_v1()));
        remote.set_ref(URL, "bad", "broken");

        resolver.resolve(&reference(""), None).await.unwrap();
        resolver.resolve(&reference("@bad"), None).await.unwrap_err();

        let destinations = remote.clone_destinations();
        assert_eq!(destinations.len(), 2);
        assert!(destinations.iter().all(|d| !d.exists()));
    }

    #[tokio::test]
    async fn test_unknown_reference_is_clone_failure() {
        let (_remote, resolver) = setup();
        let err = resolver
            .resolve(&reference("@nope"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CloneFailed(_)));
    }

    #[tokio::test]
    async fn test_revision_is_cloned_then_checked_out() {
        let (remote, resolver) = setup();
        remote.set_ref(URL, "HEAD", "c2");
        remote.set_lockfile("c1", Some(&deps_v1()));
        remote.set_lockfile("c2", Some(&deps_v2()));

        let mut r = reference("");
        r.version = Version::Revision("c1".to_string());
        let pins = resolver.resolve(&r, None).await.unwrap().unwrap();
        assert_eq!(pins.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_resolutions_of_one_key_clone_once() {
        let (remote, resolver) = setup();
        remote.set_ref(URL, "1.0.0", "c1");
        remote.set_lockfile("c1", Some(&deps_v1()));
        let cache = TempDir::new().unwrap();
        let r = reference("@1.0.0");

        let (a, b) = tokio::join!(
            resolver.resolve(&r, Some(cache.path())),
            resolver.resolve(&r, Some(cache.path()))
        );

        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(remote.clone_count(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_git_fails_fast() {
        struct NoGit;

        #[async_trait::async_trait]
        impl Vcs for NoGit {
            async fn is_available(&self) -> bool {
                false
            }
            async fn clone_repo(&self, _: &str, _: &Path, _: Option<&str>) -> Result<()> {
                unreachable!()
            }
            async fn fetch(&self, _: &Path, _: Option<&str>) -> Result<()> {
                unreachable!()
            }
            async fn checkout(&self, _: &Path, _: &str) -> Result<()> {
                unreachable!()
            }
            async fn rev_parse(&self, _: &Path, _: &str) -> Result<String> {
                unreachable!()
            }
        }

        let remote = Arc::new(FakeRemote::default());
        let resolver = ClonedDependencyResolver::new(
            Arc::new(NoGit),
            Arc::new(FakePackageManager::new(remote)),
            Arc::new(ManifestReader::new(DEFAULT_LOCKFILE, RawHosts::default())),
        );
        assert!(matches!(
            resolver.ensure_available().await,
            Err(Error::GitNotAvailable)
        ));
    }

    /// The same cache behaviour against a real git binary and a local origin.
    #[cfg(unix)]
    mod with_git {
        use super::*;
        use crate::fetcher::RawHosts;
        use crate::git::{GitCli, Vcs};
        use crate::manifest::{ManifestReader, DEFAULT_LOCKFILE};
        use crate::package_manager::CommandPackageManager;
        use crate::process::run_captured;
        use crate::reference::RepoReference;
        use crate::testing::lockfile;
        use std::path::{Path, PathBuf};
        use std::sync::Arc;
        use tempfile::TempDir;

        const REMOTE: &str = "https://git.test/";

        async fn git(dir: &Path, args: &[&str]) -> String {
            let mut full = vec![
                "-c",
                "user.name=test",
                "-c",
                "user.email=test@example.com",
                "-c",
                "commit.gpgsign=false",
            ];
            full.extend_from_slice(args);
            run_captured("git", &full, Some(dir)).await.unwrap()
        }

        /// `https://git.test/acme/widget` served from a temporary directory.
        struct Origin {
            root: TempDir,
            dir: PathBuf,
        }

        impl Origin {
            async fn new() -> Self {
                let root = TempDir::new().unwrap();
                let dir = root.path().join("acme").join("widget.git");
                std::fs::create_dir_all(&dir).unwrap();
                git(&dir, &["init", "--quiet"]).await;
                git(&dir, &["symbolic-ref", "HEAD", "refs/heads/main"]).await;
                Self { root, dir }
            }

            /// Commit a dependency list pinning swift-nio at `revision`.
            async fn commit(&self, revision: &str) {
                let deps = lockfile(&[("swift-nio", "https://github.com/apple/swift-nio.git", revision)]);
                std::fs::write(self.dir.join("deps.json"), deps).unwrap();
                git(&self.dir, &["add", "deps.json"]).await;
                git(&self.dir, &["commit", "--quiet", "-m", revision]).await;
            }

            async fn run(&self, args: &[&str]) {
                git(&self.dir, args).await;
            }

            fn resolver(&self) -> ClonedDependencyResolver {
                let base = format!("{}/", self.root.path().display());
                let vcs = GitCli::default().with_config(&format!("url.{}.insteadOf", base), REMOTE);
                let package_manager = CommandPackageManager::new(vec![
                    "sh".to_string(),
                    "-c".to_string(),
                    format!("cp deps.json {}", DEFAULT_LOCKFILE),
                ]);
                ClonedDependencyResolver::new(
                    Arc::new(vcs),
                    Arc::new(package_manager),
                    Arc::new(ManifestReader::new(DEFAULT_LOCKFILE, RawHosts::default())),
                )
            }
        }

        fn widget(suffix: &str) -> RepoReference {
            RepoReference::parse(&format!("{}acme/widget{}", REMOTE, suffix)).unwrap()
        }

        async fn pinned(
            resolver: &ClonedDependencyResolver,
            r: &RepoReference,
            cache: &Path,
        ) -> String {
            let pins = resolver.resolve(r, Some(cache)).await.unwrap().unwrap();
            pins[0].revision().to_string()
        }

        async fn git_available() -> bool {
            GitCli::default().is_available().await
        }

        #[tokio::test]
        async fn test_tag_is_cloned_once_for_two_resolutions() {
            if !git_available().await {
                return;
            }
            let origin = Origin::new().await;
            origin.commit("n1").await;
            origin.run(&["tag", "v1"]).await;
            let resolver = origin.resolver();
            let cache = TempDir::new().unwrap();
            let r = widget("@v1");

            assert_eq!(pinned(&resolver, &r, cache.path()).await, "n1");
            let marker = cache.path().join("acme-widget@v1").join("untracked-marker");
            std::fs::write(&marker, "").unwrap();

            assert_eq!(pinned(&resolver, &r, cache.path()).await, "n1");
            assert!(marker.exists());
        }

        #[tokio::test]
        async fn test_moved_branch_forces_reclone() {
            if !git_available().await {
                return;
            }
            let origin = Origin::new().await;
            origin.commit("n1").await;
            origin.run(&["branch", "release"]).await;
            let resolver = origin.resolver();
            let cache = TempDir::new().unwrap();
            let r = widget("@release");

            assert_eq!(pinned(&resolver, &r, cache.path()).await, "n1");
            let marker = cache.path().join("acme-widget@release").join("untracked-marker");
            std::fs::write(&marker, "").unwrap();

            origin.commit("n2").await;
            origin.run(&["branch", "-f", "release"]).await;

            assert_eq!(pinned(&resolver, &r, cache.path()).await, "n2");
            assert!(!marker.exists());
        }

        #[tokio::test]
        async fn test_head_refreshes_stay_on_default_branch() {
            if !git_available().await {
                return;
            }
            let origin = Origin::new().await;
            origin.commit("n1").await;
            origin.run(&["checkout", "--quiet", "-b", "aaa-feature"]).await;
            origin.commit("feature").await;
            origin.run(&["checkout", "--quiet", "main"]).await;
            let resolver = origin.resolver();
            let cache = TempDir::new().unwrap();
            let r = widget("");

            assert_eq!(pinned(&resolver, &r, cache.path()).await, "n1");
            let marker = cache.path().join("acme-widget@HEAD").join("untracked-marker");
            std::fs::write(&marker, "").unwrap();

            origin.commit("n2").await;
            assert_eq!(pinned(&resolver, &r, cache.path()).await, "n2");
            assert_eq!(pinned(&resolver, &r, cache.path()).await, "n2");
            assert!(marker.exists());
        }
    }
}

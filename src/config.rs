use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::fetcher::RawHosts;
use crate::manifest::DEFAULT_LOCKFILE;

/// Root configuration structure, deserialized from `.license-collect/config.toml`.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP behaviour of license downloads.
    pub fetch: FetchConfig,
    /// Web host to raw-content host substitutions (e.g. `github.com` →
    /// `raw.githubusercontent.com`). Entries are merged over the built-in table.
    pub hosts: HashMap<String, String>,
    /// External binaries.
    pub tools: ToolsConfig,
    /// Clone cache.
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Upper bound on in-flight license requests.
    pub max_concurrent: usize,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            max_concurrent: 16,
            user_agent: format!("license-collect/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Git executable.
    pub git: String,
    /// Extra `git -c key=value` settings, e.g. `http.proxy` or `url.<base>.insteadOf`.
    pub git_config: BTreeMap<String, String>,
    /// Command that resolves a package in its directory, program first.
    pub package_manager: Vec<String>,
    /// Lockfile the package manager writes.
    pub lockfile: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            git: "git".to_string(),
            git_config: BTreeMap::new(),
            package_manager: vec![
                "swift".to_string(),
                "package".to_string(),
                "resolve".to_string(),
            ],
            lockfile: DEFAULT_LOCKFILE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Root of the clone cache. Without one, every clone is temporary.
    pub dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            fetch: FetchConfig::default(),
            hosts: HashMap::new(),
            tools: ToolsConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl Config {
    /// Built-in host table with configured entries layered on top.
    pub fn raw_hosts(&self) -> RawHosts {
        let mut map = RawHosts::default_map();
        map.extend(self.hosts.clone());
        RawHosts::new(map)
    }
}

/// Load the configuration, searching in order:
///
/// 1. `config_override`: path passed via `--config`
/// 2. `<working_dir>/.license-collect/config.toml`
/// 3. `~/.config/license-collect/config.toml`
/// 4. Built-in [`Config::default`]
pub fn load_config(working_dir: &Path, config_override: Option<&Path>) -> Result<Config> {
    if let Some(path) = config_override {
        return read_config(path);
    }

    let local_config = working_dir.join(".license-collect").join("config.toml");
    if local_config.exists() {
        return read_config(&local_config);
    }

    if let Some(home) = dirs::home_dir() {
        let home_config = home
            .join(".config")
            .join("license-collect")
            .join("config.toml");
        if home_config.exists() {
            return read_config(&home_config);
        }
    }

    Ok(Config::default())
}

fn read_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::io(format!("reading config {}", path.display()), e))?;
    toml::from_str(&content).map_err(|e| Error::ConfigInvalid {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

use std::path::{Path, PathBuf};

use anyhow::ensure;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use regmirror_sync::DEFAULT_WORKERS;
use serde::{Deserialize, Serialize};

use crate::cli::SyncArg;

pub const CONFIG_FILE: &str = "regmirror.toml";
pub const ENV_PREFIX: &str = "REGMIRROR_";

/// Runtime settings, layered: defaults < TOML file < `REGMIRROR_*` env < CLI.
///
/// Unset paths are derived from `base_dir`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub base_dir:             PathBuf,
    pub registry_url:         String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feed_path:            Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ledger_path:          Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_root:        Option<PathBuf>,
    pub workers:              usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_packages:         Option<usize>,
    pub connect_timeout_secs: u64,
    /// Longest wait for the next chunk of a response. Unset means a stalled
    /// transfer holds its worker until the peer gives up.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_timeout_secs:    Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_dir:             PathBuf::from("."),
            registry_url:         "https://registry.npmjs.org".to_string(),
            feed_path:            None,
            ledger_path:          None,
            download_root:        None,
            workers:              DEFAULT_WORKERS,
            max_packages:         None,
            connect_timeout_secs: 30,
            read_timeout_secs:    None,
        }
    }
}

impl Config {
    /// Read `explicit`, or `regmirror.toml` under the base directory when
    /// no file is given. A missing default file is not an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self, figment::Error> {
        let file = match explicit {
            Some(path) => path.to_path_buf(),
            None => base_dir_hint()?.join(CONFIG_FILE),
        };
        Self::figment(&file).extract()
    }

    pub fn figment(file: &Path) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    pub fn with_sync_args(mut self, arg: &SyncArg) -> Self {
        if let Some(workers) = arg.workers {
            self.workers = workers;
        }
        if let Some(limit) = arg.limit {
            self.max_packages = Some(limit);
        }
        if let Some(feed) = &arg.feed {
            self.feed_path = Some(feed.clone());
        }
        self
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.workers >= 1, "workers must be at least 1");
        ensure!(!self.registry_url.is_empty(), "registry_url must not be empty");
        ensure!(self.connect_timeout_secs > 0, "connect_timeout_secs must be positive");
        ensure!(self.read_timeout_secs != Some(0), "read_timeout_secs must be positive");
        Ok(())
    }

    pub fn feed_path(&self) -> PathBuf { self.resolve(&self.feed_path, "_changes") }

    pub fn ledger_path(&self) -> PathBuf { self.resolve(&self.ledger_path, "status") }

    pub fn download_root(&self) -> PathBuf { self.resolve(&self.download_root, "packages") }

    fn resolve(&self, explicit: &Option<PathBuf>, default: &str) -> PathBuf {
        explicit.clone().unwrap_or_else(|| self.base_dir.join(default))
    }
}

// The config file lives in the base directory, which itself may come from
// the environment.
fn base_dir_hint() -> Result<PathBuf, figment::Error> {
    Figment::from(Serialized::default("base_dir", "."))
        .merge(Env::prefixed(ENV_PREFIX).only(&["base_dir"]))
        .extract_inner("base_dir")
}

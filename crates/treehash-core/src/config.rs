use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::checksum::DIGEST_CHUNK_BYTES;
use crate::fetcher::{FetchOptions, DOWNLOAD_CHUNK_BYTES, MAX_CONNECTIONS};

pub const DEFAULT_LISTING_URL: &str =
    "https://gitea.radium.group/api/v1/repos/radium/project-configuration/git/trees/master?recursive=1";
pub const DEFAULT_RAW_BASE_URL: &str =
    "https://gitea.radium.group/radium/project-configuration/raw/branch/master";

/// Global configuration loaded from `~/.config/treehash/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TreehashConfig {
    /// Git-trees endpoint returning the recursive listing.
    pub listing_url: String,
    /// Base URL that raw file paths are appended to.
    pub raw_base_url: String,
    /// Number of download shards.
    pub shards: usize,
    /// Receive chunk size for downloads, in bytes.
    pub download_chunk_bytes: usize,
    /// Read chunk size for digesting, in bytes.
    pub digest_chunk_bytes: usize,
    /// Digest threads (None = host parallelism).
    #[serde(default)]
    pub digest_workers: Option<usize>,
    /// TCP connect timeout in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Downloads in flight at once, across all shards.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_max_connections() -> usize {
    MAX_CONNECTIONS
}

impl Default for TreehashConfig {
    fn default() -> Self {
        Self {
            listing_url: DEFAULT_LISTING_URL.to_string(),
            raw_base_url: DEFAULT_RAW_BASE_URL.to_string(),
            shards: 3,
            download_chunk_bytes: DOWNLOAD_CHUNK_BYTES,
            digest_chunk_bytes: DIGEST_CHUNK_BYTES,
            digest_workers: None,
            connect_timeout_secs: default_connect_timeout_secs(),
            max_connections: default_max_connections(),
        }
    }
}

impl TreehashConfig {
    /// Rejects values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.shards == 0 {
            anyhow::bail!("shards must be at least 1");
        }
        if self.download_chunk_bytes == 0 || self.digest_chunk_bytes == 0 {
            anyhow::bail!("chunk sizes must be at least 1 byte");
        }
        if self.max_connections == 0 {
            anyhow::bail!("max_connections must be at least 1");
        }
        if self.digest_workers == Some(0) {
            anyhow::bail!("digest_workers must be at least 1 when set");
        }
        url::Url::parse(&self.listing_url)
            .with_context(|| format!("invalid listing_url: {}", self.listing_url))?;
        url::Url::parse(&self.raw_base_url)
            .with_context(|| format!("invalid raw_base_url: {}", self.raw_base_url))?;
        Ok(())
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            chunk_bytes: self.download_chunk_bytes,
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            max_connections: self.max_connections,
            ..FetchOptions::default()
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("treehash")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from an explicit file.
pub fn load_from_path(path: &Path) -> Result<TreehashConfig> {
    let data = fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
    let cfg: TreehashConfig =
        toml::from_str(&data).with_context(|| format!("parse config {}", path.display()))?;
    Ok(cfg)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<TreehashConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = TreehashConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    load_from_path(&path)
}

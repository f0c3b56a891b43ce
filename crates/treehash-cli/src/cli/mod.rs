//! CLI for treehash.

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use treehash_core::config::{self, TreehashConfig};

use commands::{run_checksum, run_partition, run_pipeline};

/// Top-level CLI for treehash.
#[derive(Debug, Parser)]
#[command(name = "treehash")]
#[command(about = "treehash: download a remote repository tree and print a SHA-256 per file", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

/// Overrides applied on top of the config file.
#[derive(Debug, Default, Args)]
pub struct RunOverrides {
    /// Load this config file instead of ~/.config/treehash/config.toml.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
    /// Git-trees listing endpoint (recursive=1 is added if missing).
    #[arg(long, value_name = "URL")]
    pub listing_url: Option<String>,
    /// Base URL that repository paths are appended to.
    #[arg(long, value_name = "URL")]
    pub raw_base_url: Option<String>,
    /// Number of download shards.
    #[arg(long, value_name = "N")]
    pub shards: Option<usize>,
    /// Number of digest threads (default: host parallelism).
    #[arg(long, value_name = "N")]
    pub digest_workers: Option<usize>,
    /// Downloads in flight at once, across all shards.
    #[arg(long, value_name = "N")]
    pub max_connections: Option<usize>,
}

impl RunOverrides {
    /// Loads the base config and applies any flags that were given.
    pub fn resolve(&self) -> Result<TreehashConfig> {
        let mut cfg = match &self.config {
            Some(path) => config::load_from_path(path)?,
            None => config::load_or_init()?,
        };
        self.apply(&mut cfg);
        cfg.validate()?;
        Ok(cfg)
    }

    fn apply(&self, cfg: &mut TreehashConfig) {
        if let Some(url) = &self.listing_url {
            cfg.listing_url = url.clone();
        }
        if let Some(url) = &self.raw_base_url {
            cfg.raw_base_url = url.clone();
        }
        if let Some(n) = self.shards {
            cfg.shards = n;
        }
        if let Some(n) = self.digest_workers {
            cfg.digest_workers = Some(n);
        }
        if let Some(n) = self.max_connections {
            cfg.max_connections = n;
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// List the repository, download every file and print `<path>: <sha256>` lines.
    Run {
        #[command(flatten)]
        overrides: RunOverrides,
    },

    /// Compute SHA-256 of a local file.
    Checksum {
        /// Path to the file.
        path: PathBuf,
    },

    /// Print how paths would be split across download shards.
    Partition {
        /// Number of shards.
        #[arg(long, default_value = "3", value_name = "N")]
        shards: usize,
        /// Repository paths, in listing order.
        paths: Vec<String>,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Run { overrides } => {
                let cfg = overrides.resolve()?;
                tracing::debug!("resolved config: {:?}", cfg);
                run_pipeline(&cfg).await?;
            }
            CliCommand::Checksum { path } => run_checksum(&path).await?,
            CliCommand::Partition { shards, paths } => run_partition(shards, &paths)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;

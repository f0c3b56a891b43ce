//! `treehash run` – list, download and digest the configured repository.

use anyhow::Result;
use treehash_core::config::TreehashConfig;
use treehash_core::{pipeline, StdoutSink};

pub async fn run_pipeline(cfg: &TreehashConfig) -> Result<()> {
    let records = pipeline::run(cfg, &StdoutSink).await?;
    if records.is_empty() {
        println!("No files in listing.");
    } else {
        tracing::info!("reported {} file(s)", records.len());
    }
    Ok(())
}

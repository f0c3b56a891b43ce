//! One run: listing → download barrier → digest barrier → report.
//!
//! Each phase runs on blocking threads via `spawn_blocking` and is awaited in
//! full before the next begins, so digesting only ever sees files whose
//! download has completed. The scratch root is a `TempDir` owned by the run
//! and removed on every exit path.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::checksum::{digest_all, digest_worker_count};
use crate::config::TreehashConfig;
use crate::downloader::download_all;
use crate::listing::fetch_listing;
use crate::report::{DigestRecord, ReportSink};

/// Runs the whole pipeline once and sends every record to `sink` in listing
/// order. Returns the same records. On failure nothing is reported.
pub async fn run(cfg: &TreehashConfig, sink: &dyn ReportSink) -> Result<Vec<DigestRecord>> {
    run_in(cfg, &std::env::temp_dir(), sink).await
}

/// Like `run`, with the scratch root created under `scratch_parent`.
pub async fn run_in(
    cfg: &TreehashConfig,
    scratch_parent: &Path,
    sink: &dyn ReportSink,
) -> Result<Vec<DigestRecord>> {
    cfg.validate()?;
    let started = Instant::now();
    let opts = cfg.fetch_options();

    let endpoint = cfg.listing_url.clone();
    let listing = tokio::task::spawn_blocking(move || fetch_listing(&endpoint, &opts))
        .await
        .context("listing task join")??;
    let listing = Arc::new(listing);

    let scratch = tempfile::Builder::new()
        .prefix("treehash-")
        .tempdir_in(scratch_parent)
        .with_context(|| format!("create scratch root in {}", scratch_parent.display()))?;
    tracing::debug!(root = %scratch.path().display(), "scratch root ready");

    let summary = {
        let paths = Arc::clone(&listing);
        let base = cfg.raw_base_url.clone();
        let root = scratch.path().to_path_buf();
        let shards = cfg.shards;
        tokio::task::spawn_blocking(move || download_all(&paths, &base, &root, shards, &opts))
            .await
            .context("download task join")??
    };
    tracing::info!(
        files = summary.files,
        bytes = summary.bytes,
        shards = cfg.shards,
        "downloads complete"
    );

    let records = {
        let paths = Arc::clone(&listing);
        let root = scratch.path().to_path_buf();
        let chunk = cfg.digest_chunk_bytes;
        let workers = digest_worker_count(cfg.digest_workers, listing.len());
        tokio::task::spawn_blocking(move || digest_all(&root, &paths, chunk, workers))
            .await
            .context("digest task join")??
    };

    scratch.close().context("remove scratch root")?;

    for record in &records {
        sink.record(record)?;
    }
    tracing::info!(
        files = records.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "run complete"
    );
    Ok(records)
}

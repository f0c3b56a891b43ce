//! Concurrent download of a whole listing into a scratch root.
//!
//! The listing is split into `shards` balanced shards. Jobs go into one shared
//! queue, interleaved shard by shard so every shard makes progress from the
//! start. Each shard thread hosts its share of a bounded set of transfer
//! workers (`max_connections`), and every worker drains the shared queue, so
//! at most `max_connections` sockets and destination files are open at once.
//! Results flow back over a channel tagged with the file's listing index.
//!
//! On the first failure an abort flag is raised: fetches that have not issued
//! their request yet stop, transfers already running are left to finish, and
//! once the batch has settled the first failure is returned.

use anyhow::{Context, Result};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};

use crate::error::FetchError;
use crate::fetcher::{self, FetchOptions};
use crate::repo_path::{raw_url, scratch_path};
use crate::shard::partition;

/// Totals for a finished download phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadSummary {
    pub files: usize,
    pub bytes: u64,
}

struct FileJob {
    index: usize,
    shard: usize,
    url: String,
    dest: PathBuf,
}

/// Number of transfer workers for `files` downloads: the connection cap, never
/// more than there are files.
pub fn transfer_slots(max_connections: usize, files: usize) -> usize {
    max_connections.max(1).min(files.max(1))
}

/// Listing indices in queue order: the first file of every shard, then the
/// second of every shard, and so on.
fn interleave(plan: &[Vec<usize>]) -> Vec<usize> {
    let longest = plan.iter().map(Vec::len).max().unwrap_or(0);
    (0..longest)
        .flat_map(|round| plan.iter().filter_map(move |shard| shard.get(round).copied()))
        .collect()
}

/// Downloads every path in `paths` from `base_url` into `dest_root`.
///
/// URLs and destinations are resolved for the whole listing before any
/// request is issued, so a bad path fails the run without network traffic.
pub fn download_all(
    paths: &[String],
    base_url: &str,
    dest_root: &Path,
    shards: usize,
    opts: &FetchOptions,
) -> Result<DownloadSummary> {
    if shards == 0 {
        anyhow::bail!("shard count must be at least 1");
    }

    let mut resolved = Vec::with_capacity(paths.len());
    for rel in paths {
        let url = raw_url(base_url, rel)?;
        let dest = scratch_path(dest_root, rel).with_context(|| format!("download {}", rel))?;
        resolved.push(Some((url, dest)));
    }
    let count = resolved.len();
    if count == 0 {
        return Ok(DownloadSummary::default());
    }

    let plan = partition(&(0..count).collect::<Vec<_>>(), shards);
    let mut shard_of = vec![0usize; count];
    for (shard, members) in plan.iter().enumerate() {
        tracing::debug!(shard, files = members.len(), "shard planned");
        for &i in members {
            shard_of[i] = shard;
        }
    }
    let mut queue = VecDeque::with_capacity(count);
    for index in interleave(&plan) {
        if let Some((url, dest)) = resolved[index].take() {
            queue.push_back(FileJob {
                index,
                shard: shard_of[index],
                url,
                dest,
            });
        }
    }
    let work: Arc<Mutex<VecDeque<FileJob>>> = Arc::new(Mutex::new(queue));

    let slots = transfer_slots(opts.max_connections, count);
    let workers_per_shard: Vec<usize> = partition(&(0..slots).collect::<Vec<_>>(), shards)
        .iter()
        .map(Vec::len)
        .collect();
    tracing::debug!(files = count, shards, workers = slots, "download pool starting");

    let abort = Arc::new(AtomicBool::new(false));
    let (tx, rx) = mpsc::channel::<(usize, Result<u64, FetchError>)>();
    let mut handles = Vec::with_capacity(shards);
    for (shard_index, workers) in workers_per_shard.into_iter().enumerate() {
        if workers == 0 {
            continue;
        }
        let tx = tx.clone();
        let work = Arc::clone(&work);
        let abort = Arc::clone(&abort);
        let opts = *opts;
        handles.push(std::thread::spawn(move || {
            tracing::debug!(shard = shard_index, workers, "shard workers starting");
            std::thread::scope(|s| {
                for _ in 0..workers {
                    let tx = tx.clone();
                    let work = work.as_ref();
                    let abort = abort.as_ref();
                    let opts = &opts;
                    s.spawn(move || loop {
                        let next = match work.lock() {
                            Ok(mut q) => q.pop_front(),
                            Err(_) => None,
                        };
                        let Some(job) = next else {
                            break;
                        };
                        let res = fetcher::fetch(&job.url, &job.dest, opts, Some(abort));
                        match &res {
                            Ok(bytes) => tracing::trace!(shard = job.shard, bytes, "file done"),
                            Err(FetchError::Aborted) => {}
                            Err(_) => abort.store(true, Ordering::Relaxed),
                        }
                        if tx.send((job.index, res)).is_err() {
                            break;
                        }
                    });
                }
            });
        }));
    }
    drop(tx);

    let mut summary = DownloadSummary::default();
    let mut first_error: Option<anyhow::Error> = None;
    let mut skipped = 0usize;
    for (index, res) in rx {
        match res {
            Ok(bytes) => {
                summary.files += 1;
                summary.bytes += bytes;
            }
            Err(FetchError::Aborted) => skipped += 1,
            Err(e) => {
                tracing::warn!(path = %paths[index], "download failed: {}", e);
                if first_error.is_none() {
                    first_error = Some(anyhow::Error::new(e).context(format!("download {}", paths[index])));
                }
            }
        }
    }
    for h in handles {
        if let Err(e) = h.join() {
            if first_error.is_none() {
                first_error = Some(anyhow::anyhow!("shard worker panicked: {:?}", e));
            }
        }
    }
    if let Some(e) = first_error {
        if skipped > 0 {
            tracing::info!(skipped, "downloads not issued after failure");
        }
        return Err(e);
    }
    if summary.files != count {
        anyhow::bail!("only {} of {} downloads reported completion", summary.files, count);
    }
    Ok(summary)
}

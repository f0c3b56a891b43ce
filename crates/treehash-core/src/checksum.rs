//! SHA-256 digests of downloaded files.
//!
//! Digesting runs after every download has settled, on a pool of plain OS
//! threads so large trees hash in parallel rather than interleaved.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::collections::VecDeque;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};

use crate::error::FetchError;
use crate::repo_path::scratch_path;
use crate::report::DigestRecord;

/// Default read size for digesting.
pub const DIGEST_CHUNK_BYTES: usize = 4096;

/// Compute SHA-256 of a file and return the digest as lowercase hex.
pub fn sha256_path(path: &Path) -> Result<String> {
    Ok(sha256_path_chunked(path, DIGEST_CHUNK_BYTES)?)
}

/// Like `sha256_path` but reads `chunk_bytes` at a time. The result does not
/// depend on the chunk size.
pub fn sha256_path_chunked(path: &Path, chunk_bytes: usize) -> Result<String, FetchError> {
    let mut f = File::open(path).map_err(|e| FetchError::fs(path, e))?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; chunk_bytes.max(1)];
    loop {
        let n = f.read(&mut buf).map_err(|e| FetchError::fs(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Number of digest threads for `files` files: the requested count, or host
/// parallelism when `None`, never more than there are files.
pub fn digest_worker_count(requested: Option<usize>, files: usize) -> usize {
    let base = requested.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    });
    base.max(1).min(files.max(1))
}

/// Digest every `paths` entry under `root` with `workers` threads.
///
/// Records come back in the order of `paths`, regardless of which worker
/// finished first. Any failure fails the whole batch; no records are returned.
pub fn digest_all(
    root: &Path,
    paths: &[String],
    chunk_bytes: usize,
    workers: usize,
) -> Result<Vec<DigestRecord>> {
    let count = paths.len();
    if count == 0 {
        return Ok(Vec::new());
    }

    let mut queue = VecDeque::with_capacity(count);
    for (index, rel) in paths.iter().enumerate() {
        queue.push_back((index, scratch_path(root, rel)?));
    }
    let work: Arc<Mutex<VecDeque<(usize, PathBuf)>>> = Arc::new(Mutex::new(queue));
    let (tx, rx) = mpsc::channel();
    let num_workers = workers.max(1).min(count);
    tracing::debug!(files = count, workers = num_workers, "digest pool starting");

    let mut handles = Vec::with_capacity(num_workers);
    for _ in 0..num_workers {
        let work = Arc::clone(&work);
        let tx = tx.clone();
        handles.push(std::thread::spawn(move || loop {
            let next = match work.lock() {
                Ok(mut q) => q.pop_front(),
                Err(_) => None,
            };
            let Some((index, path)) = next else {
                break;
            };
            let res = sha256_path_chunked(&path, chunk_bytes);
            if tx.send((index, res)).is_err() {
                break;
            }
        }));
    }
    drop(tx);

    let mut digests: Vec<Option<String>> = vec![None; count];
    let mut first_error: Option<anyhow::Error> = None;
    for (index, res) in rx {
        match res {
            Ok(hex) => digests[index] = Some(hex),
            Err(e) => {
                tracing::warn!(path = %paths[index], "digest failed: {}", e);
                if first_error.is_none() {
                    first_error = Some(anyhow::Error::new(e).context(format!("digest {}", paths[index])));
                }
            }
        }
    }
    for h in handles {
        if let Err(e) = h.join() {
            if first_error.is_none() {
                first_error = Some(anyhow::anyhow!("digest worker panicked: {:?}", e));
            }
        }
    }
    if let Some(e) = first_error {
        return Err(e);
    }

    paths
        .iter()
        .zip(digests)
        .map(|(path, digest)| {
            let digest = digest.with_context(|| format!("no digest produced for {}", path))?;
            Ok::<_, anyhow::Error>(DigestRecord {
                path: path.clone(),
                digest,
            })
        })
        .collect()
}

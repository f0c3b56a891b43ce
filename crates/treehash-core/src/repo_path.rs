//! Mapping repository-relative paths to raw URLs and scratch files.

use anyhow::{Context, Result};
use std::io;
use std::path::{Path, PathBuf};

use crate::error::FetchError;

/// Raw-content URL for `rel` under `base_url`.
///
/// Each `/`-separated segment of `rel` is percent-encoded and appended to the
/// base path; a trailing slash on `base_url` makes no difference.
pub fn raw_url(base_url: &str, rel: &str) -> Result<String> {
    let mut url = url::Url::parse(base_url).with_context(|| format!("invalid base URL: {}", base_url))?;
    url.path_segments_mut()
        .map_err(|_| anyhow::anyhow!("base URL cannot have path segments: {}", base_url))?
        .pop_if_empty()
        .extend(rel.split('/'));
    Ok(url.into())
}

/// Local path for `rel` inside `root`.
///
/// Rejects absolute paths and `.`, `..` or empty segments so every file stays
/// inside the scratch root.
pub fn scratch_path(root: &Path, rel: &str) -> Result<PathBuf, FetchError> {
    let valid = !rel.is_empty()
        && !rel.starts_with('/')
        && rel
            .split('/')
            .all(|seg| !seg.is_empty() && seg != "." && seg != ".." && !seg.contains('\\'));
    if !valid {
        return Err(FetchError::fs(
            rel,
            io::Error::new(io::ErrorKind::InvalidInput, "path escapes the scratch root"),
        ));
    }
    Ok(rel.split('/').fold(root.to_path_buf(), |acc, seg| acc.join(seg)))
}

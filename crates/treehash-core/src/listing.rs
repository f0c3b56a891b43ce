//! Repository tree listing.
//!
//! One GET against the git-trees endpoint with `recursive=1`; the JSON body
//! is `{"tree": [{"path": ..., "type": "blob" | "tree", ...}, ...]}`. Only
//! blob entries are files to download.

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::FetchError;
use crate::fetcher::{configure, FetchOptions};

#[derive(Debug, Deserialize)]
struct TreeListing {
    tree: Vec<TreeEntry>,
    /// Set by the server when the tree was cut short; there is no pagination.
    #[serde(default)]
    truncated: bool,
}

#[derive(Debug, Deserialize)]
struct TreeEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

/// `endpoint` with `recursive=1` in its query (added only if missing).
pub fn listing_request_url(endpoint: &str) -> Result<String> {
    let mut url = url::Url::parse(endpoint).with_context(|| format!("invalid listing URL: {}", endpoint))?;
    if !url.query_pairs().any(|(k, _)| k == "recursive") {
        url.query_pairs_mut().append_pair("recursive", "1");
    }
    Ok(url.into())
}

/// Extracts file paths from a listing body, in listing order.
pub fn parse_listing(body: &[u8]) -> Result<Vec<String>, FetchError> {
    let listing: TreeListing =
        serde_json::from_slice(body).map_err(|e| FetchError::Listing(e.to_string()))?;
    if listing.truncated {
        tracing::warn!("listing is marked truncated; some files will be missing");
    }
    Ok(listing
        .tree
        .into_iter()
        .filter(|e| e.kind == "blob")
        .map(|e| e.path)
        .collect())
}

fn get_body(url: &str, opts: &FetchOptions) -> Result<Vec<u8>, FetchError> {
    let mut body = Vec::new();
    let mut easy = curl::easy::Easy::new();
    configure(&mut easy, url, opts)?;
    easy.useragent(concat!("treehash/", env!("CARGO_PKG_VERSION")))?;
    {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            body.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.perform()?;
    }

    let code = easy.response_code()?;
    if !(200..300).contains(&code) {
        return Err(FetchError::Http {
            url: url.to_string(),
            code,
        });
    }
    Ok(body)
}

/// Fetches the listing at `endpoint` and returns the blob paths.
/// Blocking; call from `spawn_blocking` when used from async code.
pub fn fetch_listing(endpoint: &str, opts: &FetchOptions) -> Result<Vec<String>> {
    let url = listing_request_url(endpoint)?;
    let body = get_body(&url, opts).context("listing request failed")?;
    let paths = parse_listing(&body).with_context(|| format!("listing from {}", url))?;
    tracing::info!(files = paths.len(), "fetched listing");
    Ok(paths)
}

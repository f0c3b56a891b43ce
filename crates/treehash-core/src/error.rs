//! Error type for listing, fetch and digest failures.

use std::path::PathBuf;

/// Error from a single listing request, file fetch, or file digest.
/// Kept typed so the coordinator can tell real failures from skipped work
/// before converting to anyhow.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Curl reported an error (connect, DNS, timeout, aborted transfer).
    #[error("{0}")]
    Curl(#[from] curl::Error),
    /// HTTP response had a non-2xx status.
    #[error("GET {url} returned HTTP {code}")]
    Http { url: String, code: u32 },
    /// Listing body did not have the expected `{"tree": [{path, type}]}` shape.
    #[error("malformed listing: {0}")]
    Listing(String),
    /// Directory creation, write, or read failed.
    #[error("{}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Not issued because another download in the batch already failed.
    #[error("skipped after an earlier failure")]
    Aborted,
}

impl FetchError {
    pub(crate) fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FetchError::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// True for network-side failures: curl errors, HTTP status, and malformed listings.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            FetchError::Curl(_) | FetchError::Http { .. } | FetchError::Listing(_)
        )
    }
}

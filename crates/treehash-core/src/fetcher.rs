//! Single-file HTTP GET into a local path.
//!
//! Streams the response body to the destination in bounded chunks; nothing is
//! buffered in memory beyond one curl receive buffer. The destination (and its
//! parent directories) are only created once the first body bytes of a 2xx
//! response arrive; error bodies are discarded.

use std::cell::Cell;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::error::FetchError;

/// Default receive chunk for downloads.
pub const DOWNLOAD_CHUNK_BYTES: usize = 1024;

/// Default cap on transfers in flight at once across all shards.
pub const MAX_CONNECTIONS: usize = 64;

/// Curl tuning shared by every fetch in a run.
#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    /// Receive buffer size; each write to disk is at most this many bytes.
    pub chunk_bytes: usize,
    pub connect_timeout: Duration,
    /// Abort a transfer that stays below 1 KiB/s for this long.
    pub low_speed_time: Duration,
    /// Transfers (sockets and open destination files) in flight at once.
    pub max_connections: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            chunk_bytes: DOWNLOAD_CHUNK_BYTES,
            connect_timeout: Duration::from_secs(30),
            low_speed_time: Duration::from_secs(60),
            max_connections: MAX_CONNECTIONS,
        }
    }
}

pub(crate) fn configure(easy: &mut curl::easy::Easy, url: &str, opts: &FetchOptions) -> Result<(), curl::Error> {
    easy.url(url)?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.connect_timeout(opts.connect_timeout)?;
    easy.low_speed_limit(1024)?;
    easy.low_speed_time(opts.low_speed_time)?;
    Ok(())
}

/// Status code from an HTTP status line (`HTTP/1.1 200 OK`), if `header` is one.
fn status_code(header: &[u8]) -> Option<u32> {
    let line = std::str::from_utf8(header).ok()?;
    let rest = line.strip_prefix("HTTP/")?;
    rest.split_whitespace().nth(1)?.parse().ok()
}

/// Creates `dest` (truncating), making parent directories as needed.
fn open_dest(dest: &Path) -> io::Result<File> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    File::create(dest)
}

/// Downloads `url` into `dest` (created or truncated). Returns bytes written.
///
/// If `abort` is set by the time the request would be issued, returns
/// `FetchError::Aborted` and leaves the filesystem untouched. On any other
/// error the contents of `dest` are unspecified.
pub fn fetch(
    url: &str,
    dest: &Path,
    opts: &FetchOptions,
    abort: Option<&AtomicBool>,
) -> Result<u64, FetchError> {
    let mut easy = curl::easy::Easy::new();
    configure(&mut easy, url, opts)?;
    easy.buffer_size(opts.chunk_bytes.max(1))?;

    if abort.map(|a| a.load(Ordering::Relaxed)).unwrap_or(false) {
        return Err(FetchError::Aborted);
    }

    let mut file: Option<File> = None;
    let status_ok = Cell::new(true);
    let mut written = 0u64;
    let mut write_error: Option<io::Error> = None;

    let perform_result = {
        let mut transfer = easy.transfer();
        // Redirects produce several status lines; the last one wins.
        transfer.header_function(|header| {
            if let Some(code) = status_code(header) {
                status_ok.set((200..300).contains(&code));
            }
            true
        })?;
        transfer.write_function(|data| {
            if !status_ok.get() {
                return Ok(data.len());
            }
            let mut f = match file.take() {
                Some(f) => f,
                None => match open_dest(dest) {
                    Ok(f) => f,
                    Err(e) => {
                        write_error = Some(e);
                        return Ok(0); // abort transfer
                    }
                },
            };
            let res = f.write_all(data);
            file = Some(f);
            match res {
                Ok(()) => {
                    written += data.len() as u64;
                    Ok(data.len())
                }
                Err(e) => {
                    write_error = Some(e);
                    Ok(0) // abort transfer
                }
            }
        })?;
        transfer.perform()
    };
    if let Err(e) = perform_result {
        if e.is_write_error() {
            if let Some(io_err) = write_error.take() {
                return Err(FetchError::fs(dest, io_err));
            }
        }
        return Err(FetchError::Curl(e));
    }

    let code = easy.response_code()?;
    if !(200..300).contains(&code) {
        return Err(FetchError::Http {
            url: url.to_string(),
            code,
        });
    }
    // Empty body: no write callback ran.
    let mut file = match file {
        Some(f) => f,
        None => open_dest(dest).map_err(|e| FetchError::fs(dest, e))?,
    };
    file.flush().map_err(|e| FetchError::fs(dest, e))?;
    tracing::debug!(url, bytes = written, "fetched");
    Ok(written)
}

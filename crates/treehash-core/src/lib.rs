//! treehash core: list a remote repository tree, download every file
//! concurrently into a scratch root, and report a SHA-256 per file.

pub mod config;
pub mod logging;

pub mod checksum;
pub mod downloader;
pub mod error;
pub mod fetcher;
pub mod listing;
pub mod pipeline;
pub mod repo_path;
pub mod report;
pub mod shard;

pub use error::FetchError;
pub use report::{DigestRecord, MemorySink, ReportSink, StdoutSink};

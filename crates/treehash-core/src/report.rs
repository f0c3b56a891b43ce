//! Digest records and the sinks that receive the final report.

use anyhow::Result;
use std::fmt;
use std::io::Write;
use std::sync::Mutex;

/// One reported file: repository path and lowercase hex SHA-256.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestRecord {
    pub path: String,
    pub digest: String,
}

impl fmt::Display for DigestRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.digest)
    }
}

/// Receives report lines from the pipeline, in listing order, once every
/// file has been digested.
pub trait ReportSink: Send + Sync {
    fn record(&self, record: &DigestRecord) -> Result<()>;
}

/// Writes `<path>: <digest>` lines to stdout.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl ReportSink for StdoutSink {
    fn record(&self, record: &DigestRecord) -> Result<()> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "{}", record)?;
        Ok(())
    }
}

/// Collects records in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<DigestRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<DigestRecord> {
        self.records
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.records().iter().map(ToString::to_string).collect()
    }
}

impl ReportSink for MemorySink {
    fn record(&self, record: &DigestRecord) -> Result<()> {
        self.records
            .lock()
            .map_err(|_| anyhow::anyhow!("report sink lock poisoned"))?
            .push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_line_format() {
        let r = DigestRecord {
            path: "dir/file1.txt".into(),
            digest: "abc123".into(),
        };
        assert_eq!(r.to_string(), "dir/file1.txt: abc123");
    }

    #[test]
    fn memory_sink_keeps_order() {
        let sink = MemorySink::new();
        for p in ["b", "a", "c"] {
            sink.record(&DigestRecord {
                path: p.into(),
                digest: "00".into(),
            })
            .unwrap();
        }
        assert_eq!(sink.lines(), vec!["b: 00", "a: 00", "c: 00"]);
    }
}

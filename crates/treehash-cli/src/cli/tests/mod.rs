//! CLI parse tests.

use super::{Cli, CliCommand, RunOverrides};
use clap::Parser;
use treehash_core::config::TreehashConfig;

fn parse(args: &[&str]) -> CliCommand {
    let cli = Cli::try_parse_from(args).unwrap();
    cli.command
}

#[test]
fn cli_parse_run_defaults() {
    match parse(&["treehash", "run"]) {
        CliCommand::Run { overrides } => {
            assert!(overrides.config.is_none());
            assert!(overrides.listing_url.is_none());
            assert!(overrides.raw_base_url.is_none());
            assert!(overrides.shards.is_none());
            assert!(overrides.digest_workers.is_none());
            assert!(overrides.max_connections.is_none());
        }
        _ => panic!("expected Run"),
    }
}

#[test]
fn cli_parse_run_overrides() {
    match parse(&[
        "treehash",
        "run",
        "--listing-url",
        "http://127.0.0.1:3000/api/trees/main",
        "--raw-base-url",
        "http://127.0.0.1:3000/raw",
        "--shards",
        "5",
        "--digest-workers",
        "2",
        "--max-connections",
        "16",
        "--config",
        "/tmp/treehash.toml",
    ]) {
        CliCommand::Run { overrides } => {
            assert_eq!(overrides.shards, Some(5));
            assert_eq!(overrides.digest_workers, Some(2));
            assert_eq!(overrides.max_connections, Some(16));
            assert_eq!(
                overrides.listing_url.as_deref(),
                Some("http://127.0.0.1:3000/api/trees/main")
            );
            assert_eq!(overrides.config.as_deref(), Some(std::path::Path::new("/tmp/treehash.toml")));
        }
        _ => panic!("expected Run"),
    }
}

#[test]
fn cli_parse_checksum() {
    match parse(&["treehash", "checksum", "/tmp/file.bin"]) {
        CliCommand::Checksum { path } => assert_eq!(path, std::path::PathBuf::from("/tmp/file.bin")),
        _ => panic!("expected Checksum"),
    }
}

#[test]
fn cli_parse_partition() {
    match parse(&["treehash", "partition", "--shards", "2", "a", "b", "c"]) {
        CliCommand::Partition { shards, paths } => {
            assert_eq!(shards, 2);
            assert_eq!(paths, vec!["a", "b", "c"]);
        }
        _ => panic!("expected Partition"),
    }
    match parse(&["treehash", "partition"]) {
        CliCommand::Partition { shards, paths } => {
            assert_eq!(shards, 3);
            assert!(paths.is_empty());
        }
        _ => panic!("expected Partition"),
    }
}

#[test]
fn cli_rejects_bad_shards() {
    assert!(Cli::try_parse_from(["treehash", "run", "--shards", "many"]).is_err());
}

#[test]
fn overrides_apply_on_top_of_config() {
    let overrides = RunOverrides {
        raw_base_url: Some("http://mirror.local/raw".into()),
        shards: Some(7),
        digest_workers: Some(4),
        max_connections: Some(8),
        ..RunOverrides::default()
    };
    let mut cfg = TreehashConfig::default();
    let listing_before = cfg.listing_url.clone();
    overrides.apply(&mut cfg);
    assert_eq!(cfg.raw_base_url, "http://mirror.local/raw");
    assert_eq!(cfg.shards, 7);
    assert_eq!(cfg.digest_workers, Some(4));
    assert_eq!(cfg.max_connections, 8);
    assert_eq!(cfg.listing_url, listing_before);
}

#[test]
fn resolve_reads_explicit_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
            listing_url = "http://127.0.0.1:1/api/trees/main"
            raw_base_url = "http://127.0.0.1:1/raw"
            shards = 2
            download_chunk_bytes = 1024
            digest_chunk_bytes = 4096
        "#,
    )
    .unwrap();
    let overrides = RunOverrides {
        config: Some(path),
        shards: Some(4),
        ..RunOverrides::default()
    };
    let cfg = overrides.resolve().unwrap();
    assert_eq!(cfg.shards, 4);
    assert_eq!(cfg.raw_base_url, "http://127.0.0.1:1/raw");

    let zero = RunOverrides {
        config: Some(dir.path().join("config.toml")),
        shards: Some(0),
        ..RunOverrides::default()
    };
    assert!(zero.resolve().is_err());
}

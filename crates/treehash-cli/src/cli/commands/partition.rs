//! `treehash partition` – show the shard plan for a list of paths.

use anyhow::Result;
use treehash_core::shard::partition;

/// One line per shard: `shard <i> (<n>): <paths...>`.
pub fn format_plan(shards: &[Vec<String>]) -> Vec<String> {
    shards
        .iter()
        .enumerate()
        .map(|(i, s)| format!("shard {} ({}): {}", i, s.len(), s.join(" ")).trim_end().to_string())
        .collect()
}

pub fn run_partition(shards: usize, paths: &[String]) -> Result<()> {
    if shards == 0 {
        anyhow::bail!("--shards must be at least 1");
    }
    for line in format_plan(&partition(paths, shards)) {
        println!("{}", line);
    }
    Ok(())
}

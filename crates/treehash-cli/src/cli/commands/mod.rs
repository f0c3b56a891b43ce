//! CLI command handlers, one per file.

mod checksum;
mod partition;
mod run;

pub use checksum::run_checksum;
pub use partition::run_partition;
pub use run::run_pipeline;

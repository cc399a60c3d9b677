//! CLI command handlers, one file per command.

mod cache;
mod run;

pub use cache::{run_cache_clear, run_cache_list};
pub use run::{run_source, RunArgs};

//! CLI for the wdmirror SPARQL/media mirror.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use wdmirror_core::cache::CacheStore;
use wdmirror_core::config;

use commands::{run_cache_clear, run_cache_list, run_source, RunArgs};

/// Top-level CLI for the wdmirror mirror tool.
#[derive(Debug, Parser)]
#[command(name = "wdmirror")]
#[command(about = "wdmirror: cache-backed SPARQL result and media mirror", long_about = None)]
pub struct Cli {
    /// Enable the progress display and diagnostic logging.
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Fetch the query result, rewrite media URIs, and optionally download
    /// the referenced media.
    Run {
        /// SPARQL endpoint URL.
        #[arg(long)]
        endpoint: Option<String>,

        /// Inline SPARQL query.
        #[arg(long, conflicts_with = "sparql_file")]
        sparql: Option<String>,

        /// Read the SPARQL query from a file.
        #[arg(long, value_name = "FILE")]
        sparql_file: Option<PathBuf>,

        /// Label attached to the produced records.
        #[arg(long)]
        type_name: Option<String>,

        /// Where to write the flattened records (default: <work dir>/records.json).
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,

        /// Download referenced media (also enabled by DOWNLOAD_MEDIA=true).
        #[arg(long)]
        download_media: bool,

        /// Bypass the cache for this run; every lookup is a forced miss.
        #[arg(long)]
        no_cache: bool,

        /// Override the default cache TTL in milliseconds (0 = never expires).
        #[arg(long, value_name = "MS")]
        ttl_ms: Option<u64>,

        /// Override the configured base directory.
        #[arg(long, value_name = "DIR")]
        base_dir: Option<PathBuf>,
    },

    /// Inspect or clear the on-disk cache index.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// List all cache entries with their expiry.
    List,
    /// Drop every cache entry.
    Clear,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let mut cfg = config::load_or_init()?;
        if self.verbose {
            cfg.verbose = true;
        }
        tracing::debug!("loaded config: {:?}", cfg);

        match self.command {
            CliCommand::Run {
                endpoint,
                sparql,
                sparql_file,
                type_name,
                out,
                download_media,
                no_cache,
                ttl_ms,
                base_dir,
            } => {
                if no_cache {
                    cfg.cache_enabled = false;
                }
                if let Some(ttl) = ttl_ms {
                    cfg.default_ttl_ms = ttl;
                }
                if let Some(dir) = base_dir {
                    cfg.base_dir = dir;
                }
                run_source(
                    &cfg,
                    RunArgs {
                        endpoint,
                        sparql,
                        sparql_file,
                        type_name,
                        out,
                        download_media,
                    },
                )
                .await?;
            }
            CliCommand::Cache { action } => {
                let cache = CacheStore::load(cfg.cache_path()?, true);
                match action {
                    CacheAction::List => run_cache_list(&cache)?,
                    CacheAction::Clear => run_cache_clear(&cache)?,
                }
            }
        }

        Ok(())
    }
}

//! `wdmirror run` – fetch the query result, write flattened records, and
//! optionally download the referenced media.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use wdmirror_core::cache::CacheStore;
use wdmirror_core::config::MirrorConfig;
use wdmirror_core::downloader::Downloader;
use wdmirror_core::fetch::FetchClient;
use wdmirror_core::progress::{ConsoleReporter, NoopReporter, ProgressReporter};
use wdmirror_core::source::{Source, SourceOptions};

pub struct RunArgs {
    pub endpoint: Option<String>,
    pub sparql: Option<String>,
    pub sparql_file: Option<PathBuf>,
    pub type_name: Option<String>,
    pub out: Option<PathBuf>,
    pub download_media: bool,
}

pub async fn run_source(cfg: &MirrorConfig, args: RunArgs) -> Result<()> {
    let work_dir = cfg.work_dir()?;
    std::fs::create_dir_all(&work_dir)
        .with_context(|| format!("create work dir: {}", work_dir.display()))?;

    let cache = Arc::new(CacheStore::load(
        work_dir.join(&cfg.cache_file),
        cfg.cache_enabled,
    ));
    let client = FetchClient::new(Arc::clone(&cache), &work_dir, cfg.default_ttl_ms);

    let sparql = match (&args.sparql, &args.sparql_file) {
        (Some(query), _) => query.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("read query file: {}", path.display()))?,
        (None, None) => String::new(),
    };

    let source = Source::new(
        SourceOptions {
            endpoint: args.endpoint.unwrap_or_default(),
            sparql,
            type_name: args.type_name.unwrap_or_default(),
            media_dir: work_dir.clone(),
        },
        client,
    )?;

    println!("Fetching query result ...");
    let output = tokio::task::spawn_blocking(move || source.load())
        .await
        .context("query task join")??;
    println!(
        "{}: {} record(s), {} media file(s) referenced",
        output.type_name,
        output.records.len(),
        output.downloads.len()
    );

    let out_path = args.out.unwrap_or_else(|| work_dir.join("records.json"));
    let json = serde_json::to_string_pretty(&output.records)?;
    std::fs::write(&out_path, json)
        .with_context(|| format!("write records: {}", out_path.display()))?;
    println!("Records written to {}", out_path.display());

    if media_download_enabled(args.download_media) {
        println!("Starting media download(s) ...");
        let reporter: Arc<dyn ProgressReporter> = if cfg.verbose {
            Arc::new(ConsoleReporter::new())
        } else {
            Arc::new(NoopReporter)
        };
        let downloader = Downloader::new(cache, reporter, cfg.default_ttl_ms);
        let results = downloader.run_all(output.downloads).await;
        let failed = results.iter().filter(|r| r.is_err()).count();
        println!(
            "{} download(s) completed, {} failed",
            results.len() - failed,
            failed
        );
    } else {
        tracing::info!("media download skipped (pass --download-media or set DOWNLOAD_MEDIA=true)");
    }

    Ok(())
}

fn media_download_enabled(flag: bool) -> bool {
    flag || std::env::var("DOWNLOAD_MEDIA").map(|v| v == "true").unwrap_or(false)
}

//! Cache-backed fetch of a single JSON resource.
//!
//! Resolves the request through the `CacheStore` before any network I/O; a
//! hit bypasses the network entirely, even when the entry is stale-but-present
//! and the network is unreachable. A corrupt or unreadable cached file is a
//! forced cache miss (re-fetched, never surfaced as an error) so the lookup
//! path and the read path apply one policy.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::CacheStore;
use crate::error::{FetchError, FetchResult};
use crate::fingerprint::fingerprint;

pub const SPARQL_RESULTS_ACCEPT: &str = "application/sparql-results+json";

/// Fetches JSON documents through the cache. One network attempt per miss;
/// no retries.
pub struct FetchClient {
    cache: Arc<CacheStore>,
    work_dir: PathBuf,
    default_ttl_ms: u64,
}

impl FetchClient {
    pub fn new(cache: Arc<CacheStore>, work_dir: impl Into<PathBuf>, default_ttl_ms: u64) -> Self {
        Self {
            cache,
            work_dir: work_dir.into(),
            default_ttl_ms,
        }
    }

    /// Fetches `url` and parses the body as JSON.
    ///
    /// Blocking; call from `spawn_blocking` if used from async code.
    pub fn fetch_json(&self, url: &str) -> FetchResult<serde_json::Value> {
        let fp = fingerprint(url);

        if let Some(path) = self.cache.lookup(&fp) {
            tracing::info!(url, "cache hit");
            match std::fs::read(&path) {
                Ok(bytes) => match serde_json::from_slice(&bytes) {
                    Ok(doc) => return Ok(doc),
                    Err(e) => {
                        tracing::warn!(path = %path.display(), "cached document corrupt, refetching: {e}");
                    }
                },
                Err(e) => {
                    tracing::warn!(path = %path.display(), "cached document unreadable, refetching: {e}");
                }
            }
        }

        tracing::info!(url, "fetching query result");
        let body = get_bytes(url, SPARQL_RESULTS_ACCEPT)?;
        let doc: serde_json::Value =
            serde_json::from_slice(&body).map_err(|e| FetchError::Parse {
                url: url.to_string(),
                source: e,
            })?;

        // Persist the body verbatim and register it before returning.
        std::fs::create_dir_all(&self.work_dir)
            .map_err(|e| FetchError::filesystem(&self.work_dir, e))?;
        let path = self.work_dir.join(format!("{fp}.json"));
        std::fs::write(&path, &body).map_err(|e| FetchError::filesystem(&path, e))?;
        if let Err(e) = self.cache.put(&fp, &path, self.default_ttl_ms) {
            tracing::warn!("cache index persist failed: {e:#}");
        }
        Ok(doc)
    }
}

/// Buffered GET returning the full response body. Non-2xx is an error.
fn get_bytes(url: &str, accept: &str) -> FetchResult<Vec<u8>> {
    let mut body: Vec<u8> = Vec::new();
    let mut easy = curl::easy::Easy::new();

    perform_get(&mut easy, url, accept, &mut body).map_err(|e| FetchError::network(url, e))?;

    let status = easy
        .response_code()
        .map_err(|e| FetchError::network(url, e))?;
    if !(200..300).contains(&status) {
        return Err(FetchError::Http {
            url: url.to_string(),
            status,
        });
    }
    Ok(body)
}

fn perform_get(
    easy: &mut curl::easy::Easy,
    url: &str,
    accept: &str,
    body: &mut Vec<u8>,
) -> Result<(), curl::Error> {
    easy.url(url)?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.connect_timeout(Duration::from_secs(30))?;

    let mut list = curl::easy::List::new();
    list.append(&format!("Accept: {accept}"))?;
    easy.http_headers(list)?;

    let mut transfer = easy.transfer();
    transfer.write_function(|data| {
        body.extend_from_slice(data);
        Ok(data.len())
    })?;
    transfer.perform()
}

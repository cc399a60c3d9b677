//! Concurrent cache-checked media downloader.
//!
//! Every descriptor in a batch is dispatched at once (unbounded fan-out, one
//! blocking transfer per descriptor); `run_all` returns only when all of them
//! have settled. Failure isolation is a hard contract: an error in one
//! transfer fills that descriptor's result slot and never aborts siblings.

mod transfer;

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Condvar, Mutex};

use crate::cache::CacheStore;
use crate::error::FetchResult;
use crate::progress::ProgressReporter;

use transfer::fetch_one;

/// One requested remote-to-local transfer. Built by the caller from parsed
/// query results, consumed once by `run_all`.
#[derive(Debug, Clone)]
pub struct Download {
    pub uri: String,
    pub target_dir: PathBuf,
    pub filename: String,
}

/// Gate that holds at most one in-flight transfer per fingerprint. A second
/// concurrent descriptor for the same fingerprint waits for the first to
/// settle, then re-checks the cache instead of fetching again.
pub(crate) struct InFlight {
    active: Mutex<HashSet<String>>,
    settled: Condvar,
}

pub(crate) struct InFlightSlot<'a> {
    owner: &'a InFlight,
    fingerprint: String,
}

impl InFlight {
    fn new() -> Self {
        Self {
            active: Mutex::new(HashSet::new()),
            settled: Condvar::new(),
        }
    }

    /// Blocks while another transfer for `fingerprint` is running, then claims
    /// the slot. The slot is released when the returned guard drops.
    pub(crate) fn acquire(&self, fingerprint: &str) -> InFlightSlot<'_> {
        let mut active = self.active.lock().unwrap();
        while active.contains(fingerprint) {
            active = self.settled.wait(active).unwrap();
        }
        active.insert(fingerprint.to_string());
        InFlightSlot {
            owner: self,
            fingerprint: fingerprint.to_string(),
        }
    }
}

impl Drop for InFlightSlot<'_> {
    fn drop(&mut self) {
        let mut active = self.owner.active.lock().unwrap();
        active.remove(&self.fingerprint);
        self.owner.settled.notify_all();
    }
}

/// Runs batches of cache-checked transfers with per-item failure isolation.
pub struct Downloader {
    cache: Arc<CacheStore>,
    progress: Arc<dyn ProgressReporter>,
    default_ttl_ms: u64,
    in_flight: Arc<InFlight>,
}

impl Downloader {
    pub fn new(
        cache: Arc<CacheStore>,
        progress: Arc<dyn ProgressReporter>,
        default_ttl_ms: u64,
    ) -> Self {
        Self {
            cache,
            progress,
            default_ttl_ms,
            in_flight: Arc::new(InFlight::new()),
        }
    }

    /// Transfers every descriptor concurrently. Returns one result slot per
    /// descriptor, in input order; completion order across descriptors is
    /// arbitrary. Cache hits short-circuit with no I/O and no progress entry.
    pub async fn run_all(&self, downloads: Vec<Download>) -> Vec<FetchResult<PathBuf>> {
        let mut tasks = Vec::with_capacity(downloads.len());
        for download in downloads {
            let cache = Arc::clone(&self.cache);
            let in_flight = Arc::clone(&self.in_flight);
            let progress = Arc::clone(&self.progress);
            let ttl_ms = self.default_ttl_ms;
            tasks.push(tokio::task::spawn_blocking(move || {
                fetch_one(&download, &cache, &in_flight, progress.as_ref(), ttl_ms).map_err(|e| {
                    tracing::error!(uri = %download.uri, "saving {} failed: {e}", download.filename);
                    e
                })
            }));
        }

        let mut results = Vec::with_capacity(tasks.len());
        for task in tasks {
            results.push(task.await.expect("transfer task panicked"));
        }
        self.progress.stop_all();
        results
    }
}

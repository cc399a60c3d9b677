//! Durable fingerprint -> {local path, expiry} index with TTL expiration.
//!
//! The store owns the whole index for the process lifetime: loaded once at
//! construction, rewritten wholesale on every mutation. Expired or
//! file-missing entries are skipped on lookup, never actively deleted; the
//! next successful fetch of the same fingerprint overwrites them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// One cached resource. `ttl` holds the absolute expiry as milliseconds since
/// the Unix epoch; `None` means the entry never expires. The field keeps its
/// historical name so existing `.cache.json` documents stay readable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u64>,
}

/// Persisted document: `{ "cache": [[fingerprint, entry], ...] }`. An array
/// of pairs rather than a map, so insertion order carries no meaning.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheDocument {
    cache: Vec<(String, CacheEntry)>,
}

/// Single-owner cache index. All mutations and the persisted-document write
/// are serialized behind one internal lock; no other component touches the
/// on-disk file.
pub struct CacheStore {
    file: PathBuf,
    enabled: bool,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

impl CacheStore {
    /// Loads the index from `file`. A missing or corrupt document is a cold
    /// start, not an error: the store begins empty and a warning is logged.
    pub fn load(file: impl Into<PathBuf>, enabled: bool) -> Self {
        let file = file.into();
        let entries = match std::fs::read(&file) {
            Ok(bytes) => match serde_json::from_slice::<CacheDocument>(&bytes) {
                Ok(doc) => doc.cache.into_iter().collect(),
                Err(e) => {
                    tracing::warn!(file = %file.display(), "cache index unreadable, starting cold: {e}");
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                tracing::warn!(file = %file.display(), "cache index unreadable, starting cold: {e}");
                HashMap::new()
            }
        };
        tracing::debug!(file = %file.display(), entries = entries.len(), "cache index loaded");
        Self {
            file,
            enabled,
            entries: Mutex::new(entries),
        }
    }

    /// Returns the cached payload path for `fingerprint`, or `None` when the
    /// entry is absent, expired, its file has disappeared, or caching is
    /// disabled.
    pub fn lookup(&self, fingerprint: &str) -> Option<PathBuf> {
        self.lookup_at(fingerprint, now_ms())
    }

    fn lookup_at(&self, fingerprint: &str, now: u64) -> Option<PathBuf> {
        if !self.enabled {
            return None;
        }
        let entries = self.entries.lock().unwrap();
        let entry = entries.get(fingerprint)?;
        if let Some(expires_at) = entry.ttl {
            if now >= expires_at {
                tracing::warn!(fingerprint, "cache entry expired");
                return None;
            }
        }
        if std::fs::metadata(&entry.path).is_err() {
            tracing::warn!(path = %entry.path.display(), "cached file missing");
            return None;
        }
        Some(entry.path.clone())
    }

    /// Inserts or overwrites an entry and rewrites the persisted document.
    /// A `ttl_ms` of zero means the entry never expires.
    pub fn put(&self, fingerprint: &str, path: &Path, ttl_ms: u64) -> anyhow::Result<()> {
        let ttl = (ttl_ms > 0).then(|| now_ms() + ttl_ms);
        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            fingerprint.to_string(),
            CacheEntry {
                path: path.to_path_buf(),
                ttl,
            },
        );
        self.persist_locked(&entries)
    }

    /// Drops every entry and rewrites the (now empty) document.
    pub fn clear(&self) -> anyhow::Result<()> {
        let mut entries = self.entries.lock().unwrap();
        entries.clear();
        self.persist_locked(&entries)
    }

    /// Current index contents, for status display and tests.
    pub fn snapshot(&self) -> Vec<(String, CacheEntry)> {
        let entries = self.entries.lock().unwrap();
        let mut pairs: Vec<_> = entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        pairs
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn persist_locked(&self, entries: &HashMap<String, CacheEntry>) -> anyhow::Result<()> {
        use anyhow::Context;
        let doc = CacheDocument {
            cache: entries
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        };
        if let Some(parent) = self.file.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create dir: {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&doc).context("serialize cache index")?;
        std::fs::write(&self.file, json)
            .with_context(|| format!("write cache index: {}", self.file.display()))?;
        Ok(())
    }
}

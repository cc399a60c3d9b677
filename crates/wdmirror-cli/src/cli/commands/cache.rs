//! `wdmirror cache` – inspect or clear the on-disk cache index.

use anyhow::Result;
use wdmirror_core::cache::CacheStore;

pub fn run_cache_list(cache: &CacheStore) -> Result<()> {
    let entries = cache.snapshot();
    if entries.is_empty() {
        println!("Cache is empty.");
        return Ok(());
    }
    println!("{:<18} {:<16} {}", "FINGERPRINT", "EXPIRES(MS)", "PATH");
    for (fingerprint, entry) in entries {
        let expires = entry
            .ttl
            .map(|ms| ms.to_string())
            .unwrap_or_else(|| "-".to_string());
        let short = &fingerprint[..fingerprint.len().min(16)];
        println!("{:<18} {:<16} {}", short, expires, entry.path.display());
    }
    Ok(())
}

pub fn run_cache_clear(cache: &CacheStore) -> Result<()> {
    let count = cache.len();
    cache.clear()?;
    println!("Cleared {count} cache entr{}.", if count == 1 { "y" } else { "ies" });
    Ok(())
}

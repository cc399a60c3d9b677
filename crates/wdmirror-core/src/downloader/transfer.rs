//! Single streaming transfer: cache check, GET to a `.part` file, atomic
//! rename, cache registration. Blocking; runs inside `spawn_blocking`.

use std::cell::Cell;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::CacheStore;
use crate::error::{FetchError, FetchResult};
use crate::fingerprint::fingerprint;
use crate::progress::{ProgressReporter, TransferHandle};

use super::{Download, InFlight};

/// Path for the in-progress file: appends `.part` to the final path.
fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(".part");
    PathBuf::from(o)
}

/// Runs one descriptor to completion: short-circuit on cache hit, otherwise
/// stream to disk and register the result. Any failure cleans up the partial
/// file and is confined to this descriptor.
pub(super) fn fetch_one(
    download: &Download,
    cache: &CacheStore,
    in_flight: &InFlight,
    progress: &dyn ProgressReporter,
    ttl_ms: u64,
) -> FetchResult<PathBuf> {
    let fp = fingerprint(&download.uri);
    if let Some(path) = cache.lookup(&fp) {
        tracing::info!(uri = %download.uri, "cache hit");
        return Ok(path);
    }

    let _slot = in_flight.acquire(&fp);
    // A concurrent descriptor for the same URI may have landed while we waited.
    if let Some(path) = cache.lookup(&fp) {
        tracing::info!(uri = %download.uri, "cache hit after in-flight transfer");
        return Ok(path);
    }

    std::fs::create_dir_all(&download.target_dir)
        .map_err(|e| FetchError::filesystem(&download.target_dir, e))?;
    let final_path = download.target_dir.join(&download.filename);
    let temp = temp_path(&final_path);

    if let Err(e) = stream_to_file(&download.uri, &temp, &download.filename, progress) {
        let _ = std::fs::remove_file(&temp);
        return Err(e);
    }

    if let Err(e) = std::fs::rename(&temp, &final_path) {
        let _ = std::fs::remove_file(&temp);
        return Err(FetchError::filesystem(&final_path, e));
    }

    if let Err(e) = cache.put(&fp, &final_path, ttl_ms) {
        tracing::warn!("cache index persist failed: {e:#}");
    }
    tracing::debug!(uri = %download.uri, path = %final_path.display(), "download complete");
    Ok(final_path)
}

/// Streams a GET body to `dest`, registering a progress entry when the first
/// body chunk arrives (seeded with Content-Length when the server sent one).
fn stream_to_file(
    url: &str,
    dest: &Path,
    label: &str,
    progress: &dyn ProgressReporter,
) -> FetchResult<()> {
    let file = File::create(dest).map_err(|e| FetchError::filesystem(dest, e))?;
    let mut writer = BufWriter::new(file);

    let content_length = Cell::new(0u64);
    let mut handle: Option<Box<dyn TransferHandle>> = None;
    let mut transferred = 0u64;
    let mut write_err: Option<std::io::Error> = None;

    let mut easy = curl::easy::Easy::new();
    configure(&mut easy, url).map_err(|e| FetchError::network(url, e))?;

    let performed = {
        let mut xfer = easy.transfer();
        xfer.header_function(|line| {
            if let Some(len) = parse_content_length(line) {
                content_length.set(len);
            }
            true
        })
        .map_err(|e| FetchError::network(url, e))?;
        xfer.write_function(|data| {
            if handle.is_none() {
                handle = Some(progress.register(label, content_length.get()));
            }
            match writer.write_all(data) {
                Ok(()) => {
                    transferred += data.len() as u64;
                    if let Some(h) = handle.as_ref() {
                        h.advance(transferred);
                    }
                    Ok(data.len())
                }
                Err(e) => {
                    write_err = Some(e);
                    Ok(0) // abort transfer
                }
            }
        })
        .map_err(|e| FetchError::network(url, e))?;
        xfer.perform()
    };

    if let Err(e) = performed {
        if let Some(io_err) = write_err.take() {
            return Err(FetchError::filesystem(dest, io_err));
        }
        if e.is_http_returned_error() {
            return Err(FetchError::Http {
                url: url.to_string(),
                status: easy.response_code().unwrap_or(0),
            });
        }
        return Err(FetchError::network(url, e));
    }

    let status = easy
        .response_code()
        .map_err(|e| FetchError::network(url, e))?;
    if !(200..300).contains(&status) {
        return Err(FetchError::Http {
            url: url.to_string(),
            status,
        });
    }

    writer.flush().map_err(|e| FetchError::filesystem(dest, e))?;
    Ok(())
}

fn configure(easy: &mut curl::easy::Easy, url: &str) -> Result<(), curl::Error> {
    easy.url(url)?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.connect_timeout(Duration::from_secs(30))?;
    // Abort before writing 4xx/5xx bodies to the target file.
    easy.fail_on_error(true)?;
    Ok(())
}

fn parse_content_length(line: &[u8]) -> Option<u64> {
    let line = std::str::from_utf8(line).ok()?;
    let (name, value) = line.split_once(':')?;
    if !name.trim().eq_ignore_ascii_case("content-length") {
        return None;
    }
    value.trim().parse().ok()
}

//! Error taxonomy for the fetch/download subsystem.
//!
//! Per-transfer failures carry a typed `FetchError` so callers can report one
//! error slot per descriptor; orchestration and CLI seams use `anyhow`.

use std::path::PathBuf;
use thiserror::Error;

pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Failure of a single fetch or download operation. Never retried; one
/// attempt is final for that operation.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure (connect, TLS, timeout, aborted stream).
    #[error("network error for {url}: {detail}")]
    Network { url: String, detail: String },

    /// The server answered with a non-2xx status.
    #[error("GET {url} returned HTTP {status}")]
    Http { url: String, status: u32 },

    /// The persisted cache index or a cached payload could not be read.
    #[error("cache corruption at {}: {detail}", path.display())]
    CacheCorruption { path: PathBuf, detail: String },

    /// Directory creation, file write, or cleanup failed.
    #[error("filesystem error at {}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The response body (or a cached copy of it) is not valid JSON.
    #[error("malformed JSON from {url}")]
    Parse {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl FetchError {
    pub(crate) fn network(url: &str, detail: impl std::fmt::Display) -> Self {
        FetchError::Network {
            url: url.to_string(),
            detail: detail.to_string(),
        }
    }

    pub(crate) fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FetchError::Filesystem {
            path: path.into(),
            source,
        }
    }
}

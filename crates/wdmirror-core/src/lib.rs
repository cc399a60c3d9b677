pub mod config;
pub mod logging;

pub mod cache;
pub mod downloader;
pub mod error;
pub mod fetch;
pub mod filename;
pub mod fingerprint;
pub mod progress;
pub mod source;

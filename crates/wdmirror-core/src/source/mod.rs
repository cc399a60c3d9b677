//! SPARQL source: fetches a query result through the cache and turns URI
//! properties into download descriptors plus flattened records.

mod parse;

use anyhow::Result;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::downloader::Download;
use crate::error::{FetchError, FetchResult};
use crate::fetch::FetchClient;
use crate::filename::filename_from_uri;

use parse::QueryResult;

/// One flattened result row: property name to plain string value, with URI
/// properties rewritten to the local file path of their download.
pub type Record = BTreeMap<String, String>;

#[derive(Debug, Clone)]
pub struct SourceOptions {
    /// SPARQL endpoint URL.
    pub endpoint: String,
    /// The query to run.
    pub sparql: String,
    /// Label attached to the produced records.
    pub type_name: String,
    /// Directory that will hold the downloaded media files.
    pub media_dir: PathBuf,
}

pub struct LoadOutput {
    pub type_name: String,
    pub records: Vec<Record>,
    pub downloads: Vec<Download>,
}

pub struct Source {
    options: SourceOptions,
    fetch: FetchClient,
}

impl Source {
    /// Validates mandatory options. Missing endpoint, query, or type name is
    /// fatal at construction time.
    pub fn new(options: SourceOptions, fetch: FetchClient) -> Result<Self> {
        if options.endpoint.trim().is_empty() {
            anyhow::bail!("missing 'endpoint' url, please provide a valid SPARQL endpoint");
        }
        if options.sparql.trim().is_empty() {
            anyhow::bail!("missing 'sparql' query, please provide a valid query");
        }
        if options.type_name.trim().is_empty() {
            anyhow::bail!("missing 'type_name' label, please provide a type name");
        }
        Ok(Self { options, fetch })
    }

    /// Full query URL: endpoint plus the percent-encoded query string.
    pub fn query_url(&self) -> String {
        let encoded: String =
            url::form_urlencoded::byte_serialize(self.options.sparql.as_bytes()).collect();
        format!("{}?query={}", self.options.endpoint, encoded)
    }

    /// Fetches the query result and flattens it into records, collecting a
    /// download descriptor for every URI-typed property. The property value
    /// is rewritten to the local path the download will land at.
    ///
    /// Blocking; call from `spawn_blocking` if used from async code.
    pub fn load(&self) -> FetchResult<LoadOutput> {
        let url = self.query_url();
        let doc = self.fetch.fetch_json(&url)?;
        let parsed: QueryResult =
            serde_json::from_value(doc).map_err(|e| FetchError::Parse { url, source: e })?;

        let mut records = Vec::with_capacity(parsed.results.bindings.len());
        let mut downloads = Vec::new();
        for binding in parsed.results.bindings {
            let mut record = Record::new();
            for (property, bound) in binding {
                if bound.is_uri() {
                    if let Some(filename) = filename_from_uri(&bound.value) {
                        let local = self.options.media_dir.join(&filename);
                        downloads.push(Download {
                            uri: bound.value,
                            target_dir: self.options.media_dir.clone(),
                            filename,
                        });
                        record.insert(property, local.display().to_string());
                        continue;
                    }
                    tracing::warn!(uri = %bound.value, "no filename derivable, keeping raw uri");
                }
                record.insert(property, bound.value);
            }
            records.push(record);
        }

        tracing::info!(
            records = records.len(),
            downloads = downloads.len(),
            "query result processed"
        );
        Ok(LoadOutput {
            type_name: self.options.type_name.clone(),
            records,
            downloads,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheStore;
    use std::sync::Arc;

    fn fetch_client(dir: &std::path::Path) -> FetchClient {
        let cache = Arc::new(CacheStore::load(dir.join(".cache.json"), true));
        FetchClient::new(cache, dir, 0)
    }

    fn options(media_dir: PathBuf) -> SourceOptions {
        SourceOptions {
            endpoint: "https://query.wikidata.org/sparql".into(),
            sparql: "SELECT ?item WHERE { ?item wdt:P31 wd:Q3305213 }".into(),
            type_name: "Painting".into(),
            media_dir,
        }
    }

    #[test]
    fn missing_endpoint_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut opts = options(dir.path().to_path_buf());
        opts.endpoint = "  ".into();
        let err = Source::new(opts, fetch_client(dir.path())).err().unwrap();
        assert!(err.to_string().contains("endpoint"));
    }

    #[test]
    fn missing_query_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut opts = options(dir.path().to_path_buf());
        opts.sparql = String::new();
        let err = Source::new(opts, fetch_client(dir.path())).err().unwrap();
        assert!(err.to_string().contains("sparql"));
    }

    #[test]
    fn missing_type_name_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut opts = options(dir.path().to_path_buf());
        opts.type_name = String::new();
        let err = Source::new(opts, fetch_client(dir.path())).err().unwrap();
        assert!(err.to_string().contains("type_name"));
    }

    #[test]
    fn query_url_percent_encodes_the_query() {
        let dir = tempfile::tempdir().unwrap();
        let source = Source::new(options(dir.path().to_path_buf()), fetch_client(dir.path()))
            .unwrap();
        let url = source.query_url();
        assert!(url.starts_with("https://query.wikidata.org/sparql?query="));
        assert!(!url.contains(' '));
        assert!(url.contains("SELECT"));
    }
}

//! Fetching the link index and per-repository `links.json` documents.
//!
//! The link index is fetched once per [`CrossLinkFetcher`] and memoized.
//! Each repository's `links.json` is served from the [`LinksCache`] when the
//! cached copy carries the ETag the index currently publishes; otherwise it
//! is downloaded and written back to the cache.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ureq::Agent;

use crate::cache::{LinksCache, NullLinksCache};
use crate::model::{LinkIndex, LinkIndexEntry, LinkReference};
use crate::resolver::{CANONICAL_REPOSITORY, FetchedCrossLinks};

/// Bucket hosting `link-index.json` and every repository's `links.json`.
pub const DEFAULT_INDEX_URL: &str = "https://elastic-docs-link-index.s3.us-east-2.amazonaws.com";

const LINK_INDEX_FILE: &str = "link-index.json";

/// Default HTTP timeout in seconds.
const DEFAULT_TIMEOUT: u64 = 30;

/// Error fetching link data.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Network failure, timeout or TLS error.
    #[error("HTTP request to {url} failed")]
    Request {
        url: String,
        #[source]
        source: ureq::Error,
    },

    /// Server answered with an error status.
    #[error("HTTP error fetching {url}: {status}")]
    Status { url: String, status: u16 },

    /// Body is not the expected JSON.
    #[error("Invalid JSON from {url}")]
    Json {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Repository '{0}' is not published in the link index")]
    RepositoryNotFound(String),

    /// Transport specific failure.
    #[error("{0}")]
    Other(String),
}

/// Source of raw HTTP bodies.
pub trait Transport: Send + Sync {
    fn get(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// [`Transport`] backed by a `ureq` agent.
pub struct HttpTransport {
    agent: Agent,
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_TIMEOUT))
    }
}

impl HttpTransport {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();
        Self { agent }
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.agent.get(url).call().map_err(|source| FetchError::Request {
            url: url.to_owned(),
            source,
        })?;

        let status = response.status().as_u16();
        if status >= 400 {
            return Err(FetchError::Status {
                url: url.to_owned(),
                status,
            });
        }

        response
            .into_body()
            .read_to_vec()
            .map_err(|source| FetchError::Request {
                url: url.to_owned(),
                source,
            })
    }
}

/// Fetches link data, consulting an ETag validated cache.
pub struct CrossLinkFetcher {
    transport: Box<dyn Transport>,
    cache: Box<dyn LinksCache>,
    index_url: String,
    link_index: Mutex<Option<Arc<LinkIndex>>>,
}

impl Default for CrossLinkFetcher {
    fn default() -> Self {
        Self::new(Box::new(HttpTransport::default()))
    }
}

impl CrossLinkFetcher {
    /// Fetcher without a cache.
    #[must_use]
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            cache: Box::new(NullLinksCache),
            index_url: DEFAULT_INDEX_URL.to_owned(),
            link_index: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn with_cache(mut self, cache: Box<dyn LinksCache>) -> Self {
        self.cache = cache;
        self
    }

    #[must_use]
    pub fn with_index_url(mut self, url: impl Into<String>) -> Self {
        self.index_url = url.into().trim_end_matches('/').to_owned();
        self
    }

    /// The link index, fetched on first use.
    pub fn link_index(&self) -> Result<Arc<LinkIndex>, FetchError> {
        let mut memo = self
            .link_index
            .lock()
            .map_err(|_| FetchError::Other("link index lock poisoned".to_owned()))?;
        if let Some(index) = memo.as_ref() {
            return Ok(Arc::clone(index));
        }

        let url = format!("{}/{LINK_INDEX_FILE}", self.index_url);
        tracing::debug!(url = %url, "fetching link index");
        let body = self.transport.get(&url)?;
        let index: LinkIndex = parse_json(&url, &body)?;
        let index = Arc::new(index);
        *memo = Some(Arc::clone(&index));
        Ok(index)
    }

    /// Fetch a repository's `links.json` from its `main` branch.
    pub fn fetch(&self, repository: &str) -> Result<LinkReference, FetchError> {
        let index = self.link_index()?;
        let entry = index
            .entry(repository, "main")
            .ok_or_else(|| FetchError::RepositoryNotFound(repository.to_owned()))?;
        self.fetch_entry(entry)
    }

    /// Fetch the `links.json` an index entry points to.
    pub fn fetch_entry(&self, entry: &LinkIndexEntry) -> Result<LinkReference, FetchError> {
        let url = format!("{}/{}", self.index_url, entry.path.trim_start_matches('/'));

        if let Some(body) = self.cache.get(&entry.repository, &entry.branch, &entry.etag) {
            match parse_json(&url, &body) {
                Ok(reference) => {
                    tracing::debug!(repository = %entry.repository, etag = %entry.etag, "links.json served from cache");
                    return Ok(reference);
                }
                Err(e) => tracing::debug!(error = %e, "ignoring unreadable cache entry"),
            }
        }

        tracing::info!(repository = %entry.repository, branch = %entry.branch, "fetching links.json");
        let body = self.transport.get(&url)?;
        let reference = parse_json(&url, &body)?;
        self.cache.set(&entry.repository, &entry.branch, &entry.etag, &body);
        Ok(reference)
    }

    /// Fetch every repository declared under `cross_links`.
    ///
    /// A failure for the canonical repository is fatal; failures for other
    /// repositories are logged and the repository resolves best-effort.
    pub fn fetch_declared(&self, repositories: &[String]) -> Result<FetchedCrossLinks, FetchError> {
        let mut references = HashMap::new();
        for repository in repositories {
            match self.fetch(repository) {
                Ok(reference) => {
                    references.insert(repository.clone(), reference);
                }
                Err(e) if repository == CANONICAL_REPOSITORY => return Err(e),
                Err(e) => {
                    tracing::warn!(repository = %repository, error = %e, "failed to fetch links.json");
                }
            }
        }
        Ok(FetchedCrossLinks {
            link_references: references,
            declared_repositories: repositories.iter().cloned().collect(),
        })
    }

    /// Fetch every repository published in the link index.
    ///
    /// Uses each repository's `main` entry, or its first branch when it has
    /// no `main`.
    pub fn fetch_all(&self) -> Result<FetchedCrossLinks, FetchError> {
        let index = self.link_index()?;
        let mut fetched = FetchedCrossLinks::empty();
        for (repository, branches) in &index.repositories {
            let Some(entry) = branches.get("main").or_else(|| branches.values().next()) else {
                continue;
            };
            let reference = self.fetch_entry(entry)?;
            fetched.declared_repositories.insert(repository.clone());
            fetched.link_references.insert(repository.clone(), reference);
        }
        Ok(fetched)
    }
}

fn parse_json<T: serde::de::DeserializeOwned>(url: &str, body: &[u8]) -> Result<T, FetchError> {
    serde_json::from_slice(body).map_err(|source| FetchError::Json {
        url: url.to_owned(),
        source,
    })
}

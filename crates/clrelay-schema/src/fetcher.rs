use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::debug;
use url::Url;

use crate::config::FetcherConfig;
use crate::error::{Result, SchemaError};

const IPFS_SCHEME: &str = "ipfs://";

/// Fetches remote JSON documents and memoizes them by normalized URL.
///
/// The cache is append-only for the lifetime of the fetcher. Each URL owns a
/// once-cell, so concurrent first requests for the same document share a
/// single network round-trip. Failed fetches leave the cell empty.
pub struct DocumentFetcher {
    client: reqwest::Client,
    config: FetcherConfig,
    cache: Mutex<HashMap<String, Arc<OnceCell<Value>>>>,
}

impl DocumentFetcher {
    /// Create a fetcher with its own HTTP client.
    pub fn new(config: FetcherConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(SchemaError::Client)?;
        Ok(Self::with_client(client, config))
    }

    /// Create a fetcher around an existing HTTP client.
    pub fn with_client(client: reqwest::Client, config: FetcherConfig) -> Self {
        Self {
            client,
            config,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch a JSON document, serving repeats from the cache.
    pub async fn fetch(&self, url: &str) -> Result<Value> {
        let normalized = self.normalize(url)?;
        let cell = self.cell_for(&normalized);

        if let Some(cached) = cell.get() {
            debug!(url = %normalized, "document cache hit");
            return Ok(cached.clone());
        }

        let document = cell
            .get_or_try_init(|| self.fetch_uncached(&normalized))
            .await?;
        Ok(document.clone())
    }

    /// Rewrite `ipfs://` to the gateway and drop any fragment.
    ///
    /// The result is the cache key for the document.
    pub fn normalize(&self, url: &str) -> Result<String> {
        let trimmed = url.trim();
        let rewritten = match trimmed.strip_prefix(IPFS_SCHEME) {
            Some(rest) => format!(
                "{}/{}",
                self.config.ipfs_gateway.trim_end_matches('/'),
                rest.trim_start_matches('/')
            ),
            None => trimmed.to_string(),
        };

        let mut parsed = Url::parse(&rewritten).map_err(|err| SchemaError::InvalidUrl {
            url: url.to_string(),
            reason: err.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(SchemaError::InvalidUrl {
                url: url.to_string(),
                reason: format!("unsupported scheme {}", parsed.scheme()),
            });
        }
        parsed.set_fragment(None);
        Ok(parsed.to_string())
    }

    /// Number of documents currently memoized.
    pub fn cached_len(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|cell| cell.initialized())
            .count()
    }

    fn cell_for(&self, normalized: &str) -> Arc<OnceCell<Value>> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache
            .entry(normalized.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    async fn fetch_uncached(&self, url: &str) -> Result<Value> {
        debug!(url, "fetching document");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| SchemaError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SchemaError::FetchFailed {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|source| SchemaError::Transport {
                url: url.to_string(),
                source,
            })?;

        serde_json::from_str(&body).map_err(|err| SchemaError::InvalidDocument {
            url: url.to_string(),
            reason: err.to_string(),
        })
    }
}

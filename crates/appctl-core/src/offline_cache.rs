//! ============================================================================
//! Offline Cache - Cache-first fetching with a precache list
//! ============================================================================
//! `install()` stores every precache URL (all or nothing). `fetch()` answers
//! from the named cache when possible and falls back to the network
//! otherwise, without writing the network response back.
//! ============================================================================

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::error::StorageError;
use crate::storage::{CacheStorage, CachedResponse};

/// Name of the app shell cache
pub const CACHE_NAME: &str = "app-v1";

/// Paths stored on install
pub const PRECACHE_URLS: [&str; 3] = ["/", "/static/css/style.css", "/static/js/app.js"];

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("network error fetching {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Where a response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchSource {
    Cache,
    Network,
}

#[derive(Debug, Clone)]
pub struct Fetched {
    pub response: CachedResponse,
    pub source: FetchSource,
}

pub struct OfflineCache {
    storage: Arc<dyn CacheStorage>,
    client: reqwest::Client,
    base_url: String,
    cache_name: String,
}

impl OfflineCache {
    pub fn new(storage: Arc<dyn CacheStorage>, base_url: &str) -> Self {
        Self {
            storage,
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            cache_name: CACHE_NAME.to_string(),
        }
    }

    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    /// Fetch and store every precache URL. Nothing is stored if any fails.
    pub async fn install(&self) -> Result<usize, CacheError> {
        info!("Installing offline cache {}", self.cache_name);

        let mut fetched = Vec::with_capacity(PRECACHE_URLS.len());
        for path in PRECACHE_URLS {
            let response = self.fetch_network(path).await?;
            if !(200..300).contains(&response.status) {
                return Err(CacheError::Status {
                    url: path.to_string(),
                    status: response.status,
                });
            }
            fetched.push((path, response));
        }

        for (path, response) in &fetched {
            self.storage.cache_put(&self.cache_name, path, response)?;
        }

        info!("Cached {} URLs in {}", fetched.len(), self.cache_name);
        Ok(fetched.len())
    }

    /// Serve from cache, else from the network
    pub async fn fetch(&self, path: &str) -> Result<Fetched, CacheError> {
        if let Some(response) = self.storage.cache_match(&self.cache_name, path)? {
            debug!("Cache hit: {}", path);
            return Ok(Fetched {
                response,
                source: FetchSource::Cache,
            });
        }

        debug!("Cache miss: {}", path);
        let response = self.fetch_network(path).await?;
        Ok(Fetched {
            response,
            source: FetchSource::Network,
        })
    }

    /// URLs currently cached
    pub fn cached_urls(&self) -> Result<Vec<String>, CacheError> {
        Ok(self.storage.cache_keys(&self.cache_name)?)
    }

    async fn fetch_network(&self, path: &str) -> Result<CachedResponse, CacheError> {
        let url = format!("{}{}", self.base_url, path);
        let network = |source: reqwest::Error| CacheError::Network {
            url: url.clone(),
            source,
        };

        let response = self.client.get(&url).send().await.map_err(network)?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await.map_err(network)?.to_vec();

        Ok(CachedResponse {
            status,
            content_type,
            body,
            cached_at: chrono::Utc::now().timestamp(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_shell(server: &MockServer, hits: u64) {
        for (p, body) in [
            ("/", "<html>calc</html>"),
            ("/static/css/style.css", "body{}"),
            ("/static/js/app.js", "console.log(1)"),
        ] {
            Mock::given(method("GET"))
                .and(path(p))
                .respond_with(ResponseTemplate::new(200).set_body_string(body))
                .expect(hits)
                .mount(server)
                .await;
        }
    }

    #[tokio::test]
    async fn test_install_then_serve_from_cache() {
        let server = MockServer::start().await;
        mount_shell(&server, 1).await;

        let cache = OfflineCache::new(Arc::new(MemoryStore::new()), &server.uri());
        assert_eq!(cache.install().await.unwrap(), 3);
        assert_eq!(cache.cached_urls().unwrap().len(), 3);

        let fetched = cache.fetch("/static/css/style.css").await.unwrap();
        assert_eq!(fetched.source, FetchSource::Cache);
        assert_eq!(fetched.response.body, b"body{}".to_vec());
        // each precache URL requested exactly once; verified on drop
    }

    #[tokio::test]
    async fn test_miss_falls_back_to_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calculator/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("live"))
            .expect(2)
            .mount(&server)
            .await;

        let cache = OfflineCache::new(Arc::new(MemoryStore::new()), &server.uri());
        for _ in 0..2 {
            let fetched = cache.fetch("/calculator/").await.unwrap();
            assert_eq!(fetched.source, FetchSource::Network);
            assert_eq!(fetched.response.body, b"live".to_vec());
        }
        assert!(cache.cached_urls().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_install_is_all_or_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/static/css/style.css"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let cache = OfflineCache::new(Arc::new(MemoryStore::new()), &server.uri());
        let err = cache.install().await.unwrap_err();

        assert!(matches!(err, CacheError::Status { status: 404, .. }));
        assert!(cache.cached_urls().unwrap().is_empty());
    }
}

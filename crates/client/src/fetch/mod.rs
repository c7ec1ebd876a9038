//! HTTP fetch pipeline with a long-lived page cache.
//!
//! ### URL Canonicalization
//! - Trim whitespace, ensure scheme (default: `https`)
//! - Lowercase host, remove fragments
//! - Preserve query string
//!
//! ### Cache Policies
//! - Pages on the source site are cached forever.
//! - Everything else is cached for the configured freshness window.
//! - Only text responses are stored.
//!
//! ### Failures
//! - Non-2xx responses map to `Error::HttpStatus`.
//! - Network and body failures map to `Error::Transport`.

pub mod url;

#[cfg(test)]
pub(crate) mod memory;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, header};
use std::time::{Duration, Instant};

pub use self::url::{UrlError, canonicalize, file_extension, file_name, file_stem, is_same_site, resolve};

use edsite_core::{AppConfig, CacheDb, CachePolicy, CachedPage, Error, cache::hash::compute_cache_key};

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "edsite-harvest/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 50MB)
    pub max_bytes: usize,

    /// Request timeout (default: 30s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,

    /// Source site; pages under it are cached forever.
    pub site: ::url::Url,

    /// Freshness window for every other page (default: 24h)
    pub cache_ttl: Duration,
}

impl FetchConfig {
    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        let site = canonicalize(&config.base_url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            max_redirects: 5,
            site,
            cache_ttl: config.cache_ttl(),
        })
    }

    fn policy_for(&self, url: &::url::Url) -> CachePolicy {
        if is_same_site(url, &self.site) { CachePolicy::Forever } else { CachePolicy::Fresh(self.cache_ttl) }
    }
}

/// Response from a fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The canonical URL requested
    pub url: ::url::Url,
    /// The final URL after redirects
    pub final_url: ::url::Url,
    /// HTTP status code
    pub status: u16,
    /// Content-Type header
    pub content_type: Option<String>,
    /// Response body bytes
    pub bytes: Bytes,
    /// Time taken to fetch in milliseconds
    pub fetch_ms: u64,
    /// Whether the body came from the page cache
    pub from_cache: bool,
}

impl FetchResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// Page fetch collaborator used by the walker, extractors and assembler.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch a URL, failing with a transport error on any HTTP or I/O failure.
    async fn fetch(&self, url: &str) -> Result<FetchResponse, Error>;

    /// Fetch a URL and decode its body as (lossy) UTF-8 markup.
    async fn fetch_text(&self, url: &str) -> Result<String, Error> {
        Ok(self.fetch(url).await?.text())
    }
}

/// HTTP fetch client backed by the page cache.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
    cache: Option<CacheDb>,
}

impl FetchClient {
    /// Create a new fetch client. Pass `None` to bypass the cache entirely.
    pub fn new(config: FetchConfig, cache: Option<CacheDb>) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config, cache })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn check_size(&self, url: &::url::Url, len: usize) -> Result<(), Error> {
        if len > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{url}: {len} bytes exceeds {}", self.config.max_bytes)));
        }
        Ok(())
    }

    async fn cached(&self, url: &::url::Url) -> Option<FetchResponse> {
        let cache = self.cache.as_ref()?;
        match cache.get_fresh_page(&compute_cache_key(url.as_str())).await {
            Ok(Some(page)) => {
                let final_url = ::url::Url::parse(&page.final_url).unwrap_or_else(|_| url.clone());
                Some(FetchResponse {
                    url: url.clone(),
                    final_url,
                    status: page.status_code,
                    content_type: page.content_type,
                    bytes: Bytes::from(page.body),
                    fetch_ms: 0,
                    from_cache: true,
                })
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "page cache lookup failed");
                None
            }
        }
    }

    async fn store(&self, response: &FetchResponse) {
        let Some(cache) = self.cache.as_ref() else {
            return;
        };
        let is_text = response
            .content_type
            .as_deref()
            .is_none_or(|ct| ct.starts_with("text/") || ct.contains("xml") || ct.contains("json"));
        if !is_text {
            return;
        }

        let page = CachedPage::new(
            response.url.as_str(),
            response.final_url.as_str(),
            response.status,
            response.content_type.clone(),
            response.bytes.to_vec(),
            self.config.policy_for(&response.url),
        );
        if let Err(e) = cache.upsert_page(&page).await {
            tracing::warn!(url = %response.url, error = %e, "failed to store page in cache");
        }
    }
}

#[async_trait]
impl PageSource for FetchClient {
    async fn fetch(&self, url_str: &str) -> Result<FetchResponse, Error> {
        let start = Instant::now();
        let url = canonicalize(url_str).map_err(|e| Error::InvalidUrl(e.to_string()))?;

        if let Some(hit) = self.cached(&url).await {
            tracing::debug!(url = %url, "cache hit");
            return Ok(hit);
        }

        let response = self
            .http
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| Error::Transport(format!("network error for {}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus { url: url.to_string(), status: status.as_u16() });
        }

        if let Some(len) = response.content_length() {
            self.check_size(&url, len as usize)?;
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Transport(format!("failed to read response from {}: {}", url, e)))?;

        self.check_size(&url, bytes.len())?;

        let fetch_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(url = %url, final_url = %final_url, fetch_ms, bytes = bytes.len(), "fetched");

        let fetched = FetchResponse {
            url,
            final_url,
            status: status.as_u16(),
            content_type,
            bytes,
            fetch_ms,
            from_cache: false,
        };
        self.store(&fetched).await;

        Ok(fetched)
    }
}

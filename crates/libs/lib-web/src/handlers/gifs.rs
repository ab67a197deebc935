//! # GIF Search Proxy
//!
//! Forwards search queries to the Giphy API and returns the provider
//! JSON verbatim, cached per normalized query.
//!
//! **Route**: `GET /api/gifs?query=<string>`
//!
//! An empty query returns trending GIFs, matching the picker's behavior
//! when it opens with a blank search box. The provider credential is
//! optional; without it every request answers with a 500 and a generic
//! error body while the rest of the service keeps working.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::Json;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

use lib_core::{AppError, Result};

const SEARCH_URL: &str = "https://api.giphy.com/v1/gifs/search";
const TRENDING_URL: &str = "https://api.giphy.com/v1/gifs/trending";

/// How long a cached provider response stays fresh.
const GIF_CACHE_TTL: Duration = Duration::from_secs(600);

/// Page size requested from the provider.
const GIF_PAGE_LIMIT: &str = "24";

/// Content rating requested from the provider.
const GIF_RATING: &str = "pg-13";

/// A cached provider response for one normalized query.
struct CachedSearch {
    payload: Value,
    fetched_at: Instant,
}

/// Caching proxy in front of the GIF provider.
pub struct GifProxy {
    http_client: Client,
    api_key: Option<String>,
    cache: RwLock<HashMap<String, CachedSearch>>,
}

impl GifProxy {
    pub fn new(api_key: Option<String>) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_key,
            cache: RwLock::new(HashMap::new()),
        })
    }

    /// Normalize a query so equivalent searches share one cache entry.
    fn normalize_query(query: &str) -> String {
        query
            .trim()
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Search the provider, serving fresh cache hits without an
    /// upstream call.
    pub async fn search(&self, query: &str) -> Result<Value> {
        let key = Self::normalize_query(query);

        if let Some(payload) = self.cached(&key).await {
            debug!(query = %key, "GIF cache hit");
            return Ok(payload);
        }

        let api_key = self.api_key.as_deref().ok_or_else(|| {
            AppError::UpstreamProxy("GIF provider credential is not configured".to_string())
        })?;

        let url = if key.is_empty() { TRENDING_URL } else { SEARCH_URL };
        let mut request = self.http_client.get(url).query(&[
            ("api_key", api_key),
            ("limit", GIF_PAGE_LIMIT),
            ("rating", GIF_RATING),
        ]);
        if !key.is_empty() {
            request = request.query(&[("q", key.as_str())]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::UpstreamProxy(format!("GIF provider request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::UpstreamProxy(format!(
                "GIF provider returned status {}",
                status
            )));
        }

        let payload: Value = response.json().await.map_err(|e| {
            AppError::UpstreamProxy(format!("GIF provider returned invalid JSON: {}", e))
        })?;

        self.store(key, payload.clone()).await;

        Ok(payload)
    }

    async fn cached(&self, key: &str) -> Option<Value> {
        let cache = self.cache.read().await;
        cache
            .get(key)
            .filter(|entry| entry.fetched_at.elapsed() < GIF_CACHE_TTL)
            .map(|entry| entry.payload.clone())
    }

    async fn store(&self, key: String, payload: Value) {
        let mut cache = self.cache.write().await;
        // Evict expired entries while we hold the write lock anyway.
        cache.retain(|_, entry| entry.fetched_at.elapsed() < GIF_CACHE_TTL);
        cache.insert(
            key,
            CachedSearch {
                payload,
                fetched_at: Instant::now(),
            },
        );
    }
}

/// Query parameters for GIF search.
#[derive(Debug, Deserialize)]
pub struct GifQuery {
    #[serde(default)]
    pub query: String,
}

/// Proxy a GIF search to the provider.
///
/// **Route**: `GET /api/gifs?query=cats`
///
/// Returns the provider response body unchanged on success; failures
/// surface as `500` with a `{"error", "code"}` body.
pub async fn search_gifs(
    Query(params): Query<GifQuery>,
    State(gifs): State<Arc<GifProxy>>,
) -> Result<Json<Value>> {
    let payload = gifs.search(&params.query).await?;
    Ok(Json(payload))
}

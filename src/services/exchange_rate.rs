use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::header::ACCEPT;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::RwLock;

/// A quote body as returned by the upstream service. Always a JSON object.
pub type Quote = Map<String, Value>;

/// Key under which cache metadata is merged into the quote.
pub const META_KEY: &str = "_meta";

/// Ways a live quote fetch can fail.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream responded with status {0}")]
    Status(u16),

    #[error("upstream request timed out")]
    Timeout,

    #[error("upstream request failed: {0}")]
    Transport(String),

    #[error("upstream returned a body that is not a JSON object")]
    Malformed,
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            UpstreamError::Timeout
        } else if e.is_decode() {
            UpstreamError::Malformed
        } else {
            UpstreamError::Transport(e.to_string())
        }
    }
}

/// Source of live quotes.
#[async_trait]
pub trait RateFetcher: Send + Sync {
    async fn fetch(&self) -> Result<Quote, UpstreamError>;
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fetches quotes over HTTP with a bounded timeout.
pub struct HttpRateFetcher {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl HttpRateFetcher {
    /// Creates a new `HttpRateFetcher`.
    ///
    /// # Arguments
    ///
    /// * `url` - The quote endpoint.
    /// * `api_key` - Sent as a bearer token when present.
    /// * `timeout` - Upper bound for the whole request.
    pub fn new(
        url: impl Into<String>,
        api_key: Option<String>,
        timeout: std::time::Duration,
    ) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            api_key,
        })
    }
}

#[async_trait]
impl RateFetcher for HttpRateFetcher {
    async fn fetch(&self) -> Result<Quote, UpstreamError> {
        let mut request = self.client.get(&self.url).header(ACCEPT, "application/json");
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(UpstreamError::Status(response.status().as_u16()));
        }

        match response.json::<Value>().await? {
            Value::Object(quote) => Ok(quote),
            _ => Err(UpstreamError::Malformed),
        }
    }
}

/// The last successful quote.
#[derive(Debug, Clone)]
pub struct CachedQuote {
    pub payload: Quote,
    pub fetched_at: DateTime<Utc>,
}

/// Metadata describing where a quote came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheMeta {
    pub cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expired: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_age_hours: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<DateTime<Utc>>,
}

/// A quote together with its cache metadata.
#[derive(Debug, Clone)]
pub struct RateLookup {
    pub payload: Quote,
    pub meta: CacheMeta,
}

impl RateLookup {
    /// The quote with `_meta` merged in. Every other key is left untouched.
    pub fn into_body(self) -> Value {
        let mut body = self.payload;
        let meta = serde_json::to_value(&self.meta).unwrap_or(Value::Null);
        body.insert(META_KEY.to_string(), meta);
        Value::Object(body)
    }
}

fn age_hours(age: Duration) -> f64 {
    let hours = age.num_seconds() as f64 / 3600.0;
    (hours * 100.0).round() / 100.0
}

/// Process-local exchange-rate cache with stale fallback.
///
/// Holds a single slot that is replaced whole on every successful fetch.
/// The lock is never held across the upstream call, so concurrent refreshes
/// race and the last write wins.
pub struct ExchangeRateCache {
    fetcher: Arc<dyn RateFetcher>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    slot: RwLock<Option<CachedQuote>>,
}

impl ExchangeRateCache {
    /// Creates a new, empty `ExchangeRateCache`.
    pub fn new(fetcher: Arc<dyn RateFetcher>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            fetcher,
            clock,
            ttl,
            slot: RwLock::new(None),
        }
    }

    /// The current slot contents.
    pub async fn cached(&self) -> Option<CachedQuote> {
        self.slot.read().await.clone()
    }

    fn age_at(&self, now: DateTime<Utc>, entry: &CachedQuote) -> Duration {
        (now - entry.fetched_at).max(Duration::zero())
    }

    /// Returns the freshest quote available.
    ///
    /// Serves the slot while it is within the freshness window, otherwise
    /// fetches. If the fetch fails, an expired slot is served as a stale
    /// fallback; the error surfaces only when nothing was ever cached.
    pub async fn lookup(&self) -> Result<RateLookup, UpstreamError> {
        let now = self.clock.now();

        if let Some(entry) = self.cached().await {
            let age = self.age_at(now, &entry);
            if age < self.ttl {
                tracing::debug!("💱 Exchange rate served from cache ({}h old)", age_hours(age));
                return Ok(RateLookup {
                    payload: entry.payload,
                    meta: CacheMeta {
                        cached: true,
                        expired: None,
                        error: None,
                        cache_age_hours: Some(age_hours(age)),
                        cached_at: Some(entry.fetched_at),
                        fetched_at: None,
                    },
                });
            }
        }

        match self.fetcher.fetch().await {
            Ok(payload) => {
                let fetched_at = self.clock.now();
                *self.slot.write().await = Some(CachedQuote {
                    payload: payload.clone(),
                    fetched_at,
                });
                tracing::info!("💱 Exchange rate refreshed from upstream");
                Ok(RateLookup {
                    payload,
                    meta: CacheMeta {
                        cached: false,
                        expired: None,
                        error: None,
                        cache_age_hours: None,
                        cached_at: None,
                        fetched_at: Some(fetched_at),
                    },
                })
            }
            Err(e) => {
                // Another request may have refreshed the slot while this fetch ran.
                let Some(entry) = self.cached().await else {
                    tracing::error!("❌ Exchange rate fetch failed with no cached fallback: {}", e);
                    return Err(e);
                };

                let age = self.age_at(self.clock.now(), &entry);
                tracing::warn!(
                    "⚠️  Exchange rate fetch failed, serving cached quote ({}h old): {}",
                    age_hours(age),
                    e
                );
                Ok(RateLookup {
                    payload: entry.payload,
                    meta: CacheMeta {
                        cached: true,
                        expired: Some(age >= self.ttl),
                        error: Some(true),
                        cache_age_hours: Some(age_hours(age)),
                        cached_at: Some(entry.fetched_at),
                        fetched_at: None,
                    },
                })
            }
        }
    }
}

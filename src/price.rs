//! BTC to USD exchange rate cache
//!
//! Process-wide cache used by the fallback provider to annotate balances in
//! fiat. The rate is memoized with a time-to-live; on a failed refresh the
//! last known value is served, and 0.0 stands for "rate unavailable" -
//! callers must omit fiat fields rather than publish a zero conversion.

use crate::{
    constants::{
        COINGECKO_API_URL, COINGECKO_SIMPLE_PRICE_ENDPOINT, PRICE_CACHE_TTL_SECS,
        REQUEST_TIMEOUT_SECS, USER_AGENT,
    },
    error::ProviderError,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Trait for BTC/USD exchange rate sources
#[async_trait]
pub trait ExchangeRateSource: Send + Sync {
    /// Fetches the current BTC price in USD
    async fn fetch_rate(&self) -> Result<f64, ProviderError>;
}

/// CoinGecko simple-price response for the bitcoin id
#[derive(Debug, Deserialize)]
struct SimplePriceResponse {
    bitcoin: UsdQuote,
}

#[derive(Debug, Deserialize)]
struct UsdQuote {
    usd: f64,
}

/// CoinGecko exchange rate source
pub struct CoinGeckoRateSource {
    client: Client,
}

impl CoinGeckoRateSource {
    /// Creates a new CoinGecko rate source
    pub fn new() -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(ProviderError::Unavailable)?;

        Ok(Self { client })
    }
}

#[async_trait]
impl ExchangeRateSource for CoinGeckoRateSource {
    async fn fetch_rate(&self) -> Result<f64, ProviderError> {
        let url = format!(
            "{COINGECKO_API_URL}{COINGECKO_SIMPLE_PRICE_ENDPOINT}?ids=bitcoin&vs_currencies=usd"
        );
        tracing::debug!("fetching BTC/USD rate from CoinGecko");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(ProviderError::Unavailable)?;

        if response.status().as_u16() == 429 {
            return Err(ProviderError::RateLimited);
        }
        let response = response.error_for_status()?;

        let body = response.text().await.map_err(ProviderError::Unavailable)?;
        let parsed: SimplePriceResponse = serde_json::from_str(&body).map_err(|e| {
            ProviderError::unknown(format!("failed to parse CoinGecko response: {e}"))
        })?;

        Ok(parsed.bitcoin.usd)
    }
}

/// A successfully fetched rate and when it was fetched
#[derive(Debug, Clone, Copy)]
struct CachedPrice {
    value: f64,
    fetched_at: Instant,
}

/// Memoizing BTC/USD rate cache with a time-to-live
///
/// The check-then-fetch-then-store sequence runs under one lock, so at most
/// one fetch is in flight and concurrent callers wait on it rather than
/// issuing duplicates.
pub struct PriceCache {
    source: Arc<dyn ExchangeRateSource>,
    ttl: Duration,
    cached: Mutex<Option<CachedPrice>>,
}

impl PriceCache {
    /// Creates a cache with the default time-to-live
    pub fn new(source: Arc<dyn ExchangeRateSource>) -> Self {
        Self::with_ttl(source, Duration::from_secs(PRICE_CACHE_TTL_SECS))
    }

    /// Creates a cache with a custom time-to-live
    pub fn with_ttl(source: Arc<dyn ExchangeRateSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            cached: Mutex::new(None),
        }
    }

    /// Returns the BTC/USD rate, refreshing it when the cached one expired
    ///
    /// Returns 0.0 when no rate has ever been fetched and the refresh fails;
    /// callers treat that as "fiat conversion unavailable".
    pub async fn get_rate(&self) -> f64 {
        let mut cached = self.cached.lock().await;

        if let Some(entry) = *cached {
            if entry.fetched_at.elapsed() < self.ttl {
                return entry.value;
            }
        }

        match self.source.fetch_rate().await {
            Ok(value) => {
                tracing::debug!(rate = value, "refreshed BTC/USD rate");
                *cached = Some(CachedPrice {
                    value,
                    fetched_at: Instant::now(),
                });
                value
            }
            Err(e) => {
                tracing::warn!(error = %e, "exchange rate fetch failed, serving last known value");
                cached.map(|entry| entry.value).unwrap_or(0.0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;
    use tokio::time::advance;

    struct ScriptedSource {
        responses: StdMutex<VecDeque<Result<f64, ProviderError>>>,
        calls: StdMutex<usize>,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Result<f64, ProviderError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: StdMutex::new(responses.into()),
                calls: StdMutex::new(0),
            })
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl ExchangeRateSource for ScriptedSource {
        async fn fetch_rate(&self) -> Result<f64, ProviderError> {
            *self.calls.lock().unwrap() += 1;
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(ProviderError::unknown("no scripted rate")))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fresh_rate_is_reused_until_ttl() {
        let source = ScriptedSource::new(vec![Ok(65_000.0), Ok(66_000.0)]);
        let cache = PriceCache::new(source.clone());

        assert_eq!(cache.get_rate().await, 65_000.0);

        advance(Duration::from_secs(59)).await;
        assert_eq!(cache.get_rate().await, 65_000.0);
        assert_eq!(source.calls(), 1);

        advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get_rate().await, 66_000.0);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_refresh_serves_last_known_value() {
        let source = ScriptedSource::new(vec![
            Ok(65_000.0),
            Err(ProviderError::unknown("upstream down")),
        ]);
        let cache = PriceCache::new(source.clone());

        assert_eq!(cache.get_rate().await, 65_000.0);

        advance(Duration::from_secs(61)).await;
        assert_eq!(cache.get_rate().await, 65_000.0);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn never_fetched_and_failing_returns_sentinel() {
        let source = ScriptedSource::new(vec![Err(ProviderError::unknown("upstream down"))]);
        let cache = PriceCache::new(source);

        assert_eq!(cache.get_rate().await, 0.0);
    }
}

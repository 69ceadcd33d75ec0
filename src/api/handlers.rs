//! API Handlers
//!
//! HTTP request handlers for the quote server endpoints.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Query, State},
    Json,
};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::cache::{InFlight, QuoteCache, QUOTE_TTL};
use crate::config::{Config, DEFAULT_SWAP_BASE_URL};
use crate::error::{FetchError, QuoteError, Result};
use crate::fetcher::{BrowserFetcher, BrowserSettings, QuoteFetcher};
use crate::models::{validate_amount, HealthResponse, Quote, QuoteQuery, QuoteRequest};
use crate::registry::{swap_url, TokenRegistry};

/// Application state shared across all handlers.
///
/// The cache is the only shared mutable piece and sits behind an
/// `Arc<RwLock<>>`: lookups share the lock, stores take it exclusively.
#[derive(Clone)]
pub struct AppState {
    /// Thread-safe quote cache
    pub cache: Arc<RwLock<QuoteCache>>,
    /// Source of fresh quotes on a miss
    pub fetcher: Arc<dyn QuoteFetcher>,
    pub registry: Arc<TokenRegistry>,
    /// Fetches currently running, one per key triple, with their shared outcome
    pub inflight: Arc<InFlight<QuoteRequest, std::result::Result<Quote, FetchError>>>,
    pub swap_base_url: Arc<str>,
}

impl AppState {
    /// Creates a new AppState with the given cache and fetcher, the built-in
    /// token registry and the default swap page.
    pub fn new(cache: QuoteCache, fetcher: Arc<dyn QuoteFetcher>) -> Self {
        Self {
            cache: Arc::new(RwLock::new(cache)),
            fetcher,
            registry: Arc::new(TokenRegistry::new()),
            inflight: Arc::new(InFlight::new()),
            swap_base_url: Arc::from(DEFAULT_SWAP_BASE_URL),
        }
    }

    /// Replaces the swap page base URL.
    pub fn with_swap_base_url(mut self, base_url: impl AsRef<str>) -> Self {
        self.swap_base_url = Arc::from(base_url.as_ref());
        self
    }

    /// Creates a new AppState from configuration.
    ///
    /// Wires a browser-backed fetcher and an empty cache with the fixed quote TTL.
    pub fn from_config(config: &Config) -> Self {
        let fetcher = BrowserFetcher::new(BrowserSettings::from_config(config));
        Self::new(QuoteCache::new(QUOTE_TTL), Arc::new(fetcher))
            .with_swap_base_url(&config.swap_base_url)
    }

    async fn cached(&self, request: &QuoteRequest) -> Option<Quote> {
        self.cache
            .read()
            .await
            .get(&request.input, &request.output, &request.amount)
    }
}

/// Handler for GET /?input=<symbol>&output=<symbol>&amount=<decimal>
///
/// Serves a cached quote when one is fresh, otherwise scrapes the swap page
/// and caches the result. Concurrent misses for the same triple share one
/// fetch and all receive its outcome, including its error.
pub async fn quote_handler(
    State(state): State<AppState>,
    Query(query): Query<QuoteQuery>,
) -> Result<Json<Quote>> {
    let started = Instant::now();

    let request = query.into_request()?;
    let from = state
        .registry
        .address_of(&request.input)
        .ok_or_else(|| QuoteError::unsupported_input(&request.input))?;
    let to = state
        .registry
        .address_of(&request.output)
        .ok_or_else(|| QuoteError::unsupported_output(&request.output))?;
    validate_amount(&request.amount)?;

    if let Some(quote) = state.cached(&request).await {
        info!(
            input = %request.input,
            output = %request.output,
            amount = %request.amount,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "[CACHE HIT] quote served"
        );
        return Ok(Json(quote));
    }

    let target_url = swap_url(&state.swap_base_url, from, to);
    let fetch = {
        let state = &state;
        let request = &request;
        move || async move {
            // A run for this triple may have finished since the first lookup
            if let Some(quote) = state.cached(request).await {
                info!(
                    input = %request.input,
                    output = %request.output,
                    amount = %request.amount,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "[CACHE HIT] quote served after in-flight fetch"
                );
                return Ok(quote);
            }

            match state.fetcher.fetch(request, &target_url).await {
                Ok(quote) => {
                    state.cache.write().await.set(
                        &request.input,
                        &request.output,
                        &request.amount,
                        quote.clone(),
                    );
                    info!(
                        input = %request.input,
                        output = %request.output,
                        amount = %request.amount,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "[CACHE MISS] quote fetched"
                    );
                    Ok(quote)
                }
                Err(err) => {
                    warn!(
                        input = %request.input,
                        output = %request.output,
                        amount = %request.amount,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        error = %err,
                        "quote fetch failed"
                    );
                    Err(err)
                }
            }
        }
    };

    let outcome = state.inflight.run(request.clone(), fetch).await;
    outcome.map(Json).map_err(QuoteError::from)
}

/// Handler for GET /health
///
/// Returns health status of the server.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TokenAmount;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Returns a fixed rate and records every call.
    #[derive(Default)]
    struct StubFetcher {
        calls: AtomicUsize,
        urls: Mutex<Vec<String>>,
        fail_with: Option<&'static str>,
        delay: Duration,
    }

    #[async_trait]
    impl QuoteFetcher for StubFetcher {
        async fn fetch(
            &self,
            request: &QuoteRequest,
            target_url: &str,
        ) -> std::result::Result<Quote, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.urls.lock().unwrap().push(target_url.to_string());
            tokio::time::sleep(self.delay).await;
            if let Some(message) = self.fail_with {
                return Err(FetchError::Browser(message.to_string()));
            }
            Ok(Quote::new(
                TokenAmount::new(1.0, request.input.as_str()),
                TokenAmount::new(3.25, request.output.as_str()),
                3.25,
                Utc::now(),
            ))
        }
    }

    fn query(input: &str, output: &str, amount: &str) -> Query<QuoteQuery> {
        Query(QuoteQuery {
            input: Some(input.to_string()),
            output: Some(output.to_string()),
            amount: Some(amount.to_string()),
        })
    }

    fn state_with(fetcher: Arc<StubFetcher>) -> AppState {
        AppState::new(QuoteCache::new(QUOTE_TTL), fetcher)
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let fetcher = Arc::new(StubFetcher::default());
        let state = state_with(fetcher.clone());

        let first = quote_handler(State(state.clone()), query("mon", "usdc", "1"))
            .await
            .unwrap();
        let second = quote_handler(State(state.clone()), query("mon", "usdc", "1"))
            .await
            .unwrap();

        assert_eq!(first.0, second.0);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(state.cache.read().await.len(), 1);
    }

    #[tokio::test]
    async fn test_target_url_uses_resolved_addresses() {
        let fetcher = Arc::new(StubFetcher::default());
        let state = state_with(fetcher.clone()).with_swap_base_url("http://swap.test/swap");

        let _quote = quote_handler(State(state), query("wmon", "usdt", "5"))
            .await
            .unwrap();

        let urls = fetcher.urls.lock().unwrap();
        assert_eq!(
            urls.as_slice(),
            [format!(
                "http://swap.test/swap?from={}&to={}",
                crate::registry::MON_ADDRESS,
                crate::registry::USDC_ADDRESS
            )]
        );
    }

    #[tokio::test]
    async fn test_unknown_input_symbol() {
        let fetcher = Arc::new(StubFetcher::default());
        let state = state_with(fetcher.clone());

        let err = quote_handler(State(state), query("doge", "usdc", "1"))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("doge"));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_zero_amount_rejected_before_fetch() {
        let fetcher = Arc::new(StubFetcher::default());
        let state = state_with(fetcher.clone());

        let err = quote_handler(State(state), query("mon", "usdc", "0"))
            .await
            .unwrap_err();

        assert!(matches!(err, QuoteError::InvalidAmount(_)));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_not_cached() {
        let fetcher = Arc::new(StubFetcher {
            fail_with: Some("selector wait timed out"),
            ..StubFetcher::default()
        });
        let state = state_with(fetcher.clone());

        for _ in 0..2 {
            let err = quote_handler(State(state.clone()), query("mon", "usdc", "1"))
                .await
                .unwrap_err();
            assert!(matches!(err, QuoteError::Fetch(_)));
        }

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
        assert!(state.cache.read().await.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_misses_fetch_once() {
        let fetcher = Arc::new(StubFetcher {
            delay: Duration::from_millis(50),
            ..StubFetcher::default()
        });
        let state = state_with(fetcher.clone());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let state = state.clone();
                tokio::spawn(async move {
                    quote_handler(State(state), query("eth", "usdc", "2")).await
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert!(state.inflight.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_misses_share_one_failure() {
        let fetcher = Arc::new(StubFetcher {
            fail_with: Some("amount field never appeared"),
            delay: Duration::from_millis(200),
            ..StubFetcher::default()
        });
        let state = state_with(fetcher.clone());

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let state = state.clone();
                tokio::spawn(async move {
                    let started = Instant::now();
                    let result = quote_handler(State(state), query("eth", "usdc", "2")).await;
                    (started.elapsed(), result)
                })
            })
            .collect();

        let mut worst = Duration::ZERO;
        for handle in handles {
            let (elapsed, result) = handle.await.unwrap();
            worst = worst.max(elapsed);
            let err = result.unwrap_err();
            assert_eq!(err.to_string(), "browser error: amount field never appeared");
        }

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert!(worst < Duration::from_millis(400), "slowest caller took {worst:?}");
        assert!(state.inflight.is_empty());
        assert!(state.cache.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "ok");
    }
}

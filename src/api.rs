//! HTTP retrieval with exponential backoff retry logic.
//!
//! # Architecture
//!
//! - [`FetchAsync`]: core trait defining an async text fetch
//! - [`HttpFetcher`]: `reqwest`-backed implementation
//! - [`RetryFetch`]: decorator that adds retry logic to any `FetchAsync`
//!
//! # Retry Strategy
//!
//! - Exponential backoff starting at the configured base delay
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to prevent thundering herd
//!
//! Only feed ingestion goes through [`RetryFetch`]; the enrichment call makes
//! a single attempt.

use crate::config::FetchConfig;
use rand::{Rng, rng};
use reqwest::Client;
use std::error::Error;
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{error, instrument, warn};

/// Trait for fetching a text document by URL.
///
/// Implementors return the body of a successful response, or an error for
/// transport failures and non-success statuses.
pub trait FetchAsync {
    async fn fetch(&self, url: &str) -> Result<String, Box<dyn Error>>;
}

/// Wrapper that adds exponential backoff retry logic to any [`FetchAsync`].
///
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryFetch<T> {
    /// The underlying fetcher to wrap.
    inner: T,
    /// Retries after the first attempt before giving up.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: StdDuration,
    /// Maximum delay cap to prevent excessive waiting.
    max_delay: StdDuration,
}

impl<T> RetryFetch<T>
where
    T: FetchAsync,
{
    /// Create a new retry wrapper around an existing [`FetchAsync`] implementation.
    ///
    /// # Arguments
    ///
    /// * `inner` - The underlying fetcher to wrap
    /// * `max_retries` - Retries after the first attempt (2 by default config)
    /// * `base_delay` - Delay before the first retry; doubles on each attempt
    ///
    /// The delay is capped at 30 seconds.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let fetcher = RetryFetch::new(HttpFetcher::new(&config.fetch)?, 2, Duration::from_millis(500));
    /// let raw = fetcher.fetch("https://news.google.com/rss/search?q=AI").await?;
    /// ```
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> FetchAsync for RetryFetch<T>
where
    T: FetchAsync,
{
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str) -> Result<String, Box<dyn Error>> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.fetch(url).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                            elapsed_ms_total = total_dt.as_millis() as u64,
                            error = %e,
                            "fetch() exhausted retries"
                        );
                        return Err(e);
                    }

                    // backoff calc
                    let shift = (attempt - 1).min(16) as u32;
                    let mut delay = self.base_delay.saturating_mul(1 << shift);
                    if delay > self.max_delay {
                        delay = self.max_delay;
                    }
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                        ?delay,
                        error = %e,
                        "fetch() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// `reqwest`-backed [`FetchAsync`] implementation.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, Box<dyn Error>> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(StdDuration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client })
    }
}

impl FetchAsync for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str) -> Result<String, Box<dyn Error>> {
        let t0 = Instant::now();
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(elapsed_ms = t0.elapsed().as_millis() as u64, %status, "Feed request returned non-success status");
            return Err(format!("failed to fetch {}: HTTP {}", url, status).into());
        }
        Ok(response.text().await?)
    }
}

/// Build the fetcher used by ingestion: HTTP with retry and backoff.
pub fn feed_fetcher(config: &FetchConfig) -> Result<RetryFetch<HttpFetcher>, Box<dyn Error>> {
    Ok(RetryFetch::new(
        HttpFetcher::new(config)?,
        config.max_retries,
        StdDuration::from_millis(config.base_delay_ms),
    ))
}

//! HTTP clients for the bookmaker and tipping sites
//!
//! Both sites rate-limit aggressively, so every client paces its
//! requests with a random delay and retries transient failures with
//! exponential backoff.

pub mod odds;
pub mod tips;

pub use odds::OddsClient;
pub use tips::TipsClient;

use crate::config::ScraperConfig;
use crate::error::Result;
use rand::Rng;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// Shared fetch plumbing: timeout, pacing, retry with backoff.
#[derive(Clone)]
pub(crate) struct Fetcher {
    http: Client,
    max_retries: u32,
    retry_backoff_ms: u64,
    min_delay_ms: u64,
    max_delay_ms: u64,
}

impl Fetcher {
    pub(crate) fn new(config: &ScraperConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            http,
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
            min_delay_ms: config.min_delay_ms,
            max_delay_ms: config.max_delay_ms,
        })
    }

    /// Random pause between requests.
    pub(crate) async fn pace(&self) {
        if self.max_delay_ms == 0 {
            return;
        }
        let ms = rand::rng().random_range(self.min_delay_ms..=self.max_delay_ms);
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    /// GET a JSON document, retrying transient failures.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let mut attempt = 0u32;
        loop {
            let result = async {
                let resp = self
                    .http
                    .get(url)
                    .query(query)
                    .send()
                    .await?
                    .error_for_status()?;
                Ok::<T, reqwest::Error>(resp.json().await?)
            }
            .await;

            match result {
                Ok(body) => return Ok(body),
                Err(e) if attempt < self.max_retries => {
                    attempt += 1;
                    let backoff = self.retry_backoff_ms * 2u64.saturating_pow(attempt - 1);
                    warn!(url, attempt, backoff_ms = backoff, "request failed, retrying: {e}");
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                }
                Err(e) => {
                    debug!(url, "request failed after {} retries", self.max_retries);
                    return Err(e.into());
                }
            }
        }
    }
}

/// Parse a site odds cell. Suspended markets show "-" or empty; prices
/// below 1.01 are placeholders and also dropped.
pub(crate) fn parse_odds(raw: Option<&str>) -> Option<f64> {
    let s = raw?.trim();
    if s.is_empty() || s == "-" {
        return None;
    }
    s.parse::<f64>().ok().filter(|o| *o >= 1.01)
}

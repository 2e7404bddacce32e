// =============================================================================
// Rate Sources — live HTTP client and synthetic random walk
// =============================================================================
//
// The signal engine never talks to a data vendor directly: everything flows
// through the `RateSource` trait, so the synthetic generator used in Demo
// mode and the exchange-rate HTTP API used in Live mode are interchangeable
// without touching the indicator or alerting code.
// =============================================================================

use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use rand::Rng;
use serde::Deserialize;
use tracing::debug;

/// Where the engine gets the current mid rate for its pair.
///
/// Contract: `latest_rate` returns a positive, finite rate or an error —
/// callers fail the whole analysis run on error rather than guessing.
#[async_trait]
pub trait RateSource: Send + Sync {
    async fn latest_rate(&self) -> Result<f64>;

    /// Short human-readable label for logs.
    fn label(&self) -> &'static str;
}

// =============================================================================
// Live source — exchangerate-api.com pair endpoint
// =============================================================================

#[derive(Debug, Deserialize)]
struct PairResponse {
    conversion_rate: f64,
}

/// HTTP client for the v6 exchangerate-api pair endpoint.
pub struct ExchangeRateClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    base: String,
    quote: String,
}

impl ExchangeRateClient {
    /// Create a client for a six-letter pair such as `"EURUSD"`.
    ///
    /// Returns an error when the pair cannot be split into two ISO currency
    /// codes.
    pub fn new(api_key: impl Into<String>, pair: &str) -> Result<Self> {
        if pair.len() != 6 || !pair.chars().all(|c| c.is_ascii_alphabetic()) {
            anyhow::bail!("invalid currency pair '{pair}' (expected e.g. EURUSD)");
        }
        let (base, quote) = pair.split_at(3);

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: "https://v6.exchangerate-api.com".to_string(),
            api_key: api_key.into(),
            base: base.to_uppercase(),
            quote: quote.to_uppercase(),
        })
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl RateSource for ExchangeRateClient {
    async fn latest_rate(&self) -> Result<f64> {
        let url = format!(
            "{}/v6/{}/pair/{}/{}",
            self.base_url, self.api_key, self.base, self.quote
        );

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .context("exchange-rate API request failed")?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("exchange-rate API returned {status}");
        }

        let body: PairResponse = resp
            .json()
            .await
            .context("failed to parse exchange-rate API response")?;

        if !body.conversion_rate.is_finite() || body.conversion_rate <= 0.0 {
            anyhow::bail!("exchange-rate API returned invalid rate {}", body.conversion_rate);
        }

        debug!(
            base = %self.base,
            quote = %self.quote,
            rate = body.conversion_rate,
            "live rate fetched"
        );

        Ok(body.conversion_rate)
    }

    fn label(&self) -> &'static str {
        "exchangerate-api"
    }
}

// =============================================================================
// Synthetic source — seeded random walk for Demo mode
// =============================================================================

/// Random-walk rate generator. Each call drifts the rate by up to ±0.5% and
/// clamps it to a band around the seed so long demo sessions stay realistic.
pub struct SyntheticRateSource {
    rate: Mutex<f64>,
    floor: f64,
    ceiling: f64,
}

impl SyntheticRateSource {
    pub fn new(seed_rate: f64) -> Self {
        Self {
            rate: Mutex::new(seed_rate),
            floor: seed_rate * 0.95,
            ceiling: seed_rate * 1.05,
        }
    }
}

#[async_trait]
impl RateSource for SyntheticRateSource {
    async fn latest_rate(&self) -> Result<f64> {
        let mut rate = self.rate.lock();
        let step: f64 = rand::thread_rng().gen_range(-0.005..0.005);
        *rate = (*rate * (1.0 + step)).clamp(self.floor, self.ceiling);
        Ok(*rate)
    }

    fn label(&self) -> &'static str {
        "synthetic"
    }
}

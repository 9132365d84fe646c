use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::core::rates::{FetchFailure, RateProvider, RateSnapshot, RateTable};

/// Client for the `exchangerate-api.com` v4 "latest" endpoint.
pub struct ExchangeRateApiProvider {
    base_url: String,
    client: reqwest::Client,
}

impl ExchangeRateApiProvider {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("fxconv/0.1")
            .build()
            .context("Failed to build HTTP client")?;
        Ok(ExchangeRateApiProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn latest_url(&self, base: &str) -> String {
        format!("{}/v4/latest/{}", self.base_url, base)
    }
}

#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    rates: RateTable,
    /// Kept loose so an odd timestamp only loses the publish time, not the rates.
    #[serde(default)]
    time_last_updated: Option<serde_json::Value>,
}

fn published_at(response: &LatestRatesResponse) -> Option<DateTime<Utc>> {
    let value = response.time_last_updated.as_ref()?;
    let seconds = match value.as_i64() {
        Some(seconds) => seconds,
        None => {
            let seconds = value.as_f64()?;
            if !seconds.is_finite() {
                return None;
            }
            seconds.trunc() as i64
        }
    };
    Utc.timestamp_opt(seconds, 0).single()
}

#[async_trait]
impl RateProvider for ExchangeRateApiProvider {
    #[instrument(name = "LatestRatesFetch", skip(self), fields(base = %base))]
    async fn fetch_rates(&self, base: &str) -> Result<RateSnapshot> {
        let url = self.latest_url(base);
        debug!("Requesting rates from {}", url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            anyhow::Error::new(FetchFailure::Network)
                .context(format!("Request error: {e} for base currency: {base}"))
        })?;

        if !response.status().is_success() {
            return Err(anyhow::Error::new(FetchFailure::Network).context(format!(
                "HTTP error: {} for base currency: {}",
                response.status(),
                base
            )));
        }

        let text = response.text().await.map_err(|e| {
            anyhow::Error::new(FetchFailure::Network)
                .context(format!("Failed to read response body for {base}: {e}"))
        })?;

        let data: LatestRatesResponse = serde_json::from_str(&text).map_err(|e| {
            anyhow::Error::new(FetchFailure::Malformed)
                .context(format!("Failed to parse JSON response for {base}: {e}"))
        })?;

        debug!(currencies = data.rates.len(), "Received rate table");
        Ok(RateSnapshot {
            base: base.to_string(),
            published_at: published_at(&data),
            rates: data.rates,
        })
    }
}

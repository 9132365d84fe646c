//! Exchange rate abstractions

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;

/// Rates for one base currency, keyed by currency code.
///
/// Each value is the number of units of that currency one unit of the base buys.
/// Codes are kept sorted so every view derived from the table has a stable order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RateTable(BTreeMap<String, f64>);

impl RateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rate(&self, code: &str) -> Option<f64> {
        self.0.get(code).copied()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.0.contains_key(code)
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(code, rate)| (code.as_str(), *rate))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, f64)> for RateTable {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        RateTable(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<(&'a str, f64)> for RateTable {
    fn from_iter<I: IntoIterator<Item = (&'a str, f64)>>(iter: I) -> Self {
        RateTable(
            iter.into_iter()
                .map(|(code, rate)| (code.to_string(), rate))
                .collect(),
        )
    }
}

/// A rate table as returned by a provider for a single request.
#[derive(Debug, Clone, PartialEq)]
pub struct RateSnapshot {
    pub base: String,
    pub rates: RateTable,
    /// When the upstream last refreshed its rates, if it says so.
    pub published_at: Option<DateTime<Utc>>,
}

/// Why a rate fetch failed.
///
/// Attached to provider errors so callers can tell transport problems from bad payloads.
/// Both kinds are handled the same way by the widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchFailure {
    /// The request could not be sent or the server answered with a non-success status.
    Network,
    /// The body was not JSON or did not carry a `rates` mapping.
    Malformed,
}

impl FetchFailure {
    /// Finds the failure kind in an error chain. Unclassified errors count as network failures.
    pub fn of(err: &anyhow::Error) -> Self {
        err.downcast_ref::<FetchFailure>()
            .copied()
            .unwrap_or(FetchFailure::Network)
    }
}

impl Display for FetchFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchFailure::Network => write!(f, "network failure"),
            FetchFailure::Malformed => write!(f, "malformed response"),
        }
    }
}

impl std::error::Error for FetchFailure {}

/// Normalizes a user supplied currency code. Codes are otherwise trusted as given.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

#[async_trait]
pub trait RateProvider: Send + Sync {
    async fn fetch_rates(&self, base: &str) -> Result<RateSnapshot>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_rate_table_is_sorted_by_code() {
        let table: RateTable = [("INR", 83.0), ("EUR", 0.91), ("GBP", 0.79)]
            .into_iter()
            .collect();

        assert_eq!(table.codes().collect::<Vec<_>>(), vec!["EUR", "GBP", "INR"]);
        assert_eq!(table.rate("INR"), Some(83.0));
        assert_eq!(table.rate("JPY"), None);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_rate_table_deserializes_from_plain_mapping() {
        let table: RateTable = serde_json::from_str(r#"{"USD": 1, "EUR": 0.91}"#).unwrap();
        assert_eq!(table.rate("USD"), Some(1.0));
        assert_eq!(table.rate("EUR"), Some(0.91));
    }

    #[test]
    fn test_fetch_failure_survives_context() {
        let err = anyhow::Error::new(FetchFailure::Malformed).context("Failed to parse");
        assert_eq!(FetchFailure::of(&err), FetchFailure::Malformed);
        assert_eq!(err.to_string(), "Failed to parse");

        let plain = anyhow!("something else");
        assert_eq!(FetchFailure::of(&plain), FetchFailure::Network);
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code(" usd "), "USD");
        assert_eq!(normalize_code("Inr"), "INR");
    }
}

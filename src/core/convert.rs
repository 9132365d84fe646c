//! Amount conversion against a fetched rate table

use crate::core::rates::RateTable;
use rust_decimal::{Decimal, RoundingStrategy};
use std::fmt::Display;

/// A single user triggered conversion. Only lives while the conversion is computed.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionRequest<'a> {
    pub amount: f64,
    pub base_currency: &'a str,
    pub target_currency: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionOutcome {
    /// The converted amount, rounded to two decimals.
    Converted(String),
    /// The target currency has no rate in the current table.
    Unavailable,
}

impl ConversionOutcome {
    pub fn as_str(&self) -> &str {
        match self {
            ConversionOutcome::Converted(value) => value,
            ConversionOutcome::Unavailable => "N/A",
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, ConversionOutcome::Converted(_))
    }
}

impl Display for ConversionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Converts `request.amount` using the rate for the target currency.
///
/// The table is assumed to be quoted in `request.base_currency`. The amount is not
/// validated; negative amounts convert like any other value.
pub fn convert(request: &ConversionRequest<'_>, rates: &RateTable) -> ConversionOutcome {
    rates
        .rate(request.target_currency)
        .and_then(|rate| two_decimals(request.amount * rate))
        .map_or(ConversionOutcome::Unavailable, ConversionOutcome::Converted)
}

/// Formats `value` with two decimals, rounding ties away from zero.
///
/// Rounding works on the exact binary value, so `0.125` becomes `0.13` while `1.005`
/// (stored just below the tie) becomes `1.00`. Values that don't fit a [`Decimal`],
/// including infinities and NaN, yield `None`.
fn two_decimals(value: f64) -> Option<String> {
    let exact = Decimal::from_f64_retain(value)?;
    let mut rounded = exact.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    // -0.0 prints unsigned
    if value == 0.0 {
        rounded.set_sign_positive(true);
    }
    Some(format!("{rounded:.2}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usd_rates() -> RateTable {
        [("INR", 83.0), ("EUR", 0.91)].into_iter().collect()
    }

    fn request<'a>(amount: f64, target: &'a str) -> ConversionRequest<'a> {
        ConversionRequest {
            amount,
            base_currency: "USD",
            target_currency: target,
        }
    }

    #[test]
    fn test_convert_usd_to_inr() {
        let outcome = convert(&request(10.0, "INR"), &usd_rates());
        assert_eq!(outcome, ConversionOutcome::Converted("830.00".to_string()));
    }

    #[test]
    fn test_convert_rounds_to_two_decimals() {
        let outcome = convert(&request(5.0, "EUR"), &usd_rates());
        assert_eq!(outcome.as_str(), "4.55");
    }

    #[test]
    fn test_convert_is_repeatable() {
        let rates = usd_rates();
        let first = convert(&request(3.33, "EUR"), &rates);
        let second = convert(&request(3.33, "EUR"), &rates);
        assert_eq!(first, second);
    }

    #[test]
    fn test_negative_and_zero_amounts_are_converted() {
        let rates = usd_rates();
        assert_eq!(convert(&request(-2.0, "INR"), &rates).as_str(), "-166.00");
        assert_eq!(convert(&request(0.0, "INR"), &rates).as_str(), "0.00");
    }

    #[test]
    fn test_ties_round_away_from_zero() {
        let unit: RateTable = [("INR", 1.0)].into_iter().collect();
        assert_eq!(convert(&request(0.125, "INR"), &unit).as_str(), "0.13");
        assert_eq!(convert(&request(0.625, "INR"), &unit).as_str(), "0.63");
        assert_eq!(convert(&request(-0.125, "INR"), &unit).as_str(), "-0.13");
        assert_eq!(convert(&request(2.5, "INR"), &unit).as_str(), "2.50");

        let quarter: RateTable = [("INR", 0.25)].into_iter().collect();
        assert_eq!(convert(&request(0.5, "INR"), &quarter).as_str(), "0.13");
    }

    #[test]
    fn test_rounding_uses_the_stored_value() {
        let unit: RateTable = [("INR", 1.0)].into_iter().collect();
        // 1.005 is stored as 1.00499999999999989...
        assert_eq!(convert(&request(1.005, "INR"), &unit).as_str(), "1.00");
        assert_eq!(convert(&request(-0.0, "INR"), &unit).as_str(), "0.00");
    }

    #[test]
    fn test_non_finite_result_is_unavailable() {
        let huge: RateTable = [("INR", f64::MAX)].into_iter().collect();
        assert_eq!(
            convert(&request(10.0, "INR"), &huge),
            ConversionOutcome::Unavailable
        );
    }

    #[test]
    fn test_missing_target_is_unavailable() {
        let outcome = convert(&request(10.0, "JPY"), &usd_rates());
        assert_eq!(outcome, ConversionOutcome::Unavailable);
        assert!(!outcome.is_available());
        assert_eq!(outcome.to_string(), "N/A");
    }

    #[test]
    fn test_empty_table_is_unavailable() {
        let outcome = convert(&request(1.0, "INR"), &RateTable::new());
        assert_eq!(outcome, ConversionOutcome::Unavailable);
    }
}

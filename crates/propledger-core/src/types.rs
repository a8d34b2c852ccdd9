use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// All monetary values, in whole units of the smallest displayed currency
/// increment. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as percentages (12 = 12% a year), the way the
/// marketplace forms and the backend carry them.
pub type Percent = Decimal;

/// Every instant is carried in UTC.
pub type Timestamp = DateTime<Utc>;

/// Currency code
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    #[default]
    NGN,
    USD,
    GBP,
    EUR,
    GHS,
    KES,
    ZAR,
    Other(String),
}

/// Round a money amount to a whole currency unit, halves away from zero.
pub fn round_money(amount: Decimal) -> Money {
    amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
    pub currency: Currency,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "whole_currency_units".to_string(),
            currency: Currency::default(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round_money_halves_away_from_zero() {
        assert_eq!(round_money(dec!(110108.5)), dec!(110109));
        assert_eq!(round_money(dec!(110108.49)), dec!(110108));
        assert_eq!(round_money(dec!(-2.5)), dec!(-3));
    }

    #[test]
    fn test_metadata_populated() {
        let out = with_metadata("Test", &serde_json::json!({}), vec![], 7, dec!(1));
        assert_eq!(out.metadata.computation_time_us, 7);
        assert_eq!(out.metadata.currency, Currency::NGN);
        assert!(!out.metadata.version.is_empty());
    }
}

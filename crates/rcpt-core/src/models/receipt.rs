//! Receipt extraction data models.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

/// Merchant name reported when no organization could be identified.
pub const UNKNOWN_MERCHANT: &str = "Unknown";

/// Structured fields extracted from one receipt.
///
/// Fields are private so that the date invariants hold for every value:
/// `all_dates` is sorted and de-duplicated, and `purchased_at` is its
/// first element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionResult {
    merchant_name: String,
    total_amount: Decimal,
    purchased_at: Option<NaiveDate>,
    all_dates: Vec<NaiveDate>,
}

impl ExtractionResult {
    /// Assemble a result, substituting defaults for missing fields.
    pub fn new(
        merchant_name: Option<String>,
        total_amount: Option<Decimal>,
        dates: impl IntoIterator<Item = NaiveDate>,
    ) -> Self {
        let all_dates: Vec<NaiveDate> = dates.into_iter().collect::<BTreeSet<_>>().into_iter().collect();

        Self {
            merchant_name: merchant_name
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| UNKNOWN_MERCHANT.to_string()),
            total_amount: total_amount.unwrap_or(Decimal::ZERO),
            purchased_at: all_dates.first().copied(),
            all_dates,
        }
    }

    pub fn merchant_name(&self) -> &str {
        &self.merchant_name
    }

    pub fn total_amount(&self) -> Decimal {
        self.total_amount
    }

    /// Earliest date found on the receipt.
    pub fn purchased_at(&self) -> Option<NaiveDate> {
        self.purchased_at
    }

    /// Every normalized date, ascending.
    pub fn all_dates(&self) -> &[NaiveDate] {
        &self.all_dates
    }

    /// Names of the fields that fell back to their default value.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.merchant_name == UNKNOWN_MERCHANT {
            missing.push("merchant_name");
        }
        if self.total_amount.is_zero() {
            missing.push("total_amount");
        }
        if self.purchased_at.is_none() {
            missing.push("purchased_at");
        }
        missing
    }
}

impl Default for ExtractionResult {
    fn default() -> Self {
        Self::new(None, None, std::iter::empty())
    }
}

/// A known amount found on a specific line of the receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonetaryCandidate {
    /// Parsed value.
    pub value: Decimal,
    /// Lowercased text of the line the value came from.
    pub line: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_default_result() {
        let result = ExtractionResult::default();

        assert_eq!(result.merchant_name(), "Unknown");
        assert!(result.total_amount().is_zero());
        assert_eq!(result.purchased_at(), None);
        assert!(result.all_dates().is_empty());
        assert_eq!(
            result.missing_fields(),
            vec!["merchant_name", "total_amount", "purchased_at"]
        );
    }

    #[test]
    fn test_dates_sorted_and_deduplicated() {
        let result = ExtractionResult::new(
            Some("Safeway".to_string()),
            Some(Decimal::from_str("12.50").unwrap()),
            vec![date(2019, 5, 8), date(2018, 11, 25), date(2019, 5, 8)],
        );

        assert_eq!(result.all_dates(), &[date(2018, 11, 25), date(2019, 5, 8)]);
        assert_eq!(result.purchased_at(), Some(date(2018, 11, 25)));
        assert!(result.missing_fields().is_empty());
    }

    #[test]
    fn test_blank_merchant_falls_back() {
        let result = ExtractionResult::new(Some("   ".to_string()), None, std::iter::empty());
        assert_eq!(result.merchant_name(), UNKNOWN_MERCHANT);
    }

    #[test]
    fn test_serializes_dates_as_iso_strings() {
        let result = ExtractionResult::new(
            Some("Safeway".to_string()),
            Some(Decimal::from_str("52.50").unwrap()),
            vec![date(2019, 5, 8)],
        );

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["merchant_name"], "Safeway");
        assert_eq!(json["purchased_at"], "2019-05-08");
        assert_eq!(json["all_dates"][0], "2019-05-08");
        assert_eq!(json["total_amount"], "52.50");
    }
}

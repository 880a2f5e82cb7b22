//! Total amount extraction for receipts.

use std::collections::BTreeSet;
use std::str::FromStr;

use regex::Regex;
use rust_decimal::Decimal;
use tracing::{debug, trace};

use super::patterns::{AMOUNT_TOKEN, KNOWN_AMOUNT};
use crate::error::AmountError;
use crate::models::config::ExtractionConfig;
use crate::models::receipt::MonetaryCandidate;

/// Outcome of scanning a receipt for total candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AmountScan {
    /// A known amount on a line carrying a priority keyword.
    Priority(MonetaryCandidate),
    /// No priority line; every known amount from the surviving lines.
    Fallback(Vec<MonetaryCandidate>),
}

/// Picks the total out of a receipt's lines.
pub struct AmountExtractor {
    ignore_keywords: Vec<String>,
    priority_keywords: Option<Regex>,
    min_amount: Decimal,
    max_amount: Decimal,
}

impl AmountExtractor {
    pub fn new() -> Self {
        Self::from_config(&ExtractionConfig::default())
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            ignore_keywords: config
                .ignore_keywords
                .iter()
                .map(|k| k.to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            priority_keywords: word_regex(&config.priority_keywords),
            min_amount: config.min_amount,
            max_amount: config.max_amount,
        }
    }

    /// Resolve the single most likely total.
    ///
    /// Only values in `known_amounts` are considered. The first one found
    /// on a priority line wins outright; otherwise the largest value inside
    /// the plausible range is returned.
    pub fn extract_total_amount(
        &self,
        text: &str,
        known_amounts: &BTreeSet<Decimal>,
    ) -> Option<Decimal> {
        match self.scan(text, known_amounts) {
            AmountScan::Priority(candidate) => {
                debug!("Total {} taken from line {:?}", candidate.value, candidate.line);
                Some(candidate.value)
            }
            AmountScan::Fallback(candidates) => {
                let best = candidates
                    .iter()
                    .map(|c| c.value)
                    .filter(|v| *v > self.min_amount && *v < self.max_amount)
                    .max();
                debug!(
                    "No priority line; {} candidates, fallback total {:?}",
                    candidates.len(),
                    best
                );
                best
            }
        }
    }

    /// Walk the lines top to bottom collecting known amounts.
    pub fn scan(&self, text: &str, known_amounts: &BTreeSet<Decimal>) -> AmountScan {
        let mut candidates = Vec::new();

        for line in text.lines() {
            let line_lower = line.to_lowercase();

            if self.is_ignored(&line_lower) {
                trace!("Ignoring promotional line {:?}", line);
                continue;
            }

            for token in AMOUNT_TOKEN.find_iter(line) {
                let value = match resolve_token(token.as_str(), known_amounts) {
                    Ok(value) => value,
                    Err(e) => {
                        trace!("Skipping token: {}", e);
                        continue;
                    }
                };

                let candidate = MonetaryCandidate {
                    value,
                    line: line_lower.clone(),
                };

                if self.is_priority(&line_lower) {
                    return AmountScan::Priority(candidate);
                }
                candidates.push(candidate);
            }
        }

        AmountScan::Fallback(candidates)
    }

    fn is_ignored(&self, line_lower: &str) -> bool {
        self.ignore_keywords.iter().any(|k| line_lower.contains(k.as_str()))
    }

    fn is_priority(&self, line_lower: &str) -> bool {
        self.priority_keywords
            .as_ref()
            .is_some_and(|re| re.is_match(line_lower))
    }
}

impl Default for AmountExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Turn a numeric token into a known amount.
///
/// A bare digit run that is not itself known is read as having lost its
/// decimal point (`1500` becomes `15.00`) when it is at least three digits.
pub fn resolve_token(token: &str, known_amounts: &BTreeSet<Decimal>) -> Result<Decimal, AmountError> {
    let cleaned = token.replace(',', "");
    let value =
        Decimal::from_str(&cleaned).map_err(|_| AmountError::Unparseable(token.to_string()))?;

    if known_amounts.contains(&value) {
        return Ok(value);
    }
    if cleaned.contains('.') {
        return Err(AmountError::Unknown(cleaned));
    }
    if cleaned.len() < 3 {
        return Err(AmountError::TooShort(cleaned));
    }

    let (whole, cents) = cleaned.split_at(cleaned.len() - 2);
    let repaired = Decimal::from_str(&format!("{whole}.{cents}"))
        .map_err(|_| AmountError::Unparseable(token.to_string()))?;

    if known_amounts.contains(&repaired) {
        Ok(repaired)
    } else {
        Err(AmountError::Unknown(repaired.to_string()))
    }
}

/// Amounts written with cents anywhere in the text (`1,234.56`, `9.99`).
pub fn known_amounts_from_text(text: &str) -> BTreeSet<Decimal> {
    KNOWN_AMOUNT
        .find_iter(text)
        .filter_map(|m| Decimal::from_str(&m.as_str().replace(',', "")).ok())
        .collect()
}

/// Parse the value of a money entity such as `$1,200.00` or `12.50 USD`.
pub fn parse_money(text: &str) -> Result<Decimal, AmountError> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return Err(AmountError::Unparseable(text.to_string()));
    }

    Decimal::from_str(&cleaned).map_err(|_| AmountError::Unparseable(text.to_string()))
}

fn word_regex(words: &[String]) -> Option<Regex> {
    let alternatives: Vec<String> = words
        .iter()
        .filter(|w| !w.trim().is_empty())
        .map(|w| regex::escape(&w.trim().to_lowercase()))
        .collect();

    if alternatives.is_empty() {
        return None;
    }

    Regex::new(&format!(r"\b(?:{})\b", alternatives.join("|"))).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn known(values: &[&str]) -> BTreeSet<Decimal> {
        values.iter().map(|v| dec(v)).collect()
    }

    #[test]
    fn test_priority_line_short_circuits() {
        let text = "Subtotal 40.00\nTotal due 52.50\nCard fee 3.00";
        let amount = AmountExtractor::new()
            .extract_total_amount(text, &known(&["40.00", "52.50", "3.00"]));

        assert_eq!(amount, Some(dec("52.50")));
    }

    #[test]
    fn test_scan_reports_priority_line() {
        let text = "Subtotal 40.00\nTOTAL DUE 52.50";
        let scan = AmountExtractor::new().scan(text, &known(&["40.00", "52.50"]));

        assert_eq!(
            scan,
            AmountScan::Priority(MonetaryCandidate {
                value: dec("52.50"),
                line: "total due 52.50".to_string(),
            })
        );
    }

    #[test]
    fn test_ignored_lines_never_yield_candidates() {
        let text = "Gift card savings: 25.00\nBagel 3.00";
        let extractor = AmountExtractor::new();
        let known = known(&["25.00", "3.00"]);

        assert_eq!(extractor.extract_total_amount(text, &known), Some(dec("3.00")));
        match extractor.scan(text, &known) {
            AmountScan::Fallback(candidates) => {
                assert!(candidates.iter().all(|c| c.value != dec("25.00")));
            }
            AmountScan::Priority(c) => panic!("unexpected priority candidate {c:?}"),
        }
    }

    #[test]
    fn test_fallback_returns_maximum() {
        let text = "Bagel 12.50\nJuice 8.00\nPlatter 99.99";
        let amount = AmountExtractor::new()
            .extract_total_amount(text, &known(&["12.50", "8.00", "99.99"]));

        assert_eq!(amount, Some(dec("99.99")));
    }

    #[test]
    fn test_fallback_range_filter() {
        let text = "Bagel 12.50\nDeposit 15,000.00";
        let amount = AmountExtractor::new()
            .extract_total_amount(text, &known(&["12.50", "15000.00"]));

        assert_eq!(amount, Some(dec("12.50")));
    }

    #[test]
    fn test_range_bounds_are_exclusive() {
        let text = "Mint 1.00\nToken 0.50";
        let amount =
            AmountExtractor::new().extract_total_amount(text, &known(&["1.00", "0.50"]));

        assert_eq!(amount, None);
    }

    #[test]
    fn test_unknown_numbers_are_ignored() {
        let text = "Invoice 4821\nTotal 19.99";
        let amount = AmountExtractor::new().extract_total_amount(text, &known(&["19.99"]));

        assert_eq!(amount, Some(dec("19.99")));
    }

    #[test]
    fn test_priority_line_without_known_amount_keeps_scanning() {
        let text = "Total items 3\nBalance 20.00";
        let amount = AmountExtractor::new().extract_total_amount(text, &known(&["20.00"]));

        assert_eq!(amount, Some(dec("20.00")));
    }

    #[test]
    fn test_missing_decimal_point_is_repaired() {
        let text = "Lunch 1500";
        let amount = AmountExtractor::new().extract_total_amount(text, &known(&["15.00"]));

        assert_eq!(amount, Some(dec("15.00")));
    }

    #[test]
    fn test_resolve_token() {
        let known = known(&["15.00", "1234.56"]);

        assert_eq!(resolve_token("1,234.56", &known), Ok(dec("1234.56")));
        assert_eq!(resolve_token("1500", &known), Ok(dec("15.00")));
        assert_eq!(resolve_token("12", &known), Err(AmountError::TooShort("12".to_string())));
        assert_eq!(
            resolve_token("9.99", &known),
            Err(AmountError::Unknown("9.99".to_string()))
        );
    }

    #[test]
    fn test_no_candidates() {
        assert_eq!(AmountExtractor::new().extract_total_amount("", &BTreeSet::new()), None);
        assert_eq!(
            AmountExtractor::new().extract_total_amount("Total 52.50", &BTreeSet::new()),
            None
        );
    }

    #[test]
    fn test_custom_keywords() {
        let config = ExtractionConfig {
            priority_keywords: vec!["grand total".to_string()],
            ..ExtractionConfig::default()
        };
        let text = "Total 40.00\nGrand total 52.50";
        let amount = AmountExtractor::from_config(&config)
            .extract_total_amount(text, &known(&["40.00", "52.50"]));

        assert_eq!(amount, Some(dec("52.50")));
    }

    #[test]
    fn test_known_amounts_from_text() {
        assert_eq!(
            known_amounts_from_text("Paid 1,234.56 and 9.99, ref 4821"),
            known(&["1234.56", "9.99"])
        );
    }

    #[test]
    fn test_parse_money() {
        assert_eq!(parse_money("$1,200.00"), Ok(dec("1200.00")));
        assert_eq!(parse_money("12.50 USD"), Ok(dec("12.50")));
        assert!(parse_money("$").is_err());
    }
}

//! Entity-driven receipt extraction combining recognition and rules.

use std::collections::BTreeSet;
use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, info, trace, warn};

use crate::models::config::ExtractionConfig;
use crate::models::receipt::ExtractionResult;

use super::ner::{Entity, EntityCategory, EntityRecognizer};
use super::rules::{
    amounts::{known_amounts_from_text, parse_money, AmountExtractor},
    dates::DateExtractor,
    FieldExtractor,
};
use super::{ExtractionStrategy, Result};

/// Extracts merchant, total and dates using an entity recognizer plus
/// the amount and date rules.
pub struct EntityExtractor {
    recognizer: Arc<dyn EntityRecognizer>,
    amounts: AmountExtractor,
    dates: DateExtractor,
}

impl EntityExtractor {
    /// Create an extractor with default keyword lists and amount range.
    pub fn new(recognizer: Arc<dyn EntityRecognizer>) -> Self {
        Self {
            recognizer,
            amounts: AmountExtractor::new(),
            dates: DateExtractor::new(),
        }
    }

    /// Use keyword lists and amount range from configuration.
    pub fn with_config(mut self, config: &ExtractionConfig) -> Self {
        self.amounts = AmountExtractor::from_config(config);
        self
    }

    /// Extract the structured fields of one receipt.
    ///
    /// Never fails: anything that cannot be found falls back to its default.
    pub fn extract_entities(&self, text: &str) -> ExtractionResult {
        info!("Extracting receipt fields from {} characters of text", text.len());

        let entities = match self.recognizer.recognize(text) {
            Ok(entities) => entities,
            Err(e) => {
                warn!("Entity recognition failed, continuing without entities: {}", e);
                Vec::new()
            }
        };

        let merchant_name = first_organization(&entities);
        let mut known_amounts = money_values(&entities);
        known_amounts.extend(known_amounts_from_text(text));
        debug!("{} known amounts", known_amounts.len());

        let total_amount = self.amounts.extract_total_amount(text, &known_amounts);

        let dates = self.dates.extract_all(text);
        debug!("{} date matches normalized", dates.len());
        for m in &dates {
            trace!("Date {} from {:?} at {:?}", m.value, m.source, m.position);
        }

        let result = ExtractionResult::new(
            merchant_name,
            total_amount,
            dates.into_iter().map(|m| m.value),
        );

        debug!(
            "Extracted merchant {:?}, total {}, purchased at {:?}",
            result.merchant_name(),
            result.total_amount(),
            result.purchased_at()
        );

        result
    }
}

impl ExtractionStrategy for EntityExtractor {
    fn name(&self) -> &'static str {
        "rules"
    }

    fn try_extract(&self, text: &str) -> Result<ExtractionResult> {
        Ok(self.extract_entities(text))
    }
}

fn first_organization(entities: &[Entity]) -> Option<String> {
    entities
        .iter()
        .find(|e| e.category == EntityCategory::Organization)
        .map(|e| e.text.trim().to_string())
}

fn money_values(entities: &[Entity]) -> BTreeSet<Decimal> {
    entities
        .iter()
        .filter(|e| e.category == EntityCategory::Money)
        .filter_map(|e| match parse_money(&e.text) {
            Ok(value) => Some(value),
            Err(err) => {
                trace!("Ignoring money entity: {}", err);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExtractionError;
    use crate::extract::ner::RuleBasedRecognizer;
    use crate::models::config::NerConfig;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    struct StubRecognizer(Vec<Entity>);

    impl EntityRecognizer for StubRecognizer {
        fn recognize(&self, _text: &str) -> std::result::Result<Vec<Entity>, ExtractionError> {
            Ok(self.0.clone())
        }
    }

    struct FailingRecognizer;

    impl EntityRecognizer for FailingRecognizer {
        fn recognize(&self, _text: &str) -> std::result::Result<Vec<Entity>, ExtractionError> {
            Err(ExtractionError::Recognizer("model not loaded".to_string()))
        }
    }

    fn extractor(entities: Vec<Entity>) -> EntityExtractor {
        EntityExtractor::new(Arc::new(StubRecognizer(entities)))
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    const SAFEWAY: &str = r#"
        SAFEWAY
        Store 1234 Dir Jane
        05/08/2019 21:15
        BREAD            3.49
        MILK             4.29
        Subtotal        40.00
        TOTAL DUE       52.50
        You saved $12.00 today
        Gift card balance 25.00
        Survey at safeway.com/survey, win $1,000.00
        Offer expires 06/30/2019
    "#;

    #[test]
    fn test_extract_basic_receipt() {
        let result = extractor(vec![
            Entity::new(EntityCategory::Organization, "SAFEWAY"),
            Entity::new(EntityCategory::Money, "$12.00"),
        ])
        .extract_entities(SAFEWAY);

        assert_eq!(result.merchant_name(), "SAFEWAY");
        assert_eq!(result.total_amount(), dec("52.50"));
        assert_eq!(result.purchased_at(), Some(date(2019, 5, 8)));
        assert_eq!(result.all_dates(), &[date(2019, 5, 8), date(2019, 6, 30)]);
    }

    #[test]
    fn test_first_organization_wins() {
        let result = extractor(vec![
            Entity::new(EntityCategory::Money, "$3.00"),
            Entity::new(EntityCategory::Organization, "Blue Bottle Coffee"),
            Entity::new(EntityCategory::Organization, "Visa"),
        ])
        .extract_entities("Blue Bottle Coffee\nVisa ****1234");

        assert_eq!(result.merchant_name(), "Blue Bottle Coffee");
    }

    #[test]
    fn test_money_entity_seeds_known_amounts() {
        // "15" has no cents, so only the money entity makes it a candidate.
        let result = extractor(vec![Entity::new(EntityCategory::Money, "$15")])
            .extract_entities("Parking\nAmount $15");

        assert_eq!(result.total_amount(), dec("15"));
    }

    #[test]
    fn test_default_fallback() {
        let result = extractor(Vec::new()).extract_entities("hello world");

        assert_eq!(result, ExtractionResult::default());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["merchant_name"], "Unknown");
        assert_eq!(json["total_amount"], "0");
        assert!(json["purchased_at"].is_null());
        assert_eq!(json["all_dates"], serde_json::json!([]));
    }

    #[test]
    fn test_idempotent() {
        let extractor = EntityExtractor::new(Arc::new(RuleBasedRecognizer::new(
            vec!["Safeway".to_string()],
            &[],
        )));

        let first = extractor.extract_entities(SAFEWAY);
        let second = extractor.extract_entities(SAFEWAY);
        assert_eq!(first, second);
    }

    #[test]
    fn test_default_recognizer_skips_store_number_line() {
        let text = "SAFEWAY\nStore 1234 Dir Jane\nTotal 5.00";

        let result = EntityExtractor::new(Arc::new(RuleBasedRecognizer::default())).extract_entities(text);
        assert_eq!(result.merchant_name(), "Unknown");
        assert_eq!(result.total_amount(), dec("5.00"));

        let with_gazetteer = EntityExtractor::new(Arc::new(RuleBasedRecognizer::new(
            vec!["Safeway".to_string()],
            &NerConfig::default().org_suffixes,
        )));
        assert_eq!(with_gazetteer.extract_entities(text).merchant_name(), "Safeway");
    }

    #[test]
    fn test_all_dates_invariant() {
        let text = "Visit 11/25/2018\nIssued 2018-11-25\nPrinted 25 Nov 2018\nDue December 1, 2018\nbogus 19/45/2018";
        let result = extractor(Vec::new()).extract_entities(text);

        assert_eq!(result.all_dates(), &[date(2018, 11, 25), date(2018, 12, 1)]);
        assert_eq!(result.purchased_at(), result.all_dates().iter().min().copied());
        for d in result.all_dates() {
            assert_eq!(d.format("%Y-%m-%d").to_string().len(), 10);
        }
    }

    #[test]
    fn test_recognizer_failure_is_soft() {
        let extractor = EntityExtractor::new(Arc::new(FailingRecognizer));
        let result = extractor.extract_entities("Total 9.99\n01/02/2020");

        assert_eq!(result.merchant_name(), "Unknown");
        assert_eq!(result.total_amount(), dec("9.99"));
        assert_eq!(result.purchased_at(), Some(date(2020, 1, 2)));
    }

    #[test]
    fn test_strategy_name() {
        assert_eq!(extractor(Vec::new()).name(), "rules");
    }
}

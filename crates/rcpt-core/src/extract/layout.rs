//! Layout heuristics: the merchant heads the receipt, the total is the
//! largest amount.

use tracing::debug;

use crate::models::receipt::ExtractionResult;

use super::rules::amounts::known_amounts_from_text;
use super::rules::dates::DateNormalizer;
use super::rules::patterns::{DATE_SIMPLE, HEADER_NOISE};
use super::{ExtractionStrategy, Result};

/// Cheap extraction without entity recognition.
pub struct LayoutStrategy {
    normalizer: DateNormalizer,
}

impl LayoutStrategy {
    pub fn new() -> Self {
        Self {
            normalizer: DateNormalizer::new(),
        }
    }

    /// First non-empty line that is not a field label.
    fn merchant(&self, text: &str) -> Option<String> {
        text.lines()
            .map(str::trim)
            .find(|line| !line.is_empty() && !HEADER_NOISE.is_match(line))
            .map(str::to_string)
    }
}

impl Default for LayoutStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractionStrategy for LayoutStrategy {
    fn name(&self) -> &'static str {
        "layout"
    }

    fn try_extract(&self, text: &str) -> Result<ExtractionResult> {
        let merchant = self.merchant(text);

        let purchased_at = DATE_SIMPLE
            .captures(text)
            .and_then(|caps| self.normalizer.parse(&caps[1]).ok());

        let total = known_amounts_from_text(text).last().copied();

        debug!(
            "Layout heuristics found merchant {:?}, total {:?}, date {:?}",
            merchant, total, purchased_at
        );

        Ok(ExtractionResult::new(merchant, total, purchased_at))
    }
}

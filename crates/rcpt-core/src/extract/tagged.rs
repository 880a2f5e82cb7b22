//! Extraction from tag markup emitted by a document-understanding model.
//!
//! Models of this family answer with markup such as
//! `<s_header><s_supplier>ACME</s_supplier></s_header>`. Groups may nest, so
//! each field tag is matched against its own closing tag. The decoder
//! producing that markup is injected; the strategy only reads it.

use std::collections::HashMap;
use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use tracing::{debug, trace};

use crate::error::ExtractionError;
use crate::models::receipt::ExtractionResult;

use super::rules::amounts::parse_money;
use super::rules::dates::DateNormalizer;
use super::{ExtractionStrategy, Result};

const DATE_TAGS: [&str; 2] = ["s_date", "s_document_date"];
const MERCHANT_TAGS: [&str; 2] = ["s_supplier", "s_invoice_no"];
const AMOUNT_TAG: &str = "s_item_gross_worth";

lazy_static! {
    static ref OPEN_TAG: Regex = Regex::new(r"<s_[a-z_]+>").unwrap();
    static ref FIELD_TAGS: HashMap<&'static str, Regex> = DATE_TAGS
        .iter()
        .chain(MERCHANT_TAGS.iter())
        .chain(std::iter::once(&AMOUNT_TAG))
        .map(|tag| (*tag, Regex::new(&format!(r"(?s)<{tag}>(.*?)</{tag}>")).unwrap()))
        .collect();
}

/// Produces tag markup for a receipt.
pub trait TagDecoder: Send + Sync {
    fn decode(&self, text: &str) -> std::result::Result<String, ExtractionError>;
}

/// Treats the input as markup already, e.g. text saved from a model run.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughDecoder;

impl TagDecoder for PassthroughDecoder {
    fn decode(&self, text: &str) -> std::result::Result<String, ExtractionError> {
        Ok(text.to_string())
    }
}

pub struct TaggedStrategy {
    decoder: Arc<dyn TagDecoder>,
    normalizer: DateNormalizer,
}

impl TaggedStrategy {
    pub fn new(decoder: Arc<dyn TagDecoder>) -> Self {
        Self {
            decoder,
            normalizer: DateNormalizer::new(),
        }
    }
}

/// Non-empty trimmed contents of every `tag` element, in document order.
fn tag_values<'a>(markup: &'a str, tag: &str) -> Vec<&'a str> {
    let Some(pattern) = FIELD_TAGS.get(tag) else {
        return Vec::new();
    };
    pattern
        .captures_iter(markup)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|value| !value.is_empty())
        .collect()
}

impl ExtractionStrategy for TaggedStrategy {
    fn name(&self) -> &'static str {
        "tagged"
    }

    fn try_extract(&self, text: &str) -> Result<ExtractionResult> {
        let decoded = self.decoder.decode(text)?;
        let markup = decoded.as_str();
        if !OPEN_TAG.is_match(markup) {
            return Err(ExtractionError::MalformedResponse(
                "no <s_*> tags in decoder output".to_string(),
            ));
        }
        debug!("Decoder produced {} tags", OPEN_TAG.find_iter(markup).count());

        let purchased_at = DATE_TAGS
            .iter()
            .filter_map(|tag| tag_values(markup, tag).first().copied())
            .find_map(|raw| self.normalizer.parse(raw).ok());

        let merchant = MERCHANT_TAGS
            .iter()
            .find_map(|tag| tag_values(markup, tag).first().copied())
            .map(str::to_string);

        // Line items repeat the tag; the last one is the grand total.
        let total: Option<Decimal> = tag_values(markup, AMOUNT_TAG)
            .into_iter()
            .rev()
            .find_map(|value| match parse_money(value) {
                Ok(amount) => Some(amount),
                Err(e) => {
                    trace!("Skipping gross worth {:?}: {}", value, e);
                    None
                }
            });

        Ok(ExtractionResult::new(merchant, total, purchased_at))
    }
}

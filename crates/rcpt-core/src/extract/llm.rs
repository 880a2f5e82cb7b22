//! Extraction by prompting a language model for JSON.

use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::ExtractionError;
use crate::models::receipt::ExtractionResult;

use super::rules::amounts::parse_money;
use super::rules::dates::DateNormalizer;
use super::{ExtractionStrategy, Result};

const NOT_FOUND: &str = "Not Found";

/// Sends a single prompt to a model and returns its text reply.
pub trait CompletionClient: Send + Sync {
    fn complete(&self, prompt: &str) -> std::result::Result<String, ExtractionError>;
}

/// Build the extraction prompt for one receipt.
pub fn build_prompt(text: &str) -> String {
    format!(
        r#"From the following receipt text, extract:
1. Merchant name
2. Total amount
3. Purchase date, in YYYY-MM-DD format

If a piece of information is not found, use "{NOT_FOUND}".

Receipt text:
{text}

Answer with a single JSON object and nothing else:
{{
  "merchant_name": "...",
  "total_amount": ...,
  "purchased_at": "..."
}}"#
    )
}

#[derive(Debug, Default, Deserialize)]
struct Reply {
    #[serde(default)]
    merchant_name: Option<Value>,
    #[serde(default)]
    total_amount: Option<Value>,
    #[serde(default)]
    purchased_at: Option<Value>,
}

/// Strip a markdown fence and stray unicode spaces from a model reply.
fn clean_reply(raw: &str) -> String {
    raw.trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
        .replace(['\u{00A0}', '\u{202F}'], " ")
        .replace('\u{200B}', "")
}

/// A string field unless the model said it was missing.
fn present(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty() && !s.eq_ignore_ascii_case(NOT_FOUND)).then_some(s)
        }
        _ => None,
    }
}

fn amount(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        other => present(other).and_then(|s| parse_money(s).ok()),
    }
}

fn date(normalizer: &DateNormalizer, value: &Value) -> Option<NaiveDate> {
    let raw = present(value)?;
    normalizer.parse(raw).ok().or_else(|| {
        raw.split(|c: char| c.is_whitespace() || c == 'T')
            .next()
            .and_then(|token| normalizer.parse(token).ok())
    })
}

/// Map a raw model reply onto an extraction result.
pub fn parse_reply(raw: &str) -> Result<ExtractionResult> {
    let cleaned = clean_reply(raw);
    trace!("Cleaned model reply: {:?}", cleaned);

    let reply: Reply = serde_json::from_str(&cleaned)
        .map_err(|e| ExtractionError::MalformedResponse(format!("{}: {:?}", e, cleaned)))?;

    let normalizer = DateNormalizer::new();
    let merchant = reply
        .merchant_name
        .as_ref()
        .and_then(present)
        .map(str::to_string);
    let total = reply.total_amount.as_ref().and_then(amount);
    let purchased_at = reply
        .purchased_at
        .as_ref()
        .and_then(|v| date(&normalizer, v));

    Ok(ExtractionResult::new(merchant, total, purchased_at))
}

pub struct LlmStrategy {
    client: Arc<dyn CompletionClient>,
}

impl LlmStrategy {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self { client }
    }
}

impl ExtractionStrategy for LlmStrategy {
    fn name(&self) -> &'static str {
        "llm"
    }

    fn try_extract(&self, text: &str) -> Result<ExtractionResult> {
        let reply = self.client.complete(&build_prompt(text))?;
        debug!("Model replied with {} characters", reply.len());
        parse_reply(&reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    struct CannedClient {
        reply: String,
        prompts: Mutex<Vec<String>>,
    }

    impl CannedClient {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    impl CompletionClient for CannedClient {
        fn complete(&self, prompt: &str) -> std::result::Result<String, ExtractionError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.reply.clone())
        }
    }

    struct DownClient;

    impl CompletionClient for DownClient {
        fn complete(&self, _prompt: &str) -> std::result::Result<String, ExtractionError> {
            Err(ExtractionError::Completion("connection refused".to_string()))
        }
    }

    #[test]
    fn test_prompt_embeds_receipt() {
        let client = CannedClient::new("{}");
        LlmStrategy::new(client.clone()).extract("TACO TRUCK\nTotal 9.00");

        let prompts = client.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("TACO TRUCK\nTotal 9.00"));
        assert!(prompts[0].contains("\"purchased_at\""));
        assert!(prompts[0].contains(NOT_FOUND));
    }

    #[test]
    fn test_fenced_reply() {
        let reply = "```json\n{\n  \"merchant_name\": \"Taco\u{00A0}Truck\",\n  \"total_amount\": 9.5,\n  \"purchased_at\": \"2021-03-14 12:30\"\n}\n```";
        let result = parse_reply(reply).unwrap();

        assert_eq!(result.merchant_name(), "Taco Truck");
        assert_eq!(result.total_amount(), Decimal::from_str("9.5").unwrap());
        assert_eq!(result.purchased_at(), NaiveDate::from_ymd_opt(2021, 3, 14));
    }

    #[test]
    fn test_not_found_fields_default() {
        let reply = r#"{"merchant_name": "Not Found", "total_amount": "Not Found", "purchased_at": "not found"}"#;
        assert_eq!(parse_reply(reply).unwrap(), ExtractionResult::default());
    }

    #[test]
    fn test_string_amount_and_iso_timestamp() {
        let reply = r#"{"merchant_name": "Costco", "total_amount": "$1,204.99", "purchased_at": "2020-02-29T18:04:00"}"#;
        let result = parse_reply(reply).unwrap();

        assert_eq!(result.total_amount(), Decimal::from_str("1204.99").unwrap());
        assert_eq!(result.purchased_at(), NaiveDate::from_ymd_opt(2020, 2, 29));
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        let err = parse_reply("Sorry, I can't read that receipt.").unwrap_err();
        assert!(matches!(err, ExtractionError::MalformedResponse(_)));
    }

    #[test]
    fn test_failures_yield_defaults() {
        assert_eq!(
            LlmStrategy::new(Arc::new(DownClient)).extract("Total 9.00"),
            ExtractionResult::default()
        );
        assert_eq!(
            LlmStrategy::new(CannedClient::new("not json")).extract("Total 9.00"),
            ExtractionResult::default()
        );
    }
}

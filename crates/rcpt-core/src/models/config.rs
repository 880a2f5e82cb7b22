//! Configuration structures for the extraction pipeline.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::extract::StrategyKind;

/// Main configuration for rcpt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RcptConfig {
    /// Field extraction configuration.
    pub extraction: ExtractionConfig,

    /// Entity recognizer configuration.
    pub ner: NerConfig,

    /// LLM completion endpoint configuration.
    pub llm: LlmConfig,
}

/// Field extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Which extraction strategy to run.
    pub strategy: StrategyKind,

    /// Lines containing any of these (as a substring) never yield the total.
    pub ignore_keywords: Vec<String>,

    /// Lines containing any of these words are trusted as the total line.
    pub priority_keywords: Vec<String>,

    /// Fallback candidates must be strictly greater than this.
    pub min_amount: Decimal,

    /// Fallback candidates must be strictly less than this.
    pub max_amount: Decimal,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::Rules,
            ignore_keywords: to_strings(&[
                "gift",
                "survey",
                "win",
                "reward",
                "promo",
                "coupon",
                "expires",
                "discount",
                "off",
                "save",
                "now value",
            ]),
            priority_keywords: to_strings(&["total", "amount", "due", "balance", "paid"]),
            min_amount: Decimal::ONE,
            max_amount: Decimal::from(10_000),
        }
    }
}

/// Entity recognizer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NerConfig {
    /// Newline-delimited list of known merchant names.
    pub merchants_file: Option<PathBuf>,

    /// Words marking a line as an organization name.
    pub org_suffixes: Vec<String>,
}

impl Default for NerConfig {
    fn default() -> Self {
        Self {
            merchants_file: None,
            org_suffixes: to_strings(&[
                "inc",
                "llc",
                "ltd",
                "corp",
                "co",
                "company",
                "gmbh",
                "market",
                "supermarket",
            ]),
        }
    }
}

/// OpenAI-compatible completion endpoint used by the `llm` strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL; `/chat/completions` is appended.
    pub base_url: String,

    /// Model name sent with each request.
    pub model: String,

    /// Environment variable holding the API key.
    pub api_key_env: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 60,
        }
    }
}

impl RcptConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

impl ExtractionConfig {
    /// Parse the strategy name and keep the rest of the settings.
    pub fn with_strategy(mut self, name: &str) -> crate::Result<Self> {
        self.strategy = StrategyKind::from_str(name)?;
        Ok(self)
    }
}

fn to_strings(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| (*w).to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: RcptConfig =
            serde_json::from_str(r#"{"extraction": {"strategy": "layout"}}"#).unwrap();

        assert_eq!(config.extraction.strategy, StrategyKind::Layout);
        assert_eq!(config.extraction.priority_keywords.len(), 5);
        assert_eq!(config.extraction.max_amount, Decimal::from(10_000));
        assert_eq!(config.llm.api_key_env, "OPENAI_API_KEY");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = RcptConfig::default();
        config.extraction.strategy = StrategyKind::Tagged;
        config.save(&path).unwrap();

        let loaded = RcptConfig::from_file(&path).unwrap();
        assert_eq!(loaded.extraction.strategy, StrategyKind::Tagged);
        assert_eq!(loaded.ner.org_suffixes, config.ner.org_suffixes);
    }

    #[test]
    fn test_with_strategy_rejects_unknown_name() {
        assert!(ExtractionConfig::default().with_strategy("donut").is_err());
        assert_eq!(
            ExtractionConfig::default().with_strategy("llm").unwrap().strategy,
            StrategyKind::Llm
        );
    }
}

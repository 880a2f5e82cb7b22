//! Extraction strategies and their construction from configuration.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::RcptError;
use crate::models::config::ExtractionConfig;
use crate::models::receipt::ExtractionResult;

use super::entities::EntityExtractor;
use super::layout::LayoutStrategy;
use super::llm::{CompletionClient, LlmStrategy};
use super::ner::{EntityRecognizer, RuleBasedRecognizer};
use super::tagged::{PassthroughDecoder, TagDecoder, TaggedStrategy};
use super::Result;

/// One way of turning receipt text into structured fields.
pub trait ExtractionStrategy: Send + Sync {
    /// Short name used in logs and output.
    fn name(&self) -> &'static str;

    /// Extract, reporting why extraction failed.
    fn try_extract(&self, text: &str) -> Result<ExtractionResult>;

    /// Extract, falling back to a default result on failure.
    fn extract(&self, text: &str) -> ExtractionResult {
        match self.try_extract(text) {
            Ok(result) => result,
            Err(e) => {
                warn!("{} extraction failed, using defaults: {}", self.name(), e);
                ExtractionResult::default()
            }
        }
    }
}

/// Available extraction strategies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Entity recognition plus amount and date rules.
    #[default]
    Rules,
    /// First-line merchant and largest amount heuristics.
    Layout,
    /// Tag markup produced by a document model.
    Tagged,
    /// Prompted LLM returning JSON.
    Llm,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 4] = [
        StrategyKind::Rules,
        StrategyKind::Layout,
        StrategyKind::Tagged,
        StrategyKind::Llm,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Rules => "rules",
            StrategyKind::Layout => "layout",
            StrategyKind::Tagged => "tagged",
            StrategyKind::Llm => "llm",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = RcptError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| {
                RcptError::Config(format!(
                    "unknown strategy {:?}, expected one of rules, layout, tagged, llm",
                    s
                ))
            })
    }
}

/// Builds the configured strategy from the collaborators it needs.
pub struct StrategyBuilder {
    config: ExtractionConfig,
    recognizer: Option<Arc<dyn EntityRecognizer>>,
    decoder: Option<Arc<dyn TagDecoder>>,
    client: Option<Arc<dyn CompletionClient>>,
}

impl StrategyBuilder {
    pub fn new(config: ExtractionConfig) -> Self {
        Self {
            config,
            recognizer: None,
            decoder: None,
            client: None,
        }
    }

    /// Recognizer for the `rules` strategy.
    pub fn recognizer(mut self, recognizer: Arc<dyn EntityRecognizer>) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    /// Tag decoder for the `tagged` strategy.
    pub fn decoder(mut self, decoder: Arc<dyn TagDecoder>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    /// Completion client for the `llm` strategy.
    pub fn client(mut self, client: Arc<dyn CompletionClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn build(self) -> crate::Result<Arc<dyn ExtractionStrategy>> {
        let kind = self.config.strategy;
        info!("Using {} extraction strategy", kind);

        let strategy: Arc<dyn ExtractionStrategy> = match kind {
            StrategyKind::Rules => {
                let recognizer: Arc<dyn EntityRecognizer> = match self.recognizer {
                    Some(recognizer) => recognizer,
                    None => Arc::new(RuleBasedRecognizer::default()),
                };
                Arc::new(EntityExtractor::new(recognizer).with_config(&self.config))
            }
            StrategyKind::Layout => Arc::new(LayoutStrategy::new()),
            StrategyKind::Tagged => {
                let decoder: Arc<dyn TagDecoder> = match self.decoder {
                    Some(decoder) => decoder,
                    None => Arc::new(PassthroughDecoder),
                };
                Arc::new(TaggedStrategy::new(decoder))
            }
            StrategyKind::Llm => {
                let client = self.client.ok_or_else(|| {
                    RcptError::Config("the llm strategy needs a completion client".to_string())
                })?;
                Arc::new(LlmStrategy::new(client))
            }
        };

        Ok(strategy)
    }
}

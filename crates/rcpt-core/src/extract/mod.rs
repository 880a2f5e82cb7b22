//! Receipt field extraction module.

mod entities;
pub mod layout;
pub mod llm;
pub mod ner;
pub mod rules;
mod strategy;
pub mod tagged;

pub use entities::EntityExtractor;
pub use layout::LayoutStrategy;
pub use llm::{CompletionClient, LlmStrategy};
pub use ner::{Entity, EntityCategory, EntityRecognizer, RuleBasedRecognizer};
pub use strategy::{ExtractionStrategy, StrategyBuilder, StrategyKind};
pub use tagged::{PassthroughDecoder, TagDecoder, TaggedStrategy};

use crate::error::ExtractionError;

/// Result type for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractionError>;

//! Core library for receipt field extraction.
//!
//! This crate provides:
//! - Date normalization for OCR'd receipt dates
//! - Total amount selection from receipt lines
//! - Entity-driven, layout, tagged-markup and LLM extraction strategies
//! - Receipt result and configuration models

pub mod error;
pub mod extract;
pub mod models;

pub use error::{AmountError, DateError, ExtractionError, RcptError, Result};
pub use extract::rules::{normalize_date, AmountExtractor, DateNormalizer};
pub use extract::{
    CompletionClient, EntityExtractor, EntityRecognizer, ExtractionStrategy, RuleBasedRecognizer,
    StrategyBuilder, StrategyKind, TagDecoder,
};
pub use models::config::RcptConfig;
pub use models::receipt::ExtractionResult;

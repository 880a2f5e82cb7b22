//! Error types for the rcpt-core library.

use thiserror::Error;

/// Main error type for the rcpt library.
#[derive(Error, Debug)]
pub enum RcptError {
    /// Receipt extraction error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised inside an extraction strategy.
///
/// These never cross [`crate::ExtractionStrategy::extract`]; the strategy
/// boundary logs them and falls back to a default result.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// The entity recognizer failed.
    #[error("entity recognition failed: {0}")]
    Recognizer(String),

    /// The model producing tag markup failed.
    #[error("tag decoding failed: {0}")]
    Decoder(String),

    /// The LLM completion call failed.
    #[error("completion request failed: {0}")]
    Completion(String),

    /// A model or LLM returned something we could not read.
    #[error("malformed model response: {0}")]
    MalformedResponse(String),
}

/// Why a raw date token could not be normalized.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateError {
    #[error("empty date token")]
    Empty,

    #[error("no known date format matches {0:?}")]
    NoMatchingFormat(String),
}

/// Why a numeric token was not accepted as an amount candidate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    /// The token is not a decimal number at all.
    #[error("not a number: {0:?}")]
    Unparseable(String),

    /// The value was never seen by the recognizer or the amount regex.
    #[error("{0} is not a known amount")]
    Unknown(String),

    /// A bare digit run too short to hold cents.
    #[error("digit run {0:?} is too short to repair")]
    TooShort(String),
}

/// Result type for the rcpt library.
pub type Result<T> = std::result::Result<T, RcptError>;

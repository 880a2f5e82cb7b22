//! CLI subcommands and the setup they share.

pub mod batch;
pub mod config;
pub mod process;

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use rcpt_core::extract::{ExtractionStrategy, RuleBasedRecognizer, StrategyBuilder, StrategyKind};
use rcpt_core::RcptConfig;

use crate::llm_client::OpenAiCompatClient;

/// Load the `--config` file, else the default config file if present, else defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<RcptConfig> {
    if let Some(path) = config_path {
        return Ok(RcptConfig::from_file(Path::new(path))?);
    }

    let default_path = config::default_config_path();
    if default_path.exists() {
        debug!("Using configuration at {}", default_path.display());
        Ok(RcptConfig::from_file(&default_path)?)
    } else {
        Ok(RcptConfig::default())
    }
}

/// Build the configured strategy with its runtime collaborators.
///
/// Must run off the async runtime: the LLM client is blocking.
pub fn build_strategy(config: &RcptConfig) -> anyhow::Result<Arc<dyn ExtractionStrategy>> {
    let mut builder = StrategyBuilder::new(config.extraction.clone());

    match config.extraction.strategy {
        StrategyKind::Rules => {
            let recognizer = RuleBasedRecognizer::from_config(&config.ner)?;
            builder = builder.recognizer(Arc::new(recognizer));
        }
        StrategyKind::Llm => {
            let client = OpenAiCompatClient::from_config(&config.llm)?;
            builder = builder.client(Arc::new(client));
        }
        StrategyKind::Layout | StrategyKind::Tagged => {}
    }

    Ok(builder.build()?)
}

//! Blocking client for OpenAI-compatible chat completion endpoints.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use rcpt_core::error::ExtractionError;
use rcpt_core::models::config::LlmConfig;
use rcpt_core::CompletionClient;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Completion client speaking the `/chat/completions` protocol.
///
/// Uses `reqwest::blocking`; it must be created, used and dropped outside
/// the async runtime (the CLI runs extraction on a blocking thread).
pub struct OpenAiCompatClient {
    http: reqwest::blocking::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiCompatClient {
    /// Build from configuration, reading the API key from the configured variable.
    pub fn from_config(config: &LlmConfig) -> anyhow::Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            anyhow::anyhow!(
                "{} is not set; the llm strategy needs an API key",
                config.api_key_env
            )
        })?;

        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

fn request_body<'a>(model: &'a str, prompt: &'a str) -> ChatRequest<'a> {
    ChatRequest {
        model,
        messages: vec![Message {
            role: "user",
            content: prompt,
        }],
        temperature: 0.0,
    }
}

fn first_choice(response: ChatResponse) -> Result<String, ExtractionError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| ExtractionError::MalformedResponse("no completion choices".to_string()))
}

impl CompletionClient for OpenAiCompatClient {
    fn complete(&self, prompt: &str) -> Result<String, ExtractionError> {
        let start = Instant::now();

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request_body(&self.model, prompt))
            .send()
            .map_err(|e| {
                warn!("Completion request failed: {}", e);
                ExtractionError::Completion(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().unwrap_or_default();
            warn!("Completion API returned {}: {}", status, error_text);
            return Err(ExtractionError::Completion(format!("{}: {}", status, error_text)));
        }

        let body: ChatResponse = response
            .json()
            .map_err(|e| ExtractionError::MalformedResponse(e.to_string()))?;

        debug!(
            "Completion from {} in {}ms",
            self.model,
            start.elapsed().as_millis()
        );

        first_choice(body)
    }
}

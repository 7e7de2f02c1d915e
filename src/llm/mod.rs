pub mod chat;

use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub completion_model: Option<String>,
    pub base_url: Option<String>,
    pub timeout: Duration,
}

/// Per-request generation settings sent alongside the message list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
    pub json_output: bool,
}

impl GenerationParams {
    pub const fn new(max_tokens: u32, temperature: f32) -> Self {
        Self { max_tokens, temperature, json_output: false }
    }

    pub fn with_json_output(mut self, json_output: bool) -> Self {
        self.json_output = json_output;
        self
    }
}

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("request to completion service failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("completion service returned {status}: {body}")]
    Status {
        status: u16,
        body: String,
    },
    #[error("completion service returned no choices")]
    EmptyChoices,
    #[error("completion service returned a choice without content")]
    EmptyContent,
    #[error("invalid API key format: {0}")]
    InvalidApiKey(String),
}

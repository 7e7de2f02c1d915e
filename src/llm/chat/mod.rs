pub mod openai;

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use super::{ GenerationParams, LlmConfig, UpstreamError };
use crate::models::chat::ChatMessage;
use self::openai::OpenAIChatClient;

#[derive(Deserialize, Debug, Clone)]
pub struct CompletionResponse {
    pub response: String,
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Sends the whole message list and returns the text of the first choice.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: &GenerationParams
    ) -> Result<CompletionResponse, UpstreamError>;

    fn get_model(&self) -> String;
    fn get_base_url(&self) -> Option<String>;
}

pub fn new_client(config: &LlmConfig) -> Result<Arc<dyn ChatClient>, UpstreamError> {
    let specific_client = OpenAIChatClient::from_config(config)?;
    Ok(Arc::new(specific_client))
}

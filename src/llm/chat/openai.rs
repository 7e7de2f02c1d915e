use async_trait::async_trait;
use log::debug;
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION } };
use serde::{ Deserialize, Serialize };

use super::{ ChatClient, CompletionResponse };
use crate::llm::{ GenerationParams, LlmConfig, UpstreamError, DEFAULT_BASE_URL, DEFAULT_MODEL };
use crate::models::chat::ChatMessage;

pub struct OpenAIChatClient {
    http: HttpClient,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
struct OpenAIChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

#[derive(Deserialize)]
struct OpenAIMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAIChatClient {
    pub fn new(
        api_key: &str,
        model: Option<String>,
        base_url: Option<String>,
        timeout: std::time::Duration
    ) -> Result<Self, UpstreamError> {
        let chat_model = model.unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let api_url = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|e| UpstreamError::InvalidApiKey(e.to_string()))?
        );

        let http = HttpClient::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            model: chat_model,
            base_url: api_url,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, UpstreamError> {
        Self::new(
            &config.api_key,
            config.completion_model.clone(),
            config.base_url.clone(),
            config.timeout,
        )
    }

    fn completions_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/chat/completions") {
            base.to_string()
        } else if base.ends_with("/v1") {
            format!("{}/chat/completions", base)
        } else {
            format!("{}/v1/chat/completions", base)
        }
    }
}

#[async_trait]
impl ChatClient for OpenAIChatClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: &GenerationParams
    ) -> Result<CompletionResponse, UpstreamError> {
        let url = self.completions_url();

        let req = OpenAIChatRequest {
            model: &self.model,
            messages,
            temperature: params.temperature,
            max_tokens: params.max_tokens,
            response_format: params.json_output.then_some(ResponseFormat {
                format_type: "json_object",
            }),
        };

        let resp = self.http.post(&url).json(&req).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(UpstreamError::Status { status: status.as_u16(), body });
        }

        let parsed = resp.json::<OpenAIResponse>().await?;
        let content = parsed.choices
            .into_iter()
            .next()
            .ok_or(UpstreamError::EmptyChoices)?
            .message.content
            .ok_or(UpstreamError::EmptyContent)?;
        debug!("Received response from completion service: {}", content);

        Ok(CompletionResponse { response: content })
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }

    fn get_base_url(&self) -> Option<String> {
        Some(self.base_url.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::time::Duration;

    fn client_for(server: &MockServer) -> OpenAIChatClient {
        OpenAIChatClient::new(
            "sk-test",
            None,
            Some(server.base_url()),
            Duration::from_secs(5),
        ).unwrap()
    }

    #[tokio::test]
    async fn returns_first_choice_content() {
        let server = MockServer::start_async().await;
        let mock = server.mock_async(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .header("authorization", "Bearer sk-test")
                .body_contains("\"model\":\"gpt-4o-mini\"")
                .body_contains("\"max_tokens\":200")
                .body_contains("\"role\":\"system\"")
                .body_contains("hola");
            then.status(200).json_body(json!({
                "choices": [
                    { "message": { "role": "assistant", "content": "first" } },
                    { "message": { "role": "assistant", "content": "second" } }
                ]
            }));
        }).await;

        let client = client_for(&server);
        let messages = vec![ChatMessage::system("sys"), ChatMessage::user("hola")];
        let resp = client.complete(&messages, &GenerationParams::new(200, 0.7)).await.unwrap();

        mock.assert_async().await;
        assert_eq!(resp.response, "first");
    }

    #[tokio::test]
    async fn json_output_sets_response_format() {
        let server = MockServer::start_async().await;
        let mock = server.mock_async(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .body_contains("\"response_format\":{\"type\":\"json_object\"}");
            then.status(200).json_body(json!({
                "choices": [{ "message": { "content": "{}" } }]
            }));
        }).await;

        let client = client_for(&server);
        let params = GenerationParams::new(700, 0.7).with_json_output(true);
        client.complete(&[ChatMessage::user("x")], &params).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn error_status_is_upstream_error() {
        let server = MockServer::start_async().await;
        server.mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(429).body("quota exceeded");
        }).await;

        let client = client_for(&server);
        let err = client
            .complete(&[ChatMessage::user("x")], &GenerationParams::new(10, 0.7)).await
            .unwrap_err();
        match err {
            UpstreamError::Status { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body, "quota exceeded");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn empty_choices_is_upstream_error() {
        let server = MockServer::start_async().await;
        server.mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200).json_body(json!({ "choices": [] }));
        }).await;

        let client = client_for(&server);
        let err = client
            .complete(&[ChatMessage::user("x")], &GenerationParams::new(10, 0.7)).await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::EmptyChoices));
    }

    #[tokio::test]
    async fn null_content_is_upstream_error() {
        let server = MockServer::start_async().await;
        server.mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200).json_body(json!({
                "choices": [{ "message": { "role": "assistant", "content": null } }]
            }));
        }).await;

        let client = client_for(&server);
        let err = client
            .complete(&[ChatMessage::user("x")], &GenerationParams::new(10, 0.7)).await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::EmptyContent));
    }

    #[test]
    fn completions_url_accepts_common_base_forms() {
        let make = |base: &str| {
            OpenAIChatClient::new("k", None, Some(base.to_string()), Duration::from_secs(1))
                .unwrap()
                .completions_url()
        };
        assert_eq!(make("https://api.openai.com"), "https://api.openai.com/v1/chat/completions");
        assert_eq!(make("https://api.openai.com/v1/"), "https://api.openai.com/v1/chat/completions");
        assert_eq!(
            make("http://proxy/v1/chat/completions"),
            "http://proxy/v1/chat/completions"
        );
    }
}

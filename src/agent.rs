use crate::cli::Args;
use crate::config::prompt::{ self, Feature, PromptConfig, PromptError, CHAT_PARAMS };
use crate::format::{ self, ConjugationOutcome };
use crate::history::SessionStore;
use crate::llm::chat::{ ChatClient, new_client as new_chat_client };
use crate::llm::{ LlmConfig, UpstreamError };
use crate::models::chat::ChatMessage;

use log::{ debug, error, info };
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Missing or empty query in request")]
    EmptyQuery,
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error(transparent)]
    Prompt(#[from] PromptError),
}

pub struct TutorAgent {
    chat_client: Arc<dyn ChatClient>,
    prompt_config: Arc<PromptConfig>,
    sessions: SessionStore,
    structured_output: bool,
}

impl TutorAgent {
    pub fn new(args: &Args) -> Result<Self, Box<dyn Error + Send + Sync>> {
        if args.openai_api_key.trim().is_empty() {
            return Err("OPENAI_API_KEY is set but empty".into());
        }

        let chat_config = LlmConfig {
            api_key: args.openai_api_key.trim().to_string(),
            completion_model: Some(args.chat_model.clone()),
            base_url: Some(args.chat_base_url.clone()),
            timeout: Duration::from_secs(args.request_timeout_secs),
        };
        let chat_client = new_chat_client(&chat_config)?;
        info!(
            "Chat client configured: Model={}, BaseURL={}",
            chat_client.get_model(),
            chat_client.get_base_url().as_deref().unwrap_or("adapter default")
        );

        let prompt_config = prompt::load_prompts(args.prompts_path.as_deref())?;

        Ok(
            Self::with_client(
                chat_client,
                prompt_config,
                args.max_history as usize,
                args.max_sessions as usize,
                args.structured_output
            )
        )
    }

    pub fn with_client(
        chat_client: Arc<dyn ChatClient>,
        prompt_config: Arc<PromptConfig>,
        max_history: usize,
        max_sessions: usize,
        structured_output: bool
    ) -> Self {
        let sessions = SessionStore::new(
            prompt_config.chat_system.clone(),
            max_history,
            max_sessions
        );
        Self {
            chat_client,
            prompt_config,
            sessions,
            structured_output,
        }
    }

    pub fn model(&self) -> String {
        self.chat_client.get_model()
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    async fn complete_feature(&self, feature: Feature, input: &str) -> Result<String, AgentError> {
        debug!("Received {} request: {}", feature.key(), input);
        let messages = self.prompt_config.build_messages(feature, input)?;
        let mut params = feature.params();
        if feature == Feature::Conjugate {
            params = params.with_json_output(self.structured_output);
        }

        let resp = self.chat_client.complete(&messages, &params).await.map_err(|e| {
            error!("{} request failed: {}", feature.key(), e);
            e
        })?;
        Ok(resp.response)
    }

    /// Correction, definition and translation: trimmed text of the completion.
    pub async fn answer(&self, feature: Feature, input: &str) -> Result<String, AgentError> {
        let generated = self.complete_feature(feature, input).await?;
        Ok(format::plain_text(&generated))
    }

    pub async fn conjugate(&self, verb: &str) -> Result<ConjugationOutcome, AgentError> {
        let generated = self.complete_feature(Feature::Conjugate, verb).await?;
        debug!("Extracted content: {}", generated);
        Ok(format::conjugation(&generated))
    }

    /// One chat turn. The session lock is held from the user append through the
    /// assistant append, so concurrent turns on one session run one at a time.
    /// A failed upstream call leaves the user message in place.
    pub async fn chat(&self, session_id: &str, query: &str) -> Result<String, AgentError> {
        let query = query.trim();
        if query.is_empty() {
            debug!("Received empty query.");
            return Err(AgentError::EmptyQuery);
        }

        let history = self.sessions.session(session_id).await;
        let mut history = history.lock().await;

        history.append(ChatMessage::user(query));
        debug!("Appended user message: {}", query);
        history.prune();

        let messages = history.snapshot();
        debug!(
            "Messages sent to completion service: {}",
            serde_json::to_string(&messages).unwrap_or_default()
        );

        let resp = self.chat_client.complete(&messages, &CHAT_PARAMS).await.map_err(|e| {
            error!("Error communicating with completion service: {}", e);
            e
        })?;
        let assistant_message = format::plain_text(&resp.response);
        debug!("Assistant response: {}", assistant_message);

        history.append(ChatMessage::assistant(assistant_message.clone()));
        Ok(assistant_message)
    }

    pub async fn reset_conversation(&self, session_id: &str) {
        self.sessions.reset(session_id).await;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::llm::chat::CompletionResponse;
    use crate::llm::GenerationParams;
    use crate::history::DEFAULT_MAX_SESSIONS;
    use crate::models::chat::Role;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    /// Replays scripted replies and records every request it receives.
    #[derive(Default)]
    pub struct ScriptedClient {
        replies: StdMutex<VecDeque<Result<String, u16>>>,
        pub calls: StdMutex<Vec<(Vec<ChatMessage>, GenerationParams)>>,
    }

    impl ScriptedClient {
        pub fn replying(replies: &[&str]) -> Self {
            let client = Self::default();
            client.replies
                .lock()
                .unwrap()
                .extend(replies.iter().map(|r| Ok(r.to_string())));
            client
        }

        pub fn push_failure(&self, status: u16) {
            self.replies.lock().unwrap().push_back(Err(status));
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        pub fn last_call(&self) -> (Vec<ChatMessage>, GenerationParams) {
            self.calls.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl ChatClient for ScriptedClient {
        async fn complete(
            &self,
            messages: &[ChatMessage],
            params: &GenerationParams
        ) -> Result<CompletionResponse, UpstreamError> {
            self.calls.lock().unwrap().push((messages.to_vec(), *params));
            match self.replies.lock().unwrap().pop_front() {
                Some(Ok(text)) => Ok(CompletionResponse { response: text }),
                Some(Err(status)) =>
                    Err(UpstreamError::Status { status, body: "scripted failure".into() }),
                None => Ok(CompletionResponse { response: "ok".into() }),
            }
        }

        fn get_model(&self) -> String {
            "scripted".into()
        }

        fn get_base_url(&self) -> Option<String> {
            None
        }
    }

    pub fn agent_with(client: Arc<ScriptedClient>, structured_output: bool) -> TutorAgent {
        TutorAgent::with_client(
            client,
            prompt::builtin_prompts().unwrap(),
            3,
            DEFAULT_MAX_SESSIONS,
            structured_output
        )
    }

    #[tokio::test]
    async fn answer_trims_and_uses_feature_params() {
        let client = Arc::new(ScriptedClient::replying(&["  Tengo hambre.\n"]));
        let agent = agent_with(client.clone(), true);

        let result = agent.answer(Feature::Assist, "Yo tiene hambre").await.unwrap();
        assert_eq!(result, "Tengo hambre.");

        let (messages, params) = client.last_call();
        assert_eq!(messages.len(), 2);
        assert!(messages[1].content.contains("Yo tiene hambre"));
        assert_eq!(params, GenerationParams::new(900, 0.7));
    }

    #[tokio::test]
    async fn conjugate_requests_json_only_when_enabled() {
        let client = Arc::new(ScriptedClient::replying(&["{}", "{}"]));
        agent_with(client.clone(), true).conjugate("hablar").await.unwrap();
        assert!(client.last_call().1.json_output);

        agent_with(client.clone(), false).conjugate("hablar").await.unwrap();
        assert!(!client.last_call().1.json_output);
        assert_eq!(client.last_call().1.max_tokens, 700);
    }

    #[tokio::test]
    async fn chat_sends_pruned_history() {
        let client = Arc::new(ScriptedClient::replying(&["A1", "A2", "A3", "A4"]));
        let agent = agent_with(client.clone(), true);

        for q in ["Q1", "Q2", "Q3", "Q4"] {
            agent.chat("s", q).await.unwrap();
        }

        let (sent, params) = client.last_call();
        assert_eq!(params.max_tokens, 500);
        assert_eq!(sent[0].role, Role::System);
        let users: Vec<_> = sent
            .iter()
            .filter(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(users, vec!["Q2", "Q3", "Q4"]);
        assert_eq!(sent.last(), Some(&ChatMessage::user("Q4")));

        let history = agent.sessions().session("s").await;
        assert_eq!(history.lock().await.messages().last(), Some(&ChatMessage::assistant("A4")));
    }

    #[tokio::test]
    async fn chat_rejects_blank_query_without_touching_history() {
        let client = Arc::new(ScriptedClient::default());
        let agent = agent_with(client.clone(), true);

        let err = agent.chat("s", "   ").await.unwrap_err();
        assert!(matches!(err, AgentError::EmptyQuery));
        assert_eq!(client.call_count(), 0);
        let history = agent.sessions().session("s").await;
        assert_eq!(history.lock().await.messages().len(), 1);
    }

    #[tokio::test]
    async fn failed_turn_leaves_dangling_user_message() {
        let client = Arc::new(ScriptedClient::default());
        client.push_failure(500);
        let agent = agent_with(client.clone(), true);

        let err = agent.chat("s", "hola").await.unwrap_err();
        assert!(matches!(err, AgentError::Upstream(_)));

        let history = agent.sessions().session("s").await;
        assert_eq!(history.lock().await.messages().last(), Some(&ChatMessage::user("hola")));
    }

    #[tokio::test]
    async fn concurrent_turns_stay_paired() {
        let client = Arc::new(ScriptedClient::default());
        let agent = Arc::new(agent_with(client.clone(), true));

        let mut handles = Vec::new();
        for n in 0..8 {
            let agent = agent.clone();
            handles.push(tokio::spawn(async move { agent.chat("s", &format!("Q{}", n)).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let history = agent.sessions().session("s").await;
        let history = history.lock().await;
        let messages = history.messages();
        assert_eq!(messages.len(), 1 + 3 * 2);
        for pair in messages[1..].chunks(2) {
            assert_eq!(pair[0].role, Role::User);
            assert_eq!(pair[1].role, Role::Assistant);
        }
    }
}

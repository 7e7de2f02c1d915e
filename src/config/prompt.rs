use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::sync::Arc;
use thiserror::Error;
use log::info;

use crate::llm::GenerationParams;
use crate::models::chat::ChatMessage;

const BUILTIN_PROMPTS: &str = include_str!("../../json/prompts.json");
const INPUT_PLACEHOLDER: &str = "{input}";

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Prompt template '{0}' not found")]
    TemplateNotFound(String),
    #[error("Prompt file IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Prompt JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// One-shot features: a fixed persona plus one templated user message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    Assist,
    Conjugate,
    Define,
    TranslateToSpanish,
    TranslateToEnglish,
}

impl Feature {
    pub const ALL: [Feature; 5] = [
        Feature::Assist,
        Feature::Conjugate,
        Feature::Define,
        Feature::TranslateToSpanish,
        Feature::TranslateToEnglish,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Feature::Assist => "assist",
            Feature::Conjugate => "conjugate",
            Feature::Define => "define",
            Feature::TranslateToSpanish => "translate_to_spanish",
            Feature::TranslateToEnglish => "translate_to_english",
        }
    }

    pub fn params(&self) -> GenerationParams {
        match self {
            Feature::Assist => GenerationParams::new(900, 0.7),
            Feature::Conjugate => GenerationParams::new(700, 0.7),
            Feature::Define => GenerationParams::new(200, 0.7),
            Feature::TranslateToSpanish | Feature::TranslateToEnglish =>
                GenerationParams::new(900, 0.7),
        }
    }
}

pub const CHAT_PARAMS: GenerationParams = GenerationParams::new(500, 0.7);

#[derive(Deserialize, Debug, Clone)]
pub struct FeatureTemplate {
    pub system: String,
    pub user: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct PromptConfig {
    pub chat_system: String,
    pub features: HashMap<String, FeatureTemplate>,
}

impl PromptConfig {
    fn validate(&self) -> Result<(), PromptError> {
        for feature in Feature::ALL {
            if !self.features.contains_key(feature.key()) {
                return Err(PromptError::TemplateNotFound(format!("features:{}", feature.key())));
            }
        }
        Ok(())
    }

    fn template(&self, feature: Feature) -> Result<&FeatureTemplate, PromptError> {
        self.features
            .get(feature.key())
            .ok_or_else(|| PromptError::TemplateNotFound(format!("features:{}", feature.key())))
    }

    /// The system + user pair for `feature`, with `input` placed verbatim.
    pub fn build_messages(
        &self,
        feature: Feature,
        input: &str
    ) -> Result<Vec<ChatMessage>, PromptError> {
        let template = self.template(feature)?;
        Ok(vec![
            ChatMessage::system(template.system.clone()),
            ChatMessage::user(template.user.replacen(INPUT_PLACEHOLDER, input, 1))
        ])
    }
}

fn parse_prompts(content: &str) -> Result<PromptConfig, PromptError> {
    let config: PromptConfig = serde_json::from_str(content)?;
    config.validate()?;
    Ok(config)
}

pub fn builtin_prompts() -> Result<Arc<PromptConfig>, PromptError> {
    Ok(Arc::new(parse_prompts(BUILTIN_PROMPTS)?))
}

pub fn load_prompts(path: Option<&str>) -> Result<Arc<PromptConfig>, PromptError> {
    match path {
        Some(path) => {
            let file_content = fs::read_to_string(path)?;
            let config = parse_prompts(&file_content)?;
            info!("Loaded prompt templates from: {}", path);
            Ok(Arc::new(config))
        }
        None => builtin_prompts(),
    }
}

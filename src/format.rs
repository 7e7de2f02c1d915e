use log::{ debug, error };
use serde_json::Value as JsonValue;

use crate::models::api::StructuredFallback;
use crate::models::conjugation::ConjugationTable;

pub fn plain_text(generated: &str) -> String {
    generated.trim().to_string()
}

/// Outcome of scanning generated text for an embedded JSON object.
#[derive(Debug)]
pub enum StructuredContent {
    Parsed(JsonValue),
    NoMatch,
    Malformed(serde_json::Error),
}

/// Greedy span from the first `{` to the last `}`.
fn json_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

pub fn extract_json(text: &str) -> StructuredContent {
    match json_span(text) {
        None => StructuredContent::NoMatch,
        Some(span) => {
            debug!("Extracted JSON content: {}", span);
            match serde_json::from_str::<JsonValue>(span) {
                Ok(value) => StructuredContent::Parsed(value),
                Err(e) => StructuredContent::Malformed(e),
            }
        }
    }
}

#[derive(Debug)]
pub enum ConjugationOutcome {
    Table(ConjugationTable),
    NoStructuredContent {
        raw: String,
    },
    MalformedStructuredContent {
        raw: String,
        reason: String,
    },
    UnexpectedShape {
        raw: String,
        reason: String,
    },
}

impl ConjugationOutcome {
    pub fn error_message(&self) -> Option<&'static str> {
        match self {
            ConjugationOutcome::Table(_) => None,
            ConjugationOutcome::NoStructuredContent { .. } =>
                Some("No JSON content found in the response"),
            ConjugationOutcome::MalformedStructuredContent { .. } =>
                Some("Failed to parse conjugations"),
            ConjugationOutcome::UnexpectedShape { .. } =>
                Some("Conjugation data did not match the expected tenses and pronouns"),
        }
    }

    /// Splits into the table or the `{error, raw_response}` body shown instead.
    pub fn into_result(self) -> Result<ConjugationTable, StructuredFallback> {
        let error = self.error_message().unwrap_or_default().to_string();
        match self {
            ConjugationOutcome::Table(table) => Ok(table),
            | ConjugationOutcome::NoStructuredContent { raw }
            | ConjugationOutcome::MalformedStructuredContent { raw, .. }
            | ConjugationOutcome::UnexpectedShape { raw, .. } =>
                Err(StructuredFallback { error, raw_response: raw }),
        }
    }
}

pub fn conjugation(generated: &str) -> ConjugationOutcome {
    let raw = plain_text(generated);
    match extract_json(&raw) {
        StructuredContent::NoMatch => {
            error!("No JSON content found in the response");
            ConjugationOutcome::NoStructuredContent { raw }
        }
        StructuredContent::Malformed(e) => {
            error!("JSON decode error: {}", e);
            ConjugationOutcome::MalformedStructuredContent { raw, reason: e.to_string() }
        }
        StructuredContent::Parsed(value) =>
            match ConjugationTable::try_from(value) {
                Ok(table) => {
                    debug!("Parsed conjugations: {:?}", table);
                    ConjugationOutcome::Table(table)
                }
                Err(e) => {
                    error!("Conjugation data failed validation: {}", e);
                    ConjugationOutcome::UnexpectedShape { raw, reason: e.to_string() }
                }
            }
    }
}

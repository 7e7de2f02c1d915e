use axum::{ http::StatusCode, response::{ IntoResponse, Response }, Json };
use log::error;
use thiserror::Error;

use crate::agent::AgentError;
use crate::config::prompt::PromptError;
use crate::llm::UpstreamError;
use crate::models::api::ErrorResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("Failed to get response from assistant: {0}")]
    Upstream(#[from] UpstreamError),
    #[error("An unexpected error occurred: {0}")]
    Internal(String),
}

impl From<PromptError> for ApiError {
    fn from(err: PromptError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<AgentError> for ApiError {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::EmptyQuery => ApiError::BadRequest(AgentError::EmptyQuery.to_string()),
            AgentError::Upstream(e) => ApiError::Upstream(e),
            AgentError::Prompt(e) => e.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(message) =>
                (StatusCode::BAD_REQUEST, ErrorResponse { error: message, details: None }),
            ApiError::Upstream(e) => {
                error!("Error communicating with completion service: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        error: "Failed to get response from assistant".into(),
                        details: Some(e.to_string()),
                    },
                )
            }
            ApiError::Internal(details) => {
                error!("Unexpected error: {}", details);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        error: "An unexpected error occurred".into(),
                        details: Some(details),
                    },
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

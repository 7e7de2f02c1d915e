use serde::{ Serialize, Deserialize };

#[derive(Deserialize, Debug, Default)]
pub struct TextRequest {
    #[serde(default)]
    pub text: String,
}

#[derive(Deserialize, Debug, Default)]
pub struct VerbRequest {
    #[serde(default)]
    pub verb: String,
}

#[derive(Deserialize, Debug, Default)]
pub struct WordRequest {
    #[serde(default)]
    pub word: String,
}

#[derive(Deserialize, Debug, Default)]
pub struct ChatRequest {
    pub query: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct ResultResponse<T: Serialize> {
    pub result: T,
}

#[derive(Serialize, Debug)]
pub struct StructuredFallback {
    pub error: String,
    pub raw_response: String,
}

#[derive(Serialize, Debug)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model: String,
}

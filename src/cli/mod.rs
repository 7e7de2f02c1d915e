use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Completion Service Args ---
    /// API key for the completion service. Required.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: String,

    /// Model name for chat completion (e.g., gpt-4o-mini, gpt-4o)
    #[arg(long, env = "CHAT_MODEL", default_value = "gpt-4o-mini")]
    pub chat_model: String,

    /// Base URL for the completion service API
    #[arg(long, env = "CHAT_BASE_URL", default_value = "https://api.openai.com")]
    pub chat_base_url: String,

    /// Timeout in seconds for a single completion request
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "60")]
    pub request_timeout_secs: u64,

    /// Ask the completion service for JSON-object output on conjugation requests
    #[arg(
        long,
        env = "STRUCTURED_OUTPUT",
        default_value = "true",
        action = clap::ArgAction::Set
    )]
    pub structured_output: bool,

    // --- Conversation Args ---
    /// Number of user messages kept in the chat conversation
    #[arg(
        long,
        env = "MAX_HISTORY",
        default_value = "3",
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    pub max_history: u16,

    /// Maximum number of chat sessions kept in memory; the least recently used is dropped first
    #[arg(
        long,
        env = "MAX_SESSIONS",
        default_value = "1000",
        value_parser = clap::value_parser!(u32).range(2..)
    )]
    pub max_sessions: u32,

    /// Optional JSON file replacing the built-in prompt templates
    #[arg(long, env = "PROMPTS_PATH")]
    pub prompts_path: Option<String>,

    // --- General App Args ---
    /// Host address and port for the HTTP server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "0.0.0.0:5000")]
    pub server_addr: String,

    /// Enable debug logging/output
    #[arg(long, env = "DEBUG", default_value = "false")]
    pub debug: bool,

    /// Optional path to the TLS certificate file (PEM format) for enabling HTTPS. Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Optional path to the TLS private key file (PEM format) for enabling HTTPS. Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,

    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,
}

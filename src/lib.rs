pub mod agent;
pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod history;
pub mod llm;
pub mod models;
pub mod server;

use agent::TutorAgent;
use cli::Args;
use log::info;
use server::Server;
use std::error::Error;
use std::sync::Arc;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("Chat Model: {}", args.chat_model);
    info!("Chat Base URL: {}", args.chat_base_url);
    info!("Request Timeout: {}s", args.request_timeout_secs);
    info!("Max History: {} user messages", args.max_history);
    info!("Max Sessions: {}", args.max_sessions);
    info!("Structured Output: {}", args.structured_output);
    info!("Prompts Path: {}", args.prompts_path.as_deref().unwrap_or("built-in"));
    info!("TLS Enabled: {}", args.enable_tls);
    info!("-------------------------");

    let agent = Arc::new(TutorAgent::new(&args)?);
    let server = Server::new(agent, args);
    server.run().await?;

    Ok(())
}

pub mod api;

use crate::agent::TutorAgent;
use crate::cli::Args;
use std::error::Error;
use std::sync::Arc;

pub struct Server {
    agent: Arc<TutorAgent>,
    args: Args,
}

impl Server {
    pub fn new(agent: Arc<TutorAgent>, args: Args) -> Self {
        Self { agent, args }
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        api::start_http_server(&self.args, self.agent.clone()).await
    }
}

use clap::Args;

use crate::process::spawn_service;
use crate::state::AppState;

#[derive(Args, Debug, Clone)]
pub struct Serve {
    /// Override the configured listen port
    #[arg(long)]
    pub listen_port: Option<u16>,

    /// Override the configured log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("state error: {0}")]
    StateError(#[from] crate::state::StateError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Serve {
    type Error = ServeError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut state = AppState::load(ctx.config_path.clone())?;

        if let Some(port) = self.listen_port {
            state.config.listen_port = port;
        }
        if let Some(level) = &self.log_level {
            state.config.log_level = level.clone();
        }

        let service_config = state.config.service_config()?;
        spawn_service(&service_config, state.config.log_dir.as_deref()).await;
        Ok("service ended".to_string())
    }
}

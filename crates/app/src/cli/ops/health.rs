use clap::Args;

use crate::state::AppState;

#[derive(Args, Debug, Clone)]
pub struct Health;

#[derive(Debug, thiserror::Error)]
pub enum HealthError {
    #[error("Health check failed: {0}")]
    Failed(String),
}

impl From<reqwest::Error> for HealthError {
    fn from(err: reqwest::Error) -> Self {
        HealthError::Failed(err.to_string())
    }
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Health {
    type Error = HealthError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut lines = Vec::new();

        lines.push("Config:".to_string());
        match AppState::load(ctx.config_path.clone()) {
            Ok(state) => {
                lines.push(format!("  directory:   {}", state.app_dir.display()));
                lines.push("  config.toml: OK".to_string());
                lines.push(format!("  listen_port: {}", state.config.listen_port));
                lines.push(format!("  environment: {:?}", state.config.environment));
            }
            Err(e) => {
                lines.push(format!("  error: {}", e));
            }
        }

        let base = ctx
            .remote
            .as_ref()
            .ok_or_else(|| HealthError::Failed("no daemon address".to_string()))?;
        let client = reqwest::Client::builder().build()?;

        lines.push(String::new());
        lines.push(format!("Daemon ({}):", base));

        for probe in ["livez", "readyz"] {
            let url = format!("{}/_status/{}", base.as_str().trim_end_matches('/'), probe);
            let line = match client.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => format!("  {probe}: OK"),
                Ok(resp) => format!("  {probe}: UNHEALTHY ({})", resp.status()),
                Err(_) => format!("  {probe}: NOT REACHABLE"),
            };
            lines.push(line);
        }

        Ok(lines.join("\n"))
    }
}

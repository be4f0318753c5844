use std::path::PathBuf;

use clap::{Args, ValueEnum};
use url::Url;

use object_store::ObjectStoreConfig;
use service::Environment;

use crate::state::{AppConfig, AppState};

/// Secret store backend for CLI selection
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum StoreType {
    /// In-memory store, lost on restart
    #[default]
    Memory,
    /// S3-compatible object storage
    S3,
}

/// Timing profile for CLI selection
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum EnvironmentType {
    #[default]
    Production,
    Beta,
}

impl From<EnvironmentType> for Environment {
    fn from(value: EnvironmentType) -> Self {
        match value {
            EnvironmentType::Production => Environment::Production,
            EnvironmentType::Beta => Environment::Beta,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// API server listen port
    #[arg(long, default_value_t = 3000)]
    pub listen_port: u16,

    /// Timing profile for unlocks
    #[arg(long, value_enum, default_value_t = EnvironmentType::Production)]
    pub environment: EnvironmentType,

    /// Client URL that invite links point at
    #[arg(long)]
    pub base_url: Option<Url>,

    /// Directory for daily rotated log files
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Secret store backend
    #[arg(long, value_enum, default_value_t = StoreType::Memory)]
    pub store: StoreType,

    /// S3 endpoint URL (required for --store s3)
    #[arg(long)]
    pub s3_endpoint: Option<String>,

    /// S3 bucket name (required for --store s3)
    #[arg(long)]
    pub s3_bucket: Option<String>,

    /// S3 access key (can also use SHAREDSECRET_S3_ACCESS_KEY env var)
    #[arg(long, env = "SHAREDSECRET_S3_ACCESS_KEY")]
    pub s3_access_key: Option<String>,

    /// S3 secret key (can also use SHAREDSECRET_S3_SECRET_KEY env var)
    #[arg(long, env = "SHAREDSECRET_S3_SECRET_KEY")]
    pub s3_secret_key: Option<String>,

    /// S3 region (optional, defaults to us-east-1)
    #[arg(long)]
    pub s3_region: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    StateFailed(#[from] crate::state::StateError),

    #[error("missing required S3 configuration: {0}")]
    MissingS3Config(String),
}

impl Init {
    fn store_config(&self) -> Result<ObjectStoreConfig, InitError> {
        match self.store {
            StoreType::Memory => Ok(ObjectStoreConfig::Memory),
            StoreType::S3 => {
                let endpoint = self
                    .s3_endpoint
                    .clone()
                    .ok_or_else(|| InitError::MissingS3Config("--s3-endpoint".to_string()))?;
                let bucket = self
                    .s3_bucket
                    .clone()
                    .ok_or_else(|| InitError::MissingS3Config("--s3-bucket".to_string()))?;
                let access_key = self.s3_access_key.clone().ok_or_else(|| {
                    InitError::MissingS3Config(
                        "--s3-access-key or SHAREDSECRET_S3_ACCESS_KEY".to_string(),
                    )
                })?;
                let secret_key = self.s3_secret_key.clone().ok_or_else(|| {
                    InitError::MissingS3Config(
                        "--s3-secret-key or SHAREDSECRET_S3_SECRET_KEY".to_string(),
                    )
                })?;

                Ok(ObjectStoreConfig::S3 {
                    endpoint,
                    access_key,
                    secret_key,
                    bucket,
                    region: self.s3_region.clone(),
                })
            }
        }
    }
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut config = AppConfig {
            listen_port: self.listen_port,
            environment: self.environment.into(),
            log_dir: self.log_dir.clone(),
            store: self.store_config()?,
            ..Default::default()
        };
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }

        let state = AppState::init(ctx.config_path.clone(), Some(config))?;

        let store = match &state.config.store {
            ObjectStoreConfig::Memory => "memory".to_string(),
            ObjectStoreConfig::S3 {
                endpoint, bucket, ..
            } => format!("s3 ({}/{})", endpoint, bucket),
        };

        let output = format!(
            "Initialized sharedsecret directory at: {}\n\
             - Config: {}\n\
             - Listen port: {}\n\
             - Environment: {:?}\n\
             - Invite links: {}\n\
             - Store: {}",
            state.app_dir.display(),
            state.config_path.display(),
            state.config.listen_port,
            state.config.environment,
            state.config.base_url,
            store
        );

        Ok(output)
    }
}

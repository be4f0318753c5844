use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use std::fs;

use serde::{Deserialize, Serialize};
use url::Url;

use object_store::ObjectStoreConfig;
use service::config::default_base_url;
use service::{Config as ServiceConfig, Environment, NotifierConfig, PaymentsConfig};

pub const APP_NAME: &str = "sharedsecret";
pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Port for the API server
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
    /// Timing profile for the unlock protocol
    #[serde(default)]
    pub environment: Environment,
    /// Overrides the environment's unlock quarantine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlock_quarantine_secs: Option<u64>,
    /// Overrides the environment's unlock timeout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlock_timeout_secs: Option<u64>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Directory for log files (logs to stdout only if not set)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
    /// Client URL that invite links point at
    #[serde(default = "default_base_url")]
    pub base_url: Url,

    #[serde(default)]
    pub store: ObjectStoreConfig,
    #[serde(default)]
    pub payments: PaymentsConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
}

fn default_listen_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_port: default_listen_port(),
            environment: Environment::default(),
            unlock_quarantine_secs: None,
            unlock_timeout_secs: None,
            log_level: default_log_level(),
            log_dir: None,
            base_url: default_base_url(),
            store: ObjectStoreConfig::default(),
            payments: PaymentsConfig::default(),
            notifier: NotifierConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn log_level(&self) -> Result<tracing::Level, StateError> {
        tracing::Level::from_str(&self.log_level)
            .map_err(|_| StateError::InvalidLogLevel(self.log_level.clone()))
    }

    /// Everything the service needs to start.
    pub fn service_config(&self) -> Result<ServiceConfig, StateError> {
        Ok(ServiceConfig {
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), self.listen_port),
            environment: self.environment,
            unlock_quarantine: self.unlock_quarantine_secs.map(Duration::from_secs),
            unlock_timeout: self.unlock_timeout_secs.map(Duration::from_secs),
            base_url: self.base_url.clone(),
            store: self.store.clone(),
            payments: self.payments.clone(),
            notifier: self.notifier.clone(),
            log_level: self.log_level()?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the config directory (~/.sharedsecret)
    pub app_dir: PathBuf,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Loaded configuration
    pub config: AppConfig,
}

impl AppState {
    /// Get the config directory path (custom or default ~/.sharedsecret)
    pub fn app_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Initialize a new config directory
    pub fn init(
        custom_path: Option<PathBuf>,
        config: Option<AppConfig>,
    ) -> Result<Self, StateError> {
        let app_dir = Self::app_dir(custom_path)?;
        let config_path = app_dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            return Err(StateError::AlreadyInitialized);
        }
        fs::create_dir_all(&app_dir)?;

        let config = config.unwrap_or_default();
        // catch a bad level now rather than at startup
        config.log_level()?;
        let config_toml = toml::to_string_pretty(&config)?;
        fs::write(&config_path, config_toml)?;

        Ok(Self {
            app_dir,
            config_path,
            config,
        })
    }

    /// Load existing state from the config directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let app_dir = Self::app_dir(custom_path)?;
        let config_path = app_dir.join(CONFIG_FILE_NAME);

        if !app_dir.exists() {
            return Err(StateError::NotInitialized);
        }
        if !config_path.exists() {
            return Err(StateError::MissingFile(CONFIG_FILE_NAME.to_string()));
        }

        let config_toml = fs::read_to_string(&config_path)?;
        let config: AppConfig = toml::from_str(&config_toml)?;

        Ok(Self {
            app_dir,
            config_path,
            config,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("config directory not initialized. Run 'sharedsecretd init' first")]
    NotInitialized,

    #[error("config directory already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("missing required file: {0}")]
    MissingFile(String),

    #[error("invalid log level: {0}")]
    InvalidLogLevel(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

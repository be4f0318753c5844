use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use object_store::ObjectStoreConfig;

use crate::notify::DEFAULT_BASE_URL;
use crate::payments::PaymentOptions;

const DAY_MILLIS: i64 = 24 * 60 * 60 * 1000;

/// Which timing profile the escrow rules run under.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    #[default]
    Production,
    /// Minute-long quarantines, for exercising the unlock flow by hand.
    Beta,
}

/// Delays that gate the unlock protocol, in millis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// How long an unlock must sit before the secret is released.
    pub unlock_quarantine_millis: i64,
    /// How long an unlock blocks other caretakers from starting their own.
    pub unlock_timeout_millis: i64,
}

impl Timing {
    pub fn for_environment(environment: Environment) -> Self {
        match environment {
            Environment::Production => Self {
                unlock_quarantine_millis: 7 * DAY_MILLIS,
                unlock_timeout_millis: 30 * DAY_MILLIS,
            },
            Environment::Beta => Self {
                unlock_quarantine_millis: 60 * 1000,
                unlock_timeout_millis: 60 * 1000,
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaymentsConfig {
    #[default]
    Free,
    Coupon {
        #[serde(default)]
        options: PaymentOptions,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotifierConfig {
    #[default]
    Log,
    Webhook { url: Url },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// address for the API server to listen on
    pub listen_addr: SocketAddr,
    pub environment: Environment,
    // overrides for the environment's timing profile
    pub unlock_quarantine: Option<Duration>,
    pub unlock_timeout: Option<Duration>,
    /// where invite links point
    pub base_url: Url,

    pub store: ObjectStoreConfig,
    pub payments: PaymentsConfig,
    pub notifier: NotifierConfig,

    // misc
    pub log_level: tracing::Level,
}

impl Config {
    pub fn timing(&self) -> Timing {
        let mut timing = Timing::for_environment(self.environment);
        if let Some(quarantine) = self.unlock_quarantine {
            timing.unlock_quarantine_millis = quarantine.as_millis() as i64;
        }
        if let Some(timeout) = self.unlock_timeout {
            timing.unlock_timeout_millis = timeout.as_millis() as i64;
        }
        timing
    }
}

pub fn default_base_url() -> Url {
    Url::parse(DEFAULT_BASE_URL).expect("default base url is valid")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)), 3000),
            environment: Environment::Production,
            unlock_quarantine: None,
            unlock_timeout: None,
            base_url: default_base_url(),
            store: ObjectStoreConfig::default(),
            payments: PaymentsConfig::default(),
            notifier: NotifierConfig::default(),
            log_level: tracing::Level::INFO,
        }
    }
}

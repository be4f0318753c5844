use std::sync::Arc;

use url::Url;

use common::prelude::{
    verify_ownership, BuildInfo, OwnerKeyCandidate, OwnershipAssertion, OwnershipError, PublicKey,
};
use object_store::{ObjectStore, SecretStore, StoreError};

use super::clock::{Clock, SystemClock};
use super::config::{Config, NotifierConfig, PaymentsConfig, Timing};
use super::error::ServiceError;
use super::notify::{LogNotifier, Notifier, WebhookNotifier};
use super::payments::{CouponPayments, FreePayments, PaymentValidator};

/// Everything a request handler needs, shared read-only across requests.
#[derive(Debug, Clone)]
pub struct State {
    store: Arc<dyn SecretStore>,
    payments: Arc<dyn PaymentValidator>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    timing: Timing,
    base_url: Url,
    build_info: BuildInfo,
}

impl State {
    pub fn new(
        store: Arc<dyn SecretStore>,
        payments: Arc<dyn PaymentValidator>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        timing: Timing,
    ) -> Self {
        Self {
            store,
            payments,
            notifier,
            clock,
            timing,
            base_url: super::config::default_base_url(),
            build_info: BuildInfo::unknown(),
        }
    }

    pub async fn from_config(config: &Config) -> Result<Self, StateSetupError> {
        // 1. Setup the store
        tracing::info!("store backend: {:?}", config.store);
        let store: Arc<dyn SecretStore> = Arc::new(ObjectStore::new(config.store.clone()).await?);

        // 2. Setup payments, coupons are redeemed against the same store
        let payments: Arc<dyn PaymentValidator> = match &config.payments {
            PaymentsConfig::Free => {
                tracing::warn!("payments disabled, secrets are created for free");
                Arc::new(FreePayments)
            }
            PaymentsConfig::Coupon { options } => {
                Arc::new(CouponPayments::new(store.clone(), options.clone()))
            }
        };

        // 3. Setup notifications
        let notifier: Arc<dyn Notifier> = match &config.notifier {
            NotifierConfig::Log => Arc::new(LogNotifier),
            NotifierConfig::Webhook { url } => Arc::new(WebhookNotifier::new(url.clone())),
        };

        let timing = config.timing();
        tracing::info!(
            environment = ?config.environment,
            quarantine_ms = timing.unlock_quarantine_millis,
            timeout_ms = timing.unlock_timeout_millis,
            "unlock timing"
        );

        Ok(Self::new(store, payments, notifier, Arc::new(SystemClock), timing)
            .with_base_url(config.base_url.clone()))
    }

    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn with_build_info(mut self, build_info: BuildInfo) -> Self {
        self.build_info = build_info;
        self
    }

    pub fn store(&self) -> &dyn SecretStore {
        self.store.as_ref()
    }

    pub fn payments(&self) -> &dyn PaymentValidator {
        self.payments.as_ref()
    }

    pub fn notifier(&self) -> &dyn Notifier {
        self.notifier.as_ref()
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn build_info(&self) -> &BuildInfo {
        &self.build_info
    }

    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    /// Check the request's ownership proof against `candidates`, returning
    /// the key that signed it. Any failure reads as a missing resource.
    pub fn authenticate(
        &self,
        candidates: impl Into<OwnerKeyCandidate>,
        assertion: Option<&OwnershipAssertion>,
    ) -> Result<PublicKey, ServiceError> {
        verify_ownership(candidates, assertion, self.now_millis()).map_err(|e| {
            match e {
                OwnershipError::Missing => tracing::debug!("request without ownership proof"),
                e => tracing::info!(reason = %e, "ownership proof rejected"),
            }
            ServiceError::NotFound
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateSetupError {
    #[error("store setup error: {0}")]
    Store(#[from] StoreError),
}

//! Payment gating for secret creation and renewal.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use object_store::{SecretStore, StoreError};

/// How long one payment keeps a secret alive.
pub const PAYMENT_PERIOD_MILLIS: i64 = 366 * 24 * 60 * 60 * 1000;

pub const COUPON_PAYMENT_TYPE: &str = "CPN";

const COUPON_PREFIX: &str = "transactions/CPN/";

/// Payment details as sent by a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRequest {
    pub payment_type: String,
    pub token: String,
}

/// One way of paying, as advertised to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentOption {
    pub amount: f64,
    pub token: String,
}

pub type PaymentOptions = BTreeMap<String, PaymentOption>;

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("Invalid payment type")]
    InvalidType,
    #[error("Invalid coupon")]
    InvalidCoupon,
    #[error("payment processor unavailable: {0}")]
    Unavailable(String),
}

#[async_trait::async_trait]
pub trait PaymentValidator: std::fmt::Debug + Send + Sync {
    /// Check (and consume) a payment made for `secret_id`.
    async fn validate(
        &self,
        secret_id: &str,
        payment: Option<&PaymentRequest>,
    ) -> Result<(), PaymentError>;

    async fn options(&self) -> Result<PaymentOptions, PaymentError>;
}

/// The date a secret is paid up until after one more payment.
pub fn pay_date(current: Option<i64>, now_millis: i64) -> i64 {
    let start = match current {
        Some(current) if current >= now_millis => current,
        _ => now_millis,
    };
    start + PAYMENT_PERIOD_MILLIS
}

/// Accepts every payment, including none at all.
#[derive(Debug, Default, Clone)]
pub struct FreePayments;

#[async_trait::async_trait]
impl PaymentValidator for FreePayments {
    async fn validate(&self, secret_id: &str, _: Option<&PaymentRequest>) -> Result<(), PaymentError> {
        tracing::debug!(secret_id, "payments disabled, accepting");
        Ok(())
    }

    async fn options(&self) -> Result<PaymentOptions, PaymentError> {
        Ok(PaymentOptions::new())
    }
}

/// Single-use coupons. A coupon is redeemable while an object named
/// `transactions/CPN/<token>` exists in the store; redeeming deletes it.
#[derive(Debug, Clone)]
pub struct CouponPayments {
    store: Arc<dyn SecretStore>,
    options: PaymentOptions,
}

impl CouponPayments {
    pub fn new(store: Arc<dyn SecretStore>, options: PaymentOptions) -> Self {
        Self { store, options }
    }
}

fn is_coupon_token(token: &str) -> bool {
    !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[async_trait::async_trait]
impl PaymentValidator for CouponPayments {
    async fn validate(
        &self,
        secret_id: &str,
        payment: Option<&PaymentRequest>,
    ) -> Result<(), PaymentError> {
        let payment = payment.ok_or(PaymentError::InvalidType)?;
        if payment.payment_type != COUPON_PAYMENT_TYPE {
            return Err(PaymentError::InvalidType);
        }
        if !is_coupon_token(&payment.token) {
            return Err(PaymentError::InvalidCoupon);
        }

        let key = format!("{}{}", COUPON_PREFIX, payment.token);
        if let Err(e) = self.store.get_metadata(&key).await {
            if !matches!(e, StoreError::NotFound(_)) {
                tracing::warn!(secret_id, error = %e, "coupon lookup failed");
            }
            return Err(PaymentError::InvalidCoupon);
        }

        // redemption is best effort, a failed delete still counts as paid
        if let Err(e) = self.store.delete(&key).await {
            tracing::warn!(secret_id, key, error = %e, "failed to retire redeemed coupon");
        }
        tracing::info!(secret_id, "coupon redeemed");
        Ok(())
    }

    async fn options(&self) -> Result<PaymentOptions, PaymentError> {
        Ok(self.options.clone())
    }
}

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use common::model::is_valid_secret_id;
use common::prelude::{decode_bin, validate_signed, Envelope};

use super::{load_secret, payment_request, save_secret, MAX_DATA_BYTES, MAX_PUBLISH_DATA_LEN};
use crate::error::{Message, ServiceError};
use crate::http::{JsonBody, Ownership};
use crate::payments::pay_date;
use crate::request::{field, parse_digest, parse_public_key};
use crate::ServiceState;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSecretRequest {
    pub data: Option<String>,
    /// Rotates the owner key.
    pub public_key: Option<String>,
    pub data_key_digest: Option<String>,
    pub publish_data: Option<String>,
    pub payment_type: Option<String>,
    pub payment_token: Option<String>,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Path(secret_id): Path<String>,
    ownership: Ownership,
    JsonBody(req): JsonBody<UpdateSecretRequest>,
) -> Result<Response, ServiceError> {
    update_secret(&state, &secret_id, req, &ownership).await?;
    Ok(Json(Message::new("Secret Updated")).into_response())
}

/// Replace a secret's body, optionally renewing payment or rotating the
/// owner key. Any unlock in progress is cancelled.
pub async fn update_secret(
    state: &ServiceState,
    secret_id: &str,
    req: UpdateSecretRequest,
    ownership: &Ownership,
) -> Result<(), ServiceError> {
    if !is_valid_secret_id(secret_id) {
        return Err(ServiceError::Missing("Missing secret".to_string()));
    }

    let data_key_digest = match field(&req.data_key_digest) {
        Some(text) => Some(
            parse_digest(text)
                .ok_or_else(|| ServiceError::validation("Malformed dataKeyDigest field"))?,
        ),
        None => None,
    };

    let data_text = field(&req.data).ok_or_else(|| ServiceError::validation("Missing data"))?;
    let data = decode_bin(data_text).map_err(|_| ServiceError::NotFound)?;
    if data.len() > MAX_DATA_BYTES {
        return Err(ServiceError::validation("Data too big"));
    }

    let publish_data = field(&req.publish_data);
    if publish_data.is_some_and(|p| p.len() > MAX_PUBLISH_DATA_LEN) {
        return Err(ServiceError::validation("publishData field too long"));
    }

    if field(&req.payment_type).is_some() != field(&req.payment_token).is_some() {
        return Err(ServiceError::validation(
            "Both paymentType and paymentToken must be specified if one is specified",
        ));
    }

    let new_public_key = match field(&req.public_key) {
        Some(text) => Some(
            parse_public_key(text)
                .ok_or_else(|| ServiceError::validation("Malformed publicKey field"))?,
        ),
        None => None,
    };

    let mut secret = load_secret(state, secret_id).await?;
    state.authenticate(secret.public_key, ownership.assertion())?;

    if let Some(payment) = payment_request(&req.payment_type, &req.payment_token) {
        if let Err(e) = state.payments().validate(secret_id, Some(&payment)).await {
            tracing::warn!(secret_id, error = %e, "renewal payment rejected");
            return Err(ServiceError::validation("Invalid payment information"));
        }
        secret.pay_date = Some(pay_date(secret.pay_date, state.now_millis()));
    }

    let effective_key = new_public_key.unwrap_or(secret.public_key);
    if publish_data.is_some_and(|p| !validate_signed(p, &effective_key)) {
        return Err(ServiceError::validation("Invalid publishData field"));
    }

    let signed = Envelope::decode(&data).is_ok_and(|envelope| envelope.verify(&effective_key));
    if !signed {
        return Err(ServiceError::NotFound);
    }

    if let Some(digest) = data_key_digest {
        if secret.data_key_digest.is_some_and(|current| current != digest) {
            return Err(ServiceError::validation(
                "Can not change dataKeyDigest after set",
            ));
        }
        secret.data_key_digest = Some(digest);
    }
    if let Some(publish_data) = publish_data {
        secret.publish_data = Some(publish_data.to_string());
    }
    secret.clear_unlock();
    if new_public_key.is_some() {
        tracing::info!(secret_id, "rotating owner key");
    }
    secret.public_key = effective_key;

    save_secret(state, secret_id, &secret, Bytes::from(data)).await?;
    tracing::info!(secret_id, "secret updated");
    Ok(())
}

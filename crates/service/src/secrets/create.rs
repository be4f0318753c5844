use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use common::model::{generate_secret_id, SecretRecord};
use common::prelude::{decode_bin, validate_signed, Envelope};

use super::{payment_request, save_secret, MAX_DATA_BYTES, MAX_PUBLISH_DATA_LEN};
use crate::error::ServiceError;
use crate::http::JsonBody;
use crate::payments::pay_date;
use crate::request::{field, parse_digest, parse_public_key};
use crate::ServiceState;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSecretRequest {
    pub public_key: Option<String>,
    pub data: Option<String>,
    pub data_key_digest: Option<String>,
    pub publish_data: Option<String>,
    pub payment_type: Option<String>,
    pub payment_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSecretResponse {
    pub secret_id: String,
}

pub async fn handler(
    State(state): State<ServiceState>,
    JsonBody(req): JsonBody<CreateSecretRequest>,
) -> Result<Response, ServiceError> {
    let response = create_secret(&state, req).await?;
    Ok(Json(response).into_response())
}

pub async fn create_secret(
    state: &ServiceState,
    req: CreateSecretRequest,
) -> Result<CreateSecretResponse, ServiceError> {
    let public_key_text =
        field(&req.public_key).ok_or_else(|| ServiceError::validation("Missing publicKey"))?;
    let data_text = field(&req.data).ok_or_else(|| ServiceError::validation("Missing data"))?;

    let public_key = parse_public_key(public_key_text)
        .ok_or_else(|| ServiceError::validation("Malformed publicKey field"))?;

    let data_key_digest = match field(&req.data_key_digest) {
        Some(text) => Some(
            parse_digest(text)
                .ok_or_else(|| ServiceError::validation("Malformed dataKeyDigest field"))?,
        ),
        None => None,
    };

    let data = decode_bin(data_text).map_err(|_| ServiceError::validation("Data field invalid"))?;
    if data.len() > MAX_DATA_BYTES {
        return Err(ServiceError::validation("Data too big"));
    }

    let publish_data = field(&req.publish_data);
    if let Some(publish_data) = publish_data {
        if publish_data.len() > MAX_PUBLISH_DATA_LEN {
            return Err(ServiceError::validation("publishData field too long"));
        }
        if !validate_signed(publish_data, &public_key) {
            return Err(ServiceError::validation("publishData is invalid"));
        }
    }

    let secret_id = generate_secret_id();
    let payment = payment_request(&req.payment_type, &req.payment_token);
    if let Err(e) = state.payments().validate(&secret_id, payment.as_ref()).await {
        tracing::warn!(secret_id, error = %e, "payment rejected");
        return Err(ServiceError::validation("Invalid payment information"));
    }

    let signed = Envelope::decode(&data).is_ok_and(|envelope| envelope.verify(&public_key));
    if !signed {
        return Err(ServiceError::validation("Data field invalid"));
    }

    let mut record = SecretRecord::new(public_key, pay_date(None, state.now_millis()));
    record.data_key_digest = data_key_digest;
    record.publish_data = publish_data.map(str::to_string);

    let size = data.len();
    save_secret(state, &secret_id, &record, Bytes::from(data)).await?;
    tracing::info!(secret_id, size, "secret created");

    Ok(CreateSecretResponse { secret_id })
}

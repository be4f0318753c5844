use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use common::prelude::validate_signed;

use super::{
    load_caretaker, save_caretaker, validate_addresses, AddressInput, MAX_SMALL_FIELD_LEN,
};
use crate::error::{Message, ServiceError};
use crate::http::{JsonBody, Ownership};
use crate::request::{field, parse_digest, parse_public_key};
use crate::secrets::load_secret;
use crate::ServiceState;

/// Longest accepted `data` or `unlockData` text.
pub const MAX_CARETAKER_DATA_LEN: usize = 2000;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCaretakerRequest {
    pub addresses: Option<Vec<AddressInput>>,
    pub address_key_digest: Option<String>,
    pub public_key: Option<String>,
    pub secret_data: Option<String>,
    pub data: Option<String>,
    pub caretaker_data: Option<String>,
    pub unlock_public_key: Option<String>,
    pub unlock_data: Option<String>,
    pub unlock_signature: Option<String>,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Path((secret_id, caretaker_id)): Path<(String, String)>,
    ownership: Ownership,
    JsonBody(req): JsonBody<UpdateCaretakerRequest>,
) -> Result<Response, ServiceError> {
    update_caretaker(&state, &secret_id, &caretaker_id, req, &ownership).await?;
    Ok(Json(Message::new("Caretaker Updated")).into_response())
}

/// Accept an invitation, refresh a caretaker's fields, or nominate the
/// caretaker to receive an unlock.
pub async fn update_caretaker(
    state: &ServiceState,
    secret_id: &str,
    caretaker_id: &str,
    req: UpdateCaretakerRequest,
    ownership: &Ownership,
) -> Result<(), ServiceError> {
    let data = field(&req.data);
    if data.is_some_and(|d| d.len() > MAX_CARETAKER_DATA_LEN) {
        return Err(ServiceError::validation("data field more than 2000 bytes."));
    }
    let unlock_data = field(&req.unlock_data);
    if unlock_data.is_some_and(|d| d.len() > MAX_CARETAKER_DATA_LEN) {
        return Err(ServiceError::validation(
            "unlockData field more than 2000 bytes.",
        ));
    }
    let secret_data = field(&req.secret_data);
    if secret_data.is_some_and(|d| d.len() > MAX_SMALL_FIELD_LEN) {
        return Err(ServiceError::validation("secretData field too long"));
    }
    let caretaker_data = field(&req.caretaker_data);
    if caretaker_data.is_some_and(|d| d.len() > MAX_SMALL_FIELD_LEN) {
        return Err(ServiceError::validation("caretakerData field too long"));
    }
    let address_key_digest = match field(&req.address_key_digest) {
        Some(text) => Some(
            parse_digest(text)
                .ok_or_else(|| ServiceError::validation("addressKeyDigest invalid"))?,
        ),
        None => None,
    };
    let public_key = match field(&req.public_key) {
        Some(text) => Some(
            parse_public_key(text)
                .ok_or_else(|| ServiceError::validation("Malformed publicKey field"))?,
        ),
        None => None,
    };

    let mut record = load_caretaker(state, secret_id, caretaker_id).await?;
    let secret = load_secret(state, secret_id).await?;

    if let Some(secret_data) = secret_data {
        if !validate_signed(secret_data, &secret.public_key) {
            return Err(ServiceError::validation("Invalid secretData field"));
        }
        record.secret_data = Some(secret_data.to_string());
    }

    // the first key a caretaker presents is the one it keeps
    match (record.public_key, public_key) {
        (None, Some(key)) => record.public_key = Some(key),
        (Some(bound), Some(key)) if bound != key => {
            tracing::info!(secret_id, caretaker_id, "refusing to rebind caretaker key");
            return Err(ServiceError::NotFound);
        }
        _ => {}
    }

    state.authenticate(
        [Some(secret.public_key), record.public_key],
        ownership.assertion(),
    )?;

    if let Some(addresses) = &req.addresses {
        let address_key = record.public_key.unwrap_or(secret.public_key);
        let addresses = validate_addresses(&address_key, addresses)?;
        if address_key_digest.is_some() {
            record.address_key_digest = address_key_digest;
        }
        record.addresses = Some(addresses);
    }

    if let Some(data) = data {
        if !validate_signed(data, &secret.public_key) {
            return Err(ServiceError::validation("Invalid data field"));
        }
        record.data = Some(data.to_string());
    }

    if let Some(caretaker_data) = caretaker_data {
        let Some(caretaker_key) = record.public_key else {
            return Err(ServiceError::validation(
                "Can't set caretakerData without a publicKey",
            ));
        };
        if !validate_signed(caretaker_data, &caretaker_key) {
            return Err(ServiceError::validation("Invalid caretakerData field"));
        }
        record.caretaker_data = Some(caretaker_data.to_string());
    }

    match unlock_data {
        Some(unlock_data) => {
            let unlock_public_key = field(&req.unlock_public_key).and_then(parse_public_key);
            if unlock_public_key.is_none() || unlock_public_key != secret.unlock_public_key {
                return Err(ServiceError::validation("Wrong unlock public key used"));
            }
            let signed = record
                .public_key
                .is_some_and(|key| validate_signed(unlock_data, &key));
            if !signed {
                return Err(ServiceError::validation("Invalid unlockData field"));
            }
            record.unlock_data = Some(unlock_data.to_string());
            record.unlock_public_key = unlock_public_key;
        }
        None => {
            if field(&req.unlock_public_key).is_some() || field(&req.unlock_signature).is_some() {
                return Err(ServiceError::validation("Unlock fields without unlockData"));
            }
        }
    }

    save_caretaker(state, secret_id, caretaker_id, &record).await?;
    tracing::info!(
        secret_id,
        caretaker_id,
        accepted = record.is_accepted(),
        "caretaker updated"
    );
    Ok(())
}

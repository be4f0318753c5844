use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use common::model::{caretaker_prefix, CaretakerRecord};
use common::prelude::validate_signed;

use super::{
    load_caretaker, save_caretaker, validate_addresses, AddressInput, MAX_CARETAKERS,
    MAX_CARETAKER_ID_LEN, MAX_SMALL_FIELD_LEN,
};
use crate::error::{Message, ServiceError};
use crate::http::{JsonBody, Ownership};
use crate::request::{field, parse_public_key};
use crate::secrets::load_secret;
use crate::ServiceState;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCaretakerRequest {
    pub addresses: Option<Vec<AddressInput>>,
    pub secret_data: Option<String>,
    /// Set when a caretaker registers itself with its own key.
    pub public_key: Option<String>,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Path((secret_id, caretaker_id)): Path<(String, String)>,
    ownership: Ownership,
    JsonBody(req): JsonBody<CreateCaretakerRequest>,
) -> Result<Response, ServiceError> {
    create_caretaker(&state, &secret_id, &caretaker_id, req, &ownership).await?;
    Ok(Json(Message::new("Caretaker Updated")).into_response())
}

/// Invite a caretaker, or replace an invitation that was not accepted yet.
pub async fn create_caretaker(
    state: &ServiceState,
    secret_id: &str,
    caretaker_id: &str,
    req: CreateCaretakerRequest,
    ownership: &Ownership,
) -> Result<(), ServiceError> {
    if caretaker_id.len() > MAX_CARETAKER_ID_LEN {
        return Err(ServiceError::validation("CaretakerId too long"));
    }
    let secret_data = field(&req.secret_data);
    if secret_data.is_some_and(|d| d.len() > MAX_SMALL_FIELD_LEN) {
        return Err(ServiceError::validation("secretData field too long"));
    }
    let public_key = match field(&req.public_key) {
        Some(text) => Some(
            parse_public_key(text)
                .ok_or_else(|| ServiceError::validation("Malformed publicKey field"))?,
        ),
        None => None,
    };

    let secret = load_secret(state, secret_id).await?;
    if secret_data.is_some_and(|d| !validate_signed(d, &secret.public_key)) {
        return Err(ServiceError::validation("secretData is invalid"));
    }

    state.authenticate([Some(secret.public_key), public_key], ownership.assertion())?;

    let address_key = public_key.unwrap_or(secret.public_key);
    let addresses = match &req.addresses {
        Some(addresses) => Some(validate_addresses(&address_key, addresses)?),
        None => None,
    };

    let existing = state
        .store()
        .list_children(&caretaker_prefix(secret_id))
        .await
        .map_err(|e| {
            tracing::error!(secret_id, error = %e, "failed to list caretakers");
            e
        })?;
    if existing.len() >= MAX_CARETAKERS {
        return Err(ServiceError::validation("Too many caretakers"));
    }

    if existing.iter().any(|id| id == caretaker_id) {
        // an unreadable record is overwritten like an unaccepted one
        if let Ok(current) = load_caretaker(state, secret_id, caretaker_id).await {
            if current.is_accepted() {
                return Err(ServiceError::validation(
                    "Can't create a caretaker that is already accepted",
                ));
            }
        }
    }

    let record = CaretakerRecord {
        addresses,
        public_key,
        secret_data: secret_data.map(str::to_string),
        ..Default::default()
    };
    save_caretaker(state, secret_id, caretaker_id, &record).await?;
    tracing::info!(secret_id, caretaker_id, "caretaker invited");
    Ok(())
}

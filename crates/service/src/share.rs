//! Data key hand-off from the unlocking caretaker to the others.

use std::collections::BTreeMap;

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};

use common::prelude::validate_signed;

use crate::caretakers::{load_caretaker, save_caretaker};
use crate::error::{Message, ServiceError};
use crate::http::{JsonBody, Ownership};
use crate::secrets::load_secret;
use crate::ServiceState;

pub const MAX_SHARED_DATA_KEY_LEN: usize = 250;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareRequest {
    /// Re-wrapped data key per target caretaker id.
    pub shared_data_keys: Option<BTreeMap<String, String>>,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Path((secret_id, caretaker_id)): Path<(String, String)>,
    ownership: Ownership,
    JsonBody(req): JsonBody<ShareRequest>,
) -> Result<Response, ServiceError> {
    share_data_keys(&state, &secret_id, &caretaker_id, req, &ownership).await?;
    Ok(Json(Message::new("Successfully shared")).into_response())
}

/// Hand each target caretaker its copy of the data key.
///
/// Every target is read and checked before anything is written. Writes are
/// not transactional: a failure part way leaves earlier targets updated.
pub async fn share_data_keys(
    state: &ServiceState,
    secret_id: &str,
    caretaker_id: &str,
    req: ShareRequest,
    ownership: &Ownership,
) -> Result<(), ServiceError> {
    let shared_data_keys = req
        .shared_data_keys
        .ok_or_else(|| ServiceError::validation("Missing sharedDataKeys"))?;
    if shared_data_keys
        .values()
        .any(|value| value.len() > MAX_SHARED_DATA_KEY_LEN)
    {
        return Err(ServiceError::validation("sharedDataKey value too large"));
    }

    let caretaker = load_caretaker(state, secret_id, caretaker_id).await?;
    let secret = load_secret(state, secret_id).await?;
    state.authenticate(caretaker.public_key, ownership.assertion())?;

    let unlock_key = match secret.unlock_public_key {
        Some(key) if Some(key) == caretaker.public_key => key,
        _ => return Err(ServiceError::forbidden("Not the unlocking caretaker")),
    };
    if let Some(started) = secret.unlock_timestamp {
        if started.saturating_add(state.timing().unlock_quarantine_millis) > state.now_millis() {
            return Err(ServiceError::forbidden("Too early"));
        }
    }

    if shared_data_keys
        .values()
        .any(|value| !validate_signed(value, &unlock_key))
    {
        return Err(ServiceError::validation(
            "Invalid sharedDataKey value signature",
        ));
    }
    if shared_data_keys.is_empty() {
        return Err(ServiceError::validation("Missing caretakers to share with"));
    }

    let targets = try_join_all(
        shared_data_keys
            .into_iter()
            .map(|(target_id, data_key)| async move {
                let mut target = load_caretaker(state, secret_id, &target_id).await?;
                if !target.is_accepted() {
                    tracing::info!(
                        secret_id,
                        target_id = %target_id,
                        "share target has not accepted"
                    );
                    return Err(ServiceError::NotFound);
                }
                target.data_key = Some(data_key);
                Ok((target_id, target))
            }),
    )
    .await?;

    try_join_all(
        targets
            .iter()
            .map(|(target_id, target)| save_caretaker(state, secret_id, target_id, target)),
    )
    .await?;

    tracing::info!(secret_id, caretaker_id, shared = targets.len(), "data key shared");
    Ok(())
}

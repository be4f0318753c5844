use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use common::crypto::{Digest, DIGEST_SIZE};
use common::encoding::{decode_bin_exact, encode_bin};
use common::model::{caretaker_key, CaretakerRecord, SecretView};

use super::load_secret_with_body;
use crate::error::ServiceError;
use crate::http::Ownership;
use crate::request::field;
use crate::ServiceState;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetSecretQuery {
    pub caretaker_id: Option<String>,
    pub data_key_digest: Option<String>,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Path(secret_id): Path<String>,
    Query(query): Query<GetSecretQuery>,
    ownership: Ownership,
) -> Result<Response, ServiceError> {
    let view = get_secret(&state, &secret_id, &query, &ownership).await?;
    Ok(Json(view).into_response())
}

/// Read a secret as its owner, or as a caretaker once the secret has been
/// unlocked long enough and the caller knows the data key.
pub async fn get_secret(
    state: &ServiceState,
    secret_id: &str,
    query: &GetSecretQuery,
    ownership: &Ownership,
) -> Result<SecretView, ServiceError> {
    let (secret, body) = load_secret_with_body(state, secret_id).await?;

    let signer = match field(&query.caretaker_id) {
        Some(caretaker_id) => {
            let object = state
                .store()
                .get(&caretaker_key(secret_id, caretaker_id))
                .await?;
            let caretaker = CaretakerRecord::from_json(&object.body)?;
            state.authenticate(caretaker.public_key, ownership.assertion())?
        }
        None => state.authenticate(
            [Some(secret.public_key), secret.unlock_public_key],
            ownership.assertion(),
        )?,
    };

    let view = SecretView::new(&secret, encode_bin(&body));
    if signer == secret.public_key {
        return Ok(view);
    }

    let submitted = field(&query.data_key_digest)
        .ok_or_else(|| ServiceError::validation("Missing dataKeyDigest"))?;
    let data_key_digest = decode_bin_exact::<DIGEST_SIZE>(submitted)
        .map_err(|_| ServiceError::validation("Invalid dataKeyDigest"))?;
    if secret.data_key_digest != Some(Digest::of(data_key_digest)) {
        tracing::info!(secret_id, "caretaker read with wrong data key");
        return Err(ServiceError::forbidden("Incorrect dataKeyDigest"));
    }

    if secret.unlock_timestamp.is_none() {
        return Err(ServiceError::forbidden("Not unlocked"));
    }
    if !secret.quarantine_elapsed(state.now_millis(), state.timing().unlock_quarantine_millis) {
        return Err(ServiceError::forbidden("Too early"));
    }

    tracing::info!(secret_id, "secret released to caretaker");
    Ok(view.without_publish_data())
}

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;

use common::model::caretaker_key;

use crate::error::{Message, ServiceError};
use crate::http::Ownership;
use crate::secrets::load_secret;
use crate::ServiceState;

pub async fn handler(
    State(state): State<ServiceState>,
    Path((secret_id, caretaker_id)): Path<(String, String)>,
    ownership: Ownership,
) -> Result<Response, ServiceError> {
    delete_caretaker(&state, &secret_id, &caretaker_id, &ownership).await?;
    Ok(Json(Message::new("Caretaker Deleted")).into_response())
}

pub async fn delete_caretaker(
    state: &ServiceState,
    secret_id: &str,
    caretaker_id: &str,
    ownership: &Ownership,
) -> Result<(), ServiceError> {
    let secret = load_secret(state, secret_id).await?;
    state.authenticate(secret.public_key, ownership.assertion())?;

    if secret.is_published() {
        return Err(ServiceError::validation(
            "Can't delete a caretaker for published secret",
        ));
    }

    state
        .store()
        .delete(&caretaker_key(secret_id, caretaker_id))
        .await
        .map_err(|e| {
            tracing::warn!(secret_id, caretaker_id, error = %e, "failed to delete caretaker");
            e
        })?;

    tracing::info!(secret_id, caretaker_id, "caretaker removed");
    Ok(())
}

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;

use common::model::{caretaker_prefix, secret_key};

use super::load_secret;
use crate::error::{Message, ServiceError};
use crate::http::Ownership;
use crate::ServiceState;

pub async fn handler(
    State(state): State<ServiceState>,
    Path(secret_id): Path<String>,
    ownership: Ownership,
) -> Result<Response, ServiceError> {
    delete_secret(&state, &secret_id, &ownership).await?;
    Ok(Json(Message::new("Secret Deleted")).into_response())
}

/// Remove a secret and all of its caretakers. Published secrets stay.
pub async fn delete_secret(
    state: &ServiceState,
    secret_id: &str,
    ownership: &Ownership,
) -> Result<(), ServiceError> {
    let secret = load_secret(state, secret_id).await?;
    state.authenticate(secret.public_key, ownership.assertion())?;

    if secret.is_published() {
        return Err(ServiceError::validation("Can't delete a published secret"));
    }

    state.store().delete(&secret_key(secret_id)).await?;
    state
        .store()
        .delete_prefix(&caretaker_prefix(secret_id))
        .await?;

    tracing::info!(secret_id, "secret deleted");
    Ok(())
}

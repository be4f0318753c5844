use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;

use common::model::CaretakerView;

use super::load_caretaker;
use crate::error::ServiceError;
use crate::http::Ownership;
use crate::secrets::load_secret;
use crate::ServiceState;

pub async fn handler(
    State(state): State<ServiceState>,
    Path((secret_id, caretaker_id)): Path<(String, String)>,
    ownership: Ownership,
) -> Result<Response, ServiceError> {
    let view = get_caretaker(&state, &secret_id, &caretaker_id, &ownership).await?;
    Ok(Json(view).into_response())
}

pub async fn get_caretaker(
    state: &ServiceState,
    secret_id: &str,
    caretaker_id: &str,
    ownership: &Ownership,
) -> Result<CaretakerView, ServiceError> {
    let caretaker = load_caretaker(state, secret_id, caretaker_id).await?;
    let secret = load_secret(state, secret_id).await?;

    state.authenticate(
        [
            Some(secret.public_key),
            secret.unlock_public_key,
            caretaker.public_key,
        ],
        ownership.assertion(),
    )?;

    Ok(CaretakerView::project(&caretaker, &secret))
}

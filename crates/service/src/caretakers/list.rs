use std::collections::BTreeMap;

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::future::try_join_all;
use serde::Serialize;

use common::model::{caretaker_prefix, CaretakerView};

use super::load_caretaker;
use crate::error::ServiceError;
use crate::http::Ownership;
use crate::secrets::load_secret;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize)]
pub struct ListCaretakersResponse {
    pub caretakers: BTreeMap<String, CaretakerView>,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Path(secret_id): Path<String>,
    ownership: Ownership,
) -> Result<Response, ServiceError> {
    let caretakers = list_caretakers(&state, &secret_id, &ownership).await?;
    Ok(Json(ListCaretakersResponse { caretakers }).into_response())
}

pub async fn list_caretakers(
    state: &ServiceState,
    secret_id: &str,
    ownership: &Ownership,
) -> Result<BTreeMap<String, CaretakerView>, ServiceError> {
    let secret = load_secret(state, secret_id).await?;
    state.authenticate(
        [Some(secret.public_key), secret.unlock_public_key],
        ownership.assertion(),
    )?;

    let ids = state
        .store()
        .list_children(&caretaker_prefix(secret_id))
        .await?;

    let views = try_join_all(ids.into_iter().map(|caretaker_id| {
        let secret = &secret;
        async move {
            let record = load_caretaker(state, secret_id, &caretaker_id).await?;
            Ok::<_, ServiceError>((caretaker_id, CaretakerView::project(&record, secret)))
        }
    }))
    .await?;

    Ok(views.into_iter().collect())
}

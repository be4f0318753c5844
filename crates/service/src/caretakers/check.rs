use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use serde::Deserialize;

use super::load_caretaker;
use crate::error::{Message, ServiceError};
use crate::request::{field, parse_public_key};
use crate::secrets::load_secret;
use crate::ServiceState;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckCaretakerQuery {
    pub secret_public_key: Option<String>,
}

/// Whether an invited caretaker still has to accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    Pending,
    Accepted,
}

impl IntoResponse for CheckOutcome {
    fn into_response(self) -> Response {
        match self {
            CheckOutcome::Pending => {
                (StatusCode::OK, Json(Message::new("Caretaker exists"))).into_response()
            }
            CheckOutcome::Accepted => (
                StatusCode::ACCEPTED,
                Json(Message::new(
                    "Caretaker already accepted use private key to access",
                )),
            )
                .into_response(),
        }
    }
}

pub async fn handler(
    State(state): State<ServiceState>,
    Path((secret_id, caretaker_id)): Path<(String, String)>,
    Query(query): Query<CheckCaretakerQuery>,
) -> Result<CheckOutcome, ServiceError> {
    check_caretaker(&state, &secret_id, &caretaker_id, &query).await
}

/// Existence probe for invite links. Needs no ownership proof, only the
/// secret's current public key.
pub async fn check_caretaker(
    state: &ServiceState,
    secret_id: &str,
    caretaker_id: &str,
    query: &CheckCaretakerQuery,
) -> Result<CheckOutcome, ServiceError> {
    let secret_public_key = field(&query.secret_public_key)
        .ok_or_else(|| ServiceError::validation("Missing secretPublicKey"))?;

    let caretaker = load_caretaker(state, secret_id, caretaker_id).await?;
    let secret = load_secret(state, secret_id).await?;

    if parse_public_key(secret_public_key) != Some(secret.public_key) {
        return Err(ServiceError::NotFound);
    }

    if caretaker.is_accepted() {
        Ok(CheckOutcome::Accepted)
    } else {
        Ok(CheckOutcome::Pending)
    }
}

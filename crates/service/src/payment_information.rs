use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use serde::Serialize;

use crate::error::Message;
use crate::http::Ownership;
use crate::payments::PaymentOptions;
use crate::request::parse_public_key;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize)]
pub struct PaymentInformationResponse {
    pub options: PaymentOptions,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Path(public_key): Path<String>,
    ownership: Ownership,
) -> Result<impl IntoResponse, PaymentInformationError> {
    let public_key =
        parse_public_key(&public_key).ok_or(PaymentInformationError::InvalidPublicKey)?;

    // the key is in the URL already, so a failed proof is not hidden as a 404
    state
        .authenticate(public_key, ownership.assertion())
        .map_err(|_| PaymentInformationError::InvalidSignature)?;

    let options = state.payments().options().await.map_err(|e| {
        tracing::error!(error = %e, "failed to load payment options");
        PaymentInformationError::Unavailable
    })?;
    Ok(Json(PaymentInformationResponse { options }))
}

#[derive(Debug, thiserror::Error)]
pub enum PaymentInformationError {
    #[error("Invalid publicKey")]
    InvalidPublicKey,
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Failed talking to payment processor")]
    Unavailable,
}

impl IntoResponse for PaymentInformationError {
    fn into_response(self) -> Response {
        let status = match self {
            PaymentInformationError::InvalidPublicKey => StatusCode::BAD_REQUEST,
            PaymentInformationError::InvalidSignature => StatusCode::FORBIDDEN,
            PaymentInformationError::Unavailable => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(Message::new(self.to_string()))).into_response()
    }
}

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::error::{Message, NOT_FOUND_MESSAGE};
use crate::ServiceState;

pub async fn not_found_handler() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(Message::new(NOT_FOUND_MESSAGE)),
    )
        .into_response()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceTime {
    pub service_time: i64,
}

/// Server clock in epoch milliseconds, for clients building ownership proofs.
pub async fn service_time_handler(State(state): State<ServiceState>) -> Json<ServiceTime> {
    Json(ServiceTime {
        service_time: state.now_millis(),
    })
}

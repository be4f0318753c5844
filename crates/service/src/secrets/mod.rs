//! Secret lifecycle: create, read, update and delete.

use axum::routing::{get, post};
use axum::Router;
use bytes::Bytes;

use common::model::{secret_key, SecretRecord};

use crate::error::ServiceError;
use crate::payments::PaymentRequest;
use crate::request::field;
use crate::{share, unlock, ServiceState};

pub mod create;
pub mod delete;
pub mod get;
pub mod update;

/// Largest accepted secret body, decoded.
pub const MAX_DATA_BYTES: usize = 1_000_000;
pub const MAX_PUBLISH_DATA_LEN: usize = 1000;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route("/", post(create::handler))
        .route(
            "/:secret_id",
            get(get::handler).put(update::handler).delete(delete::handler),
        )
        .route("/:secret_id/:caretaker_id/unlock", post(unlock::handler))
        .route("/:secret_id/:caretaker_id/share", post(share::handler))
        .with_state(state)
}

/// Payment details if the client sent any part of them.
pub(crate) fn payment_request(
    payment_type: &Option<String>,
    payment_token: &Option<String>,
) -> Option<PaymentRequest> {
    if field(payment_type).is_none() && field(payment_token).is_none() {
        return None;
    }
    Some(PaymentRequest {
        payment_type: payment_type.clone().unwrap_or_default(),
        token: payment_token.clone().unwrap_or_default(),
    })
}

pub(crate) async fn load_secret(
    state: &ServiceState,
    secret_id: &str,
) -> Result<SecretRecord, ServiceError> {
    let metadata = state.store().get_metadata(&secret_key(secret_id)).await?;
    Ok(SecretRecord::from_metadata(&metadata)?)
}

pub(crate) async fn load_secret_with_body(
    state: &ServiceState,
    secret_id: &str,
) -> Result<(SecretRecord, Bytes), ServiceError> {
    let object = state.store().get(&secret_key(secret_id)).await?;
    let record = SecretRecord::from_metadata(&object.metadata)?;
    Ok((record, object.body))
}

pub(crate) async fn save_secret(
    state: &ServiceState,
    secret_id: &str,
    record: &SecretRecord,
    body: Bytes,
) -> Result<(), ServiceError> {
    state
        .store()
        .put(&secret_key(secret_id), body, record.to_metadata())
        .await?;
    Ok(())
}

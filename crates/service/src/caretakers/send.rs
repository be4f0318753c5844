use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use common::prelude::Digest;

use super::load_caretaker;
use crate::error::{Message, ServiceError};
use crate::http::{JsonBody, Ownership};
use crate::notify::{invite_link, MessageKind, Notification};
use crate::request::field;
use crate::secrets::load_secret;
use crate::ServiceState;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    pub send_type: Option<String>,
    /// Plaintext address; must be one the caretaker registered.
    pub address: Option<String>,
    pub title: Option<String>,
    pub message: Option<String>,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Path((secret_id, caretaker_id)): Path<(String, String)>,
    ownership: Ownership,
    JsonBody(req): JsonBody<SendRequest>,
) -> Result<Response, ServiceError> {
    send_message(&state, &secret_id, &caretaker_id, req, &ownership).await?;
    Ok(Json(Message::new("Message Sent")).into_response())
}

/// Send a message to one of a caretaker's registered addresses. Invites are
/// sent by the owner; unlock and share notices by the unlocking caretaker.
pub async fn send_message(
    state: &ServiceState,
    secret_id: &str,
    caretaker_id: &str,
    req: SendRequest,
    ownership: &Ownership,
) -> Result<(), ServiceError> {
    let kind = field(&req.send_type)
        .and_then(MessageKind::parse_send_type)
        .ok_or_else(|| ServiceError::validation("Invalid sendType"))?;
    let address = field(&req.address).ok_or_else(|| ServiceError::validation("Missing address"))?;

    let secret = load_secret(state, secret_id).await?;
    let sender = match kind {
        MessageKind::Invite => secret.public_key,
        _ => secret.unlock_public_key.ok_or(ServiceError::NotFound)?,
    };
    state.authenticate(sender, ownership.assertion())?;

    let caretaker = load_caretaker(state, secret_id, caretaker_id).await?;
    if !caretaker.has_address_digest(&Digest::of(address)) {
        return Err(ServiceError::NotFound);
    }

    let title = field(&req.title).map(str::to_string);
    let mut notification = Notification::new(kind, address)
        .with_title(title.clone())
        .with_message(field(&req.message).map(str::to_string));
    if kind == MessageKind::Invite {
        notification = notification.with_link(invite_link(
            state.base_url(),
            secret_id,
            caretaker_id,
            address,
            &secret.public_key,
            title.as_deref(),
        ));
    }

    state.notifier().send(&notification).await?;
    tracing::info!(secret_id, caretaker_id, kind = ?kind, "message sent");
    Ok(())
}

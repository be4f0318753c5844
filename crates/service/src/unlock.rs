//! Unlock consensus.
//!
//! A caretaker starts an unlock by proving it knows the address key of every
//! digest-gated sibling. Siblings without a digest only get told about it.
//! The secret then records the caretaker's key as its unlock key, and after
//! the quarantine the caretaker may read the secret and share its data key.

use std::collections::BTreeMap;

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};

use common::model::{caretaker_prefix, CaretakerRecord, UnlockGate};
use common::prelude::{decode_bin, Digest};

use crate::caretakers::load_caretaker;
use crate::error::{Message, ServiceError};
use crate::http::{JsonBody, Ownership};
use crate::notify::{MessageKind, Notification};
use crate::secrets::{load_secret_with_body, save_secret};
use crate::ServiceState;

const WRONG_DIGEST_MESSAGE: &str = "Wrong dataKeyDigest";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockRequest {
    /// Address key per sibling caretaker id.
    pub address_key_digests: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockOutcome {
    Unlocked,
    /// The caretaker already holds the unlock; nothing changed.
    AlreadyUnlocked,
}

impl IntoResponse for UnlockOutcome {
    fn into_response(self) -> Response {
        let message = match self {
            UnlockOutcome::Unlocked => "Secret Unlocked",
            UnlockOutcome::AlreadyUnlocked => "Secret already unlocked",
        };
        Json(Message::new(message)).into_response()
    }
}

pub async fn handler(
    State(state): State<ServiceState>,
    Path((secret_id, caretaker_id)): Path<(String, String)>,
    ownership: Ownership,
    JsonBody(req): JsonBody<UnlockRequest>,
) -> Result<UnlockOutcome, ServiceError> {
    unlock_secret(&state, &secret_id, &caretaker_id, req, &ownership).await
}

pub async fn unlock_secret(
    state: &ServiceState,
    secret_id: &str,
    caretaker_id: &str,
    req: UnlockRequest,
    ownership: &Ownership,
) -> Result<UnlockOutcome, ServiceError> {
    let digests = req
        .address_key_digests
        .ok_or_else(|| ServiceError::validation("Missing addressKeyDigests"))?;

    let caretaker = load_caretaker(state, secret_id, caretaker_id).await?;
    let unlocker = state.authenticate(caretaker.public_key, ownership.assertion())?;

    let siblings = state
        .store()
        .list_children(&caretaker_prefix(secret_id))
        .await?;
    let notification_addresses = try_join_all(
        siblings
            .into_iter()
            .filter(|id| id != caretaker_id)
            .map(|sibling_id| {
                let digests = &digests;
                async move {
                    let sibling = load_caretaker(state, secret_id, &sibling_id).await?;
                    check_sibling(&sibling, digests.get(&sibling_id))
                }
            }),
    )
    .await?;
    let notification_address = notification_addresses.into_iter().flatten().last();

    let (mut secret, body) = load_secret_with_body(state, secret_id).await?;
    let now = state.now_millis();

    match (secret.unlock_public_key, secret.unlock_timestamp) {
        (Some(current), _) if current == unlocker => {
            return Ok(UnlockOutcome::AlreadyUnlocked);
        }
        (Some(_), Some(started))
            if started.saturating_add(state.timing().unlock_timeout_millis) > now =>
        {
            return Err(ServiceError::validation(
                "Secret is already unlocked by another caretaker",
            ));
        }
        (Some(_), _) => {
            tracing::info!(secret_id, caretaker_id, "superseding a stale unlock");
        }
        (None, _) => {}
    }

    secret.unlock_public_key = Some(unlocker);
    secret.unlock_timestamp = Some(now);

    if let Some(address) = notification_address {
        let notification = Notification::new(MessageKind::Unlock, address)
            .with_message(Some(secret_id.to_string()));
        state.notifier().send(&notification).await?;
    }

    save_secret(state, secret_id, &secret, body).await?;
    tracing::info!(secret_id, caretaker_id, "unlock started");
    Ok(UnlockOutcome::Unlocked)
}

/// Gate one sibling caretaker. Returns the address to notify, if any.
fn check_sibling(
    sibling: &CaretakerRecord,
    submitted: Option<&String>,
) -> Result<Option<String>, ServiceError> {
    match sibling.unlock_gate() {
        UnlockGate::DigestGated { address_key_digest } => {
            let matches = submitted
                .and_then(|text| decode_bin(text).ok())
                .is_some_and(|key| Digest::of(key) == address_key_digest);
            if matches {
                Ok(None)
            } else {
                Err(ServiceError::validation(WRONG_DIGEST_MESSAGE))
            }
        }
        UnlockGate::PlaintextNotify => Ok(sibling.notification_address()),
    }
}

#[cfg(test)]
mod tests {
    use common::model::{AddressRecord, AddressType};
    use common::prelude::{encode_bin, Envelope, SecretKey};

    use super::*;

    #[test]
    fn test_digest_gated_sibling_needs_matching_key() {
        let sibling = CaretakerRecord {
            address_key_digest: Some(Digest::of(b"address key")),
            data: Some("ZA".into()),
            ..Default::default()
        };
        assert!(check_sibling(&sibling, Some(&encode_bin(b"address key")))
            .unwrap()
            .is_none());
        assert!(check_sibling(&sibling, Some(&encode_bin(b"guess"))).is_err());
        assert!(check_sibling(&sibling, None).is_err());
    }

    #[test]
    fn test_plaintext_sibling_never_blocks() {
        let key = SecretKey::generate();
        let sibling = CaretakerRecord {
            addresses: Some(vec![AddressRecord {
                address: Envelope::signed(b"carol@example.com".to_vec(), &key).to_text(),
                address_type: AddressType::Email,
                address_digest: Digest::of("carol@example.com"),
            }]),
            ..Default::default()
        };
        let address = check_sibling(&sibling, Some(&"garbage".to_string())).unwrap();
        assert_eq!(address.as_deref(), Some("carol@example.com"));
    }
}

//! Caretaker lifecycle: invitation, acceptance, nomination and removal.

use axum::routing::{get, post};
use axum::Router;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use common::model::{caretaker_key, AddressRecord, AddressType, CaretakerRecord};
use common::prelude::{Digest, Envelope, PublicKey};

use crate::error::ServiceError;
use crate::request::{field, parse_digest};
use crate::ServiceState;

pub mod check;
pub mod create;
pub mod delete;
pub mod get;
pub mod list;
pub mod send;
pub mod update;

pub const MAX_CARETAKERS: usize = 16;
pub const MAX_CARETAKER_ID_LEN: usize = 30;
pub const MAX_ADDRESSES: usize = 10;
pub const MAX_ADDRESS_LEN: usize = 1000;
/// Ceiling for `secretData` and `caretakerData`.
pub const MAX_SMALL_FIELD_LEN: usize = 1000;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route("/:secret_id", get(list::handler))
        .route(
            "/:secret_id/:caretaker_id",
            get(get::handler)
                .head(check::handler)
                .post(create::handler)
                .put(update::handler)
                .delete(delete::handler),
        )
        .route("/:secret_id/:caretaker_id/send", post(send::handler))
        .with_state(state)
}

/// An address as submitted by a client, not yet validated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressInput {
    pub address: Option<String>,
    pub address_type: Option<String>,
    pub address_digest: Option<String>,
}

/// Validate client addresses in order, stopping at the first bad one.
/// Each address envelope must be signed by `key`.
pub(crate) fn validate_addresses(
    key: &PublicKey,
    addresses: &[AddressInput],
) -> Result<Vec<AddressRecord>, ServiceError> {
    if addresses.len() > MAX_ADDRESSES {
        return Err(ServiceError::validation("More than 10 addresses specified"));
    }
    addresses
        .iter()
        .map(|input| validate_address(key, input))
        .collect()
}

fn validate_address(key: &PublicKey, input: &AddressInput) -> Result<AddressRecord, ServiceError> {
    let address = field(&input.address).ok_or_else(|| ServiceError::validation("Missing address"))?;
    if address.len() > MAX_ADDRESS_LEN {
        return Err(ServiceError::validation("Too long address"));
    }

    let address_type = field(&input.address_type)
        .ok_or_else(|| ServiceError::validation("Missing addressType"))?;
    let address_type = AddressType::parse(address_type)
        .ok_or_else(|| ServiceError::validation("Invalid addressType"))?;

    let digest = field(&input.address_digest)
        .ok_or_else(|| ServiceError::validation("Missing addressDigest"))?;
    let address_digest =
        parse_digest(digest).ok_or_else(|| ServiceError::validation("Invalid addressDigest"))?;

    let envelope = Envelope::from_text(address)
        .map_err(|_| ServiceError::validation("Invalid address signature"))?;
    // a readable address must match its commitment
    if envelope.is_plaintext() && Digest::of(envelope.message()) != address_digest {
        return Err(ServiceError::validation("Invalid addressDigest"));
    }
    if !envelope.verify(key) {
        return Err(ServiceError::validation("Invalid address signature"));
    }

    Ok(AddressRecord {
        address: address.to_string(),
        address_type,
        address_digest,
    })
}

pub(crate) async fn load_caretaker(
    state: &ServiceState,
    secret_id: &str,
    caretaker_id: &str,
) -> Result<CaretakerRecord, ServiceError> {
    let object = state
        .store()
        .get(&caretaker_key(secret_id, caretaker_id))
        .await?;
    Ok(CaretakerRecord::from_json(&object.body)?)
}

pub(crate) async fn save_caretaker(
    state: &ServiceState,
    secret_id: &str,
    caretaker_id: &str,
    record: &CaretakerRecord,
) -> Result<(), ServiceError> {
    let body = Bytes::from(record.to_json()?);
    state
        .store()
        .put(
            &caretaker_key(secret_id, caretaker_id),
            body,
            Default::default(),
        )
        .await?;
    Ok(())
}

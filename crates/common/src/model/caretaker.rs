use serde::{Deserialize, Serialize};

use super::secret::{RecordError, SecretRecord};
use crate::crypto::{validate_signed, Digest, Envelope, PublicKey};

/// How a caretaker can be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AddressType {
    Email,
    Gcm,
    Apns,
    Mail,
}

impl AddressType {
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "EMAIL" => Some(Self::Email),
            "GCM" => Some(Self::Gcm),
            "APNS" => Some(Self::Apns),
            "MAIL" => Some(Self::Mail),
            _ => None,
        }
    }
}

/// One notification address. `address` is an envelope; `address_digest`
/// is the SHA-512 of the plaintext address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressRecord {
    pub address: String,
    pub address_type: AddressType,
    pub address_digest: Digest,
}

/// Stored caretaker state, the JSON body of `caretakers/<secretId>/<caretakerId>`.
///
/// A caretaker without a `public_key` has been invited but has not accepted yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaretakerRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub addresses: Option<Vec<AddressRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<PublicKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_key_digest: Option<Digest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caretaker_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlock_public_key: Option<PublicKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlock_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_key: Option<String>,
}

/// How a caretaker takes part when a sibling starts an unlock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockGate {
    /// The unlocking caretaker must present a value hashing to this digest.
    DigestGated { address_key_digest: Digest },
    /// The caretaker is only told about the unlock, if it left a readable email address.
    PlaintextNotify,
}

impl CaretakerRecord {
    pub fn from_json(bytes: &[u8]) -> Result<Self, RecordError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn to_json(&self) -> Result<Vec<u8>, RecordError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn is_accepted(&self) -> bool {
        self.public_key.is_some()
    }

    pub fn unlock_gate(&self) -> UnlockGate {
        match (&self.address_key_digest, &self.data) {
            (Some(digest), Some(_)) => UnlockGate::DigestGated {
                address_key_digest: *digest,
            },
            _ => UnlockGate::PlaintextNotify,
        }
    }

    fn addresses(&self) -> &[AddressRecord] {
        self.addresses.as_deref().unwrap_or_default()
    }

    /// The last email address stored as a plaintext envelope, if any.
    pub fn notification_address(&self) -> Option<String> {
        self.addresses()
            .iter()
            .filter(|a| a.address_type == AddressType::Email)
            .filter_map(|a| Envelope::from_text(&a.address).ok())
            .filter(Envelope::is_plaintext)
            .last()
            .map(|envelope| String::from_utf8_lossy(envelope.message()).into_owned())
    }

    pub fn has_address_digest(&self, digest: &Digest) -> bool {
        self.addresses().iter().any(|a| &a.address_digest == digest)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressView {
    pub address: String,
    pub address_type: AddressType,
}

/// A caretaker as returned to callers.
///
/// Digests never leave the service. The unlock fields always reflect the
/// secret's current unlock attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaretakerView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub addresses: Option<Vec<AddressView>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<PublicKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caretaker_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unlock_public_key: Option<PublicKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unlock_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_key: Option<String>,
    pub secret_public_key: PublicKey,
}

impl CaretakerView {
    pub fn project(record: &CaretakerRecord, secret: &SecretRecord) -> Self {
        let mut unlock_public_key = record.unlock_public_key;
        let mut unlock_data = record.unlock_data.clone();
        let mut data_key = None;

        if let Some(current) = secret.unlock_public_key {
            if unlock_public_key.is_some_and(|key| key != current) {
                unlock_data = None;
            }
            unlock_public_key = Some(current);
            data_key = record
                .data_key
                .clone()
                .filter(|data_key| validate_signed(data_key, &current));
        }

        Self {
            addresses: record.addresses.as_ref().map(|addresses| {
                addresses
                    .iter()
                    .map(|a| AddressView {
                        address: a.address.clone(),
                        address_type: a.address_type,
                    })
                    .collect()
            }),
            public_key: record.public_key,
            secret_data: record.secret_data.clone(),
            data: record.data.clone(),
            caretaker_data: record.caretaker_data.clone(),
            unlock_public_key,
            unlock_data,
            data_key,
            secret_public_key: secret.public_key,
        }
    }
}

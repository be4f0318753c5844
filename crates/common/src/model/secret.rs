use std::collections::BTreeMap;

use serde::Serialize;

use crate::crypto::{Digest, PublicKey};

pub const SECRET_VERSION: &str = "1";

const META_PUBLIC_KEY: &str = "p";
const META_VERSION: &str = "v";
const META_DATA_KEY_DIGEST: &str = "d";
const META_PAY_DATE: &str = "c";
const META_UNLOCK_PUBLIC_KEY: &str = "u";
const META_UNLOCK_TIMESTAMP: &str = "t";
const META_PUBLISH_DATA: &str = "a";

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("secret metadata missing field {0}")]
    MissingField(&'static str),
    #[error("secret metadata field {field} malformed: {reason}")]
    Malformed { field: &'static str, reason: String },
    #[error("caretaker record malformed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Everything the service knows about a secret apart from its body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretRecord {
    pub public_key: PublicKey,
    pub version: String,
    /// Set at most once.
    pub data_key_digest: Option<Digest>,
    pub pay_date: Option<i64>,
    pub unlock_public_key: Option<PublicKey>,
    pub unlock_timestamp: Option<i64>,
    pub publish_data: Option<String>,
}

impl SecretRecord {
    pub fn new(public_key: PublicKey, pay_date: i64) -> Self {
        Self {
            public_key,
            version: SECRET_VERSION.to_string(),
            data_key_digest: None,
            pay_date: Some(pay_date),
            unlock_public_key: None,
            unlock_timestamp: None,
            publish_data: None,
        }
    }

    /// A published secret has committed to its data key and can no longer
    /// be deleted, nor can its caretakers.
    pub fn is_published(&self) -> bool {
        self.data_key_digest.is_some()
    }

    pub fn clear_unlock(&mut self) {
        self.unlock_public_key = None;
        self.unlock_timestamp = None;
    }

    /// True once an unlock started at least `quarantine_millis` ago.
    pub fn quarantine_elapsed(&self, now_millis: i64, quarantine_millis: i64) -> bool {
        match self.unlock_timestamp {
            Some(ts) => ts.saturating_add(quarantine_millis) <= now_millis,
            None => false,
        }
    }

    pub fn to_metadata(&self) -> BTreeMap<String, String> {
        let mut metadata = BTreeMap::new();
        metadata.insert(META_PUBLIC_KEY.to_string(), self.public_key.to_string());
        metadata.insert(META_VERSION.to_string(), self.version.clone());
        if let Some(digest) = &self.data_key_digest {
            metadata.insert(META_DATA_KEY_DIGEST.to_string(), digest.to_string());
        }
        if let Some(pay_date) = self.pay_date {
            metadata.insert(META_PAY_DATE.to_string(), pay_date.to_string());
        }
        if let Some(key) = &self.unlock_public_key {
            metadata.insert(META_UNLOCK_PUBLIC_KEY.to_string(), key.to_string());
        }
        if let Some(ts) = self.unlock_timestamp {
            metadata.insert(META_UNLOCK_TIMESTAMP.to_string(), ts.to_string());
        }
        if let Some(publish_data) = &self.publish_data {
            metadata.insert(META_PUBLISH_DATA.to_string(), publish_data.clone());
        }
        metadata
    }

    pub fn from_metadata(metadata: &BTreeMap<String, String>) -> Result<Self, RecordError> {
        let public_key = metadata
            .get(META_PUBLIC_KEY)
            .ok_or(RecordError::MissingField("publicKey"))?
            .parse::<PublicKey>()
            .map_err(|e| RecordError::Malformed {
                field: "publicKey",
                reason: e.to_string(),
            })?;

        let data_key_digest = metadata
            .get(META_DATA_KEY_DIGEST)
            .map(|d| d.parse::<Digest>())
            .transpose()
            .map_err(|e| RecordError::Malformed {
                field: "dataKeyDigest",
                reason: e.to_string(),
            })?;

        let unlock_public_key = metadata
            .get(META_UNLOCK_PUBLIC_KEY)
            .map(|k| k.parse::<PublicKey>())
            .transpose()
            .map_err(|e| RecordError::Malformed {
                field: "unlockPublicKey",
                reason: e.to_string(),
            })?;

        Ok(Self {
            public_key,
            version: metadata
                .get(META_VERSION)
                .cloned()
                .unwrap_or_else(|| SECRET_VERSION.to_string()),
            data_key_digest,
            pay_date: parse_millis(metadata, META_PAY_DATE, "payDate")?,
            unlock_public_key,
            unlock_timestamp: parse_millis(metadata, META_UNLOCK_TIMESTAMP, "unlockTimestamp")?,
            publish_data: metadata.get(META_PUBLISH_DATA).cloned(),
        })
    }
}

fn parse_millis(
    metadata: &BTreeMap<String, String>,
    key: &str,
    field: &'static str,
) -> Result<Option<i64>, RecordError> {
    metadata
        .get(key)
        .map(|v| v.parse::<i64>())
        .transpose()
        .map_err(|e| RecordError::Malformed {
            field,
            reason: e.to_string(),
        })
}

/// What a secret looks like to a caller. Never carries `dataKeyDigest` or `version`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SecretView {
    pub data: String,
    pub public_key: PublicKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pay_date: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unlock_public_key: Option<PublicKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unlock_timestamp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_data: Option<String>,
}

impl SecretView {
    pub fn new(record: &SecretRecord, data: String) -> Self {
        Self {
            data,
            public_key: record.public_key,
            pay_date: record.pay_date,
            unlock_public_key: record.unlock_public_key,
            unlock_timestamp: record.unlock_timestamp,
            publish_data: record.publish_data.clone(),
        }
    }

    /// The view handed to an unlocking caretaker: publish data stays with the owner.
    pub fn without_publish_data(mut self) -> Self {
        self.publish_data = None;
        self
    }
}

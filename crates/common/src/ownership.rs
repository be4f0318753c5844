//! Request ownership proofs.
//!
//! A client proves it controls a key by sending the header
//! [`OWNERSHIP_HEADER`] with a base64 JSON object `{"t": "<millis>", "s": "<sig>"}`,
//! where `s` is a detached Ed25519 signature over `method ‖ t ‖ url`.
//! The timestamp must sit within [`AUTH_WINDOW_MILLIS`] of the server clock,
//! both ends inclusive.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::crypto::{PublicKey, SecretKey};
use crate::encoding::{decode_bin, encode_bin};

pub const OWNERSHIP_HEADER: &str = "x-yoursharedsecret-ownership";
pub const AUTH_WINDOW_MILLIS: i64 = 60 * 1000;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum OwnershipError {
    #[error("no ownership assertion supplied")]
    Missing,
    #[error("ownership assertion malformed")]
    Malformed,
    #[error("ownership assertion outside of the accepted time window")]
    Expired,
    #[error("no candidate key matched the ownership assertion")]
    NoMatch,
}

#[derive(Serialize, Deserialize)]
struct AssertionBody {
    #[serde(default)]
    t: Value,
    #[serde(default)]
    s: Value,
}

/// A decoded ownership header, bound to the request it arrived with.
///
/// `t` and `s` are kept as raw JSON values: a header that carries them with
/// the wrong type still decodes, and only fails verification.
#[derive(Debug, Clone, PartialEq)]
pub struct OwnershipAssertion {
    pub t: Value,
    pub s: Value,
    pub method: String,
    pub url: String,
}

impl OwnershipAssertion {
    /// Decode the header value. Returns `None` when it is not base64 JSON.
    pub fn from_header(
        header: &str,
        method: impl Into<String>,
        url: impl Into<String>,
    ) -> Option<Self> {
        let raw = decode_bin(header).ok()?;
        let body: AssertionBody = serde_json::from_slice(&raw).ok()?;
        Some(Self {
            t: body.t,
            s: body.s,
            method: method.into(),
            url: url.into(),
        })
    }

    /// Produce a header value proving control of `key` for one request.
    pub fn sign(key: &SecretKey, method: &str, url: &str, timestamp_millis: i64) -> String {
        let t = timestamp_millis.to_string();
        let message = format!("{}{}{}", method, t, url);
        let s = encode_bin(key.sign(message.as_bytes()).to_bytes());
        let body = AssertionBody {
            t: Value::String(t),
            s: Value::String(s),
        };
        encode_bin(serde_json::to_vec(&body).unwrap_or_default())
    }
}

/// Keys a request may prove ownership of, tried in order.
#[derive(Debug, Clone)]
pub enum OwnerKeyCandidate {
    Single(Option<PublicKey>),
    Ordered(Vec<Option<PublicKey>>),
}

impl OwnerKeyCandidate {
    fn keys(&self) -> impl Iterator<Item = &PublicKey> {
        let slice: &[Option<PublicKey>] = match self {
            OwnerKeyCandidate::Single(key) => std::slice::from_ref(key),
            OwnerKeyCandidate::Ordered(keys) => keys,
        };
        slice.iter().flatten()
    }
}

impl From<PublicKey> for OwnerKeyCandidate {
    fn from(key: PublicKey) -> Self {
        OwnerKeyCandidate::Single(Some(key))
    }
}

impl From<Option<PublicKey>> for OwnerKeyCandidate {
    fn from(key: Option<PublicKey>) -> Self {
        OwnerKeyCandidate::Single(key)
    }
}

impl From<Vec<Option<PublicKey>>> for OwnerKeyCandidate {
    fn from(keys: Vec<Option<PublicKey>>) -> Self {
        OwnerKeyCandidate::Ordered(keys)
    }
}

impl<const N: usize> From<[Option<PublicKey>; N]> for OwnerKeyCandidate {
    fn from(keys: [Option<PublicKey>; N]) -> Self {
        OwnerKeyCandidate::Ordered(keys.to_vec())
    }
}

/// Return the first candidate key the assertion was signed with.
pub fn verify_ownership(
    candidates: impl Into<OwnerKeyCandidate>,
    assertion: Option<&OwnershipAssertion>,
    now_millis: i64,
) -> Result<PublicKey, OwnershipError> {
    let assertion = assertion.ok_or(OwnershipError::Missing)?;
    let (Value::String(t), Value::String(s)) = (&assertion.t, &assertion.s) else {
        tracing::info!("ownership assertion with non-string fields");
        return Err(OwnershipError::Malformed);
    };

    let timestamp: i64 = t.parse().map_err(|_| OwnershipError::Malformed)?;
    if timestamp < now_millis - AUTH_WINDOW_MILLIS || timestamp > now_millis + AUTH_WINDOW_MILLIS {
        return Err(OwnershipError::Expired);
    }

    let signature = decode_bin(s).map_err(|_| OwnershipError::Malformed)?;
    let message = format!("{}{}{}", assertion.method, t, assertion.url);

    candidates
        .into()
        .keys()
        .find(|key| key.verify_bytes(message.as_bytes(), &signature))
        .copied()
        .ok_or(OwnershipError::NoMatch)
}

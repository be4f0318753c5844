//! Field parsing shared by the request handlers.

use common::prelude::{Digest, PublicKey};

/// A request field that is present and non-empty.
pub(crate) fn field(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

pub(crate) fn parse_public_key(text: &str) -> Option<PublicKey> {
    text.parse().ok()
}

pub(crate) fn parse_digest(text: &str) -> Option<Digest> {
    text.parse().ok()
}

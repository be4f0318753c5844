//! Binary-to-text helpers.
//!
//! Every binary value that crosses the wire or lands in object metadata is
//! written as unpadded URL-safe base64. Clients are not always that careful,
//! so decoding accepts both base64 alphabets, with or without padding.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, URL_SAFE_NO_PAD};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;

const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EncodingError {
    #[error("invalid base64: {0}")]
    Base64(String),
    #[error("invalid length, expected {expected}, got {actual}")]
    Length { expected: usize, actual: usize },
}

/// Encode bytes as unpadded URL-safe base64.
pub fn encode_bin(data: impl AsRef<[u8]>) -> String {
    URL_SAFE_NO_PAD.encode(data)
}

/// Decode base64 in either alphabet, padded or not.
pub fn decode_bin(text: &str) -> Result<Vec<u8>, EncodingError> {
    let normalized: String = text
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();
    LENIENT
        .decode(normalized)
        .map_err(|e| EncodingError::Base64(e.to_string()))
}

/// Decode base64 and require an exact decoded length.
pub fn decode_bin_exact<const N: usize>(text: &str) -> Result<[u8; N], EncodingError> {
    let bytes = decode_bin(text)?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| EncodingError::Length {
            expected: N,
            actual: bytes.len(),
        })
}

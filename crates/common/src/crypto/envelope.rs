//! Signed (and optionally encrypted) envelope codec.
//!
//! Every signed field a client hands the service is an envelope:
//!
//! ```text
//! [version = 1][nonce len][nonce][public key len][public key][sig len = 64][signature][message ...]
//! ```
//!
//! Nonce and public key are either absent (length 0) or exactly 24 and 32
//! bytes. An envelope with no nonce carries a plaintext message that is only
//! signed; otherwise the message is a box ciphertext the service never opens.
//! Decoding checks the layout only. Signature verification is a separate
//! step against a caller-chosen key.

use super::keys::{PublicKey, SecretKey, PUBLIC_KEY_SIZE, SIGNATURE_SIZE};
use crate::encoding::{decode_bin, encode_bin};

pub const ENVELOPE_VERSION: u8 = 1;
pub const NONCE_SIZE: usize = 24;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("envelope truncated")]
    Truncated,
    #[error("unsupported envelope version {0}")]
    Version(u8),
    #[error("invalid nonce length {0}")]
    NonceLength(u8),
    #[error("invalid public key length {0}")]
    PublicKeyLength(u8),
    #[error("invalid signature length {0}")]
    SignatureLength(u8),
    #[error("invalid envelope encoding: {0}")]
    Encoding(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    nonce: Option<[u8; NONCE_SIZE]>,
    public_key: Option<[u8; PUBLIC_KEY_SIZE]>,
    signature: [u8; SIGNATURE_SIZE],
    message: Vec<u8>,
}

impl Envelope {
    pub fn new(
        nonce: Option<[u8; NONCE_SIZE]>,
        public_key: Option<[u8; PUBLIC_KEY_SIZE]>,
        signature: [u8; SIGNATURE_SIZE],
        message: Vec<u8>,
    ) -> Self {
        Self {
            nonce,
            public_key,
            signature,
            message,
        }
    }

    /// Build a plaintext envelope signed by `key`.
    pub fn signed(message: impl Into<Vec<u8>>, key: &SecretKey) -> Self {
        let message = message.into();
        let signature = key.sign(&message).to_bytes();
        Self::new(None, None, signature, message)
    }

    pub fn nonce(&self) -> Option<&[u8; NONCE_SIZE]> {
        self.nonce.as_ref()
    }

    pub fn public_key(&self) -> Option<&[u8; PUBLIC_KEY_SIZE]> {
        self.public_key.as_ref()
    }

    pub fn signature(&self) -> &[u8; SIGNATURE_SIZE] {
        &self.signature
    }

    pub fn message(&self) -> &[u8] {
        &self.message
    }

    /// A zero-length nonce marks the message as readable by the service.
    pub fn is_plaintext(&self) -> bool {
        self.nonce.is_none()
    }

    pub fn verify(&self, key: &PublicKey) -> bool {
        key.verify_bytes(&self.message, &self.signature)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        let mut reader = Reader { bytes, pos: 0 };

        let version = reader.byte()?;
        if version != ENVELOPE_VERSION {
            return Err(EnvelopeError::Version(version));
        }

        let nonce_len = reader.byte()?;
        let nonce = match nonce_len as usize {
            0 => None,
            NONCE_SIZE => Some(reader.array::<NONCE_SIZE>()?),
            _ => return Err(EnvelopeError::NonceLength(nonce_len)),
        };

        let key_len = reader.byte()?;
        let public_key = match key_len as usize {
            0 => None,
            PUBLIC_KEY_SIZE => Some(reader.array::<PUBLIC_KEY_SIZE>()?),
            _ => return Err(EnvelopeError::PublicKeyLength(key_len)),
        };

        let sig_len = reader.byte()?;
        if sig_len as usize != SIGNATURE_SIZE {
            return Err(EnvelopeError::SignatureLength(sig_len));
        }
        let signature = reader.array::<SIGNATURE_SIZE>()?;

        Ok(Self {
            nonce,
            public_key,
            signature,
            message: reader.rest().to_vec(),
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let nonce_len = self.nonce.map_or(0, |n| n.len());
        let key_len = self.public_key.map_or(0, |k| k.len());
        let mut out =
            Vec::with_capacity(4 + nonce_len + key_len + SIGNATURE_SIZE + self.message.len());

        out.push(ENVELOPE_VERSION);
        out.push(nonce_len as u8);
        if let Some(nonce) = &self.nonce {
            out.extend_from_slice(nonce);
        }
        out.push(key_len as u8);
        if let Some(key) = &self.public_key {
            out.extend_from_slice(key);
        }
        out.push(SIGNATURE_SIZE as u8);
        out.extend_from_slice(&self.signature);
        out.extend_from_slice(&self.message);
        out
    }

    /// Decode from the base64 text form used on the wire.
    pub fn from_text(text: &str) -> Result<Self, EnvelopeError> {
        let bytes = decode_bin(text).map_err(|e| EnvelopeError::Encoding(e.to_string()))?;
        Self::decode(&bytes)
    }

    pub fn to_text(&self) -> String {
        encode_bin(self.encode())
    }
}

/// Decode `text` as an envelope and check it is signed by `key`.
///
/// Any failure along the way, bad base64, a malformed layout or a bad
/// signature, is simply `false`.
pub fn validate_signed(text: &str, key: &PublicKey) -> bool {
    Envelope::from_text(text)
        .map(|envelope| envelope.verify(key))
        .unwrap_or(false)
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn byte(&mut self) -> Result<u8, EnvelopeError> {
        let b = *self.bytes.get(self.pos).ok_or(EnvelopeError::Truncated)?;
        self.pos += 1;
        Ok(b)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], EnvelopeError> {
        let end = self.pos + N;
        let slice = self
            .bytes
            .get(self.pos..end)
            .ok_or(EnvelopeError::Truncated)?;
        self.pos = end;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    fn rest(&self) -> &'a [u8] {
        &self.bytes[self.pos..]
    }
}

//! Escrow records and their storage layout.
//!
//! ```text
//! secrets/<secretId>                  body: encrypted data, metadata: packed SecretRecord
//! caretakers/<secretId>/<caretakerId> body: CaretakerRecord JSON
//! ```

mod caretaker;
mod secret;

pub use caretaker::{
    AddressRecord, AddressType, AddressView, CaretakerRecord, CaretakerView, UnlockGate,
};
pub use secret::{RecordError, SecretRecord, SecretView, SECRET_VERSION};

use crate::encoding::{decode_bin, encode_bin};

pub const SECRET_ID_SIZE: usize = 16;

/// A fresh random secret id, 16 bytes in unpadded URL-safe base64.
pub fn generate_secret_id() -> String {
    let mut bytes = [0u8; SECRET_ID_SIZE];
    getrandom::getrandom(&mut bytes).expect("failed to generate random bytes");
    encode_bin(bytes)
}

/// Whether `id` has the shape of an id produced by [`generate_secret_id`].
pub fn is_valid_secret_id(id: &str) -> bool {
    decode_bin(id).is_ok_and(|bytes| bytes.len() == SECRET_ID_SIZE)
}

pub fn secret_key(secret_id: &str) -> String {
    format!("secrets/{}", secret_id)
}

pub fn caretaker_prefix(secret_id: &str) -> String {
    format!("caretakers/{}/", secret_id)
}

pub fn caretaker_key(secret_id: &str, caretaker_id: &str) -> String {
    format!("{}{}", caretaker_prefix(secret_id), caretaker_id)
}

/**
 * Cryptographic types and operations.
 *  - Ed25519 public and private keys
 *  - The signed envelope codec
 *  - SHA-512 commitments
 */
pub mod crypto;
/**
 * Unpadded URL-safe base64, the text form
 *  of every binary value on the wire.
 */
pub mod encoding;
/**
 * Escrow records (secrets and caretakers),
 *  their storage keys and the views returned
 *  to callers.
 */
pub mod model;
/**
 * Time-windowed proofs that a request was
 *  signed by the holder of a given key.
 */
pub mod ownership;
/**
 * Helper for setting build version information
 *  at compile time.
 */
pub mod version;

pub mod prelude {
    pub use crate::crypto::{validate_signed, Digest, Envelope, PublicKey, SecretKey};
    pub use crate::encoding::{decode_bin, encode_bin};
    pub use crate::model::{CaretakerRecord, CaretakerView, SecretRecord, SecretView, UnlockGate};
    pub use crate::ownership::{
        verify_ownership, OwnerKeyCandidate, OwnershipAssertion, OwnershipError, OWNERSHIP_HEADER,
    };
    pub use crate::version::BuildInfo;
}

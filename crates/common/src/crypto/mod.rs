//! Cryptographic primitives for the escrow protocol
//!
//! The service never decrypts anything. It only checks signatures and hashes:
//!
//! - **Identity**: Ed25519 keys (`PublicKey`/`SecretKey`) identify owners,
//!   caretakers and unlock attempts.
//! - **Envelopes**: every client-authored field is an [`Envelope`] carrying a
//!   detached signature over its (possibly encrypted) message.
//! - **Commitments**: SHA-512 [`Digest`]s stand in for values the service must
//!   be able to check but never learn, such as data keys and addresses.

mod digest;
mod envelope;
mod keys;

pub use digest::{Digest, DIGEST_SIZE};
pub use ed25519_dalek::Signature;
pub use envelope::{validate_signed, Envelope, EnvelopeError, ENVELOPE_VERSION, NONCE_SIZE};
pub use keys::{KeyError, PublicKey, SecretKey, PUBLIC_KEY_SIZE, SIGNATURE_SIZE};

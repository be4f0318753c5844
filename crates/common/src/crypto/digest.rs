use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest as _, Sha512};

use crate::encoding::{decode_bin_exact, encode_bin, EncodingError};

pub const DIGEST_SIZE: usize = 64;

/// A SHA-512 digest.
///
/// Used for the commitments the escrow protocol stores instead of the
/// values themselves: `dataKeyDigest`, `addressKeyDigest` and every
/// address record's `addressDigest`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest([u8; DIGEST_SIZE]);

impl Digest {
    /// Hash arbitrary bytes.
    pub fn of(data: impl AsRef<[u8]>) -> Self {
        let mut out = [0u8; DIGEST_SIZE];
        out.copy_from_slice(&Sha512::digest(data.as_ref()));
        Self(out)
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_SIZE] {
        &self.0
    }
}

impl From<[u8; DIGEST_SIZE]> for Digest {
    fn from(bytes: [u8; DIGEST_SIZE]) -> Self {
        Self(bytes)
    }
}

impl FromStr for Digest {
    type Err = EncodingError;
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        decode_bin_exact::<DIGEST_SIZE>(text).map(Self)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode_bin(self.0))
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self)
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

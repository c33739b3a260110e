//! Content fingerprints.
//!
//! A [`Fingerprint`] is the BLAKE3 hash of an object's serialized content. Two
//! objects with the same fingerprint are the same object, which is what makes
//! puts idempotent and lets replicas converge without ordering writes.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Size of a fingerprint in bytes.
pub const FINGERPRINT_LEN: usize = 32;

/// Error returned when parsing a hex-encoded identifier fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FingerprintParseError {
    #[error("invalid hex: {0}")]
    InvalidHex(String),
    #[error("expected {FINGERPRINT_LEN} bytes, got {0}")]
    InvalidLength(usize),
}

/// Implements hex display, parsing and serde for a 32-byte hash newtype.
///
/// Human-readable formats (JSON, TOML) see a hex string, binary formats see
/// the raw bytes.
macro_rules! impl_hash_newtype {
    ($name:ident) => {
        impl $name {
            /// Wrap raw hash bytes.
            pub const fn new(bytes: [u8; $crate::fingerprint::FINGERPRINT_LEN]) -> Self {
                Self(bytes)
            }

            /// Raw hash bytes.
            pub const fn as_bytes(&self) -> &[u8; $crate::fingerprint::FINGERPRINT_LEN] {
                &self.0
            }

            /// First 8 hex characters, for log lines.
            pub fn short(&self) -> String {
                hex::encode(&self.0[..4])
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&hex::encode(self.0))
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", stringify!($name), self.short())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::fingerprint::FingerprintParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $crate::fingerprint::decode_hash(s).map(Self)
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                $crate::fingerprint::serialize_hash(&self.0, serializer)
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                $crate::fingerprint::deserialize_hash(deserializer).map(Self)
            }
        }
    };
}

pub(crate) use impl_hash_newtype;

/// Content fingerprint of a [`RepositoryObject`](crate::RepositoryObject).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; FINGERPRINT_LEN]);

impl_hash_newtype!(Fingerprint);

impl Fingerprint {
    /// Fingerprint of an object's content.
    ///
    /// Every field is length-prefixed so that `("ab", "c")` and `("a", "bc")`
    /// hash differently.
    pub fn of(repo: &str, path: &str, payload: &[u8]) -> Self {
        let mut hasher = blake3::Hasher::new();
        for field in [repo.as_bytes(), path.as_bytes(), payload] {
            hasher.update(&(field.len() as u64).to_le_bytes());
            hasher.update(field);
        }
        Self(*hasher.finalize().as_bytes())
    }
}

pub(crate) fn decode_hash(s: &str) -> Result<[u8; FINGERPRINT_LEN], FingerprintParseError> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(s).map_err(|e| FingerprintParseError::InvalidHex(e.to_string()))?;
    let len = bytes.len();
    bytes
        .try_into()
        .map_err(|_| FingerprintParseError::InvalidLength(len))
}

pub(crate) fn serialize_hash<S: Serializer>(
    bytes: &[u8; FINGERPRINT_LEN],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    if serializer.is_human_readable() {
        serializer.serialize_str(&hex::encode(bytes))
    } else {
        bytes.serialize(serializer)
    }
}

pub(crate) fn deserialize_hash<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<[u8; FINGERPRINT_LEN], D::Error> {
    if deserializer.is_human_readable() {
        let s = String::deserialize(deserializer)?;
        decode_hash(&s).map_err(serde::de::Error::custom)
    } else {
        <[u8; FINGERPRINT_LEN]>::deserialize(deserializer)
    }
}

use crate::hash::error::HashError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Digest algorithms a manifest may name for its files.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(try_from = "String", into = "&'static str")]
pub enum HashAlgorithm {
    /// No verification; the digest is always empty.
    #[default]
    None,
    Sha256,
    Blake3,
}

impl HashAlgorithm {
    /// Fixed digest length in bytes.
    pub fn digest_len(self) -> usize {
        match self {
            HashAlgorithm::None => 0,
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Blake3 => 32,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HashAlgorithm::None => "none",
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Blake3 => "blake3",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(HashAlgorithm::None),
            "sha256" => Ok(HashAlgorithm::Sha256),
            "blake3" => Ok(HashAlgorithm::Blake3),
            _ => Err(HashError::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

impl TryFrom<String> for HashAlgorithm {
    type Error = HashError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HashAlgorithm> for &'static str {
    fn from(algorithm: HashAlgorithm) -> Self {
        algorithm.as_str()
    }
}

/// Expected content digest of a file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct HashDescriptor {
    pub algorithm: HashAlgorithm,
    #[serde(with = "hex_digest")]
    pub digest: Vec<u8>,
}

impl HashDescriptor {
    pub fn new(algorithm: HashAlgorithm, digest: Vec<u8>) -> Self {
        Self { algorithm, digest }
    }

    /// Descriptor that disables verification.
    pub fn none() -> Self {
        Self::default()
    }

    /// Digest length agrees with the algorithm.
    pub fn is_well_formed(&self) -> bool {
        self.digest.len() == self.algorithm.digest_len()
    }

    pub fn digest_hex(&self) -> String {
        hex::encode_upper(&self.digest)
    }

    /// Whether `actual` is the digest this descriptor expects.
    pub fn matches(&self, actual: &[u8]) -> bool {
        self.digest.as_slice() == actual
    }
}

impl fmt::Display for HashDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.digest_hex())
    }
}

mod hex_digest {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(digest: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode_upper(digest))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        hex::decode(&text).map_err(serde::de::Error::custom)
    }
}

use crate::error::{Error, Result};
use crate::types::Role;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

static SHA256_DIGEST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^sha256:[a-f0-9]{64}$").expect("digest regex is valid"));

/// Name of the only hash algorithm targets are accepted for
pub const SHA256: &str = "sha256";

/// Length in bytes of a sha256 hash
const SHA256_LEN: usize = 32;

/// A sha256 content digest, always rendered as `sha256:<hex>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Digest(String);

impl Digest {
    /// Parse a `sha256:<64 lowercase hex>` digest string
    pub fn parse(s: &str) -> Result<Self> {
        if SHA256_DIGEST_RE.is_match(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(Error::invalid_digest(s))
        }
    }

    /// Build a digest from raw sha256 hash bytes
    pub fn from_sha256_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != SHA256_LEN {
            return Err(Error::UnsupportedHash);
        }
        Ok(Self(format!("{}:{}", SHA256, hex::encode(bytes))))
    }

    /// Hash algorithm name
    pub fn algorithm(&self) -> &str {
        SHA256
    }

    /// Hex-encoded hash, without the algorithm prefix
    pub fn hex(&self) -> &str {
        &self.0[SHA256.len() + 1..]
    }

    /// Raw hash bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        // The constructor only admits valid hex.
        hex::decode(self.hex()).unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Digest {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Digest> for String {
    fn from(digest: Digest) -> Self {
        digest.0
    }
}

/// A signed tag: the name a human uses, the digest it is bound to, and the
/// size of the referenced manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    name: String,
    digest: Digest,
    size: i64,
}

impl Target {
    pub fn new(name: impl Into<String>, digest: Digest, size: i64) -> Self {
        Self {
            name: name.into(),
            digest,
            size,
        }
    }

    /// Tag name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn digest(&self) -> &Digest {
        &self.digest
    }

    /// Manifest size in bytes
    pub fn size(&self) -> i64 {
        self.size
    }

    /// The record form handed to a trust repository when adding this target
    pub fn to_record(&self) -> TargetRecord {
        TargetRecord::new(self.name.clone(), self.size)
            .with_hash(SHA256, self.digest.to_bytes())
    }
}

/// Target payload as stored in trust metadata: hashes keyed by algorithm name
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TargetRecord {
    pub name: String,
    pub hashes: BTreeMap<String, Vec<u8>>,
    pub length: i64,
}

impl TargetRecord {
    pub fn new(name: impl Into<String>, length: i64) -> Self {
        Self {
            name: name.into(),
            hashes: BTreeMap::new(),
            length,
        }
    }

    /// Add a raw hash for the given algorithm
    pub fn with_hash(mut self, algorithm: impl Into<String>, hash: Vec<u8>) -> Self {
        self.hashes.insert(algorithm.into(), hash);
        self
    }
}

/// A target record together with the role whose metadata signed it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTargetRecord {
    pub target: TargetRecord,
    pub role: Role,
}

impl SignedTargetRecord {
    pub fn new(target: TargetRecord, role: Role) -> Self {
        Self { target, role }
    }
}

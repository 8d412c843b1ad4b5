use serde::{Deserialize, Serialize};
use std::fmt;

/// A level of signing authority in the trust hierarchy.
///
/// Only [`Role::Targets`] and [`Role::Releases`] are authoritative for tag
/// resolution; every other delegation is ignored even when validly signed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    /// `root`
    Root,
    /// `snapshot`, managed by the trust server when bootstrapped by this client
    Snapshot,
    /// `timestamp`
    Timestamp,
    /// Top-level `targets`
    Targets,
    /// The `targets/releases` delegation
    Releases,
    /// Any other delegation, e.g. `targets/qa`
    Delegation(String),
}

impl Role {
    /// Roles consulted when resolving a tag, in priority order
    pub const AUTHORITATIVE: [Role; 2] = [Role::Releases, Role::Targets];

    pub fn parse(name: &str) -> Self {
        match name {
            "root" => Self::Root,
            "snapshot" => Self::Snapshot,
            "timestamp" => Self::Timestamp,
            "targets" => Self::Targets,
            "targets/releases" => Self::Releases,
            other => Self::Delegation(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Root => "root",
            Self::Snapshot => "snapshot",
            Self::Timestamp => "timestamp",
            Self::Targets => "targets",
            Self::Releases => "targets/releases",
            Self::Delegation(name) => name,
        }
    }

    /// Whether targets signed by this role may bind a tag to a digest
    pub fn is_authoritative(&self) -> bool {
        match self {
            Self::Targets | Self::Releases => true,
            Self::Root | Self::Snapshot | Self::Timestamp | Self::Delegation(_) => false,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Role {
    fn from(name: String) -> Self {
        Self::parse(&name)
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

/// Key type used when the key service creates a new key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum KeyAlgorithm {
    #[default]
    Ecdsa,
    Ed25519,
    Rsa,
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ecdsa => f.write_str("ecdsa"),
            Self::Ed25519 => f.write_str("ed25519"),
            Self::Rsa => f.write_str("rsa"),
        }
    }
}

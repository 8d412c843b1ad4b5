//! Error types for tagtrust-core

use thiserror::Error;

/// Result type alias using tagtrust-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by a trust repository collaborator.
///
/// The variant is the error *kind*; it survives wrapping in [`Error::Repository`]
/// and [`Error::Signing`] so callers can still branch on it.
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// The repository exists remotely but has never been initialized
    #[error("repository has not been initialized")]
    NotInitialized,

    /// The repository does not exist on the trust server
    #[error("repository does not exist")]
    NotExist,

    /// No target with this name in the requested roles
    #[error("no trust data for {0}")]
    NoSuchTarget(String),

    /// Metadata file missing on the server
    #[error("trust metadata not found: {0}")]
    MetadataNotFound(String),

    /// Metadata has expired
    #[error("trust metadata expired: {0}")]
    Expired(String),

    /// Signing key missing from the local key store
    #[error("signing key not found: {0}")]
    KeyNotFound(String),

    /// Could not reach the trust server
    #[error("network error: {0}")]
    Network(String),

    /// Not enough valid signatures could be produced
    #[error("insufficient signatures: {0}")]
    InsufficientSignatures(String),

    /// Signature or root validation failed
    #[error("validation failed: {0}")]
    ValidationFailed(String),

    /// Any other collaborator failure
    #[error(transparent)]
    Remote(#[from] anyhow::Error),
}

impl RepositoryError {
    /// Whether this error means the repository must be bootstrapped
    pub fn needs_bootstrap(&self) -> bool {
        matches!(self, Self::NotInitialized | Self::NotExist)
    }

    /// Render with the repository name, giving the user something to act on.
    pub fn describe(&self, repository: &str) -> String {
        match self {
            Self::NotInitialized => {
                format!("Error: remote repository {} does not have trust data", repository)
            }
            Self::NotExist => format!(
                "Error: remote trust data does not exist for {}: {}",
                repository, self
            ),
            Self::NoSuchTarget(tag) => format!("No valid trust data for {}", tag),
            Self::MetadataNotFound(_) => format!(
                "Error: trust data missing for remote repository {} or remote repository not found: {}",
                repository, self
            ),
            Self::Expired(_) => format!(
                "Error: remote repository {} out-of-date: {}",
                repository, self
            ),
            Self::KeyNotFound(_) => format!(
                "Error: signing keys for remote repository {} not found: {}",
                repository, self
            ),
            Self::Network(_) => format!("Error: error contacting trust server: {}", self),
            Self::InsufficientSignatures(_) => format!(
                "Error: could not produce valid signature for {}: {}",
                repository, self
            ),
            Self::ValidationFailed(_) => format!(
                "Warning: potential malicious behavior - trust data has insufficient signatures for remote repository {}: {}",
                repository, self
            ),
            Self::Remote(err) => format!("{}: {:#}", repository, err),
        }
    }
}

/// Core error types for tagtrust
#[derive(Error, Debug)]
pub enum Error {
    /// A signed target carries no sha256 hash
    #[error("no valid hash, expecting sha256")]
    UnsupportedHash,

    /// More than one push result was reported for a single push
    #[error("internal error: only one push result expected per trusted push")]
    MultipleTargets,

    /// The push stream never reported a usable target
    #[error("no targets found, provide a specific tag in order to sign it")]
    NoTargetFound,

    /// Bare listing found nothing in an authoritative role
    #[error("{repository}: No trusted tags for {repository}")]
    NoTrustedTags { repository: String },

    /// The tag exists only outside the authoritative roles, or not at all
    #[error("{repository}: No trust data for {tag}")]
    NoTrustData { repository: String, tag: String },

    /// A trusted tag whose signed record cannot be used
    #[error("{repository}:{tag}: {source}")]
    InvalidTarget {
        repository: String,
        tag: String,
        #[source]
        source: Box<Error>,
    },

    /// Trust repository failure, wrapped with the repository name
    #[error("{}", .source.describe(.repository))]
    Repository {
        repository: String,
        #[source]
        source: RepositoryError,
    },

    /// Any key creation, initialization, add, or publish failure during commit
    #[error("{}", signing_message(.repository, .tag, .source))]
    Signing {
        repository: String,
        tag: String,
        #[source]
        source: RepositoryError,
    },

    /// Bootstrap needed a new root key but generation is disabled
    #[error("no root key available for {repository} and root key generation is disabled")]
    RootKeyGenerationDisabled { repository: String },

    /// The trust repository handle could not be opened
    #[error("error establishing connection to trust repository")]
    Connection(#[source] anyhow::Error),

    /// Malformed image reference
    #[error("invalid reference format \"{reference}\": {reason}")]
    InvalidReference { reference: String, reason: String },

    /// Malformed content digest
    #[error("invalid digest: {digest}")]
    InvalidDigest { digest: String },

    /// Transfer or display collaborator failure, passed through
    #[error(transparent)]
    Transfer(anyhow::Error),

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn signing_message(repository: &str, tag: &str, source: &RepositoryError) -> String {
    format!(
        "failed to sign {}:{}: {}",
        repository,
        tag,
        source.describe(repository)
    )
}

impl Error {
    /// Wrap a trust repository error with the repository name
    pub fn repository(repository: impl Into<String>, source: RepositoryError) -> Self {
        Self::Repository {
            repository: repository.into(),
            source,
        }
    }

    /// Wrap a commit failure as a signing error scoped to `repository:tag`
    pub fn signing(
        repository: impl Into<String>,
        tag: impl Into<String>,
        source: impl Into<RepositoryError>,
    ) -> Self {
        Self::Signing {
            repository: repository.into(),
            tag: tag.into(),
            source: source.into(),
        }
    }

    /// Create a no trusted tags error
    pub fn no_trusted_tags(repository: impl Into<String>) -> Self {
        Self::NoTrustedTags {
            repository: repository.into(),
        }
    }

    /// Create a no trust data error
    pub fn no_trust_data(repository: impl Into<String>, tag: impl Into<String>) -> Self {
        Self::NoTrustData {
            repository: repository.into(),
            tag: tag.into(),
        }
    }

    /// Scope a target conversion failure to `repository:tag`
    pub fn invalid_target(
        repository: impl Into<String>,
        tag: impl Into<String>,
        source: Error,
    ) -> Self {
        Self::InvalidTarget {
            repository: repository.into(),
            tag: tag.into(),
            source: Box::new(source),
        }
    }

    /// Create an invalid reference error
    pub fn invalid_reference(reference: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidReference {
            reference: reference.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid digest error
    pub fn invalid_digest(digest: impl Into<String>) -> Self {
        Self::InvalidDigest {
            digest: digest.into(),
        }
    }

    /// Create a config not found error
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// The trust repository error kind, if this error wraps one
    pub fn repository_error(&self) -> Option<&RepositoryError> {
        match self {
            Self::Repository { source, .. } | Self::Signing { source, .. } => Some(source),
            _ => None,
        }
    }
}

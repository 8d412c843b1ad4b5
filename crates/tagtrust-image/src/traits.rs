//! Collaborator trait definitions
//!
//! Image transfer, progress display, registry authentication and the trust
//! repository itself all live outside this crate. The engine only talks to
//! them through these traits.

use crate::reference::ImageReference;
use crate::types::{Action, AuthConfig, EventStream, JsonMessage, PullOptions, PushOptions};
use anyhow::Result;
use async_trait::async_trait;
use std::io::Write;
use std::sync::Arc;
use tagtrust_core::{KeyAlgorithm, RepositoryError, Role, SignedTargetRecord, TargetRecord};

/// Moves images between the local engine and a registry
#[async_trait]
pub trait ImageTransfer: Send + Sync {
    /// Start pushing `reference`, returning its progress stream
    async fn push(&self, reference: &ImageReference, options: &PushOptions)
        -> Result<EventStream>;

    /// Start pulling `reference`, returning its progress stream
    async fn pull(&self, reference: &ImageReference, options: &PullOptions)
        -> Result<EventStream>;

    /// Tag the local image `source` as `target`
    async fn tag(&self, source: &ImageReference, target: &ImageReference) -> Result<()>;
}

/// Receives auxiliary messages while a stream is displayed
pub trait AuxHandler: Send {
    fn handle(&mut self, message: &JsonMessage);
}

/// Decodes a progress stream and renders it for humans
#[async_trait]
pub trait StreamDisplay: Send + Sync {
    /// Drain `stream`, writing progress to `out`. Auxiliary messages are
    /// handed to `aux` instead of being rendered.
    async fn display(
        &self,
        stream: EventStream,
        out: &mut (dyn Write + Send),
        aux: Option<&mut dyn AuxHandler>,
    ) -> Result<()>;
}

/// Resolves registry credentials for an index
pub trait AuthResolver: Send + Sync {
    fn resolve(&self, registry: &str) -> Result<AuthConfig>;
}

/// Public half of a key created by the key service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    pub id: String,
    pub algorithm: KeyAlgorithm,
}

/// A handle on one repository's signed trust metadata, scoped to a single
/// invocation.
#[async_trait]
pub trait TrustRepository: Send + Sync {
    /// List targets visible in `roles` (all roles when empty), in server order
    async fn list_targets(
        &self,
        roles: &[Role],
    ) -> std::result::Result<Vec<SignedTargetRecord>, RepositoryError>;

    /// Fetch the highest-priority target called `name` from `roles`
    async fn get_target_by_name(
        &self,
        name: &str,
        roles: &[Role],
    ) -> std::result::Result<SignedTargetRecord, RepositoryError>;

    /// Stage `target` in every role of `roles`. An empty slice stages it in
    /// the top-level targets role only.
    async fn add_target(
        &self,
        target: &TargetRecord,
        roles: &[Role],
    ) -> std::result::Result<(), RepositoryError>;

    /// Roles this client currently holds keys for and that may sign `target`
    async fn signable_roles(
        &self,
        target: &TargetRecord,
    ) -> std::result::Result<Vec<Role>, RepositoryError>;

    /// Bind `root_key_ids` to the root role, leaving `remote_roles` to the server
    async fn initialize(
        &self,
        root_key_ids: &[String],
        remote_roles: &[Role],
    ) -> std::result::Result<(), RepositoryError>;

    /// Sign and upload staged changes
    async fn publish(&self) -> std::result::Result<(), RepositoryError>;

    /// Local key IDs held for `role`
    async fn list_keys(&self, role: &Role) -> std::result::Result<Vec<String>, RepositoryError>;

    /// Generate a new key for `role`
    async fn create_key(
        &self,
        role: &Role,
        algorithm: KeyAlgorithm,
    ) -> std::result::Result<PublicKey, RepositoryError>;
}

/// Opens trust repository handles
#[async_trait]
pub trait TrustRepositoryFactory: Send + Sync {
    /// Open the trust data for `reference` held by the trust server at `server`
    async fn open(
        &self,
        server: &str,
        reference: &ImageReference,
        auth: &AuthConfig,
        actions: &[Action],
    ) -> Result<Arc<dyn TrustRepository>>;
}

/// Outcome of listing targets, split by what the publisher does next
#[derive(Debug)]
pub enum TargetListing {
    /// Repository exists and its latest metadata was fetched
    Listed(Vec<SignedTargetRecord>),
    /// Repository was never initialized
    NotInitialized,
    /// Repository is unknown to the trust server
    NotExist,
    /// Any other failure
    Failed(RepositoryError),
}

impl From<std::result::Result<Vec<SignedTargetRecord>, RepositoryError>> for TargetListing {
    fn from(result: std::result::Result<Vec<SignedTargetRecord>, RepositoryError>) -> Self {
        match result {
            Ok(records) => Self::Listed(records),
            Err(RepositoryError::NotInitialized) => Self::NotInitialized,
            Err(RepositoryError::NotExist) => Self::NotExist,
            Err(other) => Self::Failed(other),
        }
    }
}

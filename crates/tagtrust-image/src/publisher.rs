//! Signed push publication
//!
//! A trusted push is published in two phases. [`UploadCapture`] watches the
//! push progress stream for the single push result naming the uploaded tag,
//! then [`Publisher::commit`] adds that target to the trust repository and
//! publishes it, bootstrapping the repository first if it has no trust data.

use crate::traits::{AuxHandler, TargetListing, TrustRepository};
use crate::types::{JsonMessage, PushResult};
use std::io::Write;
use std::sync::Arc;
use tagtrust_core::{Digest, Error, KeyAlgorithm, RepositoryError, Result, Role, Target};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Candidate {
    /// Nothing usable seen yet
    Empty,
    /// Exactly one push result with a tag and a valid digest
    Captured(Target),
    /// A second auxiliary message arrived; nothing may be signed
    Invalidated,
}

/// Accumulates the push result from a push progress stream.
///
/// Only one auxiliary message is expected per push. Any further call
/// invalidates the candidate for good, and [`UploadCapture::finish`] then
/// reports [`Error::MultipleTargets`].
#[derive(Debug)]
pub struct UploadCapture {
    calls: usize,
    candidate: Candidate,
}

impl Default for UploadCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadCapture {
    pub fn new() -> Self {
        Self {
            calls: 0,
            candidate: Candidate::Empty,
        }
    }

    /// Number of auxiliary messages seen
    pub fn calls(&self) -> usize {
        self.calls
    }

    /// The captured target, once the stream has been drained
    pub fn finish(self) -> Result<Target> {
        match self.candidate {
            _ if self.calls > 1 => Err(Error::MultipleTargets),
            Candidate::Invalidated => Err(Error::MultipleTargets),
            Candidate::Empty => Err(Error::NoTargetFound),
            Candidate::Captured(target) => Ok(target),
        }
    }
}

impl AuxHandler for UploadCapture {
    fn handle(&mut self, message: &JsonMessage) {
        self.calls += 1;
        if self.calls > 1 {
            self.candidate = Candidate::Invalidated;
            return;
        }

        let Some(aux) = &message.aux else {
            return;
        };
        let result: PushResult = match serde_json::from_value(aux.clone()) {
            Ok(result) => result,
            Err(e) => {
                debug!("Auxiliary message is not a push result: {}", e);
                return;
            }
        };
        if result.tag.is_empty() {
            return;
        }
        match Digest::parse(&result.digest) {
            Ok(digest) => {
                self.candidate = Candidate::Captured(Target::new(result.tag, digest, result.size));
            }
            Err(e) => debug!("Ignoring push result for {}: {}", result.tag, e),
        }
    }
}

/// Commits targets to one trust repository
pub struct Publisher {
    repository: Arc<dyn TrustRepository>,
    name: String,
    allow_root_key_generation: bool,
}

impl Publisher {
    /// `name` is the repository name used in messages and errors
    pub fn new(repository: Arc<dyn TrustRepository>, name: impl Into<String>) -> Self {
        Self {
            repository,
            name: name.into(),
            allow_root_key_generation: true,
        }
    }

    /// Whether bootstrap may generate a root key when none exists locally
    pub fn with_root_key_generation(mut self, allow: bool) -> Self {
        self.allow_root_key_generation = allow;
        self
    }

    /// Add `target` under `tag` and publish.
    ///
    /// Nothing is retried. A failure after the add leaves the change staged
    /// but unpublished.
    pub async fn commit(
        &self,
        target: &Target,
        tag: &str,
        out: &mut (dyn Write + Send),
    ) -> Result<()> {
        let record = target.to_record();

        // Latest metadata tells us whether the repository exists and which roles can sign
        let listing = TargetListing::from(self.repository.list_targets(&[]).await);

        let added = match listing {
            TargetListing::NotInitialized | TargetListing::NotExist => {
                debug!("{} has no trust data, bootstrapping", self.name);
                let root_key_id = self.select_root_key(tag).await?;

                self.repository
                    .initialize(&[root_key_id], &[Role::Snapshot])
                    .await
                    .map_err(|e| Error::signing(&self.name, tag, e))?;
                info!("Initialized trust repository {}", self.name);
                writeln!(out, "Finished initializing {:?}", self.name)?;

                self.repository.add_target(&record, &[Role::Targets]).await
            }
            TargetListing::Listed(existing) => {
                debug!(
                    "{} already has {} signed targets, signing into all signable roles",
                    self.name,
                    existing.len()
                );
                match self.repository.signable_roles(&record).await {
                    Ok(roles) if roles.is_empty() => {
                        self.repository.add_target(&record, &[Role::Targets]).await
                    }
                    Ok(roles) => self.repository.add_target(&record, &roles).await,
                    Err(e) => Err(e),
                }
            }
            TargetListing::Failed(e) => return Err(Error::repository(&self.name, e)),
        };

        added.map_err(|e| Error::signing(&self.name, tag, e))?;

        self.repository
            .publish()
            .await
            .map_err(|e| Error::signing(&self.name, tag, e))?;

        Ok(())
    }

    /// First local root key by ID, or a freshly generated one
    async fn select_root_key(&self, tag: &str) -> Result<String> {
        let mut keys = self
            .repository
            .list_keys(&Role::Root)
            .await
            .map_err(|e| Error::signing(&self.name, tag, e))?;

        if !keys.is_empty() {
            keys.sort();
            return Ok(keys.swap_remove(0));
        }

        if !self.allow_root_key_generation {
            return Err(Error::RootKeyGenerationDisabled {
                repository: self.name.clone(),
            });
        }

        let key = self
            .repository
            .create_key(&Role::Root, KeyAlgorithm::Ecdsa)
            .await
            .map_err(|e: RepositoryError| Error::signing(&self.name, tag, e))?;
        info!("Generated new root key {} for {}", key.id, self.name);
        Ok(key.id)
    }
}

use crate::convert::convert_target;
use crate::reference::{ImageReference, ReferenceKind};
use crate::traits::TrustRepository;
use std::io::Write;
use std::sync::Arc;
use tagtrust_core::{Error, Result, Role, Target};
use tracing::{debug, trace, warn};

/// Resolves references to the targets signed for them in the top-level
/// `targets` role or the `targets/releases` delegation
pub struct PullResolver {
    repository: Arc<dyn TrustRepository>,
    name: String,
}

impl PullResolver {
    /// Create a new resolver; `name` is the repository name used in errors
    pub fn new(repository: Arc<dyn TrustRepository>, name: impl Into<String>) -> Self {
        Self {
            repository,
            name: name.into(),
        }
    }

    /// Resolve a reference to the targets to pull
    ///
    /// # Arguments
    /// * `reference` - Tagged reference, or a bare repository to list every trusted tag
    /// * `err` - Sink for notices about skipped targets
    ///
    /// # Returns
    /// Targets in the order the trust repository listed them
    pub async fn resolve(
        &self,
        reference: &ImageReference,
        err: &mut (dyn Write + Send),
    ) -> Result<Vec<Target>> {
        match reference.kind() {
            ReferenceKind::Tagged(tag) => Ok(vec![self.resolve_tag(tag).await?]),
            ReferenceKind::Bare => self.resolve_all(reference, err).await,
            ReferenceKind::Digested(digest) => Err(Error::invalid_reference(
                reference.to_string(),
                format!("digest {} cannot be resolved through trust data", digest),
            )),
        }
    }

    /// Resolve a single tag
    pub async fn resolve_tag(&self, tag: &str) -> Result<Target> {
        let record = self
            .repository
            .get_target_by_name(tag, &Role::AUTHORITATIVE)
            .await
            .map_err(|e| Error::repository(&self.name, e))?;

        // A record signed by any other delegation does not count
        if !record.role.is_authoritative() {
            return Err(Error::no_trust_data(&self.name, tag));
        }

        debug!("retrieving target for {} role", record.role);
        convert_target(&record.target).map_err(|e| Error::invalid_target(&self.name, tag, e))
    }

    /// List every trusted tag in the repository
    pub async fn resolve_all(
        &self,
        reference: &ImageReference,
        err: &mut (dyn Write + Send),
    ) -> Result<Vec<Target>> {
        let records = self
            .repository
            .list_targets(&Role::AUTHORITATIVE)
            .await
            .map_err(|e| Error::repository(&self.name, e))?;

        trace!("Trust repository listed {} targets", records.len());

        let mut targets = Vec::new();
        for record in records {
            if !record.role.is_authoritative() {
                trace!(
                    "Ignoring {} signed by delegation {}",
                    record.target.name,
                    record.role
                );
                continue;
            }
            match convert_target(&record.target) {
                Ok(target) => targets.push(target),
                Err(e) => {
                    warn!("Skipping target {}: {}", record.target.name, e);
                    writeln!(err, "Skipping target for {:?}", reference.familiar_name())?;
                }
            }
        }

        if targets.is_empty() {
            return Err(Error::no_trusted_tags(&self.name));
        }

        Ok(targets)
    }
}

//! Read-only lookup of the digest a tag is trusted to point at

use crate::reference::{ImageReference, ReferenceKind};
use crate::resolver::PullResolver;
use crate::traits::TrustRepository;
use std::sync::Arc;
use tagtrust_core::{Digest, Error, Result};

/// Answers "which digest is trusted for this tag" without pulling
pub struct TrustedReferenceResolver {
    resolver: PullResolver,
}

impl TrustedReferenceResolver {
    pub fn new(repository: Arc<dyn TrustRepository>, name: impl Into<String>) -> Self {
        Self {
            resolver: PullResolver::new(repository, name),
        }
    }

    /// The trusted digest for a tagged reference
    pub async fn trusted_digest(&self, reference: &ImageReference) -> Result<Digest> {
        let ReferenceKind::Tagged(tag) = reference.kind() else {
            return Err(Error::invalid_reference(
                reference.to_string(),
                "a tag is required to look up trust data",
            ));
        };
        let target = self.resolver.resolve_tag(tag).await?;
        Ok(target.digest().clone())
    }

    /// The canonical `name@digest` reference a tag is trusted to point at
    pub async fn trusted_reference(&self, reference: &ImageReference) -> Result<ImageReference> {
        let digest = self.trusted_digest(reference).await?;
        Ok(reference.trim().with_digest(&digest))
    }
}

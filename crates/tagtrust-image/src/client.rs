//! Trusted push and pull
//!
//! [`TrustClient`] sequences the transfer collaborator with the trust
//! repository. A push displays the upload, captures the pushed tag and signs
//! it. A pull resolves tags through trust data first and then pulls the
//! exact digests they are signed for, tagging each one locally.
//!
//! Every operation runs on the caller's task. Dropping the returned future
//! cancels at the next collaborator call.

use crate::auth::{encode_auth_config, DockerConfigAuth};
use crate::engine::EngineClient;
use crate::publisher::{Publisher, UploadCapture};
use crate::reference::{ImageReference, ReferenceKind};
use crate::resolver::PullResolver;
use crate::stream::JsonStreamDisplay;
use crate::traits::{
    AuthResolver, ImageTransfer, StreamDisplay, TrustRepository, TrustRepositoryFactory,
};
use crate::trusted::TrustedReferenceResolver;
use crate::types::{Action, AuthConfig, EventStream, PullOptions, PushOptions, Streams};
use std::io::Write;
use std::sync::Arc;
use tagtrust_core::{Digest, Error, Result, TrustConfig};
use tracing::debug;

/// Content trust client for one image engine
pub struct TrustClient {
    transfer: Arc<dyn ImageTransfer>,
    display: Arc<dyn StreamDisplay>,
    factory: Arc<dyn TrustRepositoryFactory>,
    auth: Arc<dyn AuthResolver>,
    config: TrustConfig,
}

impl TrustClient {
    /// Create a client with the default display and credential lookup
    pub fn new(
        transfer: Arc<dyn ImageTransfer>,
        factory: Arc<dyn TrustRepositoryFactory>,
        config: TrustConfig,
    ) -> Self {
        Self {
            transfer,
            display: Arc::new(JsonStreamDisplay::new()),
            factory,
            auth: Arc::new(DockerConfigAuth::from_config(&config)),
            config,
        }
    }

    /// Create a client that talks to the engine named in `config`
    pub fn from_config(
        config: TrustConfig,
        factory: Arc<dyn TrustRepositoryFactory>,
    ) -> anyhow::Result<Self> {
        let engine = EngineClient::from_config(&config)?;
        Ok(Self::new(Arc::new(engine), factory, config))
    }

    /// Replace the progress display
    pub fn with_display(mut self, display: Arc<dyn StreamDisplay>) -> Self {
        self.display = display;
        self
    }

    /// Replace the credential lookup
    pub fn with_auth(mut self, auth: Arc<dyn AuthResolver>) -> Self {
        self.auth = auth;
        self
    }

    pub fn config(&self) -> &TrustConfig {
        &self.config
    }

    /// Push `reference` and sign the pushed tag
    pub async fn trusted_push(
        &self,
        reference: &ImageReference,
        streams: &mut Streams,
    ) -> Result<()> {
        let auth = self.resolve_auth(reference)?;
        let options = PushOptions {
            registry_auth: Some(encode_auth_config(&auth).map_err(Error::Transfer)?),
        };

        let stream = self
            .transfer
            .push(reference, &options)
            .await
            .map_err(Error::Transfer)?;

        self.push_trusted_reference(reference, &auth, stream, streams)
            .await
    }

    /// Drain a push stream for `reference` and sign what it uploaded.
    ///
    /// Digest references are only displayed. Bare references are displayed
    /// with a notice that nothing was signed. Tagged references must yield
    /// exactly one push result, which is then committed to the trust
    /// repository.
    pub async fn push_trusted_reference(
        &self,
        reference: &ImageReference,
        auth: &AuthConfig,
        stream: EventStream,
        streams: &mut Streams,
    ) -> Result<()> {
        let tag = match reference.kind() {
            ReferenceKind::Digested(_) => {
                return self
                    .display
                    .display(stream, streams.out(), None)
                    .await
                    .map_err(Error::Transfer);
            }
            ReferenceKind::Bare => {
                self.display
                    .display(stream, streams.out(), None)
                    .await
                    .map_err(Error::Transfer)?;
                writeln!(streams.err(), "No tag specified, skipping trust metadata push")?;
                return Ok(());
            }
            ReferenceKind::Tagged(tag) => tag,
        };

        let mut capture = UploadCapture::new();
        self.display
            .display(stream, streams.out(), Some(&mut capture))
            .await
            .map_err(Error::Transfer)?;
        let target = capture.finish()?;
        debug!("Captured push result {} -> {}", target.name(), target.digest());

        writeln!(streams.out(), "Signing and pushing trust metadata")?;

        let repository = self
            .open(reference, auth, &[Action::Push, Action::Pull])
            .await?;
        Publisher::new(repository, reference.full_name())
            .with_root_key_generation(self.config.allow_root_key_generation)
            .commit(&target, tag, streams.out())
            .await?;

        writeln!(
            streams.out(),
            "Successfully signed {}:{}",
            reference.familiar_name(),
            tag
        )?;
        Ok(())
    }

    /// Pull the digests trust data signs for `reference`, then tag them.
    ///
    /// A tagged reference pulls one image; a bare reference pulls every
    /// trusted tag. Targets are handled one at a time in listing order and
    /// the first failure stops the rest. A digest reference is already
    /// pinned and is pulled without consulting trust data.
    pub async fn trusted_pull(
        &self,
        reference: &ImageReference,
        options: &PullOptions,
        streams: &mut Streams,
    ) -> Result<()> {
        let auth = self.resolve_auth(reference)?;
        let options = PullOptions {
            registry_auth: Some(encode_auth_config(&auth).map_err(Error::Transfer)?),
            all: false,
            ..options.clone()
        };

        if let ReferenceKind::Digested(_) = reference.kind() {
            return self.pull_and_display(reference, &options, streams).await;
        }

        let repository = self.open(reference, &auth, &[Action::Pull]).await?;
        let targets = PullResolver::new(repository, reference.full_name())
            .resolve(reference, streams.err())
            .await?;

        let total = targets.len();
        for (i, target) in targets.iter().enumerate() {
            let display_tag = if target.name().is_empty() {
                String::new()
            } else {
                format!(":{}", target.name())
            };
            writeln!(
                streams.out(),
                "Pull ({} of {}): {}{}@{}",
                i + 1,
                total,
                reference.familiar_name(),
                display_tag,
                target.digest()
            )?;

            let trusted = reference.trim().with_digest(target.digest());
            self.pull_and_display(&trusted, &options, streams).await?;

            let tagged = reference.trim().with_tag(target.name())?;
            self.tag_trusted(&trusted, &tagged, streams.err()).await?;
        }

        Ok(())
    }

    /// Tag a pulled `name@digest` image with its human tag
    pub async fn tag_trusted(
        &self,
        trusted: &ImageReference,
        tagged: &ImageReference,
        err: &mut (dyn Write + Send),
    ) -> Result<()> {
        writeln!(err, "Tagging {} as {}", trusted, tagged)?;
        self.transfer
            .tag(trusted, tagged)
            .await
            .map_err(Error::Transfer)
    }

    /// The digest trust data signs for a tagged reference
    pub async fn trusted_digest(&self, reference: &ImageReference) -> Result<Digest> {
        self.trusted_resolver(reference)
            .await?
            .trusted_digest(reference)
            .await
    }

    /// The canonical `name@digest` reference for a tagged reference
    pub async fn trusted_reference(&self, reference: &ImageReference) -> Result<ImageReference> {
        self.trusted_resolver(reference)
            .await?
            .trusted_reference(reference)
            .await
    }

    async fn trusted_resolver(
        &self,
        reference: &ImageReference,
    ) -> Result<TrustedReferenceResolver> {
        let auth = self.resolve_auth(reference)?;
        let repository = self.open(reference, &auth, &[Action::Pull]).await?;
        Ok(TrustedReferenceResolver::new(
            repository,
            reference.full_name(),
        ))
    }

    async fn pull_and_display(
        &self,
        reference: &ImageReference,
        options: &PullOptions,
        streams: &mut Streams,
    ) -> Result<()> {
        let stream = self
            .transfer
            .pull(reference, options)
            .await
            .map_err(Error::Transfer)?;

        let mut sink = std::io::sink();
        let out: &mut (dyn Write + Send) = if options.quiet {
            &mut sink
        } else {
            streams.out()
        };
        self.display
            .display(stream, out, None)
            .await
            .map_err(Error::Transfer)
    }

    fn resolve_auth(&self, reference: &ImageReference) -> Result<AuthConfig> {
        self.auth
            .resolve(&reference.registry)
            .map_err(Error::Transfer)
    }

    async fn open(
        &self,
        reference: &ImageReference,
        auth: &AuthConfig,
        actions: &[Action],
    ) -> Result<Arc<dyn TrustRepository>> {
        let server = self.config.trust_server_for(&reference.registry)?;
        debug!(
            "Opening trust repository for {} at {} ({:?})",
            reference.full_name(),
            server,
            actions
        );
        self.factory
            .open(&server, reference, auth, actions)
            .await
            .map_err(Error::Connection)
    }
}

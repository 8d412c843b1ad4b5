//! Content trust for container images
//!
//! This crate provides functionality for:
//! - Resolving tags to the digests signed for them in the `targets` role or
//!   the `targets/releases` delegation
//! - Capturing the tag a push uploaded and publishing a signature for it,
//!   bootstrapping the trust repository on first use
//! - Pulling by trusted digest and re-tagging the result locally
//! - Default collaborators: an image engine HTTP client, a progress stream
//!   display and `config.json` credential lookup
//!
//! The trust repository itself is a collaborator supplied through
//! [`TrustRepositoryFactory`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tagtrust_core::TrustConfig;
//! use tagtrust_image::{ImageReference, Streams, TrustClient, TrustRepositoryFactory};
//!
//! async fn push(factory: Arc<dyn TrustRepositoryFactory>) -> anyhow::Result<()> {
//!     let config = TrustConfig::load(None)?;
//!     let client = TrustClient::from_config(config, factory)?;
//!
//!     let reference = ImageReference::parse("myorg/app:v1")?;
//!     client.trusted_push(&reference, &mut Streams::stdio()).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod convert;
pub mod engine;
pub mod publisher;
pub mod reference;
pub mod resolver;
pub mod stream;
pub mod traits;
pub mod trusted;
pub mod types;

// Re-export main types for convenience
pub use auth::{encode_auth_config, DockerConfigAuth};
pub use client::TrustClient;
pub use convert::convert_target;
pub use engine::EngineClient;
pub use publisher::{Publisher, UploadCapture};
pub use reference::{ImageReference, ReferenceKind};
pub use resolver::PullResolver;
pub use stream::JsonStreamDisplay;
pub use traits::{
    AuthResolver, AuxHandler, ImageTransfer, PublicKey, StreamDisplay, TargetListing,
    TrustRepository, TrustRepositoryFactory,
};
pub use trusted::TrustedReferenceResolver;
pub use types::{
    Action, AuthConfig, EventStream, JsonMessage, PullOptions, PushOptions, PushResult, Streams,
};

/// Version of the tagtrust-image crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

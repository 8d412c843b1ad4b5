//! Core library for tagtrust
//!
//! Shared by every tagtrust crate:
//! - The target model: `(name, digest, size)` triples bound by signed trust metadata
//! - Signing roles and which of them this client treats as authoritative
//! - The error taxonomy for pull resolution and push publication
//! - Configuration loading

pub mod config;
pub mod error;
pub mod types;

pub use config::TrustConfig;
pub use error::{Error, RepositoryError, Result};
pub use types::{Digest, KeyAlgorithm, Role, SignedTargetRecord, Target, TargetRecord};

/// Version of the tagtrust-core crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

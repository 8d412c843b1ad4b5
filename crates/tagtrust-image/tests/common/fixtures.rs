//! Shared fixtures for trusted push and pull tests

#![allow(dead_code)]

use super::mocks::{MockAuth, MockFactory, MockTransfer, MockTrustRepository, SharedBuffer};
use std::sync::Arc;
use tagtrust_core::types::SHA256;
use tagtrust_core::{Digest, Role, SignedTargetRecord, TargetRecord, TrustConfig};
use tagtrust_image::{AuthConfig, Streams, TrustClient};

/// 64 hex digits made of `c`
pub fn hex_of(c: char) -> String {
    std::iter::repeat_n(c, 64).collect()
}

/// A sha256 digest string made of `c`
pub fn digest_of(c: char) -> String {
    format!("sha256:{}", hex_of(c))
}

/// A signed record for `name` whose sha256 hash is made of `c`
pub fn signed(name: &str, c: char, size: i64, role: Role) -> SignedTargetRecord {
    let digest = Digest::parse(&digest_of(c)).expect("fixture digest is valid");
    SignedTargetRecord::new(
        TargetRecord::new(name, size).with_hash(SHA256, digest.to_bytes()),
        role,
    )
}

/// Push result line the engine emits once a tag is uploaded
pub fn push_result_line(tag: &str, digest: &str, size: i64) -> String {
    format!(
        r#"{{"progressDetail":{{}},"aux":{{"Tag":"{}","Digest":"{}","Size":{}}}}}"#,
        tag, digest, size
    )
}

/// Typical push progress around a push result
pub fn push_lines(results: &[String]) -> Vec<String> {
    let mut lines = vec![
        r#"{"status":"The push refers to repository [docker.io/myorg/app]"}"#.to_string(),
        r#"{"status":"Pushed","progressDetail":{},"id":"5f70bf18a086"}"#.to_string(),
    ];
    lines.extend(results.iter().cloned());
    lines
}

/// Trust config for tests; defaults ignore the environment
pub fn test_config() -> TrustConfig {
    TrustConfig::default()
}

/// Everything a trusted push or pull test inspects afterwards
pub struct Harness {
    pub client: TrustClient,
    pub repository: MockTrustRepository,
    pub factory: MockFactory,
    pub transfer: MockTransfer,
    pub auth: MockAuth,
    pub out: SharedBuffer,
    pub err: SharedBuffer,
}

impl Harness {
    pub fn new(repository: MockTrustRepository, transfer: MockTransfer) -> Self {
        Self::with_config(repository, transfer, test_config())
    }

    pub fn with_config(
        repository: MockTrustRepository,
        transfer: MockTransfer,
        config: TrustConfig,
    ) -> Self {
        let factory = MockFactory::new(repository.clone());
        Self::build(repository, factory, transfer, config)
    }

    pub fn build(
        repository: MockTrustRepository,
        factory: MockFactory,
        transfer: MockTransfer,
        config: TrustConfig,
    ) -> Self {
        let auth = MockAuth::new(AuthConfig {
            username: Some("alice".to_string()),
            password: Some("s3cret".to_string()),
            ..AuthConfig::default()
        });
        let client = TrustClient::new(Arc::new(transfer.clone()), Arc::new(factory.clone()), config)
            .with_auth(Arc::new(auth.clone()));

        Self {
            client,
            repository,
            factory,
            transfer,
            auth,
            out: SharedBuffer::new(),
            err: SharedBuffer::new(),
        }
    }

    /// Streams writing into this harness's buffers
    pub fn streams(&self) -> Streams {
        Streams::new(self.out.clone(), self.err.clone())
    }
}

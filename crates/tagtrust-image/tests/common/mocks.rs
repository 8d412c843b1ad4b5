//! Mock implementations for testing
//!
//! Recording stand-ins for the trust repository, the image engine and the
//! credential store, so trusted push and pull can be exercised without a
//! network.

#![allow(dead_code)]

use async_trait::async_trait;
use futures::stream;
use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, Mutex};
use tagtrust_core::{KeyAlgorithm, RepositoryError, Role, SignedTargetRecord, TargetRecord};
use tagtrust_image::{
    Action, AuthConfig, AuthResolver, EventStream, ImageReference, ImageTransfer, PublicKey,
    PullOptions, PushOptions, TrustRepository, TrustRepositoryFactory,
};

/// Produces the error a mocked step fails with
pub type Failure = Arc<dyn Fn() -> RepositoryError + Send + Sync>;

/// One recorded trust repository call
#[derive(Debug, Clone, PartialEq)]
pub enum RepoCall {
    ListTargets(Vec<Role>),
    GetTargetByName(String, Vec<Role>),
    AddTarget(TargetRecord, Vec<Role>),
    SignableRoles(String),
    Initialize(Vec<String>, Vec<Role>),
    Publish,
    ListKeys(Role),
    CreateKey(Role, KeyAlgorithm),
}

impl RepoCall {
    /// Short name used for ordering assertions
    pub fn name(&self) -> &'static str {
        match self {
            RepoCall::ListTargets(_) => "list_targets",
            RepoCall::GetTargetByName(..) => "get_target_by_name",
            RepoCall::AddTarget(..) => "add_target",
            RepoCall::SignableRoles(_) => "signable_roles",
            RepoCall::Initialize(..) => "initialize",
            RepoCall::Publish => "publish",
            RepoCall::ListKeys(_) => "list_keys",
            RepoCall::CreateKey(..) => "create_key",
        }
    }
}

/// In-memory trust repository that records every call
#[derive(Clone)]
pub struct MockTrustRepository {
    records: Arc<Mutex<Vec<SignedTargetRecord>>>,
    root_keys: Arc<Mutex<Vec<String>>>,
    signable: Arc<Mutex<Vec<Role>>>,
    failures: Arc<Mutex<HashMap<&'static str, Failure>>>,
    calls: Arc<Mutex<Vec<RepoCall>>>,
}

impl Default for MockTrustRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTrustRepository {
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
            root_keys: Arc::new(Mutex::new(Vec::new())),
            signable: Arc::new(Mutex::new(vec![Role::Targets])),
            failures: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Repository that has never been initialized
    pub fn uninitialized() -> Self {
        let repo = Self::new();
        repo.fail("list_targets", || RepositoryError::NotInitialized);
        repo
    }

    /// Repository holding `records`, returned in this order by listings
    pub fn with_records(records: Vec<SignedTargetRecord>) -> Self {
        let repo = Self::new();
        *repo.records.lock().unwrap() = records;
        repo
    }

    /// Make the call named `step` fail
    pub fn fail(
        &self,
        step: &'static str,
        failure: impl Fn() -> RepositoryError + Send + Sync + 'static,
    ) {
        self.failures.lock().unwrap().insert(step, Arc::new(failure));
    }

    /// Set the root key IDs held locally
    pub fn set_root_keys(&self, keys: &[&str]) {
        *self.root_keys.lock().unwrap() = keys.iter().map(|k| k.to_string()).collect();
    }

    /// Set the roles reported as signable
    pub fn set_signable_roles(&self, roles: Vec<Role>) {
        *self.signable.lock().unwrap() = roles;
    }

    pub fn calls(&self) -> Vec<RepoCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Names of recorded calls, in order
    pub fn call_names(&self) -> Vec<&'static str> {
        self.calls().iter().map(RepoCall::name).collect()
    }

    /// Number of calls made to `step`
    pub fn count(&self, step: &str) -> usize {
        self.calls().iter().filter(|c| c.name() == step).count()
    }

    /// Position of the first call to `step`
    pub fn position(&self, step: &str) -> Option<usize> {
        self.calls().iter().position(|c| c.name() == step)
    }

    fn record(&self, call: RepoCall) -> Result<(), RepositoryError> {
        let name = call.name();
        self.calls.lock().unwrap().push(call);
        match self.failures.lock().unwrap().get(name) {
            Some(failure) => Err(failure()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl TrustRepository for MockTrustRepository {
    async fn list_targets(&self, roles: &[Role]) -> Result<Vec<SignedTargetRecord>, RepositoryError> {
        self.record(RepoCall::ListTargets(roles.to_vec()))?;
        Ok(self.records.lock().unwrap().clone())
    }

    async fn get_target_by_name(
        &self,
        name: &str,
        roles: &[Role],
    ) -> Result<SignedTargetRecord, RepositoryError> {
        self.record(RepoCall::GetTargetByName(name.to_string(), roles.to_vec()))?;
        let records = self.records.lock().unwrap();
        let matching: Vec<&SignedTargetRecord> =
            records.iter().filter(|r| r.target.name == name).collect();

        // Prefer the requested roles in order, else whatever signed the name
        let found = roles
            .iter()
            .find_map(|role| matching.iter().find(|r| &r.role == role))
            .or_else(|| matching.first())
            .map(|r| (*r).clone());
        found.ok_or_else(|| RepositoryError::NoSuchTarget(name.to_string()))
    }

    async fn add_target(&self, target: &TargetRecord, roles: &[Role]) -> Result<(), RepositoryError> {
        self.record(RepoCall::AddTarget(target.clone(), roles.to_vec()))
    }

    async fn signable_roles(&self, target: &TargetRecord) -> Result<Vec<Role>, RepositoryError> {
        self.record(RepoCall::SignableRoles(target.name.clone()))?;
        Ok(self.signable.lock().unwrap().clone())
    }

    async fn initialize(
        &self,
        root_key_ids: &[String],
        remote_roles: &[Role],
    ) -> Result<(), RepositoryError> {
        self.record(RepoCall::Initialize(root_key_ids.to_vec(), remote_roles.to_vec()))
    }

    async fn publish(&self) -> Result<(), RepositoryError> {
        self.record(RepoCall::Publish)
    }

    async fn list_keys(&self, role: &Role) -> Result<Vec<String>, RepositoryError> {
        self.record(RepoCall::ListKeys(role.clone()))?;
        Ok(self.root_keys.lock().unwrap().clone())
    }

    async fn create_key(&self, role: &Role, algorithm: KeyAlgorithm) -> Result<PublicKey, RepositoryError> {
        self.record(RepoCall::CreateKey(role.clone(), algorithm))?;
        Ok(PublicKey {
            id: "generated-root-key".to_string(),
            algorithm,
        })
    }
}

/// Record of a repository being opened
#[derive(Debug, Clone, PartialEq)]
pub struct OpenCall {
    pub server: String,
    pub reference: String,
    pub actions: Vec<Action>,
}

/// Hands out one shared mock repository
#[derive(Clone)]
pub struct MockFactory {
    repository: MockTrustRepository,
    unreachable: bool,
    opens: Arc<Mutex<Vec<OpenCall>>>,
}

impl MockFactory {
    pub fn new(repository: MockTrustRepository) -> Self {
        Self {
            repository,
            unreachable: false,
            opens: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Factory whose trust server cannot be reached
    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::new(MockTrustRepository::new())
        }
    }

    pub fn opens(&self) -> Vec<OpenCall> {
        self.opens.lock().unwrap().clone()
    }
}

#[async_trait]
impl TrustRepositoryFactory for MockFactory {
    async fn open(
        &self,
        server: &str,
        reference: &ImageReference,
        _auth: &AuthConfig,
        actions: &[Action],
    ) -> anyhow::Result<Arc<dyn TrustRepository>> {
        self.opens.lock().unwrap().push(OpenCall {
            server: server.to_string(),
            reference: reference.to_string(),
            actions: actions.to_vec(),
        });
        if self.unreachable {
            anyhow::bail!("dial tcp: connection refused");
        }
        Ok(Arc::new(self.repository.clone()))
    }
}

/// One recorded engine call
#[derive(Debug, Clone, PartialEq)]
pub enum TransferCall {
    Push(String, PushOptions),
    Pull(String, PullOptions),
    Tag(String, String),
}

/// Image engine returning canned progress streams
#[derive(Clone, Default)]
pub struct MockTransfer {
    push_lines: Arc<Mutex<Vec<String>>>,
    pull_lines: Arc<Mutex<Vec<String>>>,
    failing_pulls: Arc<Mutex<Vec<String>>>,
    calls: Arc<Mutex<Vec<TransferCall>>>,
}

impl MockTransfer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines every push stream yields
    pub fn with_push_lines(lines: Vec<String>) -> Self {
        let transfer = Self::new();
        *transfer.push_lines.lock().unwrap() = lines;
        transfer
    }

    /// Lines every pull stream yields
    pub fn set_pull_lines(&self, lines: Vec<String>) {
        *self.pull_lines.lock().unwrap() = lines;
    }

    /// Fail pulls of the reference rendered as `reference`
    pub fn fail_pull_of(&self, reference: &str) {
        self.failing_pulls.lock().unwrap().push(reference.to_string());
    }

    pub fn calls(&self) -> Vec<TransferCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn pulls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                TransferCall::Pull(reference, _) => Some(reference),
                _ => None,
            })
            .collect()
    }

    pub fn tags(&self) -> Vec<(String, String)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                TransferCall::Tag(source, target) => Some((source, target)),
                _ => None,
            })
            .collect()
    }

    fn stream(lines: &[String]) -> EventStream {
        let items: Vec<std::io::Result<Vec<u8>>> = lines
            .iter()
            .map(|line| Ok(format!("{}\n", line).into_bytes()))
            .collect();
        Box::pin(stream::iter(items))
    }
}

#[async_trait]
impl ImageTransfer for MockTransfer {
    async fn push(&self, reference: &ImageReference, options: &PushOptions) -> anyhow::Result<EventStream> {
        self.calls
            .lock()
            .unwrap()
            .push(TransferCall::Push(reference.to_string(), options.clone()));
        Ok(Self::stream(&self.push_lines.lock().unwrap()))
    }

    async fn pull(&self, reference: &ImageReference, options: &PullOptions) -> anyhow::Result<EventStream> {
        let rendered = reference.to_string();
        self.calls
            .lock()
            .unwrap()
            .push(TransferCall::Pull(rendered.clone(), options.clone()));
        if self.failing_pulls.lock().unwrap().contains(&rendered) {
            anyhow::bail!("manifest for {} not found", rendered);
        }
        Ok(Self::stream(&self.pull_lines.lock().unwrap()))
    }

    async fn tag(&self, source: &ImageReference, target: &ImageReference) -> anyhow::Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(TransferCall::Tag(source.to_string(), target.to_string()));
        Ok(())
    }
}

/// Fixed credentials for every registry
#[derive(Clone, Default)]
pub struct MockAuth {
    auth: AuthConfig,
    registries: Arc<Mutex<Vec<String>>>,
}

impl MockAuth {
    pub fn new(auth: AuthConfig) -> Self {
        Self {
            auth,
            registries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn registries(&self) -> Vec<String> {
        self.registries.lock().unwrap().clone()
    }
}

impl AuthResolver for MockAuth {
    fn resolve(&self, registry: &str) -> anyhow::Result<AuthConfig> {
        self.registries.lock().unwrap().push(registry.to_string());
        Ok(self.auth.clone())
    }
}

/// Cloneable output sink for inspecting what was written
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

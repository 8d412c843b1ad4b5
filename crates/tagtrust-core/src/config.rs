//! Configuration file loading and environment overrides

use crate::error::{Error, Result};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::fs;
use tracing::debug;

/// Configuration file names to search for
const CONFIG_FILE_NAMES: &[&str] = &["tagtrust.yaml", "tagtrust.yml"];

/// Default image engine endpoint
const DEFAULT_ENGINE_HOST: &str = "tcp://localhost:2375";

/// Trust server for the official index
const OFFICIAL_TRUST_SERVER: &str = "https://notary.docker.io";

/// Registry names that refer to the official index
const OFFICIAL_INDEX_NAMES: &[&str] = &["docker.io", "index.docker.io", "registry-1.docker.io"];

/// Environment variables consulted after the file is loaded
pub const ENV_ENGINE_HOST: &str = "DOCKER_HOST";
pub const ENV_TRUST_SERVER: &str = "DOCKER_CONTENT_TRUST_SERVER";
pub const ENV_CONFIG_DIR: &str = "DOCKER_CONFIG";

/// Settings for trusted pushes and pulls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TrustConfig {
    /// Image engine endpoint (`tcp://host:port`, `http://...` or `https://...`)
    pub engine_host: String,

    /// Explicit trust server URL; derived from the registry when unset
    pub trust_server: Option<String>,

    /// Directory holding `config.json` registry credentials
    pub docker_config_dir: Option<Utf8PathBuf>,

    /// Whether bootstrapping a repository may generate a new root key
    /// without asking when no local root key exists
    pub allow_root_key_generation: bool,

    /// User agent sent to HTTP collaborators
    pub user_agent: String,
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            engine_host: DEFAULT_ENGINE_HOST.to_string(),
            trust_server: None,
            docker_config_dir: None,
            allow_root_key_generation: true,
            user_agent: format!("tagtrust/{}", crate::VERSION),
        }
    }
}

impl TrustConfig {
    /// Load configuration from the specified path or search for it.
    ///
    /// Falls back to defaults when no file is found by searching. Environment
    /// overrides are applied in both cases.
    pub fn load(path: Option<&Utf8Path>) -> Result<Self> {
        let config = match path {
            Some(p) => Self::from_file(p)?,
            None => match Self::find_config() {
                Some(found) => Self::from_file(&found)?,
                None => {
                    debug!("No tagtrust config file found, using defaults");
                    Self::default()
                }
            },
        };

        let config = config.with_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML configuration file
    pub fn from_file(path: &Utf8Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::config_not_found(path.as_str())
            } else {
                Error::Io(e)
            }
        })?;

        debug!("Loaded trust config from {}", path);
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml_ng::from_str(content)?)
    }

    fn find_config() -> Option<Utf8PathBuf> {
        CONFIG_FILE_NAMES
            .iter()
            .map(Utf8PathBuf::from)
            .find(|candidate| candidate.is_file())
    }

    /// Apply `DOCKER_HOST`, `DOCKER_CONTENT_TRUST_SERVER` and `DOCKER_CONFIG`
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(host) = non_empty_env(ENV_ENGINE_HOST) {
            self.engine_host = host;
        }
        if let Some(server) = non_empty_env(ENV_TRUST_SERVER) {
            self.trust_server = Some(server);
        }
        if let Some(dir) = non_empty_env(ENV_CONFIG_DIR) {
            self.docker_config_dir = Some(Utf8PathBuf::from(dir));
        }
        self
    }

    /// Check the values that cannot be checked by deserialization alone
    pub fn validate(&self) -> Result<()> {
        if self.engine_host.trim().is_empty() {
            return Err(Error::invalid_config("engineHost must not be empty"));
        }
        if let Some(server) = &self.trust_server {
            if !server.starts_with("https://") {
                return Err(Error::invalid_config(format!(
                    "trust server must use https: {}",
                    server
                )));
            }
        }
        Ok(())
    }

    /// Trust server URL for a registry index
    pub fn trust_server_for(&self, registry: &str) -> Result<String> {
        if let Some(server) = &self.trust_server {
            if !server.starts_with("https://") {
                return Err(Error::invalid_config(format!(
                    "trust server must use https: {}",
                    server
                )));
            }
            return Ok(server.trim_end_matches('/').to_string());
        }
        if OFFICIAL_INDEX_NAMES.contains(&registry) {
            return Ok(OFFICIAL_TRUST_SERVER.to_string());
        }
        Ok(format!("https://{}", registry))
    }

    /// Directory holding `config.json`, defaulting to `~/.docker`
    pub fn credentials_dir(&self) -> Option<Utf8PathBuf> {
        if let Some(dir) = &self.docker_config_dir {
            return Some(dir.clone());
        }
        dirs::home_dir()
            .and_then(|home| Utf8PathBuf::from_path_buf(home).ok())
            .map(|home| home.join(".docker"))
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

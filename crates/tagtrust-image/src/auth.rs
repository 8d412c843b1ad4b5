//! Registry credentials from a docker-style `config.json`

use crate::traits::AuthResolver;
use crate::types::AuthConfig;
use anyhow::{anyhow, Context, Result};
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::collections::HashMap;
use tagtrust_core::TrustConfig;
use tracing::{debug, warn};

/// Key the official index is stored under in `config.json`
pub const OFFICIAL_INDEX_SERVER: &str = "https://index.docker.io/v1/";

const CONFIG_FILE_NAME: &str = "config.json";

/// Reads credentials from `<dir>/config.json`
#[derive(Debug, Clone)]
pub struct DockerConfigAuth {
    config_dir: Option<Utf8PathBuf>,
}

impl DockerConfigAuth {
    /// `config_dir` of `None` resolves every registry anonymously
    pub fn new(config_dir: Option<Utf8PathBuf>) -> Self {
        Self { config_dir }
    }

    /// Read `config.json` from an explicit directory
    pub fn from_dir(dir: &Utf8Path) -> Self {
        Self::new(Some(dir.to_owned()))
    }

    /// Use the credentials directory named by the trust configuration
    pub fn from_config(config: &TrustConfig) -> Self {
        Self::new(config.credentials_dir())
    }

    fn load(&self) -> Result<Option<CredentialsFile>> {
        let Some(dir) = &self.config_dir else {
            return Ok(None);
        };
        let path = dir.join(CONFIG_FILE_NAME);
        if !path.is_file() {
            debug!("No credentials file at {}", path);
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path))?;
        let file: CredentialsFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path))?;
        Ok(Some(file))
    }
}

impl AuthResolver for DockerConfigAuth {
    fn resolve(&self, registry: &str) -> Result<AuthConfig> {
        let Some(file) = self.load()? else {
            return Ok(AuthConfig::default());
        };

        let server = index_server(registry);
        let entry = file.auths.get(&server).or_else(|| {
            // Entries are often stored with a scheme or trailing path
            file.auths
                .iter()
                .find(|(key, _)| convert_to_hostname(key) == registry)
                .map(|(_, entry)| entry)
        });

        let Some(entry) = entry else {
            if file.creds_store.is_some() || file.cred_helpers.contains_key(&server) {
                warn!(
                    "Credentials for {} are held by a credential helper, which is not supported; continuing anonymously",
                    registry
                );
            }
            return Ok(AuthConfig::default());
        };

        let mut auth = AuthConfig {
            username: entry.username.clone(),
            password: entry.password.clone(),
            auth: None,
            server_address: Some(server),
            identity_token: entry.identity_token.clone(),
            registry_token: entry.registry_token.clone(),
        };

        if let Some(encoded) = entry.auth.as_deref().filter(|a| !a.is_empty()) {
            let (username, password) = decode_auth(encoded)?;
            auth.username = Some(username);
            auth.password = Some(password);
        }

        Ok(auth)
    }
}

/// `config.json` key for a registry
pub fn index_server(registry: &str) -> String {
    match registry {
        "docker.io" | "index.docker.io" | "registry-1.docker.io" => {
            OFFICIAL_INDEX_SERVER.to_string()
        }
        other => other.to_string(),
    }
}

fn convert_to_hostname(server: &str) -> &str {
    let stripped = server
        .strip_prefix("https://")
        .or_else(|| server.strip_prefix("http://"))
        .unwrap_or(server);
    stripped.split('/').next().unwrap_or(stripped)
}

/// Split a base64 `user:password` pair
fn decode_auth(encoded: &str) -> Result<(String, String)> {
    let decoded = STANDARD
        .decode(encoded.trim())
        .context("Invalid base64 in stored credentials")?;
    let decoded = String::from_utf8(decoded).context("Stored credentials are not UTF-8")?;
    let (username, password) = decoded
        .split_once(':')
        .ok_or_else(|| anyhow!("Stored credentials are not in user:password form"))?;
    Ok((username.to_string(), password.trim_end_matches('\n').to_string()))
}

/// Encode credentials for a registry authentication header
pub fn encode_auth_config(auth: &AuthConfig) -> Result<String> {
    let json = serde_json::to_vec(auth).context("Failed to serialize registry credentials")?;
    Ok(URL_SAFE.encode(json))
}

#[derive(Debug, Deserialize)]
struct CredentialsFile {
    #[serde(default)]
    auths: HashMap<String, StoredCredentials>,
    #[serde(default, rename = "credsStore")]
    creds_store: Option<String>,
    #[serde(default, rename = "credHelpers")]
    cred_helpers: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct StoredCredentials {
    #[serde(default)]
    auth: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(default, rename = "identitytoken")]
    identity_token: Option<String>,
    #[serde(default, rename = "registrytoken")]
    registry_token: Option<String>,
}

use crate::reference::{ImageReference, ReferenceKind};
use crate::traits::ImageTransfer;
use crate::types::{EventStream, PullOptions, PushOptions};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue};
use tagtrust_core::TrustConfig;
use tracing::{debug, trace};
use url::Url;

/// Header carrying encoded registry credentials
const REGISTRY_AUTH_HEADER: &str = "X-Registry-Auth";

/// Client for an image engine's HTTP API
pub struct EngineClient {
    client: reqwest::Client,
    base_url: String,
}

impl EngineClient {
    /// Create a new engine client for `host` (`tcp://`, `http://` or `https://`)
    pub fn new(host: &str, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .context("Failed to build HTTP client")?;

        let base_url = engine_base_url(host)?;
        debug!("Using image engine at {}", base_url);

        Ok(Self { client, base_url })
    }

    /// Create a client for the engine named by the trust configuration
    pub fn from_config(config: &TrustConfig) -> Result<Self> {
        Self::new(&config.engine_host, &config.user_agent)
    }

    fn url(&self, path: &str, query: &[(&str, &str)]) -> Result<Url> {
        let raw = format!("{}{}", self.base_url, path);
        let url = if query.is_empty() {
            Url::parse(&raw)
        } else {
            Url::parse_with_params(&raw, query)
        };
        url.with_context(|| format!("Invalid engine URL: {}", raw))
    }

    fn auth_headers(registry_auth: Option<&str>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(auth) = registry_auth {
            headers.insert(
                REGISTRY_AUTH_HEADER,
                HeaderValue::from_str(auth).context("Invalid registry auth header")?,
            );
        }
        Ok(headers)
    }

    /// POST and hand back the response body as a progress stream
    async fn post_stream(&self, url: Url, headers: HeaderMap) -> Result<EventStream> {
        trace!("POST {}", url);
        let response = self
            .client
            .post(url.clone())
            .headers(headers)
            .send()
            .await
            .with_context(|| format!("Failed to connect to image engine at {}", self.base_url))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "Image engine returned {} for {}: {}",
                status,
                url.path(),
                engine_message(&body)
            ));
        }

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(std::io::Error::other));
        Ok(Box::pin(stream))
    }
}

#[async_trait]
impl ImageTransfer for EngineClient {
    async fn push(
        &self,
        reference: &ImageReference,
        options: &PushOptions,
    ) -> Result<EventStream> {
        let path = format!("/images/{}/push", reference.familiar_name());
        let url = match reference.kind() {
            ReferenceKind::Tagged(tag) => self.url(&path, &[("tag", tag)])?,
            _ => self.url(&path, &[])?,
        };
        debug!("Pushing {}", reference);
        self.post_stream(url, Self::auth_headers(options.registry_auth.as_deref())?)
            .await
    }

    async fn pull(
        &self,
        reference: &ImageReference,
        options: &PullOptions,
    ) -> Result<EventStream> {
        let name = reference.familiar_name();
        let mut query: Vec<(&str, &str)> = vec![("fromImage", name.as_str())];
        match reference.kind() {
            ReferenceKind::Digested(digest) => query.push(("tag", digest)),
            ReferenceKind::Tagged(tag) => query.push(("tag", tag)),
            ReferenceKind::Bare if !options.all => query.push(("tag", "latest")),
            ReferenceKind::Bare => {}
        }
        if let Some(platform) = options.platform.as_deref() {
            query.push(("platform", platform));
        }

        let url = self.url("/images/create", &query)?;
        debug!("Pulling {}", reference);
        self.post_stream(url, Self::auth_headers(options.registry_auth.as_deref())?)
            .await
    }

    async fn tag(&self, source: &ImageReference, target: &ImageReference) -> Result<()> {
        let tag = target
            .tag
            .as_deref()
            .ok_or_else(|| anyhow!("Tag target {} has no tag", target))?;
        let repo = target.familiar_name();
        let url = self.url(
            &format!("/images/{}/tag", source),
            &[("repo", repo.as_str()), ("tag", tag)],
        )?;

        trace!("POST {}", url);
        let response = self
            .client
            .post(url)
            .send()
            .await
            .with_context(|| format!("Failed to connect to image engine at {}", self.base_url))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "Failed to tag {} as {} ({}): {}",
                source,
                target,
                status,
                engine_message(&body)
            ));
        }
        Ok(())
    }
}

/// Map an engine host setting to an HTTP base URL
fn engine_base_url(host: &str) -> Result<String> {
    let host = host.trim().trim_end_matches('/');
    if let Some(rest) = host.strip_prefix("tcp://") {
        return Ok(format!("http://{}", rest));
    }
    if host.starts_with("http://") || host.starts_with("https://") {
        return Ok(host.to_string());
    }
    if host.starts_with("unix://") || host.starts_with("npipe://") {
        return Err(anyhow!(
            "Engine host {} is a local socket; configure a tcp:// endpoint instead",
            host
        ));
    }
    Err(anyhow!("Unsupported engine host: {}", host))
}

/// Pull the `message` field out of an engine error body when there is one
fn engine_message(body: &str) -> String {
    #[derive(serde::Deserialize)]
    struct EngineError {
        message: String,
    }

    if body.trim().is_empty() {
        return "(no response body)".to_string();
    }
    serde_json::from_str::<EngineError>(body)
        .map(|e| e.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

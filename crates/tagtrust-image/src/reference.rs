use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;
use tagtrust_core::{Digest, Error, Result};

/// Registry assumed when a reference names none
pub const DEFAULT_REGISTRY: &str = "docker.io";

/// Hostnames that address the default registry
const DEFAULT_REGISTRY_ALIASES: [&str; 2] = ["index.docker.io", "registry-1.docker.io"];

/// Namespace for single-component names on the default registry
const OFFICIAL_NAMESPACE: &str = "library/";

static COMPONENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]+(?:(?:[._]|__|-+)[a-z0-9]+)*$").expect("component regex is valid")
});

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w][\w.-]{0,127}$").expect("tag regex is valid"));

static DIGEST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9]*(?:[-_+.][A-Za-z][A-Za-z0-9]*)*:[0-9a-fA-F]{32,}$")
        .expect("digest regex is valid")
});

/// Container image reference with registry, repository, and tag/digest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageReference {
    /// Registry hostname (e.g., "docker.io", "registry.example.com:5000")
    pub registry: String,
    /// Repository path (e.g., "myorg/app", "library/alpine")
    pub repository: String,
    /// Tag (e.g., "v1")
    pub tag: Option<String>,
    /// Digest (e.g., "sha256:abc123..."); takes precedence over the tag
    pub digest: Option<String>,
}

/// What a reference pins, which decides how trust treats it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind<'a> {
    /// Repository only
    Bare,
    /// Human tag
    Tagged(&'a str),
    /// Content digest
    Digested(&'a str),
}

impl ImageReference {
    /// Parse and normalize a reference like "myorg/app:v1" or
    /// "registry.example.com:5000/team/app@sha256:...".
    ///
    /// Unlike a pull shorthand, a missing tag is kept as `None`.
    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::invalid_reference(s, "empty reference"));
        }

        // Split by @ for digest references
        let (name_part, digest) = match s.rsplit_once('@') {
            Some((before, after)) => {
                if !DIGEST_RE.is_match(after) {
                    return Err(Error::invalid_reference(s, "invalid digest"));
                }
                (before, Some(after.to_string()))
            }
            None => (s, None),
        };

        // A : after the last / separates the tag; earlier ones belong to a port
        let last_slash = name_part.rfind('/');
        let (name, tag) = match name_part.rfind(':') {
            Some(idx) if last_slash.is_none_or(|slash| idx > slash) => {
                let tag = &name_part[idx + 1..];
                if !TAG_RE.is_match(tag) {
                    return Err(Error::invalid_reference(s, "invalid tag"));
                }
                (&name_part[..idx], Some(tag.to_string()))
            }
            _ => (name_part, None),
        };

        let (registry, repository) = split_registry(name);

        if repository.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(Error::invalid_reference(
                s,
                "repository name must be lowercase",
            ));
        }
        if repository.split('/').any(|c| !COMPONENT_RE.is_match(c)) {
            return Err(Error::invalid_reference(s, "invalid repository name"));
        }

        let repository = if registry == DEFAULT_REGISTRY && !repository.contains('/') {
            format!("{}{}", OFFICIAL_NAMESPACE, repository)
        } else {
            repository.to_string()
        };

        Ok(Self {
            registry: registry.to_string(),
            repository,
            tag,
            digest,
        })
    }

    /// Fully qualified name without tag or digest, e.g. "docker.io/myorg/app"
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.registry, self.repository)
    }

    /// Short name as users type it, e.g. "myorg/app" or "alpine"
    pub fn familiar_name(&self) -> String {
        if self.registry == DEFAULT_REGISTRY {
            match self.repository.strip_prefix(OFFICIAL_NAMESPACE) {
                Some(rest) if !rest.contains('/') => rest.to_string(),
                _ => self.repository.clone(),
            }
        } else {
            self.full_name()
        }
    }

    pub fn kind(&self) -> ReferenceKind<'_> {
        match (&self.digest, &self.tag) {
            (Some(digest), _) => ReferenceKind::Digested(digest),
            (None, Some(tag)) => ReferenceKind::Tagged(tag),
            (None, None) => ReferenceKind::Bare,
        }
    }

    /// The repository alone, tag and digest removed
    pub fn trim(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            repository: self.repository.clone(),
            tag: None,
            digest: None,
        }
    }

    pub fn with_tag(&self, tag: &str) -> Result<Self> {
        if !TAG_RE.is_match(tag) {
            return Err(Error::invalid_reference(
                format!("{}:{}", self.familiar_name(), tag),
                "invalid tag",
            ));
        }
        Ok(Self {
            tag: Some(tag.to_string()),
            ..self.clone()
        })
    }

    pub fn with_digest(&self, digest: &Digest) -> Self {
        Self {
            digest: Some(digest.to_string()),
            ..self.clone()
        }
    }
}

fn split_registry(name: &str) -> (&str, &str) {
    match name.split_once('/') {
        Some((first, rest))
            if first.contains('.') || first.contains(':') || first == "localhost" =>
        {
            if DEFAULT_REGISTRY_ALIASES.contains(&first) {
                (DEFAULT_REGISTRY, rest)
            } else {
                (first, rest)
            }
        }
        _ => (DEFAULT_REGISTRY, name),
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.familiar_name())?;
        if let Some(tag) = &self.tag {
            write!(f, ":{}", tag)?;
        }
        if let Some(digest) = &self.digest {
            write!(f, "@{}", digest)?;
        }
        Ok(())
    }
}

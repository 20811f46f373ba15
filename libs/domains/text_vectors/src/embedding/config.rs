use std::fmt;
use std::str::FromStr;

use core_config::{ConfigError, FromEnv, env_opt, env_or_default, env_parse};

pub const DEFAULT_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";
const DEFAULT_LOCAL_URL: &str = "http://localhost:8080";
const DEFAULT_REMOTE_URL: &str =
    "https://router.huggingface.co/hf-inference/models/sentence-transformers/all-MiniLM-L6-v2/pipeline/feature-extraction";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Where the embedding model is served from.
///
/// The fallback from local to remote only happens when it is selected
/// explicitly; it never changes TLS settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmbeddingSource {
    #[default]
    Local,
    Remote,
    LocalThenRemote,
}

impl EmbeddingSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmbeddingSource::Local => "local",
            EmbeddingSource::Remote => "remote",
            EmbeddingSource::LocalThenRemote => "local-then-remote",
        }
    }
}

impl fmt::Display for EmbeddingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmbeddingSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(EmbeddingSource::Local),
            "remote" => Ok(EmbeddingSource::Remote),
            "local-then-remote" | "local_then_remote" => Ok(EmbeddingSource::LocalThenRemote),
            other => Err(format!(
                "unknown embedding source '{}' (expected local, remote or local-then-remote)",
                other
            )),
        }
    }
}

/// Embedding backend configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddingConfig {
    pub source: EmbeddingSource,
    pub model: String,
    /// Base URL of a locally served model (text-embeddings-inference API)
    pub local_url: String,
    /// Full URL of the hosted feature-extraction endpoint
    pub remote_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl EmbeddingConfig {
    pub fn local(local_url: impl Into<String>) -> Self {
        Self {
            source: EmbeddingSource::Local,
            local_url: local_url.into(),
            ..Self::default()
        }
    }

    pub fn with_source(mut self, source: EmbeddingSource) -> Self {
        self.source = source;
        self
    }

    pub fn with_remote(mut self, remote_url: impl Into<String>, api_key: Option<String>) -> Self {
        self.remote_url = remote_url.into();
        self.api_key = api_key;
        self
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            source: EmbeddingSource::default(),
            model: DEFAULT_MODEL.to_string(),
            local_url: DEFAULT_LOCAL_URL.to_string(),
            remote_url: DEFAULT_REMOTE_URL.to_string(),
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl FromEnv for EmbeddingConfig {
    /// - EMBEDDING_SOURCE: local | remote | local-then-remote (default: local)
    /// - EMBEDDING_MODEL: model name reported in stats
    /// - EMBEDDING_LOCAL_URL / EMBEDDING_REMOTE_URL: endpoints
    /// - EMBEDDING_API_KEY: bearer token for the remote endpoint
    /// - EMBEDDING_TIMEOUT_SECS: per-request timeout (default: 30)
    fn from_env() -> Result<Self, ConfigError> {
        let source = env_or_default("EMBEDDING_SOURCE", EmbeddingSource::default().as_str());
        let source = source.parse().map_err(|details| ConfigError::ParseError {
            key: "EMBEDDING_SOURCE".to_string(),
            details,
        })?;

        Ok(Self {
            source,
            model: env_or_default("EMBEDDING_MODEL", DEFAULT_MODEL),
            local_url: env_or_default("EMBEDDING_LOCAL_URL", DEFAULT_LOCAL_URL),
            remote_url: env_or_default("EMBEDDING_REMOTE_URL", DEFAULT_REMOTE_URL),
            api_key: env_opt("EMBEDDING_API_KEY"),
            timeout_secs: env_parse("EMBEDDING_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?,
        })
    }
}

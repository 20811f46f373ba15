//! HTTP embedding backends.
//!
//! Both the local and the remote source speak the same request shape
//! (`{"inputs": "..."}`) and return one of the [`RawEmbedding`] shapes:
//! a locally served text-embeddings-inference instance answers `POST /embed`
//! with one row per input, a hosted feature-extraction endpoint answers with
//! a flat vector or rows.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use super::{EmbeddingConfig, EmbeddingGenerator, RawEmbedding};
use crate::error::{VectorError, VectorResult, text_prefix};

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    inputs: &'a str,
}

/// Embedding generator backed by an HTTP inference endpoint
pub struct HttpEmbeddingGenerator {
    client: Client,
    url: String,
    api_key: Option<String>,
    label: String,
}

impl HttpEmbeddingGenerator {
    /// Locally served model at `{local_url}/embed`
    pub fn local(config: &EmbeddingConfig) -> VectorResult<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            url: format!("{}/embed", config.local_url.trim_end_matches('/')),
            api_key: None,
            label: format!("local:{}", config.model),
        })
    }

    /// Hosted model at `remote_url`, authenticated with the configured API key
    pub fn remote(config: &EmbeddingConfig) -> VectorResult<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            url: config.remote_url.clone(),
            api_key: config.api_key.clone(),
            label: format!("remote:{}", config.model),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Certificate verification stays on for every source.
fn build_client(timeout_secs: u64) -> VectorResult<Client> {
    Client::builder()
        .use_rustls_tls()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| VectorError::Config(format!("Failed to build HTTP client: {}", e)))
}

#[async_trait]
impl EmbeddingGenerator for HttpEmbeddingGenerator {
    fn describe(&self) -> String {
        self.label.clone()
    }

    async fn generate_raw(&self, text: &str) -> VectorResult<RawEmbedding> {
        let context = || format!("{} embed '{}'", self.label, text_prefix(text));

        let mut request = self
            .client
            .post(&self.url)
            .json(&EmbeddingRequest { inputs: text });

        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| VectorError::upstream(context(), e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(VectorError::malformed(
                context(),
                format!("API error ({}): {}", status, error_text),
            ));
        }

        let raw: RawEmbedding = response
            .json()
            .await
            .map_err(|e| VectorError::upstream(context(), e))?;

        debug!(source = %self.label, "Embedding generated");
        Ok(raw)
    }
}

//! Service construction
//!
//! Loads every configuration section from the environment and wires the
//! repository and embedding orchestrator into a [`TextVectorService`].

use std::sync::Arc;

use core_config::{ConfigError, FromEnv};
use domain_text_vectors::{
    EmbeddingConfig, EmbeddingOrchestrator, QdrantConfig, QdrantRepository, StoreConfig,
    TextVectorService,
};
use eyre::{Result, WrapErr};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// All configuration sections the CLI needs
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub qdrant: QdrantConfig,
    pub embedding: EmbeddingConfig,
    pub store: StoreConfig,
}

impl FromEnv for AppConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            qdrant: QdrantConfig::from_env()?,
            embedding: EmbeddingConfig::from_env()?,
            store: StoreConfig::from_env()?,
        })
    }
}

/// Builds the service; nothing is contacted until it is initialized.
pub fn build_service(config: &AppConfig) -> Result<TextVectorService> {
    info!(
        qdrant = %config.qdrant.url,
        collection = %config.store.collection,
        source = %config.embedding.source,
        "Configuring text vector service"
    );

    let repository = QdrantRepository::new(config.qdrant.clone())
        .wrap_err("Failed to create Qdrant client")?;
    let embeddings = EmbeddingOrchestrator::from_config(&config.embedding, config.store.dimension)
        .wrap_err("Failed to configure embedding source")?;

    Ok(TextVectorService::new(
        Arc::new(repository),
        embeddings,
        config.store.clone(),
    ))
}

/// Cancels `token` on the first Ctrl-C.
pub fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling in-flight calls");
            token.cancel();
        }
    });
}

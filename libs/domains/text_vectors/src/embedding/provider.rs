use async_trait::async_trait;

use super::RawEmbedding;
use crate::error::VectorResult;

/// Trait for embedding generation backends
///
/// Implementations return the backend's native output shape; callers go
/// through [`super::normalize`] to get a flat vector.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmbeddingGenerator: Send + Sync {
    /// Human-readable source and model, for logs and stats
    fn describe(&self) -> String;

    /// Generate the raw embedding output for a single text
    async fn generate_raw(&self, text: &str) -> VectorResult<RawEmbedding>;
}

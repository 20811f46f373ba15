use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{info, instrument, warn};

use super::{EmbeddingConfig, EmbeddingGenerator, EmbeddingSource, HttpEmbeddingGenerator, normalize};
use crate::context::CallContext;
use crate::error::{VectorError, VectorResult, text_prefix};

const PROBE_TEXT: &str = "embedding model warm-up";

/// Single entry point for turning text into vectors.
///
/// Holds the candidate generators in preference order. `initialize` loads the
/// first one that answers a probe with a vector of the expected dimension and
/// pins it for the lifetime of the orchestrator.
pub struct EmbeddingOrchestrator {
    candidates: Vec<Arc<dyn EmbeddingGenerator>>,
    dimension: usize,
    active: OnceCell<Arc<dyn EmbeddingGenerator>>,
}

impl EmbeddingOrchestrator {
    pub fn new(generator: Arc<dyn EmbeddingGenerator>, dimension: usize) -> Self {
        Self::with_fallbacks(vec![generator], dimension)
    }

    /// Generators are tried in order during `initialize`.
    pub fn with_fallbacks(candidates: Vec<Arc<dyn EmbeddingGenerator>>, dimension: usize) -> Self {
        Self {
            candidates,
            dimension,
            active: OnceCell::new(),
        }
    }

    /// Builds the candidate list the configured source calls for.
    pub fn from_config(config: &EmbeddingConfig, dimension: usize) -> VectorResult<Self> {
        let candidates: Vec<Arc<dyn EmbeddingGenerator>> = match config.source {
            EmbeddingSource::Local => vec![Arc::new(HttpEmbeddingGenerator::local(config)?)],
            EmbeddingSource::Remote => vec![Arc::new(HttpEmbeddingGenerator::remote(config)?)],
            EmbeddingSource::LocalThenRemote => vec![
                Arc::new(HttpEmbeddingGenerator::local(config)?),
                Arc::new(HttpEmbeddingGenerator::remote(config)?),
            ],
        };
        Ok(Self::with_fallbacks(candidates, dimension))
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn is_initialized(&self) -> bool {
        self.active.initialized()
    }

    /// Description of the active generator, once initialized.
    pub fn active_model(&self) -> Option<String> {
        self.active.get().map(|g| g.describe())
    }

    /// Loads the model; concurrent callers share a single attempt.
    #[instrument(skip(self, ctx))]
    pub async fn initialize(&self, ctx: &CallContext) -> VectorResult<()> {
        self.active
            .get_or_try_init(|| self.load_first_available(ctx))
            .await?;
        Ok(())
    }

    async fn load_first_available(
        &self,
        ctx: &CallContext,
    ) -> VectorResult<Arc<dyn EmbeddingGenerator>> {
        let mut last_error = None;

        for (position, candidate) in self.candidates.iter().enumerate() {
            match self.probe(ctx, candidate.as_ref()).await {
                Ok(()) => {
                    info!(model = %candidate.describe(), "Embedding model loaded");
                    return Ok(Arc::clone(candidate));
                }
                // A dimension mismatch is a configuration fault, falling back would hide it
                Err(err @ VectorError::DimensionMismatch { .. }) => return Err(err),
                Err(err @ (VectorError::Cancelled(_) | VectorError::TimedOut { .. })) => {
                    return Err(err);
                }
                Err(err) => {
                    if position + 1 < self.candidates.len() {
                        warn!(
                            model = %candidate.describe(),
                            error = %err,
                            "Embedding model failed to load, falling back to next source"
                        );
                    }
                    last_error = Some(err);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| VectorError::Config("No embedding source configured".to_string())))
    }

    async fn probe(&self, ctx: &CallContext, generator: &dyn EmbeddingGenerator) -> VectorResult<()> {
        let raw = ctx
            .run("embedding.load", generator.generate_raw(PROBE_TEXT))
            .await?;
        let vector = normalize(raw)?;
        if vector.len() != self.dimension {
            return Err(VectorError::dimension(self.dimension, vector.len()));
        }
        Ok(())
    }

    /// Embeds one text.
    pub async fn generate(&self, ctx: &CallContext, text: &str) -> VectorResult<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(VectorError::Validation("text must not be empty".to_string()));
        }

        let generator = self.active.get().ok_or(VectorError::NotInitialized)?;
        let raw = ctx.run("embedding.generate", generator.generate_raw(text)).await?;

        normalize(raw).map_err(|err| match err {
            VectorError::Upstream { source, .. } => VectorError::Upstream {
                context: format!("embed '{}'", text_prefix(text)),
                source,
            },
            other => other,
        })
    }

    /// Embeds texts one after another, in order; the first failure aborts the batch.
    pub async fn generate_batch(
        &self,
        ctx: &CallContext,
        texts: &[String],
    ) -> VectorResult<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for (index, text) in texts.iter().enumerate() {
            let vector = self.generate(ctx, text).await.map_err(|err| match err {
                VectorError::Validation(msg) => {
                    VectorError::Validation(format!("item {}: {}", index, msg))
                }
                VectorError::Upstream { context, source } => VectorError::Upstream {
                    context: format!("item {}: {}", index, context),
                    source,
                },
                other => other,
            })?;
            vectors.push(vector);
        }
        Ok(vectors)
    }
}

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{info, instrument, warn};

use crate::config::StoreConfig;
use crate::context::{CallContext, Readiness};
use crate::embedding::EmbeddingOrchestrator;
use crate::error::{BatchItemError, VectorError, VectorResult};
use crate::models::{
    CollectionSpec, CollectionStats, DistanceMetric, NewVectorRecord, SearchHit, SearchParams,
    StoreRequest, VectorRecord,
};
use crate::records::VectorRecordStore;
use crate::repository::VectorRepository;
use crate::search::SimilaritySearch;

/// Text vector service providing high-level operations
///
/// Combines vector storage (Qdrant or in-memory) with embedding generation.
/// Nothing but `initialize` and `health_check` works until `initialize` has
/// succeeded once.
pub struct TextVectorService {
    repository: Arc<dyn VectorRepository>,
    embeddings: EmbeddingOrchestrator,
    records: VectorRecordStore,
    search: SimilaritySearch,
    readiness: Readiness,
    initialized: OnceCell<()>,
}

impl TextVectorService {
    pub fn new(
        repository: Arc<dyn VectorRepository>,
        embeddings: EmbeddingOrchestrator,
        config: StoreConfig,
    ) -> Self {
        let readiness = Readiness::new();
        let records = VectorRecordStore::new(
            Arc::clone(&repository),
            config.collection,
            config.dimension,
            readiness.clone(),
        );
        let search = SimilaritySearch::new(records.clone());

        Self {
            repository,
            embeddings,
            records,
            search,
            readiness,
            initialized: OnceCell::new(),
        }
    }

    pub fn collection(&self) -> &str {
        self.records.collection()
    }

    pub fn dimension(&self) -> usize {
        self.records.dimension()
    }

    pub fn is_ready(&self) -> bool {
        self.readiness.is_ready()
    }

    // ===== Lifecycle =====

    /// Prepares the collection and loads the embedding model.
    ///
    /// Safe to call repeatedly; concurrent callers wait on the same attempt and
    /// a failed attempt can be retried.
    #[instrument(skip(self, ctx), fields(collection = %self.collection()))]
    pub async fn initialize(&self, ctx: &CallContext) -> VectorResult<()> {
        self.initialized
            .get_or_try_init(|| async {
                if self.embeddings.dimension() != self.dimension() {
                    return Err(VectorError::Config(format!(
                        "embedding dimension {} does not match collection dimension {}",
                        self.embeddings.dimension(),
                        self.dimension()
                    )));
                }

                self.ensure_collection(ctx).await?;
                self.embeddings.initialize(ctx).await?;
                self.readiness.mark_ready();

                info!(
                    model = ?self.embeddings.active_model(),
                    dimension = self.dimension(),
                    "Text vector service ready"
                );
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn ensure_collection(&self, ctx: &CallContext) -> VectorResult<()> {
        let name = self.collection();
        let existing = ctx
            .run(
                "vector_store.collection_info",
                self.repository.collection_info(name),
            )
            .await?;

        match existing {
            Some(info) => {
                if info.dimension != self.dimension() {
                    return Err(VectorError::dimension(self.dimension(), info.dimension));
                }
                if info.distance != DistanceMetric::Cosine {
                    return Err(VectorError::Config(format!(
                        "collection '{}' uses {:?} distance, cosine is required",
                        name, info.distance
                    )));
                }
                info!(collection = %name, points = info.points_count, "Using existing collection");
            }
            None => {
                let spec = CollectionSpec::new(name, self.dimension());
                ctx.run(
                    "vector_store.create_collection",
                    self.repository.create_collection(&spec),
                )
                .await?;
                info!(collection = %name, dimension = spec.dimension, "Created collection");
            }
        }
        Ok(())
    }

    // ===== Records =====

    /// Embeds and stores one text; returns its id.
    #[instrument(skip(self, ctx, request), fields(id = ?request.id))]
    pub async fn store(&self, ctx: &CallContext, request: StoreRequest) -> VectorResult<String> {
        self.readiness.ensure_ready()?;
        if matches!(request.id.as_deref(), Some("")) {
            return Err(VectorError::Validation("id must not be empty".to_string()));
        }

        let embedding = self.embeddings.generate(ctx, &request.text).await?;
        self.records.store(ctx, request.into_record(embedding)).await
    }

    /// Embeds and stores many texts; nothing is written unless all succeed.
    ///
    /// Requests that can be rejected without embedding are reported together
    /// as `BatchRejected`; embedding then runs in order and stops at the first
    /// failure.
    #[instrument(skip(self, ctx, requests), fields(count = requests.len()))]
    pub async fn store_batch(
        &self,
        ctx: &CallContext,
        requests: Vec<StoreRequest>,
    ) -> VectorResult<Vec<String>> {
        self.readiness.ensure_ready()?;

        let failures: Vec<BatchItemError> = requests
            .iter()
            .enumerate()
            .filter_map(|(index, request)| {
                precheck(request).err().map(|error| BatchItemError {
                    index,
                    id: request.id.clone(),
                    error,
                })
            })
            .collect();
        if !failures.is_empty() {
            return Err(VectorError::BatchRejected { failures });
        }

        let texts: Vec<String> = requests.iter().map(|r| r.text.clone()).collect();
        let embeddings = self.embeddings.generate_batch(ctx, &texts).await?;

        let records: Vec<NewVectorRecord> = requests
            .into_iter()
            .zip(embeddings)
            .map(|(request, embedding)| request.into_record(embedding))
            .collect();
        self.records.store_batch(ctx, records).await
    }

    /// Stores a record whose embedding was computed by the caller.
    pub async fn store_embedding(
        &self,
        ctx: &CallContext,
        record: NewVectorRecord,
    ) -> VectorResult<String> {
        self.records.store(ctx, record).await
    }

    pub async fn get(&self, ctx: &CallContext, id: &str) -> VectorResult<Option<VectorRecord>> {
        self.records.get(ctx, id).await
    }

    pub async fn delete(&self, ctx: &CallContext, id: &str) -> VectorResult<bool> {
        self.records.delete(ctx, id).await
    }

    // ===== Search =====

    /// Records most similar to `text`, best first.
    #[instrument(skip(self, ctx, text), fields(limit = params.limit))]
    pub async fn search(
        &self,
        ctx: &CallContext,
        text: &str,
        params: SearchParams,
    ) -> VectorResult<Vec<SearchHit>> {
        self.readiness.ensure_ready()?;
        SimilaritySearch::clamp(params)?;

        let vector = self.embeddings.generate(ctx, text).await?;
        self.search.search(ctx, vector, params).await
    }

    /// Records most similar to an already stored one, excluding it.
    pub async fn search_similar_to(
        &self,
        ctx: &CallContext,
        id: &str,
        params: SearchParams,
    ) -> VectorResult<Option<Vec<SearchHit>>> {
        self.search.search_similar_to(ctx, id, params).await
    }

    // ===== Introspection =====

    #[instrument(skip(self, ctx))]
    pub async fn stats(&self, ctx: &CallContext) -> VectorResult<CollectionStats> {
        self.readiness.ensure_ready()?;

        let info = ctx
            .run(
                "vector_store.collection_info",
                self.repository.collection_info(self.collection()),
            )
            .await?
            .ok_or_else(|| VectorError::NotFound(format!("collection {}", self.collection())))?;
        let embedding_model = self
            .embeddings
            .active_model()
            .ok_or(VectorError::NotInitialized)?;

        Ok(CollectionStats {
            collection: info,
            embedding_model,
        })
    }

    /// `true` only when initialized and the vector store answers.
    #[instrument(skip(self, ctx))]
    pub async fn health_check(&self, ctx: &CallContext) -> bool {
        if !self.readiness.is_ready() {
            return false;
        }

        match ctx
            .run("vector_store.health_check", self.repository.health_check())
            .await
        {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "Vector store health check failed");
                false
            }
        }
    }
}

fn precheck(request: &StoreRequest) -> VectorResult<()> {
    if request.text.trim().is_empty() {
        return Err(VectorError::Validation("text must not be empty".to_string()));
    }
    if matches!(request.id.as_deref(), Some("")) {
        return Err(VectorError::Validation("id must not be empty".to_string()));
    }
    Ok(())
}

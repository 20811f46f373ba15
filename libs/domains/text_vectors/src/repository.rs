use async_trait::async_trait;
use uuid::Uuid;

use crate::error::VectorResult;
use crate::models::{CollectionInfo, CollectionSpec, PayloadFilter, Point, SearchQuery, SearchResult};

/// Repository trait for vector storage operations
///
/// This trait abstracts the underlying vector database (Qdrant in production,
/// an in-process map for tests and local runs). Implementations are shared
/// across concurrent requests and must not require external locking.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VectorRepository: Send + Sync {
    // ===== Collection Management =====

    /// Liveness probe of the backing store
    async fn health_check(&self) -> VectorResult<()>;

    /// Names of all collections
    async fn list_collections(&self) -> VectorResult<Vec<String>>;

    /// Get collection info, `None` if the collection does not exist
    async fn collection_info(&self, collection_name: &str) -> VectorResult<Option<CollectionInfo>>;

    /// Create a collection with the given layout
    async fn create_collection(&self, spec: &CollectionSpec) -> VectorResult<()>;

    // ===== Point Operations =====

    /// Insert or fully replace points by id
    async fn upsert(&self, collection_name: &str, points: Vec<Point>, wait: bool)
    -> VectorResult<()>;

    /// Nearest neighbours of `query.vector`, best first
    async fn search(
        &self,
        collection_name: &str,
        query: SearchQuery,
    ) -> VectorResult<Vec<SearchResult>>;

    /// Points by id; missing ids are skipped
    async fn retrieve(
        &self,
        collection_name: &str,
        ids: Vec<Uuid>,
        with_payload: bool,
        with_vector: bool,
    ) -> VectorResult<Vec<Point>>;

    /// Points whose payload matches `filter`
    async fn scroll(
        &self,
        collection_name: &str,
        filter: PayloadFilter,
        limit: u32,
        with_payload: bool,
        with_vector: bool,
    ) -> VectorResult<Vec<Point>>;

    /// Delete points by id
    async fn delete(&self, collection_name: &str, ids: Vec<Uuid>, wait: bool) -> VectorResult<()>;
}

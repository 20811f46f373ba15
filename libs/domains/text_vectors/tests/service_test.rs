//! Integration tests for the text vector domain
//!
//! These tests run the full service against the in-memory repository with a
//! deterministic keyword embedding, covering:
//! - Record lifecycle (store, overwrite, get, delete)
//! - Lookup by caller id, native key and original id
//! - Similarity search and self-exclusion
//! - The initialization gate, batch policy and cancellation

use std::sync::Arc;

use async_trait::async_trait;
use domain_text_vectors::*;
use serde_json::{Map, json};
use test_utils::{TestDataBuilder, assertions::*};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

const DIM: usize = 4;
const COLLECTION: &str = "texts";

/// Puts each text on one axis chosen by the first keyword it contains.
struct KeywordEmbedding;

impl KeywordEmbedding {
    fn axis(text: &str) -> usize {
        let text = text.to_lowercase();
        if text.contains("sun") || text.contains("photosynthesis") {
            0
        } else if text.contains("rust") || text.contains("compiler") {
            1
        } else if text.contains("ocean") {
            2
        } else {
            3
        }
    }
}

#[async_trait]
impl EmbeddingGenerator for KeywordEmbedding {
    fn describe(&self) -> String {
        "test:keywords".to_string()
    }

    async fn generate_raw(&self, text: &str) -> VectorResult<RawEmbedding> {
        let mut vector = vec![0.0; DIM];
        vector[Self::axis(text)] = 1.0;
        // One row per "token" so mean pooling is exercised too
        Ok(RawEmbedding::Nested(vec![vector.clone(), vector]))
    }
}

fn new_service(repository: Arc<InMemoryVectorRepository>) -> TextVectorService {
    TextVectorService::new(
        repository,
        EmbeddingOrchestrator::new(Arc::new(KeywordEmbedding), DIM),
        StoreConfig::new(COLLECTION, DIM),
    )
}

async fn ready_service() -> (TextVectorService, Arc<InMemoryVectorRepository>) {
    let repository = Arc::new(InMemoryVectorRepository::new());
    let service = new_service(Arc::clone(&repository));
    service.initialize(&CallContext::new()).await.unwrap();
    (service, repository)
}

// ============================================================================
// Record Lifecycle
// ============================================================================

#[tokio::test]
async fn test_store_and_get_round_trip() {
    let (service, _) = ready_service().await;
    let ctx = CallContext::new();
    let builder = TestDataBuilder::from_test_name("round_trip");

    let id = builder.record_id("main");
    let embedding = vec![0.6, 0.8, 0.0, 0.0];
    let mut metadata = Map::new();
    metadata.insert("lang".to_string(), json!("en"));
    metadata.insert("tags".to_string(), json!(["a", "b"]));

    let stored = service
        .store_embedding(
            &ctx,
            NewVectorRecord::new("t", embedding.clone())
                .with_id(id.clone())
                .with_metadata(metadata.clone()),
        )
        .await
        .unwrap();
    assert_eq!(stored, id);

    let record = service.get(&ctx, &id).await.unwrap();
    let record = assert_some(record, "stored record should be found");

    assert_eq!(record.id, id);
    assert_eq!(record.text, "t");
    assert_eq!(record.metadata, metadata);
    assert_eq!(record.storage_key, identity::derive_key(Some(id.as_str())));
    assert_vec_close(&record.embedding, &embedding, 1e-6, "embedding");
}

#[tokio::test]
async fn test_store_overwrites_record_with_same_id() {
    let (service, _) = ready_service().await;
    let ctx = CallContext::new();

    service
        .store(&ctx, StoreRequest::new("about the sun").with_id("doc_001"))
        .await
        .unwrap();
    service
        .store(&ctx, StoreRequest::new("about the ocean").with_id("doc_001"))
        .await
        .unwrap();

    let stats = service.stats(&ctx).await.unwrap();
    assert_eq!(stats.collection.points_count, 1);
    assert_eq!(stats.embedding_model, "test:keywords");

    let record = assert_some(service.get(&ctx, "doc_001").await.unwrap(), "doc_001");
    assert_eq!(record.text, "about the ocean");
    assert_vec_close(&record.embedding, &[0.0, 0.0, 1.0, 0.0], 1e-6, "overwritten embedding");
}

#[tokio::test]
async fn test_store_without_id_returns_generated_key() {
    let (service, _) = ready_service().await;
    let ctx = CallContext::new();

    let id = service
        .store(&ctx, StoreRequest::new("rust compiler internals"))
        .await
        .unwrap();

    let key: Uuid = id.parse().expect("generated id should be a UUID");
    let record = assert_some(service.get(&ctx, &id).await.unwrap(), "generated id");
    assert_eq!(record.storage_key, key);
}

#[tokio::test]
async fn test_native_key_is_used_as_storage_key() {
    let (service, _) = ready_service().await;
    let ctx = CallContext::new();
    let native = Uuid::new_v4().to_string();

    service
        .store(&ctx, StoreRequest::new("sunlight").with_id(native.clone()))
        .await
        .unwrap();

    let record = assert_some(service.get(&ctx, &native).await.unwrap(), "native id");
    assert_eq!(record.storage_key.to_string(), native);
}

#[tokio::test]
async fn test_delete_then_miss() {
    let (service, _) = ready_service().await;
    let ctx = CallContext::new();

    service
        .store(&ctx, StoreRequest::new("photosynthesis").with_id("doc_001"))
        .await
        .unwrap();

    assert!(service.delete(&ctx, "doc_001").await.unwrap());
    assert!(service.get(&ctx, "doc_001").await.unwrap().is_none());
    assert!(!service.delete(&ctx, "doc_001").await.unwrap());
    assert!(!service.delete(&ctx, "never_stored").await.unwrap());
}

#[tokio::test]
async fn test_record_under_foreign_key_is_found_by_original_id() {
    let (service, repository) = ready_service().await;
    let ctx = CallContext::new();

    // Written by another writer that picked its own key
    let foreign_key = Uuid::new_v4();
    let point = Point::new(foreign_key, vec![0.0, 1.0, 0.0, 0.0]).with_payload(json!({
        "originalId": "legacy_7",
        "text": "rust from an older import",
        "metadata": {},
        "createdAt": "2025-06-01T12:00:00Z",
    }));
    repository.upsert(COLLECTION, vec![point], true).await.unwrap();

    let record = assert_some(service.get(&ctx, "legacy_7").await.unwrap(), "legacy_7");
    assert_eq!(record.storage_key, foreign_key);
    assert_eq!(record.text, "rust from an older import");

    assert!(service.delete(&ctx, "legacy_7").await.unwrap());
    assert!(service.get(&ctx, "legacy_7").await.unwrap().is_none());
}

// ============================================================================
// Search
// ============================================================================

#[tokio::test]
async fn test_end_to_end_vector_search() {
    let repository = Arc::new(InMemoryVectorRepository::new());
    repository
        .create_collection(&CollectionSpec::new(COLLECTION, DIM))
        .await
        .unwrap();
    let records = VectorRecordStore::new(repository, COLLECTION, DIM, Readiness::ready());
    let search = SimilaritySearch::new(records.clone());
    let ctx = CallContext::new();

    let v1 = vec![1.0, 0.0, 0.0, 0.0];
    let v2 = vec![0.05, 0.998, 0.0, 0.0];
    records
        .store(
            &ctx,
            NewVectorRecord::new("Photosynthesis converts sunlight into energy", v1.clone())
                .with_id("doc_001"),
        )
        .await
        .unwrap();
    records
        .store(&ctx, NewVectorRecord::new("Unrelated text", v2).with_id("doc_002"))
        .await
        .unwrap();

    let hits = search
        .search(&ctx, v1, SearchParams::new(5, 0.5))
        .await
        .unwrap();

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "doc_001");
    assert!((hits[0].score - 1.0).abs() < 1e-5);
    assert_eq!(hits[0].text, "Photosynthesis converts sunlight into energy");
}

#[tokio::test]
async fn test_text_search_ranks_matching_records_first() {
    let (service, _) = ready_service().await;
    let ctx = CallContext::new();

    let ids = service
        .store_batch(
            &ctx,
            vec![
                StoreRequest::new("The sun rises").with_id("sun"),
                StoreRequest::new("Rust compiler errors").with_id("rust"),
                StoreRequest::new("Ocean currents").with_id("ocean"),
            ],
        )
        .await
        .unwrap();
    assert_eq!(ids, vec!["sun", "rust", "ocean"]);

    let hits = service
        .search(&ctx, "why is the sun hot", SearchParams::new(3, 0.5))
        .await
        .unwrap();
    let found: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(found, vec!["sun"]);
}

#[tokio::test]
async fn test_search_similar_to_excludes_source_record() {
    let (service, _) = ready_service().await;
    let ctx = CallContext::new();

    service
        .store_batch(
            &ctx,
            vec![
                StoreRequest::new("sunlight on leaves").with_id("a"),
                StoreRequest::new("sunset colours").with_id("b"),
                StoreRequest::new("ocean waves").with_id("c"),
            ],
        )
        .await
        .unwrap();

    let hits = service
        .search_similar_to(&ctx, "a", SearchParams::new(1, 0.0))
        .await
        .unwrap();
    let hits = assert_some(hits, "source record exists");

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "b");

    let missing = service
        .search_similar_to(&ctx, "zzz", SearchParams::default())
        .await
        .unwrap();
    assert!(missing.is_none());
}

// ============================================================================
// Policies
// ============================================================================

#[tokio::test]
async fn test_operations_fail_until_initialized() {
    let repository = Arc::new(InMemoryVectorRepository::new());
    let service = new_service(repository);
    let ctx = CallContext::new();

    let err = service.get(&ctx, "doc_001").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotInitialized);
    assert!(!service.health_check(&ctx).await);

    service.initialize(&ctx).await.unwrap();
    assert!(service.get(&ctx, "doc_001").await.unwrap().is_none());
    assert!(service.health_check(&ctx).await);
}

#[tokio::test]
async fn test_initialize_reuses_existing_collection() {
    let repository = Arc::new(InMemoryVectorRepository::new());
    let first = new_service(Arc::clone(&repository));
    let ctx = CallContext::new();
    first.initialize(&ctx).await.unwrap();
    first
        .store(&ctx, StoreRequest::new("ocean").with_id("kept"))
        .await
        .unwrap();

    let second = new_service(repository);
    second.initialize(&ctx).await.unwrap();
    assert!(second.get(&ctx, "kept").await.unwrap().is_some());
}

#[tokio::test]
async fn test_batch_with_invalid_item_writes_nothing() {
    let (service, _) = ready_service().await;
    let ctx = CallContext::new();

    let err = service
        .store_batch(
            &ctx,
            vec![
                StoreRequest::new("valid sun text").with_id("ok"),
                StoreRequest::new("").with_id("empty"),
            ],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, VectorError::BatchRejected { ref failures } if failures.len() == 1));

    let err = service
        .store_embedding(
            &ctx,
            NewVectorRecord::new("short vector", vec![1.0, 0.0]).with_id("short"),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DimensionMismatch);

    let stats = service.stats(&ctx).await.unwrap();
    assert_eq!(stats.collection.points_count, 0);
}

#[tokio::test]
async fn test_cancelled_context_stops_calls() {
    let (service, _) = ready_service().await;
    let token = CancellationToken::new();
    let ctx = CallContext::new().with_cancellation(token.clone());
    token.cancel();

    let err = service
        .store(&ctx, StoreRequest::new("sun").with_id("late"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);

    let fresh = CallContext::new();
    assert!(service.get(&fresh, "late").await.unwrap().is_none());
}

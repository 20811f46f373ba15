use tracing::{debug, instrument};

use crate::context::CallContext;
use crate::error::{VectorError, VectorResult};
use crate::models::{
    MAX_SEARCH_LIMIT, PayloadFields, SearchHit, SearchParams, SearchQuery, SearchResult,
};
use crate::records::VectorRecordStore;

/// Threshold/limit-bounded nearest-vector queries over a record collection.
#[derive(Clone)]
pub struct SimilaritySearch {
    records: VectorRecordStore,
}

impl SimilaritySearch {
    pub fn new(records: VectorRecordStore) -> Self {
        Self { records }
    }

    /// Clamps caller limits into the supported range.
    ///
    /// Limits above [`MAX_SEARCH_LIMIT`] and negative thresholds are corrected
    /// silently; a zero limit or a NaN threshold cannot be and is rejected.
    pub fn clamp(params: SearchParams) -> VectorResult<SearchParams> {
        if params.limit == 0 {
            return Err(VectorError::Validation("limit must be at least 1".to_string()));
        }
        if params.threshold.is_nan() {
            return Err(VectorError::Validation("threshold must be a number".to_string()));
        }
        Ok(SearchParams {
            limit: params.limit.min(MAX_SEARCH_LIMIT),
            threshold: params.threshold.max(0.0),
        })
    }

    /// Records nearest to `vector`, best first.
    #[instrument(skip(self, ctx, vector), fields(limit = params.limit, threshold = params.threshold))]
    pub async fn search(
        &self,
        ctx: &CallContext,
        vector: Vec<f32>,
        params: SearchParams,
    ) -> VectorResult<Vec<SearchHit>> {
        self.records.readiness().ensure_ready()?;
        self.records.check_dimension(&vector)?;
        let params = Self::clamp(params)?;

        self.nearest(ctx, vector, params.limit, params.threshold).await
    }

    /// Records similar to the one stored under `existing_id`, never including it.
    ///
    /// Returns `None` when `existing_id` does not resolve to a record.
    #[instrument(skip(self, ctx), fields(limit = params.limit, threshold = params.threshold))]
    pub async fn search_similar_to(
        &self,
        ctx: &CallContext,
        existing_id: &str,
        params: SearchParams,
    ) -> VectorResult<Option<Vec<SearchHit>>> {
        self.records.readiness().ensure_ready()?;
        let params = Self::clamp(params)?;

        let Some(source) = self.records.get(ctx, existing_id).await? else {
            debug!(id = %existing_id, "Similarity source not found");
            return Ok(None);
        };
        self.records.check_dimension(&source.embedding)?;

        // One extra slot so dropping the source record still fills the limit
        let mut hits = self
            .nearest(ctx, source.embedding, params.limit + 1, params.threshold)
            .await?;
        hits.retain(|hit| hit.id != existing_id && hit.storage_key != source.storage_key);
        hits.truncate(params.limit as usize);

        Ok(Some(hits))
    }

    async fn nearest(
        &self,
        ctx: &CallContext,
        vector: Vec<f32>,
        limit: u32,
        threshold: f32,
    ) -> VectorResult<Vec<SearchHit>> {
        let mut query = SearchQuery::new(vector, limit);
        query.score_threshold = Some(threshold);

        let results = ctx
            .run(
                "vector_store.search",
                self.records
                    .repository()
                    .search(self.records.collection(), query),
            )
            .await?;

        let mut hits: Vec<SearchHit> = results.into_iter().map(to_hit).collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(hits)
    }
}

fn to_hit(result: SearchResult) -> SearchHit {
    let key = result.id;
    let fields = PayloadFields::read(result.payload.as_ref());

    SearchHit {
        id: fields.original_id.unwrap_or_else(|| key.to_string()),
        storage_key: key,
        text: fields.text,
        score: result.score,
        metadata: fields.metadata,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use uuid::Uuid;

    use super::*;
    use crate::context::Readiness;
    use crate::error::ErrorKind;
    use crate::identity;
    use crate::models::Point;
    use crate::repository::MockVectorRepository;

    const COLLECTION: &str = "texts";
    const DIM: usize = 3;

    fn search_with(repo: MockVectorRepository) -> SimilaritySearch {
        SimilaritySearch::new(VectorRecordStore::new(
            Arc::new(repo),
            COLLECTION,
            DIM,
            Readiness::ready(),
        ))
    }

    fn payload(id: &str) -> serde_json::Value {
        json!({
            "originalId": id,
            "text": format!("text of {}", id),
            "metadata": {},
            "createdAt": "2026-01-01T00:00:00Z",
        })
    }

    fn result(id: &str, score: f32) -> SearchResult {
        SearchResult {
            id: identity::derive_key(Some(id)),
            score,
            payload: Some(payload(id)),
            vector: None,
        }
    }

    #[test]
    fn test_clamp_corrects_out_of_range_input() {
        let clamped = SimilaritySearch::clamp(SearchParams::new(500, -1.0)).unwrap();
        assert_eq!(clamped, SearchParams::new(100, 0.0));

        let unchanged = SimilaritySearch::clamp(SearchParams::new(5, 0.5)).unwrap();
        assert_eq!(unchanged, SearchParams::new(5, 0.5));
    }

    #[test]
    fn test_clamp_rejects_unclampable_input() {
        for params in [SearchParams::new(0, 0.5), SearchParams::new(5, f32::NAN)] {
            let err = SimilaritySearch::clamp(params).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
    }

    #[tokio::test]
    async fn test_search_sends_clamped_cosine_query() {
        let mut repo = MockVectorRepository::new();
        repo.expect_search()
            .withf(|collection, query| {
                collection == COLLECTION
                    && query.limit == 100
                    && query.score_threshold == Some(0.0)
                    && query.with_payloads
            })
            .times(1)
            .returning(|_, _| Ok(vec![result("b", 0.4), result("a", 0.9)]));
        let search = search_with(repo);

        let hits = search
            .search(&CallContext::new(), vec![1.0, 0.0, 0.0], SearchParams::new(500, -1.0))
            .await
            .unwrap();

        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(hits[0].text, "text of a");
    }

    #[tokio::test]
    async fn test_search_rejects_wrong_dimension_before_io() {
        let mut repo = MockVectorRepository::new();
        repo.expect_search().never();
        let search = search_with(repo);

        let err = search
            .search(&CallContext::new(), vec![1.0; DIM + 1], SearchParams::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DimensionMismatch);
    }

    #[tokio::test]
    async fn test_hit_without_original_id_falls_back_to_key() {
        let key = Uuid::new_v4();
        let mut repo = MockVectorRepository::new();
        repo.expect_search().returning(move |_, _| {
            Ok(vec![SearchResult {
                id: key,
                score: 0.7,
                payload: None,
                vector: None,
            }])
        });
        let search = search_with(repo);

        let hits = search
            .search(&CallContext::new(), vec![0.0, 1.0, 0.0], SearchParams::default())
            .await
            .unwrap();
        assert_eq!(hits[0].id, key.to_string());
    }

    #[test]
    fn test_hit_from_partial_payload_keeps_original_id() {
        let key = Uuid::new_v4();
        let hit = to_hit(SearchResult {
            id: key,
            score: 0.9,
            payload: Some(json!({"originalId": "doc_001", "text": "t"})),
            vector: None,
        });

        assert_eq!(hit.id, "doc_001");
        assert_eq!(hit.storage_key, key);
        assert_eq!(hit.text, "t");
        assert!(hit.metadata.is_empty());
    }

    #[tokio::test]
    async fn test_search_similar_to_excludes_source() {
        let source_key = identity::derive_key(Some("doc_001"));
        let mut repo = MockVectorRepository::new();
        repo.expect_retrieve().returning(move |_, _, _, _| {
            Ok(vec![
                Point::new(source_key, vec![1.0, 0.0, 0.0]).with_payload(payload("doc_001")),
            ])
        });
        repo.expect_search()
            .withf(|_, query| query.limit == 3 && query.vector == vec![1.0, 0.0, 0.0])
            .returning(|_, _| {
                Ok(vec![
                    result("doc_001", 1.0),
                    result("doc_002", 0.8),
                    result("doc_003", 0.6),
                ])
            });
        let search = search_with(repo);

        let hits = search
            .search_similar_to(&CallContext::new(), "doc_001", SearchParams::new(2, 0.0))
            .await
            .unwrap()
            .unwrap();

        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["doc_002", "doc_003"]);
    }

    #[tokio::test]
    async fn test_search_similar_to_missing_source_is_none() {
        let mut repo = MockVectorRepository::new();
        repo.expect_retrieve().returning(|_, _, _, _| Ok(vec![]));
        repo.expect_scroll().returning(|_, _, _, _, _| Ok(vec![]));
        repo.expect_search().never();
        let search = search_with(repo);

        let result = search
            .search_similar_to(&CallContext::new(), "ghost", SearchParams::default())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_search_before_ready_is_not_initialized() {
        let mut repo = MockVectorRepository::new();
        repo.expect_search().never();
        let search = SimilaritySearch::new(VectorRecordStore::new(
            Arc::new(repo),
            COLLECTION,
            DIM,
            Readiness::new(),
        ));

        let err = search
            .search(&CallContext::new(), vec![0.0; DIM], SearchParams::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotInitialized);
    }
}

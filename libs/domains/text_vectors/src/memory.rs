//! In-process vector repository.
//!
//! Brute-force scoring over a map of points. Meant for tests and local runs
//! where a Qdrant instance is not available; the behaviour mirrors the parts
//! of Qdrant the record store relies on (upsert replaces, missing ids are
//! skipped on retrieve, scores filtered by threshold and sorted best first).

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{VectorError, VectorResult};
use crate::models::{
    CollectionInfo, CollectionSpec, CollectionStatus, DistanceMetric, PayloadFilter, Point,
    SearchQuery, SearchResult,
};
use crate::repository::VectorRepository;

struct Collection {
    spec: CollectionSpec,
    points: HashMap<Uuid, Point>,
}

#[derive(Default)]
pub struct InMemoryVectorRepository {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryVectorRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn missing(collection_name: &str) -> VectorError {
        VectorError::Config(format!("collection '{}' does not exist", collection_name))
    }

    fn project(point: &Point, with_payload: bool, with_vector: bool) -> Point {
        Point {
            id: point.id,
            values: if with_vector { point.values.clone() } else { Vec::new() },
            payload: if with_payload { point.payload.clone() } else { None },
        }
    }
}

/// Similarity of two vectors under `metric`; higher is closer.
pub fn score(metric: DistanceMetric, a: &[f32], b: &[f32]) -> f32 {
    match metric {
        DistanceMetric::Cosine => cosine_similarity(a, b),
        DistanceMetric::DotProduct => a.iter().zip(b).map(|(x, y)| x * y).sum(),
        DistanceMetric::Euclidean => -a
            .iter()
            .zip(b)
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f32>()
            .sqrt(),
        DistanceMetric::Manhattan => -a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum::<f32>(),
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut norm_a, mut norm_b) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[async_trait]
impl VectorRepository for InMemoryVectorRepository {
    async fn health_check(&self) -> VectorResult<()> {
        Ok(())
    }

    async fn list_collections(&self) -> VectorResult<Vec<String>> {
        let collections = self.collections.read().await;
        Ok(collections.keys().cloned().collect())
    }

    async fn collection_info(&self, collection_name: &str) -> VectorResult<Option<CollectionInfo>> {
        let collections = self.collections.read().await;
        Ok(collections.get(collection_name).map(|c| CollectionInfo {
            name: c.spec.name.clone(),
            dimension: c.spec.dimension,
            distance: c.spec.distance,
            points_count: c.points.len() as u64,
            indexed_vectors_count: c.points.len() as u64,
            status: CollectionStatus::Green,
        }))
    }

    async fn create_collection(&self, spec: &CollectionSpec) -> VectorResult<()> {
        let mut collections = self.collections.write().await;
        if collections.contains_key(&spec.name) {
            return Err(VectorError::Config(format!(
                "collection '{}' already exists",
                spec.name
            )));
        }
        collections.insert(
            spec.name.clone(),
            Collection {
                spec: spec.clone(),
                points: HashMap::new(),
            },
        );
        Ok(())
    }

    async fn upsert(
        &self,
        collection_name: &str,
        points: Vec<Point>,
        _wait: bool,
    ) -> VectorResult<()> {
        let mut collections = self.collections.write().await;
        let collection = collections
            .get_mut(collection_name)
            .ok_or_else(|| Self::missing(collection_name))?;

        if let Some(bad) = points
            .iter()
            .find(|p| p.values.len() != collection.spec.dimension)
        {
            return Err(VectorError::dimension(
                collection.spec.dimension,
                bad.values.len(),
            ));
        }

        for point in points {
            collection.points.insert(point.id, point);
        }
        Ok(())
    }

    async fn search(
        &self,
        collection_name: &str,
        query: SearchQuery,
    ) -> VectorResult<Vec<SearchResult>> {
        let collections = self.collections.read().await;
        let collection = collections
            .get(collection_name)
            .ok_or_else(|| Self::missing(collection_name))?;

        let metric = collection.spec.distance;
        let mut results: Vec<SearchResult> = collection
            .points
            .values()
            .map(|p| (p, score(metric, &query.vector, &p.values)))
            .filter(|(_, s)| query.score_threshold.is_none_or(|t| *s >= t))
            .map(|(p, s)| SearchResult {
                id: p.id,
                score: s,
                payload: if query.with_payloads { p.payload.clone() } else { None },
                vector: query.with_vectors.then(|| p.values.clone()),
            })
            .collect();

        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(query.limit as usize);
        Ok(results)
    }

    async fn retrieve(
        &self,
        collection_name: &str,
        ids: Vec<Uuid>,
        with_payload: bool,
        with_vector: bool,
    ) -> VectorResult<Vec<Point>> {
        let collections = self.collections.read().await;
        let collection = collections
            .get(collection_name)
            .ok_or_else(|| Self::missing(collection_name))?;

        Ok(ids
            .iter()
            .filter_map(|id| collection.points.get(id))
            .map(|p| Self::project(p, with_payload, with_vector))
            .collect())
    }

    async fn scroll(
        &self,
        collection_name: &str,
        filter: PayloadFilter,
        limit: u32,
        with_payload: bool,
        with_vector: bool,
    ) -> VectorResult<Vec<Point>> {
        let collections = self.collections.read().await;
        let collection = collections
            .get(collection_name)
            .ok_or_else(|| Self::missing(collection_name))?;

        Ok(collection
            .points
            .values()
            .filter(|p| {
                p.payload
                    .as_ref()
                    .and_then(|payload| payload.get(&filter.key))
                    .and_then(|v| v.as_str())
                    == Some(filter.value.as_str())
            })
            .take(limit as usize)
            .map(|p| Self::project(p, with_payload, with_vector))
            .collect())
    }

    async fn delete(&self, collection_name: &str, ids: Vec<Uuid>, _wait: bool) -> VectorResult<()> {
        let mut collections = self.collections.write().await;
        let collection = collections
            .get_mut(collection_name)
            .ok_or_else(|| Self::missing(collection_name))?;

        for id in ids {
            collection.points.remove(&id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::ErrorKind;

    const COLLECTION: &str = "notes";

    async fn repository() -> InMemoryVectorRepository {
        let repo = InMemoryVectorRepository::new();
        repo.create_collection(&CollectionSpec::new(COLLECTION, 3))
            .await
            .unwrap();
        repo
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_search_orders_and_filters() {
        let repo = repository().await;
        let a = Point::new(Uuid::new_v4(), vec![1.0, 0.0, 0.0]);
        let b = Point::new(Uuid::new_v4(), vec![0.8, 0.6, 0.0]);
        let c = Point::new(Uuid::new_v4(), vec![0.0, 0.0, 1.0]);
        repo.upsert(COLLECTION, vec![c.clone(), b.clone(), a.clone()], true)
            .await
            .unwrap();

        let mut query = SearchQuery::new(vec![1.0, 0.0, 0.0], 10);
        query.score_threshold = Some(0.5);
        let results = repo.search(COLLECTION, query).await.unwrap();

        let ids: Vec<Uuid> = results.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![a.id, b.id]);
    }

    #[tokio::test]
    async fn test_upsert_rejects_wrong_dimension() {
        let repo = repository().await;
        let result = repo
            .upsert(COLLECTION, vec![Point::new(Uuid::new_v4(), vec![1.0])], true)
            .await;
        assert_eq!(result.unwrap_err().kind(), ErrorKind::DimensionMismatch);
    }

    #[tokio::test]
    async fn test_collection_lifecycle_errors_are_config_errors() {
        let repo = repository().await;

        let err = repo
            .create_collection(&CollectionSpec::new(COLLECTION, 3))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(err.to_string().contains("already exists"));

        let err = repo
            .upsert("missing", vec![Point::new(Uuid::new_v4(), vec![1.0, 0.0, 0.0])], true)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(err.to_string().contains("does not exist"));
    }

    #[tokio::test]
    async fn test_scroll_matches_payload_field() {
        let repo = repository().await;
        let point = Point::new(Uuid::new_v4(), vec![1.0, 0.0, 0.0])
            .with_payload(json!({"originalId": "doc_001"}));
        repo.upsert(COLLECTION, vec![point.clone()], true)
            .await
            .unwrap();

        let found = repo
            .scroll(COLLECTION, PayloadFilter::original_id("doc_001"), 1, true, false)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, point.id);
        assert!(found[0].values.is_empty());

        let missing = repo
            .scroll(COLLECTION, PayloadFilter::original_id("doc_002"), 1, true, false)
            .await
            .unwrap();
        assert!(missing.is_empty());
    }

    #[tokio::test]
    async fn test_retrieve_skips_missing_and_delete_removes() {
        let repo = repository().await;
        let point = Point::new(Uuid::new_v4(), vec![0.0, 1.0, 0.0]);
        repo.upsert(COLLECTION, vec![point.clone()], true)
            .await
            .unwrap();

        let found = repo
            .retrieve(COLLECTION, vec![point.id, Uuid::new_v4()], false, true)
            .await
            .unwrap();
        assert_eq!(found, vec![point.clone()]);

        repo.delete(COLLECTION, vec![point.id], true).await.unwrap();
        let info = repo.collection_info(COLLECTION).await.unwrap().unwrap();
        assert_eq!(info.points_count, 0);
    }
}

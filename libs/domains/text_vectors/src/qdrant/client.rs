use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    self, Condition, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter,
    GetPointsBuilder, PointId, PointStruct, ScrollPointsBuilder, SearchPointsBuilder,
    UpsertPointsBuilder, Value as QdrantValue, VectorParamsBuilder, value::Kind,
};
use tracing::debug;
use uuid::Uuid;

use super::QdrantConfig;
use crate::error::{VectorError, VectorResult};
use crate::models::{
    CollectionInfo, CollectionSpec, CollectionStatus, DistanceMetric, PayloadFilter, Point,
    SearchQuery, SearchResult,
};
use crate::repository::VectorRepository;

/// Qdrant-backed implementation of VectorRepository
pub struct QdrantRepository {
    client: Qdrant,
}

impl QdrantRepository {
    pub fn new(config: QdrantConfig) -> VectorResult<Self> {
        let mut builder = Qdrant::from_url(&config.url);

        if let Some(api_key) = config.api_key {
            builder = builder.api_key(api_key);
        }

        builder = builder.timeout(Duration::from_secs(config.timeout_secs));

        let client = builder
            .build()
            .map_err(|e| VectorError::upstream(format!("connect to {}", config.url), e))?;

        Ok(Self { client })
    }

    pub fn from_client(client: Qdrant) -> Self {
        Self { client }
    }

    fn to_qdrant_distance(metric: DistanceMetric) -> Distance {
        match metric {
            DistanceMetric::Cosine => Distance::Cosine,
            DistanceMetric::Euclidean => Distance::Euclid,
            DistanceMetric::DotProduct => Distance::Dot,
            DistanceMetric::Manhattan => Distance::Manhattan,
        }
    }

    fn from_qdrant_distance(distance: Distance) -> VectorResult<DistanceMetric> {
        match distance {
            Distance::Cosine => Ok(DistanceMetric::Cosine),
            Distance::Euclid => Ok(DistanceMetric::Euclidean),
            Distance::Dot => Ok(DistanceMetric::DotProduct),
            Distance::Manhattan => Ok(DistanceMetric::Manhattan),
            Distance::UnknownDistance => Err(VectorError::malformed(
                "qdrant collection config",
                "unknown distance metric",
            )),
        }
    }

    /// Keys whose upper 64 bits are zero stand for numeric Qdrant ids.
    fn uuid_to_point_id(id: Uuid) -> PointId {
        let raw = id.as_u128();
        if raw >> 64 == 0 {
            PointId::from(raw as u64)
        } else {
            PointId::from(id.to_string())
        }
    }

    fn point_id_to_uuid(point_id: Option<&PointId>) -> VectorResult<Uuid> {
        match point_id.and_then(|p| p.point_id_options.as_ref()) {
            Some(qdrant::point_id::PointIdOptions::Uuid(uuid_str)) => Uuid::parse_str(uuid_str)
                .map_err(|e| VectorError::malformed("qdrant point id", e.to_string())),
            // Numeric ids are not written by this crate but may exist in shared collections
            Some(qdrant::point_id::PointIdOptions::Num(num)) => Ok(Uuid::from_u128(*num as u128)),
            None => Err(VectorError::malformed("qdrant point id", "missing point id")),
        }
    }

    fn payload_to_qdrant(payload: Option<serde_json::Value>) -> HashMap<String, QdrantValue> {
        match payload {
            Some(serde_json::Value::Object(map)) => map
                .into_iter()
                .map(|(key, val)| (key, json_to_qdrant_value(val)))
                .collect(),
            _ => HashMap::new(),
        }
    }

    fn qdrant_to_payload(payload: HashMap<String, QdrantValue>) -> Option<serde_json::Value> {
        if payload.is_empty() {
            return None;
        }

        let map = payload
            .into_iter()
            .map(|(key, val)| (key, qdrant_value_to_json(val)))
            .collect();

        Some(serde_json::Value::Object(map))
    }

    /// Extract vector values from VectorsOutput
    /// Note: Uses deprecated data field for now until migration to 1.18+
    #[allow(deprecated)]
    fn extract_vector_from_output(vectors: Option<qdrant::VectorsOutput>) -> Option<Vec<f32>> {
        match vectors?.vectors_options? {
            qdrant::vectors_output::VectorsOptions::Vector(v) => Some(v.data),
            // Named vectors: the record store only ever writes the default vector
            qdrant::vectors_output::VectorsOptions::Vectors(map) => {
                map.vectors.into_values().next().map(|v| v.data)
            }
        }
    }

    fn extract_config_params(
        config: Option<&qdrant::CollectionConfig>,
    ) -> VectorResult<(usize, DistanceMetric)> {
        let params = config
            .and_then(|c| c.params.as_ref())
            .and_then(|p| p.vectors_config.as_ref())
            .and_then(|vc| vc.config.as_ref());

        match params {
            Some(qdrant::vectors_config::Config::Params(p)) => {
                Ok((p.size as usize, Self::from_qdrant_distance(p.distance())?))
            }
            Some(qdrant::vectors_config::Config::ParamsMap(map)) => match map.map.values().next() {
                Some(p) => Ok((p.size as usize, Self::from_qdrant_distance(p.distance())?)),
                None => Ok((0, DistanceMetric::Cosine)),
            },
            None => Ok((0, DistanceMetric::Cosine)),
        }
    }

    fn to_point(
        id: Option<PointId>,
        payload: HashMap<String, QdrantValue>,
        vectors: Option<qdrant::VectorsOutput>,
    ) -> VectorResult<Point> {
        Ok(Point {
            id: Self::point_id_to_uuid(id.as_ref())?,
            values: Self::extract_vector_from_output(vectors).unwrap_or_default(),
            payload: Self::qdrant_to_payload(payload),
        })
    }
}

fn json_to_qdrant_value(val: serde_json::Value) -> QdrantValue {
    let kind = match val {
        serde_json::Value::Null => Kind::NullValue(qdrant::NullValue::NullValue as i32),
        serde_json::Value::Bool(b) => Kind::BoolValue(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Kind::IntegerValue(i),
            None => Kind::DoubleValue(n.as_f64().unwrap_or_default()),
        },
        serde_json::Value::String(s) => Kind::StringValue(s),
        serde_json::Value::Array(items) => Kind::ListValue(qdrant::ListValue {
            values: items.into_iter().map(json_to_qdrant_value).collect(),
        }),
        serde_json::Value::Object(map) => Kind::StructValue(qdrant::Struct {
            fields: map
                .into_iter()
                .map(|(key, val)| (key, json_to_qdrant_value(val)))
                .collect(),
        }),
    };

    QdrantValue { kind: Some(kind) }
}

fn qdrant_value_to_json(val: QdrantValue) -> serde_json::Value {
    match val.kind {
        None | Some(Kind::NullValue(_)) => serde_json::Value::Null,
        Some(Kind::BoolValue(b)) => serde_json::Value::Bool(b),
        Some(Kind::IntegerValue(i)) => serde_json::Value::Number(i.into()),
        Some(Kind::DoubleValue(f)) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Some(Kind::StringValue(s)) => serde_json::Value::String(s),
        Some(Kind::ListValue(list)) => {
            serde_json::Value::Array(list.values.into_iter().map(qdrant_value_to_json).collect())
        }
        Some(Kind::StructValue(s)) => serde_json::Value::Object(
            s.fields
                .into_iter()
                .map(|(key, val)| (key, qdrant_value_to_json(val)))
                .collect(),
        ),
    }
}

#[async_trait]
impl VectorRepository for QdrantRepository {
    async fn health_check(&self) -> VectorResult<()> {
        self.client
            .health_check()
            .await
            .map_err(|e| VectorError::upstream("qdrant health check", e))?;
        Ok(())
    }

    async fn list_collections(&self) -> VectorResult<Vec<String>> {
        let collections = self
            .client
            .list_collections()
            .await
            .map_err(|e| VectorError::upstream("qdrant list collections", e))?;

        Ok(collections
            .collections
            .into_iter()
            .map(|c| c.name)
            .collect())
    }

    async fn collection_info(&self, collection_name: &str) -> VectorResult<Option<CollectionInfo>> {
        let exists = self
            .client
            .collection_exists(collection_name)
            .await
            .map_err(|e| {
                VectorError::upstream(format!("qdrant collection exists '{}'", collection_name), e)
            })?;
        if !exists {
            return Ok(None);
        }

        let info = self
            .client
            .collection_info(collection_name)
            .await
            .map_err(|e| {
                VectorError::upstream(format!("qdrant collection info '{}'", collection_name), e)
            })?;

        let result = info.result.ok_or_else(|| {
            VectorError::malformed("qdrant collection info", "missing result")
        })?;

        let (dimension, distance) = Self::extract_config_params(result.config.as_ref())?;

        let status = match result.status() {
            qdrant::CollectionStatus::Green => CollectionStatus::Green,
            qdrant::CollectionStatus::Yellow => CollectionStatus::Yellow,
            _ => CollectionStatus::Grey,
        };

        Ok(Some(CollectionInfo {
            name: collection_name.to_string(),
            dimension,
            distance,
            points_count: result.points_count.unwrap_or_default(),
            indexed_vectors_count: result.indexed_vectors_count.unwrap_or_default(),
            status,
        }))
    }

    async fn create_collection(&self, spec: &CollectionSpec) -> VectorResult<()> {
        let builder = CreateCollectionBuilder::new(&spec.name).vectors_config(
            VectorParamsBuilder::new(spec.dimension as u64, Self::to_qdrant_distance(spec.distance)),
        );

        self.client
            .create_collection(builder)
            .await
            .map_err(|e| VectorError::upstream(format!("qdrant create collection '{}'", spec.name), e))?;

        debug!(collection = %spec.name, dimension = spec.dimension, "Created qdrant collection");
        Ok(())
    }

    async fn upsert(
        &self,
        collection_name: &str,
        points: Vec<Point>,
        wait: bool,
    ) -> VectorResult<()> {
        let count = points.len();
        let points: Vec<PointStruct> = points
            .into_iter()
            .map(|p| {
                PointStruct::new(
                    Self::uuid_to_point_id(p.id),
                    p.values,
                    Self::payload_to_qdrant(p.payload),
                )
            })
            .collect();

        let builder = UpsertPointsBuilder::new(collection_name, points).wait(wait);

        self.client
            .upsert_points(builder)
            .await
            .map_err(|e| VectorError::upstream(format!("qdrant upsert {} point(s)", count), e))?;

        Ok(())
    }

    async fn search(
        &self,
        collection_name: &str,
        query: SearchQuery,
    ) -> VectorResult<Vec<SearchResult>> {
        let mut builder =
            SearchPointsBuilder::new(collection_name, query.vector, query.limit as u64)
                .with_vectors(query.with_vectors)
                .with_payload(query.with_payloads);

        if let Some(threshold) = query.score_threshold {
            builder = builder.score_threshold(threshold);
        }

        let results = self
            .client
            .search_points(builder)
            .await
            .map_err(|e| VectorError::upstream("qdrant search", e))?;

        results
            .result
            .into_iter()
            .map(|point| {
                Ok(SearchResult {
                    id: Self::point_id_to_uuid(point.id.as_ref())?,
                    score: point.score,
                    payload: Self::qdrant_to_payload(point.payload),
                    vector: Self::extract_vector_from_output(point.vectors),
                })
            })
            .collect()
    }

    async fn retrieve(
        &self,
        collection_name: &str,
        ids: Vec<Uuid>,
        with_payload: bool,
        with_vector: bool,
    ) -> VectorResult<Vec<Point>> {
        let point_ids: Vec<PointId> = ids.into_iter().map(Self::uuid_to_point_id).collect();

        let builder = GetPointsBuilder::new(collection_name, point_ids)
            .with_vectors(with_vector)
            .with_payload(with_payload);

        let results = self
            .client
            .get_points(builder)
            .await
            .map_err(|e| VectorError::upstream("qdrant retrieve", e))?;

        results
            .result
            .into_iter()
            .map(|point| Self::to_point(point.id, point.payload, point.vectors))
            .collect()
    }

    async fn scroll(
        &self,
        collection_name: &str,
        filter: PayloadFilter,
        limit: u32,
        with_payload: bool,
        with_vector: bool,
    ) -> VectorResult<Vec<Point>> {
        let context = format!("qdrant scroll {} == '{}'", filter.key, filter.value);

        let builder = ScrollPointsBuilder::new(collection_name)
            .filter(Filter::must([Condition::matches(filter.key, filter.value)]))
            .limit(limit)
            .with_payload(with_payload)
            .with_vectors(with_vector);

        let results = self
            .client
            .scroll(builder)
            .await
            .map_err(|e| VectorError::upstream(context, e))?;

        results
            .result
            .into_iter()
            .map(|point| Self::to_point(point.id, point.payload, point.vectors))
            .collect()
    }

    async fn delete(&self, collection_name: &str, ids: Vec<Uuid>, wait: bool) -> VectorResult<()> {
        let point_ids: Vec<PointId> = ids.into_iter().map(Self::uuid_to_point_id).collect();

        let builder = DeletePointsBuilder::new(collection_name)
            .points(point_ids)
            .wait(wait);

        self.client
            .delete_points(builder)
            .await
            .map_err(|e| VectorError::upstream("qdrant delete", e))?;

        Ok(())
    }
}

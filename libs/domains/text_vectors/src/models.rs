use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Dimension of the default sentence embedding model (all-MiniLM-L6-v2).
pub const DEFAULT_DIMENSION: usize = 384;

/// Hard ceiling on the number of hits a single search may return.
pub const MAX_SEARCH_LIMIT: u32 = 100;

pub const DEFAULT_SEARCH_LIMIT: u32 = 10;

/// Payload keys written alongside every point.
pub mod payload_keys {
    pub const ORIGINAL_ID: &str = "originalId";
    pub const TEXT: &str = "text";
    pub const METADATA: &str = "metadata";
    pub const CREATED_AT: &str = "createdAt";
}

/// Distance metric for similarity calculations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DistanceMetric {
    #[default]
    Cosine,
    Euclidean,
    DotProduct,
    Manhattan,
}

/// Collection layout required by the record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSpec {
    pub name: String,
    pub dimension: usize,
    pub distance: DistanceMetric,
}

impl CollectionSpec {
    pub fn new(name: impl Into<String>, dimension: usize) -> Self {
        Self {
            name: name.into(),
            dimension,
            distance: DistanceMetric::Cosine,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionStatus {
    Green,
    Yellow,
    Grey,
}

impl CollectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionStatus::Green => "green",
            CollectionStatus::Yellow => "yellow",
            CollectionStatus::Grey => "grey",
        }
    }
}

/// Collection information as reported by the vector store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub name: String,
    pub dimension: usize,
    pub distance: DistanceMetric,
    pub points_count: u64,
    pub indexed_vectors_count: u64,
    pub status: CollectionStatus,
}

/// Collection metadata plus the embedding source serving it.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionStats {
    pub collection: CollectionInfo,
    pub embedding_model: String,
}

/// A point as the vector store holds it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub id: Uuid,
    pub values: Vec<f32>,
    pub payload: Option<Value>,
}

impl Point {
    pub fn new(id: Uuid, values: Vec<f32>) -> Self {
        Self {
            id,
            values,
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// `originalId` from the payload, if the point carries one.
    pub fn original_id(&self) -> Option<&str> {
        self.payload
            .as_ref()
            .and_then(|p| p.get(payload_keys::ORIGINAL_ID))
            .and_then(Value::as_str)
    }
}

/// Nearest-neighbour query sent to the vector store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub vector: Vec<f32>,
    pub limit: u32,
    pub score_threshold: Option<f32>,
    pub with_vectors: bool,
    pub with_payloads: bool,
}

impl SearchQuery {
    pub fn new(vector: Vec<f32>, limit: u32) -> Self {
        Self {
            vector,
            limit,
            score_threshold: None,
            with_vectors: false,
            with_payloads: true,
        }
    }
}

/// A scored point returned by the vector store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: Uuid,
    pub score: f32,
    pub payload: Option<Value>,
    pub vector: Option<Vec<f32>>,
}

/// Exact-match condition on a payload field, used for scans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadFilter {
    pub key: String,
    pub value: String,
}

impl PayloadFilter {
    pub fn matches(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn original_id(id: &str) -> Self {
        Self::matches(payload_keys::ORIGINAL_ID, id)
    }
}

/// A stored text with its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub storage_key: Uuid,
    pub text: String,
    pub embedding: Vec<f32>,
    pub metadata: Map<String, Value>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Input for writing a record whose embedding is already known.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NewVectorRecord {
    pub id: Option<String>,
    pub text: String,
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl NewVectorRecord {
    pub fn new(text: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            id: None,
            text: text.into(),
            embedding,
            metadata: Map::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Input for writing a record from text alone; the embedding is generated.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StoreRequest {
    pub id: Option<String>,
    pub text: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl StoreRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: None,
            text: text.into(),
            metadata: Map::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    pub(crate) fn into_record(self, embedding: Vec<f32>) -> NewVectorRecord {
        NewVectorRecord {
            id: self.id,
            text: self.text,
            embedding,
            metadata: self.metadata,
        }
    }
}

/// Payload persisted next to each vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredPayload {
    pub original_id: String,
    pub text: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    pub created_at: DateTime<Utc>,
}

/// A stored payload read field by field.
///
/// Points written by other tools may carry only some of the keys; whatever
/// is present is kept and the rest falls back to empty values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PayloadFields {
    pub original_id: Option<String>,
    pub text: String,
    pub metadata: Map<String, Value>,
    pub created_at: Option<DateTime<Utc>>,
}

impl PayloadFields {
    pub fn read(payload: Option<&Value>) -> Self {
        let Some(payload) = payload else {
            return Self::default();
        };

        let text_field = |key: &str| payload.get(key).and_then(Value::as_str).map(str::to_string);

        Self {
            original_id: text_field(payload_keys::ORIGINAL_ID),
            text: text_field(payload_keys::TEXT).unwrap_or_default(),
            metadata: payload
                .get(payload_keys::METADATA)
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default(),
            created_at: text_field(payload_keys::CREATED_AT)
                .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
                .map(|at| at.with_timezone(&Utc)),
        }
    }
}

/// Caller-facing search limits, clamped before use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchParams {
    pub limit: u32,
    pub threshold: f32,
}

impl SearchParams {
    pub fn new(limit: u32, threshold: f32) -> Self {
        Self { limit, threshold }
    }
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            limit: DEFAULT_SEARCH_LIMIT,
            threshold: 0.0,
        }
    }
}

/// One ranked search result, addressed by original id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub storage_key: Uuid,
    pub text: String,
    pub score: f32,
    pub metadata: Map<String, Value>,
}

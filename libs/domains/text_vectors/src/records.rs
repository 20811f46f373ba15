use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::context::{CallContext, Readiness};
use crate::error::{BatchItemError, VectorError, VectorResult};
use crate::identity;
use crate::models::{
    NewVectorRecord, PayloadFields, PayloadFilter, Point, StoredPayload, VectorRecord,
};
use crate::repository::VectorRepository;

/// Create/read/delete lifecycle of vector records in one collection.
///
/// Records are addressed by caller id. The storage key is derived from the id
/// and the id itself is kept in the payload, so a record can be found either
/// way.
#[derive(Clone)]
pub struct VectorRecordStore {
    repository: Arc<dyn VectorRepository>,
    collection: String,
    dimension: usize,
    readiness: Readiness,
}

impl VectorRecordStore {
    pub fn new(
        repository: Arc<dyn VectorRepository>,
        collection: impl Into<String>,
        dimension: usize,
        readiness: Readiness,
    ) -> Self {
        Self {
            repository,
            collection: collection.into(),
            dimension,
            readiness,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub(crate) fn repository(&self) -> &Arc<dyn VectorRepository> {
        &self.repository
    }

    pub(crate) fn readiness(&self) -> &Readiness {
        &self.readiness
    }

    pub(crate) fn check_dimension(&self, vector: &[f32]) -> VectorResult<()> {
        if vector.len() != self.dimension {
            return Err(VectorError::dimension(self.dimension, vector.len()));
        }
        Ok(())
    }

    fn validate(&self, record: &NewVectorRecord) -> VectorResult<()> {
        if record.text.trim().is_empty() {
            return Err(VectorError::Validation("text must not be empty".to_string()));
        }
        if matches!(record.id.as_deref(), Some("")) {
            return Err(VectorError::Validation("id must not be empty".to_string()));
        }
        self.check_dimension(&record.embedding)
    }

    /// Turns a validated record into the point to upsert and the id to hand back.
    fn to_point(record: NewVectorRecord) -> VectorResult<(String, Point)> {
        let key = identity::derive_key(record.id.as_deref());
        let id = record.id.unwrap_or_else(|| key.to_string());

        let payload = StoredPayload {
            original_id: id.clone(),
            text: record.text,
            metadata: record.metadata,
            created_at: Utc::now(),
        };

        let point = Point::new(key, record.embedding).with_payload(serde_json::to_value(payload)?);
        Ok((id, point))
    }

    /// Writes one record and waits for the store to acknowledge it.
    ///
    /// Returns the caller's id, or the generated key when none was given.
    #[instrument(skip(self, ctx, record), fields(id = ?record.id))]
    pub async fn store(&self, ctx: &CallContext, record: NewVectorRecord) -> VectorResult<String> {
        self.readiness.ensure_ready()?;
        self.validate(&record)?;

        let (id, point) = Self::to_point(record)?;
        let key = point.id;

        ctx.run(
            "vector_store.upsert",
            self.repository.upsert(&self.collection, vec![point], true),
        )
        .await?;

        debug!(%id, %key, "Stored vector record");
        Ok(id)
    }

    /// Writes all records in one batched upsert, or none of them.
    ///
    /// Every record is validated first; if any fails, the call returns
    /// `BatchRejected` listing each failing item and nothing is written.
    #[instrument(skip(self, ctx, records), fields(count = records.len()))]
    pub async fn store_batch(
        &self,
        ctx: &CallContext,
        records: Vec<NewVectorRecord>,
    ) -> VectorResult<Vec<String>> {
        self.readiness.ensure_ready()?;

        let failures: Vec<BatchItemError> = records
            .iter()
            .enumerate()
            .filter_map(|(index, record)| {
                self.validate(record).err().map(|error| BatchItemError {
                    index,
                    id: record.id.clone(),
                    error,
                })
            })
            .collect();
        if !failures.is_empty() {
            return Err(VectorError::BatchRejected { failures });
        }
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let (ids, points): (Vec<String>, Vec<Point>) = records
            .into_iter()
            .map(Self::to_point)
            .collect::<VectorResult<Vec<_>>>()?
            .into_iter()
            .unzip();

        ctx.run(
            "vector_store.upsert_batch",
            self.repository.upsert(&self.collection, points, true),
        )
        .await?;

        debug!(count = ids.len(), "Stored vector record batch");
        Ok(ids)
    }

    /// Finds the stored point for `id`.
    ///
    /// Tries the derived key first; when that misses and `id` is not itself a
    /// native key, scans for a payload whose `originalId` equals `id`. Records
    /// written under a different key scheme are still reachable this way.
    pub(crate) async fn locate(
        &self,
        ctx: &CallContext,
        id: &str,
        with_vector: bool,
    ) -> VectorResult<Option<Point>> {
        if id.is_empty() {
            return Err(VectorError::Validation("id must not be empty".to_string()));
        }

        let key = identity::derive_key(Some(id));
        let direct = ctx
            .run(
                "vector_store.retrieve",
                self.repository
                    .retrieve(&self.collection, vec![key], true, with_vector),
            )
            .await?;

        if let Some(point) = direct.into_iter().next() {
            return Ok(Some(point));
        }
        if identity::is_native_key(id) {
            return Ok(None);
        }

        debug!(%id, %key, "Direct lookup missed, scanning by original id");
        let scanned = ctx
            .run(
                "vector_store.scroll",
                self.repository.scroll(
                    &self.collection,
                    PayloadFilter::original_id(id),
                    1,
                    true,
                    with_vector,
                ),
            )
            .await?;

        Ok(scanned.into_iter().next())
    }

    /// Storage key currently holding `id`, if any.
    pub async fn resolve_key(&self, ctx: &CallContext, id: &str) -> VectorResult<Option<Uuid>> {
        self.readiness.ensure_ready()?;
        Ok(self.locate(ctx, id, false).await?.map(|p| p.id))
    }

    #[instrument(skip(self, ctx))]
    pub async fn get(&self, ctx: &CallContext, id: &str) -> VectorResult<Option<VectorRecord>> {
        self.readiness.ensure_ready()?;
        self.locate(ctx, id, true)
            .await?
            .map(to_record)
            .transpose()
    }

    /// Removes the record for `id`; `false` when there was nothing to remove.
    #[instrument(skip(self, ctx))]
    pub async fn delete(&self, ctx: &CallContext, id: &str) -> VectorResult<bool> {
        self.readiness.ensure_ready()?;

        let Some(point) = self.locate(ctx, id, false).await? else {
            return Ok(false);
        };

        ctx.run(
            "vector_store.delete",
            self.repository.delete(&self.collection, vec![point.id], true),
        )
        .await?;

        debug!(%id, key = %point.id, "Deleted vector record");
        Ok(true)
    }
}

/// Rebuilds a record from a stored point.
///
/// Only a point with no payload at all is rejected; partial payloads keep
/// whatever fields they carry and the id falls back to the storage key.
pub(crate) fn to_record(point: Point) -> VectorResult<VectorRecord> {
    let key = point.id;
    if point.payload.is_none() {
        return Err(VectorError::malformed(format!("point {}", key), "missing payload"));
    }
    let fields = PayloadFields::read(point.payload.as_ref());

    Ok(VectorRecord {
        id: fields.original_id.unwrap_or_else(|| key.to_string()),
        storage_key: key,
        text: fields.text,
        embedding: point.values,
        metadata: fields.metadata,
        created_at: fields.created_at,
    })
}

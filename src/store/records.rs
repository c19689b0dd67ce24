//! Conversion record storage.
//!
//! [`RecordStore`] is what the handler and orchestrator talk to. Both
//! implementations refuse writes that would move a record backwards through
//! its lifecycle (see [`ConversionStatus::can_transition_to`]); the REST store
//! does so in the database by filtering the update on the current status.

use crate::error::DocuScanError;
use crate::record::{ConversionRecord, ConversionStatus, NewConversion, RecordUpdate};
use crate::store::rest::{error_text, RestConnection};
use async_trait::async_trait;
use reqwest::Method;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// A table of conversion records keyed by id.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Create a `pending` record; the store assigns `id` and `created_at`.
    async fn insert(&self, new: NewConversion) -> Result<ConversionRecord, DocuScanError>;

    /// Apply a partial update to the record with `id`.
    async fn update(&self, id: &str, update: RecordUpdate)
        -> Result<ConversionRecord, DocuScanError>;

    async fn get(&self, id: &str) -> Result<Option<ConversionRecord>, DocuScanError>;

    /// Most recent records first, at most `limit`.
    async fn list_recent(&self, limit: usize) -> Result<Vec<ConversionRecord>, DocuScanError>;
}

// ── In-memory ────────────────────────────────────────────────────────────

/// Process-local record store. Used by tests and single-process deployments.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: RwLock<HashMap<String, ConversionRecord>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn insert(&self, new: NewConversion) -> Result<ConversionRecord, DocuScanError> {
        let record = ConversionRecord::new(uuid::Uuid::new_v4().to_string(), new);
        self.records
            .write()
            .await
            .insert(record.id.clone(), record.clone());
        debug!(conversion_id = %record.id, "Inserted conversion record");
        Ok(record)
    }

    async fn update(
        &self,
        id: &str,
        update: RecordUpdate,
    ) -> Result<ConversionRecord, DocuScanError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(id)
            .ok_or_else(|| DocuScanError::RecordNotFound { id: id.to_string() })?;

        record
            .apply(&update)
            .map_err(|from| DocuScanError::InvalidTransition {
                id: id.to_string(),
                from,
                to: update.status(),
            })?;
        debug!(conversion_id = %id, status = %record.status, "Updated conversion record");
        Ok(record.clone())
    }

    async fn get(&self, id: &str) -> Result<Option<ConversionRecord>, DocuScanError> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<ConversionRecord>, DocuScanError> {
        let mut all: Vec<ConversionRecord> = self.records.read().await.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        all.truncate(limit);
        Ok(all)
    }
}

// ── PostgREST ────────────────────────────────────────────────────────────

/// Record store backed by a PostgREST table (`/rest/v1/<table>`).
#[derive(Debug, Clone)]
pub struct RestRecordStore {
    conn: RestConnection,
    table: String,
}

impl RestRecordStore {
    pub fn new(conn: RestConnection, table: impl Into<String>) -> Self {
        Self {
            conn,
            table: table.into(),
        }
    }

    fn path(&self) -> String {
        format!("rest/v1/{}", self.table)
    }

    /// Read a `return=representation` body and take the first row.
    async fn first_row(
        response: reqwest::Response,
    ) -> Result<Option<ConversionRecord>, DocuScanError> {
        if !response.status().is_success() {
            return Err(DocuScanError::Persistence(error_text(response).await));
        }
        let rows: Vec<ConversionRecord> = response
            .json()
            .await
            .map_err(|e| DocuScanError::Persistence(format!("unreadable rows: {e}")))?;
        Ok(rows.into_iter().next())
    }
}

/// PostgREST filter restricting an update to rows whose current status may
/// legally move to `next`, e.g. `in.(pending,processing)`.
pub(crate) fn transition_filter(next: ConversionStatus) -> String {
    let sources: Vec<&str> = ConversionStatus::sources_for(next)
        .iter()
        .map(|s| s.as_str())
        .collect();
    format!("in.({})", sources.join(","))
}

#[async_trait]
impl RecordStore for RestRecordStore {
    async fn insert(&self, new: NewConversion) -> Result<ConversionRecord, DocuScanError> {
        let body = serde_json::json!({
            "original_filename": new.original_filename,
            "original_file_path": new.original_file_path,
            "file_size": new.file_size,
            "status": ConversionStatus::Pending,
        });
        let response = self
            .conn
            .request(Method::POST, &self.path())
            .header("Prefer", "return=representation")
            .json(&body)
            .send()
            .await
            .map_err(|e| DocuScanError::Persistence(e.to_string()))?;

        Self::first_row(response)
            .await?
            .ok_or_else(|| DocuScanError::Persistence("insert returned no row".into()))
    }

    async fn update(
        &self,
        id: &str,
        update: RecordUpdate,
    ) -> Result<ConversionRecord, DocuScanError> {
        let next = update.status();
        let response = self
            .conn
            .request(Method::PATCH, &self.path())
            .query(&[
                ("id", format!("eq.{id}")),
                ("status", transition_filter(next)),
            ])
            .header("Prefer", "return=representation")
            .json(&update.to_patch())
            .send()
            .await
            .map_err(|e| DocuScanError::Persistence(e.to_string()))?;

        if let Some(row) = Self::first_row(response).await? {
            return Ok(row);
        }

        // Nothing matched: either the id is unknown or the status filter
        // refused the transition.
        match self.get(id).await? {
            Some(current) => Err(DocuScanError::InvalidTransition {
                id: id.to_string(),
                from: current.status,
                to: next,
            }),
            None => Err(DocuScanError::RecordNotFound { id: id.to_string() }),
        }
    }

    async fn get(&self, id: &str) -> Result<Option<ConversionRecord>, DocuScanError> {
        let response = self
            .conn
            .request(Method::GET, &self.path())
            .query(&[("select", "*".to_string()), ("id", format!("eq.{id}"))])
            .send()
            .await
            .map_err(|e| DocuScanError::Persistence(e.to_string()))?;
        Self::first_row(response).await
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<ConversionRecord>, DocuScanError> {
        let response = self
            .conn
            .request(Method::GET, &self.path())
            .query(&[
                ("select", "*".to_string()),
                ("order", "created_at.desc".to_string()),
                ("limit", limit.to_string()),
            ])
            .send()
            .await
            .map_err(|e| DocuScanError::Persistence(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DocuScanError::Persistence(error_text(response).await));
        }
        response
            .json()
            .await
            .map_err(|e| DocuScanError::Persistence(format!("unreadable rows: {e}")))
    }
}

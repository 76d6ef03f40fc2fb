//! Shared provider engine
//!
//! The three backends agree on the data model (datasheets of records with
//! named fields) and on request bodies, but disagree on base URL, path layout
//! and how deletes are issued. Those differences live in a [`Dialect`]; the
//! request flow, chunking and envelope checks live here once.

use super::envelope;
use super::transport::HttpTransport;
use super::{Provider, ProviderConfig, ProviderKind, BATCH_SIZE, MAX_RECORDS};
use crate::error::{Result, SyncError};
use crate::models::{FieldSchema, Fields, RecordUpdate, RemoteRecord};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// How a backend deletes several records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteMode {
    /// One `DELETE .../records?recordIds=a,b,c` per chunk
    Bulk,
    /// One `DELETE .../records/{id}` per id within each chunk
    PerRecord,
}

/// Backend-specific URL layout and behavior
pub trait Dialect: Send + Sync + 'static {
    fn kind(&self) -> ProviderKind;

    fn default_base_url(&self) -> &'static str;

    fn fields_path(&self, space_id: &str, datasheet_id: &str) -> String;

    fn records_path(&self, space_id: &str, datasheet_id: &str) -> String;

    fn delete_mode(&self) -> DeleteMode;
}

/// Live binding created by `initialize`
#[derive(Clone)]
struct Session {
    transport: Arc<HttpTransport>,
    space_id: String,
    datasheet_id: String,
    has_api_key: bool,
}

impl Session {
    fn is_complete(&self) -> bool {
        self.has_api_key && !self.space_id.is_empty() && !self.datasheet_id.is_empty()
    }
}

/// Provider implementation parameterized by a backend dialect
pub struct DatasheetProvider<D: Dialect> {
    dialect: D,
    base_url: String,
    session: RwLock<Option<Session>>,
}

impl<D: Dialect> DatasheetProvider<D> {
    /// Provider against the backend's public endpoint
    pub fn with_dialect(dialect: D) -> Self {
        let base_url = dialect.default_base_url().to_string();
        Self::with_dialect_and_base_url(dialect, base_url)
    }

    /// Provider against a custom endpoint (self-hosted deployments, tests)
    pub fn with_dialect_and_base_url(dialect: D, base_url: impl Into<String>) -> Self {
        Self {
            dialect,
            base_url: base_url.into(),
            session: RwLock::new(None),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn session(&self) -> Result<Session> {
        let session = self.session.read().unwrap_or_else(|e| e.into_inner());

        match session.as_ref() {
            Some(s) if s.is_complete() => Ok(s.clone()),
            _ => Err(SyncError::NotInitialized(self.dialect.kind().label().to_string())),
        }
    }

    fn records_path(&self, session: &Session) -> String {
        self.dialect
            .records_path(&session.space_id, &session.datasheet_id)
    }

    async fn delete_chunk(&self, session: &Session, ids: &[String]) -> Result<()> {
        let path = self.records_path(session);
        match self.dialect.delete_mode() {
            DeleteMode::Bulk => {
                let body = session
                    .transport
                    .delete(&path, &[("recordIds", ids.join(","))])
                    .await?;
                envelope::deleted(&body)
            }
            DeleteMode::PerRecord => {
                for id in ids {
                    let body = session.transport.delete_item(&path, id).await?;
                    envelope::deleted(&body)?;
                }
                Ok(())
            }
        }
    }
}

fn create_body(chunk: &[Fields]) -> Value {
    let records: Vec<Value> = chunk.iter().map(|fields| json!({ "fields": fields })).collect();
    json!({ "records": records, "fieldKey": "name" })
}

fn update_body(chunk: &[RecordUpdate]) -> Value {
    let records: Vec<Value> = chunk
        .iter()
        .map(|r| json!({ "recordId": r.id, "fields": r.fields }))
        .collect();
    json!({ "records": records, "fieldKey": "name" })
}

fn chunk_count(len: usize) -> usize {
    len.div_ceil(BATCH_SIZE)
}

#[async_trait]
impl<D: Dialect> Provider for DatasheetProvider<D> {
    fn kind(&self) -> ProviderKind {
        self.dialect.kind()
    }

    fn initialize(&self, config: ProviderConfig) -> Result<()> {
        let transport = HttpTransport::new(self.base_url.clone(), config.api_key.clone())?;
        let session = Session {
            transport: Arc::new(transport),
            space_id: config.space_id.trim().to_string(),
            datasheet_id: config.datasheet_id.trim().to_string(),
            has_api_key: !config.api_key.trim().is_empty(),
        };

        *self.session.write().unwrap_or_else(|e| e.into_inner()) = Some(session);

        debug!(
            provider = %self.dialect.kind(),
            datasheet = %config.datasheet_id,
            "Provider initialized"
        );
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.session().is_ok()
    }

    async fn get_schema(&self) -> Result<FieldSchema> {
        let session = self.session()?;
        let path = self
            .dialect
            .fields_path(&session.space_id, &session.datasheet_id);

        let body = session.transport.get(&path, &[]).await?;
        envelope::schema(body)
    }

    async fn get_records(&self, view: Option<&str>) -> Result<Vec<RemoteRecord>> {
        let session = self.session()?;
        let path = self.records_path(&session);

        let mut query = vec![
            ("maxRecords", MAX_RECORDS.to_string()),
            ("fieldKey", "name".to_string()),
        ];
        if let Some(view) = view.filter(|v| !v.is_empty()) {
            query.push(("view", view.to_string()));
        }

        let body = session.transport.get(&path, &query).await?;
        let records = envelope::records(body, "get")?;

        info!(
            provider = %self.dialect.kind(),
            count = records.len(),
            "Fetched remote records"
        );
        Ok(records)
    }

    async fn create_record(&self, fields: Fields) -> Result<RemoteRecord> {
        let session = self.session()?;
        let path = self.records_path(&session);

        let body = session
            .transport
            .post(&path, &create_body(std::slice::from_ref(&fields)))
            .await?;
        envelope::single_record(body, "create")
    }

    async fn batch_create(&self, records: &[Fields]) -> Result<Vec<RemoteRecord>> {
        let session = self.session()?;
        let path = self.records_path(&session);
        let total = chunk_count(records.len());
        let mut results = Vec::with_capacity(records.len());

        for (index, chunk) in records.chunks(BATCH_SIZE).enumerate() {
            let body = session.transport.post(&path, &create_body(chunk)).await?;
            let created = envelope::records(body, "create")?;
            debug!(chunk = index + 1, total, size = chunk.len(), "Created record chunk");
            results.extend(created);
        }

        info!(provider = %self.dialect.kind(), count = results.len(), "Batch create complete");
        Ok(results)
    }

    async fn update_record(&self, id: &str, fields: Fields) -> Result<RemoteRecord> {
        let session = self.session()?;
        let path = self.records_path(&session);

        let update = RecordUpdate::new(id, fields);
        let body = session
            .transport
            .patch(&path, &update_body(std::slice::from_ref(&update)))
            .await?;
        envelope::single_record(body, "update")
    }

    async fn batch_update(&self, records: &[RecordUpdate]) -> Result<Vec<RemoteRecord>> {
        let session = self.session()?;
        let path = self.records_path(&session);
        let total = chunk_count(records.len());
        let mut results = Vec::with_capacity(records.len());

        for (index, chunk) in records.chunks(BATCH_SIZE).enumerate() {
            let body = session.transport.patch(&path, &update_body(chunk)).await?;
            let updated = envelope::records(body, "update")?;
            debug!(chunk = index + 1, total, size = chunk.len(), "Updated record chunk");
            results.extend(updated);
        }

        info!(provider = %self.dialect.kind(), count = results.len(), "Batch update complete");
        Ok(results)
    }

    async fn delete_record(&self, id: &str) -> Result<bool> {
        let session = self.session()?;
        self.delete_chunk(&session, &[id.to_string()]).await?;
        Ok(true)
    }

    async fn batch_delete(&self, ids: &[String]) -> Result<bool> {
        let session = self.session()?;
        let total = chunk_count(ids.len());

        for (index, chunk) in ids.chunks(BATCH_SIZE).enumerate() {
            self.delete_chunk(&session, chunk).await?;
            debug!(chunk = index + 1, total, size = chunk.len(), "Deleted record chunk");
        }

        info!(provider = %self.dialect.kind(), count = ids.len(), "Batch delete complete");
        Ok(true)
    }

    fn update_credentials(&self, api_key: Option<&str>) {
        let Some(api_key) = api_key else {
            return;
        };

        let mut session = self.session.write().unwrap_or_else(|e| e.into_inner());
        if let Some(session) = session.as_mut() {
            session.transport.update_api_key(api_key);
            session.has_api_key = !api_key.trim().is_empty();
            debug!(provider = %self.dialect.kind(), "Provider credentials updated");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_count() {
        assert_eq!(chunk_count(0), 0);
        assert_eq!(chunk_count(1), 1);
        assert_eq!(chunk_count(10), 1);
        assert_eq!(chunk_count(11), 2);
        assert_eq!(chunk_count(23), 3);
    }

    #[test]
    fn test_create_body_shape() {
        let mut fields = Fields::new();
        fields.insert("SKU".into(), json!("A100"));

        let body = create_body(&[fields]);

        assert_eq!(body["fieldKey"], "name");
        assert_eq!(body["records"][0]["fields"]["SKU"], "A100");
    }

    #[test]
    fn test_update_body_uses_record_id() {
        let body = update_body(&[RecordUpdate::new("rec9", Fields::new())]);
        assert_eq!(body["records"][0]["recordId"], "rec9");
    }
}

//! In-memory provider for store unit tests

use crate::error::{Result, SyncError};
use crate::models::{FieldSchema, Fields, RecordUpdate, RemoteRecord};
use crate::providers::{Provider, ProviderConfig, ProviderKind};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Provider double with switchable failures and stalls
#[derive(Default)]
pub struct StubProvider {
    pub records: Mutex<Vec<RemoteRecord>>,
    pub fail: AtomicBool,
    pub uninitialized: AtomicBool,
    /// `get_records` waits for `release` before answering
    pub gated: AtomicBool,
    pub release: Notify,
    /// `batch_create` never completes
    pub stalled: AtomicBool,
}

impl StubProvider {
    pub fn with_records(records: Vec<RemoteRecord>) -> Arc<Self> {
        let stub = Self::default();
        *stub.records.lock().unwrap() = records;
        Arc::new(stub)
    }

    fn check(&self) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            Err(SyncError::Remote("stub failure".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Provider for StubProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Aitable
    }
    fn initialize(&self, _config: ProviderConfig) -> Result<()> {
        Ok(())
    }
    fn is_initialized(&self) -> bool {
        !self.uninitialized.load(Ordering::SeqCst)
    }
    async fn get_schema(&self) -> Result<FieldSchema> {
        Ok(FieldSchema::default())
    }
    async fn get_records(&self, _view: Option<&str>) -> Result<Vec<RemoteRecord>> {
        if self.gated.load(Ordering::SeqCst) {
            self.release.notified().await;
        }
        self.check()?;
        Ok(self.records.lock().unwrap().clone())
    }
    async fn create_record(&self, fields: Fields) -> Result<RemoteRecord> {
        self.check()?;
        Ok(RemoteRecord { id: "new".into(), fields })
    }
    async fn batch_create(&self, records: &[Fields]) -> Result<Vec<RemoteRecord>> {
        if self.stalled.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        self.check()?;
        Ok(records
            .iter()
            .map(|f| RemoteRecord { id: "new".into(), fields: f.clone() })
            .collect())
    }
    async fn update_record(&self, id: &str, fields: Fields) -> Result<RemoteRecord> {
        self.check()?;
        Ok(RemoteRecord { id: id.into(), fields })
    }
    async fn batch_update(&self, records: &[RecordUpdate]) -> Result<Vec<RemoteRecord>> {
        self.check()?;
        Ok(records
            .iter()
            .map(|r| RemoteRecord { id: r.id.clone(), fields: r.fields.clone() })
            .collect())
    }
    async fn delete_record(&self, _id: &str) -> Result<bool> {
        self.check()?;
        Ok(true)
    }
    async fn batch_delete(&self, _ids: &[String]) -> Result<bool> {
        self.check()?;
        Ok(true)
    }
    fn update_credentials(&self, _api_key: Option<&str>) {}
}

pub fn remote(id: &str, fields: serde_json::Value) -> RemoteRecord {
    RemoteRecord {
        id: id.into(),
        fields: fields.as_object().cloned().unwrap(),
    }
}

//! Record store
//!
//! Owns the in-memory product list and mediates every write to the cached
//! records table. Remote is authoritative: a sync rebuilds the cache from
//! scratch and point updates go to the provider before touching local state.
//!
//! # States
//! `Unloaded -> Loaded(Cache) -> Syncing -> Loaded(Remote)`. Only one sync
//! runs at a time; a second request while one is in flight is rejected.

use crate::cache::CacheStore;
use crate::error::{Result, SyncError};
use crate::models::{derive_external_code, Fields, Record};
use crate::providers::Provider;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use stockroom_common::time;
use tracing::{debug, info, warn};

/// Where the in-memory list came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Cache,
    Remote,
}

/// Record store lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    Unloaded,
    Loaded(LoadSource),
    Syncing,
}

#[derive(Debug)]
struct Inner {
    records: Vec<Record>,
    /// external code -> index into `records`, later rows win
    by_code: HashMap<String, usize>,
    last_sync_time: Option<DateTime<Utc>>,
    state: StoreState,
}

impl Inner {
    fn new() -> Self {
        Self {
            records: Vec::new(),
            by_code: HashMap::new(),
            last_sync_time: None,
            state: StoreState::Unloaded,
        }
    }

    fn replace(&mut self, records: Vec<Record>) {
        self.records = records;
        self.reindex();
    }

    fn reindex(&mut self) {
        self.by_code = self
            .records
            .iter()
            .enumerate()
            .map(|(index, record)| (record.external_code.clone(), index))
            .collect();
    }
}

/// Decrements the loading counter on every exit path
struct LoadingGuard<'a>(&'a AtomicUsize);

impl<'a> LoadingGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Releases the single-flight sync flag
struct SyncGuard<'a>(&'a AtomicBool);

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// In-memory product list backed by the cache and one provider
pub struct RecordStore {
    cache: CacheStore,
    provider: Arc<dyn Provider>,
    code_field: String,
    inner: RwLock<Inner>,
    loading: AtomicUsize,
    syncing: AtomicBool,
}

impl RecordStore {
    /// `code_field` names the remote column holding the scannable code
    pub fn new(cache: CacheStore, provider: Arc<dyn Provider>, code_field: impl Into<String>) -> Self {
        Self {
            cache,
            provider,
            code_field: code_field.into(),
            inner: RwLock::new(Inner::new()),
            loading: AtomicUsize::new(0),
            syncing: AtomicBool::new(false),
        }
    }

    pub fn code_field(&self) -> &str {
        &self.code_field
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Replace the in-memory list with the cached records
    ///
    /// The last sync time becomes the newest `updated_at` among them.
    pub async fn load_from_cache(&self) -> Result<usize> {
        let _loading = LoadingGuard::enter(&self.loading);

        let records = self.cache.all_records().await?;
        let count = records.len();
        let last_sync_time = records.iter().map(|r| r.updated_at).max();

        let mut inner = self.write();
        inner.replace(records);
        inner.last_sync_time = last_sync_time;
        inner.state = StoreState::Loaded(LoadSource::Cache);
        drop(inner);

        info!(count, "Loaded records from cache");
        Ok(count)
    }

    /// Rebuild the cache and in-memory list from the remote table
    ///
    /// The cache is only rewritten after the fetch has fully succeeded, so a
    /// failed sync leaves both the cache and the in-memory list untouched.
    pub async fn sync_from_remote(&self, view: Option<&str>) -> Result<usize> {
        if !self.provider.is_initialized() {
            return Err(SyncError::NotInitialized(
                self.provider.kind().label().to_string(),
            ));
        }

        if self
            .syncing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(SyncError::Validation("sync already in progress".to_string()));
        }
        let _sync = SyncGuard(&self.syncing);
        let _loading = LoadingGuard::enter(&self.loading);

        let previous = {
            let mut inner = self.write();
            std::mem::replace(&mut inner.state, StoreState::Syncing)
        };

        match self.fetch_and_rebuild(view).await {
            Ok(count) => Ok(count),
            Err(e) => {
                self.write().state = previous;
                warn!(error = %e, "Sync from remote failed, cache left unchanged");
                Err(e)
            }
        }
    }

    async fn fetch_and_rebuild(&self, view: Option<&str>) -> Result<usize> {
        let remote = self.provider.get_records(view).await?;

        let synced_at = time::now_millis();
        let records: Vec<Record> = remote
            .into_iter()
            .map(|r| Record::from_remote(r, &self.code_field, synced_at))
            .collect();

        self.cache.replace_records(&records).await?;

        let count = records.len();
        let mut inner = self.write();
        inner.replace(records);
        inner.last_sync_time = Some(synced_at);
        inner.state = StoreState::Loaded(LoadSource::Remote);
        drop(inner);

        info!(
            provider = %self.provider.kind(),
            count,
            "Synced records from remote"
        );
        Ok(count)
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Record for a scanned code, if the loaded list has one
    pub fn get_by_code(&self, code: &str) -> Option<Record> {
        let inner = self.read();
        let found = inner
            .by_code
            .get(code)
            .and_then(|&index| inner.records.get(index))
            .cloned();

        match &found {
            Some(record) => debug!(code, id = %record.id, "Code lookup hit"),
            None => debug!(code, "Code lookup miss"),
        }
        found
    }

    pub fn get_by_id(&self, id: &str) -> Option<Record> {
        self.read().records.iter().find(|r| r.id == id).cloned()
    }

    /// Snapshot of the loaded list, in sync order
    pub fn records(&self) -> Vec<Record> {
        self.read().records.clone()
    }

    pub fn len(&self) -> usize {
        self.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().records.is_empty()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst) > 0
    }

    pub fn last_sync_time(&self) -> Option<DateTime<Utc>> {
        self.read().last_sync_time
    }

    pub fn state(&self) -> StoreState {
        self.read().state
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Write-through partial update of one record
    ///
    /// The provider is called first, then the cache row. The in-memory record
    /// only changes once both writes have succeeded. Returns the updated
    /// local record, or `None` when the id is not loaded locally.
    pub async fn update_one(&self, id: &str, fields: Fields) -> Result<Option<Record>> {
        self.provider.update_record(id, fields.clone()).await?;

        let Some(mut updated) = self.get_by_id(id) else {
            warn!(id, "Updated record is not in the local list");
            return Ok(None);
        };
        updated.merge_fields(&fields);
        if fields.contains_key(&self.code_field) {
            updated.external_code =
                derive_external_code(&updated.id, &updated.fields, &self.code_field);
        }
        updated.updated_at = time::now_millis();

        self.cache.put_record(&updated).await?;

        let mut inner = self.write();
        if let Some(slot) = inner.records.iter_mut().find(|r| r.id == id) {
            *slot = updated.clone();
            inner.reindex();
        }
        drop(inner);

        debug!(id, code = %updated.external_code, "Record updated");
        Ok(Some(updated))
    }

    /// Drop every record from memory and from the cache
    pub async fn clear(&self) -> Result<()> {
        self.cache.clear_records().await?;

        let mut inner = self.write();
        *inner = Inner::new();
        drop(inner);

        info!("Record store cleared");
        Ok(())
    }
}

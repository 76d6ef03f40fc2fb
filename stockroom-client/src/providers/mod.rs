//! Cloud datasheet providers
//!
//! A provider implements one uniform CRUD contract against one backend's REST
//! dialect. Callers hold an `Arc<dyn Provider>` and never branch on the
//! backend type.
//!
//! # Backends
//! - **AITable** (`aitable.ai`) and **Vika** (`vika.cn`): the "fusion v1" API
//! - **Bika** (`bika.ai`): space-scoped paths, per-record deletes
//!
//! # Batching
//! Create, update and delete accept at most [`BATCH_SIZE`] records per
//! request on every backend. Batch operations split their input into chunks
//! and send them strictly one after another. A failing chunk aborts the
//! operation; earlier chunks stay applied remotely.

pub mod aitable;
pub mod bika;
pub mod datasheet;
mod envelope;
pub mod registry;
pub mod transport;
pub mod vika;

pub use aitable::AitableProvider;
pub use bika::BikaProvider;
pub use registry::{ProviderInfo, ProviderRegistry};
pub use vika::VikaProvider;

use crate::error::{Result, SyncError};
use crate::models::{FieldSchema, Fields, RecordUpdate, RemoteRecord};
use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;

/// Maximum records per create/update/delete request
pub const BATCH_SIZE: usize = 10;

/// Page cap for `get_records` (one request, no auto-pagination)
pub const MAX_RECORDS: usize = 100;

/// Backend identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProviderKind {
    Aitable,
    Vika,
    Bika,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [ProviderKind::Aitable, ProviderKind::Vika, ProviderKind::Bika];

    /// Identifier stored in the `cloud_provider` setting
    pub fn id(&self) -> &'static str {
        match self {
            ProviderKind::Aitable => "aitable",
            ProviderKind::Vika => "vika",
            ProviderKind::Bika => "bika",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProviderKind::Aitable => "AITable",
            ProviderKind::Vika => "Vika",
            ProviderKind::Bika => "Bika",
        }
    }

    pub fn homepage(&self) -> &'static str {
        match self {
            ProviderKind::Aitable => "https://aitable.ai",
            ProviderKind::Vika => "https://vika.cn",
            ProviderKind::Bika => "https://bika.ai",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ProviderKind {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        ProviderKind::ALL
            .into_iter()
            .find(|kind| kind.id() == wanted)
            .ok_or_else(|| SyncError::UnknownProvider(s.to_string()))
    }
}

/// Credentials and table binding passed to [`Provider::initialize`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderConfig {
    pub api_key: String,
    /// Workspace / space identifier
    pub space_id: String,
    /// Datasheet / database identifier
    pub datasheet_id: String,
}

impl ProviderConfig {
    pub fn new(
        api_key: impl Into<String>,
        space_id: impl Into<String>,
        datasheet_id: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            space_id: space_id.into(),
            datasheet_id: datasheet_id.into(),
        }
    }

    /// True when every value is non-empty
    pub fn is_complete(&self) -> bool {
        !self.api_key.trim().is_empty()
            && !self.space_id.trim().is_empty()
            && !self.datasheet_id.trim().is_empty()
    }
}

/// Uniform CRUD contract over one remote datasheet
#[async_trait]
pub trait Provider: Send + Sync {
    /// Backend this provider talks to
    fn kind(&self) -> ProviderKind;

    /// Configure the transport and table binding
    ///
    /// Idempotent, performs no network I/O. Must be called before any other
    /// operation.
    fn initialize(&self, config: ProviderConfig) -> Result<()>;

    /// True iff api key, space id and datasheet id are non-empty and a
    /// transport exists
    fn is_initialized(&self) -> bool;

    /// Fetch the remote field definitions
    async fn get_schema(&self) -> Result<FieldSchema>;

    /// Fetch up to [`MAX_RECORDS`] records, optionally scoped to a view
    async fn get_records(&self, view: Option<&str>) -> Result<Vec<RemoteRecord>>;

    /// Create exactly one record
    async fn create_record(&self, fields: Fields) -> Result<RemoteRecord>;

    /// Create records in chunks of [`BATCH_SIZE`], results in input order
    async fn batch_create(&self, records: &[Fields]) -> Result<Vec<RemoteRecord>>;

    /// Partial-field update of one record
    async fn update_record(&self, id: &str, fields: Fields) -> Result<RemoteRecord>;

    /// Update records in chunks of [`BATCH_SIZE`], results in input order
    async fn batch_update(&self, records: &[RecordUpdate]) -> Result<Vec<RemoteRecord>>;

    /// Delete one record
    async fn delete_record(&self, id: &str) -> Result<bool>;

    /// Delete records in chunks of [`BATCH_SIZE`]
    async fn batch_delete(&self, ids: &[String]) -> Result<bool>;

    /// Hot-swap the bearer token on the existing transport
    ///
    /// No-op when `api_key` is `None` or the provider is not initialized.
    fn update_credentials(&self, api_key: Option<&str>);
}

//! Stockroom client library
//!
//! Inventory tracking (inbound, outbound, stocktake) on top of a cloud
//! datasheet backend, with a local SQLite mirror for offline lookups.
//!
//! Layers, leaf first:
//! - [`providers`]: one CRUD contract over the AITable, Vika and Bika APIs
//! - [`cache`]: embedded records and settings tables
//! - [`store`]: record store, outbound basket, stocktake session, ledger rows
//! - [`settings`] and [`context`]: runtime configuration and wiring

pub mod cache;
pub mod context;
pub mod error;
pub mod models;
pub mod providers;
pub mod settings;
pub mod store;

pub use cache::CacheStore;
pub use context::AppContext;
pub use error::{Result, SyncError};
pub use models::{FieldDef, FieldSchema, Fields, Record, RecordUpdate, RemoteRecord};
pub use providers::{Provider, ProviderConfig, ProviderKind, ProviderRegistry};
pub use settings::AppConfig;

//! Runtime configuration
//!
//! Flat string key/value pairs persisted in the `settings` table, with a
//! typed view on top. Written by setup, read at startup to decide whether the
//! client is configured, wiped on logout.

use crate::cache::CacheStore;
use crate::error::{Result, SyncError};
use crate::providers::{ProviderConfig, ProviderKind};
use crate::store::LedgerFields;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Setting keys
pub mod keys {
    pub const CLOUD_PROVIDER: &str = "cloud_provider";
    pub const API_KEY: &str = "api_key";
    pub const WORKSPACE_ID: &str = "workspace_id";
    pub const PRODUCTS_DATASHEET_ID: &str = "products_datasheet_id";
    pub const TRANSACTIONS_DATASHEET_ID: &str = "transactions_datasheet_id";
    pub const VIEW_ID: &str = "view_id";
    pub const EMPLOYEE_NAME: &str = "employee_name";
    pub const SKU_FIELD: &str = "sku_field";
    pub const TYPE_FIELD: &str = "type_field";
    pub const QUANTITY_FIELD: &str = "quantity_field";
    pub const OPERATOR_FIELD: &str = "operator_field";
    pub const TIME_FIELD: &str = "time_field";
    pub const BORROWER_FIELD: &str = "borrower_field";
}

const DEFAULT_SKU_FIELD: &str = "SKU";
const DEFAULT_TYPE_FIELD: &str = "Type (in/out)";
const DEFAULT_QUANTITY_FIELD: &str = "Quantity";
const DEFAULT_OPERATOR_FIELD: &str = "Employee";
const DEFAULT_TIME_FIELD: &str = "Date";

/// Typed view over the stored settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppConfig {
    values: BTreeMap<String, String>,
}

impl AppConfig {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// Read every stored setting
    pub async fn load(cache: &CacheStore) -> Result<Self> {
        let values = cache.all_settings().await?;
        let config = Self { values };
        debug!(keys = config.values.len(), configured = config.is_configured(), "Configuration loaded");
        Ok(config)
    }

    /// Merge `updates` into this configuration and persist them
    pub async fn save<I, K, V>(&mut self, cache: &CacheStore, updates: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let updates: Vec<(String, String)> =
            updates.into_iter().map(|(k, v)| (k.into(), v.into())).collect();

        cache
            .set_settings(updates.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .await?;

        let count = updates.len();
        self.values.extend(updates);
        info!(count, "Configuration saved");
        Ok(())
    }

    /// Persist a single key
    pub async fn update(&mut self, cache: &CacheStore, key: &str, value: &str) -> Result<()> {
        self.save(cache, [(key, value)]).await
    }

    /// Wipe every stored setting
    pub async fn clear(&mut self, cache: &CacheStore) -> Result<()> {
        cache.clear_settings().await?;
        self.values.clear();
        info!("Configuration cleared");
        Ok(())
    }

    /// Non-empty value for `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    // ========================================================================
    // Typed accessors
    // ========================================================================

    /// Selected backend, AITable when unset
    pub fn provider_kind(&self) -> Result<ProviderKind> {
        match self.get(keys::CLOUD_PROVIDER) {
            Some(id) => id.parse(),
            None => Ok(ProviderKind::Aitable),
        }
    }

    pub fn api_key(&self) -> Option<&str> {
        self.get(keys::API_KEY)
    }

    pub fn workspace_id(&self) -> Option<&str> {
        self.get(keys::WORKSPACE_ID)
    }

    pub fn products_datasheet_id(&self) -> Option<&str> {
        self.get(keys::PRODUCTS_DATASHEET_ID)
    }

    pub fn transactions_datasheet_id(&self) -> Option<&str> {
        self.get(keys::TRANSACTIONS_DATASHEET_ID)
    }

    pub fn view_id(&self) -> Option<&str> {
        self.get(keys::VIEW_ID)
    }

    pub fn employee_name(&self) -> Option<&str> {
        self.get(keys::EMPLOYEE_NAME)
    }

    /// Column holding the scannable product code
    pub fn code_field(&self) -> &str {
        self.get_or(keys::SKU_FIELD, DEFAULT_SKU_FIELD)
    }

    pub fn ledger_fields(&self) -> LedgerFields {
        LedgerFields {
            sku_field: self.code_field().to_string(),
            type_field: self.get_or(keys::TYPE_FIELD, DEFAULT_TYPE_FIELD).to_string(),
            quantity_field: self.get_or(keys::QUANTITY_FIELD, DEFAULT_QUANTITY_FIELD).to_string(),
            operator_field: self.get_or(keys::OPERATOR_FIELD, DEFAULT_OPERATOR_FIELD).to_string(),
            time_field: self.get_or(keys::TIME_FIELD, DEFAULT_TIME_FIELD).to_string(),
            borrower_field: self.get(keys::BORROWER_FIELD).map(str::to_string),
        }
    }

    /// Provider binding for the products datasheet
    pub fn products_provider_config(&self) -> Option<ProviderConfig> {
        self.provider_config(self.products_datasheet_id())
    }

    /// Provider binding for the transactions datasheet
    pub fn transactions_provider_config(&self) -> Option<ProviderConfig> {
        self.provider_config(self.transactions_datasheet_id())
    }

    fn provider_config(&self, datasheet_id: Option<&str>) -> Option<ProviderConfig> {
        Some(ProviderConfig::new(
            self.api_key()?,
            self.workspace_id()?,
            datasheet_id?,
        ))
    }

    // ========================================================================
    // Setup checks
    // ========================================================================

    /// Required keys that are empty or absent
    pub fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.api_key().is_none() {
            missing.push(keys::API_KEY);
        }
        if self.workspace_id().is_none() {
            missing.push(keys::WORKSPACE_ID);
        }
        if self.products_datasheet_id().is_none() && self.transactions_datasheet_id().is_none() {
            missing.push(keys::PRODUCTS_DATASHEET_ID);
        }
        if self.employee_name().is_none() {
            missing.push(keys::EMPLOYEE_NAME);
        }
        missing
    }

    /// API key, workspace, at least one datasheet and an employee are set
    pub fn is_configured(&self) -> bool {
        self.missing_required().is_empty()
    }

    /// Reject an incomplete setup or an unknown provider
    pub fn validate_setup(&self) -> Result<()> {
        self.provider_kind()?;

        let missing = self.missing_required();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(SyncError::Validation(format!(
                "missing required settings: {}",
                missing.join(", ")
            )))
        }
    }
}

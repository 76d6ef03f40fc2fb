//! Application context
//!
//! Owns the cache, the provider registry and the loaded configuration, and
//! hands out initialized providers and record stores built from them.

use crate::cache::CacheStore;
use crate::error::{Result, SyncError};
use crate::models::FieldSchema;
use crate::providers::{Provider, ProviderRegistry};
use crate::settings::{keys, AppConfig};
use crate::store::RecordStore;
use std::path::Path;
use std::sync::Arc;
use stockroom_common::config::ProviderEndpoints;
use tracing::{debug, info};

/// Keys whose change invalidates the live provider binding
const BINDING_KEYS: [&str; 4] = [
    keys::CLOUD_PROVIDER,
    keys::WORKSPACE_ID,
    keys::PRODUCTS_DATASHEET_ID,
    keys::TRANSACTIONS_DATASHEET_ID,
];

pub struct AppContext {
    cache: CacheStore,
    registry: ProviderRegistry,
    config: AppConfig,
}

impl AppContext {
    /// Open the database at `db_path` and load the stored configuration
    pub async fn open(db_path: &Path, endpoints: &ProviderEndpoints) -> Result<Self> {
        let cache = CacheStore::open(db_path).await?;
        Self::new(cache, ProviderRegistry::with_endpoints(endpoints)).await
    }

    pub async fn new(cache: CacheStore, registry: ProviderRegistry) -> Result<Self> {
        let config = AppConfig::load(&cache).await?;
        Ok(Self {
            cache,
            registry,
            config,
        })
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Shared provider for the products datasheet, initialized on first use
    pub fn active_provider(&self) -> Result<Arc<dyn Provider>> {
        let kind = self.config.provider_kind()?;
        let provider = self.registry.get(kind);

        if !provider.is_initialized() {
            let binding = self
                .config
                .products_provider_config()
                .ok_or_else(|| SyncError::NotInitialized(kind.label().to_string()))?;
            provider.initialize(binding)?;
            debug!(provider = %kind, "Active provider initialized from configuration");
        }
        Ok(provider)
    }

    /// Separate provider bound to the transactions datasheet
    pub fn ledger_provider(&self) -> Result<Arc<dyn Provider>> {
        let kind = self.config.provider_kind()?;
        let binding = self
            .config
            .transactions_provider_config()
            .ok_or_else(|| SyncError::NotInitialized(kind.label().to_string()))?;

        let provider = self.registry.instantiate(kind);
        provider.initialize(binding)?;
        Ok(provider)
    }

    /// Record store over the cache and the active provider
    pub fn record_store(&self) -> Result<RecordStore> {
        Ok(RecordStore::new(
            self.cache.clone(),
            self.active_provider()?,
            self.config.code_field(),
        ))
    }

    /// Check candidate settings against the backend without saving them
    ///
    /// A throwaway provider is bound to the first configured datasheet and
    /// asked for its schema.
    pub async fn verify_setup(&self, candidate: &AppConfig) -> Result<FieldSchema> {
        candidate.validate_setup()?;
        let kind = candidate.provider_kind()?;
        let binding = candidate
            .products_provider_config()
            .or_else(|| candidate.transactions_provider_config())
            .ok_or_else(|| SyncError::Validation("no datasheet configured".to_string()))?;

        let provider = self.registry.instantiate(kind);
        provider.initialize(binding)?;
        let schema = provider.get_schema().await?;

        info!(provider = %kind, fields = schema.fields.len(), "Setup verified");
        Ok(schema)
    }

    /// Persist settings and refresh the live provider
    ///
    /// A new API key alone is hot-swapped into the existing transport; a
    /// changed provider, workspace or datasheet drops the cached instances.
    pub async fn save_config<I, K, V>(&mut self, updates: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let updates: Vec<(String, String)> =
            updates.into_iter().map(|(k, v)| (k.into(), v.into())).collect();

        let rebinds = updates.iter().any(|(key, value)| {
            BINDING_KEYS.contains(&key.as_str()) && self.config.get(key) != Some(value.trim())
        });
        let new_api_key = updates
            .iter()
            .find(|(key, _)| key == keys::API_KEY)
            .map(|(_, value)| value.clone());

        self.config.save(&self.cache, updates).await?;

        if rebinds {
            self.registry.clear_instances();
        } else if let Some(api_key) = new_api_key {
            if let Ok(kind) = self.config.provider_kind() {
                self.registry.get(kind).update_credentials(Some(&api_key));
            }
        }
        Ok(())
    }

    /// Forget configuration, cached records and provider instances
    pub async fn logout(&mut self) -> Result<()> {
        self.config.clear(&self.cache).await?;
        self.cache.clear_records().await?;
        self.registry.clear_instances();
        info!("Logged out");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::test_support::memory_store;
    use crate::providers::ProviderKind;

    async fn configured() -> AppContext {
        let mut ctx = AppContext::new(memory_store().await, ProviderRegistry::new())
            .await
            .unwrap();
        ctx.save_config([
            (keys::CLOUD_PROVIDER, "vika"),
            (keys::API_KEY, "key"),
            (keys::WORKSPACE_ID, "spc1"),
            (keys::PRODUCTS_DATASHEET_ID, "dst1"),
            (keys::TRANSACTIONS_DATASHEET_ID, "dst2"),
            (keys::EMPLOYEE_NAME, "Sam"),
        ])
        .await
        .unwrap();
        ctx
    }

    #[tokio::test]
    async fn test_active_provider_initialized_from_config() {
        let ctx = configured().await;

        let provider = ctx.active_provider().unwrap();

        assert_eq!(provider.kind(), ProviderKind::Vika);
        assert!(provider.is_initialized());
        assert!(Arc::ptr_eq(&provider, &ctx.registry().get(ProviderKind::Vika)));
    }

    #[tokio::test]
    async fn test_ledger_provider_is_not_shared() {
        let ctx = configured().await;

        let active = ctx.active_provider().unwrap();
        let ledger = ctx.ledger_provider().unwrap();

        assert!(!Arc::ptr_eq(&active, &ledger));
        assert!(ledger.is_initialized());
    }

    #[tokio::test]
    async fn test_unconfigured_provider_is_not_initialized() {
        let ctx = AppContext::new(memory_store().await, ProviderRegistry::new())
            .await
            .unwrap();

        assert!(matches!(ctx.active_provider(), Err(SyncError::NotInitialized(_))));
        assert!(matches!(ctx.ledger_provider(), Err(SyncError::NotInitialized(_))));
    }

    #[tokio::test]
    async fn test_rebinding_drops_provider_instance() {
        let mut ctx = configured().await;
        let before = ctx.active_provider().unwrap();

        ctx.save_config([(keys::PRODUCTS_DATASHEET_ID, "dst9")]).await.unwrap();

        assert!(!Arc::ptr_eq(&before, &ctx.active_provider().unwrap()));
    }

    #[tokio::test]
    async fn test_api_key_change_keeps_instance() {
        let mut ctx = configured().await;
        let before = ctx.active_provider().unwrap();

        ctx.save_config([(keys::API_KEY, "rotated")]).await.unwrap();

        assert!(Arc::ptr_eq(&before, &ctx.active_provider().unwrap()));
    }

    #[tokio::test]
    async fn test_logout_clears_everything() {
        let mut ctx = configured().await;
        ctx.active_provider().unwrap();

        ctx.logout().await.unwrap();

        assert!(!ctx.config().is_configured());
        assert!(AppConfig::load(ctx.cache()).await.unwrap().values().is_empty());
        assert!(!ctx.registry().get(ProviderKind::Vika).is_initialized());
    }

    #[tokio::test]
    async fn test_verify_setup_rejects_incomplete_candidate() {
        let ctx = configured().await;
        let candidate = AppConfig::from_pairs([(keys::API_KEY, "key")]);

        assert!(matches!(
            ctx.verify_setup(&candidate).await,
            Err(SyncError::Validation(_))
        ));
    }
}

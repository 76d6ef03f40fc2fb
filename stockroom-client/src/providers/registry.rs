//! Provider registry
//!
//! One live provider per backend kind, constructed lazily and shared. The
//! registry is an explicit object owned by the application context rather
//! than global state; dropping or clearing it drops the instances.

use super::{AitableProvider, BikaProvider, Provider, ProviderKind, VikaProvider};
use crate::error::Result;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use stockroom_common::config::ProviderEndpoints;
use tracing::debug;

/// Catalog entry for provider selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderInfo {
    pub id: &'static str,
    pub label: &'static str,
    pub description: &'static str,
}

/// Lazily populated, one-instance-per-kind provider registry
#[derive(Default)]
pub struct ProviderRegistry {
    base_urls: HashMap<ProviderKind, String>,
    instances: Mutex<HashMap<ProviderKind, Arc<dyn Provider>>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry honoring base URL overrides from the TOML config
    pub fn with_endpoints(endpoints: &ProviderEndpoints) -> Self {
        let mut registry = Self::new();
        let overrides = [
            (ProviderKind::Aitable, &endpoints.aitable_base_url),
            (ProviderKind::Vika, &endpoints.vika_base_url),
            (ProviderKind::Bika, &endpoints.bika_base_url),
        ];
        for (kind, url) in overrides {
            if let Some(url) = url.as_ref().filter(|u| !u.trim().is_empty()) {
                registry.base_urls.insert(kind, url.clone());
            }
        }
        registry
    }

    /// Override the endpoint for one kind (applies to instances built later)
    pub fn with_base_url(mut self, kind: ProviderKind, base_url: impl Into<String>) -> Self {
        self.base_urls.insert(kind, base_url.into());
        self
    }

    /// Shared instance for `kind`, created on first request
    pub fn get(&self, kind: ProviderKind) -> Arc<dyn Provider> {
        let mut instances = self.instances.lock().unwrap_or_else(|e| e.into_inner());
        instances
            .entry(kind)
            .or_insert_with(|| {
                debug!(provider = %kind, "Creating provider instance");
                self.build(kind)
            })
            .clone()
    }

    /// Shared instance looked up by its identifier (e.g. `"vika"`)
    pub fn get_by_id(&self, id: &str) -> Result<Arc<dyn Provider>> {
        Ok(self.get(id.parse()?))
    }

    /// Fresh instance that is not shared through the registry
    ///
    /// Used when a second table of the same backend needs its own binding.
    pub fn instantiate(&self, kind: ProviderKind) -> Arc<dyn Provider> {
        self.build(kind)
    }

    /// Drop every cached instance
    pub fn clear_instances(&self) {
        self.instances
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        debug!("Provider instances cleared");
    }

    /// Static catalog of implemented providers
    pub fn available() -> Vec<ProviderInfo> {
        ProviderKind::ALL
            .into_iter()
            .map(|kind| ProviderInfo {
                id: kind.id(),
                label: kind.label(),
                description: kind.homepage(),
            })
            .collect()
    }

    fn build(&self, kind: ProviderKind) -> Arc<dyn Provider> {
        let base_url = self.base_urls.get(&kind).cloned();
        match (kind, base_url) {
            (ProviderKind::Aitable, Some(url)) => Arc::new(AitableProvider::with_base_url(url)),
            (ProviderKind::Aitable, None) => Arc::new(AitableProvider::new()),
            (ProviderKind::Vika, Some(url)) => Arc::new(VikaProvider::with_base_url(url)),
            (ProviderKind::Vika, None) => Arc::new(VikaProvider::new()),
            (ProviderKind::Bika, Some(url)) => Arc::new(BikaProvider::with_base_url(url)),
            (ProviderKind::Bika, None) => Arc::new(BikaProvider::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::providers::ProviderConfig;

    #[test]
    fn test_get_returns_same_instance() {
        let registry = ProviderRegistry::new();

        let a = registry.get(ProviderKind::Aitable);
        let b = registry.get(ProviderKind::Aitable);

        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_distinct_kinds_coexist() {
        let registry = ProviderRegistry::new();

        let aitable = registry.get(ProviderKind::Aitable);
        let bika = registry.get(ProviderKind::Bika);

        assert_eq!(aitable.kind(), ProviderKind::Aitable);
        assert_eq!(bika.kind(), ProviderKind::Bika);
    }

    #[test]
    fn test_state_is_shared_through_registry() {
        let registry = ProviderRegistry::new();
        registry
            .get(ProviderKind::Vika)
            .initialize(ProviderConfig::new("key", "spc1", "dst1"))
            .unwrap();

        assert!(registry.get(ProviderKind::Vika).is_initialized());
        assert!(!registry.instantiate(ProviderKind::Vika).is_initialized());
    }

    #[test]
    fn test_clear_instances_drops_state() {
        let registry = ProviderRegistry::new();
        let first = registry.get(ProviderKind::Aitable);
        first
            .initialize(ProviderConfig::new("key", "spc1", "dst1"))
            .unwrap();

        registry.clear_instances();
        let second = registry.get(ProviderKind::Aitable);

        assert!(!Arc::ptr_eq(&first, &second));
        assert!(!second.is_initialized());
    }

    #[test]
    fn test_get_by_id_unknown() {
        let registry = ProviderRegistry::new();
        assert!(matches!(
            registry.get_by_id("airtable"),
            Err(SyncError::UnknownProvider(_))
        ));
    }

    #[test]
    fn test_available_matches_implemented_kinds() {
        let ids: Vec<_> = ProviderRegistry::available().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["aitable", "vika", "bika"]);
    }
}

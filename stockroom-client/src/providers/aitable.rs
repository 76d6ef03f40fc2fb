//! AITable provider (`aitable.ai`, fusion v1 API)

use super::datasheet::{DatasheetProvider, DeleteMode, Dialect};
use super::ProviderKind;

pub const AITABLE_BASE_URL: &str = "https://aitable.ai/fusion/v1";

/// AITable URL layout: datasheet-scoped, bulk deletes
#[derive(Debug, Clone, Copy, Default)]
pub struct Aitable;

impl Dialect for Aitable {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Aitable
    }

    fn default_base_url(&self) -> &'static str {
        AITABLE_BASE_URL
    }

    fn fields_path(&self, _space_id: &str, datasheet_id: &str) -> String {
        format!("/datasheets/{}/fields", datasheet_id)
    }

    fn records_path(&self, _space_id: &str, datasheet_id: &str) -> String {
        format!("/datasheets/{}/records", datasheet_id)
    }

    fn delete_mode(&self) -> DeleteMode {
        DeleteMode::Bulk
    }
}

pub type AitableProvider = DatasheetProvider<Aitable>;

impl AitableProvider {
    pub fn new() -> Self {
        Self::with_dialect(Aitable)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self::with_dialect_and_base_url(Aitable, base_url)
    }
}

impl Default for AitableProvider {
    fn default() -> Self {
        Self::new()
    }
}

//! Vika provider (`vika.cn`)
//!
//! Same vendor and same fusion v1 API as AITable; only the host differs.

use super::datasheet::{DatasheetProvider, DeleteMode, Dialect};
use super::ProviderKind;

pub const VIKA_BASE_URL: &str = "https://vika.cn/fusion/v1";

#[derive(Debug, Clone, Copy, Default)]
pub struct Vika;

impl Dialect for Vika {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Vika
    }

    fn default_base_url(&self) -> &'static str {
        VIKA_BASE_URL
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

pub type VikaProvider = DatasheetProvider<Vika>;

impl VikaProvider {
    pub fn new() -> Self {
        Self::with_dialect(Vika)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self::with_dialect_and_base_url(Vika, base_url)
    }
}

impl Default for VikaProvider {
    fn default() -> Self {
        Self::new()
    }
}

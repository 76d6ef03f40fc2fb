//! Bika provider (`bika.ai` open API)
//!
//! Paths are scoped by space. The schema endpoint is still on `/v1` while
//! record operations moved to `/v2`. Records come back with `id` rather than
//! `recordId`, and deletes go one record per request.

use super::datasheet::{DatasheetProvider, DeleteMode, Dialect};
use super::ProviderKind;

pub const BIKA_BASE_URL: &str = "https://bika.ai/api/openapi/bika";

#[derive(Debug, Clone, Copy, Default)]
pub struct Bika;

impl Dialect for Bika {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Bika
    }

    fn default_base_url(&self) -> &'static str {
        BIKA_BASE_URL
    }

    fn fields_path(&self, space_id: &str, datasheet_id: &str) -> String {
        format!(
            "/v1/spaces/{}/resources/databases/{}/fields",
            space_id, datasheet_id
        )
    }

    fn records_path(&self, space_id: &str, datasheet_id: &str) -> String {
        format!(
            "/v2/spaces/{}/resources/databases/{}/records",
            space_id, datasheet_id
        )
    }

    fn delete_mode(&self) -> DeleteMode {
        DeleteMode::PerRecord
    }
}

pub type BikaProvider = DatasheetProvider<Bika>;

impl BikaProvider {
    pub fn new() -> Self {
        Self::with_dialect(Bika)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self::with_dialect_and_base_url(Bika, base_url)
    }
}

impl Default for BikaProvider {
    fn default() -> Self {
        Self::new()
    }
}

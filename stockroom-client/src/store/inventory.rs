//! Stocktake session
//!
//! Tracks which codes were scanned during one inventory walk. Comparing the
//! result against the catalog is left to the caller, see [`unscanned`].

use crate::error::{Result, SyncError};
use crate::models::Record;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use stockroom_common::time;
use tracing::{debug, info};

/// One scanned code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEntry {
    pub code: String,
    pub scanned_at: DateTime<Utc>,
}

/// Scan-tracking state machine: inactive, then active, then inactive again
#[derive(Debug, Default)]
pub struct InventorySession {
    scanned: HashMap<String, DateTime<Utc>>,
    active: bool,
}

impl InventorySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget previous scans and start scanning
    pub fn start(&mut self) {
        self.scanned.clear();
        self.active = true;
        info!("Inventory session started");
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Record a scan; scanning the same code again refreshes its time
    pub fn mark_scanned(&mut self, code: &str) -> Result<()> {
        self.mark_scanned_at(code, time::now())
    }

    pub fn mark_scanned_at(&mut self, code: &str, at: DateTime<Utc>) -> Result<()> {
        if !self.active {
            return Err(SyncError::Validation("no inventory session in progress".to_string()));
        }

        let code = code.trim();
        if code.is_empty() {
            return Err(SyncError::Validation("scanned code is empty".to_string()));
        }

        let rescan = self.scanned.insert(code.to_string(), at).is_some();
        debug!(code, rescan, "Marked scanned");
        Ok(())
    }

    /// Scanned codes so far
    pub fn scanned(&self) -> &HashMap<String, DateTime<Utc>> {
        &self.scanned
    }

    /// Stop scanning and hand back what was scanned, oldest scan first
    pub fn end(&mut self) -> Vec<ScanEntry> {
        self.active = false;

        let mut entries: Vec<ScanEntry> = self
            .scanned
            .iter()
            .map(|(code, at)| ScanEntry {
                code: code.clone(),
                scanned_at: *at,
            })
            .collect();
        entries.sort_by(|a, b| a.scanned_at.cmp(&b.scanned_at).then_with(|| a.code.cmp(&b.code)));

        info!(scanned = entries.len(), "Inventory session ended");
        entries
    }

    /// Drop all scans, active or not
    pub fn reset(&mut self) {
        self.scanned.clear();
    }
}

/// Catalog codes that no scan entry covers, in catalog order
pub fn unscanned(records: &[Record], entries: &[ScanEntry]) -> Vec<String> {
    let seen: HashSet<&str> = entries.iter().map(|e| e.code.as_str()).collect();
    records
        .iter()
        .filter(|r| !seen.contains(r.external_code.as_str()))
        .map(|r| r.external_code.clone())
        .collect()
}

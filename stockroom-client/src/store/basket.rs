//! Outbound basket
//!
//! Process-local list of products waiting to leave the stockroom. Submitting
//! writes one outbound ledger row per item through a single batch create.
//! The basket is cleared only after the provider call succeeds; on failure
//! it is kept intact so the user can retry.

use super::ledger::{LedgerEntry, LedgerFields, Movement};
use crate::error::{Result, SyncError};
use crate::models::{Fields, Record, RemoteRecord};
use crate::providers::Provider;
use chrono::{DateTime, Utc};
use stockroom_common::time;
use tracing::{debug, info, warn};

/// Holds the submitting flag for the duration of a provider call
struct SubmittingGuard<'a>(&'a mut bool);

impl<'a> SubmittingGuard<'a> {
    fn enter(flag: &'a mut bool) -> Self {
        *flag = true;
        Self(flag)
    }
}

impl Drop for SubmittingGuard<'_> {
    fn drop(&mut self) {
        *self.0 = false;
    }
}

/// One basket line
#[derive(Debug, Clone, PartialEq)]
pub struct BasketItem {
    pub record: Record,
    pub quantity: u32,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasketState {
    Empty,
    Accumulating,
    Submitting,
}

/// Pending outbound movements
#[derive(Debug)]
pub struct OutboundBasket {
    items: Vec<BasketItem>,
    borrower: String,
    submitting: bool,
}

impl Default for OutboundBasket {
    fn default() -> Self {
        Self::new()
    }
}

impl OutboundBasket {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            borrower: String::new(),
            submitting: false,
        }
    }

    pub fn items(&self) -> &[BasketItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn borrower(&self) -> &str {
        &self.borrower
    }

    pub fn state(&self) -> BasketState {
        if self.submitting {
            BasketState::Submitting
        } else if self.items.is_empty() {
            BasketState::Empty
        } else {
            BasketState::Accumulating
        }
    }

    /// Add a record with quantity 1
    ///
    /// Returns false (and changes nothing) when the record is already in the
    /// basket.
    pub fn add(&mut self, record: Record) -> bool {
        if self.items.iter().any(|item| item.record.id == record.id) {
            debug!(id = %record.id, "Record already in basket");
            return false;
        }

        debug!(id = %record.id, code = %record.external_code, "Added to basket");
        self.items.push(BasketItem {
            record,
            quantity: 1,
            added_at: time::now(),
        });
        true
    }

    /// Remove a record; true if it was present
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.record.id != id);
        before != self.items.len()
    }

    pub fn update_quantity(&mut self, id: &str, quantity: u32) -> Result<()> {
        if quantity == 0 {
            return Err(SyncError::Validation("quantity must be at least 1".to_string()));
        }

        let item = self
            .items
            .iter_mut()
            .find(|item| item.record.id == id)
            .ok_or_else(|| SyncError::Validation(format!("record {} is not in the basket", id)))?;
        item.quantity = quantity;
        Ok(())
    }

    pub fn set_borrower(&mut self, name: impl Into<String>) {
        self.borrower = name.into();
    }

    /// Empty the basket and forget the borrower
    pub fn clear(&mut self) {
        self.items.clear();
        self.borrower.clear();
    }

    /// Ledger rows for the current items
    pub fn entries(&self, operator: &str, now: DateTime<Utc>) -> Vec<LedgerEntry> {
        let borrower = self.borrower.trim();
        self.items
            .iter()
            .map(|item| {
                let entry = LedgerEntry::new(&item.record, Movement::Outbound, item.quantity, operator, now);
                if borrower.is_empty() {
                    entry
                } else {
                    entry.with_borrower(borrower)
                }
            })
            .collect()
    }

    /// Submit every item as an outbound ledger row
    pub async fn submit(
        &mut self,
        ledger: &dyn Provider,
        columns: &LedgerFields,
        operator: &str,
    ) -> Result<Vec<RemoteRecord>> {
        if self.items.is_empty() {
            return Err(SyncError::Validation("basket is empty".to_string()));
        }
        if operator.trim().is_empty() {
            return Err(SyncError::Validation("operator name is required".to_string()));
        }
        if columns.borrower_field.is_some() && self.borrower.trim().is_empty() {
            return Err(SyncError::Validation("borrower name is required".to_string()));
        }

        let rows: Vec<Fields> = self
            .entries(operator.trim(), time::now())
            .iter()
            .map(|entry| entry.to_fields(columns))
            .collect();

        let result = {
            let _submitting = SubmittingGuard::enter(&mut self.submitting);
            ledger.batch_create(&rows).await
        };

        match result {
            Ok(created) => {
                info!(items = self.items.len(), "Outbound basket submitted");
                self.clear();
                Ok(created)
            }
            Err(e) => {
                warn!(error = %e, items = self.items.len(), "Outbound submission failed, basket kept");
                Err(e)
            }
        }
    }
}

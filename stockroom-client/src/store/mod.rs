//! Domain state: product list, outbound basket, stocktake session, ledger

pub mod basket;
pub mod inventory;
pub mod ledger;
pub mod record_store;

pub use basket::{BasketItem, BasketState, OutboundBasket};
pub use inventory::{unscanned, InventorySession, ScanEntry};
pub use ledger::{record_inbound, LedgerEntry, LedgerFields, Movement};
pub use record_store::{LoadSource, RecordStore, StoreState};

#[cfg(test)]
pub(crate) mod test_support;

//! Stock movement ledger
//!
//! Every inbound or outbound movement becomes one row in the transactions
//! datasheet. Column names come from the runtime configuration.

use crate::error::Result;
use crate::models::{Fields, Record, RemoteRecord};
use crate::providers::Provider;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use std::fmt;
use tracing::info;

/// Column names of the transactions datasheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerFields {
    pub sku_field: String,
    pub type_field: String,
    pub quantity_field: String,
    pub operator_field: String,
    pub time_field: String,
    /// Set when outbound movements must name a borrower
    pub borrower_field: Option<String>,
}

impl Default for LedgerFields {
    fn default() -> Self {
        Self {
            sku_field: "SKU".to_string(),
            type_field: "Type (in/out)".to_string(),
            quantity_field: "Quantity".to_string(),
            operator_field: "Employee".to_string(),
            time_field: "Date".to_string(),
            borrower_field: None,
        }
    }
}

/// Direction of a movement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Movement {
    Inbound,
    Outbound,
}

impl Movement {
    /// Value written to the type column
    pub fn as_str(&self) -> &'static str {
        match self {
            Movement::Inbound => "in",
            Movement::Outbound => "out",
        }
    }
}

impl fmt::Display for Movement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ledger row before it is sent
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub code: String,
    pub movement: Movement,
    pub quantity: u32,
    pub operator: String,
    pub time: DateTime<Utc>,
    pub borrower: Option<String>,
}

impl LedgerEntry {
    pub fn new(
        record: &Record,
        movement: Movement,
        quantity: u32,
        operator: impl Into<String>,
        time: DateTime<Utc>,
    ) -> Self {
        Self {
            code: record.external_code.clone(),
            movement,
            quantity,
            operator: operator.into(),
            time,
            borrower: None,
        }
    }

    pub fn with_borrower(mut self, borrower: impl Into<String>) -> Self {
        self.borrower = Some(borrower.into());
        self
    }

    /// Field map for the transactions datasheet
    ///
    /// The quantity is sent as a string. The borrower is written only when
    /// both a borrower column and a name are present.
    pub fn to_fields(&self, columns: &LedgerFields) -> Fields {
        let mut fields = Fields::new();
        fields.insert(columns.sku_field.clone(), Value::from(self.code.clone()));
        fields.insert(columns.type_field.clone(), Value::from(self.movement.as_str()));
        fields.insert(columns.quantity_field.clone(), Value::from(self.quantity.to_string()));
        fields.insert(columns.operator_field.clone(), Value::from(self.operator.clone()));
        fields.insert(
            columns.time_field.clone(),
            Value::from(self.time.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );

        if let (Some(column), Some(borrower)) = (&columns.borrower_field, &self.borrower) {
            fields.insert(column.clone(), Value::from(borrower.clone()));
        }
        fields
    }
}

/// Write one inbound movement for `record`
pub async fn record_inbound(
    ledger: &dyn Provider,
    columns: &LedgerFields,
    record: &Record,
    quantity: u32,
    operator: &str,
) -> Result<RemoteRecord> {
    let entry = LedgerEntry::new(record, Movement::Inbound, quantity, operator, Utc::now());
    let created = ledger.create_record(entry.to_fields(columns)).await?;

    info!(code = %record.external_code, quantity, entry = %created.id, "Inbound recorded");
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockroom_common::time::from_millis;

    fn widget() -> Record {
        Record {
            id: "r1".into(),
            external_code: "A100".into(),
            fields: Fields::new(),
            updated_at: from_millis(0),
        }
    }

    #[test]
    fn test_entry_fields_use_configured_columns() {
        let entry = LedgerEntry::new(
            &widget(),
            Movement::Outbound,
            3,
            "Sam",
            from_millis(1_700_000_000_000),
        );

        let fields = entry.to_fields(&LedgerFields::default());

        assert_eq!(fields["SKU"], "A100");
        assert_eq!(fields["Type (in/out)"], "out");
        assert_eq!(fields["Quantity"], "3");
        assert_eq!(fields["Employee"], "Sam");
        assert_eq!(fields["Date"], "2023-11-14T22:13:20.000Z");
        assert_eq!(fields.len(), 5);
    }

    #[test]
    fn test_borrower_needs_column_and_name() {
        let columns = LedgerFields {
            borrower_field: Some("Borrower".into()),
            ..LedgerFields::default()
        };
        let entry = LedgerEntry::new(&widget(), Movement::Outbound, 1, "Sam", from_millis(0));

        assert!(!entry.to_fields(&columns).contains_key("Borrower"));

        let entry = entry.with_borrower("Lee");
        assert_eq!(entry.to_fields(&columns)["Borrower"], "Lee");
        assert!(!entry.to_fields(&LedgerFields::default()).contains_key("Borrower"));
    }
}

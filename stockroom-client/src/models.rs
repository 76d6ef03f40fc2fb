//! Record and schema types shared by providers and the record store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Open field map of a datasheet row (field name -> value)
///
/// The schema is whatever the remote table defines, so values stay as JSON.
pub type Fields = Map<String, Value>;

/// A record as returned by a provider, normalized to `{id, fields}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRecord {
    pub id: String,
    pub fields: Fields,
}

/// Input row for a batch update
#[derive(Debug, Clone, PartialEq)]
pub struct RecordUpdate {
    pub id: String,
    pub fields: Fields,
}

impl RecordUpdate {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }
}

/// Remote field definitions of a datasheet
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub fields: Vec<FieldDef>,
}

impl FieldSchema {
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// One remote column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub field_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
}

/// A cached record (one row of the local `records` table)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Remote-assigned identifier, primary key of the cache
    pub id: String,
    /// Scannable business identifier (e.g. the SKU)
    pub external_code: String,
    pub fields: Fields,
    /// Local time of the last cache write for this row
    pub updated_at: DateTime<Utc>,
}

impl Record {
    /// Build the local shape of a remote record
    ///
    /// The external code comes from `code_field`, falling back to the record
    /// id when the field is absent, empty or not a scalar.
    pub fn from_remote(remote: RemoteRecord, code_field: &str, updated_at: DateTime<Utc>) -> Self {
        let external_code = derive_external_code(&remote.id, &remote.fields, code_field);
        Self {
            id: remote.id,
            external_code,
            fields: remote.fields,
            updated_at,
        }
    }

    /// Merge `changes` into this record's fields (partial update)
    pub fn merge_fields(&mut self, changes: &Fields) {
        for (name, value) in changes {
            self.fields.insert(name.clone(), value.clone());
        }
    }

    /// String form of a field, if it holds a scalar
    pub fn field_str(&self, name: &str) -> Option<String> {
        self.fields.get(name).and_then(scalar_to_string)
    }
}

/// Derive the external code for a row
pub fn derive_external_code(id: &str, fields: &Fields, code_field: &str) -> String {
    fields
        .get(code_field)
        .and_then(scalar_to_string)
        .filter(|code| !code.is_empty())
        .unwrap_or_else(|| id.to_string())
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_external_code_from_string_field() {
        let f = fields(json!({"SKU": "A100", "Name": "Widget"}));
        assert_eq!(derive_external_code("rec1", &f, "SKU"), "A100");
    }

    #[test]
    fn test_external_code_from_number_field() {
        let f = fields(json!({"SKU": 4711}));
        assert_eq!(derive_external_code("rec1", &f, "SKU"), "4711");
    }

    #[test]
    fn test_external_code_falls_back_to_id() {
        let missing = fields(json!({"Name": "Widget"}));
        let empty = fields(json!({"SKU": ""}));
        let array = fields(json!({"SKU": ["A", "B"]}));
        let null = fields(json!({"SKU": null}));

        for f in [missing, empty, array, null] {
            assert_eq!(derive_external_code("rec1", &f, "SKU"), "rec1");
        }
    }

    #[test]
    fn test_merge_fields_overwrites_and_keeps_others() {
        let mut record = Record::from_remote(
            RemoteRecord {
                id: "r1".into(),
                fields: fields(json!({"SKU": "A100", "status": "in"})),
            },
            "SKU",
            Utc::now(),
        );

        record.merge_fields(&fields(json!({"status": "out", "borrower": "Lee"})));

        assert_eq!(record.field_str("status").as_deref(), Some("out"));
        assert_eq!(record.field_str("borrower").as_deref(), Some("Lee"));
        assert_eq!(record.field_str("SKU").as_deref(), Some("A100"));
    }

    #[test]
    fn test_field_schema_parses_type_and_options() {
        let schema: FieldSchema = serde_json::from_value(json!({
            "fields": [
                {"id": "fld1", "name": "SKU", "type": "SingleText"},
                {"id": "fld2", "name": "Status", "type": "SingleSelect",
                 "options": {"choices": [{"id": "opt1", "name": "in"}]}}
            ]
        }))
        .unwrap();

        assert_eq!(schema.fields.len(), 2);
        assert_eq!(schema.field("Status").unwrap().field_type, "SingleSelect");
        assert!(schema.field("SKU").unwrap().options.is_none());
    }
}

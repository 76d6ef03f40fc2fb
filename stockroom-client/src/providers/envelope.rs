//! Response envelope decoding
//!
//! Backends wrap payloads as `{success, code, message, data: {...}}`. Record
//! arrays live at `data.records`, or at a top-level `records` on the legacy
//! shape. Record ids arrive as `recordId` or `id`.
//!
//! Any non-success envelope becomes `SyncError::Remote` with the backend's
//! message; nothing is partially parsed into a success value.

use crate::error::{Result, SyncError};
use crate::models::{FieldDef, FieldSchema, Fields, RemoteRecord};
use serde_json::Value;

fn message(body: &Value) -> Option<String> {
    body.get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}

fn remote_error(body: &Value, fallback: impl FnOnce() -> String) -> SyncError {
    SyncError::Remote(message(body).unwrap_or_else(fallback))
}

fn success_flag(body: &Value) -> Option<bool> {
    body.get("success").and_then(Value::as_bool)
}

/// Decode a records envelope (list, create, update)
pub(crate) fn records(body: Value, action: &str) -> Result<Vec<RemoteRecord>> {
    if success_flag(&body) == Some(false) {
        return Err(remote_error(&body, || format!("Failed to {} records", action)));
    }

    let list = body
        .get("data")
        .and_then(|data| data.get("records"))
        .or_else(|| body.get("records"))
        .and_then(Value::as_array)
        .ok_or_else(|| {
            remote_error(&body, || {
                format!("Failed to {} records: response has no records array", action)
            })
        })?;

    list.iter().map(normalize_record).collect()
}

/// Decode the first record of a single-record create/update response
pub(crate) fn single_record(body: Value, action: &str) -> Result<RemoteRecord> {
    records(body, action)?
        .into_iter()
        .next()
        .ok_or_else(|| SyncError::Remote(format!("Failed to {} record: empty response", action)))
}

/// Decode a schema envelope
pub(crate) fn schema(body: Value) -> Result<FieldSchema> {
    if success_flag(&body) != Some(true) {
        return Err(remote_error(&body, || "Failed to get schema".to_string()));
    }

    let fields = body
        .get("data")
        .and_then(|data| data.get("fields"))
        .cloned()
        .ok_or_else(|| remote_error(&body, || "Failed to get schema: no fields".to_string()))?;

    let fields: Vec<FieldDef> = serde_json::from_value(fields)
        .map_err(|e| SyncError::Remote(format!("Malformed schema: {}", e)))?;

    Ok(FieldSchema { fields })
}

/// Check a delete envelope
pub(crate) fn deleted(body: &Value) -> Result<()> {
    if success_flag(body) == Some(true) {
        Ok(())
    } else {
        Err(remote_error(body, || "Failed to delete record".to_string()))
    }
}

fn normalize_record(value: &Value) -> Result<RemoteRecord> {
    let id = value
        .get("recordId")
        .or_else(|| value.get("id"))
        .and_then(Value::as_str)
        .ok_or_else(|| SyncError::Remote("Malformed record: missing recordId".to_string()))?;

    let fields: Fields = match value.get("fields") {
        Some(Value::Object(map)) => map.clone(),
        None | Some(Value::Null) => Fields::new(),
        Some(_) => {
            return Err(SyncError::Remote(format!(
                "Malformed record {}: fields is not an object",
                id
            )))
        }
    };

    Ok(RemoteRecord {
        id: id.to_string(),
        fields,
    })
}

//! Records table operations
//!
//! Rows keep the order of the last sync in `position`. Writes replace whole
//! rows; there is no field-level merge at this layer.

use super::CacheStore;
use crate::models::{Fields, Record};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, Transaction};
use stockroom_common::time::{from_millis, to_millis};
use stockroom_common::{Error, Result};
use tracing::debug;

const SELECT_COLUMNS: &str = "SELECT id, external_code, fields, updated_at FROM records";

impl CacheStore {
    /// All cached records in sync order
    pub async fn all_records(&self) -> Result<Vec<Record>> {
        let rows = sqlx::query(&format!("{} ORDER BY position, id", SELECT_COLUMNS))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_record).collect()
    }

    /// Point lookup by remote id
    pub async fn get_record(&self, id: &str) -> Result<Option<Record>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_record).transpose()
    }

    /// Lookup by external code
    ///
    /// When several rows share a code, the one written last by the most
    /// recent sync wins.
    pub async fn find_by_code(&self, code: &str) -> Result<Option<Record>> {
        let row = sqlx::query(&format!(
            "{} WHERE external_code = ? ORDER BY position DESC LIMIT 1",
            SELECT_COLUMNS
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_record).transpose()
    }

    /// Insert or replace one record, keeping its position if it exists
    pub async fn put_record(&self, record: &Record) -> Result<()> {
        let fields = serde_json::to_string(&record.fields)?;

        sqlx::query(
            r#"
            INSERT INTO records (id, external_code, fields, updated_at, position)
            VALUES (?, ?, ?, ?, (SELECT COALESCE(MAX(position), -1) + 1 FROM records))
            ON CONFLICT(id) DO UPDATE SET
                external_code = excluded.external_code,
                fields = excluded.fields,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&record.id)
        .bind(&record.external_code)
        .bind(fields)
        .bind(to_millis(&record.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert or replace many records in one transaction
    pub async fn bulk_put(&self, records: &[Record]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let start: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(position), -1) + 1 FROM records")
            .fetch_one(&mut *tx)
            .await?;

        write_rows(&mut tx, records, start).await?;
        tx.commit().await?;

        debug!(count = records.len(), "Bulk wrote cached records");
        Ok(())
    }

    /// Replace the whole table with `records`
    ///
    /// Clear and write commit together: a failure leaves the previous rows.
    pub async fn replace_records(&self, records: &[Record]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM records").execute(&mut *tx).await?;
        write_rows(&mut tx, records, 0).await?;

        tx.commit().await?;

        debug!(count = records.len(), "Replaced cached records");
        Ok(())
    }

    /// Delete every cached record
    pub async fn clear_records(&self) -> Result<()> {
        let result = sqlx::query("DELETE FROM records")
            .execute(&self.pool)
            .await?;
        debug!(removed = result.rows_affected(), "Cleared cached records");
        Ok(())
    }

    pub async fn count_records(&self) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM records")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

async fn write_rows(
    tx: &mut Transaction<'_, Sqlite>,
    records: &[Record],
    start: i64,
) -> Result<()> {
    for (offset, record) in records.iter().enumerate() {
        let fields = serde_json::to_string(&record.fields)?;
        sqlx::query(
            r#"
            INSERT INTO records (id, external_code, fields, updated_at, position)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                external_code = excluded.external_code,
                fields = excluded.fields,
                updated_at = excluded.updated_at,
                position = excluded.position
            "#,
        )
        .bind(&record.id)
        .bind(&record.external_code)
        .bind(fields)
        .bind(to_millis(&record.updated_at))
        .bind(start + offset as i64)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

fn row_to_record(row: &SqliteRow) -> Result<Record> {
    let id: String = row.get("id");
    let raw: String = row.get("fields");
    let fields: Fields = serde_json::from_str(&raw)
        .map_err(|e| Error::InvalidInput(format!("Cached record {} has invalid fields: {}", id, e)))?;

    Ok(Record {
        external_code: row.get("external_code"),
        fields,
        updated_at: from_millis(row.get("updated_at")),
        id,
    })
}

#[cfg(test)]
mod tests {
    use super::super::test_support::memory_store;
    use super::*;
    use serde_json::json;
    use stockroom_common::time::now;

    fn record(id: &str, code: &str) -> Record {
        let mut fields = Fields::new();
        fields.insert("SKU".into(), json!(code));
        Record {
            id: id.into(),
            external_code: code.into(),
            fields,
            updated_at: from_millis(1_700_000_000_000),
        }
    }

    #[tokio::test]
    async fn test_put_and_get_record() {
        let store = memory_store().await;
        store.put_record(&record("r1", "A100")).await.unwrap();

        let loaded = store.get_record("r1").await.unwrap().unwrap();

        assert_eq!(loaded, record("r1", "A100"));
        assert!(store.get_record("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_record_replaces_row_and_keeps_position() {
        let store = memory_store().await;
        store
            .bulk_put(&[record("r1", "A100"), record("r2", "B200")])
            .await
            .unwrap();

        let mut changed = record("r1", "A101");
        changed.updated_at = now();
        store.put_record(&changed).await.unwrap();

        let all = store.all_records().await.unwrap();
        assert_eq!(all[0].id, "r1");
        assert_eq!(all[0].external_code, "A101");
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_replace_records_drops_old_rows() {
        let store = memory_store().await;
        store.bulk_put(&[record("old", "X1")]).await.unwrap();

        store
            .replace_records(&[record("r1", "A100"), record("r2", "B200")])
            .await
            .unwrap();

        let ids: Vec<_> = store
            .all_records()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["r1", "r2"]);
    }

    #[tokio::test]
    async fn test_find_by_code_prefers_last_synced_duplicate() {
        let store = memory_store().await;
        store
            .replace_records(&[record("r1", "DUP"), record("r2", "B200"), record("r3", "DUP")])
            .await
            .unwrap();

        let found = store.find_by_code("DUP").await.unwrap().unwrap();

        assert_eq!(found.id, "r3");
        assert!(store.find_by_code("Z999").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_records() {
        let store = memory_store().await;
        store.bulk_put(&[record("r1", "A100")]).await.unwrap();

        store.clear_records().await.unwrap();

        assert_eq!(store.count_records().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_corrupt_fields_column_is_reported() {
        let store = memory_store().await;
        sqlx::query(
            "INSERT INTO records (id, external_code, fields, updated_at) VALUES ('r1', 'A100', 'not json', 0)",
        )
        .execute(store.pool())
        .await
        .unwrap();

        let err = store.all_records().await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
